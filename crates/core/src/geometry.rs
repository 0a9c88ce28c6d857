//! Slot geometry: millimetres, percentages and PDF points.
//!
//! Templates store slot rectangles in millimetres with a top-left origin.
//! The template editor works in percentages of the bed; that transform is
//! presentation only and never persisted. Rendering works in PDF points
//! with a bottom-left origin, so every placed rectangle is flipped.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// PDF points per millimetre (72 points per inch, 25.4 mm per inch).
pub const MM_TO_PT: f64 = 72.0 / 25.4;

/// Spacing of the alignment grid drawn on blank-canvas compositions.
pub const GRID_SPACING_MM: f64 = 10.0;

/// Largest bed dimension accepted, in millimetres.
pub const MAX_BED_MM: f64 = 5000.0;

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * MM_TO_PT
}

// ---------------------------------------------------------------------------
// Sizes and rectangles
// ---------------------------------------------------------------------------

/// Printable area of a jig, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BedSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl BedSize {
    pub fn new(width_mm: f64, height_mm: f64) -> Result<Self, CoreError> {
        let bed = Self {
            width_mm,
            height_mm,
        };
        bed.validate()?;
        Ok(bed)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, value) in [("width", self.width_mm), ("height", self.height_mm)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::Validation(format!(
                    "Bed {name} must be a positive number of millimetres"
                )));
            }
            if value > MAX_BED_MM {
                return Err(CoreError::Validation(format!(
                    "Bed {name} must not exceed {MAX_BED_MM} mm"
                )));
            }
        }
        Ok(())
    }

    pub fn to_points(self) -> PageSize {
        PageSize {
            width: mm_to_pt(self.width_mm),
            height: mm_to_pt(self.height_mm),
        }
    }
}

/// A page size in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// A slot rectangle in millimetres, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotRect {
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// A slot rectangle as percentages (0–100) of the bed, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentRect {
    pub x_percent: f64,
    pub y_percent: f64,
    pub width_percent: f64,
    pub height_percent: f64,
}

/// A rectangle in PDF points, bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

// ---------------------------------------------------------------------------
// Percent <-> millimetre
// ---------------------------------------------------------------------------

pub fn to_percent(rect: &SlotRect, bed: &BedSize) -> PercentRect {
    PercentRect {
        x_percent: rect.x_mm / bed.width_mm * 100.0,
        y_percent: rect.y_mm / bed.height_mm * 100.0,
        width_percent: rect.width_mm / bed.width_mm * 100.0,
        height_percent: rect.height_mm / bed.height_mm * 100.0,
    }
}

pub fn to_mm(rect: &PercentRect, bed: &BedSize) -> SlotRect {
    SlotRect {
        x_mm: rect.x_percent / 100.0 * bed.width_mm,
        y_mm: rect.y_percent / 100.0 * bed.height_mm,
        width_mm: rect.width_percent / 100.0 * bed.width_mm,
        height_mm: rect.height_percent / 100.0 * bed.height_mm,
    }
}

/// Validate a slot against its bed: positive finite size, non-negative
/// origin, and fully inside the bed (with a small tolerance for rounding
/// in percentage conversions).
pub fn validate_slot(rect: &SlotRect, bed: &BedSize) -> Result<(), CoreError> {
    const TOLERANCE_MM: f64 = 0.01;

    let values = [rect.x_mm, rect.y_mm, rect.width_mm, rect.height_mm];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(CoreError::Validation(
            "Slot coordinates must be finite numbers".to_string(),
        ));
    }
    if rect.width_mm <= 0.0 || rect.height_mm <= 0.0 {
        return Err(CoreError::Validation(
            "Slot width and height must be positive".to_string(),
        ));
    }
    if rect.x_mm < 0.0 || rect.y_mm < 0.0 {
        return Err(CoreError::Validation(
            "Slot position must not be negative".to_string(),
        ));
    }
    if rect.x_mm + rect.width_mm > bed.width_mm + TOLERANCE_MM
        || rect.y_mm + rect.height_mm > bed.height_mm + TOLERANCE_MM
    {
        return Err(CoreError::Validation(format!(
            "Slot at ({}, {}) size {}x{} mm exceeds the {}x{} mm bed",
            rect.x_mm, rect.y_mm, rect.width_mm, rect.height_mm, bed.width_mm, bed.height_mm
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Page placement
// ---------------------------------------------------------------------------

/// Per-axis scale applied to every placement when a base layer was
/// authored at a different physical size than the bed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactors {
    pub const IDENTITY: ScaleFactors = ScaleFactors { x: 1.0, y: 1.0 };
}

/// `base_page_size / bed_page_size`, per axis.
pub fn scale_factors(base: PageSize, bed: PageSize) -> ScaleFactors {
    ScaleFactors {
        x: base.width / bed.width,
        y: base.height / bed.height,
    }
}

/// Convert a top-left y coordinate to a bottom-left one.
pub fn flip_y(page_height: f64, y: f64, height: f64) -> f64 {
    page_height - y - height
}

/// Map a slot in millimetres onto the page: convert to points, scale,
/// then flip the vertical axis against `page_height`.
pub fn slot_to_page(slot: &SlotRect, scale: ScaleFactors, page_height: f64) -> Rect {
    let x = mm_to_pt(slot.x_mm) * scale.x;
    let y = mm_to_pt(slot.y_mm) * scale.y;
    let width = mm_to_pt(slot.width_mm) * scale.x;
    let height = mm_to_pt(slot.height_mm) * scale.y;

    Rect {
        x,
        y: flip_y(page_height, y, height),
        width,
        height,
    }
}

/// Fit content of `content_width x content_height` inside `slot`,
/// preserving aspect ratio.
///
/// Content relatively wider than the slot fills the slot width and is
/// centred vertically; otherwise it fills the slot height and is centred
/// horizontally.
pub fn aspect_fit(content_width: f64, content_height: f64, slot: &Rect) -> Rect {
    let content_ratio = content_width / content_height;
    let slot_ratio = slot.width / slot.height;

    if content_ratio > slot_ratio {
        let height = slot.width / content_ratio;
        Rect {
            x: slot.x,
            y: slot.y + (slot.height - height) / 2.0,
            width: slot.width,
            height,
        }
    } else {
        let width = slot.height * content_ratio;
        Rect {
            x: slot.x + (slot.width - width) / 2.0,
            y: slot.y,
            width,
            height: slot.height,
        }
    }
}

/// Affine matrix `[a b c d e f]` rotating by `degrees` (counter-clockwise)
/// around `center`. Returns `None` for a zero rotation.
pub fn rotation_about(degrees: f64, center: (f64, f64)) -> Option<[f64; 6]> {
    if degrees.rem_euclid(360.0) == 0.0 {
        return None;
    }
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (cx, cy) = center;
    Some([
        cos,
        sin,
        -sin,
        cos,
        cx - cos * cx + sin * cy,
        cy - sin * cx - cos * cy,
    ])
}

/// Offsets `0, spacing, 2*spacing, …` strictly below `extent`.
pub fn grid_offsets(extent: f64, spacing: f64) -> Vec<f64> {
    if spacing <= 0.0 || extent <= 0.0 {
        return Vec::new();
    }
    let count = (extent / spacing).ceil() as usize;
    (0..count)
        .map(|i| i as f64 * spacing)
        .filter(|offset| *offset < extent)
        .collect()
}
