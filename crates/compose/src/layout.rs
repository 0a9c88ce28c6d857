//! Page layout planning.
//!
//! Turns a bed, an optional base-layer page size and the slot placements
//! into page-space rectangles. No I/O; the PDF writer consumes the plan.

use jigprint_core::geometry::{
    self, grid_offsets, mm_to_pt, rotation_about, BedSize, PageSize, Rect, ScaleFactors,
    GRID_SPACING_MM,
};
use serde::Serialize;

use crate::Placement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionMode {
    /// Placements drawn over the first page of a base PDF.
    Overlay,
    /// Placements drawn on a new bed-sized page with an alignment grid.
    BlankCanvas,
}

/// Vertical and horizontal grid line offsets, in points.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSlot {
    /// Index into the request's placements.
    pub index: usize,
    /// Slot box in page points, bottom-left origin.
    pub rect: Rect,
    /// Rotation about the slot centre, if any.
    pub transform: Option<[f64; 6]>,
}

impl PlannedSlot {
    /// Where content of the given intrinsic size lands inside the slot.
    pub fn fit(&self, content_width: f64, content_height: f64) -> Rect {
        geometry::aspect_fit(content_width, content_height, &self.rect)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub mode: CompositionMode,
    pub page: PageSize,
    pub scale: ScaleFactors,
    pub grid: Option<Grid>,
    pub slots: Vec<PlannedSlot>,
}

/// Plan the page.
///
/// With a base page the layout is sized to it and every slot is scaled by
/// `base / bed` per axis before the vertical flip. Without one the page is
/// the bed itself and a 10 mm grid is laid down first.
pub fn plan(bed: &BedSize, base_page: Option<PageSize>, placements: &[Placement]) -> PageLayout {
    let bed_page = bed.to_points();
    let (mode, page, scale) = match base_page {
        Some(base) => (
            CompositionMode::Overlay,
            base,
            geometry::scale_factors(base, bed_page),
        ),
        None => (CompositionMode::BlankCanvas, bed_page, ScaleFactors::IDENTITY),
    };

    let grid = (mode == CompositionMode::BlankCanvas).then(|| {
        let spacing = mm_to_pt(GRID_SPACING_MM);
        Grid {
            xs: grid_offsets(page.width, spacing),
            ys: grid_offsets(page.height, spacing),
        }
    });

    let slots = placements
        .iter()
        .enumerate()
        .map(|(index, placement)| {
            let rect = geometry::slot_to_page(&placement.rect, scale, page.height);
            PlannedSlot {
                index,
                rect,
                transform: rotation_about(placement.rotation_deg, rect.center()),
            }
        })
        .collect();

    PageLayout {
        mode,
        page,
        scale,
        grid,
        slots,
    }
}
