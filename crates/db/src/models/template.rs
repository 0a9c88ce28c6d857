//! Template (jig layout) models and DTOs.

use jigprint_core::error::CoreError;
use jigprint_core::geometry::{self, BedSize, PercentRect, SlotRect};
use jigprint_core::template as rules;
use jigprint_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Template {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub bed_width_mm: f64,
    pub bed_height_mm: f64,
    pub hot_folder_type: String,
    pub base_artwork_path: Option<String>,
    pub published_at: Option<Timestamp>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Template {
    pub fn bed(&self) -> BedSize {
        BedSize {
            width_mm: self.bed_width_mm,
            height_mm: self.bed_height_mm,
        }
    }
}

/// A row from the `template_slots` table. Geometry is millimetres,
/// top-left origin.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TemplateSlot {
    pub id: DbId,
    pub template_id: DbId,
    pub slot_key: String,
    pub name: String,
    pub slot_position: String,
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub rotation_deg: f64,
    pub product_type: Option<String>,
    pub display_order: i32,
    pub created_at: Timestamp,
}

impl TemplateSlot {
    pub fn rect(&self) -> SlotRect {
        SlotRect {
            x_mm: self.x_mm,
            y_mm: self.y_mm,
            width_mm: self.width_mm,
            height_mm: self.height_mm,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateWithSlots {
    #[serde(flatten)]
    pub template: Template,
    pub slots: Vec<TemplateSlot>,
}

/// DTO for `POST /api/v1/templates`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    pub description: Option<String>,
    pub bed_width_mm: f64,
    pub bed_height_mm: f64,
    pub hot_folder_type: String,
    #[serde(default)]
    pub slots: Vec<CreateTemplateSlot>,
}

/// One slot in millimetres. Omitted keys, names and letters are defaulted
/// from the slot's index.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateSlot {
    pub slot_key: Option<String>,
    pub name: Option<String>,
    pub slot_position: Option<String>,
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub rotation_deg: Option<f64>,
    pub product_type: Option<String>,
}

/// One slot from the visual editor, as percentages of the bed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualSlot {
    pub slot_key: Option<String>,
    pub name: Option<String>,
    pub slot_position: Option<String>,
    pub x_percent: f64,
    pub y_percent: f64,
    pub width_percent: f64,
    pub height_percent: f64,
    #[serde(default)]
    pub rotation_deg: f64,
    pub product_type: Option<String>,
}

/// Response for `GET /api/v1/templates/{id}/slots/visual`.
#[derive(Debug, Clone, Serialize)]
pub struct VisualLayout {
    pub template_id: DbId,
    pub bed_width_mm: f64,
    pub bed_height_mm: f64,
    pub published: bool,
    pub base_artwork_available: bool,
    pub slots: Vec<VisualSlot>,
}

impl VisualSlot {
    pub fn from_slot(slot: &TemplateSlot, bed: &BedSize) -> Self {
        let pct = geometry::to_percent(&slot.rect(), bed);
        Self {
            slot_key: Some(slot.slot_key.clone()),
            name: Some(slot.name.clone()),
            slot_position: Some(slot.slot_position.clone()),
            x_percent: pct.x_percent,
            y_percent: pct.y_percent,
            width_percent: pct.width_percent,
            height_percent: pct.height_percent,
            rotation_deg: slot.rotation_deg,
            product_type: slot.product_type.clone(),
        }
    }

    /// Convert to a millimetre slot on `bed`.
    pub fn to_create(&self, bed: &BedSize) -> CreateTemplateSlot {
        let rect = geometry::to_mm(
            &PercentRect {
                x_percent: self.x_percent,
                y_percent: self.y_percent,
                width_percent: self.width_percent,
                height_percent: self.height_percent,
            },
            bed,
        );
        CreateTemplateSlot {
            slot_key: self.slot_key.clone(),
            name: self.name.clone(),
            slot_position: self.slot_position.clone(),
            x_mm: rect.x_mm,
            y_mm: rect.y_mm,
            width_mm: rect.width_mm,
            height_mm: rect.height_mm,
            rotation_deg: Some(self.rotation_deg),
            product_type: self.product_type.clone(),
        }
    }
}

/// A validated slot ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTemplateSlot {
    pub slot_key: String,
    pub name: String,
    pub slot_position: String,
    pub rect: SlotRect,
    pub rotation_deg: f64,
    pub product_type: Option<String>,
    pub display_order: i32,
}

/// Validate slots against `bed` and fill in defaults.
pub fn resolve_slots(
    bed: &BedSize,
    slots: &[CreateTemplateSlot],
) -> Result<Vec<NewTemplateSlot>, CoreError> {
    rules::validate_slot_count(slots.len())?;

    let resolved = slots
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            let rect = SlotRect {
                x_mm: slot.x_mm,
                y_mm: slot.y_mm,
                width_mm: slot.width_mm,
                height_mm: slot.height_mm,
            };
            geometry::validate_slot(&rect, bed)?;
            let rotation_deg = slot.rotation_deg.unwrap_or(0.0);
            rules::validate_rotation(rotation_deg)?;

            Ok(NewTemplateSlot {
                slot_key: slot
                    .slot_key
                    .clone()
                    .unwrap_or_else(|| rules::default_slot_key(index)),
                name: slot
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Slot {}", index + 1)),
                slot_position: slot
                    .slot_position
                    .clone()
                    .unwrap_or_else(|| rules::slot_letter(index)),
                rect,
                rotation_deg,
                product_type: slot.product_type.clone(),
                display_order: index as i32,
            })
        })
        .collect::<Result<Vec<_>, CoreError>>()?;

    rules::validate_unique_slot_keys(resolved.iter().map(|s| s.slot_key.as_str()))?;
    Ok(resolved)
}
