//! Bridges stored jobs and templates to the composition engine.

use std::collections::HashMap;
use std::path::PathBuf;

use jigprint_compose::{compose, CompositionReport, CompositionRequest, Placement};
use jigprint_core::types::DbId;
use jigprint_db::models::job::JobSlot;
use jigprint_db::models::template::{Template, TemplateSlot};

use crate::error::{AppError, AppResult};
use crate::storage::AssetStorage;

/// Build the composition input for a job: one placement per job slot, in
/// the template's slot geometry.
pub fn build_request(
    template: &Template,
    template_slots: &[TemplateSlot],
    job_slots: &[JobSlot],
) -> CompositionRequest {
    let by_key: HashMap<&str, &TemplateSlot> = template_slots
        .iter()
        .map(|s| (s.slot_key.as_str(), s))
        .collect();

    let placements = job_slots
        .iter()
        .filter_map(|slot| {
            let Some(geometry) = by_key.get(slot.template_slot_key.as_str()) else {
                tracing::warn!(
                    job_slot_id = slot.id,
                    slot_key = %slot.template_slot_key,
                    template_id = template.id,
                    "Job slot has no matching template slot"
                );
                return None;
            };
            Some(Placement {
                label: slot.display_name().to_string(),
                rect: geometry.rect(),
                rotation_deg: geometry.rotation_deg,
                content: slot.label_asset_path.as_ref().map(PathBuf::from),
            })
        })
        .collect();

    CompositionRequest {
        bed: template.bed(),
        base_layer: template.base_artwork_path.as_ref().map(PathBuf::from),
        placements,
    }
}

/// Compose a job's page on the blocking pool and return where it was
/// written.
pub async fn compose_job(
    storage: &AssetStorage,
    job_id: DbId,
    request: CompositionRequest,
) -> AppResult<(PathBuf, CompositionReport)> {
    let output = storage.composed_path(job_id);
    let report = tokio::task::spawn_blocking({
        let output = output.clone();
        move || compose(&request, &output)
    })
    .await
    .map_err(|e| AppError::InternalError(format!("Composition task failed: {e}")))??;

    Ok((output, report))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn template() -> Template {
        Template {
            id: 1,
            name: "4-up bottles".into(),
            description: None,
            bed_width_mm: 329.0,
            bed_height_mm: 483.0,
            hot_folder_type: "uv_flatbed".into(),
            base_artwork_path: Some("templates/base.pdf".into()),
            published_at: Some(Utc::now()),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn template_slot(key: &str, x: f64, rotation: f64) -> TemplateSlot {
        TemplateSlot {
            id: 10,
            template_id: 1,
            slot_key: key.into(),
            name: key.into(),
            slot_position: "A".into(),
            x_mm: x,
            y_mm: 20.0,
            width_mm: 50.0,
            height_mm: 60.0,
            rotation_deg: rotation,
            product_type: None,
            display_order: 0,
            created_at: Utc::now(),
        }
    }

    fn job_slot(id: DbId, key: &str, asset: Option<&str>) -> JobSlot {
        JobSlot {
            id,
            job_id: 42,
            template_slot_key: key.into(),
            slot_position: Some(format!("P{id}")),
            slot_label: None,
            label_asset_path: asset.map(str::to_string),
            guest_name: None,
            recipient: None,
            product_sku: None,
            product_name: None,
            product_type: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn placements_follow_template_geometry() {
        let request = build_request(
            &template(),
            &[template_slot("slot_1", 10.0, 0.0), template_slot("slot_2", 100.0, 90.0)],
            &[
                job_slot(1, "slot_2", Some("uploads/a.png")),
                job_slot(2, "slot_1", None),
            ],
        );

        assert_eq!(request.bed.width_mm, 329.0);
        assert_eq!(request.base_layer, Some(PathBuf::from("templates/base.pdf")));
        assert_eq!(request.placements.len(), 2);

        let first = &request.placements[0];
        assert_eq!(first.label, "P1");
        assert_eq!(first.rect.x_mm, 100.0);
        assert_eq!(first.rotation_deg, 90.0);
        assert_eq!(first.content, Some(PathBuf::from("uploads/a.png")));

        assert_eq!(request.placements[1].content, None);
    }

    #[test]
    fn slots_without_template_geometry_are_dropped() {
        let request = build_request(
            &template(),
            &[template_slot("slot_1", 10.0, 0.0)],
            &[job_slot(1, "slot_9", Some("x.png"))],
        );
        assert!(request.placements.is_empty());
    }
}
