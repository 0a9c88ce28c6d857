//! Jig composition: places per-slot label art onto a jig layout and
//! renders one print-ready PDF page.
//!
//! Composition never fails because of a single slot. Missing or
//! unreadable content is skipped and reported; unsupported formats are
//! drawn as placeholders. Only a bad bed, an unparseable base layer or a
//! write failure abort the whole page.

pub mod content;
pub mod error;
pub mod layout;
pub mod pdf;

use std::fs;
use std::path::{Path, PathBuf};

use jigprint_core::geometry::{BedSize, SlotRect};
use serde::Serialize;

pub use error::ComposeError;
pub use layout::CompositionMode;

use content::SlotContent;
use pdf::BaseLayer;

/// One slot to fill.
#[derive(Debug, Clone)]
pub struct Placement {
    /// Used in logs and the report, e.g. the slot position letter.
    pub label: String,
    pub rect: SlotRect,
    pub rotation_deg: f64,
    pub content: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub bed: BedSize,
    pub base_layer: Option<PathBuf>,
    pub placements: Vec<Placement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedSlot {
    pub index: usize,
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompositionReport {
    pub mode: CompositionMode,
    pub placed: usize,
    pub placeholders: usize,
    pub skipped: Vec<SkippedSlot>,
    pub page_width_pt: f64,
    pub page_height_pt: f64,
}

/// Compose and write the page to `output`.
///
/// The file is written next to its destination and renamed into place so
/// readers never observe a partial PDF.
pub fn compose(
    request: &CompositionRequest,
    output: &Path,
) -> Result<CompositionReport, ComposeError> {
    let (bytes, report) = compose_to_bytes(request)?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = output.with_extension("pdf.tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, output)?;

    tracing::info!(
        path = %output.display(),
        bytes = bytes.len(),
        placed = report.placed,
        skipped = report.skipped.len(),
        "Composed jig page"
    );
    Ok(report)
}

/// Compose into memory.
pub fn compose_to_bytes(
    request: &CompositionRequest,
) -> Result<(Vec<u8>, CompositionReport), ComposeError> {
    request.bed.validate().map_err(ComposeError::InvalidBed)?;

    let base = match &request.base_layer {
        Some(path) if path.is_file() => Some(BaseLayer::load(path)?),
        Some(path) => {
            tracing::warn!(
                path = %path.display(),
                "Base layer not found; composing on a blank canvas"
            );
            None
        }
        None => None,
    };

    let layout = layout::plan(
        &request.bed,
        base.as_ref().map(BaseLayer::page_size),
        &request.placements,
    );

    let mut contents = Vec::with_capacity(request.placements.len());
    let mut skipped = Vec::new();
    for (index, placement) in request.placements.iter().enumerate() {
        match content::load(placement.content.as_deref()) {
            Ok(loaded) => contents.push(Some(loaded)),
            Err(reason) => {
                tracing::warn!(
                    slot = index,
                    label = %placement.label,
                    reason = %reason,
                    "Skipping slot"
                );
                skipped.push(SkippedSlot {
                    index,
                    label: placement.label.clone(),
                    reason: reason.to_string(),
                });
                contents.push(None);
            }
        }
    }

    let placeholders = contents
        .iter()
        .filter(|c| matches!(c, Some(SlotContent::Placeholder(_))))
        .count();
    let placed = contents.iter().filter(|c| c.is_some()).count() - placeholders;

    let report = CompositionReport {
        mode: layout.mode,
        placed,
        placeholders,
        skipped,
        page_width_pt: layout.page.width,
        page_height_pt: layout.page.height,
    };

    let bytes = pdf::render(&layout, base, &contents)?;
    Ok((bytes, report))
}
