//! Slot content loading.
//!
//! Decodable raster files become images; PDFs and anything else the
//! decoder does not recognise become a labelled placeholder. A missing
//! file, or a raster file that fails to decode, skips the slot.

use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader, RgbaImage};

/// Text drawn in the placeholder box for PDF labels.
pub const PDF_PLACEHOLDER: &str = "PDF Label";

#[derive(Debug, Clone)]
pub enum SlotContent {
    Raster(RgbaImage),
    Placeholder(String),
}

impl SlotContent {
    /// Intrinsic size used for aspect fitting. Placeholders fill the slot.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            SlotContent::Raster(img) => Some(img.dimensions()),
            SlotContent::Placeholder(_) => None,
        }
    }
}

/// Why a slot was left empty.
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("no content assigned")]
    NoContent,

    #[error("content file not found: {0}")]
    NotFound(PathBuf),

    #[error("unreadable image {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

pub fn load(path: Option<&Path>) -> Result<SlotContent, SkipReason> {
    let path = path.ok_or(SkipReason::NoContent)?;
    if !path.is_file() {
        return Err(SkipReason::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if extension.as_deref() == Some("pdf") {
        return Ok(SlotContent::Placeholder(PDF_PLACEHOLDER.to_string()));
    }

    match decode(path) {
        Ok(img) if img.width() > 0 && img.height() > 0 => Ok(SlotContent::Raster(img)),
        Ok(_) => Err(SkipReason::Unreadable {
            path: path.to_path_buf(),
            message: "image has no pixels".to_string(),
        }),
        Err(message) if ImageFormat::from_path(path).is_ok() => Err(SkipReason::Unreadable {
            path: path.to_path_buf(),
            message,
        }),
        Err(_) => Ok(SlotContent::Placeholder(placeholder_text(extension.as_deref()))),
    }
}

fn decode(path: &Path) -> Result<RgbaImage, String> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| e.to_string())?;
    reader
        .decode()
        .map(|img| img.to_rgba8())
        .map_err(|e| e.to_string())
}

fn placeholder_text(extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() => format!("{} Label", ext.to_ascii_uppercase()),
        _ => "Unsupported Label".to_string(),
    }
}
