//! On-disk storage for label uploads, template base artwork and composed
//! job PDFs.
//!
//! Paths are recorded in the database as strings; this module only
//! decides where files go and writes them.

use std::path::{Path, PathBuf};

use jigprint_core::hot_folder::job_dir_name;
use jigprint_core::types::DbId;

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};

/// Label artwork formats accepted for upload.
pub const LABEL_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "gif", "bmp", "tif", "tiff", "pdf",
];

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Clone)]
pub struct AssetStorage {
    upload_dir: PathBuf,
    composed_dir: PathBuf,
    template_dir: PathBuf,
}

impl AssetStorage {
    pub fn new(upload_dir: PathBuf, composed_dir: PathBuf, template_dir: PathBuf) -> Self {
        Self {
            upload_dir,
            composed_dir,
            template_dir,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.upload_dir.clone(),
            config.composed_dir.clone(),
            config.template_dir.clone(),
        )
    }

    /// Store label artwork for one job slot and return its path.
    pub async fn save_label(
        &self,
        job_id: DbId,
        slot_id: DbId,
        original_name: &str,
        data: &[u8],
    ) -> AppResult<PathBuf> {
        let ext = extension_of(original_name).unwrap_or_default();
        if !LABEL_EXTENSIONS.contains(&ext.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Unsupported label format '.{ext}'. Supported: {}",
                LABEL_EXTENSIONS.join(", ")
            )));
        }
        if data.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".into()));
        }

        let dir = self.upload_dir.join(job_dir_name(job_id));
        let filename = format!(
            "slot_{slot_id}_{}.{ext}",
            chrono::Utc::now().timestamp_millis()
        );
        write_file(&dir, &filename, data).await
    }

    /// Store a template's base artwork. Only PDFs are accepted.
    pub async fn save_base_artwork(&self, template_id: DbId, data: &[u8]) -> AppResult<PathBuf> {
        if !data.starts_with(PDF_MAGIC) {
            return Err(AppError::BadRequest(
                "Base artwork must be a PDF document".into(),
            ));
        }
        let filename = format!(
            "template_{template_id}_{}.pdf",
            chrono::Utc::now().timestamp_millis()
        );
        write_file(&self.template_dir, &filename, data).await
    }

    /// Where a job's composed PDF is written.
    pub fn composed_path(&self, job_id: DbId) -> PathBuf {
        self.composed_dir.join(format!("{}.pdf", job_dir_name(job_id)))
    }
}

/// Lower-cased extension of a client-supplied file name.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

async fn write_file(dir: &Path, filename: &str, data: &[u8]) -> AppResult<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let path = dir.join(filename);
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn storage(root: &Path) -> AssetStorage {
        AssetStorage::new(
            root.join("uploads"),
            root.join("composed"),
            root.join("templates"),
        )
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_of("Label.PNG").as_deref(), Some("png"));
        assert_eq!(extension_of("noext"), None);
    }

    #[test]
    fn composed_path_uses_job_dir_name() {
        let s = storage(Path::new("/srv"));
        assert_eq!(s.composed_path(42), PathBuf::from("/srv/composed/job_42.pdf"));
    }

    #[tokio::test]
    async fn label_upload_lands_under_job_directory() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(dir.path());
        let path = s.save_label(7, 3, "art.jpg", b"jpegbytes").await.unwrap();
        assert!(path.starts_with(dir.path().join("uploads").join("job_7")));
        assert_eq!(path.extension().unwrap(), "jpg");
        assert_eq!(std::fs::read(&path).unwrap(), b"jpegbytes");
    }

    #[tokio::test]
    async fn unsupported_label_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(dir.path());
        let err = s.save_label(7, 3, "art.exe", b"x").await.unwrap_err();
        assert_matches!(err, AppError::BadRequest(_));
    }

    #[tokio::test]
    async fn base_artwork_must_be_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(dir.path());
        assert_matches!(
            s.save_base_artwork(1, b"PNG").await,
            Err(AppError::BadRequest(_))
        );
        let path = s.save_base_artwork(1, b"%PDF-1.5\n").await.unwrap();
        assert!(path.starts_with(dir.path().join("templates")));
    }
}
