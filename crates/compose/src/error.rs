use std::path::PathBuf;

use jigprint_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Invalid bed: {0}")]
    InvalidBed(#[source] CoreError),

    #[error("Cannot read base layer {path}: {source}")]
    BaseLayer {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("Base layer {0} has no pages")]
    BaseLayerEmpty(PathBuf),

    #[error("Base layer {0} has no usable MediaBox")]
    BaseLayerMediaBox(PathBuf),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
