use std::path::PathBuf;
use thiserror::Error;

pub type OverlayResult<T> = Result<T, OverlayError>;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Needy file not found in any layer: {}", .0.display())]
    NeedyFileMissing(PathBuf),

    #[error("Support file does not exist: {}", .0.display())]
    SupportFileMissing(PathBuf),

    #[error("Overlay invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
