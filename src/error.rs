use thiserror::Error;

/// Typed failures surfaced by library code. Binaries wrap these in
/// `anyhow::Error` at the process boundary.
#[derive(Error, Debug)]
pub enum TarnError {
    #[error("config invalid: {field}: {reason}")]
    Config { field: String, reason: String },

    #[error("artifact {file}:{line}: {reason}")]
    Artifact {
        file: String,
        line: u64,
        reason: String,
    },

    #[error("elevation raster read failed: {0}")]
    Elevation(String),
}

pub type TarnResult<T> = Result<T, TarnError>;
