// Error types for the plate register pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    // -- Input --
    #[error("failed to read table: {0}")]
    InputRead(String),

    #[error("unsupported input format: {0}")]
    UnsupportedInput(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    // -- Assets --
    // The logo could not be fetched or decoded. Callers degrade to a
    // logo-less document instead of aborting.
    #[error("asset unavailable: {0}")]
    AssetUnavailable(String),

    // -- Rendering --
    #[error("render failed: {0}")]
    Render(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("settings file error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
