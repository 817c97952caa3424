//! Error handling for Strata
//!
//! Errors fall into four families: configuration problems (fatal, surfaced
//! immediately), per-edition generation failures (recoverable, the edition
//! attempt is discarded), rendering failures, and persistence failures.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Strata operations
pub type Result<T> = std::result::Result<T, StrataError>;

/// Main error type for Strata operations
#[derive(Error, Debug)]
pub enum StrataError {
    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ConfigValidation(Vec<String>),

    #[error("Layer directory not found: {path}")]
    CatalogNotFound { path: PathBuf },

    #[error("Illegal trait filename '{filename}': {reason}")]
    IllegalFilename { filename: String, reason: String },

    #[error("Invalid rarity weight in '{filename}': {weight}")]
    InvalidWeight { filename: String, weight: f64 },

    #[error("Layer '{layer}' has no selectable elements")]
    EmptyLayer { layer: String },

    #[error("Layer '{layer}' has no element matching pinned reference {reference}")]
    UnknownPinnedElement { layer: String, reference: String },

    #[error("Unknown rule preset: {name}")]
    UnknownPreset { name: String },

    // Generation Errors
    #[error("No compatible element for layer '{layer}' after {attempts} attempts")]
    UnsatisfiableConstraint { layer: String, attempts: usize },

    #[error("Malformed DNA: {reason}")]
    MalformedDna { reason: String },

    #[error("Unique DNA tolerance of {tolerance} reached while growing to {target} editions")]
    ToleranceExceeded { tolerance: usize, target: u32 },

    // Rendering Errors
    #[error("Failed to load asset {path}: {reason}")]
    AssetLoad { path: PathBuf, reason: String },

    #[error("Render error: {reason}")]
    Render { reason: String },

    // Persistence Errors
    #[error("Failed to write file: {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl StrataError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            StrataError::InvalidConfig { .. } => "INVALID_CONFIG",
            StrataError::ConfigValidation(_) => "CONFIG_VALIDATION",
            StrataError::CatalogNotFound { .. } => "CATALOG_NOT_FOUND",
            StrataError::IllegalFilename { .. } => "ILLEGAL_FILENAME",
            StrataError::InvalidWeight { .. } => "INVALID_WEIGHT",
            StrataError::EmptyLayer { .. } => "EMPTY_LAYER",
            StrataError::UnknownPinnedElement { .. } => "UNKNOWN_PINNED_ELEMENT",
            StrataError::UnknownPreset { .. } => "UNKNOWN_PRESET",
            StrataError::UnsatisfiableConstraint { .. } => "UNSATISFIABLE_CONSTRAINT",
            StrataError::MalformedDna { .. } => "MALFORMED_DNA",
            StrataError::ToleranceExceeded { .. } => "TOLERANCE_EXCEEDED",
            StrataError::AssetLoad { .. } => "ASSET_LOAD",
            StrataError::Render { .. } => "RENDER_ERROR",
            StrataError::FileWrite { .. } => "FILE_WRITE",
            StrataError::DirectoryCreate { .. } => "DIRECTORY_CREATE",
            StrataError::Io(_) => "IO_ERROR",
            StrataError::Serialization(_) => "SERIALIZATION_ERROR",
            StrataError::Image(_) => "IMAGE_ERROR",
        }
    }

    /// Check if this error only invalidates the current edition attempt.
    ///
    /// Recoverable errors make the orchestrator discard the attempt and
    /// generate a fresh DNA; everything else ends the run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            StrataError::UnsatisfiableConstraint { .. } => true,
            StrataError::AssetLoad { .. } => true,
            _ => false,
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StrataError::CatalogNotFound { .. } => vec![
                "Check that every layer in layers_order has a directory under layers_dir",
                "Layer directory names are case-sensitive",
            ],
            StrataError::IllegalFilename { .. } => vec![
                "Rename the file so it does not contain '-'",
                "Use '_' to separate filename tokens instead",
            ],
            StrataError::InvalidWeight { .. } => vec![
                "Rarity weights must be finite and not negative",
                "Use the form <name>#<weight>.png",
            ],
            StrataError::UnknownPinnedElement { .. } => vec![
                "Add the referenced file to the layer directory",
                "Or change the pin/fallback reference in the rule table",
            ],
            StrataError::UnsatisfiableConstraint { .. } => vec![
                "Add trait variants for every skin tone the earlier layers can establish",
                "Configure a fallback element for the layer",
                "Raise max_resample_attempts",
            ],
            StrataError::ToleranceExceeded { .. } => vec![
                "Add more layers or elements to support this collection size",
                "Lower grow_edition_size_to",
                "Raise unique_dna_tolerance",
            ],
            StrataError::AssetLoad { .. } => vec![
                "Check that the trait image is a readable PNG",
                "The edition was discarded and regenerated",
            ],
            _ => vec![],
        }
    }
}
