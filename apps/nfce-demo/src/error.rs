//! # Demo Error Type
//!
//! Unified error type for the coupon simulator.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  station.toml ── io / toml ──────────┐                                  │
//! │  --fuel / --liters / --payment ──────┼──► AppError ──► stderr, exit 1   │
//! │  nfce-core ── CoreError ─────────────┘                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use nfce_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for the demo.
pub type AppResult<T> = Result<T, AppError>;

/// Everything that can stop a coupon from printing.
#[derive(Debug, Error)]
pub enum AppError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// An explicitly requested profile does not exist.
    #[error("Station profile not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Failed to read the profile file.
    #[error("Failed to read station profile: {0}")]
    Io(#[from] std::io::Error),

    /// The profile is not valid TOML for `StationProfile`.
    #[error("Invalid station profile: {0}")]
    Toml(#[from] toml::de::Error),

    /// The profile parsed but its values are unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // Input Errors
    // =========================================================================
    /// `--fuel` matched no configured fuel.
    #[error("Unknown fuel '{requested}'. Configured: {available}")]
    UnknownFuel { requested: String, available: String },

    /// A CLI value was rejected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // =========================================================================
    // Core / Output Errors
    // =========================================================================
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Core(CoreError::Validation(err))
    }
}
