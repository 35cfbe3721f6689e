//! Core error types for focustroll-core.
//!
//! Boundary failures are typed so call sites can log them and degrade to
//! "feature unavailable" instead of crashing an event handler.

use thiserror::Error;

/// Core error type for focustroll-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Settings-store errors
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Browser-boundary errors (permissions, injection, tabs, eviction)
    #[error("Boundary error: {0}")]
    Port(#[from] PortError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Settings-store errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Reading the persisted settings failed
    #[error("Failed to load settings: {0}")]
    LoadFailed(String),

    /// A mutation was rejected by the backing store
    #[error("Settings store rejected write: {0}")]
    WriteRejected(String),

    /// A settings value could not be used even after coercion
    #[error("Invalid settings value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Browser-boundary errors.
///
/// Each variant maps to one capability trait in [`crate::ports`]. None of
/// these is fatal: the engine logs them and skips the affected feature for
/// the current event.
#[derive(Error, Debug)]
pub enum PortError {
    /// The permission probe itself failed (distinct from "not granted")
    #[error("Permission check failed: {0}")]
    PermissionCheck(String),

    /// Overlay script injection failed for a tab
    #[error("Injection failed for tab {tab_id}: {message}")]
    Injection { tab_id: u64, message: String },

    /// Tab enumeration or tab manipulation failed
    #[error("Tab operation failed: {0}")]
    Tabs(String),

    /// Session eviction failed for a host
    #[error("Session eviction failed for {host}: {message}")]
    Eviction { host: String, message: String },

    /// Backend-specific failure with no better classification
    #[error("{0}")]
    Backend(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
