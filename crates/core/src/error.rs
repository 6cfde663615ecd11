//! Error types for the recall domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant:
//!
//! - classification failures are fatal for a request,
//! - layer failures are recorded in the routing result and never propagate,
//! - fusion failures are programming errors and propagate loudly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layer::MemoryLayer;

/// The top-level error type for all recall operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Classification errors ---
    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    // --- Layer errors ---
    #[error("Layer error: {0}")]
    Layer(#[from] LayerError),

    // --- Fusion errors ---
    #[error("Fusion error: {0}")]
    Fusion(#[from] FusionError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Failures of the classification stage. None of these are recovered locally.
#[derive(Debug, Clone, Error)]
pub enum ClassificationError {
    #[error("Classifier used before init()")]
    NotInitialized,

    #[error("Classifier backend '{backend}' failed to initialize: {reason}")]
    InitFailed { backend: String, reason: String },

    #[error("Classifier backend call failed: {0}")]
    Backend(#[from] ProviderError),

    #[error("Classifier backend timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Unparsable classifier output: {0}")]
    Unparsable(String),

    #[error("Invalid classification: {0}")]
    InvalidResult(String),
}

/// Failure of a single memory layer for a single query.
///
/// Serializable because it is recorded inside [`crate::LayerResult`] rather
/// than propagated.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerError {
    #[error("Layer {layer} timed out after {timeout_ms}ms")]
    Timeout { layer: MemoryLayer, timeout_ms: u64 },

    #[error("Layer {layer} query failed: {reason}")]
    QueryFailed { layer: MemoryLayer, reason: String },

    #[error("Layer {layer} returned invalid data: {reason}")]
    InvalidData { layer: MemoryLayer, reason: String },

    #[error("No source registered for layer {layer}")]
    NotRegistered { layer: MemoryLayer },
}

impl LayerError {
    /// The layer this failure belongs to.
    pub fn layer(&self) -> MemoryLayer {
        match self {
            Self::Timeout { layer, .. }
            | Self::QueryFailed { layer, .. }
            | Self::InvalidData { layer, .. }
            | Self::NotRegistered { layer } => *layer,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Malformed input reaching scoring, deduplication or merging.
#[derive(Debug, Clone, Error)]
pub enum FusionError {
    #[error("Non-finite {what} for item from layer {layer}: {value}")]
    NonFiniteScore {
        what: &'static str,
        layer: MemoryLayer,
        value: f32,
    },

    #[error("Invalid fusion option: {0}")]
    InvalidOption(String),
}
