//! Error types for the layer console.

use thiserror::Error;

use crate::layer::LayerId;

/// Result type alias using ConsoleError.
pub type ConsoleResult<T> = Result<T, ConsoleError>;

/// Primary error type for console operations.
///
/// None of these is fatal: every failure path resolves the UI to a defined
/// terminal state (idle edit machine, disabled affordance, or a loading
/// placeholder menu).
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// A capability or feature-schema fetch did not complete.
    #[error("Fetch failed for layer {layer}: {message}")]
    FetchFailure { layer: LayerId, message: String },

    /// The geometry column type has no interactive drawing handler.
    #[error("Unsupported geometry type: {0}")]
    UnsupportedGeometry(String),

    /// No extent could be determined for the layer; no zoom is performed.
    #[error("Impossible to get layer extent for {0}")]
    ExtentUnavailable(LayerId),

    /// A panel or menu operation referenced a layer that was removed.
    /// Expected during removal races; never surfaced to the user.
    #[error("Stale access to removed layer {0}")]
    StaleRecord(LayerId),
}

impl ConsoleError {
    /// Message to surface in an informational dialog, if any. Stale-record
    /// access is silently ignored.
    pub fn user_notice(&self) -> Option<String> {
        match self {
            ConsoleError::StaleRecord(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Whether the failure downgrades functionality rather than aborting an
    /// operation outright (attribute-only editing, reduced menu).
    pub fn is_downgrade(&self) -> bool {
        matches!(self, ConsoleError::UnsupportedGeometry(_))
    }
}
