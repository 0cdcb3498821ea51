// error.rs — Error types for the policy subsystem.
//
// Evaluation itself never fails; these cover the edges around it.

use thiserror::Error;

/// Errors that can occur around policy evaluation.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A mode string was neither "allowlist" nor "denylist".
    #[error("unknown permission mode '{value}' (expected 'allowlist' or 'denylist')")]
    UnknownMode { value: String },

    /// An operation name could not be mapped to an operation kind.
    #[error("unknown operation '{value}'")]
    UnknownOperation { value: String },

    /// A snapshot could not be encoded for fingerprinting.
    #[error("failed to encode policy snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}
