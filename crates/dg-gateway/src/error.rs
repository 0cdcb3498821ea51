// error.rs — Error types for the gateway.

use dg_policy::{Decision, PolicyLayer};
use thiserror::Error;

/// Errors reported by a [`Collection`](crate::Collection) implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// The named deck, note, or note type does not exist.
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// Creating something that already exists.
    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: &'static str, name: String },

    /// The request is malformed for this collection.
    #[error("invalid request: {0}")]
    Invalid(String),
}

/// Errors that can occur while handling a tool call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The policy engine denied the operation.
    #[error("permission denied: {reason}")]
    PolicyDenied { layer: PolicyLayer, reason: String },

    /// The collection rejected or could not satisfy the operation.
    #[error("collection error: {0}")]
    Collection(#[from] CollectionError),

    /// The tool call could not be decoded.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool name is not one this gateway serves.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A result could not be encoded as JSON.
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl GatewayError {
    /// Build a denial error from a denied decision.
    ///
    /// Allowed decisions never reach here; a missing layer is reported as
    /// the global gate so the error is still well-formed.
    pub fn denied(decision: Decision) -> Self {
        GatewayError::PolicyDenied {
            layer: decision.layer.unwrap_or(PolicyLayer::Global),
            reason: decision.reason,
        }
    }

    /// Stable machine-readable kind for structured error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::PolicyDenied { .. } => "permission_denied",
            GatewayError::Collection(CollectionError::NotFound { .. }) => "not_found",
            GatewayError::Collection(CollectionError::AlreadyExists { .. }) => "already_exists",
            GatewayError::Collection(CollectionError::Invalid(_)) => "invalid_request",
            GatewayError::InvalidArguments(_) => "invalid_arguments",
            GatewayError::UnknownTool(_) => "unknown_tool",
            GatewayError::Encode(_) => "internal",
        }
    }

    /// The denying layer, for permission errors.
    pub fn layer(&self) -> Option<PolicyLayer> {
        match self {
            GatewayError::PolicyDenied { layer, .. } => Some(*layer),
            _ => None,
        }
    }
}
