// decision.rs — Decision and trace types returned by the engine.
//
// A Decision is short-lived: built per call, acted on by the caller, then
// dropped. A denial always carries a non-empty reason and the layer that
// produced it, so behavior is auditable and testable.

use serde::{Deserialize, Serialize};

/// The rule layers, in the order the engine consults them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PolicyLayer {
    Global,
    ProtectedDecks,
    TagRestrictions,
    DeckLists,
    NoteTypes,
}

impl PolicyLayer {
    /// All layers in evaluation order.
    pub const ORDER: [PolicyLayer; 5] = [
        PolicyLayer::Global,
        PolicyLayer::ProtectedDecks,
        PolicyLayer::TagRestrictions,
        PolicyLayer::DeckLists,
        PolicyLayer::NoteTypes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyLayer::Global => "global",
            PolicyLayer::ProtectedDecks => "protected_decks",
            PolicyLayer::TagRestrictions => "tag_restrictions",
            PolicyLayer::DeckLists => "deck_lists",
            PolicyLayer::NoteTypes => "note_types",
        }
    }
}

impl std::fmt::Display for PolicyLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one authorization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Empty when allowed; names the layer and rule when denied.
    pub reason: String,
    /// The layer that denied, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<PolicyLayer>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: String::new(),
            layer: None,
        }
    }

    /// A denial from `layer`. The reason is prefixed with the layer name.
    pub fn deny(layer: PolicyLayer, reason: impl AsRef<str>) -> Self {
        Self {
            allowed: false,
            reason: format!("{}: {}", layer, reason.as_ref()),
            layer: Some(layer),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn is_denied(&self) -> bool {
        !self.allowed
    }
}

/// One layer's result within an [`EvaluationTrace`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationStep {
    pub layer: PolicyLayer,
    /// "passed" or "denied: <reason>".
    pub outcome: String,
    /// Whether evaluation stopped at this step.
    pub terminal: bool,
}

/// A decision together with every layer the engine consulted to reach it.
///
/// Layers after a denial are never reached and so never appear.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationTrace {
    pub decision: Decision,
    pub steps: Vec<EvaluationStep>,
}
