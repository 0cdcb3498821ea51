// engine.rs — Layered permission evaluation.
//
// Every request passes through `authorize()`, which runs five independent
// layer checks in a fixed order:
//
// 1. Global flags         — is this kind of operation enabled at all?
// 2. Protected decks      — is the target deck immune to mutation?
// 3. Tag restrictions     — does the note carry a protected/read-only tag?
// 4. Deck pattern lists   — is the deck reachable under allowlist/denylist?
// 5. Note-type rules      — may note types be created/modified/used?
//
// The first layer that denies ends evaluation. Permissions only add up
// within a layer (allowlist membership); no layer can undo an earlier denial.
//
// Each layer is a plain function in the LAYERS table, so adding or reordering
// a layer is a one-line change and every layer can be tested on its own.

use tracing::debug;

use crate::config::{Mode, PolicyConfig};
use crate::decision::{Decision, EvaluationStep, EvaluationTrace, PolicyLayer};
use crate::pattern::matches_any;
use crate::request::{OperationKind, OperationRequest};

/// A layer check: `None` passes, `Some(reason)` denies.
type LayerCheck = fn(&PolicyConfig, &OperationRequest) -> Option<String>;

/// The evaluation order. Most restrictive wins.
const LAYERS: [(PolicyLayer, LayerCheck); 5] = [
    (PolicyLayer::Global, check_global as LayerCheck),
    (PolicyLayer::ProtectedDecks, check_protected_decks as LayerCheck),
    (PolicyLayer::TagRestrictions, check_tag_restrictions as LayerCheck),
    (PolicyLayer::DeckLists, check_deck_lists as LayerCheck),
    (PolicyLayer::NoteTypes, check_note_types as LayerCheck),
];

/// Evaluate a request against a policy snapshot and return a decision.
///
/// This is the single chokepoint: every tool call that touches the
/// collection flows through here. It has no hidden state, so identical
/// inputs always yield identical decisions.
pub fn authorize(config: &PolicyConfig, request: &OperationRequest) -> Decision {
    for (layer, check) in LAYERS {
        if let Some(reason) = check(config, request) {
            let decision = Decision::deny(layer, reason);
            debug!(
                operation = %request.describe_target(),
                layer = %layer,
                reason = %decision.reason,
                "request denied"
            );
            return decision;
        }
    }
    Decision::allow()
}

/// Same evaluation as [`authorize`], recording each layer consulted.
pub fn authorize_with_trace(config: &PolicyConfig, request: &OperationRequest) -> EvaluationTrace {
    let mut steps = Vec::with_capacity(LAYERS.len());

    for (layer, check) in LAYERS {
        match check(config, request) {
            Some(reason) => {
                let decision = Decision::deny(layer, reason);
                steps.push(EvaluationStep {
                    layer,
                    outcome: format!("denied: {}", decision.reason),
                    terminal: true,
                });
                return EvaluationTrace { decision, steps };
            }
            None => steps.push(EvaluationStep {
                layer,
                outcome: "passed".to_string(),
                terminal: false,
            }),
        }
    }

    if let Some(last) = steps.last_mut() {
        last.terminal = true;
    }
    EvaluationTrace {
        decision: Decision::allow(),
        steps,
    }
}

/// Keep only the items the policy lets the agent read.
///
/// Listing decks or searching notes is modeled as repeated single-item
/// reads: `to_requests` describes each item as one or more requests (a note
/// with cards in several decks yields one per deck) and the item survives
/// only if every one is allowed. Request kinds are forced to `Read`. An item
/// that yields no requests is checked as a bare read, so the global read
/// flag still applies.
pub fn filter_readable<T, I, F, R>(config: &PolicyConfig, items: I, mut to_requests: F) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> R,
    R: IntoIterator<Item = OperationRequest>,
{
    items
        .into_iter()
        .filter(|item| {
            let mut checked = false;
            for mut request in to_requests(item) {
                request.kind = OperationKind::Read;
                checked = true;
                if authorize(config, &request).is_denied() {
                    debug!(operation = %request.describe_target(), "filtered out of results");
                    return false;
                }
            }
            checked || authorize(config, &OperationRequest::new(OperationKind::Read)).is_allowed()
        })
        .collect()
}

// ── Layer checks ─────────────────────────────────────────────────

fn check_global(config: &PolicyConfig, request: &OperationRequest) -> Option<String> {
    let (flag, enabled) = match request.kind {
        OperationKind::Read => ("read", config.global.read),
        OperationKind::Write | OperationKind::CreateNoteType | OperationKind::ModifyNoteType => {
            ("write", config.global.write)
        }
        OperationKind::Delete => ("delete", config.global.delete),
    };
    if enabled {
        None
    } else {
        Some(format!(
            "global permission disabled: '{}' is off (required for {})",
            flag, request.kind
        ))
    }
}

fn check_protected_decks(config: &PolicyConfig, request: &OperationRequest) -> Option<String> {
    if !request.kind.is_mutation() {
        return None;
    }
    let deck = request.deck.as_deref()?;
    if config.protected_decks.contains(deck) {
        Some(format!("deck is protected: '{}' cannot be targeted by {}", deck, request.kind))
    } else {
        None
    }
}

fn check_tag_restrictions(config: &PolicyConfig, request: &OperationRequest) -> Option<String> {
    if !request.kind.is_mutation() {
        return None;
    }
    let restrictions = &config.tag_restrictions;

    let protected: Vec<&str> = request
        .tag_iter()
        .filter(|tag| restrictions.protected_tags.contains(*tag))
        .collect();
    if !protected.is_empty() {
        return Some(format!("note has a protected tag: {}", protected.join(", ")));
    }

    let readonly: Vec<&str> = request
        .tag_iter()
        .filter(|tag| restrictions.readonly_tags.contains(*tag))
        .collect();
    if !readonly.is_empty() {
        return Some(format!("note has a read-only tag: {}", readonly.join(", ")));
    }

    None
}

fn check_deck_lists(config: &PolicyConfig, request: &OperationRequest) -> Option<String> {
    let deck = request.deck.as_deref()?;
    match config.mode {
        Mode::Allowlist => match matches_any(deck, &config.deck_permissions.allow) {
            Some(_) => None,
            None => Some(format!("deck not in allowlist: '{}'", deck)),
        },
        Mode::Denylist => matches_any(deck, &config.deck_permissions.deny)
            .map(|pattern| format!("deck matches denylist pattern '{}': '{}'", pattern, deck)),
    }
}

fn check_note_types(config: &PolicyConfig, request: &OperationRequest) -> Option<String> {
    let rules = &config.note_type_permissions;
    match request.kind {
        OperationKind::CreateNoteType if !rules.allow_create => {
            return Some("note-type creation disabled".to_string());
        }
        OperationKind::ModifyNoteType if !rules.allow_modify => {
            return Some("note-type modification disabled".to_string());
        }
        _ => {}
    }

    let note_type = request.note_type.as_deref()?;
    if rules.permits_type(note_type) {
        None
    } else {
        Some(format!("note type not allowed: '{}'", note_type))
    }
}
