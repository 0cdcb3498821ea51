// tool.rs — Tool-call decoding and dispatch.
//
// Agents send `{"name": "...", "arguments": {...}}`. Argument names follow
// the add-on's tool surface (deck_name, note_id, model_name). Every call gets
// a ToolResponse back; failures, permission denials included, are carried in
// the body rather than as transport errors so the agent can read the reason.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::collection::{
    CardTemplate, Collection, DeckUpdate, NewNote, NoteId, NoteTypeRecord, NoteUpdate,
};
use crate::error::GatewayError;
use crate::guard::DeckGuard;

const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Every tool the gateway serves.
pub const TOOL_NAMES: &[&str] = &[
    "get_permissions",
    "list_decks",
    "get_deck_info",
    "search_notes",
    "get_note",
    "get_cards_for_note",
    "get_review_stats",
    "list_note_types",
    "create_deck",
    "update_deck",
    "delete_deck",
    "create_note",
    "update_note",
    "delete_note",
    "create_note_type",
    "update_note_type",
];

fn default_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

/// A decoded tool call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    GetPermissions {},
    ListDecks {},
    GetDeckInfo {
        deck_name: String,
    },
    SearchNotes {
        #[serde(default)]
        query: String,
        #[serde(default = "default_limit")]
        limit: usize,
    },
    GetNote {
        note_id: NoteId,
    },
    GetCardsForNote {
        note_id: NoteId,
    },
    GetReviewStats {
        #[serde(default)]
        deck_name: Option<String>,
    },
    ListNoteTypes {},
    CreateDeck {
        deck_name: String,
    },
    UpdateDeck {
        deck_name: String,
        #[serde(default)]
        new_name: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
    DeleteDeck {
        deck_name: String,
    },
    CreateNote {
        deck_name: String,
        model_name: String,
        fields: BTreeMap<String, String>,
        #[serde(default)]
        tags: BTreeSet<String>,
    },
    UpdateNote {
        note_id: NoteId,
        #[serde(default)]
        fields: Option<BTreeMap<String, String>>,
        #[serde(default)]
        tags: Option<BTreeSet<String>>,
    },
    DeleteNote {
        note_id: NoteId,
    },
    CreateNoteType {
        name: String,
        fields: Vec<String>,
        #[serde(default)]
        templates: Vec<CardTemplate>,
    },
    UpdateNoteType {
        name: String,
        fields: Vec<String>,
    },
}

#[derive(Deserialize)]
struct Envelope {
    name: String,
    #[serde(default)]
    arguments: Value,
}

impl ToolCall {
    /// Decode a tool call. Missing or null `arguments` are treated as `{}`.
    pub fn from_json(value: Value) -> Result<Self, GatewayError> {
        let envelope: Envelope = serde_json::from_value(value)
            .map_err(|e| GatewayError::InvalidArguments(e.to_string()))?;
        if !TOOL_NAMES.contains(&envelope.name.as_str()) {
            return Err(GatewayError::UnknownTool(envelope.name));
        }
        let arguments = match envelope.arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        serde_json::from_value(serde_json::json!({
            "name": envelope.name,
            "arguments": arguments,
        }))
        .map_err(|e| GatewayError::InvalidArguments(e.to_string()))
    }

    pub fn parse(text: &str) -> Result<Self, GatewayError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| GatewayError::InvalidArguments(e.to_string()))?;
        Self::from_json(value)
    }
}

/// Structured error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolError {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
}

impl From<&GatewayError> for ToolError {
    fn from(err: &GatewayError) -> Self {
        let message = match err {
            GatewayError::PolicyDenied { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        Self {
            kind: err.kind().to_string(),
            message,
            layer: err.layer().map(|l| l.as_str().to_string()),
        }
    }
}

/// What every tool call returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolResponse {
    pub fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(err: &GatewayError) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(err.into()),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({
                "ok": false,
                "error": {"kind": "internal", "message": e.to_string()},
            })
        })
    }
}

/// Run one tool call against the guard.
pub fn dispatch<C: Collection>(guard: &mut DeckGuard<C>, call: ToolCall) -> ToolResponse {
    match run(guard, call) {
        Ok(result) => ToolResponse::success(result),
        Err(e) => {
            debug!(kind = e.kind(), error = %e, "tool call failed");
            ToolResponse::failure(&e)
        }
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, GatewayError> {
    Ok(serde_json::to_value(value)?)
}

fn run<C: Collection>(guard: &mut DeckGuard<C>, call: ToolCall) -> Result<Value, GatewayError> {
    match call {
        ToolCall::GetPermissions {} => to_value(guard.get_permissions()),
        ToolCall::ListDecks {} => to_value(guard.list_decks()?),
        ToolCall::GetDeckInfo { deck_name } => to_value(guard.get_deck_info(&deck_name)?),
        ToolCall::SearchNotes { query, limit } => to_value(guard.search_notes(&query, limit)?),
        ToolCall::GetNote { note_id } => to_value(guard.get_note(note_id)?),
        ToolCall::GetCardsForNote { note_id } => to_value(guard.get_cards_for_note(note_id)?),
        ToolCall::GetReviewStats { deck_name } => {
            to_value(guard.get_review_stats(deck_name.as_deref())?)
        }
        ToolCall::ListNoteTypes {} => to_value(guard.list_note_types()?),
        ToolCall::CreateDeck { deck_name } => to_value(guard.create_deck(&deck_name)?),
        ToolCall::UpdateDeck {
            deck_name,
            new_name,
            description,
        } => to_value(guard.update_deck(
            &deck_name,
            &DeckUpdate {
                new_name,
                description,
            },
        )?),
        ToolCall::DeleteDeck { deck_name } => {
            let removed = guard.delete_deck(&deck_name)?;
            Ok(serde_json::json!({ "deleted": deck_name, "notes_removed": removed }))
        }
        ToolCall::CreateNote {
            deck_name,
            model_name,
            fields,
            tags,
        } => to_value(guard.create_note(NewNote {
            note_type: model_name,
            deck: deck_name,
            fields,
            tags,
        })?),
        ToolCall::UpdateNote {
            note_id,
            fields,
            tags,
        } => to_value(guard.update_note(note_id, &NoteUpdate { fields, tags })?),
        ToolCall::DeleteNote { note_id } => {
            guard.delete_note(note_id)?;
            Ok(serde_json::json!({ "deleted": note_id }))
        }
        ToolCall::CreateNoteType {
            name,
            fields,
            templates,
        } => to_value(guard.create_note_type(NoteTypeRecord {
            name,
            fields,
            templates,
        })?),
        ToolCall::UpdateNoteType { name, fields } => {
            to_value(guard.update_note_type(&name, fields)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_calls_with_and_without_arguments() {
        assert_eq!(
            ToolCall::from_json(json!({"name": "list_decks"})).unwrap(),
            ToolCall::ListDecks {}
        );
        assert_eq!(
            ToolCall::from_json(json!({"name": "list_decks", "arguments": {}})).unwrap(),
            ToolCall::ListDecks {}
        );
        assert_eq!(
            ToolCall::from_json(json!({"name": "search_notes", "arguments": {"query": "deck:Spanish"}}))
                .unwrap(),
            ToolCall::SearchNotes {
                query: "deck:Spanish".to_string(),
                limit: DEFAULT_SEARCH_LIMIT,
            }
        );
    }

    #[test]
    fn review_stats_deck_is_optional() {
        assert_eq!(
            ToolCall::from_json(json!({"name": "get_review_stats"})).unwrap(),
            ToolCall::GetReviewStats { deck_name: None }
        );
        assert_eq!(
            ToolCall::from_json(json!({"name": "get_review_stats", "arguments": {"deck_name": "Spanish"}}))
                .unwrap(),
            ToolCall::GetReviewStats {
                deck_name: Some("Spanish".to_string()),
            }
        );
    }

    #[test]
    fn unknown_tool_is_reported_by_name() {
        match ToolCall::from_json(json!({"name": "drop_database"})) {
            Err(GatewayError::UnknownTool(name)) => assert_eq!(name, "drop_database"),
            other => panic!("expected UnknownTool, got {:?}", other),
        }
    }

    #[test]
    fn missing_required_argument_is_invalid() {
        let err = ToolCall::parse(r#"{"name": "get_note", "arguments": {}}"#).unwrap_err();
        assert_eq!(err.kind(), "invalid_arguments");
        assert!(err.to_string().contains("note_id"));
    }

    #[test]
    fn every_listed_tool_decodes() {
        let args = json!({
            "deck_name": "Spanish",
            "note_id": 1,
            "model_name": "Basic",
            "fields": {},
            "name": "Basic",
        });
        for name in TOOL_NAMES {
            let mut arguments = args.clone();
            if matches!(*name, "create_note_type" | "update_note_type") {
                arguments["fields"] = json!(["Front"]);
            }
            assert!(
                ToolCall::from_json(json!({"name": name, "arguments": arguments})).is_ok(),
                "{} did not decode",
                name
            );
        }
    }

    #[test]
    fn denial_body_carries_layer() {
        let err = GatewayError::PolicyDenied {
            layer: dg_policy::PolicyLayer::ProtectedDecks,
            reason: "protected_decks: deck is protected".to_string(),
        };
        let body = ToolResponse::failure(&err).to_json();
        assert_eq!(body["ok"], json!(false));
        assert_eq!(body["error"]["kind"], json!("permission_denied"));
        assert_eq!(body["error"]["layer"], json!("protected_decks"));
        assert!(body.get("result").is_none());
    }
}
