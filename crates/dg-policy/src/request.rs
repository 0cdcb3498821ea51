// request.rs — Operation requests submitted to the engine.
//
// The tool-dispatch layer builds one OperationRequest per item it wants to
// touch, with the deck name, tags and note type already fetched from the
// collection. Only the fields relevant to the operation kind are set; the
// engine ignores the rest.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// What the agent is trying to do.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Read a deck, a note, or a note-type definition.
    Read,
    /// Create or update a deck or note.
    Write,
    /// Remove a deck or note.
    Delete,
    /// Define a new note type.
    CreateNoteType,
    /// Change an existing note-type definition.
    ModifyNoteType,
}

impl OperationKind {
    /// Stable name used in reasons, traces and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Read => "read",
            OperationKind::Write => "write",
            OperationKind::Delete => "delete",
            OperationKind::CreateNoteType => "create_note_type",
            OperationKind::ModifyNoteType => "modify_note_type",
        }
    }

    /// Whether the operation changes or removes existing data.
    pub fn is_mutation(&self) -> bool {
        matches!(self, OperationKind::Write | OperationKind::Delete)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = PolicyError;

    /// Accepts both `snake_case` and `kebab-case` names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "read" => Ok(OperationKind::Read),
            "write" => Ok(OperationKind::Write),
            "delete" => Ok(OperationKind::Delete),
            "create_note_type" => Ok(OperationKind::CreateNoteType),
            "modify_note_type" => Ok(OperationKind::ModifyNoteType),
            _ => Err(PolicyError::UnknownOperation {
                value: s.to_string(),
            }),
        }
    }
}

/// A request to perform one operation on one target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationRequest {
    pub kind: OperationKind,
    /// Target deck, or the deck a targeted note lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck: Option<String>,
    /// Tags of the targeted note. `None` is the same as no tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    /// Note type of the targeted note, or the note type itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_type: Option<String>,
}

impl OperationRequest {
    /// A bare request with no target fields set.
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            deck: None,
            tags: None,
            note_type: None,
        }
    }

    pub fn read_deck(deck: impl Into<String>) -> Self {
        Self::new(OperationKind::Read).in_deck(deck)
    }

    pub fn write_deck(deck: impl Into<String>) -> Self {
        Self::new(OperationKind::Write).in_deck(deck)
    }

    pub fn delete_deck(deck: impl Into<String>) -> Self {
        Self::new(OperationKind::Delete).in_deck(deck)
    }

    pub fn create_note_type(name: impl Into<String>) -> Self {
        Self::new(OperationKind::CreateNoteType).of_type(name)
    }

    pub fn modify_note_type(name: impl Into<String>) -> Self {
        Self::new(OperationKind::ModifyNoteType).of_type(name)
    }

    pub fn in_deck(mut self, deck: impl Into<String>) -> Self {
        self.deck = Some(deck.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn of_type(mut self, note_type: impl Into<String>) -> Self {
        self.note_type = Some(note_type.into());
        self
    }

    /// The note's tags, empty when none were supplied.
    pub fn tag_iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().flatten().map(String::as_str)
    }

    /// Short human-readable description for logs, e.g. `write deck 'Spanish'`.
    pub fn describe_target(&self) -> String {
        let mut out = self.kind.as_str().to_string();
        if let Some(deck) = &self.deck {
            out.push_str(&format!(" deck '{}'", deck));
        }
        if let Some(note_type) = &self.note_type {
            out.push_str(&format!(" note type '{}'", note_type));
        }
        out
    }
}
