// config.rs — Policy configuration model.
//
// A PolicyConfig is one immutable snapshot of every rule layer. It is built
// by a loader (see dg-config) and never mutated while evaluations are in
// flight; reloads build a new value and swap it in through PolicyStore.
//
// The serde shape matches the add-on's `permissions` block field for field,
// so a snapshot can be written back out and compared with its source.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::PolicyError;

/// The outermost gate: if a flag is off, the matching operations are
/// impossible regardless of every other layer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalPermissions {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
}

impl GlobalPermissions {
    /// All three flags on.
    pub fn all() -> Self {
        Self {
            read: true,
            write: true,
            delete: true,
        }
    }

    /// Reading only; nothing can be created, changed, or removed.
    pub fn read_only() -> Self {
        Self {
            read: true,
            write: false,
            delete: false,
        }
    }
}

/// How the deck pattern lists are interpreted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Only decks matching an `allow` pattern are reachable.
    Allowlist,
    /// Every deck is reachable except those matching a `deny` pattern.
    #[default]
    Denylist,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Allowlist => write!(f, "allowlist"),
            Mode::Denylist => write!(f, "denylist"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allowlist" => Ok(Mode::Allowlist),
            "denylist" => Ok(Mode::Denylist),
            other => Err(PolicyError::UnknownMode {
                value: other.to_string(),
            }),
        }
    }
}

/// Ordered deck-name patterns. Only the list selected by [`Mode`] is consulted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeckPatternLists {
    #[serde(rename = "allowlist")]
    pub allow: Vec<String>,
    #[serde(rename = "denylist")]
    pub deny: Vec<String>,
}

/// Tag-scoped overrides. Both kinds block write and delete; neither blocks read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagRestrictions {
    pub protected_tags: BTreeSet<String>,
    pub readonly_tags: BTreeSet<String>,
}

/// Rules for note-type definitions and for which types notes may use.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteTypePermissions {
    pub allow_create: bool,
    pub allow_modify: bool,
    /// Empty means every note type is allowed.
    pub allowed_types: BTreeSet<String>,
}

impl NoteTypePermissions {
    /// Whether `note_type` passes the `allowed_types` restriction.
    pub fn permits_type(&self, note_type: &str) -> bool {
        self.allowed_types.is_empty() || self.allowed_types.contains(note_type)
    }
}

/// One complete, immutable policy snapshot.
///
/// `Default` is fully locked down: every global flag is off, so every
/// request is denied until a loader supplies real settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyConfig {
    pub mode: Mode,
    pub global: GlobalPermissions,
    pub deck_permissions: DeckPatternLists,
    pub protected_decks: BTreeSet<String>,
    pub tag_restrictions: TagRestrictions,
    pub note_type_permissions: NoteTypePermissions,
}

impl PolicyConfig {
    /// Everything allowed: all global flags on, denylist mode with nothing
    /// listed, nothing protected, note-type changes permitted.
    pub fn permissive() -> Self {
        Self {
            mode: Mode::Denylist,
            global: GlobalPermissions::all(),
            deck_permissions: DeckPatternLists::default(),
            protected_decks: BTreeSet::new(),
            tag_restrictions: TagRestrictions::default(),
            note_type_permissions: NoteTypePermissions {
                allow_create: true,
                allow_modify: true,
                allowed_types: BTreeSet::new(),
            },
        }
    }

    pub fn with_global(mut self, global: GlobalPermissions) -> Self {
        self.global = global;
        self
    }

    /// Switch to allowlist mode with the given patterns.
    pub fn with_allowlist<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mode = Mode::Allowlist;
        self.deck_permissions.allow = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Switch to denylist mode with the given patterns.
    pub fn with_denylist<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mode = Mode::Denylist;
        self.deck_permissions.deny = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_protected_decks<I, S>(mut self, decks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_decks = decks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_protected_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_restrictions.protected_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_readonly_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_restrictions.readonly_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_note_types(mut self, note_types: NoteTypePermissions) -> Self {
        self.note_type_permissions = note_types;
        self
    }

    /// The pattern list that the active mode consults.
    pub fn active_patterns(&self) -> &[String] {
        match self.mode {
            Mode::Allowlist => &self.deck_permissions.allow,
            Mode::Denylist => &self.deck_permissions.deny,
        }
    }

    /// Lowercase hex SHA-256 of the canonical JSON encoding.
    ///
    /// Sets are ordered and lists keep their order, so equal configs always
    /// produce equal fingerprints.
    pub fn fingerprint(&self) -> Result<String, PolicyError> {
        let canonical = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(format!("{:x}", hasher.finalize()))
    }
}
