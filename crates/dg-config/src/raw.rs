// raw.rs — Policy file shapes as written on disk.
//
// Every field is optional here: what a missing field means is decided in
// normalize.rs, not by serde defaults, so the loader can report it.
//
// The add-on's config.json nests everything under a `permissions` key next
// to unrelated settings (host, port). Standalone policy files may drop that
// wrapper. RawDocument accepts both.

use serde::Deserialize;

/// A whole policy file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub permissions: Option<RawPermissions>,
    /// Top-level permission keys, for files without the wrapper.
    #[serde(flatten)]
    pub bare: RawPermissions,
}

impl RawDocument {
    /// The permissions block, wrapped or bare. The wrapper wins if both exist.
    pub fn into_permissions(self) -> RawPermissions {
        self.permissions.unwrap_or(self.bare)
    }
}

/// The `permissions` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPermissions {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub global: Option<RawGlobal>,
    #[serde(default)]
    pub deck_permissions: Option<RawDeckLists>,
    #[serde(default)]
    pub protected_decks: Option<Vec<String>>,
    #[serde(default)]
    pub tag_restrictions: Option<RawTagRestrictions>,
    #[serde(default)]
    pub note_type_permissions: Option<RawNoteTypes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGlobal {
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub write: Option<bool>,
    #[serde(default)]
    pub delete: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDeckLists {
    #[serde(default)]
    pub allowlist: Option<Vec<String>>,
    #[serde(default)]
    pub denylist: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTagRestrictions {
    #[serde(default)]
    pub protected_tags: Option<Vec<String>>,
    #[serde(default)]
    pub readonly_tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNoteTypes {
    #[serde(default)]
    pub allow_create: Option<bool>,
    #[serde(default)]
    pub allow_modify: Option<bool>,
    #[serde(default)]
    pub allowed_types: Option<Vec<String>>,
}
