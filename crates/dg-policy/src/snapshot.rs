// snapshot.rs — Read-only projection of the active policy.
//
// Agents can ask what they are allowed to do. `describe()` answers with a
// structural copy of the configuration, flattened for display. There is no
// decision logic here.

use serde::{Deserialize, Serialize};

use crate::config::{GlobalPermissions, Mode, NoteTypePermissions, PolicyConfig};

/// Everything a calling agent may see about the current policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicySnapshot {
    pub mode: Mode,
    pub global_permissions: GlobalPermissions,
    pub deck_allowlist: Vec<String>,
    pub deck_denylist: Vec<String>,
    pub protected_decks: Vec<String>,
    pub protected_tags: Vec<String>,
    pub readonly_tags: Vec<String>,
    pub note_type_permissions: NoteTypePermissions,
}

/// Copy a configuration into its display form.
pub fn describe(config: &PolicyConfig) -> PolicySnapshot {
    PolicySnapshot {
        mode: config.mode,
        global_permissions: config.global,
        deck_allowlist: config.deck_permissions.allow.clone(),
        deck_denylist: config.deck_permissions.deny.clone(),
        protected_decks: config.protected_decks.iter().cloned().collect(),
        protected_tags: config
            .tag_restrictions
            .protected_tags
            .iter()
            .cloned()
            .collect(),
        readonly_tags: config
            .tag_restrictions
            .readonly_tags
            .iter()
            .cloned()
            .collect(),
        note_type_permissions: config.note_type_permissions.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_copies_every_field() {
        let mut config = PolicyConfig::permissive()
            .with_global(GlobalPermissions::read_only())
            .with_denylist(["Personal"])
            .with_allowlist(["Spanish"])
            .with_protected_decks(["Default"])
            .with_protected_tags(["exam"])
            .with_readonly_tags(["archive"]);
        config.note_type_permissions.allowed_types.insert("Basic".to_string());

        let snapshot = describe(&config);
        assert_eq!(snapshot.mode, Mode::Allowlist);
        assert!(snapshot.global_permissions.read);
        assert!(!snapshot.global_permissions.write);
        assert_eq!(snapshot.deck_allowlist, vec!["Spanish"]);
        assert_eq!(snapshot.deck_denylist, vec!["Personal"]);
        assert_eq!(snapshot.protected_decks, vec!["Default"]);
        assert_eq!(snapshot.protected_tags, vec!["exam"]);
        assert_eq!(snapshot.readonly_tags, vec!["archive"]);
        assert!(snapshot.note_type_permissions.allowed_types.contains("Basic"));
    }

    #[test]
    fn snapshot_json_uses_display_names() {
        let json = serde_json::to_value(describe(&PolicyConfig::permissive())).unwrap();
        assert_eq!(json["mode"], "denylist");
        assert_eq!(json["global_permissions"]["delete"], true);
        assert!(json["deck_allowlist"].as_array().unwrap().is_empty());
        assert_eq!(json["note_type_permissions"]["allow_create"], true);
    }
}
