// normalize.rs — Turn a raw policy file into a safe PolicyConfig.
//
// Ill-formed or incomplete input is repaired here, never in the engine:
//
// - Missing `mode` → denylist. Unknown `mode` → denylist with the deny list
//   cleared ("no explicit restriction"); global flags still gate everything.
// - Missing global flags → read on, write off, delete off. A typo must never
//   grant mutation.
// - Missing `protected_decks` → ["Default"], the add-on's own default.
// - Missing note-type flags → allowed (global.write still gates them).
// - Blank entries are dropped and duplicates removed (first one kept).
// - A tag that is both protected and read-only stays protected only.
//
// Every adjustment to something the file actually said is reported as a
// warning; filling in an absent field is reported too so operators can see
// what the effective policy is.

use std::collections::{BTreeSet, HashSet};

use dg_policy::{
    DeckPatternLists, GlobalPermissions, Mode, NoteTypePermissions, PolicyConfig,
    TagRestrictions,
};

use crate::raw::RawPermissions;

/// Deck name the add-on protects when the file does not say otherwise.
pub const DEFAULT_PROTECTED_DECK: &str = "Default";

/// A normalized configuration plus what was changed to get there.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub config: PolicyConfig,
    pub warnings: Vec<String>,
}

/// Normalize a raw permissions block.
pub fn normalize(raw: RawPermissions) -> Normalized {
    let mut warnings = Vec::new();

    let global = raw.global.unwrap_or_default();
    let global = GlobalPermissions {
        read: flag(global.read, "global.read", true, &mut warnings),
        write: flag(global.write, "global.write", false, &mut warnings),
        delete: flag(global.delete, "global.delete", false, &mut warnings),
    };

    let lists = raw.deck_permissions.unwrap_or_default();
    let mut deck_permissions = DeckPatternLists {
        allow: clean_list(lists.allowlist, "deck_permissions.allowlist", &mut warnings),
        deny: clean_list(lists.denylist, "deck_permissions.denylist", &mut warnings),
    };

    let mode = match raw.mode.as_deref().map(str::trim) {
        None => {
            warnings.push("mode not set; using denylist".to_string());
            Mode::Denylist
        }
        Some(value) => match value.to_ascii_lowercase().parse::<Mode>() {
            Ok(mode) => mode,
            Err(_) => {
                warnings.push(format!(
                    "unknown mode '{}'; using denylist with an empty deny list",
                    value
                ));
                deck_permissions.deny.clear();
                Mode::Denylist
            }
        },
    };
    if mode == Mode::Allowlist && deck_permissions.allow.is_empty() {
        warnings.push("allowlist mode with an empty allowlist denies every deck".to_string());
    }

    let protected_decks: BTreeSet<String> = match raw.protected_decks {
        Some(decks) => clean_list(Some(decks), "protected_decks", &mut warnings)
            .into_iter()
            .collect(),
        None => BTreeSet::from([DEFAULT_PROTECTED_DECK.to_string()]),
    };

    let tags = raw.tag_restrictions.unwrap_or_default();
    let protected_tags: BTreeSet<String> = clean_list(
        tags.protected_tags,
        "tag_restrictions.protected_tags",
        &mut warnings,
    )
    .into_iter()
    .collect();
    let mut readonly_tags = BTreeSet::new();
    for tag in clean_list(
        tags.readonly_tags,
        "tag_restrictions.readonly_tags",
        &mut warnings,
    ) {
        if protected_tags.contains(&tag) {
            warnings.push(format!(
                "tag '{}' is both protected and read-only; keeping it protected",
                tag
            ));
        } else {
            readonly_tags.insert(tag);
        }
    }

    let note_types = raw.note_type_permissions.unwrap_or_default();
    let note_type_permissions = NoteTypePermissions {
        allow_create: flag(
            note_types.allow_create,
            "note_type_permissions.allow_create",
            true,
            &mut warnings,
        ),
        allow_modify: flag(
            note_types.allow_modify,
            "note_type_permissions.allow_modify",
            true,
            &mut warnings,
        ),
        allowed_types: clean_list(
            note_types.allowed_types,
            "note_type_permissions.allowed_types",
            &mut warnings,
        )
        .into_iter()
        .collect(),
    };

    Normalized {
        config: PolicyConfig {
            mode,
            global,
            deck_permissions,
            protected_decks,
            tag_restrictions: TagRestrictions {
                protected_tags,
                readonly_tags,
            },
            note_type_permissions,
        },
        warnings,
    }
}

fn flag(value: Option<bool>, name: &str, default: bool, warnings: &mut Vec<String>) -> bool {
    match value {
        Some(v) => v,
        None => {
            warnings.push(format!("{} not set; defaulting to {}", name, default));
            default
        }
    }
}

/// Drop blank entries and duplicates, keeping the first occurrence's position.
fn clean_list(list: Option<Vec<String>>, name: &str, warnings: &mut Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in list.unwrap_or_default() {
        if entry.trim().is_empty() {
            warnings.push(format!("{}: dropped blank entry", name));
            continue;
        }
        if !seen.insert(entry.clone()) {
            warnings.push(format!("{}: dropped duplicate '{}'", name, entry));
            continue;
        }
        out.push(entry);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{RawDeckLists, RawGlobal, RawNoteTypes, RawTagRestrictions};

    fn full_raw() -> RawPermissions {
        RawPermissions {
            mode: Some("allowlist".to_string()),
            global: Some(RawGlobal {
                read: Some(true),
                write: Some(true),
                delete: Some(true),
            }),
            deck_permissions: Some(RawDeckLists {
                allowlist: Some(vec!["Spanish".into(), "Study::*".into()]),
                denylist: Some(vec![]),
            }),
            protected_decks: Some(vec!["Core 2000".into()]),
            tag_restrictions: Some(RawTagRestrictions {
                protected_tags: Some(vec!["exam".into()]),
                readonly_tags: Some(vec!["archive".into()]),
            }),
            note_type_permissions: Some(RawNoteTypes {
                allow_create: Some(false),
                allow_modify: Some(true),
                allowed_types: Some(vec!["Basic".into()]),
            }),
        }
    }

    #[test]
    fn complete_input_passes_through_without_warnings() {
        let normalized = normalize(full_raw());
        assert!(normalized.warnings.is_empty(), "{:?}", normalized.warnings);
        let config = normalized.config;
        assert_eq!(config.mode, Mode::Allowlist);
        assert_eq!(config.global, GlobalPermissions::all());
        assert_eq!(config.deck_permissions.allow, vec!["Spanish", "Study::*"]);
        assert_eq!(
            config.protected_decks,
            BTreeSet::from(["Core 2000".to_string()])
        );
        assert!(!config.note_type_permissions.allow_create);
    }

    #[test]
    fn empty_input_is_read_only_denylist() {
        let normalized = normalize(RawPermissions::default());
        let config = normalized.config;
        assert_eq!(config.mode, Mode::Denylist);
        assert_eq!(config.global, GlobalPermissions::read_only());
        assert_eq!(
            config.protected_decks,
            BTreeSet::from([DEFAULT_PROTECTED_DECK.to_string()])
        );
        assert!(config.note_type_permissions.allow_create);
        assert!(config.note_type_permissions.allow_modify);
        assert!(normalized
            .warnings
            .iter()
            .any(|w| w.contains("global.write not set")));
    }

    #[test]
    fn unknown_mode_falls_back_to_empty_denylist() {
        let mut raw = full_raw();
        raw.mode = Some("blocklist".to_string());
        raw.deck_permissions = Some(RawDeckLists {
            allowlist: Some(vec!["Spanish".into()]),
            denylist: Some(vec!["Personal::*".into()]),
        });
        let normalized = normalize(raw);
        assert_eq!(normalized.config.mode, Mode::Denylist);
        assert!(normalized.config.deck_permissions.deny.is_empty());
        // Global flags from the file still apply.
        assert_eq!(normalized.config.global, GlobalPermissions::all());
        assert!(normalized.warnings.iter().any(|w| w.contains("unknown mode 'blocklist'")));
    }

    #[test]
    fn mode_is_case_insensitive() {
        let mut raw = full_raw();
        raw.mode = Some(" AllowList ".to_string());
        assert_eq!(normalize(raw).config.mode, Mode::Allowlist);
    }

    #[test]
    fn missing_mutation_flags_never_grant() {
        let mut raw = full_raw();
        raw.global = Some(RawGlobal {
            read: None,
            write: None,
            delete: None,
        });
        let config = normalize(raw).config;
        assert!(config.global.read);
        assert!(!config.global.write);
        assert!(!config.global.delete);
    }

    #[test]
    fn explicit_empty_protected_decks_is_respected() {
        let mut raw = full_raw();
        raw.protected_decks = Some(vec![]);
        assert!(normalize(raw).config.protected_decks.is_empty());
    }

    #[test]
    fn overlapping_tags_stay_protected() {
        let mut raw = full_raw();
        raw.tag_restrictions = Some(RawTagRestrictions {
            protected_tags: Some(vec!["exam".into()]),
            readonly_tags: Some(vec!["exam".into(), "archive".into()]),
        });
        let normalized = normalize(raw);
        let tags = &normalized.config.tag_restrictions;
        assert!(tags.protected_tags.contains("exam"));
        assert!(!tags.readonly_tags.contains("exam"));
        assert!(tags.readonly_tags.contains("archive"));
        assert_eq!(normalized.warnings.len(), 1);
    }

    #[test]
    fn blank_and_duplicate_entries_dropped_in_order() {
        let mut raw = full_raw();
        raw.deck_permissions = Some(RawDeckLists {
            allowlist: Some(vec![
                "Study::*".into(),
                "  ".into(),
                "Spanish".into(),
                "Study::*".into(),
            ]),
            denylist: None,
        });
        let normalized = normalize(raw);
        assert_eq!(
            normalized.config.deck_permissions.allow,
            vec!["Study::*", "Spanish"]
        );
        assert_eq!(normalized.warnings.len(), 2);
    }

    #[test]
    fn empty_allowlist_is_flagged() {
        let mut raw = full_raw();
        raw.deck_permissions = None;
        let normalized = normalize(raw);
        assert_eq!(normalized.config.mode, Mode::Allowlist);
        assert!(normalized
            .warnings
            .iter()
            .any(|w| w.contains("denies every deck")));
    }
}
