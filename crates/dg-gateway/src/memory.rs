// memory.rs — In-memory Collection for tests and local experiments.
//
// Search supports a small subset of the desktop query language: terms are
// separated by whitespace and all must match.
//
//   deck:NAME    card in NAME or a subdeck (`*` allowed in NAME)
//   tag:NAME     note has the tag (case-insensitive)
//   note:NAME    note type is NAME
//   anything     case-insensitive substring of some field
//
// An empty query or `*` matches every note.

use std::collections::{BTreeMap, BTreeSet};

use dg_policy::matches;

use crate::collection::{
    is_within, CardRecord, CardState, Collection, DeckSummary, DeckUpdate, NewNote, NoteId,
    NoteRecord, NoteTypeRecord, NoteUpdate,
};
use crate::error::CollectionError;

#[derive(Debug, Clone)]
struct DeckEntry {
    id: i64,
    description: String,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCollection {
    decks: BTreeMap<String, DeckEntry>,
    notes: BTreeMap<NoteId, NoteRecord>,
    cards: BTreeMap<i64, CardRecord>,
    note_types: BTreeMap<String, NoteTypeRecord>,
    next_id: i64,
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Builder: add a deck.
    pub fn with_deck(mut self, name: &str) -> Self {
        self.insert_deck(name);
        self
    }

    /// Builder: add a note type with the given fields and no templates.
    pub fn with_note_type(mut self, name: &str, fields: &[&str]) -> Self {
        self.note_types.insert(
            name.to_string(),
            NoteTypeRecord {
                name: name.to_string(),
                fields: fields.iter().map(|f| f.to_string()).collect(),
                templates: Vec::new(),
            },
        );
        self
    }

    /// Insert a note whose cards are spread over `decks`, creating any
    /// missing decks. Returns the new note's id.
    pub fn insert_note(
        &mut self,
        note_type: &str,
        decks: &[&str],
        fields: &[(&str, &str)],
        tags: &[&str],
    ) -> NoteId {
        for deck in decks {
            self.insert_deck(deck);
        }
        let id = self.allocate_id();
        self.notes.insert(
            id,
            NoteRecord {
                id,
                note_type: note_type.to_string(),
                fields: fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                decks: decks.iter().map(|d| d.to_string()).collect(),
            },
        );
        for deck in decks {
            self.insert_card(id, deck);
        }
        id
    }

    /// Set the review progress of `note`'s card in `deck`. Returns false if
    /// there is no such card.
    pub fn set_card_progress(
        &mut self,
        note: NoteId,
        deck: &str,
        state: CardState,
        interval: u32,
    ) -> bool {
        let Some(card) = self
            .cards
            .values_mut()
            .find(|c| c.note_id == note && c.deck == deck)
        else {
            return false;
        };
        card.state = state;
        card.interval = interval;
        if state != CardState::New {
            card.reviews += 1;
        }
        true
    }

    fn insert_card(&mut self, note_id: NoteId, deck: &str) {
        let id = self.allocate_id();
        self.cards.insert(
            id,
            CardRecord {
                id,
                note_id,
                deck: deck.to_string(),
                state: CardState::New,
                interval: 0,
                reviews: 0,
                lapses: 0,
            },
        );
    }

    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    fn insert_deck(&mut self, name: &str) -> i64 {
        if let Some(entry) = self.decks.get(name) {
            return entry.id;
        }
        let id = self.allocate_id();
        self.decks.insert(
            name.to_string(),
            DeckEntry {
                id,
                description: String::new(),
            },
        );
        id
    }

    fn summary(&self, name: &str, entry: &DeckEntry) -> DeckSummary {
        DeckSummary {
            id: entry.id,
            name: name.to_string(),
            description: entry.description.clone(),
            note_count: self
                .notes
                .values()
                .filter(|n| n.decks.contains(name))
                .count(),
        }
    }

    fn deck_names_within(&self, root: &str) -> Vec<String> {
        self.decks
            .keys()
            .filter(|name| is_within(name, root))
            .cloned()
            .collect()
    }
}

fn term_matches(note: &NoteRecord, term: &str) -> bool {
    if let Some(deck) = term.strip_prefix("deck:") {
        return note
            .decks
            .iter()
            .any(|d| is_within(d, deck) || matches(d, deck));
    }
    if let Some(tag) = term.strip_prefix("tag:") {
        return note.tags.iter().any(|t| t.eq_ignore_ascii_case(tag));
    }
    if let Some(note_type) = term.strip_prefix("note:") {
        return note.note_type == note_type;
    }
    let needle = term.to_lowercase();
    note.fields
        .values()
        .any(|value| value.to_lowercase().contains(&needle))
}

impl Collection for InMemoryCollection {
    fn decks(&self) -> Result<Vec<DeckSummary>, CollectionError> {
        Ok(self
            .decks
            .iter()
            .map(|(name, entry)| self.summary(name, entry))
            .collect())
    }

    fn deck(&self, name: &str) -> Result<Option<DeckSummary>, CollectionError> {
        Ok(self.decks.get(name).map(|entry| self.summary(name, entry)))
    }

    fn search_notes(&self, query: &str) -> Result<Vec<NoteRecord>, CollectionError> {
        let terms: Vec<&str> = query
            .split_whitespace()
            .filter(|term| *term != "*")
            .collect();
        Ok(self
            .notes
            .values()
            .filter(|note| terms.iter().all(|term| term_matches(note, term)))
            .cloned()
            .collect())
    }

    fn notes_in_deck(&self, deck: &str) -> Result<Vec<NoteRecord>, CollectionError> {
        Ok(self
            .notes
            .values()
            .filter(|note| note.decks.iter().any(|d| is_within(d, deck)))
            .cloned()
            .collect())
    }

    fn note(&self, id: NoteId) -> Result<Option<NoteRecord>, CollectionError> {
        Ok(self.notes.get(&id).cloned())
    }

    fn note_types(&self) -> Result<Vec<NoteTypeRecord>, CollectionError> {
        Ok(self.note_types.values().cloned().collect())
    }

    fn cards_for_note(&self, id: NoteId) -> Result<Vec<CardRecord>, CollectionError> {
        if !self.notes.contains_key(&id) {
            return Err(CollectionError::NotFound {
                kind: "note",
                name: id.to_string(),
            });
        }
        Ok(self
            .cards
            .values()
            .filter(|card| card.note_id == id)
            .cloned()
            .collect())
    }

    fn cards(&self, deck: Option<&str>) -> Result<Vec<CardRecord>, CollectionError> {
        Ok(self
            .cards
            .values()
            .filter(|card| match deck {
                Some(root) => is_within(&card.deck, root),
                None => true,
            })
            .cloned()
            .collect())
    }

    fn create_deck(&mut self, name: &str) -> Result<DeckSummary, CollectionError> {
        if name.trim().is_empty() {
            return Err(CollectionError::Invalid("deck name is empty".to_string()));
        }
        if self.decks.contains_key(name) {
            return Err(CollectionError::AlreadyExists {
                kind: "deck",
                name: name.to_string(),
            });
        }
        self.insert_deck(name);
        self.deck(name)?.ok_or_else(|| CollectionError::NotFound {
            kind: "deck",
            name: name.to_string(),
        })
    }

    fn update_deck(
        &mut self,
        name: &str,
        update: &DeckUpdate,
    ) -> Result<DeckSummary, CollectionError> {
        if !self.decks.contains_key(name) {
            return Err(CollectionError::NotFound {
                kind: "deck",
                name: name.to_string(),
            });
        }

        let mut current = name.to_string();
        if let Some(new_name) = update.new_name.as_deref().filter(|n| *n != name) {
            if new_name.trim().is_empty() {
                return Err(CollectionError::Invalid("deck name is empty".to_string()));
            }
            if is_within(new_name, name) {
                return Err(CollectionError::Invalid(format!(
                    "cannot move deck '{}' into its own subdeck '{}'",
                    name, new_name
                )));
            }

            // Every name the subtree would take must be free before anything moves.
            let renames: Vec<(String, String)> = self
                .deck_names_within(name)
                .into_iter()
                .map(|old| {
                    let renamed = format!("{}{}", new_name, &old[name.len()..]);
                    (old, renamed)
                })
                .collect();
            if let Some((_, taken)) = renames
                .iter()
                .find(|(_, renamed)| self.decks.contains_key(renamed))
            {
                return Err(CollectionError::AlreadyExists {
                    kind: "deck",
                    name: taken.clone(),
                });
            }

            let moved: Vec<(String, DeckEntry)> = renames
                .iter()
                .filter_map(|(old, renamed)| {
                    self.decks.remove(old).map(|entry| (renamed.clone(), entry))
                })
                .collect();
            self.decks.extend(moved);
            for (old, renamed) in &renames {
                for note in self.notes.values_mut() {
                    if note.decks.remove(old) {
                        note.decks.insert(renamed.clone());
                    }
                }
                for card in self.cards.values_mut().filter(|c| &c.deck == old) {
                    card.deck = renamed.clone();
                }
            }
            current = new_name.to_string();
        }

        if let Some(description) = &update.description {
            if let Some(entry) = self.decks.get_mut(&current) {
                entry.description = description.clone();
            }
        }

        self.deck(&current)?.ok_or(CollectionError::NotFound {
            kind: "deck",
            name: current,
        })
    }

    fn delete_deck(&mut self, name: &str) -> Result<usize, CollectionError> {
        let doomed: BTreeSet<String> = self.deck_names_within(name).into_iter().collect();
        if doomed.is_empty() {
            return Err(CollectionError::NotFound {
                kind: "deck",
                name: name.to_string(),
            });
        }
        for deck in &doomed {
            self.decks.remove(deck);
        }

        self.cards.retain(|_, card| !doomed.contains(&card.deck));
        let before = self.notes.len();
        self.notes.retain(|_, note| {
            note.decks.retain(|d| !doomed.contains(d));
            !note.decks.is_empty()
        });
        Ok(before - self.notes.len())
    }

    fn add_note(&mut self, note: NewNote) -> Result<NoteRecord, CollectionError> {
        if !self.decks.contains_key(&note.deck) {
            return Err(CollectionError::NotFound {
                kind: "deck",
                name: note.deck,
            });
        }
        let Some(note_type) = self.note_types.get(&note.note_type) else {
            return Err(CollectionError::NotFound {
                kind: "note type",
                name: note.note_type,
            });
        };
        if let Some(unknown) = note
            .fields
            .keys()
            .find(|f| !note_type.fields.contains(f))
        {
            return Err(CollectionError::Invalid(format!(
                "field '{}' is not part of note type '{}'",
                unknown, note_type.name
            )));
        }

        let id = self.allocate_id();
        let record = NoteRecord {
            id,
            note_type: note.note_type,
            fields: note.fields,
            tags: note.tags,
            decks: BTreeSet::from([note.deck.clone()]),
        };
        self.notes.insert(id, record.clone());
        self.insert_card(id, &note.deck);
        Ok(record)
    }

    fn update_note(
        &mut self,
        id: NoteId,
        update: &NoteUpdate,
    ) -> Result<NoteRecord, CollectionError> {
        let note = self.notes.get_mut(&id).ok_or(CollectionError::NotFound {
            kind: "note",
            name: id.to_string(),
        })?;
        if let Some(fields) = &update.fields {
            for (name, value) in fields {
                note.fields.insert(name.clone(), value.clone());
            }
        }
        if let Some(tags) = &update.tags {
            note.tags = tags.clone();
        }
        Ok(note.clone())
    }

    fn delete_note(&mut self, id: NoteId) -> Result<(), CollectionError> {
        self.notes.remove(&id).ok_or(CollectionError::NotFound {
            kind: "note",
            name: id.to_string(),
        })?;
        self.cards.retain(|_, card| card.note_id != id);
        Ok(())
    }

    fn add_note_type(
        &mut self,
        note_type: NoteTypeRecord,
    ) -> Result<NoteTypeRecord, CollectionError> {
        if note_type.fields.is_empty() {
            return Err(CollectionError::Invalid(
                "note type needs at least one field".to_string(),
            ));
        }
        if self.note_types.contains_key(&note_type.name) {
            return Err(CollectionError::AlreadyExists {
                kind: "note type",
                name: note_type.name,
            });
        }
        self.note_types
            .insert(note_type.name.clone(), note_type.clone());
        Ok(note_type)
    }

    fn update_note_type(
        &mut self,
        name: &str,
        fields: Vec<String>,
    ) -> Result<NoteTypeRecord, CollectionError> {
        if fields.is_empty() {
            return Err(CollectionError::Invalid(
                "note type needs at least one field".to_string(),
            ));
        }
        let record = self
            .note_types
            .get_mut(name)
            .ok_or_else(|| CollectionError::NotFound {
                kind: "note type",
                name: name.to_string(),
            })?;
        record.fields = fields;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InMemoryCollection {
        let mut c = InMemoryCollection::new()
            .with_note_type("Basic", &["Front", "Back"])
            .with_deck("Default");
        c.insert_note(
            "Basic",
            &["Spanish::Verbs"],
            &[("Front", "hablar"), ("Back", "to speak")],
            &["verb"],
        );
        c.insert_note(
            "Basic",
            &["Spanish", "Personal::Diary"],
            &[("Front", "hola"), ("Back", "hello")],
            &["greeting", "Exam"],
        );
        c
    }

    #[test]
    fn search_terms_are_anded() {
        let c = sample();
        assert_eq!(c.search_notes("").unwrap().len(), 2);
        assert_eq!(c.search_notes("*").unwrap().len(), 2);
        assert_eq!(c.search_notes("deck:Spanish").unwrap().len(), 2);
        assert_eq!(c.search_notes("deck:Spanish tag:verb").unwrap().len(), 1);
        assert_eq!(c.search_notes("tag:exam").unwrap().len(), 1);
        assert_eq!(c.search_notes("HELLO").unwrap().len(), 1);
        assert_eq!(c.search_notes("deck:Personal::* hablar").unwrap().len(), 0);
    }

    #[test]
    fn rename_moves_subdecks_and_cards() {
        let mut c = sample();
        let update = DeckUpdate {
            new_name: Some("Español".to_string()),
            description: Some("renamed".to_string()),
        };
        let deck = c.update_deck("Spanish", &update).unwrap();
        assert_eq!(deck.name, "Español");
        assert_eq!(deck.description, "renamed");
        assert!(c.deck("Español::Verbs").unwrap().is_some());
        assert!(c.deck("Spanish::Verbs").unwrap().is_none());
        assert_eq!(c.notes_in_deck("Español").unwrap().len(), 2);
    }

    #[test]
    fn rename_onto_existing_subdeck_is_rejected_without_changes() {
        let mut c = InMemoryCollection::new()
            .with_deck("A")
            .with_deck("A::C")
            .with_deck("B::C");
        let target = c.deck("B::C").unwrap().unwrap();
        let update = DeckUpdate {
            new_name: Some("B".to_string()),
            description: None,
        };
        match c.update_deck("A", &update) {
            Err(CollectionError::AlreadyExists { kind, name }) => {
                assert_eq!(kind, "deck");
                assert_eq!(name, "B::C");
            }
            other => panic!("expected AlreadyExists, got {:?}", other),
        }
        assert_eq!(c.deck("B::C").unwrap(), Some(target));
        assert!(c.deck("A").unwrap().is_some());
        assert!(c.deck("A::C").unwrap().is_some());
        assert!(c.deck("B").unwrap().is_none());
    }

    #[test]
    fn rename_into_own_subdeck_is_invalid() {
        let mut c = sample();
        let update = DeckUpdate {
            new_name: Some("Spanish::Old".to_string()),
            description: None,
        };
        assert!(matches!(
            c.update_deck("Spanish", &update),
            Err(CollectionError::Invalid(_))
        ));
        assert!(c.deck("Spanish::Verbs").unwrap().is_some());
    }

    #[test]
    fn cards_follow_notes_through_renames_and_deletes() {
        let mut c = sample();
        let greeting = c.search_notes("hola").unwrap()[0].id;
        assert_eq!(c.cards(None).unwrap().len(), 3);
        assert_eq!(c.cards_for_note(greeting).unwrap().len(), 2);
        assert_eq!(c.cards(Some("Spanish")).unwrap().len(), 2);

        assert!(c.set_card_progress(greeting, "Spanish", CardState::Review, 30));
        assert!(!c.set_card_progress(greeting, "Default", CardState::Review, 30));

        let update = DeckUpdate {
            new_name: Some("Español".to_string()),
            description: None,
        };
        c.update_deck("Spanish", &update).unwrap();
        let moved = c.cards(Some("Español")).unwrap();
        assert_eq!(moved.len(), 2);
        assert!(moved
            .iter()
            .any(|card| card.note_id == greeting && card.state == CardState::Review));

        c.delete_deck("Español").unwrap();
        let left = c.cards(None).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].deck, "Personal::Diary");

        c.delete_note(greeting).unwrap();
        assert!(c.cards(None).unwrap().is_empty());
        assert!(matches!(
            c.cards_for_note(greeting),
            Err(CollectionError::NotFound { kind: "note", .. })
        ));
    }

    #[test]
    fn delete_deck_removes_orphaned_notes_only() {
        let mut c = sample();
        let removed = c.delete_deck("Spanish").unwrap();
        // The greeting note still has a card in Personal::Diary.
        assert_eq!(removed, 1);
        assert!(c.deck("Spanish::Verbs").unwrap().is_none());
        let remaining = c.search_notes("").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(
            remaining[0].decks,
            BTreeSet::from(["Personal::Diary".to_string()])
        );
    }

    #[test]
    fn add_note_validates_deck_type_and_fields() {
        let mut c = sample();
        let mut note = NewNote {
            note_type: "Basic".to_string(),
            deck: "Default".to_string(),
            fields: BTreeMap::from([("Front".to_string(), "gato".to_string())]),
            tags: BTreeSet::new(),
        };
        assert!(c.add_note(note.clone()).is_ok());

        note.deck = "Nowhere".to_string();
        assert!(matches!(
            c.add_note(note.clone()),
            Err(CollectionError::NotFound { kind: "deck", .. })
        ));

        note.deck = "Default".to_string();
        note.fields.insert("Extra".to_string(), "x".to_string());
        assert!(matches!(c.add_note(note), Err(CollectionError::Invalid(_))));
    }

    #[test]
    fn duplicate_deck_and_note_type_are_rejected() {
        let mut c = sample();
        assert!(matches!(
            c.create_deck("Default"),
            Err(CollectionError::AlreadyExists { .. })
        ));
        let basic = NoteTypeRecord {
            name: "Basic".to_string(),
            fields: vec!["Front".to_string()],
            templates: Vec::new(),
        };
        assert!(matches!(
            c.add_note_type(basic),
            Err(CollectionError::AlreadyExists { .. })
        ));
    }
}
