// collection.rs — The deck collection the gateway guards.
//
// The gateway never talks to a concrete database. Anything that can list
// decks, find notes, and apply changes implements Collection; the add-on
// bridge and InMemoryCollection are two such implementations.
//
// A note's cards may live in several decks, so NoteRecord carries the set of
// decks its cards are in rather than a single deck.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::CollectionError;

pub type NoteId = i64;

/// A deck as reported to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSummary {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Number of notes with at least one card in this deck.
    pub note_count: usize,
}

/// A note with the metadata the policy needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: NoteId,
    pub note_type: String,
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Decks holding at least one of this note's cards.
    #[serde(default)]
    pub decks: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTemplate {
    pub name: String,
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteTypeRecord {
    pub name: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub templates: Vec<CardTemplate>,
}

/// Where a card is in the review cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    #[default]
    New,
    Learning,
    Review,
}

/// Review interval, in days, from which a card counts as mature.
pub const MATURE_INTERVAL_DAYS: u32 = 21;

/// One card of a note. A note has one card per deck it appears in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: i64,
    pub note_id: NoteId,
    pub deck: String,
    #[serde(default)]
    pub state: CardState,
    /// Current review interval in days; zero for new cards.
    #[serde(default)]
    pub interval: u32,
    #[serde(default)]
    pub reviews: u32,
    #[serde(default)]
    pub lapses: u32,
}

/// Card counts for one deck subtree, or for the whole collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub deck_name: String,
    pub total_cards: usize,
    pub new_cards: usize,
    pub learning_cards: usize,
    pub review_cards: usize,
    pub mature_cards: usize,
}

impl ReviewStats {
    pub fn tally<'a>(
        deck_name: impl Into<String>,
        cards: impl IntoIterator<Item = &'a CardRecord>,
    ) -> Self {
        let mut stats = Self {
            deck_name: deck_name.into(),
            ..Self::default()
        };
        for card in cards {
            stats.total_cards += 1;
            match card.state {
                CardState::New => stats.new_cards += 1,
                CardState::Learning => stats.learning_cards += 1,
                CardState::Review => stats.review_cards += 1,
            }
            if card.interval >= MATURE_INTERVAL_DAYS {
                stats.mature_cards += 1;
            }
        }
        stats
    }
}

/// A note to be added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub note_type: String,
    pub deck: String,
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

/// Changes to an existing note. `None` leaves the part untouched; `tags`
/// replaces the whole tag set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteUpdate {
    #[serde(default)]
    pub fields: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub tags: Option<BTreeSet<String>>,
}

/// Changes to an existing deck.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckUpdate {
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Storage behind the gateway.
///
/// Deck names are full `::`-separated paths. Deleting or renaming a deck
/// affects its subdecks too, matching how the desktop application behaves.
pub trait Collection {
    fn decks(&self) -> Result<Vec<DeckSummary>, CollectionError>;

    fn deck(&self, name: &str) -> Result<Option<DeckSummary>, CollectionError>;

    /// Notes matching a search query.
    ///
    /// The query syntax is implementation-defined; the gateway passes it
    /// through unchanged and filters the results.
    fn search_notes(&self, query: &str) -> Result<Vec<NoteRecord>, CollectionError>;

    /// Notes with at least one card in `deck` or one of its subdecks.
    fn notes_in_deck(&self, deck: &str) -> Result<Vec<NoteRecord>, CollectionError>;

    fn note(&self, id: NoteId) -> Result<Option<NoteRecord>, CollectionError>;

    fn note_types(&self) -> Result<Vec<NoteTypeRecord>, CollectionError>;

    /// Cards of one note. Errors if the note does not exist.
    fn cards_for_note(&self, id: NoteId) -> Result<Vec<CardRecord>, CollectionError>;

    /// Cards in `deck` and its subdecks, or every card when `deck` is `None`.
    fn cards(&self, deck: Option<&str>) -> Result<Vec<CardRecord>, CollectionError>;

    fn create_deck(&mut self, name: &str) -> Result<DeckSummary, CollectionError>;

    fn update_deck(&mut self, name: &str, update: &DeckUpdate)
        -> Result<DeckSummary, CollectionError>;

    /// Delete a deck and its subdecks. Returns how many notes were removed
    /// because none of their cards remained.
    fn delete_deck(&mut self, name: &str) -> Result<usize, CollectionError>;

    fn add_note(&mut self, note: NewNote) -> Result<NoteRecord, CollectionError>;

    fn update_note(&mut self, id: NoteId, update: &NoteUpdate)
        -> Result<NoteRecord, CollectionError>;

    fn delete_note(&mut self, id: NoteId) -> Result<(), CollectionError>;

    fn add_note_type(&mut self, note_type: NoteTypeRecord)
        -> Result<NoteTypeRecord, CollectionError>;

    /// Replace a note type's field list.
    fn update_note_type(
        &mut self,
        name: &str,
        fields: Vec<String>,
    ) -> Result<NoteTypeRecord, CollectionError>;
}

/// Whether `deck` is `root` or one of its subdecks.
pub fn is_within(deck: &str, root: &str) -> bool {
    deck == root
        || deck
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with("::"))
}
