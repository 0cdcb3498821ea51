// guard.rs — DeckGuard: every collection access goes through the policy.
//
// Each tool method takes one policy snapshot up front and uses it for every
// decision in the call, so a reload in the middle of a call cannot produce a
// mix of old and new answers.
//
// A call that touches several things (a note with cards in three decks, a
// deck with subdecks) is allowed only if every individual request is
// allowed. Metadata needed for the decision (tags, note type, decks) always
// comes from the collection, never from the caller.

use dg_policy::{
    filter_readable, OperationKind, OperationRequest, PolicyConfig, PolicySnapshot, PolicyStore,
    StoreInfo,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::collection::{
    CardRecord, Collection, DeckSummary, DeckUpdate, NewNote, NoteId, NoteRecord, NoteTypeRecord,
    NoteUpdate, ReviewStats,
};

const ALL_DECKS: &str = "All Decks";
use crate::error::{CollectionError, GatewayError};

/// What `get_permissions` reports: the effective policy plus which
/// snapshot it came from.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionsView {
    pub policy: PolicySnapshot,
    pub snapshot: StoreInfo,
}

pub struct DeckGuard<C> {
    policy: PolicyStore,
    collection: C,
}

impl<C: Collection> DeckGuard<C> {
    pub fn new(policy: PolicyStore, collection: C) -> Self {
        Self { policy, collection }
    }

    pub fn policy(&self) -> &PolicyStore {
        &self.policy
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    pub fn into_collection(self) -> C {
        self.collection
    }

    // ── Reads ──────────────────────────────────────────────────

    pub fn get_permissions(&self) -> PermissionsView {
        PermissionsView {
            policy: self.policy.describe(),
            snapshot: self.policy.info(),
        }
    }

    /// Decks the agent may read. Denied decks are silently omitted.
    pub fn list_decks(&self) -> Result<Vec<DeckSummary>, GatewayError> {
        let policy = self.policy.snapshot();
        let decks = self.collection.decks()?;
        let total = decks.len();
        let visible = filter_readable(&policy, decks, |deck: &DeckSummary| {
            [OperationRequest::read_deck(deck.name.clone())]
        });
        debug!(total, visible = visible.len(), "list_decks");
        Ok(visible)
    }

    pub fn get_deck_info(&self, name: &str) -> Result<DeckSummary, GatewayError> {
        let policy = self.policy.snapshot();
        require(&policy, "get_deck_info", &OperationRequest::read_deck(name))?;
        self.collection
            .deck(name)?
            .ok_or_else(|| not_found("deck", name))
    }

    /// Search, then drop every note the agent may not read. `limit` applies
    /// after filtering.
    pub fn search_notes(&self, query: &str, limit: usize) -> Result<Vec<NoteRecord>, GatewayError> {
        let policy = self.policy.snapshot();
        let found = self.collection.search_notes(query)?;
        let total = found.len();
        let mut visible = filter_readable(&policy, found, |note: &NoteRecord| {
            note_requests(OperationKind::Read, note)
        });
        visible.truncate(limit);
        debug!(query, total, returned = visible.len(), "search_notes");
        Ok(visible)
    }

    pub fn get_note(&self, id: NoteId) -> Result<NoteRecord, GatewayError> {
        let policy = self.policy.snapshot();
        let note = self.load_note(id)?;
        require_all(&policy, "get_note", note_requests(OperationKind::Read, &note))?;
        Ok(note)
    }

    /// Cards of a note. Needs the same read access as the note itself.
    pub fn get_cards_for_note(&self, id: NoteId) -> Result<Vec<CardRecord>, GatewayError> {
        let policy = self.policy.snapshot();
        let note = self.load_note(id)?;
        require_all(
            &policy,
            "get_cards_for_note",
            note_requests(OperationKind::Read, &note),
        )?;
        Ok(self.collection.cards_for_note(id)?)
    }

    /// Card counts for a deck subtree, or for the whole collection.
    ///
    /// A named deck must be readable. Either way, cards sitting in decks
    /// the agent may not read are left out of the counts.
    pub fn get_review_stats(&self, deck: Option<&str>) -> Result<ReviewStats, GatewayError> {
        let policy = self.policy.snapshot();
        if let Some(name) = deck {
            require(&policy, "get_review_stats", &OperationRequest::read_deck(name))?;
            if self.collection.deck(name)?.is_none() {
                return Err(not_found("deck", name));
            }
        }
        let cards = self.collection.cards(deck)?;
        let total = cards.len();
        let visible = filter_readable(&policy, cards, |card: &CardRecord| {
            [OperationRequest::read_deck(card.deck.clone())]
        });
        debug!(total, counted = visible.len(), "get_review_stats");
        Ok(ReviewStats::tally(deck.unwrap_or(ALL_DECKS), &visible))
    }

    pub fn list_note_types(&self) -> Result<Vec<NoteTypeRecord>, GatewayError> {
        let policy = self.policy.snapshot();
        let types = self.collection.note_types()?;
        Ok(filter_readable(&policy, types, |t: &NoteTypeRecord| {
            [OperationRequest::new(OperationKind::Read).of_type(t.name.clone())]
        }))
    }

    // ── Deck mutations ─────────────────────────────────────────

    pub fn create_deck(&mut self, name: &str) -> Result<DeckSummary, GatewayError> {
        let policy = self.policy.snapshot();
        require(&policy, "create_deck", &OperationRequest::write_deck(name))?;
        let deck = self.collection.create_deck(name)?;
        info!(deck = %deck.name, "deck created");
        Ok(deck)
    }

    /// Rename or re-describe a deck. A rename needs write access to every
    /// affected deck under both its old and its new name.
    pub fn update_deck(
        &mut self,
        name: &str,
        update: &DeckUpdate,
    ) -> Result<DeckSummary, GatewayError> {
        let policy = self.policy.snapshot();
        let affected = self.subtree(name)?;

        let mut requests: Vec<OperationRequest> = affected
            .iter()
            .map(|deck| OperationRequest::write_deck(deck.clone()))
            .collect();
        if let Some(new_name) = &update.new_name {
            requests.extend(affected.iter().map(|deck| {
                OperationRequest::write_deck(format!("{}{}", new_name, &deck[name.len()..]))
            }));
        }
        require_all(&policy, "update_deck", requests)?;

        let deck = self.collection.update_deck(name, update)?;
        info!(from = name, to = %deck.name, "deck updated");
        Ok(deck)
    }

    /// Delete a deck, its subdecks, and any notes left without cards.
    ///
    /// Needs delete access to every deck in the subtree and to every note
    /// that would be removed, including the note's tags and type. A note
    /// that keeps cards elsewhere is still changed, so it needs write access.
    pub fn delete_deck(&mut self, name: &str) -> Result<usize, GatewayError> {
        let policy = self.policy.snapshot();
        let affected = self.subtree(name)?;

        let mut requests: Vec<OperationRequest> = affected
            .iter()
            .map(|deck| OperationRequest::delete_deck(deck.clone()))
            .collect();
        for note in self.collection.notes_in_deck(name)? {
            let orphaned = note.decks.iter().all(|d| affected.contains(d));
            let kind = if orphaned {
                OperationKind::Delete
            } else {
                OperationKind::Write
            };
            requests.extend(note_requests(kind, &note));
        }
        require_all(&policy, "delete_deck", requests)?;

        let removed = self.collection.delete_deck(name)?;
        info!(deck = name, decks = affected.len(), notes_removed = removed, "deck deleted");
        Ok(removed)
    }

    // ── Note mutations ─────────────────────────────────────────

    pub fn create_note(&mut self, note: NewNote) -> Result<NoteRecord, GatewayError> {
        let policy = self.policy.snapshot();
        let request = OperationRequest::write_deck(note.deck.clone())
            .with_tags(note.tags.iter().cloned())
            .of_type(note.note_type.clone());
        require(&policy, "create_note", &request)?;

        let created = self.collection.add_note(note)?;
        info!(note_id = created.id, "note created");
        Ok(created)
    }

    /// Edit a note. Both the note as it is and, when tags change, the note
    /// as it would be must be writable, so an agent can neither edit a
    /// protected note nor tag its way out of a restriction.
    pub fn update_note(&mut self, id: NoteId, update: &NoteUpdate) -> Result<NoteRecord, GatewayError> {
        let policy = self.policy.snapshot();
        let current = self.load_note(id)?;

        let mut requests = note_requests(OperationKind::Write, &current);
        if let Some(tags) = &update.tags {
            let proposed = NoteRecord {
                tags: tags.clone(),
                ..current.clone()
            };
            requests.extend(note_requests(OperationKind::Write, &proposed));
        }
        require_all(&policy, "update_note", requests)?;

        let updated = self.collection.update_note(id, update)?;
        info!(note_id = id, "note updated");
        Ok(updated)
    }

    pub fn delete_note(&mut self, id: NoteId) -> Result<(), GatewayError> {
        let policy = self.policy.snapshot();
        let note = self.load_note(id)?;
        require_all(&policy, "delete_note", note_requests(OperationKind::Delete, &note))?;

        self.collection.delete_note(id)?;
        info!(note_id = id, "note deleted");
        Ok(())
    }

    // ── Note types ─────────────────────────────────────────────

    pub fn create_note_type(&mut self, note_type: NoteTypeRecord) -> Result<NoteTypeRecord, GatewayError> {
        let policy = self.policy.snapshot();
        require(
            &policy,
            "create_note_type",
            &OperationRequest::create_note_type(note_type.name.clone()),
        )?;
        let created = self.collection.add_note_type(note_type)?;
        info!(note_type = %created.name, "note type created");
        Ok(created)
    }

    pub fn update_note_type(
        &mut self,
        name: &str,
        fields: Vec<String>,
    ) -> Result<NoteTypeRecord, GatewayError> {
        let policy = self.policy.snapshot();
        require(
            &policy,
            "update_note_type",
            &OperationRequest::modify_note_type(name),
        )?;
        let updated = self.collection.update_note_type(name, fields)?;
        info!(note_type = name, "note type updated");
        Ok(updated)
    }

    // ── Helpers ────────────────────────────────────────────────

    fn load_note(&self, id: NoteId) -> Result<NoteRecord, GatewayError> {
        self.collection
            .note(id)?
            .ok_or_else(|| not_found("note", &id.to_string()))
    }

    /// `name` and every existing subdeck. Errors if `name` does not exist.
    fn subtree(&self, name: &str) -> Result<Vec<String>, GatewayError> {
        if self.collection.deck(name)?.is_none() {
            return Err(not_found("deck", name));
        }
        Ok(self
            .collection
            .decks()?
            .into_iter()
            .map(|d| d.name)
            .filter(|d| crate::collection::is_within(d, name))
            .collect())
    }
}

/// One request per deck holding a card of `note`, carrying the note's tags
/// and type. A note with no decks still yields one deckless request so the
/// global, tag, and note-type layers apply.
pub fn note_requests(kind: OperationKind, note: &NoteRecord) -> Vec<OperationRequest> {
    let base = OperationRequest::new(kind)
        .with_tags(note.tags.iter().cloned())
        .of_type(note.note_type.clone());
    if note.decks.is_empty() {
        return vec![base];
    }
    note.decks
        .iter()
        .map(|deck| base.clone().in_deck(deck.clone()))
        .collect()
}

fn require(
    policy: &PolicyConfig,
    tool: &str,
    request: &OperationRequest,
) -> Result<(), GatewayError> {
    let decision = dg_policy::authorize(policy, request);
    if decision.is_allowed() {
        return Ok(());
    }
    info!(tool, reason = %decision.reason, "tool call denied");
    Err(GatewayError::denied(decision))
}

fn require_all(
    policy: &PolicyConfig,
    tool: &str,
    requests: impl IntoIterator<Item = OperationRequest>,
) -> Result<(), GatewayError> {
    for request in requests {
        require(policy, tool, &request)?;
    }
    Ok(())
}

fn not_found(kind: &'static str, name: &str) -> GatewayError {
    GatewayError::Collection(CollectionError::NotFound {
        kind,
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn note(tags: &[&str], decks: &[&str]) -> NoteRecord {
        NoteRecord {
            id: 7,
            note_type: "Basic".to_string(),
            fields: Default::default(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            decks: decks.iter().map(|d| d.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn note_requests_one_per_deck() {
        let requests = note_requests(OperationKind::Write, &note(&["exam"], &["A", "B"]));
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].deck.as_deref(), Some("A"));
        assert_eq!(requests[1].deck.as_deref(), Some("B"));
        for r in &requests {
            assert_eq!(r.note_type.as_deref(), Some("Basic"));
            assert!(r.tags.as_ref().unwrap().contains("exam"));
        }
    }

    #[test]
    fn deleting_a_deck_needs_write_on_notes_that_survive() {
        let policy = PolicyStore::new(PolicyConfig::permissive().with_protected_tags(["exam"]))
            .unwrap();
        let mut collection = crate::InMemoryCollection::new();
        let kept = collection.insert_note(
            "Basic",
            &["Spanish::Verbs", "Spanish"],
            &[("Front", "ser")],
            &["exam"],
        );
        let mut guard = DeckGuard::new(policy, collection);

        match guard.delete_deck("Spanish::Verbs") {
            Err(GatewayError::PolicyDenied { layer, .. }) => {
                assert_eq!(layer, dg_policy::PolicyLayer::TagRestrictions);
            }
            other => panic!("expected a tag denial, got {:?}", other),
        }
        let note = guard.collection().note(kept).unwrap().unwrap();
        assert!(note.decks.contains("Spanish::Verbs"));
    }

    #[test]
    fn deckless_note_still_checked() {
        let requests = note_requests(OperationKind::Read, &note(&[], &[]));
        assert_eq!(requests.len(), 1);
        assert!(requests[0].deck.is_none());
    }
}
