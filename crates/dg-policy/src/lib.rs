//! # dg-policy
//!
//! Permission engine for deckguard.
//!
//! Every operation an agent attempts against a deck collection (read, write,
//! delete, note-type changes) is turned into an [`OperationRequest`] and run
//! through [`authorize`], which consults five rule layers of a
//! [`PolicyConfig`] in a fixed order and returns a single [`Decision`].
//!
//! ## Key invariants
//!
//! - **Most restrictive wins**: the first layer that denies ends evaluation.
//!   No later layer can override an earlier denial.
//! - **Global flags gate everything**: `write = false` or `delete = false`
//!   makes the matching operations impossible regardless of other rules.
//! - **Protected decks and tags block mutation only**: reads are never
//!   stopped by them.
//! - **Pure evaluation**: the same config and request always produce the
//!   same decision. Reloads swap a whole snapshot in [`PolicyStore`].

pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod request;
pub mod snapshot;
pub mod store;

pub use config::{
    DeckPatternLists, GlobalPermissions, Mode, NoteTypePermissions, PolicyConfig,
    TagRestrictions,
};
pub use decision::{Decision, EvaluationStep, EvaluationTrace, PolicyLayer};
pub use engine::{authorize, authorize_with_trace, filter_readable};
pub use error::PolicyError;
pub use pattern::{matches, matches_any};
pub use request::{OperationKind, OperationRequest};
pub use snapshot::{describe, PolicySnapshot};
pub use store::{PolicyStore, StoreInfo};
