//! # dg-gateway
//!
//! Enforcement layer between an agent's tool calls and the deck collection.
//!
//! Each tool call is resolved into one or more
//! [`OperationRequest`](dg_policy::OperationRequest)s using metadata fetched
//! from the [`Collection`], authorized against a single policy snapshot, and
//! only then executed. Listing and search results are filtered item by item.
//! A denial becomes [`GatewayError::PolicyDenied`], which the dispatcher turns
//! into a structured error body for the transport to send back.
//!
//! The collection itself is an external collaborator behind the
//! [`Collection`] trait; [`InMemoryCollection`] is provided for tests and
//! local experiments.

pub mod collection;
pub mod error;
pub mod guard;
pub mod memory;
pub mod tool;

pub use collection::{
    CardRecord, CardState, CardTemplate, Collection, DeckSummary, DeckUpdate, NewNote, NoteId,
    NoteRecord, NoteTypeRecord, NoteUpdate, ReviewStats,
};
pub use error::{CollectionError, GatewayError};
pub use guard::{DeckGuard, PermissionsView};
pub use memory::InMemoryCollection;
pub use tool::{dispatch, ToolCall, ToolError, ToolResponse, TOOL_NAMES};
