//! # dg-config
//!
//! Loads deckguard policy files and keeps a [`dg_policy::PolicyStore`] in
//! sync with them.
//!
//! The engine never parses files; this crate is the loader in front of it.
//! It reads JSON, TOML or YAML in the add-on's `permissions` shape, fills in
//! missing fields, and normalizes ill-formed input into a configuration that
//! never grants write or delete by accident. Every adjustment is reported as
//! a warning.

pub mod error;
pub mod format;
pub mod loader;
pub mod normalize;
pub mod raw;
pub mod watch;

pub use error::ConfigError;
pub use format::Format;
pub use loader::{load_path, load_str, open_store, reload_into};
pub use normalize::{normalize, Normalized};
pub use raw::{RawDocument, RawPermissions};
pub use watch::PolicyWatcher;
