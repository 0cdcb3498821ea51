// loader.rs — Read policy files into normalized configs and stores.

use std::path::Path;

use dg_policy::{PolicyStore, StoreInfo};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::format::Format;
use crate::normalize::{normalize, Normalized};
use crate::raw::RawDocument;

/// Parse and normalize policy text in the given format.
pub fn load_str(text: &str, format: Format) -> Result<Normalized, ConfigError> {
    let document: RawDocument = format.parse(text)?;
    Ok(normalize(document.into_permissions()))
}

/// Read, parse, and normalize a policy file. Warnings are logged.
pub fn load_path(path: impl AsRef<Path>) -> Result<Normalized, ConfigError> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let normalized = load_str(&text, format)?;
    for warning in &normalized.warnings {
        warn!(path = %path.display(), "{}", warning);
    }
    debug!(
        path = %path.display(),
        format = %format,
        mode = %normalized.config.mode,
        "policy file loaded"
    );
    Ok(normalized)
}

/// Load a policy file and install it in a new store.
///
/// Returns the store and the normalization warnings.
pub fn open_store(path: impl AsRef<Path>) -> Result<(PolicyStore, Vec<String>), ConfigError> {
    let Normalized { config, warnings } = load_path(path)?;
    Ok((PolicyStore::new(config)?, warnings))
}

/// Reload `path` into `store`.
///
/// On any error the store keeps its current snapshot. Returns `None` when the
/// file's effective policy is unchanged.
pub fn reload_into(
    path: impl AsRef<Path>,
    store: &PolicyStore,
) -> Result<Option<StoreInfo>, ConfigError> {
    let Normalized { config, .. } = load_path(path)?;
    Ok(store.replace_if_changed(config)?)
}
