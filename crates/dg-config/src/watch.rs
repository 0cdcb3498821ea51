// watch.rs — Hot reload of the policy file.
//
// PolicyWatcher watches the directory containing the policy file (editors
// often save by writing a temp file and renaming it over the original, which
// a watch on the file itself would miss) and reloads the store whenever the
// file is created or modified. A failed reload leaves the previous snapshot
// in place. Dropping the watcher stops it.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use dg_policy::PolicyStore;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::loader::reload_into;

/// A running watch on one policy file.
pub struct PolicyWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl PolicyWatcher {
    /// Start watching `path`, reloading `store` on every change.
    pub fn spawn(path: impl AsRef<Path>, store: PolicyStore) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let file_name = path.file_name().map(|n| n.to_os_string());
        let watched = path.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !is_relevant(&event, file_name.as_ref()) {
                    return;
                }
                match reload_into(&watched, &store) {
                    Ok(Some(info)) => info!(
                        path = %watched.display(),
                        generation = info.generation,
                        "policy reloaded"
                    ),
                    Ok(None) => debug!(path = %watched.display(), "policy file changed; policy unchanged"),
                    Err(e) => warn!(
                        path = %watched.display(),
                        error = %e,
                        "policy reload failed; keeping previous snapshot"
                    ),
                }
            }
            Err(e) => warn!(error = %e, "policy watcher error"),
        })?;

        watcher.watch(watch_dir(&path), RecursiveMode::NonRecursive)?;
        info!(path = %path.display(), "watching policy file");

        Ok(Self {
            _watcher: watcher,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn watch_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Whether `event` is a create or modify touching the watched file name.
fn is_relevant(event: &Event, file_name: Option<&OsString>) -> bool {
    let Some(file_name) = file_name else {
        return false;
    };
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn name(s: &str) -> Option<OsString> {
        Some(OsString::from(s))
    }

    #[test]
    fn modify_of_watched_file_is_relevant() {
        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/etc/deckguard/policy.json"));
        assert!(is_relevant(&event, name("policy.json").as_ref()));
    }

    #[test]
    fn create_by_rename_is_relevant() {
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/etc/deckguard/policy.json"));
        assert!(is_relevant(&event, name("policy.json").as_ref()));
    }

    #[test]
    fn other_files_and_removals_are_ignored() {
        let other = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/etc/deckguard/policy.json.swp"));
        assert!(!is_relevant(&other, name("policy.json").as_ref()));

        let removed = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/etc/deckguard/policy.json"));
        assert!(!is_relevant(&removed, name("policy.json").as_ref()));
    }

    #[test]
    fn watch_dir_of_bare_file_name_is_current_dir() {
        assert_eq!(watch_dir(Path::new("policy.json")), Path::new("."));
        assert_eq!(watch_dir(Path::new("conf/policy.json")), Path::new("conf"));
    }

    use std::thread;
    use std::time::{Duration, Instant};

    /// Poll until the store reaches `generation` or ten seconds pass.
    fn wait_for_generation(store: &PolicyStore, generation: u64) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if store.info().generation >= generation {
                return true;
            }
            thread::sleep(Duration::from_millis(25));
        }
        false
    }

    #[test]
    fn rewriting_the_file_installs_a_new_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(&path, r#"{"mode": "denylist"}"#).unwrap();
        let (store, _) = crate::open_store(&path).unwrap();
        let _watcher = PolicyWatcher::spawn(&path, store.clone()).unwrap();
        thread::sleep(Duration::from_millis(100));

        std::fs::write(&path, r#"{"mode": "denylist", "protected_decks": ["Spanish"]}"#).unwrap();

        assert!(wait_for_generation(&store, 2), "store was never reloaded");
        assert_eq!(store.info().generation, 2);
        assert!(store.snapshot().protected_decks.contains("Spanish"));
    }

    #[test]
    fn broken_file_keeps_the_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(&path, r#"{"mode": "denylist"}"#).unwrap();
        let (store, _) = crate::open_store(&path).unwrap();
        let before = store.info();
        let _watcher = PolicyWatcher::spawn(&path, store.clone()).unwrap();
        thread::sleep(Duration::from_millis(100));

        std::fs::write(&path, r#"{"mode": "#).unwrap();
        thread::sleep(Duration::from_millis(500));
        assert_eq!(store.info().generation, before.generation);
        assert_eq!(store.info().fingerprint, before.fingerprint);

        // The watcher is still alive after the failed reload.
        std::fs::write(&path, r#"{"mode": "allowlist"}"#).unwrap();
        assert!(wait_for_generation(&store, 2), "store was never reloaded");
        assert_ne!(store.info().fingerprint, before.fingerprint);
    }

    #[test]
    fn spawn_on_existing_directory_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(&path, r#"{"mode": "denylist"}"#).unwrap();
        let (store, _) = crate::open_store(&path).unwrap();

        let watcher = PolicyWatcher::spawn(&path, store).unwrap();
        assert_eq!(watcher.path(), path.as_path());
    }
}
