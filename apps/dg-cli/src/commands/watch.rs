// watch.rs — Keep a policy hot-reloaded and report each new snapshot.

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use dg_config::{open_store, PolicyWatcher};
use tracing::info;

pub fn execute(config: &Path, interval: u64) -> anyhow::Result<()> {
    let (store, warnings) = open_store(config)
        .with_context(|| format!("failed to load policy from {}", config.display()))?;
    for warning in &warnings {
        println!("warning: {}", warning);
    }

    let _watcher = PolicyWatcher::spawn(config, store.clone())
        .with_context(|| format!("failed to watch {}", config.display()))?;

    let mut current = store.info();
    println!(
        "generation {} fingerprint {} (watching {}, Ctrl-C to stop)",
        current.generation,
        current.fingerprint,
        config.display()
    );

    let interval = Duration::from_secs(interval.max(1));
    loop {
        thread::sleep(interval);
        let latest = store.info();
        if latest.generation != current.generation {
            info!(
                generation = latest.generation,
                fingerprint = %latest.fingerprint,
                "new policy snapshot"
            );
            println!(
                "generation {} fingerprint {} loaded at {}",
                latest.generation,
                latest.fingerprint,
                latest.loaded_at.to_rfc3339()
            );
            current = latest;
        }
    }
}
