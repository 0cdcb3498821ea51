// show.rs — Print the effective policy.

use std::path::Path;

use anyhow::Context;
use dg_config::open_store;
use serde::Serialize;

use dg_policy::{PolicySnapshot, StoreInfo};

#[derive(Serialize)]
struct ShowOutput {
    policy: PolicySnapshot,
    snapshot: StoreInfo,
}

pub fn execute(config: &Path) -> anyhow::Result<()> {
    let (store, _) = open_store(config)
        .with_context(|| format!("failed to load policy from {}", config.display()))?;
    let output = ShowOutput {
        policy: store.describe(),
        snapshot: store.info(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
