// store.rs — Atomically swapped policy snapshots.
//
// The active PolicyConfig is shared by every request handler and may be
// replaced at runtime when the policy file changes. PolicyStore holds it as
// an `Arc<PolicyConfig>` behind a lock that is only taken long enough to
// copy or replace the pointer. Evaluation always runs on a cloned Arc, so an
// in-flight authorization sees either the whole old policy or the whole new
// one, never a mix, and never waits on a reload.

use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::PolicyConfig;
use crate::decision::{Decision, EvaluationTrace};
use crate::engine;
use crate::error::PolicyError;
use crate::request::OperationRequest;
use crate::snapshot::{self, PolicySnapshot};

/// Metadata about the snapshot currently installed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoreInfo {
    /// Starts at 1 and increases by one on every swap.
    pub generation: u64,
    pub loaded_at: DateTime<Utc>,
    pub fingerprint: String,
}

struct Active {
    config: Arc<PolicyConfig>,
    info: StoreInfo,
}

impl Active {
    fn install(&mut self, config: PolicyConfig, fingerprint: String) -> StoreInfo {
        self.config = Arc::new(config);
        self.info = StoreInfo {
            generation: self.info.generation + 1,
            loaded_at: Utc::now(),
            fingerprint,
        };
        info!(
            generation = self.info.generation,
            fingerprint = %self.info.fingerprint,
            "policy snapshot installed"
        );
        self.info.clone()
    }
}

/// Shared handle on the active policy. Clones point at the same store.
#[derive(Clone)]
pub struct PolicyStore {
    active: Arc<RwLock<Active>>,
}

impl PolicyStore {
    /// Create a store with `config` installed as generation 1.
    pub fn new(config: PolicyConfig) -> Result<Self, PolicyError> {
        let info = StoreInfo {
            generation: 1,
            loaded_at: Utc::now(),
            fingerprint: config.fingerprint()?,
        };
        Ok(Self {
            active: Arc::new(RwLock::new(Active {
                config: Arc::new(config),
                info,
            })),
        })
    }

    /// The current snapshot. Holding it keeps that version alive even if a
    /// newer one is swapped in meanwhile.
    pub fn snapshot(&self) -> Arc<PolicyConfig> {
        let active = self.active.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&active.config)
    }

    pub fn info(&self) -> StoreInfo {
        let active = self.active.read().unwrap_or_else(PoisonError::into_inner);
        active.info.clone()
    }

    /// Install a new snapshot unconditionally.
    pub fn replace(&self, config: PolicyConfig) -> Result<StoreInfo, PolicyError> {
        let fingerprint = config.fingerprint()?;
        Ok(self.write().install(config, fingerprint))
    }

    /// Install a new snapshot only if it differs from the current one.
    ///
    /// The comparison and the swap happen under one write lock, so two
    /// concurrent reloads of the same file install it once. Returns `None`
    /// when the fingerprints match and nothing was swapped.
    pub fn replace_if_changed(&self, config: PolicyConfig) -> Result<Option<StoreInfo>, PolicyError> {
        let fingerprint = config.fingerprint()?;
        let mut active = self.write();
        if active.info.fingerprint == fingerprint {
            return Ok(None);
        }
        Ok(Some(active.install(config, fingerprint)))
    }

    fn write(&self) -> RwLockWriteGuard<'_, Active> {
        self.active.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Authorize against the current snapshot.
    pub fn authorize(&self, request: &OperationRequest) -> Decision {
        engine::authorize(&self.snapshot(), request)
    }

    pub fn authorize_with_trace(&self, request: &OperationRequest) -> EvaluationTrace {
        engine::authorize_with_trace(&self.snapshot(), request)
    }

    pub fn describe(&self) -> PolicySnapshot {
        snapshot::describe(&self.snapshot())
    }
}

impl std::fmt::Debug for PolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyStore").field("info", &self.info()).finish()
    }
}
