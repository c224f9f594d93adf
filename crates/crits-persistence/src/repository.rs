//! ---
//! crits_section: "03-persistence-logging"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Persistence abstractions and storage bindings."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crits_security::Role;
use parking_lot::Mutex;
use tracing::debug;

use crate::metrics::StoreMetrics;
use crate::store::RoleStore;
use crate::Result;

const OP_CREATE: &str = "create";
const OP_UPDATE: &str = "update";
const OP_DELETE: &str = "delete";

/// Role store with per-role write serialization.
///
/// Role methods assume exclusive access to the record they mutate. The
/// repository guarantees it across threads: every read-modify-write cycle on
/// a role name runs under that name's lock, while different roles proceed
/// independently.
#[derive(Debug)]
pub struct RoleRepository {
    store: RoleStore,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    metrics: Option<StoreMetrics>,
}

impl RoleRepository {
    /// Wrap a store.
    pub fn new(store: RoleStore) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
            metrics: None,
        }
    }

    /// Publish store metrics.
    pub fn with_metrics(mut self, metrics: StoreMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Underlying store.
    pub fn store(&self) -> &RoleStore {
        &self.store
    }

    /// Run `work` while holding the lock for `name`.
    ///
    /// Lock entries live in the table only while someone uses them. An entry
    /// is pruned after the guard is released and only when no other caller
    /// holds a clone, so every caller for a name always shares one mutex.
    fn with_lock<T>(&self, name: &str, work: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self
            .locks
            .lock()
            .entry(name.to_owned())
            .or_default()
            .clone();
        let outcome = {
            let _guard = lock.lock();
            work()
        };

        let mut table = self.locks.lock();
        let idle = table
            .get(name)
            .is_some_and(|current| Arc::ptr_eq(current, &lock))
            && Arc::strong_count(&lock) == 2;
        if idle {
            table.remove(name);
        }
        outcome
    }

    /// Store a new role, returning it with a clean change set.
    pub fn create(&self, mut role: Role) -> Result<Role> {
        let name = role.name.clone();
        let outcome = self.with_lock(&name, || self.store.insert(&mut role));
        self.record(OP_CREATE, outcome.is_ok());
        outcome.map(|()| role)
    }

    /// Load a role by name.
    pub fn get(&self, name: &str) -> Result<Role> {
        let started = Instant::now();
        let role = self.store.load(name)?;
        if let Some(metrics) = &self.metrics {
            metrics.observe_load(started.elapsed().as_secs_f64());
        }
        Ok(role)
    }

    /// Every stored role, sorted by name.
    pub fn list(&self) -> Result<Vec<Role>> {
        self.store.list()
    }

    /// Load, mutate, and save a role under its lock.
    ///
    /// The role is written only when the mutation (or load-time migration)
    /// changed it. Errors from `mutate` abort the update without writing.
    pub fn update<T, F>(&self, name: &str, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut Role) -> crits_security::Result<T>,
    {
        let outcome = self.with_lock(name, || {
            let mut role = self.get(name)?;
            let value = mutate(&mut role)?;
            if role.is_changed() {
                self.store.save(&mut role)?;
                Ok((value, true))
            } else {
                debug!(role = %name, "update left role unchanged; skipping write");
                Ok((value, false))
            }
        });
        match outcome {
            Ok((value, written)) => {
                if written {
                    self.record(OP_UPDATE, true);
                }
                Ok(value)
            }
            Err(err) => {
                self.record(OP_UPDATE, false);
                Err(err)
            }
        }
    }

    /// Remove a role by name.
    pub fn delete(&self, name: &str) -> Result<Role> {
        let outcome = self.with_lock(name, || self.store.delete(name));
        if outcome.is_err() {
            self.record(OP_DELETE, false);
        }
        outcome
    }

    fn record(&self, operation: &str, succeeded: bool) {
        if let Some(metrics) = &self.metrics {
            if succeeded {
                metrics.record_saved(operation);
            } else {
                metrics.record_failed(operation);
            }
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().len()
    }
}
