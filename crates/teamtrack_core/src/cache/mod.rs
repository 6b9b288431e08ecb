//! Read-through cache with mutation-driven invalidation.
//!
//! # Responsibility
//! - Serve repeated list/detail queries without a store round-trip.
//! - Keep cached snapshots coherent with the entity store by invalidating
//!   the affected keys on every successful mutation.
//!
//! # Invariants
//! - Invalidation for a mutation is applied before the mutation response
//!   returns, so a caller re-reading after its own write never observes
//!   pre-mutation data.
//! - Cache backend failures never fail the surrounding operation: writes
//!   and invalidations degrade to logged no-ops, reads degrade to misses.

use crate::cache::key::{CacheKey, PROJECT_LIST_NAMESPACE};
use crate::model::project::ProjectId;
use log::warn;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

pub mod key;

/// Cache backend failure. The coherency wrapper downgrades these to logged
/// no-ops; they never surface to pipeline callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    Backend(String),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend(message) => write!(f, "cache backend failure: {message}"),
        }
    }
}

impl Error for CacheError {}

/// Key-value store contract consumed by the coherency wrapper.
///
/// Values are opaque serialized strings; TTL handling is the store's
/// responsibility.
pub trait CacheStore {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn write(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
    fn invalidate(&self, keys: &[String]) -> Result<(), CacheError>;
    fn invalidate_prefix(&self, prefix: &str) -> Result<(), CacheError>;
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// In-process cache store with per-entry TTL and lazy expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries. Test/diagnostic helper.
    pub fn live_entries(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }
}

impl CacheStore for MemoryCache {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.entries.lock().insert(
            key.to_string(),
            MemoryEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn invalidate(&self, keys: &[String]) -> Result<(), CacheError> {
        let mut entries = self.entries.lock();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    fn invalidate_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        self.entries
            .lock()
            .retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}

/// TTL configuration for cached query shapes.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// TTL for canonical keys. Parameterized listing keys use half of this.
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(60),
        }
    }
}

/// Coherency discipline over an arbitrary cache store.
///
/// Owns key rendering, TTL selection, JSON encoding and the
/// degrade-to-no-op policy for backend failures.
pub struct CacheCoherency<C: CacheStore> {
    store: C,
    config: CacheConfig,
}

impl<C: CacheStore> CacheCoherency<C> {
    pub fn new(store: C, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// Reads and decodes one cached value. Backend failures and decode
    /// failures both read as misses.
    pub fn read_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let rendered = key.render();
        let raw = match self.store.read(&rendered) {
            Ok(value) => value?,
            Err(err) => {
                warn!("event=cache_degraded module=cache op=read key={rendered} error={err}");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("event=cache_decode_failed module=cache key={rendered} error={err}");
                None
            }
        }
    }

    /// Encodes and stores one value under its key's TTL class.
    pub fn write_json<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let rendered = key.render();
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!("event=cache_encode_failed module=cache key={rendered} error={err}");
                return;
            }
        };

        if let Err(err) = self.store.write(&rendered, encoded, self.ttl_for(key)) {
            warn!("event=cache_degraded module=cache op=write key={rendered} error={err}");
        }
    }

    /// Removes an explicit key set.
    pub fn invalidate(&self, keys: &[CacheKey]) {
        let rendered: Vec<String> = keys.iter().map(CacheKey::render).collect();
        if let Err(err) = self.store.invalidate(&rendered) {
            warn!(
                "event=cache_degraded module=cache op=invalidate keys={} error={err}",
                rendered.len()
            );
        }
    }

    /// Invalidation set for one successful task mutation: the all-tasks key
    /// and the task's project key; when the task moved between projects the
    /// old and the new project keys are both dropped.
    pub fn task_mutation(&self, project_before: ProjectId, moved_to: Option<ProjectId>) {
        let mut keys = vec![CacheKey::AllTasks, CacheKey::ProjectTasks(project_before)];
        if let Some(project_after) = moved_to {
            if project_after != project_before {
                keys.push(CacheKey::ProjectTasks(project_after));
            }
        }
        self.invalidate(&keys);
    }

    /// Invalidation set for one successful project mutation: the whole
    /// filtered-listing namespace (pattern sweep) plus the detail key.
    pub fn project_mutation(&self, project_id: ProjectId) {
        if let Err(err) = self.store.invalidate_prefix(PROJECT_LIST_NAMESPACE) {
            warn!("event=cache_degraded module=cache op=sweep namespace={PROJECT_LIST_NAMESPACE} error={err}");
        }
        self.invalidate(&[CacheKey::ProjectDetail(project_id)]);
    }

    fn ttl_for(&self, key: &CacheKey) -> Duration {
        if key.is_short_lived() {
            self.config.default_ttl / 2
        } else {
            self.config.default_ttl
        }
    }
}
