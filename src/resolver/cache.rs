//! Process-wide hostname → resolution outcome cache.
//!
//! Entries never expire: once a host has been resolved (successfully or not)
//! it is not queried again for the lifetime of the cache. Failures are
//! stored explicitly so a repeated miss does not trigger another live lookup.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::path::Path;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::error::SnapshotError;
use super::snapshot::{read_snapshot, write_snapshot};

/// Cached outcome of resolving one hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionEntry {
    /// First address returned by the lookup.
    Address(IpAddr),
    /// The lookup failed; carries the error description.
    Failed(String),
}

impl ResolutionEntry {
    /// Returns the address for a successful entry.
    #[must_use]
    pub fn address(&self) -> Option<IpAddr> {
        match self {
            Self::Address(addr) => Some(*addr),
            Self::Failed(_) => None,
        }
    }

    /// Whether this entry records a failed lookup.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ResolutionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(addr) => write!(f, "{addr}"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Counts of cached successes and failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheSummary {
    /// Total number of entries.
    pub total: usize,
    /// Entries holding an address.
    pub ok: usize,
    /// Entries holding a failure.
    pub failed: usize,
}

/// Thread-safe resolution cache with first-writer-wins stores.
///
/// Designed to be wrapped in `Arc` and shared by every resolver worker.
/// Host keys are compared case-insensitively.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: DashMap<String, ResolutionEntry>,
}

impl ResolutionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a cache from a snapshot file.
    ///
    /// A missing file yields an empty cache.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when the file exists but cannot be read or
    /// is not a valid snapshot.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load_snapshot(path: &Path) -> Result<Self, SnapshotError> {
        let cache = Self::new();
        if let Some(entries) = read_snapshot(path)? {
            for (host, entry) in entries {
                cache.entries.insert(normalize(&host), entry);
            }
        }
        debug!(entries = cache.len(), "loaded resolution cache");
        Ok(cache)
    }

    /// Persists the full mapping to `path`.
    ///
    /// The snapshot is written to a temporary sibling file and renamed over
    /// the target, so an interrupted save leaves the previous file intact.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when encoding or any filesystem step fails.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn save_snapshot(&self, path: &Path) -> Result<(), SnapshotError> {
        let entries: BTreeMap<String, ResolutionEntry> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let count = entries.len();
        write_snapshot(path, entries)?;
        info!(entries = count, "saved resolution cache");
        Ok(())
    }

    /// Returns the cached entry for `host`, if any.
    #[must_use]
    pub fn lookup(&self, host: &str) -> Option<ResolutionEntry> {
        self.entries.get(&normalize(host)).map(|e| e.value().clone())
    }

    /// Stores `entry` for `host` unless an entry already exists.
    ///
    /// Returns the entry that is in the cache after the call: `entry` itself
    /// for the first writer, the earlier value for everyone else.
    pub fn store(&self, host: &str, entry: ResolutionEntry) -> ResolutionEntry {
        self.entries
            .entry(normalize(host))
            .or_insert(entry)
            .value()
            .clone()
    }

    /// Drops every failed entry so those hosts are looked up again.
    ///
    /// Returns the number of entries removed.
    pub fn forget_failures(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_failed());
        before - self.entries.len()
    }

    /// Lists `(host, reason)` for every cached failure, sorted by host.
    #[must_use]
    pub fn failures(&self) -> Vec<(String, String)> {
        let mut failures: Vec<(String, String)> = self
            .entries
            .iter()
            .filter_map(|e| match e.value() {
                ResolutionEntry::Failed(reason) => Some((e.key().clone(), reason.clone())),
                ResolutionEntry::Address(_) => None,
            })
            .collect();
        failures.sort();
        failures
    }

    /// Counts cached successes and failures.
    #[must_use]
    pub fn summary(&self) -> CacheSummary {
        let failed = self.entries.iter().filter(|e| e.value().is_failed()).count();
        let total = self.entries.len();
        CacheSummary {
            total,
            ok: total - failed,
            failed,
        }
    }

    /// Number of cached hosts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(host: &str) -> String {
    host.to_ascii_lowercase()
}
