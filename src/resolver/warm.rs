//! Pre-resolves a set of hosts so later download runs start with a warm cache.

use std::collections::BTreeSet;

use futures_util::{StreamExt, stream};
use tracing::{debug, info, instrument};

use super::pool::ResolverHandle;

/// Outcome counts of a warm-up pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmSummary {
    /// Distinct hosts submitted.
    pub hosts: usize,
    /// Hosts that resolved to an address.
    pub resolved: usize,
    /// Hosts whose resolution failed.
    pub failed: usize,
}

/// Resolves every host in `hosts` through the pool.
///
/// At most `concurrency` requests are in flight at once; duplicates are
/// resolved once. Failures are recorded in the pool's cache like any other
/// lookup.
#[instrument(skip(resolver, hosts))]
pub async fn warm_cache<I>(resolver: &ResolverHandle, hosts: I, concurrency: usize) -> WarmSummary
where
    I: IntoIterator<Item = String>,
{
    let hosts: BTreeSet<String> = hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect();
    let total = hosts.len();
    info!(hosts = total, "warming resolution cache");

    let outcomes: Vec<bool> = stream::iter(hosts)
        .map(|host| async move {
            match resolver.resolve(&host).await {
                Ok(addr) => {
                    debug!(host = %host, addr = %addr, "warm");
                    true
                }
                Err(e) => {
                    debug!(host = %host, error = %e, "warm failed");
                    false
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let resolved = outcomes.iter().filter(|ok| **ok).count();
    WarmSummary {
        hosts: total,
        resolved,
        failed: total - resolved,
    }
}
