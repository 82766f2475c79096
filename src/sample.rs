//! Per-host reservoir sampling of a URL list.
//!
//! Picks up to `k` URLs uniformly at random for every host in one pass,
//! without holding more than `k` URLs per host in memory.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::parser::parse_url_line;

#[derive(Debug, Default)]
struct Reservoir {
    seen: usize,
    picks: Vec<String>,
}

/// Reservoir sampler keyed by host.
#[derive(Debug)]
pub struct HostSampler {
    k: usize,
    hosts: BTreeMap<String, Reservoir>,
    rng: StdRng,
}

impl HostSampler {
    /// Creates a sampler keeping `k` URLs per host, seeded from the OS.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self::with_rng(k, StdRng::from_entropy())
    }

    /// Creates a sampler with an explicit random source.
    #[must_use]
    pub fn with_rng(k: usize, rng: StdRng) -> Self {
        Self {
            k,
            hosts: BTreeMap::new(),
            rng,
        }
    }

    /// Offers one input line to the sampler.
    ///
    /// Returns false when the line holds no valid URL.
    pub fn check_in(&mut self, line: &str) -> bool {
        let Ok(Some(parsed)) = parse_url_line(line) else {
            return false;
        };
        let url = line.trim().to_string();
        let reservoir = self.hosts.entry(parsed.host().to_string()).or_default();
        reservoir.seen += 1;

        if reservoir.picks.len() < self.k {
            reservoir.picks.push(url);
        } else {
            let slot = self.rng.gen_range(0..reservoir.seen);
            if slot < self.k {
                trace!(host = parsed.host(), slot, "reservoir replacement");
                reservoir.picks[slot] = url;
            }
        }
        true
    }

    /// Number of distinct hosts seen so far.
    #[must_use]
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Full samples, by host: only hosts that saw at least `k` URLs.
    #[must_use]
    pub fn samples(&self) -> Vec<(&str, &[String])> {
        self.hosts
            .iter()
            .filter(|(_, r)| self.k > 0 && r.seen >= self.k)
            .map(|(host, r)| (host.as_str(), r.picks.as_slice()))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn seeded(k: usize) -> HostSampler {
        HostSampler::with_rng(k, StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_hosts_below_k_are_not_reported() {
        let mut sampler = seeded(3);
        for i in 0..5 {
            assert!(sampler.check_in(&format!("http://a.example/{i}")));
        }
        sampler.check_in("http://b.example/1");
        sampler.check_in("http://b.example/2");

        let samples = sampler.samples();
        assert_eq!(sampler.host_count(), 2);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].0, "a.example");
        assert_eq!(samples[0].1.len(), 3);
    }

    #[test]
    fn test_samples_come_from_own_host() {
        let mut sampler = seeded(2);
        for i in 0..50 {
            sampler.check_in(&format!("http://a.example/{i}"));
            sampler.check_in(&format!("http://b.example/{i}"));
        }
        for (host, picks) in sampler.samples() {
            assert_eq!(picks.len(), 2);
            assert!(picks.iter().all(|u| u.starts_with(&format!("http://{host}/"))));
        }
    }

    #[test]
    fn test_reservoir_is_not_just_the_first_k() {
        let mut sampler = seeded(2);
        for i in 0..1000 {
            sampler.check_in(&format!("http://a.example/{i}"));
        }
        let picks = sampler.samples()[0].1.to_vec();
        assert_ne!(picks, ["http://a.example/0", "http://a.example/1"]);
    }

    #[test]
    fn test_invalid_lines_are_ignored() {
        let mut sampler = seeded(1);
        assert!(!sampler.check_in(""));
        assert!(!sampler.check_in("nonsense"));
        assert_eq!(sampler.host_count(), 0);
    }

    #[test]
    fn test_zero_k_reports_nothing() {
        let mut sampler = seeded(0);
        sampler.check_in("http://a.example/1");
        assert!(sampler.samples().is_empty());
    }
}
