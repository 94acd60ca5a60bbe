//! Orchestrator configuration loaded from environment variables with
//! sensible defaults.

use cakepicnic_core::types::Fee;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration as StdDuration;

/// Default pending-action TTL: 10 minutes.
const DEFAULT_PENDING_TTL_SECS: u64 = 600;
/// Default receipt poll interval: 2 seconds.
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
/// Default number of unresolved actions examined per poll pass.
const DEFAULT_POLL_BATCH: usize = 100;
/// Default registration fee: 0.01 ether in wei.
const DEFAULT_TIER_FEE_WEI: u64 = 10_000_000_000_000_000;

/// Runtime knobs for the submit → await → commit pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Seconds an action may await confirmation before `TimedOut`
    pub pending_ttl_secs: u64,
    /// Milliseconds between receipt poll passes
    pub poll_interval_ms: u64,
    /// Unresolved actions examined per poll pass
    pub poll_batch: usize,
    /// Registration fee per tier, in wei; validated before submission
    pub fee_schedule: HashMap<String, u64>,
}

impl OrchestratorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// `ORCHESTRATOR_FEE_SCHEDULE` is a comma-separated `tier=wei` list,
    /// e.g. `standard=10000000000000000,patron=50000000000000000`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            pending_ttl_secs: env::var("ORCHESTRATOR_PENDING_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PENDING_TTL_SECS),
            poll_interval_ms: env::var("ORCHESTRATOR_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            poll_batch: env::var("ORCHESTRATOR_POLL_BATCH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_POLL_BATCH),
            fee_schedule: env::var("ORCHESTRATOR_FEE_SCHEDULE")
                .ok()
                .map_or_else(Self::default_fee_schedule, |v| parse_fee_schedule(&v)),
        }
    }

    fn default_fee_schedule() -> HashMap<String, u64> {
        HashMap::from([("standard".to_string(), DEFAULT_TIER_FEE_WEI)])
    }

    /// The configured fee for a tier, if the tier exists.
    #[must_use]
    pub fn fee_for(&self, tier: &str) -> Option<Fee> {
        self.fee_schedule.get(tier).copied().map(Fee::from_wei)
    }

    /// Pending-action TTL as a chrono duration.
    #[must_use]
    pub fn pending_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.pending_ttl_secs).unwrap_or(i64::MAX))
    }

    /// Receipt poll interval as a std duration.
    #[must_use]
    pub const fn poll_interval(&self) -> StdDuration {
        StdDuration::from_millis(self.poll_interval_ms)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: DEFAULT_PENDING_TTL_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_batch: DEFAULT_POLL_BATCH,
            fee_schedule: Self::default_fee_schedule(),
        }
    }
}

fn parse_fee_schedule(raw: &str) -> HashMap<String, u64> {
    raw.split(',')
        .filter_map(|entry| {
            let (tier, wei) = entry.split_once('=')?;
            let tier = tier.trim();
            if tier.is_empty() {
                return None;
            }
            Some((tier.to_string(), wei.trim().parse().ok()?))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fee_schedule_parses_tier_entries() {
        let schedule = parse_fee_schedule("standard=100,patron=500");
        assert_eq!(schedule.get("standard"), Some(&100));
        assert_eq!(schedule.get("patron"), Some(&500));
    }

    #[test]
    fn fee_schedule_skips_malformed_entries() {
        let schedule = parse_fee_schedule("standard=100,broken,=7,patron=abc");
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.get("standard"), Some(&100));
    }

    #[test]
    fn defaults_carry_a_standard_tier() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.fee_for("standard"), Some(Fee::from_wei(DEFAULT_TIER_FEE_WEI)));
        assert_eq!(config.fee_for("unknown"), None);
        assert_eq!(config.pending_ttl(), chrono::Duration::seconds(600));
    }
}
