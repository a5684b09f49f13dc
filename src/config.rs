//! # Typed run configuration
//!
//! The distilled source configures a run with free-form nested maps; this
//! crate replaces that with per-concern typed variants that validate
//! eagerly, rejecting unknown/invalid values at construction time rather
//! than at first use (spec §6, §9 "Config polymorphism").

use crate::error::ConfigError;

/// Workload generation parameters (spec §6).
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadConfig {
    /// Zipf skew parameter of the content popularity distribution.
    pub alpha: f64,
    /// Size of the content catalog.
    pub n_contents: usize,
    /// Number of warmup requests (telemetry suppressed).
    pub n_warmup: u64,
    /// Number of measured requests (telemetry recorded).
    pub n_measured: u64,
    /// Mean request arrival rate.
    pub rate: f64,
    /// Receiver popularity skew, used by [`crate::workload::StationarySit`]'s
    /// re-sort (see its doc comment for the preserved-not-fixed behaviour).
    pub beta: Option<f64>,
    /// Mean disconnection rate (SIT workloads only).
    pub disconnection_rate: Option<f64>,
}

impl WorkloadConfig {
    /// Validate field ranges, returning a [`ConfigError`] on the first
    /// violation (spec §7: negative alpha/beta/rate is a setup-time error).
    pub fn validate(self) -> Result<Self, ConfigError> {
        non_negative("alpha", self.alpha)?;
        non_negative("rate", self.rate)?;
        if let Some(beta) = self.beta {
            non_negative("beta", beta)?;
        }
        if let Some(rate) = self.disconnection_rate {
            non_negative("disconnection_rate", rate)?;
        }
        Ok(self)
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value < 0.0 {
        Err(ConfigError::NegativeParameter { field, value })
    } else {
        Ok(())
    }
}

/// Cache replacement policy (spec §4.1, §6: "Cache policy: `{name, …}`
/// (e.g. LRU)"). `Lru` is the only implemented policy — [`crate::cache`]
/// hard-codes LRU as the reference discipline — but the config surface
/// keeps the name as a distinct variant so an unsupported policy name
/// surfaces as a setup-time [`ConfigError`] instead of silently doing
/// something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicyConfig {
    /// Least-recently-used eviction (the only implemented policy).
    Lru,
}

impl CachePolicyConfig {
    /// Parse a policy name, rejecting anything but `"LRU"`.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "LRU" => Ok(CachePolicyConfig::Lru),
            other => Err(ConfigError::UnknownCachePolicy(other.to_string())),
        }
    }
}

/// The in-network caching policy applied on return-path delivery (spec
/// §4.4's "caching policy" table).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CachingPolicy {
    /// Cache at every on-path cache (Leave Copy Everywhere).
    Lce,
    /// Cache only one hop downstream of the node that served the hit
    /// (Leave Copy Down).
    Lcd,
    /// Cache at the return-path node of maximum betweenness centrality.
    Cl4M,
    /// Cache at a uniformly-random on-path cache with probability `p`.
    Bernoulli(f64),
    /// Cache at exactly one uniformly-chosen on-path cache.
    Choice,
    /// Cache with `ProbCache`'s per-node probability formula, parameterized
    /// by the time-window constant `t_tw`.
    ProbCache {
        /// Time-window constant in the probability formula.
        t_tw: f64,
    },
    /// Never cache on return.
    NoCache,
}

/// Joint cache/RSN placement parameters (spec §6).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementConfig {
    /// Total cache budget across the network.
    pub network_cache: usize,
    /// Total RSN budget across the network.
    pub network_rsn: usize,
    /// Fraction of the joint budget allotted to RSN (vs. cache).
    pub rsn_cache_ratio: f64,
}

impl PlacementConfig {
    /// Validate the ratio is within `[0, 1]` and budgets are placeable on
    /// `node_count` nodes (spec §7: "target-mismatch in placement").
    pub fn validate(self, node_count: usize) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&self.rsn_cache_ratio) {
            return Err(ConfigError::PlacementMismatch(format!(
                "rsn_cache_ratio must be in [0, 1], got {}",
                self.rsn_cache_ratio
            )));
        }
        if self.network_cache > 0 && node_count == 0 {
            return Err(ConfigError::PlacementMismatch(
                "non-zero cache budget but topology has no nodes".to_string(),
            ));
        }
        Ok(self)
    }
}

/// RSN freshness/expiration parameters shared by every RSN-aware strategy
/// (spec §3: `F ≤ X`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsnTimingConfig {
    /// Fresh interval `F`.
    pub fresh_interval: f64,
    /// Expiration interval `X`.
    pub expiration_interval: f64,
}

impl RsnTimingConfig {
    /// Validate `F <= X`.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.fresh_interval > self.expiration_interval {
            return Err(ConfigError::FreshAfterExpiration {
                fresh: self.fresh_interval,
                expiration: self.expiration_interval,
            });
        }
        Ok(self)
    }
}

/// The caching policy [`crate::strategy::Strategy::Nrr`] applies on return;
/// spec §4.4 restricts NRR's `metacaching` option to LCE or LCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NrrCaching {
    /// Leave Copy Everywhere.
    Lce,
    /// Leave Copy Down.
    Lcd,
}

/// Free-form per-strategy knobs (spec §6's strategy config bullet), typed
/// instead of the distilled source's nested dict. Each
/// [`crate::strategy::Strategy`] variant recognizes only a subset of these;
/// [`crate::strategy::Strategy::from_name_and_options`] rejects any field a
/// given strategy does not honor as [`ConfigError::UnknownOption`], and any
/// field a strategy requires but that is absent as
/// [`ConfigError::MissingOption`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StrategyOptions {
    /// Per-hop caching/flooding probability (`RANDOM-BERNOULLI`, `SCOPED-FLOODING`, `LIRA-DFIB`).
    pub p: Option<f64>,
    /// Extra hops added to an off-path quota beyond the on-path length.
    pub extra_quota: Option<u32>,
    /// Parallel off-path explorations per on-path node.
    pub fan_out: Option<usize>,
    /// Flood radius, in hops.
    pub scope: Option<u32>,
    /// Maximum off-path detour length; absent means unbounded.
    pub max_detour: Option<u32>,
    /// Stretch budget as a fraction of the topology diameter (hashrouting hybrid-AM).
    pub max_stretch: Option<f64>,
    /// Time-window constant of the `ProbCache` formula.
    pub t_tw: Option<f64>,
    /// Whether to prefer on-path RSN hints over fan-out exploration (`LIRA-DFIB`).
    pub onpath_hint: Option<bool>,
    /// Return-path caching policy for `NRR` (LCE or LCD).
    pub metacaching: Option<NrrCaching>,
}

impl StrategyOptions {
    /// An empty option set, for strategies that take no knobs at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check that only fields named in `allowed` are set; any other set
    /// field is an unknown option for the strategy being built.
    pub(crate) fn ensure_only(&self, allowed: &[&'static str]) -> Result<(), ConfigError> {
        let present: [(&'static str, bool); 9] = [
            ("p", self.p.is_some()),
            ("extra_quota", self.extra_quota.is_some()),
            ("fan_out", self.fan_out.is_some()),
            ("scope", self.scope.is_some()),
            ("max_detour", self.max_detour.is_some()),
            ("max_stretch", self.max_stretch.is_some()),
            ("t_tw", self.t_tw.is_some()),
            ("onpath_hint", self.onpath_hint.is_some()),
            ("metacaching", self.metacaching.is_some()),
        ];
        for (field, set) in present {
            if set && !allowed.contains(&field) {
                return Err(ConfigError::UnknownOption(field.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workload_config_rejects_negative_alpha() {
        let cfg = WorkloadConfig {
            alpha: -0.5,
            n_contents: 100,
            n_warmup: 0,
            n_measured: 10,
            rate: 1.0,
            beta: None,
            disconnection_rate: None,
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NegativeParameter { field: "alpha", value: -0.5 })
        );
    }

    #[test]
    fn cache_policy_rejects_unknown_name() {
        assert_eq!(
            CachePolicyConfig::from_name("FIFO"),
            Err(ConfigError::UnknownCachePolicy("FIFO".to_string()))
        );
    }

    #[test]
    fn rsn_timing_requires_fresh_before_expiration() {
        let cfg = RsnTimingConfig { fresh_interval: 20.0, expiration_interval: 10.0 };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::FreshAfterExpiration { fresh: 20.0, expiration: 10.0 })
        );
    }

    #[test]
    fn placement_rejects_ratio_out_of_range() {
        let cfg = PlacementConfig { network_cache: 10, network_rsn: 5, rsn_cache_ratio: 1.5 };
        assert!(cfg.validate(3).is_err());
    }

    #[test]
    fn strategy_options_rejects_field_not_in_allow_list() {
        let opts = StrategyOptions { scope: Some(2), ..StrategyOptions::empty() };
        assert_eq!(opts.ensure_only(&["p"]), Err(ConfigError::UnknownOption("scope".to_string())));
    }

    #[test]
    fn strategy_options_accepts_allowed_fields() {
        let opts = StrategyOptions { p: Some(0.5), ..StrategyOptions::empty() };
        assert!(opts.ensure_only(&["p", "extra_quota"]).is_ok());
    }
}
