//! Request classification
//!
//! Every interceptable request is classified into exactly one resolution
//! strategy by matching its absolute URL against three ordered groups of
//! regular expressions. The first group containing a match wins; a URL
//! matching nothing gets the default strategy.
//!
//! Group precedence is fixed: network-first, then cache-first, then
//! stale-while-revalidate. Classification is pure and does no I/O, so the
//! same URL always maps to the same strategy for a given rule set.

use regex::Regex;
use thiserror::Error;
use url::Url;

/// Resolution strategy for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Try the network, fall back to the store
    NetworkFirst,
    /// Serve from the store, fetch only on a miss
    CacheFirst,
    /// Serve the stored copy immediately, refresh it in the background
    StaleWhileRevalidate,
    /// Cache-first with network fallback and same-origin-only persistence
    Default,
}

impl Strategy {
    /// Strategy name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::NetworkFirst => "network_first",
            Strategy::CacheFirst => "cache_first",
            Strategy::StaleWhileRevalidate => "stale_while_revalidate",
            Strategy::Default => "default",
        }
    }
}

/// A pattern that failed to compile
#[derive(Debug, Error)]
#[error("invalid pattern '{pattern}': {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Compiled classification rules
#[derive(Debug)]
pub struct RuleSet {
    network_first: Vec<Regex>,
    cache_first: Vec<Regex>,
    stale_while_revalidate: Vec<Regex>,
}

impl RuleSet {
    /// Compile the three pattern groups.
    /// Fails on the first pattern that is not a valid regular expression.
    pub fn compile(
        network_first: &[String],
        cache_first: &[String],
        stale_while_revalidate: &[String],
    ) -> Result<Self, PatternError> {
        Ok(Self {
            network_first: compile_group(network_first)?,
            cache_first: compile_group(cache_first)?,
            stale_while_revalidate: compile_group(stale_while_revalidate)?,
        })
    }

    /// A rule set with no patterns; every URL classifies as `Default`
    pub fn empty() -> Self {
        Self {
            network_first: Vec::new(),
            cache_first: Vec::new(),
            stale_while_revalidate: Vec::new(),
        }
    }

    /// Classify a URL into exactly one strategy
    pub fn classify(&self, url: &Url) -> Strategy {
        let target = url.as_str();

        if matches_any(&self.network_first, target) {
            Strategy::NetworkFirst
        } else if matches_any(&self.cache_first, target) {
            Strategy::CacheFirst
        } else if matches_any(&self.stale_while_revalidate, target) {
            Strategy::StaleWhileRevalidate
        } else {
            Strategy::Default
        }
    }
}

fn compile_group(patterns: &[String]) -> Result<Vec<Regex>, PatternError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| PatternError {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

fn matches_any(group: &[Regex], target: &str) -> bool {
    group.iter().any(|pattern| pattern.is_match(target))
}
