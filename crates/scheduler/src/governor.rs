//! Concurrency governor
//!
//! Derives the parallelism factor that sizes the event-loop pool and
//! parametrizes the backpressure sink. Everything here is computed once
//! at strategy construction; nothing is re-evaluated at runtime.

use std::fmt;

/// Concurrency ceiling for a strategy instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxConcurrency {
    /// No ceiling; the in-flight counter only tracks, never rejects
    Unbounded,
    /// At most this many units in flight at once
    Limit(usize),
}

impl MaxConcurrency {
    /// The ceiling as an optional count
    #[inline]
    pub fn limit(&self) -> Option<usize> {
        match self {
            MaxConcurrency::Unbounded => None,
            MaxConcurrency::Limit(limit) => Some(*limit),
        }
    }

    /// Whether a ceiling is configured
    #[inline]
    pub fn is_bounded(&self) -> bool {
        matches!(self, MaxConcurrency::Limit(_))
    }
}

impl From<Option<usize>> for MaxConcurrency {
    fn from(value: Option<usize>) -> Self {
        match value {
            Some(limit) => MaxConcurrency::Limit(limit),
            None => MaxConcurrency::Unbounded,
        }
    }
}

impl fmt::Display for MaxConcurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxConcurrency::Unbounded => f.write_str("unbounded"),
            MaxConcurrency::Limit(limit) => write!(f, "{}", limit),
        }
    }
}

/// Parallelism decisions for one strategy instance
///
/// The governor turns three construction-time inputs (machine cores `C`,
/// lane count `S`, concurrency ceiling `M`) into a parallelism factor `P`:
///
/// - unbounded `M`: `P = max(C / S, 1)` - spread the cores across lanes
/// - bounded `M`: with `f = max(M / S, 1)` as a real ratio, `P` is the
///   largest integer in `[2, C]` that divides `f` evenly, else `1`
///
/// The event-loop pool gets `S * P` threads, so each lane can make `P`
/// units of progress concurrently without oversubscribing the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyGovernor {
    cores: usize,
    lanes: usize,
    max_concurrency: MaxConcurrency,
    parallelism: usize,
}

impl ConcurrencyGovernor {
    /// Compute the parallelism factor for the given inputs
    ///
    /// `cores` and `lanes` are clamped to at least 1.
    pub fn new(cores: usize, lanes: usize, max_concurrency: MaxConcurrency) -> Self {
        let cores = cores.max(1);
        let lanes = lanes.max(1);
        let parallelism = parallelism_factor(cores, lanes, max_concurrency);

        Self {
            cores,
            lanes,
            max_concurrency,
            parallelism,
        }
    }

    /// Machine cores the computation was based on
    #[inline]
    pub fn cores(&self) -> usize {
        self.cores
    }

    /// Number of lanes (ring subscribers)
    #[inline]
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// The configured concurrency ceiling
    #[inline]
    pub fn max_concurrency(&self) -> MaxConcurrency {
        self.max_concurrency
    }

    /// The parallelism factor `P`
    #[inline]
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Derived event-loop pool size: `lanes * parallelism`
    #[inline]
    pub fn event_loop_threads(&self) -> usize {
        self.lanes * self.parallelism
    }
}

/// The factor computation itself
///
/// For a bounded ceiling the ratio `M / S` is kept as a real number, so a
/// fractional per-lane budget (say `M = 3` over `S = 2`) never divides
/// evenly and collapses to a factor of 1 instead of rounding up.
fn parallelism_factor(cores: usize, lanes: usize, max_concurrency: MaxConcurrency) -> usize {
    match max_concurrency {
        MaxConcurrency::Unbounded => (cores / lanes).max(1),
        MaxConcurrency::Limit(limit) => {
            let ratio = (limit as f64 / lanes as f64).max(1.0);
            for candidate in (2..=cores).rev() {
                if ratio % candidate as f64 == 0.0 {
                    return candidate;
                }
            }
            1
        }
    }
}
