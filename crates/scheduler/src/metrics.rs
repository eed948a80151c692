//! Strategy metrics
//!
//! Atomic counters for tracking scheduler behaviour.
//! All operations use relaxed ordering for maximum performance.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a processing strategy instance
///
/// All counters use relaxed ordering for maximum performance.
/// These metrics are eventually consistent, not real-time.
///
/// # Thread Safety
///
/// All methods are safe to call from multiple threads concurrently.
/// The atomic operations ensure no data races, though values may be
/// slightly stale when read.
#[derive(Debug, Default)]
pub struct StrategyMetrics {
    /// Units presented to the strategy (accepted or not)
    units_submitted: AtomicU64,

    /// Units that completed every pipeline step
    units_completed: AtomicU64,

    /// Units that stopped on a step error
    units_failed: AtomicU64,

    /// Units cancelled before reaching a terminal step outcome
    units_cancelled: AtomicU64,

    /// Submissions rejected by the eager in-flight limit check
    capacity_rejections: AtomicU64,

    /// Submissions rejected for running inside a transaction
    transactional_rejections: AtomicU64,

    /// Steps handed off to the CPU-intensive pool
    cpu_handoffs: AtomicU64,

    /// Steps handed off to the blocking pool
    blocking_handoffs: AtomicU64,

    /// Steps executed inline on the event loop
    inline_steps: AtomicU64,
}

impl StrategyMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            units_submitted: AtomicU64::new(0),
            units_completed: AtomicU64::new(0),
            units_failed: AtomicU64::new(0),
            units_cancelled: AtomicU64::new(0),
            capacity_rejections: AtomicU64::new(0),
            transactional_rejections: AtomicU64::new(0),
            cpu_handoffs: AtomicU64::new(0),
            blocking_handoffs: AtomicU64::new(0),
            inline_steps: AtomicU64::new(0),
        }
    }

    /// Record a unit presented for submission
    ///
    /// Call this when a unit enters the strategy, before admission checks.
    #[inline]
    pub fn record_submitted(&self) {
        self.units_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a unit that completed all steps
    #[inline]
    pub fn record_completed(&self) {
        self.units_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a unit that stopped on a step error
    #[inline]
    pub fn record_failed(&self) {
        self.units_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a unit cancelled mid-flight
    #[inline]
    pub fn record_cancelled(&self) {
        self.units_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an eager limit-check rejection
    #[inline]
    pub fn record_capacity_rejection(&self) {
        self.capacity_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a submission rejected under a transaction
    #[inline]
    pub fn record_transactional_rejection(&self) {
        self.transactional_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a hand-off to the CPU-intensive pool
    #[inline]
    pub fn record_cpu_handoff(&self) {
        self.cpu_handoffs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a hand-off to the blocking pool
    #[inline]
    pub fn record_blocking_handoff(&self) {
        self.blocking_handoffs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a step executed inline on the event loop
    #[inline]
    pub fn record_inline_step(&self) {
        self.inline_steps.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    ///
    /// Returns a point-in-time copy of all counters.
    #[inline]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            units_submitted: self.units_submitted.load(Ordering::Relaxed),
            units_completed: self.units_completed.load(Ordering::Relaxed),
            units_failed: self.units_failed.load(Ordering::Relaxed),
            units_cancelled: self.units_cancelled.load(Ordering::Relaxed),
            capacity_rejections: self.capacity_rejections.load(Ordering::Relaxed),
            transactional_rejections: self.transactional_rejections.load(Ordering::Relaxed),
            cpu_handoffs: self.cpu_handoffs.load(Ordering::Relaxed),
            blocking_handoffs: self.blocking_handoffs.load(Ordering::Relaxed),
            inline_steps: self.inline_steps.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics to zero
    ///
    /// Useful for testing or periodic metric collection.
    pub fn reset(&self) {
        self.units_submitted.store(0, Ordering::Relaxed);
        self.units_completed.store(0, Ordering::Relaxed);
        self.units_failed.store(0, Ordering::Relaxed);
        self.units_cancelled.store(0, Ordering::Relaxed);
        self.capacity_rejections.store(0, Ordering::Relaxed);
        self.transactional_rejections.store(0, Ordering::Relaxed);
        self.cpu_handoffs.store(0, Ordering::Relaxed);
        self.blocking_handoffs.store(0, Ordering::Relaxed);
        self.inline_steps.store(0, Ordering::Relaxed);
    }

    // Direct accessors for individual metrics (for logging)

    /// Get units submitted count
    #[inline]
    pub fn units_submitted(&self) -> u64 {
        self.units_submitted.load(Ordering::Relaxed)
    }

    /// Get units completed count
    #[inline]
    pub fn units_completed(&self) -> u64 {
        self.units_completed.load(Ordering::Relaxed)
    }

    /// Get units failed count
    #[inline]
    pub fn units_failed(&self) -> u64 {
        self.units_failed.load(Ordering::Relaxed)
    }

    /// Get units cancelled count
    #[inline]
    pub fn units_cancelled(&self) -> u64 {
        self.units_cancelled.load(Ordering::Relaxed)
    }

    /// Get capacity rejection count
    #[inline]
    pub fn capacity_rejections(&self) -> u64 {
        self.capacity_rejections.load(Ordering::Relaxed)
    }
}

/// Point-in-time snapshot of strategy metrics
///
/// This is a simple struct that can be copied, compared, and serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Units presented to the strategy
    pub units_submitted: u64,
    /// Units that completed every step
    pub units_completed: u64,
    /// Units that stopped on a step error
    pub units_failed: u64,
    /// Units cancelled mid-flight
    pub units_cancelled: u64,
    /// Eager limit-check rejections
    pub capacity_rejections: u64,
    /// Transactional-context rejections
    pub transactional_rejections: u64,
    /// Hand-offs to the CPU-intensive pool
    pub cpu_handoffs: u64,
    /// Hand-offs to the blocking pool
    pub blocking_handoffs: u64,
    /// Steps executed inline on the event loop
    pub inline_steps: u64,
}

impl MetricsSnapshot {
    /// Calculate completion rate (0.0 - 1.0)
    ///
    /// Returns None if no units have been submitted.
    #[inline]
    pub fn completion_rate(&self) -> Option<f64> {
        if self.units_submitted == 0 {
            None
        } else {
            Some(self.units_completed as f64 / self.units_submitted as f64)
        }
    }

    /// Calculate rejection rate (0.0 - 1.0)
    ///
    /// Counts both capacity and transactional rejections.
    /// Returns None if no units have been submitted.
    #[inline]
    pub fn rejection_rate(&self) -> Option<f64> {
        if self.units_submitted == 0 {
            None
        } else {
            let rejected = self.capacity_rejections + self.transactional_rejections;
            Some(rejected as f64 / self.units_submitted as f64)
        }
    }

    /// Units that reached a terminal outcome
    #[inline]
    pub fn terminal_units(&self) -> u64 {
        self.units_completed + self.units_failed + self.units_cancelled
    }

    /// Calculate the difference from another snapshot
    ///
    /// Useful for calculating rates over time intervals.
    #[inline]
    pub fn diff(&self, previous: &MetricsSnapshot) -> MetricsSnapshot {
        MetricsSnapshot {
            units_submitted: self.units_submitted.saturating_sub(previous.units_submitted),
            units_completed: self.units_completed.saturating_sub(previous.units_completed),
            units_failed: self.units_failed.saturating_sub(previous.units_failed),
            units_cancelled: self.units_cancelled.saturating_sub(previous.units_cancelled),
            capacity_rejections: self
                .capacity_rejections
                .saturating_sub(previous.capacity_rejections),
            transactional_rejections: self
                .transactional_rejections
                .saturating_sub(previous.transactional_rejections),
            cpu_handoffs: self.cpu_handoffs.saturating_sub(previous.cpu_handoffs),
            blocking_handoffs: self
                .blocking_handoffs
                .saturating_sub(previous.blocking_handoffs),
            inline_steps: self.inline_steps.saturating_sub(previous.inline_steps),
        }
    }
}

// ============================================================================
// Rejection Tracker - Rate-limited logging for production visibility
// ============================================================================

/// Rate-limited rejection logging for production visibility
///
/// Aggregates eager capacity rejections and logs a summary every second
/// instead of per-event logging. This prevents log spam while ensuring
/// operators see that producers are outrunning the configured ceiling.
///
/// # Thresholds
///
/// - >0 rejections/sec: WARN level
/// - >100 rejections/sec: ERROR level (producers far outrun the ceiling)
///
/// # Thread Safety
///
/// All operations use atomics and are safe for concurrent access.
pub struct RejectionTracker {
    /// Rejections in current interval
    interval_rejections: AtomicU64,
    /// Last log time (epoch milliseconds)
    last_log_ms: AtomicU64,
}

/// Log interval in milliseconds
const LOG_INTERVAL_MS: u64 = 1000;
/// Critical threshold - rejections/sec that triggers ERROR level
const CRITICAL_REJECTION_THRESHOLD: u64 = 100;

impl RejectionTracker {
    /// Create a new tracker
    pub fn new() -> Self {
        Self {
            interval_rejections: AtomicU64::new(0),
            last_log_ms: AtomicU64::new(Self::now_ms()),
        }
    }

    /// Record a rejection event and check if we should log
    ///
    /// Call this when the eager limit check turns a submission away.
    /// Returns true if a log was emitted.
    pub fn record_rejection(&self, limit: usize) -> bool {
        self.interval_rejections.fetch_add(1, Ordering::Relaxed);

        self.maybe_log(limit)
    }

    /// Check if we should log and emit if so
    ///
    /// Returns true if a log was emitted.
    fn maybe_log(&self, limit: usize) -> bool {
        let now = Self::now_ms();
        let last = self.last_log_ms.load(Ordering::Relaxed);

        if now.saturating_sub(last) < LOG_INTERVAL_MS {
            return false;
        }

        // Try to claim the log slot (avoid duplicate logs from concurrent calls)
        if self
            .last_log_ms
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        // Swap out the counter
        let rejections = self.interval_rejections.swap(0, Ordering::Relaxed);

        if rejections == 0 {
            return false;
        }

        // Log at appropriate level
        if rejections > CRITICAL_REJECTION_THRESHOLD {
            tracing::error!(
                rejections = rejections,
                limit = limit,
                threshold = CRITICAL_REJECTION_THRESHOLD,
                "CRITICAL: sustained capacity rejections, producers outrun the ceiling"
            );
        } else {
            tracing::warn!(
                rejections = rejections,
                limit = limit,
                "capacity rejections in last second"
            );
        }

        true
    }

    /// Get current epoch milliseconds
    #[inline]
    fn now_ms() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// Get the current rejection count (for testing)
    #[cfg(test)]
    pub fn current_rejections(&self) -> u64 {
        self.interval_rejections.load(Ordering::Relaxed)
    }
}

impl Default for RejectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RejectionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RejectionTracker")
            .field(
                "interval_rejections",
                &self.interval_rejections.load(Ordering::Relaxed),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // RejectionTracker Tests
    // ========================================================================

    #[test]
    fn test_rejection_tracker_new() {
        let tracker = RejectionTracker::new();
        assert_eq!(tracker.current_rejections(), 0);
    }

    #[test]
    fn test_rejection_tracker_record() {
        let tracker = RejectionTracker::new();

        // Record rejections (won't log yet - not enough time elapsed)
        tracker.record_rejection(4);
        tracker.record_rejection(4);

        assert_eq!(tracker.current_rejections(), 2);
    }

    #[test]
    fn test_rejection_tracker_debug() {
        let tracker = RejectionTracker::new();
        tracker.record_rejection(8);

        let debug = format!("{:?}", tracker);
        assert!(debug.contains("RejectionTracker"));
        assert!(debug.contains("interval_rejections"));
    }

    // ========================================================================
    // StrategyMetrics Tests
    // ========================================================================

    #[test]
    fn test_metrics_new() {
        let metrics = StrategyMetrics::new();
        let snapshot = metrics.snapshot();

        assert_eq!(snapshot.units_submitted, 0);
        assert_eq!(snapshot.units_completed, 0);
        assert_eq!(snapshot.capacity_rejections, 0);
        assert_eq!(snapshot.cpu_handoffs, 0);
    }

    #[test]
    fn test_record_lifecycle_counters() {
        let metrics = StrategyMetrics::new();

        metrics.record_submitted();
        metrics.record_submitted();
        metrics.record_submitted();
        metrics.record_completed();
        metrics.record_failed();
        metrics.record_cancelled();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.units_submitted, 3);
        assert_eq!(snapshot.units_completed, 1);
        assert_eq!(snapshot.units_failed, 1);
        assert_eq!(snapshot.units_cancelled, 1);
        assert_eq!(snapshot.terminal_units(), 3);
    }

    #[test]
    fn test_record_rejections() {
        let metrics = StrategyMetrics::new();

        metrics.record_capacity_rejection();
        metrics.record_capacity_rejection();
        metrics.record_transactional_rejection();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.capacity_rejections, 2);
        assert_eq!(snapshot.transactional_rejections, 1);
        assert_eq!(metrics.capacity_rejections(), 2);
    }

    #[test]
    fn test_record_handoffs() {
        let metrics = StrategyMetrics::new();

        metrics.record_cpu_handoff();
        metrics.record_blocking_handoff();
        metrics.record_blocking_handoff();
        metrics.record_inline_step();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cpu_handoffs, 1);
        assert_eq!(snapshot.blocking_handoffs, 2);
        assert_eq!(snapshot.inline_steps, 1);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = StrategyMetrics::new();

        metrics.record_submitted();
        metrics.record_completed();
        metrics.record_capacity_rejection();
        metrics.reset();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
    }

    #[test]
    fn test_snapshot_completion_rate() {
        let snapshot = MetricsSnapshot {
            units_submitted: 100,
            units_completed: 95,
            units_failed: 5,
            ..Default::default()
        };

        assert_eq!(snapshot.completion_rate(), Some(0.95));
    }

    #[test]
    fn test_snapshot_completion_rate_empty() {
        let snapshot = MetricsSnapshot::default();
        assert_eq!(snapshot.completion_rate(), None);
    }

    #[test]
    fn test_snapshot_rejection_rate() {
        let snapshot = MetricsSnapshot {
            units_submitted: 100,
            capacity_rejections: 8,
            transactional_rejections: 2,
            ..Default::default()
        };

        assert_eq!(snapshot.rejection_rate(), Some(0.1));
    }

    #[test]
    fn test_snapshot_diff() {
        let prev = MetricsSnapshot {
            units_submitted: 100,
            units_completed: 95,
            cpu_handoffs: 50,
            ..Default::default()
        };

        let current = MetricsSnapshot {
            units_submitted: 200,
            units_completed: 190,
            cpu_handoffs: 120,
            ..Default::default()
        };

        let diff = current.diff(&prev);
        assert_eq!(diff.units_submitted, 100);
        assert_eq!(diff.units_completed, 95);
        assert_eq!(diff.cpu_handoffs, 70);
    }

    #[test]
    fn test_snapshot_diff_saturating() {
        let prev = MetricsSnapshot {
            units_submitted: 100,
            ..Default::default()
        };

        let current = MetricsSnapshot {
            units_submitted: 50, // Less than previous (shouldn't happen, but handle gracefully)
            ..Default::default()
        };

        let diff = current.diff(&prev);
        assert_eq!(diff.units_submitted, 0); // Saturating sub prevents underflow
    }

    #[test]
    fn test_metrics_default() {
        let metrics = StrategyMetrics::default();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(StrategyMetrics::new());
        let mut handles = vec![];

        // Spawn multiple threads incrementing metrics
        for _ in 0..4 {
            let m = Arc::clone(&metrics);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    m.record_submitted();
                    m.record_completed();
                    m.record_inline_step();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.units_submitted, 4000);
        assert_eq!(snapshot.units_completed, 4000);
        assert_eq!(snapshot.inline_steps, 4000);
    }
}
