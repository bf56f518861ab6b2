//! Bucketed rolling window of call outcomes and latencies.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome counters for a span of time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Counts {
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub rejects: u64,
    pub fallbacks: u64,
}

impl Counts {
    fn add(&mut self, other: &Counts) {
        self.successes += other.successes;
        self.failures += other.failures;
        self.timeouts += other.timeouts;
        self.rejects += other.rejects;
        self.fallbacks += other.fallbacks;
    }

    /// Calls that reached the wrapped service.
    pub fn executed(&self) -> u64 {
        self.successes + self.failures + self.timeouts
    }

    /// Share of executed calls that failed or timed out.
    pub fn failure_rate(&self) -> f64 {
        match self.executed() {
            0 => 0.0,
            executed => (self.failures + self.timeouts) as f64 / executed as f64,
        }
    }
}

/// Latency distribution of executed calls in the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LatencySummary {
    pub mean: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
    pub max: Duration,
}

impl LatencySummary {
    fn from_samples(mut samples: Vec<Duration>) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        samples.sort_unstable();

        let total: Duration = samples.iter().sum();
        let mean = total / samples.len() as u32;

        Self {
            mean,
            p50: percentile(&samples, 0.50),
            p90: percentile(&samples, 0.90),
            p99: percentile(&samples, 0.99),
            max: samples[samples.len() - 1],
        }
    }
}

/// Nearest-rank percentile over sorted, non-empty samples.
fn percentile(sorted: &[Duration], p: f64) -> Duration {
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[derive(Debug)]
struct Bucket {
    started: Instant,
    counts: Counts,
    latencies: Vec<Duration>,
}

/// A window of `span` split into buckets of `span / buckets`.
///
/// Whole buckets fall out of the window at once, so the effective window
/// slides in steps of one bucket.
#[derive(Debug)]
pub(crate) struct RollingWindow {
    span: Duration,
    bucket_span: Duration,
    buckets: VecDeque<Bucket>,
}

impl RollingWindow {
    pub fn new(span: Duration, buckets: u32) -> Self {
        let buckets = buckets.max(1);
        Self {
            span,
            bucket_span: span / buckets,
            buckets: VecDeque::with_capacity(buckets as usize + 1),
        }
    }

    fn in_window(&self, bucket: &Bucket, now: Instant) -> bool {
        now.saturating_duration_since(bucket.started) < self.span
    }

    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.buckets.front() {
            if self.in_window(front, now) {
                break;
            }
            self.buckets.pop_front();
        }
    }

    fn record(&mut self, now: Instant, update: impl FnOnce(&mut Bucket)) {
        self.evict(now);
        let needs_bucket = self.buckets.back().map_or(true, |bucket| {
            now.saturating_duration_since(bucket.started) >= self.bucket_span
        });
        if needs_bucket {
            self.buckets.push_back(Bucket {
                started: now,
                counts: Counts::default(),
                latencies: Vec::new(),
            });
        }
        if let Some(bucket) = self.buckets.back_mut() {
            update(bucket);
        }
    }

    pub fn record_success(&mut self, now: Instant, latency: Duration) {
        self.record(now, |bucket| {
            bucket.counts.successes += 1;
            bucket.latencies.push(latency);
        });
    }

    pub fn record_failure(&mut self, now: Instant, latency: Duration) {
        self.record(now, |bucket| {
            bucket.counts.failures += 1;
            bucket.latencies.push(latency);
        });
    }

    pub fn record_timeout(&mut self, now: Instant, latency: Duration) {
        self.record(now, |bucket| {
            bucket.counts.timeouts += 1;
            bucket.latencies.push(latency);
        });
    }

    pub fn record_reject(&mut self, now: Instant) {
        self.record(now, |bucket| bucket.counts.rejects += 1);
    }

    pub fn record_fallback(&mut self, now: Instant) {
        self.record(now, |bucket| bucket.counts.fallbacks += 1);
    }

    /// Totals over the buckets still inside the window at `now`.
    pub fn counts(&self, now: Instant) -> Counts {
        let mut total = Counts::default();
        for bucket in self.buckets.iter().filter(|b| self.in_window(b, now)) {
            total.add(&bucket.counts);
        }
        total
    }

    pub fn latency(&self, now: Instant) -> LatencySummary {
        let samples = self
            .buckets
            .iter()
            .filter(|b| self.in_window(b, now))
            .flat_map(|b| b.latencies.iter().copied())
            .collect();
        LatencySummary::from_samples(samples)
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
