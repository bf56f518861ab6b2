//! Sliding-window admission with escalating backoff.

use crate::config::RateLimiterConfig;
use crate::events::RateLimiterEvent;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

/// Read-only view of the limiter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RateLimiterStats {
    /// Admissions recorded inside the trailing window.
    pub requests_in_window: usize,
    /// Multiplier the next saturation event would start from.
    pub backoff_multiplier: f64,
}

#[derive(Debug)]
struct BackoffState {
    multiplier: f64,
    last_backoff_at: Option<Instant>,
}

impl BackoffState {
    fn within_horizon(&self, now: Instant, horizon: Duration) -> bool {
        self.last_backoff_at
            .is_some_and(|at| now.saturating_duration_since(at) < horizon)
    }

    /// Records a saturation event at `now` and returns the multiplier to use.
    fn escalate(&mut self, now: Instant, config: &RateLimiterConfig) -> f64 {
        self.multiplier = if self.within_horizon(now, config.backoff_horizon) {
            (self.multiplier * config.backoff_factor).min(config.max_backoff_multiplier)
        } else {
            1.0
        };
        self.last_backoff_at = Some(now);
        self.multiplier
    }
}

#[derive(Debug)]
struct WindowState {
    admitted: VecDeque<Instant>,
    backoff: BackoffState,
}

impl WindowState {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.admitted.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }
    }
}

enum Admission {
    Admitted,
    Wait {
        wait: Duration,
        multiplier: f64,
        requests_in_window: usize,
    },
}

/// A rate limiter over a sliding window of admission timestamps.
///
/// Callers never fail: [`wait_if_needed`](Self::wait_if_needed) only delays.
/// The window lock is held for the prune-check-append sequence and released
/// before sleeping, so a sleeping caller never blocks the others. Each caller
/// computes its own jittered wait and re-checks the window after waking, which
/// keeps the invariant that no trailing window ever holds more than
/// `max_requests` admissions.
pub struct SlidingWindowLimiter {
    config: RateLimiterConfig,
    state: Mutex<WindowState>,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            state: Mutex::new(WindowState {
                admitted: VecDeque::new(),
                backoff: BackoffState {
                    multiplier: 1.0,
                    last_backoff_at: None,
                },
            }),
            config,
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Suspends until one more request fits in the window, then records it.
    ///
    /// Returns how long the caller waited in total.
    pub async fn wait_if_needed(&self) -> Duration {
        let started = Instant::now();

        loop {
            match self.try_admit() {
                Admission::Admitted => {
                    let waited = started.elapsed();
                    self.config
                        .event_listeners
                        .emit(&RateLimiterEvent::PermitAcquired {
                            pattern_name: self.config.name.clone(),
                            timestamp: Instant::now(),
                            waited,
                        });

                    #[cfg(feature = "metrics")]
                    histogram!("ratelimiter_wait_seconds", "ratelimiter" => self.config.name.clone())
                        .record(waited.as_secs_f64());

                    return waited;
                }
                Admission::Wait {
                    wait,
                    multiplier,
                    requests_in_window,
                } => {
                    #[cfg(feature = "tracing")]
                    warn!(
                        ratelimiter = %self.config.name,
                        wait_ms = wait.as_millis() as u64,
                        multiplier,
                        requests_in_window,
                        "rate limit window saturated, backing off"
                    );

                    #[cfg(feature = "metrics")]
                    counter!("ratelimiter_backoffs_total", "ratelimiter" => self.config.name.clone())
                        .increment(1);

                    self.config.event_listeners.emit(&RateLimiterEvent::Backoff {
                        pattern_name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        wait,
                        multiplier,
                        requests_in_window,
                    });

                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    fn try_admit(&self) -> Admission {
        let mut state = self.state.lock();
        let now = Instant::now();
        state.prune(now, self.config.window);

        let requests_in_window = state.admitted.len();
        if requests_in_window < self.config.max_requests {
            state.admitted.push_back(now);

            #[cfg(feature = "tracing")]
            debug!(
                ratelimiter = %self.config.name,
                requests_in_window = requests_in_window + 1,
                "request admitted"
            );

            return Admission::Admitted;
        }

        let oldest = state.admitted.front().copied().unwrap_or(now);
        let until_slot_frees = self
            .config
            .window
            .saturating_sub(now.saturating_duration_since(oldest));
        let multiplier = state.backoff.escalate(now, &self.config);

        let (low, high) = self.config.jitter;
        let jitter = if low < high {
            rand::rng().random_range(low..=high)
        } else {
            low
        };
        let wait = until_slot_frees
            .mul_f64(multiplier * jitter)
            .max(self.config.min_wait);

        Admission::Wait {
            wait,
            multiplier,
            requests_in_window,
        }
    }

    /// Snapshot of the window and backoff state. Never mutates either.
    ///
    /// A multiplier whose last saturation event is older than the backoff
    /// horizon is reported as 1, since that is what the next saturation
    /// event would reset it to.
    pub fn stats(&self) -> RateLimiterStats {
        let state = self.state.lock();
        let now = Instant::now();
        let requests_in_window = state
            .admitted
            .iter()
            .filter(|&&at| now.saturating_duration_since(at) < self.config.window)
            .count();
        let backoff_multiplier = if state.backoff.within_horizon(now, self.config.backoff_horizon) {
            state.backoff.multiplier
        } else {
            1.0
        };

        RateLimiterStats {
            requests_in_window,
            backoff_multiplier,
        }
    }
}

impl std::fmt::Debug for SlidingWindowLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlidingWindowLimiter")
            .field("name", &self.config.name)
            .field("max_requests", &self.config.max_requests)
            .field("window", &self.config.window)
            .finish()
    }
}
