//! Retry policies for blocking acquisition.

use std::time::Duration;

use rand::Rng;

/// Produces successive waits between acquire attempts.
///
/// Each call to [`next`](RetryStrategy::next) consumes one retry. `Some(wait)`
/// means "sleep for `wait`, then try again"; `None` means give up. A strategy
/// is stateful and belongs to a single acquire call.
pub trait RetryStrategy: Send {
    fn next(&mut self) -> Option<Duration>;
}

impl<R: RetryStrategy + ?Sized> RetryStrategy for &mut R {
    fn next(&mut self) -> Option<Duration> {
        (**self).next()
    }
}

impl<R: RetryStrategy + ?Sized> RetryStrategy for Box<R> {
    fn next(&mut self) -> Option<Duration> {
        (**self).next()
    }
}

/// Waits a constant interval, up to `max` retries.
#[derive(Debug, Clone)]
pub struct FixedIntervalRetry {
    interval: Duration,
    max: u32,
    count: u32,
}

impl FixedIntervalRetry {
    pub fn new(interval: Duration, max: u32) -> Self {
        Self {
            interval,
            max,
            count: 0,
        }
    }

    /// Number of times [`next`](RetryStrategy::next) has been called.
    pub fn count(&self) -> u32 {
        self.count
    }
}

impl RetryStrategy for FixedIntervalRetry {
    fn next(&mut self) -> Option<Duration> {
        self.count = self.count.saturating_add(1);
        (self.count <= self.max).then_some(self.interval)
    }
}

/// Exponential backoff with an upper bound and optional full jitter.
#[derive(Debug, Clone)]
pub struct ExponentialBackoffRetry {
    initial: Duration,
    max_interval: Duration,
    multiplier: f64,
    max: u32,
    jitter: bool,
    count: u32,
}

impl ExponentialBackoffRetry {
    /// Starts at `initial`, doubling each retry up to `max_interval`.
    pub fn new(initial: Duration, max_interval: Duration, max: u32) -> Self {
        Self {
            initial,
            max_interval,
            multiplier: 2.0,
            max,
            jitter: false,
            count: 0,
        }
    }

    /// Sets the growth factor. Values below 1.0 are clamped to 1.0.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Draws each wait uniformly from `[0, backoff]`.
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    fn backoff(&self) -> Duration {
        let exp = self.count.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial.as_secs_f64() * self.multiplier.powi(exp);
        if !secs.is_finite() || secs >= self.max_interval.as_secs_f64() {
            self.max_interval
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

impl RetryStrategy for ExponentialBackoffRetry {
    fn next(&mut self) -> Option<Duration> {
        self.count = self.count.saturating_add(1);
        if self.count > self.max {
            return None;
        }

        let backoff = self.backoff();
        if self.jitter && !backoff.is_zero() {
            let millis = rand::thread_rng().gen_range(0..=backoff.as_millis() as u64);
            Some(Duration::from_millis(millis))
        } else {
            Some(backoff)
        }
    }
}
