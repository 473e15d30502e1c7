//! Per-source sliding-window rate limiter
//!
//! Each external reputation source is fronted by one limiter instance. The
//! timestamp queue lives behind a single mutex so check, record, and wait
//! queries are atomic as a group — no over-admission between a check and the
//! call it admits.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sliding-window call budget: at most `max_calls` within `window`
pub struct SlidingWindow {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl SlidingWindow {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// True when a call would currently be admitted
    pub fn can_call(&self) -> bool {
        let mut calls = self.calls.lock();
        Self::evict(&mut calls, self.window);
        calls.len() < self.max_calls
    }

    /// Record a call now
    pub fn add_call(&self) {
        self.calls.lock().push_back(Instant::now());
    }

    /// Seconds until the next call would be admitted; zero when under budget
    pub fn wait_time(&self) -> Duration {
        let mut calls = self.calls.lock();
        Self::evict(&mut calls, self.window);
        if calls.len() < self.max_calls {
            return Duration::ZERO;
        }
        match calls.front() {
            Some(oldest) => (*oldest + self.window).saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Atomically admit and record a call, or report how long to wait.
    ///
    /// Callers never block on the returned duration — a denied source call
    /// fails fast and the sub-record carries the wait time.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let mut calls = self.calls.lock();
        Self::evict(&mut calls, self.window);
        if calls.len() < self.max_calls {
            calls.push_back(Instant::now());
            Ok(())
        } else {
            let wait = match calls.front() {
                Some(oldest) => (*oldest + self.window).saturating_duration_since(Instant::now()),
                None => Duration::ZERO,
            };
            Err(wait)
        }
    }

    fn evict(calls: &mut VecDeque<Instant>, window: Duration) {
        let now = Instant::now();
        while let Some(front) = calls.front() {
            if now.duration_since(*front) > window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }
}
