//! RateCounter (C2): a sliding 60-second "count since window start" rate
//! limiter, not a token bucket. All operations serialize under a single
//! mutex so it is safe under parallel callers.

use std::{
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

const WINDOW_SECS: i64 = 60;

struct State {
    epoch: i64,
    window_count: u64,
    total_count: u64,
}

/// `maxRate <= 0` disables throttling unconditionally.
pub struct RateCounter {
    max_rate: i64,
    state: Mutex<State>,
}

impl RateCounter {
    #[must_use]
    pub fn new(max_rate: i64) -> Self {
        Self {
            max_rate,
            state: Mutex::new(State {
                epoch: unix_now(),
                window_count: 0,
                total_count: 0,
            }),
        }
    }

    /// Rolls the window forward if more than 60s have elapsed since
    /// `epoch`, or if the clock has gone backward relative to it, then
    /// returns the (possibly just-reset) window count.
    #[must_use]
    pub fn current_rate(&self) -> u64 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        roll_if_expired(&mut state);
        state.window_count
    }

    /// If `maxRate > 0` and the current rate has already reached it,
    /// returns `true` without incrementing. Otherwise, when `inc_if_allowed`
    /// is set, increments the window and total counters and returns
    /// `false`.
    pub fn is_throttled(&self, inc_if_allowed: bool) -> bool {
        if self.max_rate <= 0 {
            if inc_if_allowed {
                let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                roll_if_expired(&mut state);
                state.window_count += 1;
                state.total_count += 1;
            }
            return false;
        }

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        roll_if_expired(&mut state);

        if state.window_count >= self.max_rate as u64 {
            return true;
        }

        if inc_if_allowed {
            state.window_count += 1;
            state.total_count += 1;
        }
        false
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).total_count
    }
}

fn roll_if_expired(state: &mut State) {
    let now = unix_now();
    if now - state.epoch >= WINDOW_SECS || now < state.epoch {
        state.epoch = now;
        state.window_count = 0;
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn disabled_when_max_rate_not_positive() {
        let counter = RateCounter::new(0);
        for _ in 0..1000 {
            assert!(!counter.is_throttled(true));
        }
    }

    #[test]
    fn throttles_after_max_rate_requests() {
        let counter = RateCounter::new(2);
        assert!(!counter.is_throttled(true));
        assert!(!counter.is_throttled(true));
        assert!(counter.is_throttled(true));
        assert!(counter.is_throttled(true));
    }

    #[test]
    fn non_incrementing_probe_does_not_consume_budget() {
        let counter = RateCounter::new(1);
        assert!(!counter.is_throttled(false));
        assert!(!counter.is_throttled(false));
        assert!(!counter.is_throttled(true));
        assert!(counter.is_throttled(true));
    }

    #[test]
    fn current_rate_reports_window_count() {
        let counter = RateCounter::new(5);
        counter.is_throttled(true);
        counter.is_throttled(true);
        assert_eq!(counter.current_rate(), 2);
    }
}
