//! Publish pacing for the upload stage.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::NaiveDate;

/// Why a publish was postponed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferral {
    DailyLimit { published: u32, max: u32 },
    TooSoon { remaining: Duration },
}

impl fmt::Display for Deferral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deferral::DailyLimit { published, max } => {
                write!(f, "Daily upload limit reached ({}/{})", published, max)
            }
            Deferral::TooSoon { remaining } => write!(
                f,
                "Too soon since last upload, {}s remaining",
                remaining.as_secs()
            ),
        }
    }
}

#[derive(Debug, Default)]
struct LimiterState {
    day: Option<NaiveDate>,
    published_today: u32,
    last_publish: Option<Instant>,
}

/// Process-local publish counters. Not persisted: a restart starts a fresh
/// day count.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_day: u32,
    min_delay: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(max_per_day: u32, min_delay: Duration) -> Self {
        Self {
            max_per_day,
            min_delay,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Checks whether a publish may start at `now` on local day `today`.
    pub fn check(&self, now: Instant, today: NaiveDate) -> Result<(), Deferral> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        roll_day(&mut state, today);

        if state.published_today >= self.max_per_day {
            return Err(Deferral::DailyLimit {
                published: state.published_today,
                max: self.max_per_day,
            });
        }

        if let Some(last) = state.last_publish {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_delay {
                return Err(Deferral::TooSoon {
                    remaining: self.min_delay - elapsed,
                });
            }
        }

        Ok(())
    }

    /// Time since the last publish, if there was one.
    pub fn since_last(&self, now: Instant) -> Option<Duration> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .last_publish
            .map(|last| now.saturating_duration_since(last))
    }

    pub fn record(&self, now: Instant, today: NaiveDate) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        roll_day(&mut state, today);
        state.published_today += 1;
        state.last_publish = Some(now);
    }

    pub fn published_today(&self) -> u32 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .published_today
    }
}

fn roll_day(state: &mut LimiterState, today: NaiveDate) {
    if state.day != Some(today) {
        state.day = Some(today);
        state.published_today = 0;
    }
}
