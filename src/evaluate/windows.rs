//! Adaptive cross-validation window sizing.
//!
//! | span (days) | initial | period |
//! |---|---|---|
//! | >= 730 | 730 days | 30 days |
//! | >= 365 | 365 days | 15 days |
//! | >= 180 | 180 days | 7 days |
//! | otherwise | span / 2 days | 1 day |
//!
//! The horizon is 24 hours regardless of span.

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CvWindows {
    pub initial: TimeDelta,
    pub period: TimeDelta,
    pub horizon: TimeDelta,
}

impl CvWindows {
    /// Window sizes for a history spanning `span_days` whole days.
    pub fn for_span_days(span_days: i64) -> Self {
        let (initial, period) = match span_days {
            d if d >= 730 => (730, 30),
            d if d >= 365 => (365, 15),
            d if d >= 180 => (180, 7),
            d => (d.max(0) / 2, 1),
        };
        Self {
            initial: TimeDelta::days(initial),
            period: TimeDelta::days(period),
            horizon: TimeDelta::hours(24),
        }
    }

    /// Window sizes for the history between `first` and `last`.
    pub fn for_history(first: NaiveDateTime, last: NaiveDateTime) -> Self {
        Self::for_span_days((last - first).num_days())
    }

    pub fn describe(&self) -> WindowSummary {
        WindowSummary {
            initial_days: self.initial.num_days(),
            period_days: self.period.num_days(),
            horizon_hours: self.horizon.num_hours(),
        }
    }
}

/// Serializable view of `CvWindows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowSummary {
    pub initial_days: i64,
    pub period_days: i64,
    pub horizon_hours: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_table() {
        let w = CvWindows::for_span_days(800);
        assert_eq!((w.initial.num_days(), w.period.num_days()), (730, 30));
        let w = CvWindows::for_span_days(730);
        assert_eq!((w.initial.num_days(), w.period.num_days()), (730, 30));
        let w = CvWindows::for_span_days(400);
        assert_eq!((w.initial.num_days(), w.period.num_days()), (365, 15));
        let w = CvWindows::for_span_days(200);
        assert_eq!((w.initial.num_days(), w.period.num_days()), (180, 7));
        let w = CvWindows::for_span_days(40);
        assert_eq!((w.initial.num_days(), w.period.num_days()), (20, 1));
        let w = CvWindows::for_span_days(41);
        assert_eq!(w.initial.num_days(), 20);
        assert_eq!(w.horizon, TimeDelta::hours(24));
    }
}
