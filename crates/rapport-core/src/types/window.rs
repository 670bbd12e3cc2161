//! Scoring windows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A half-open time window `(start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ScoringWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `days`-long window ending at `end`. Saturates at the earliest
    /// representable instant.
    pub fn trailing(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: saturating_sub(end, Duration::days(i64::from(days))),
            end,
        }
    }

    /// The adjacent, non-overlapping window of the same length before this one.
    pub fn previous(&self) -> Self {
        let length = self.end - self.start;
        Self {
            start: saturating_sub(self.start, length),
            end: self.start,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts > self.start && ts <= self.end
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }
}

fn saturating_sub(ts: DateTime<Utc>, length: Duration) -> DateTime<Utc> {
    ts.checked_sub_signed(length).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
