//! Participation symmetry metrics.

use serde::{Deserialize, Serialize};

use super::message::Sender;

/// A pair of per-sender values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerSender<T> {
    pub a: T,
    pub b: T,
}

impl<T> PerSender<T> {
    pub fn get(&self, sender: Sender) -> &T {
        match sender {
            Sender::A => &self.a,
            Sender::B => &self.b,
        }
    }

    pub fn get_mut(&mut self, sender: Sender) -> &mut T {
        match sender {
            Sender::A => &mut self.a,
            Sender::B => &mut self.b,
        }
    }
}

/// Percentage split between the two senders. `a + b == 100`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub a: f64,
    pub b: f64,
}

impl Split {
    /// Build a split from two non-negative quantities. `None` when both are zero.
    pub fn from_counts(a: f64, b: f64) -> Option<Self> {
        let total = a + b;
        if total.is_nan() || total <= 0.0 || a < 0.0 || b < 0.0 {
            return None;
        }
        let pct_a = a / total * 100.0;
        Some(Self {
            a: pct_a,
            b: 100.0 - pct_a,
        })
    }

    pub fn share(&self, sender: Sender) -> f64 {
        match sender {
            Sender::A => self.a,
            Sender::B => self.b,
        }
    }
}

/// Balance metrics for one window. Each split is undefined when its
/// denominator is zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceMetrics {
    pub message_volume_split: Option<Split>,
    pub initiation_split: Option<Split>,
    pub task_completion_split: Option<Split>,
    /// Share of the summed mean response times. Higher share = slower replies.
    pub response_time_by_sender: Option<Split>,
    pub mean_response_minutes: PerSender<Option<f64>>,
    pub message_counts: PerSender<usize>,
    pub initiations: PerSender<usize>,
    pub task_mentions: PerSender<usize>,
    pub tasks_mentioned: usize,
    pub tasks_completed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sums_to_one_hundred() {
        let s = Split::from_counts(3.0, 2.0).unwrap();
        assert!((s.a - 60.0).abs() < 1e-9);
        assert!((s.a + s.b - 100.0).abs() < 1e-9);
    }

    #[test]
    fn split_is_undefined_for_zero_denominator() {
        assert!(Split::from_counts(0.0, 0.0).is_none());
    }
}
