//! Positive-to-negative pattern ratio (target 5:1) and its piecewise score.

/// `positive / negative`; with no negatives the ratio is the positive count.
pub fn positivity_ratio(positive: usize, negative: usize) -> f64 {
    if negative == 0 {
        positive as f64
    } else {
        positive as f64 / negative as f64
    }
}

/// Map a ratio to `[10, 100]`. Monotonic, continuous at 1, 3, and 5.
pub fn positivity_score(ratio: f64) -> f64 {
    if ratio >= 5.0 {
        100.0
    } else if ratio >= 3.0 {
        70.0 + (ratio - 3.0) * 15.0
    } else if ratio >= 1.0 {
        40.0 + (ratio - 1.0) * 15.0
    } else {
        (ratio * 40.0).max(10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_to_one_scores_full() {
        let ratio = positivity_ratio(5, 1);
        assert_eq!(ratio, 5.0);
        assert_eq!(positivity_score(ratio), 100.0);
    }

    #[test]
    fn tier_boundaries_are_continuous() {
        assert_eq!(positivity_score(3.0), 70.0);
        assert!((positivity_score(3.0 - 1e-9) - 70.0).abs() < 1e-6);
        assert!((positivity_score(5.0 - 1e-9) - 100.0).abs() < 1e-6);
        assert_eq!(positivity_score(1.0), 40.0);
        assert!((positivity_score(1.0 - 1e-9) - 40.0).abs() < 1e-6);
    }

    #[test]
    fn no_negatives_uses_positive_count() {
        assert_eq!(positivity_ratio(7, 0), 7.0);
        assert_eq!(positivity_ratio(0, 0), 0.0);
        assert_eq!(positivity_score(0.0), 10.0);
    }
}
