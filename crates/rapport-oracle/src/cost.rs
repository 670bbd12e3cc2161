//! Token usage and estimated spend per oracle session.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;

use rapport_core::config::OracleConfig;
use rapport_core::types::PatternCategory;

/// USD per million tokens, injected from `OracleConfig`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostTable {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl CostTable {
    pub fn from_config(config: &OracleConfig) -> Self {
        Self {
            input_per_million: config.effective_cost_per_million_input(),
            output_per_million: config.effective_cost_per_million_output(),
        }
    }

    pub fn cost(&self, usage: Usage) -> f64 {
        (usage.input_tokens as f64 * self.input_per_million
            + usage.output_tokens as f64 * self.output_per_million)
            / 1_000_000.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    fn add(&mut self, other: Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostReport {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub estimated_usd: f64,
    /// Estimated USD per category name.
    pub by_category: BTreeMap<String, f64>,
}

/// Accumulates usage across calls. Shared by reference between worker threads.
#[derive(Debug)]
pub struct CostTracker {
    table: CostTable,
    usage: Mutex<BTreeMap<PatternCategory, Usage>>,
}

impl CostTracker {
    pub fn new(table: CostTable) -> Self {
        Self {
            table,
            usage: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn record(&self, category: PatternCategory, usage: Usage) {
        let mut guard = self.usage.lock().unwrap_or_else(|e| e.into_inner());
        guard.entry(category).or_default().add(usage);
    }

    pub fn total_tokens(&self) -> Usage {
        let guard = self.usage.lock().unwrap_or_else(|e| e.into_inner());
        guard.values().fold(Usage::default(), |mut acc, u| {
            acc.add(*u);
            acc
        })
    }

    pub fn total_cost(&self) -> f64 {
        self.table.cost(self.total_tokens())
    }

    pub fn report(&self) -> CostReport {
        let guard = self.usage.lock().unwrap_or_else(|e| e.into_inner());
        let mut total = Usage::default();
        let mut by_category = BTreeMap::new();
        for (category, usage) in guard.iter() {
            total.add(*usage);
            by_category.insert(category.name().to_string(), self.table.cost(*usage));
        }
        CostReport {
            input_tokens: total.input_tokens,
            output_tokens: total.output_tokens,
            estimated_usd: self.table.cost(total),
            by_category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CostTable {
        CostTable::from_config(&OracleConfig::default())
    }

    #[test]
    fn default_table_prices_per_million() {
        let t = table();
        assert_eq!(t.cost(Usage::new(1_000_000, 0)), 3.0);
        assert_eq!(t.cost(Usage::new(0, 1_000_000)), 15.0);
        assert_eq!(t.cost(Usage::default()), 0.0);
    }

    #[test]
    fn tracker_accumulates_per_category() {
        let tracker = CostTracker::new(table());
        tracker.record(PatternCategory::Contempt, Usage::new(500_000, 0));
        tracker.record(PatternCategory::Contempt, Usage::new(500_000, 0));
        tracker.record(PatternCategory::Repair, Usage::new(0, 100_000));

        assert_eq!(tracker.total_tokens(), Usage::new(1_000_000, 100_000));
        assert!((tracker.total_cost() - 4.5).abs() < 1e-9);

        let report = tracker.report();
        assert_eq!(report.by_category.len(), 2);
        assert!((report.by_category["contempt"] - 3.0).abs() < 1e-9);
        assert!((report.by_category["repair"] - 1.5).abs() < 1e-9);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["inputTokens"], 1_000_000);
        assert!(json["byCategory"].is_object());
    }

    #[test]
    fn custom_prices_come_from_config() {
        let config = OracleConfig {
            cost_per_million_input: Some(1.0),
            cost_per_million_output: Some(2.0),
            ..Default::default()
        };
        let t = CostTable::from_config(&config);
        assert_eq!(t.cost(Usage::new(2_000_000, 1_000_000)), 4.0);
    }
}
