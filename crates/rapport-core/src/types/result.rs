//! Scoring results. Built once per run and never mutated afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::dimension::Dimension;
use super::window::ScoringWindow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentScore {
    pub score: f64,
    pub weight: f64,
    /// True only when the oracle was consulted for this component and no
    /// batch degraded.
    pub llm_validated: bool,
    pub raw_metrics: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScore {
    pub dimension_id: Dimension,
    pub score: f64,
    pub weight: f64,
    pub components: BTreeMap<String, ComponentScore>,
    pub insights: Vec<String>,
}

impl DimensionScore {
    pub fn component(&self, name: &str) -> Option<&ComponentScore> {
        self.components.get(name)
    }
}

/// Score bands for the overall result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HealthLabel {
    Flourishing,
    Healthy,
    Stable,
    Attention,
    Concerning,
    Critical,
}

impl HealthLabel {
    /// `[85,100]` Flourishing, `[70,85)` Healthy, `[55,70)` Stable,
    /// `[40,55)` Attention, `[25,40)` Concerning, `[0,25)` Critical.
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            Self::Flourishing
        } else if score >= 70.0 {
            Self::Healthy
        } else if score >= 55.0 {
            Self::Stable
        } else if score >= 40.0 {
            Self::Attention
        } else if score >= 25.0 {
            Self::Concerning
        } else {
            Self::Critical
        }
    }

    pub fn pt(&self) -> &'static str {
        match self {
            Self::Flourishing => "Florescente",
            Self::Healthy => "Saudável",
            Self::Stable => "Estável",
            Self::Attention => "Atenção",
            Self::Concerning => "Preocupante",
            Self::Critical => "Crítico",
        }
    }

    pub fn en(&self) -> &'static str {
        match self {
            Self::Flourishing => "Flourishing",
            Self::Healthy => "Healthy",
            Self::Stable => "Stable",
            Self::Attention => "Attention",
            Self::Concerning => "Concerning",
            Self::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub dimension: Dimension,
    pub finding: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub strengths: Vec<Insight>,
    pub opportunities: Vec<Insight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub pattern: String,
    pub severity: AlertSeverity,
    pub frequency: usize,
    pub context: String,
    pub antidote: String,
}

/// The output of one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthScoreResult {
    pub overall: f64,
    pub label: String,
    pub label_en: String,
    pub confidence: f64,
    pub low_confidence: bool,
    pub trend: String,
    pub trend_delta: Option<f64>,
    pub window: ScoringWindow,
    pub message_count: usize,
    pub dimensions: BTreeMap<String, DimensionScore>,
    pub insights: Insights,
    pub alerts: Vec<Alert>,
}

impl HealthScoreResult {
    pub fn dimension(&self, dimension: Dimension) -> Option<&DimensionScore> {
        self.dimensions.get(dimension.id())
    }

    /// Serialize to the stable JSON shape consumed by report renderers.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_bands_are_half_open() {
        assert_eq!(HealthLabel::from_score(100.0), HealthLabel::Flourishing);
        assert_eq!(HealthLabel::from_score(85.0), HealthLabel::Flourishing);
        assert_eq!(HealthLabel::from_score(84.9), HealthLabel::Healthy);
        assert_eq!(HealthLabel::from_score(70.0), HealthLabel::Healthy);
        assert_eq!(HealthLabel::from_score(55.0), HealthLabel::Stable);
        assert_eq!(HealthLabel::from_score(50.0), HealthLabel::Attention);
        assert_eq!(HealthLabel::from_score(25.0), HealthLabel::Concerning);
        assert_eq!(HealthLabel::from_score(0.0), HealthLabel::Critical);
    }

    #[test]
    fn labels_have_both_languages() {
        assert_eq!(HealthLabel::Healthy.pt(), "Saudável");
        assert_eq!(HealthLabel::Healthy.en(), "Healthy");
    }
}
