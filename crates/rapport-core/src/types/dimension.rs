//! Dimensions and their weighted components.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    EmotionalConnection,
    AffectionCommitment,
    CommunicationHealth,
    PartnershipEquity,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Self::EmotionalConnection,
        Self::AffectionCommitment,
        Self::CommunicationHealth,
        Self::PartnershipEquity,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::EmotionalConnection => "emotionalConnection",
            Self::AffectionCommitment => "affectionCommitment",
            Self::CommunicationHealth => "communicationHealth",
            Self::PartnershipEquity => "partnershipEquity",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.id() == s)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::EmotionalConnection => "Emotional Connection",
            Self::AffectionCommitment => "Affection & Commitment",
            Self::CommunicationHealth => "Communication Health",
            Self::PartnershipEquity => "Partnership Equity",
        }
    }

    /// Default weight in the overall score.
    pub fn default_weight(&self) -> f64 {
        match self {
            Self::EmotionalConnection => 0.30,
            Self::AffectionCommitment => 0.25,
            Self::CommunicationHealth => 0.25,
            Self::PartnershipEquity => 0.20,
        }
    }

    /// Components in reporting order.
    pub fn components(&self) -> &'static [Component] {
        match self {
            Self::EmotionalConnection => &[
                Component::Responsiveness,
                Component::Vulnerability,
                Component::Attunement,
            ],
            Self::AffectionCommitment => &[
                Component::ExpressedAffection,
                Component::CommitmentSignals,
                Component::Appreciation,
                Component::Positivity,
            ],
            Self::CommunicationHealth => &[
                Component::ConstructiveDialogue,
                Component::ConflictRepair,
                Component::EmotionalSafety,
                Component::SupportiveResponses,
            ],
            Self::PartnershipEquity => &[
                Component::ContributionBalance,
                Component::Coordination,
                Component::SharedDecisions,
            ],
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Component {
    Responsiveness,
    Vulnerability,
    Attunement,
    ExpressedAffection,
    CommitmentSignals,
    Appreciation,
    /// Positive/negative ratio. Reported with the affection dimension, weight 0.
    Positivity,
    ConstructiveDialogue,
    ConflictRepair,
    EmotionalSafety,
    SupportiveResponses,
    ContributionBalance,
    Coordination,
    SharedDecisions,
}

impl Component {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Responsiveness => "responsiveness",
            Self::Vulnerability => "vulnerability",
            Self::Attunement => "attunement",
            Self::ExpressedAffection => "expressedAffection",
            Self::CommitmentSignals => "commitmentSignals",
            Self::Appreciation => "appreciation",
            Self::Positivity => "positivity",
            Self::ConstructiveDialogue => "constructiveDialogue",
            Self::ConflictRepair => "conflictRepair",
            Self::EmotionalSafety => "emotionalSafety",
            Self::SupportiveResponses => "supportiveResponses",
            Self::ContributionBalance => "contributionBalance",
            Self::Coordination => "coordination",
            Self::SharedDecisions => "sharedDecisions",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        Dimension::ALL
            .iter()
            .flat_map(|d| d.components().iter().copied())
            .find(|c| c.name() == s)
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Self::Responsiveness | Self::Vulnerability | Self::Attunement => {
                Dimension::EmotionalConnection
            }
            Self::ExpressedAffection
            | Self::CommitmentSignals
            | Self::Appreciation
            | Self::Positivity => Dimension::AffectionCommitment,
            Self::ConstructiveDialogue
            | Self::ConflictRepair
            | Self::EmotionalSafety
            | Self::SupportiveResponses => Dimension::CommunicationHealth,
            Self::ContributionBalance | Self::Coordination | Self::SharedDecisions => {
                Dimension::PartnershipEquity
            }
        }
    }

    /// Weight within the owning dimension.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Responsiveness => 0.40,
            Self::Vulnerability => 0.35,
            Self::Attunement => 0.25,
            Self::ExpressedAffection => 0.40,
            Self::CommitmentSignals => 0.35,
            Self::Appreciation => 0.25,
            Self::Positivity => 0.0,
            Self::ConstructiveDialogue => 0.30,
            Self::ConflictRepair => 0.30,
            Self::EmotionalSafety => 0.25,
            Self::SupportiveResponses => 0.15,
            Self::ContributionBalance => 0.40,
            Self::Coordination => 0.35,
            Self::SharedDecisions => 0.25,
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
