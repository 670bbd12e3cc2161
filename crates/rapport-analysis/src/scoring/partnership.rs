//! Partnership Equity: contribution balance, coordination, shared decisions.

use rapport_core::types::{
    Component, Dimension, DimensionScore, PatternCategory, Sender, Split,
};

use super::{assemble, Part, ScoringInput, NEUTRAL_SCORE};
use crate::balance::split_score;

const VOLUME_SHARE: f64 = 0.6;
const INITIATION_SHARE: f64 = 0.4;

pub fn score(input: &ScoringInput<'_>) -> DimensionScore {
    let balance = input.balance;

    let volume = split_score(balance.message_volume_split).unwrap_or(NEUTRAL_SCORE);
    let initiation = split_score(balance.initiation_split).unwrap_or(NEUTRAL_SCORE);
    let contribution = VOLUME_SHARE * volume + INITIATION_SHARE * initiation;

    let coordination = split_score(balance.task_completion_split).unwrap_or(NEUTRAL_SCORE);
    let completion_rate = (balance.tasks_mentioned > 0)
        .then(|| balance.tasks_completed as f64 / balance.tasks_mentioned as f64);

    // Repair is owned by Communication Health and never counted here.
    let (mut by_a, mut by_b) = (0usize, 0usize);
    for m in input
        .matches
        .iter()
        .filter(|m| m.is_positive() && m.category != PatternCategory::Repair)
    {
        match m.sender {
            Sender::A => by_a += 1,
            Sender::B => by_b += 1,
        }
    }
    let initiative = Split::from_counts(by_a as f64, by_b as f64);
    let shared = split_score(initiative).unwrap_or(NEUTRAL_SCORE);

    let mut insights = Vec::new();
    if let Some(split) = balance.message_volume_split {
        insights.push(format!("Message volume split {:.0}/{:.0}", split.a, split.b));
    }
    if let Some(split) = balance.initiation_split {
        insights.push(format!("Conversation starts split {:.0}/{:.0}", split.a, split.b));
    }
    if let Some(rate) = completion_rate {
        insights.push(format!("{:.0}% of task mentions were closed out", rate * 100.0));
    }

    assemble(
        Dimension::PartnershipEquity,
        vec![
            Part::new(Component::ContributionBalance, contribution)
                .metric("volumeBalance", volume)
                .metric("initiationBalance", initiation)
                .metric("messagesA", balance.message_counts.a)
                .metric("messagesB", balance.message_counts.b),
            Part::new(Component::Coordination, coordination)
                .metric("tasksMentioned", balance.tasks_mentioned)
                .metric("tasksCompleted", balance.tasks_completed)
                .metric("completionRate", completion_rate),
            Part::new(Component::SharedDecisions, shared)
                .metric("positiveByA", by_a)
                .metric("positiveByB", by_b)
                .metric("futurePlanning", input.count(PatternCategory::FuturePlanning)),
        ],
        insights,
        input,
    )
}

#[cfg(test)]
mod tests {
    use rapport_core::types::Sender;

    use super::*;
    use crate::scoring::test_support::Fixture;

    #[test]
    fn sixty_forty_volume_and_initiation_score_eighty() {
        // A sends 3 of 5 messages; with 5h gaps every message is an initiation.
        let fixture = Fixture::conversation(
            &[
                (Sender::A, "bom dia"),
                (Sender::B, "bom dia"),
                (Sender::A, "boa tarde"),
                (Sender::B, "boa tarde"),
                (Sender::A, "boa noite"),
            ],
            300,
        );
        let d = score(&fixture.input());
        let contribution = d.component("contributionBalance").unwrap();
        assert_eq!(contribution.raw_metrics["volumeBalance"], serde_json::json!(80.0));
        assert_eq!(contribution.raw_metrics["initiationBalance"], serde_json::json!(80.0));
        assert_eq!(contribution.score, 80.0);
    }

    #[test]
    fn repair_does_not_count_toward_shared_decisions() {
        let fixture = Fixture::conversation(
            &[(Sender::A, "Desculpa, eu errei"), (Sender::B, "bom dia")],
            2,
        );
        let d = score(&fixture.input());
        let shared = d.component("sharedDecisions").unwrap();
        assert_eq!(shared.raw_metrics["positiveByA"], serde_json::json!(0));
        assert_eq!(shared.score, NEUTRAL_SCORE);
    }
}
