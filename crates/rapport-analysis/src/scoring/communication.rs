//! Communication Health: constructive dialogue, conflict repair, emotional
//! safety, supportive responses.

use rustc_hash::FxHashMap;

use rapport_core::types::{Component, Dimension, DimensionScore, PatternCategory, PatternMatch};

use super::{assemble, rate, Part, ScoringInput};

/// Conflict repair score when nothing needed repairing.
const NO_REPAIR_CALM: f64 = 70.0;
/// Conflict repair score when conflict happened but nobody repaired.
const NO_REPAIR_CONFLICT: f64 = 50.0;

/// Emotional safety tiers by contempt + stonewalling count.
pub fn emotional_safety(count: usize) -> f64 {
    match count {
        0 => 100.0,
        1 => 70.0,
        2 | 3 => 50.0,
        n => (30.0 - n as f64 * 2.0).max(20.0),
    }
}

/// Outcome of every repair attempt in the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairOutcome {
    pub attempts: usize,
    pub successful: usize,
}

/// A repair fails when its sender produces a negative match later in the
/// same message or within the next `episode` messages.
pub fn repair_outcome(input: &ScoringInput<'_>) -> RepairOutcome {
    let episode = input.config.detection.effective_conflict_episode_messages();
    let index: FxHashMap<&str, usize> = input
        .messages
        .iter()
        .enumerate()
        .rev()
        .map(|(i, m)| (m.id.as_str(), i))
        .collect();
    let negatives: Vec<(usize, &PatternMatch)> = input
        .matches
        .iter()
        .filter(|m| m.is_negative())
        .filter_map(|m| index.get(m.message_id.as_str()).map(|&i| (i, m)))
        .collect();

    let mut outcome = RepairOutcome::default();
    for repair in input
        .matches
        .iter()
        .filter(|m| m.category == PatternCategory::Repair)
    {
        let Some(&at) = index.get(repair.message_id.as_str()) else {
            continue;
        };
        outcome.attempts += 1;
        let relapsed = negatives.iter().any(|&(i, negative)| {
            if negative.sender != repair.sender {
                return false;
            }
            if i == at {
                match (negative.span, repair.span) {
                    (Some(n), Some(r)) => n.start >= r.end,
                    (None, _) => true,
                    (Some(_), None) => false,
                }
            } else {
                i > at && i <= at + episode
            }
        });
        if !relapsed {
            outcome.successful += 1;
        }
    }
    outcome
}

pub fn score(input: &ScoringInput<'_>) -> DimensionScore {
    let scoring = &input.config.scoring;
    let text_messages = input.text_message_count();

    let criticism = input.count(PatternCategory::Criticism);
    let defensiveness = input.count(PatternCategory::Defensiveness);
    let constructive = (100.0
        - criticism as f64 * scoring.effective_criticism_penalty()
        - defensiveness as f64 * scoring.effective_defensiveness_penalty())
    .max(0.0);

    let repairs = repair_outcome(input);
    let negatives = input.negative_count();
    let conflict_repair = if repairs.attempts == 0 {
        if negatives == 0 {
            NO_REPAIR_CALM
        } else {
            NO_REPAIR_CONFLICT
        }
    } else {
        rate(repairs.successful, repairs.attempts) * 100.0
    };

    let contempt = input.count(PatternCategory::Contempt);
    let stonewalling = input.count(PatternCategory::Stonewalling);
    let safety = emotional_safety(contempt + stonewalling);

    let support = input.count(PatternCategory::Support);
    let support_rate = rate(support, text_messages);
    let supportive = (support_rate / 0.05 * 100.0).clamp(30.0, 100.0);

    let mut insights = Vec::new();
    if criticism + defensiveness > 0 {
        insights.push(format!(
            "{criticism} criticism and {defensiveness} defensiveness patterns"
        ));
    }
    if repairs.attempts > 0 {
        insights.push(format!(
            "{} of {} repair attempts held",
            repairs.successful, repairs.attempts
        ));
    }
    if contempt > 0 {
        insights.push(format!("Contempt detected {contempt} times"));
    }
    if stonewalling > 0 {
        insights.push(format!("Stonewalling detected {stonewalling} times"));
    }

    assemble(
        Dimension::CommunicationHealth,
        vec![
            Part::new(Component::ConstructiveDialogue, constructive)
                .metric("criticism", criticism)
                .metric("defensiveness", defensiveness),
            Part::new(Component::ConflictRepair, conflict_repair)
                .metric("repairAttempts", repairs.attempts)
                .metric("successfulRepairs", repairs.successful)
                .metric("negativePatterns", negatives),
            Part::new(Component::EmotionalSafety, safety)
                .metric("contempt", contempt)
                .metric("stonewalling", stonewalling),
            Part::new(Component::SupportiveResponses, supportive)
                .metric("support", support)
                .metric("supportRate", support_rate),
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
    fn safety_tiers() {
        assert_eq!(emotional_safety(0), 100.0);
        assert_eq!(emotional_safety(1), 70.0);
        assert_eq!(emotional_safety(3), 50.0);
        assert_eq!(emotional_safety(4), 22.0);
        assert_eq!(emotional_safety(10), 20.0);
    }

    #[test]
    fn criticism_and_defensiveness_reduce_constructive_dialogue() {
        let fixture = Fixture::conversation(
            &[
                (Sender::A, "você nunca me escuta"),
                (Sender::B, "não é minha culpa"),
            ],
            2,
        );
        let d = score(&fixture.input());
        assert_eq!(d.component("constructiveDialogue").unwrap().score, 75.0);
        // Conflict without repair.
        assert_eq!(d.component("conflictRepair").unwrap().score, 50.0);
    }

    #[test]
    fn blame_shifting_apology_is_not_a_successful_repair() {
        let fixture = Fixture::conversation(
            &[
                (Sender::A, "desculpa, mas você também gritou"),
                (Sender::B, "foi mal, eu exagerei"),
            ],
            2,
        );
        let outcome = repair_outcome(&fixture.input());
        assert_eq!(
            outcome,
            RepairOutcome {
                attempts: 2,
                successful: 1
            }
        );
    }

    #[test]
    fn relapse_within_episode_fails_repair() {
        let fixture = Fixture::conversation(
            &[
                (Sender::A, "desculpa"),
                (Sender::B, "tudo bem"),
                (Sender::A, "mas você sempre faz isso"),
            ],
            2,
        );
        let outcome = repair_outcome(&fixture.input());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.successful, 0);
    }

    #[test]
    fn calm_window_without_repairs_scores_seventy() {
        let fixture = Fixture::conversation(&[(Sender::A, "bom dia"), (Sender::B, "bom dia")], 2);
        let d = score(&fixture.input());
        assert_eq!(d.component("conflictRepair").unwrap().score, 70.0);
        assert_eq!(d.component("supportiveResponses").unwrap().score, 30.0);
    }
}
