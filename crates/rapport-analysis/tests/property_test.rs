//! Property tests for detection exclusivity and the scoring maps.

use std::sync::LazyLock;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rustc_hash::FxHashSet;

use rapport_analysis::aggregate::confidence;
use rapport_analysis::balance::balance_score;
use rapport_analysis::scoring::positivity::positivity_score;
use rapport_analysis::{CatalogLoader, HealthEngine, PatternCatalog, PatternDetector};
use rapport_core::config::{RapportConfig, ScoringConfig};
use rapport_core::types::{Message, MessageStream, Sender};

/// Catalog phrases (several overlapping across categories) and filler words.
const FRAGMENTS: [&str; 24] = [
    "você nunca",
    "você sempre",
    "tanto faz",
    "grande coisa",
    "não é minha culpa",
    "sei lá",
    "desculpa",
    "eu errei",
    "você tem razão",
    "estou aqui pra você",
    "estou aqui",
    "obrigado por",
    "te amo",
    "meu amor",
    "como foi",
    "vamos planejar",
    "eu sinto",
    "estou preocupada",
    "🙄",
    "❤️",
    "hoje",
    "e",
    ",",
    "?",
];

fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec(0..FRAGMENTS.len(), 1..8)
        .prop_map(|idx| idx.iter().map(|&i| FRAGMENTS[i]).collect::<Vec<_>>().join(" "))
}

fn arb_conversation() -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec((any::<bool>(), arb_text(), 1i64..600), 0..30).prop_map(|rows| {
        let mut ts = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        rows.into_iter()
            .enumerate()
            .map(|(i, (a, text, gap))| {
                ts += Duration::minutes(gap);
                let sender = if a { Sender::A } else { Sender::B };
                Message::new(format!("m{i}"), ts, sender, text)
            })
            .collect()
    })
}

// Compiling the catalog dominates a case; build it once per test binary.
static CATALOG: LazyLock<PatternCatalog> =
    LazyLock::new(|| CatalogLoader::load_default().unwrap());

static ENGINE: LazyLock<HealthEngine> =
    LazyLock::new(|| HealthEngine::new(RapportConfig::default()).unwrap());

proptest! {
    #[test]
    fn balance_score_is_symmetric(p in 0.0f64..=100.0) {
        prop_assert!((balance_score(p) - balance_score(100.0 - p)).abs() < 1e-9);
        prop_assert!((0.0..=100.0).contains(&balance_score(p)));
    }

    #[test]
    fn positivity_score_is_monotonic(a in 0.0f64..20.0, b in 0.0f64..20.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(positivity_score(lo) <= positivity_score(hi) + 1e-9);
    }

    #[test]
    fn confidence_is_monotonic(a in 0usize..3000, b in 0usize..3000) {
        let config = ScoringConfig::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(confidence(lo, &config).0 <= confidence(hi, &config).0);
    }

    #[test]
    fn at_most_one_match_per_category(text in arb_text(), previous in arb_text()) {
        let detector = PatternDetector::new(&CATALOG);
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let prev = Message::new("p", base, Sender::B, previous);
        let msg = Message::new("m", base + Duration::minutes(1), Sender::A, text);

        let detection = detector.detect(&msg, Some(&prev));
        let mut seen = FxHashSet::default();
        for m in &detection.matches {
            prop_assert!(seen.insert(m.category), "duplicate {} match", m.category);
        }
    }

    #[test]
    fn matched_spans_never_overlap(text in arb_text()) {
        let detector = PatternDetector::new(&CATALOG);
        let msg = Message::new("m", Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(), Sender::A, text.clone());

        let detection = detector.detect(&msg, None);
        let spans: Vec<_> = detection.matches.iter().filter_map(|m| m.span).collect();
        for (i, x) in spans.iter().enumerate() {
            for y in &spans[i + 1..] {
                prop_assert!(!x.overlaps(y), "{x:?} overlaps {y:?} in {text:?}");
            }
        }
        for m in &detection.matches {
            if let Some(span) = m.span {
                prop_assert_eq!(&text[span.start..span.end], m.excerpt.as_str());
            }
        }
    }

}

proptest! {
    // Whole-conversation properties run the full pipeline per case.
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn parallel_detection_matches_sequential(messages in arb_conversation()) {
        let detector = PatternDetector::new(&CATALOG);
        prop_assert_eq!(
            detector.detect_all(&messages, true),
            detector.detect_all(&messages, false)
        );
    }

    #[test]
    fn scoring_is_idempotent_and_bounded(messages in arb_conversation()) {
        let engine = &*ENGINE;
        let stream = MessageStream::from_messages(messages);
        let first = engine.score(&stream, None).result;
        let second = engine.score(&stream, None).result;
        prop_assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());

        prop_assert!((0.0..=100.0).contains(&first.overall));
        for d in first.dimensions.values() {
            prop_assert!(d.score.is_finite());
            prop_assert!((0.0..=100.0).contains(&d.score));
            for c in d.components.values() {
                prop_assert!((0.0..=100.0).contains(&c.score));
            }
        }
    }
}
