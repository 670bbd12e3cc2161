//! Declarative TOML catalog definitions and their compilation.
//!
//! The catalog file declares every category exactly once together with its
//! owning dimension and component. Loading fails on any inconsistency: a
//! malformed catalog is never partially used.

use std::path::Path;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use rapport_core::errors::CatalogError;
use rapport_core::types::{Component, Dimension, PatternCategory, Polarity};

use super::{
    CategoryRule, CoordinationRules, FilterRules, PatternCatalog, Trigger, TriggerContext,
    TriggerMatcher,
};

/// The catalog compiled into the binary.
pub const DEFAULT_CATALOG: &str = include_str!("default.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub version: String,
    #[serde(default, rename = "category")]
    pub categories: Vec<CategoryDef>,
    #[serde(default)]
    pub filter: FilterDef,
    #[serde(default)]
    pub salience: SalienceDef,
    #[serde(default)]
    pub dismissive: DismissiveDef,
    #[serde(default)]
    pub coordination: CoordinationDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDef {
    pub name: String,
    pub polarity: String,
    pub score_impact: i32,
    pub owner_dimension: String,
    pub owner_component: String,
    #[serde(default)]
    pub antidote: Option<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
    /// Triggers that only count when the previous message came from the
    /// partner and was emotionally salient.
    #[serde(default)]
    pub after_emotional: Vec<String>,
    #[serde(default)]
    pub emoji: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterDef {
    #[serde(default)]
    pub forwarded: Vec<String>,
    #[serde(default)]
    pub embedded_timestamp: Vec<String>,
    #[serde(default)]
    pub third_party_attribution: Vec<String>,
    #[serde(default)]
    pub third_party_subject: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalienceDef {
    #[serde(default)]
    pub markers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DismissiveDef {
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinationDef {
    #[serde(default)]
    pub task_verbs: Vec<String>,
    #[serde(default)]
    pub completion_markers: Vec<String>,
}

/// Loader for the TOML pattern catalog.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Load the embedded default catalog.
    pub fn load_default() -> Result<PatternCatalog, CatalogError> {
        Self::load_from_str(DEFAULT_CATALOG, "<embedded>")
    }

    /// Load a catalog from a file path.
    pub fn load_from_file(path: &Path) -> Result<PatternCatalog, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::ParseError {
            source_name: path.display().to_string(),
            message: format!("failed to read: {e}"),
        })?;
        Self::load_from_str(&content, &path.display().to_string())
    }

    /// Load a catalog from a TOML string. `source_name` is used in errors.
    pub fn load_from_str(toml_str: &str, source_name: &str) -> Result<PatternCatalog, CatalogError> {
        let file: CatalogFile = toml::from_str(toml_str).map_err(|e| CatalogError::ParseError {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        Self::compile(file)
    }

    /// Compile parsed definitions, enforcing single ownership of every
    /// category and every trigger.
    pub fn compile(file: CatalogFile) -> Result<PatternCatalog, CatalogError> {
        let mut by_category: FxHashMap<PatternCategory, CategoryRule> = FxHashMap::default();
        let mut claimed: FxHashMap<String, PatternCategory> = FxHashMap::default();

        for def in file.categories {
            let category = PatternCategory::parse_str(&def.name)
                .ok_or_else(|| CatalogError::UnknownCategory(def.name.clone()))?;
            if by_category.contains_key(&category) {
                return Err(CatalogError::DuplicateCategory(def.name));
            }
            check_ownership(category, &def)?;

            let sources = def
                .triggers
                .iter()
                .map(|p| (p, TriggerContext::Any))
                .chain(def.after_emotional.iter().map(|p| (p, TriggerContext::AfterEmotional)));
            let mut triggers = Vec::with_capacity(def.triggers.len() + def.after_emotional.len());
            for (pattern, context) in sources {
                claim(&mut claimed, pattern, category)?;
                let id = format!("{}.{}", category.name(), triggers.len() + 1);
                let regex = compile_regex(category.name(), pattern)?;
                triggers.push(Trigger {
                    id,
                    source: pattern.clone(),
                    context,
                    matcher: TriggerMatcher::Regex(regex),
                });
            }
            for emoji in &def.emoji {
                let literal = emoji.trim();
                if literal.is_empty() {
                    return Err(CatalogError::InvalidPattern {
                        category: category.name().to_string(),
                        trigger: emoji.clone(),
                        message: "empty emoji trigger".to_string(),
                    });
                }
                claim(&mut claimed, literal, category)?;
                let id = format!("{}.{}", category.name(), triggers.len() + 1);
                triggers.push(Trigger {
                    id,
                    source: literal.to_string(),
                    context: TriggerContext::Any,
                    matcher: TriggerMatcher::Emoji(literal.to_string()),
                });
            }

            by_category.insert(
                category,
                CategoryRule {
                    category,
                    score_impact: def.score_impact,
                    antidote: def.antidote,
                    triggers,
                },
            );
        }

        let mut rules = Vec::with_capacity(PatternCategory::PRIORITY.len());
        for category in PatternCategory::PRIORITY {
            let rule = by_category
                .remove(&category)
                .ok_or_else(|| CatalogError::MissingCategory(category.name().to_string()))?;
            rules.push(rule);
        }

        let filter = FilterRules {
            forwarded: compile_all("filter.forwarded", &file.filter.forwarded)?,
            embedded_timestamp: compile_all(
                "filter.embedded_timestamp",
                &file.filter.embedded_timestamp,
            )?,
            third_party_attribution: compile_all(
                "filter.third_party_attribution",
                &file.filter.third_party_attribution,
            )?,
            third_party_subject: compile_all(
                "filter.third_party_subject",
                &file.filter.third_party_subject,
            )?,
        };

        let coordination = CoordinationRules {
            task_verbs: compile_literals("coordination.task_verbs", &file.coordination.task_verbs)?,
            completion_markers: compile_literals(
                "coordination.completion_markers",
                &file.coordination.completion_markers,
            )?,
        };

        let catalog = PatternCatalog {
            version: file.version,
            rules,
            filter,
            salience: compile_all("salience.markers", &file.salience.markers)?,
            dismissive: compile_all("dismissive.patterns", &file.dismissive.patterns)?,
            coordination,
        };
        tracing::debug!(
            version = %catalog.version,
            triggers = catalog.trigger_count(),
            "pattern catalog compiled"
        );
        Ok(catalog)
    }
}

fn check_ownership(category: PatternCategory, def: &CategoryDef) -> Result<(), CatalogError> {
    let mismatch = |field: &str, declared: &str, expected: &str| CatalogError::OwnerMismatch {
        category: category.name().to_string(),
        field: field.to_string(),
        declared: declared.to_string(),
        expected: expected.to_string(),
    };

    let expected_polarity = match category.polarity() {
        Polarity::Positive => "positive",
        Polarity::Negative => "negative",
    };
    if def.polarity != expected_polarity {
        return Err(mismatch("polarity", &def.polarity, expected_polarity));
    }
    let sign_ok = match category.polarity() {
        Polarity::Positive => def.score_impact > 0,
        Polarity::Negative => def.score_impact < 0,
    };
    if !sign_ok {
        return Err(mismatch(
            "score_impact",
            &def.score_impact.to_string(),
            &format!("a {expected_polarity} value"),
        ));
    }

    let owner: Component = category.owner();
    let dimension: Dimension = owner.dimension();
    if def.owner_dimension != dimension.id() {
        return Err(mismatch("owner_dimension", &def.owner_dimension, dimension.id()));
    }
    if def.owner_component != owner.name() {
        return Err(mismatch("owner_component", &def.owner_component, owner.name()));
    }
    Ok(())
}

/// Record that `category` owns `trigger`. Comparison is on the lowercased,
/// whitespace-trimmed source.
fn claim(
    claimed: &mut FxHashMap<String, PatternCategory>,
    trigger: &str,
    category: PatternCategory,
) -> Result<(), CatalogError> {
    let key = trigger.trim().to_lowercase();
    match claimed.get(&key) {
        Some(&owner) if owner != category => Err(CatalogError::Inconsistency {
            trigger: trigger.to_string(),
            first: owner.name().to_string(),
            second: category.name().to_string(),
        }),
        _ => {
            claimed.insert(key, category);
            Ok(())
        }
    }
}

fn compile_regex(section: &str, pattern: &str) -> Result<Regex, CatalogError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| CatalogError::InvalidPattern {
            category: section.to_string(),
            trigger: pattern.to_string(),
            message: e.to_string(),
        })
}

fn compile_all(section: &str, patterns: &[String]) -> Result<Vec<Regex>, CatalogError> {
    patterns.iter().map(|p| compile_regex(section, p)).collect()
}

fn compile_literals(section: &str, literals: &[String]) -> Result<AhoCorasick, CatalogError> {
    let lowered: Vec<String> = literals.iter().map(|l| l.trim().to_lowercase()).collect();
    AhoCorasickBuilder::new()
        .match_kind(MatchKind::LeftmostLongest)
        .build(&lowered)
        .map_err(|e| CatalogError::InvalidPattern {
            category: section.to_string(),
            trigger: lowered.join(", "),
            message: e.to_string(),
        })
}
