//! Versioned prompt templates, one per pattern category.
//!
//! Template ids are `<category>.v1`, matching `OracleRequest::prompt_template_id`.
//! Categories validated one message at a time (the negative patterns and
//! repair) ask for `validity_flags`; the others ask for `category_counts`.

use std::fmt::Write as _;

use rustc_hash::FxHashMap;

use rapport_core::traits::OracleRequest;
use rapport_core::types::{PatternCategory, Sender};

pub const TEMPLATE_VERSION: &str = "v1";

/// The JSON shape a template asks the model to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    ValidityFlags,
    CategoryCounts,
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub id: String,
    pub category: PatternCategory,
    pub shape: ResponseShape,
    /// What an instance of the category looks like, and what it is not.
    pub guidance: &'static str,
}

const PREAMBLE: &str = "You are an expert relationship therapist trained in Gottman's research. \
You review messages from a Brazilian Portuguese chat between two partners, A and B. \
A rule-based detector flagged each message below as a possible instance of one pattern.";

const VALIDITY_SCHEMA: &str = r#"Respond with ONLY valid JSON (no markdown, no text outside the JSON):
{
  "validity_flags": [
    {"message_id": "<id>", "is_valid": true|false, "confidence": 0.0-1.0, "reasoning": "brief, in Portuguese"}
  ]
}"#;

const COUNTS_SCHEMA: &str = r#"Respond with ONLY valid JSON (no markdown, no text outside the JSON):
{
  "category_counts": [
    {"message_id": "<id>", "count": <instances in the message>, "confidence": 0.0-1.0, "reasoning": "brief, in Portuguese"}
  ]
}"#;

fn guidance(category: PatternCategory) -> &'static str {
    match category {
        PatternCategory::Contempt => {
            "Contempt: sarcasm, mockery, eye-rolling, superiority, character attacks disguised as humor. \
Distinguish genuine congratulations (\"Parabéns pelo seu aniversário!\") from sarcastic ones \
(\"Parabéns, você só levou 3 horas\"), and playful teasing between close partners from hostility. \
🙄 can be playful or contemptuous."
        }
        PatternCategory::Criticism => {
            "Criticism: an attack on the partner's character (\"você sempre...\", \"você nunca...\") rather \
than a complaint about a specific behavior. A gentle complaint about one event is not criticism."
        }
        PatternCategory::Defensiveness => {
            "Defensiveness: counter-attacking, whining, or denying responsibility (\"não é minha culpa\", \
\"mas você também\"). Calmly stating a fact is not defensiveness."
        }
        PatternCategory::Stonewalling => {
            "Stonewalling: withdrawing from the conversation, refusing to engage, shutting down \
(\"esquece\", \"não quero falar\"). A short reply that still engages is not stonewalling."
        }
        PatternCategory::Repair => {
            "Repair: a genuine attempt to de-escalate that takes (at least partial) responsibility. \
Blame-shifting (\"você tem razão, MAS você também...\"), conditional apologies (\"desculpa, mas se você \
não tivesse...\"), and sarcastic pseudo-repairs (\"ok, eu errei, feliz agora?\") are NOT valid repairs."
        }
        PatternCategory::Support => {
            "Support: understanding, validation, or caring in response to the partner. Quality is not length: \
\"Entendo, quer conversar?\" is supportive; \"Ah tá, e o que você quer que eu faça?\" is not."
        }
        PatternCategory::Assurance => {
            "Assurance: explicit commitment to the relationship or to standing by the partner."
        }
        PatternCategory::Affection => "Affection: expressed love, longing, or tenderness toward the partner.",
        PatternCategory::Gratitude => "Gratitude: thanks or appreciation directed at the partner.",
        PatternCategory::ActiveListening => {
            "Active listening: questions or prompts that invite the partner to share more about themselves."
        }
        PatternCategory::FuturePlanning => {
            "Future planning: shared plans or goals, from casual (\"vamos jantar\") to long-term \
(\"quero construir nossa vida juntos\")."
        }
        PatternCategory::Disclosure => {
            "Disclosure: the sender shares their own feelings, fears, or hopes. General statements \
(\"estou cansado\") count less than specific emotions or core fears."
        }
    }
}

fn shape(category: PatternCategory) -> ResponseShape {
    if category.is_horseman() || category == PatternCategory::Repair {
        ResponseShape::ValidityFlags
    } else {
        ResponseShape::CategoryCounts
    }
}

/// All templates, keyed by id.
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    templates: FxHashMap<String, PromptTemplate>,
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRegistry {
    pub fn new() -> Self {
        let templates = PatternCategory::ALL
            .iter()
            .map(|&category| {
                let id = format!("{}.{TEMPLATE_VERSION}", category.name());
                (
                    id.clone(),
                    PromptTemplate {
                        id,
                        category,
                        shape: shape(category),
                        guidance: guidance(category),
                    },
                )
            })
            .collect();
        Self { templates }
    }

    pub fn get(&self, id: &str) -> Option<&PromptTemplate> {
        self.templates.get(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// The template a request names, or the current version for its category
    /// when the id is unknown.
    pub fn for_request(&self, request: &OracleRequest) -> Option<&PromptTemplate> {
        self.get(&request.prompt_template_id).or_else(|| {
            self.get(&format!("{}.{TEMPLATE_VERSION}", request.category.name()))
        })
    }

    /// Render the full prompt for `request`.
    pub fn render(&self, request: &OracleRequest) -> Option<String> {
        let template = self.for_request(request)?;
        let mut prompt = String::with_capacity(1024);
        prompt.push_str(PREAMBLE);
        prompt.push_str("\n\n");
        prompt.push_str(template.guidance);
        prompt.push_str("\n\nMessages:\n");
        for m in &request.messages {
            let who = match m.sender {
                Sender::A => "A",
                Sender::B => "B",
            };
            let _ = writeln!(prompt, "[{}] {}: {}", m.id, who, m.text.replace('\n', " "));
        }
        prompt.push('\n');
        prompt.push_str(match template.shape {
            ResponseShape::ValidityFlags => VALIDITY_SCHEMA,
            ResponseShape::CategoryCounts => COUNTS_SCHEMA,
        });
        Some(prompt)
    }
}
