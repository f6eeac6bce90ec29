use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pronoun guidance attached to a glossary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PronounHint {
    Male,
    Female,
    Other,
    /// Let the model infer pronouns from context
    Auto,
}

impl PronounHint {
    pub fn instruction(&self) -> &'static str {
        match self {
            PronounHint::Male => "Use he/him pronouns",
            PronounHint::Female => "Use she/her pronouns",
            PronounHint::Other => "Use they/them pronouns",
            PronounHint::Auto => "Determine appropriate pronouns from context",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    #[serde(default)]
    pub korean_name: String,
    #[serde(default)]
    pub english_name: String,
    #[serde(default, deserialize_with = "lenient_pronoun")]
    pub gender: Option<PronounHint>,
}

/// Character glossary of a novel: entry id -> fixed translation.
///
/// Stored as a JSON object on the novel row. Ordered by id so prompts are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Glossary(BTreeMap<String, GlossaryEntry>);

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a stored glossary; anything that is not an object of entries becomes empty.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match serde_json::from_value::<Glossary>(value.clone()) {
            Ok(glossary) => glossary,
            Err(e) => {
                if !value.is_null() {
                    log::warn!("Ignoring malformed glossary: {}", e);
                }
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    pub fn insert(&mut self, id: impl Into<String>, entry: GlossaryEntry) {
        self.0.insert(id.into(), entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &GlossaryEntry> {
        self.0.values()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// Unknown gender labels ("", "unknown") mean "no hint" rather than a broken glossary.
fn lenient_pronoun<'de, D>(deserializer: D) -> Result<Option<PronounHint>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        serde_json::from_value::<PronounHint>(serde_json::Value::String(s.to_lowercase())).ok()
    }))
}
