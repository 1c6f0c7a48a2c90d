use std::collections::BTreeMap;

use serde::{
    Deserialize,
    Serialize,
};

use super::endpoint::Endpoint;
use crate::{
    core::SuggestError,
    resolve::{
        Layer,
        Precedence,
        Value,
    },
};

/// Pseudo-field naming the note's tag list rather than a field slot.
pub const TAGS_FIELD: &str = "Tags";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldCompletion {
    pub enabled: bool,
    pub endpoint: String,
    pub prompt: String,
}

impl Default for FieldCompletion {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: Endpoint::TextGeneration.tag().to_string(),
            prompt: String::new(),
        }
    }
}

impl FieldCompletion {
    pub fn new(endpoint: &str, prompt: &str) -> Self {
        Self { enabled: true, endpoint: endpoint.to_string(), prompt: prompt.to_string() }
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), SuggestError> {
        let value = value.into();
        match key {
            "enabled" => {
                self.enabled = value.as_bool().ok_or_else(|| {
                    SuggestError::validation(format!("enabled must be true or false, got \"{value}\""))
                })?;
            }
            "endpoint" => {
                let endpoint: Endpoint = value.to_string().parse()?;
                self.endpoint = endpoint.tag().to_string();
            }
            "prompt" => self.prompt = value.to_string(),
            _ => {
                return Err(SuggestError::validation(format!(
                    "Unknown field completion setting: {key}"
                )))
            }
        }
        Ok(())
    }
}

impl Layer for FieldCompletion {
    fn precedence(&self) -> Precedence {
        Precedence::Action
    }

    fn entries(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("enabled", Value::from(self.enabled)),
            ("endpoint", Value::from(&self.endpoint)),
            ("prompt", Value::from(&self.prompt)),
        ]
    }
}

/// Per-field completions for one note type, used by bulk runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteTypeTemplate {
    pub shared_prompt: String,
    pub fields: BTreeMap<String, FieldCompletion>,
}

impl NoteTypeTemplate {
    pub fn with_field(mut self, name: &str, completion: FieldCompletion) -> Self {
        self.fields.insert(name.to_string(), completion);
        self
    }

    pub fn enabled_fields(&self) -> impl Iterator<Item = (&String, &FieldCompletion)> {
        self.fields.iter().filter(|(_, completion)| completion.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_completion_defaults() {
        let completion: FieldCompletion = serde_json::from_str("{}").unwrap();
        assert_eq!(completion.endpoint, "text-generation");
        assert!(!completion.enabled);
    }

    #[test]
    fn test_field_completion_set() {
        let mut completion = FieldCompletion::default();
        completion.set("enabled", "yes").unwrap();
        completion.set("endpoint", "Bing").unwrap();
        completion.set("prompt", "{Word}").unwrap();
        assert_eq!(completion, FieldCompletion::new("image-search", "{Word}"));
        assert!(completion.set("enabled", "maybe").is_err());
    }

    #[test]
    fn test_enabled_fields() {
        let mut disabled = FieldCompletion::new("text-generation", "{0}");
        disabled.enabled = false;
        let template = NoteTypeTemplate::default()
            .with_field("Example", FieldCompletion::new("text-generation", "Use {Word}"))
            .with_field("Notes", disabled)
            .with_field(TAGS_FIELD, FieldCompletion::new("text-generation", "Tags for {Word}"));

        let names: Vec<&String> = template.enabled_fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Example", "Tags"]);
    }
}
