use heck::ToLowerCamelCase;
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

pub const DEFAULT_PROMPT: &str = "{0}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    pub name: String,
    pub icon: Option<String>,
    pub tip: String,
    pub endpoint: String,
    pub prompt: String,
    /// Comma-separated accelerators. The first asks for confirmation, the rest fire directly.
    pub keys: Option<String>,
    pub label: Option<String>,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            name: "Suggestion".to_string(),
            icon: None,
            tip: String::new(),
            endpoint: Endpoint::TextGeneration.tag().to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            keys: None,
            label: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub keys: String,
    pub confirm: bool,
}

impl ButtonConfig {
    pub fn new(name: &str, endpoint: &str, prompt: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            prompt: prompt.to_string(),
            ..Self::default()
        }
    }

    /// Host command id, always derived from the current name: "Images" -> "suggestImages".
    pub fn cmd(&self) -> String {
        format!("suggest {}", self.name).to_lower_camel_case()
    }

    pub fn display_label(&self) -> String {
        let icon_empty = self.icon.as_deref().map_or(true, |icon| icon.trim().is_empty());
        match self.label.as_deref() {
            Some(label) if !label.trim().is_empty() => label.to_string(),
            _ if icon_empty => format!("Suggest {}", self.name),
            _ => String::new(),
        }
    }

    pub fn bindings(&self) -> Vec<KeyBinding> {
        let Some(keys) = self.keys.as_deref() else {
            return Vec::new();
        };

        keys.split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .enumerate()
            .map(|(i, k)| KeyBinding { keys: k.to_string(), confirm: i == 0 })
            .collect()
    }

    pub fn confirm_binding(&self) -> Option<KeyBinding> {
        self.bindings().into_iter().find(|b| b.confirm)
    }

    pub fn fast_bindings(&self) -> Vec<KeyBinding> {
        self.bindings().into_iter().filter(|b| !b.confirm).collect()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), SuggestError> {
        let value = value.into().to_string();
        let optional = |v: String| if v.trim().is_empty() { None } else { Some(v) };
        match key {
            "name" => {
                if value.trim().is_empty() {
                    return Err(SuggestError::validation("Button name cannot be empty"));
                }
                self.name = value;
            }
            "endpoint" => {
                let endpoint: Endpoint = value.parse()?;
                self.endpoint = endpoint.tag().to_string();
            }
            "prompt" => self.prompt = value,
            "tip" => self.tip = value,
            "icon" => self.icon = optional(value),
            "keys" => self.keys = optional(value),
            "label" => self.label = optional(value),
            _ => return Err(SuggestError::validation(format!("Unknown button setting: {key}"))),
        }
        Ok(())
    }
}

impl Layer for ButtonConfig {
    fn precedence(&self) -> Precedence {
        Precedence::Action
    }

    fn entries(&self) -> Vec<(&'static str, Value)> {
        let mut entries = vec![
            ("name", Value::from(&self.name)),
            ("cmd", Value::from(self.cmd())),
            ("tip", Value::from(&self.tip)),
            ("endpoint", Value::from(&self.endpoint)),
            ("prompt", Value::from(&self.prompt)),
            ("label", Value::from(self.display_label())),
        ];
        if let Some(icon) = &self.icon {
            entries.push(("icon", Value::from(icon)));
        }
        if let Some(keys) = &self.keys {
            entries.push(("keys", Value::from(keys)));
        }
        entries
    }
}

pub fn default_buttons() -> Vec<ButtonConfig> {
    vec![
        ButtonConfig {
            icon: Some("image-search.png".to_string()),
            tip: "Suggest images".to_string(),
            keys: Some("Ctrl+Shift+I".to_string()),
            ..ButtonConfig::new("Images", Endpoint::ImageSearch.tag(), DEFAULT_PROMPT)
        },
        ButtonConfig {
            icon: Some("forvo.png".to_string()),
            tip: "Suggest a pronunciation".to_string(),
            keys: Some("Ctrl+Shift+O".to_string()),
            ..ButtonConfig::new("Pronunciation", Endpoint::Pronunciation.tag(), DEFAULT_PROMPT)
        },
        ButtonConfig {
            icon: Some("chatgpt.png".to_string()),
            tip: "Suggest an example sentence".to_string(),
            keys: Some("Ctrl+Shift+E".to_string()),
            ..ButtonConfig::new(
                "Sentence",
                Endpoint::TextGeneration.tag(),
                "Write one short example sentence using the word \"{0}\".",
            )
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_follows_name() {
        let mut button = ButtonConfig::new("Images", "image-search", "{0}");
        assert_eq!(button.cmd(), "suggestImages");

        button.set("name", "example sentence").unwrap();
        assert_eq!(button.cmd(), "suggestExampleSentence");

        button.name = "IPA".to_string();
        assert_eq!(button.cmd(), "suggestIpa");
    }

    #[test]
    fn test_display_label() {
        let mut button = ButtonConfig::new("Images", "image-search", "{0}");
        assert_eq!(button.display_label(), "Suggest Images");

        button.icon = Some("image-search.png".to_string());
        assert_eq!(button.display_label(), "");

        button.label = Some("Pics".to_string());
        assert_eq!(button.display_label(), "Pics");
    }

    #[test]
    fn test_key_bindings() {
        let mut button = ButtonConfig::default();
        assert!(button.bindings().is_empty());

        button.keys = Some("Ctrl+Shift+I, Ctrl+Alt+I,,Alt+I ".to_string());
        let confirm = button.confirm_binding().unwrap();
        assert_eq!(confirm.keys, "Ctrl+Shift+I");
        let fast: Vec<String> = button.fast_bindings().into_iter().map(|b| b.keys).collect();
        assert_eq!(fast, vec!["Ctrl+Alt+I", "Alt+I"]);
    }

    #[test]
    fn test_set_endpoint_validates() {
        let mut button = ButtonConfig::default();
        button.set("endpoint", "Forvo").unwrap();
        assert_eq!(button.endpoint, "pronunciation");
        assert!(matches!(
            button.set("endpoint", "Unknown"),
            Err(SuggestError::UnknownEndpoint(_))
        ));
        button.set("icon", "").unwrap();
        assert_eq!(button.icon, None);
    }

    #[test]
    fn test_default_prompt_binds_first_field() {
        let button: ButtonConfig = serde_json::from_str(r#"{"name": "Images"}"#).unwrap();
        assert_eq!(button.prompt, "{0}");
        assert_eq!(button.endpoint, "text-generation");
    }
}
