//! The layered settings schema: global settings, named profiles, named
//! actions (buttons) and per-note-type field completions.

use std::collections::{
    BTreeMap,
    HashSet,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    core::SuggestError,
    resolve::{
        Layer,
        Precedence,
        Value,
    },
    template,
};

pub mod button;
pub mod endpoint;
pub mod note_template;
pub mod profile;

pub use button::{
    ButtonConfig,
    KeyBinding,
};
pub use endpoint::Endpoint;
pub use note_template::{
    FieldCompletion,
    NoteTypeTemplate,
    TAGS_FIELD,
};
pub use profile::ProfileConfig;

pub const DIFFICULTIES: &[&str] = &["A1", "A2", "B1", "B2", "C1", "C2"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    #[serde(alias = "bing_api_key")]
    pub image_api_key: String,
    #[serde(alias = "forvo_api_key")]
    pub pronunciation_api_key: String,
    #[serde(alias = "openai_api_key")]
    pub text_api_key: String,
    pub language: String,
    pub difficulty: String,
    pub buttons: Vec<ButtonConfig>,
    pub profiles: Vec<ProfileConfig>,
    pub active_profile_name: Option<String>,
    pub note_templates: BTreeMap<String, NoteTypeTemplate>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        let profile = ProfileConfig::default();
        Self {
            image_api_key: String::new(),
            pronunciation_api_key: String::new(),
            text_api_key: String::new(),
            language: "en".to_string(),
            difficulty: "A1".to_string(),
            buttons: button::default_buttons(),
            active_profile_name: Some(profile.name.clone()),
            profiles: vec![profile],
            note_templates: BTreeMap::new(),
        }
    }
}

impl Layer for GlobalConfig {
    fn precedence(&self) -> Precedence {
        Precedence::Global
    }

    fn entries(&self) -> Vec<(&'static str, Value)> {
        let mut entries = vec![
            ("image_api_key", Value::from(&self.image_api_key)),
            ("pronunciation_api_key", Value::from(&self.pronunciation_api_key)),
            ("text_api_key", Value::from(&self.text_api_key)),
            ("language", Value::from(&self.language)),
            ("difficulty", Value::from(&self.difficulty)),
        ];
        if let Some(active) = &self.active_profile_name {
            entries.push(("active_profile_name", Value::from(active)));
        }
        entries
    }
}

impl GlobalConfig {
    pub fn profile(&self, name: &str) -> Option<&ProfileConfig> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn profile_mut(&mut self, name: &str) -> Option<&mut ProfileConfig> {
        self.profiles.iter_mut().find(|p| p.name == name)
    }

    /// The named active profile, or the first profile when the name is unset or dangling.
    pub fn active_profile(&self) -> Option<&ProfileConfig> {
        self.active_profile_name
            .as_deref()
            .and_then(|name| self.profile(name))
            .or_else(|| self.profiles.first())
    }

    pub fn set_active_profile(&mut self, name: &str) -> Result<(), SuggestError> {
        if self.profile(name).is_none() {
            return Err(SuggestError::validation(format!("No profile named \"{name}\"")));
        }
        self.active_profile_name = Some(name.to_string());
        Ok(())
    }

    pub fn add_profile(&mut self, profile: ProfileConfig) -> Result<(), SuggestError> {
        if profile.name.trim().is_empty() {
            return Err(SuggestError::validation("Profile name cannot be empty"));
        }
        if self.profile(&profile.name).is_some() {
            return Err(SuggestError::validation(format!(
                "A profile named \"{}\" already exists",
                profile.name
            )));
        }
        self.profiles.push(profile);
        Ok(())
    }

    pub fn remove_profile(&mut self, name: &str) -> Result<ProfileConfig, SuggestError> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| SuggestError::validation(format!("No profile named \"{name}\"")))?;
        let removed = self.profiles.remove(index);

        if self.active_profile_name.as_deref() == Some(name) {
            self.active_profile_name = self.profiles.first().map(|p| p.name.clone());
        }
        Ok(removed)
    }

    pub fn rename_profile(&mut self, old: &str, new: &str) -> Result<(), SuggestError> {
        if old == new {
            return Ok(());
        }
        if new.trim().is_empty() {
            return Err(SuggestError::validation("Profile name cannot be empty"));
        }
        if self.profile(new).is_some() {
            return Err(SuggestError::validation(format!(
                "A profile named \"{new}\" already exists"
            )));
        }
        let profile = self
            .profile_mut(old)
            .ok_or_else(|| SuggestError::validation(format!("No profile named \"{old}\"")))?;
        profile.name = new.to_string();

        if self.active_profile_name.as_deref() == Some(old) {
            self.active_profile_name = Some(new.to_string());
        }
        Ok(())
    }

    /// Copies a profile under the first free "<name> (copy)" style name.
    pub fn duplicate_profile(&mut self, name: &str) -> Result<&ProfileConfig, SuggestError> {
        let mut copy = self
            .profile(name)
            .cloned()
            .ok_or_else(|| SuggestError::validation(format!("No profile named \"{name}\"")))?;

        copy.name = self.unused_profile_name(&format!("{name} (copy)"));
        self.profiles.push(copy);
        Ok(&self.profiles[self.profiles.len() - 1])
    }

    fn unused_profile_name(&self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 2;
        while self.profile(&candidate).is_some() {
            candidate = format!("{base} {n}");
            n += 1;
        }
        candidate
    }

    pub fn add_button(&mut self, button: ButtonConfig) {
        self.buttons.push(button);
    }

    pub fn remove_button(&mut self, index: usize) -> Option<ButtonConfig> {
        if index < self.buttons.len() {
            Some(self.buttons.remove(index))
        } else {
            None
        }
    }

    /// Inserts a copy right after the original, renamed so its command id stays unique.
    pub fn duplicate_button(&mut self, index: usize) -> Option<&ButtonConfig> {
        let mut copy = self.buttons.get(index)?.clone();
        let base = format!("{} Copy", copy.name);
        copy.name = base.clone();
        let mut n = 2;
        while self.button_by_cmd(&copy.cmd()).is_some() {
            copy.name = format!("{base} {n}");
            n += 1;
        }
        self.buttons.insert(index + 1, copy);
        self.buttons.get(index + 1)
    }

    pub fn button_by_cmd(&self, cmd: &str) -> Option<&ButtonConfig> {
        self.buttons.iter().find(|b| b.cmd() == cmd)
    }

    /// Looks a button up by display name, falling back to its command id.
    pub fn button(&self, name: &str) -> Option<&ButtonConfig> {
        self.buttons.iter().find(|b| b.name == name).or_else(|| self.button_by_cmd(name))
    }

    pub fn note_template(&self, note_type: &str) -> Option<&NoteTypeTemplate> {
        self.note_templates.get(note_type)
    }

    pub fn set_note_template(&mut self, note_type: &str, template: NoteTypeTemplate) {
        self.note_templates.insert(note_type.to_string(), template);
    }

    pub fn remove_note_template(&mut self, note_type: &str) -> Option<NoteTypeTemplate> {
        self.note_templates.remove(note_type)
    }

    /// Every problem that would make a request misbehave. Empty means the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut names = HashSet::new();
        for profile in &self.profiles {
            if !names.insert(profile.name.as_str()) {
                problems.push(format!("Duplicate profile name \"{}\"", profile.name));
            }
            if let Err(e) = template::placeholders(&profile.system_prompt) {
                problems.push(format!("Profile \"{}\" system prompt: {}", profile.name, e));
            }
        }

        if let Some(active) = &self.active_profile_name {
            if self.profile(active).is_none() {
                problems.push(format!("Active profile \"{active}\" does not exist"));
            }
        }
        if self.profiles.is_empty() {
            problems.push("No profiles configured".to_string());
        }

        if !DIFFICULTIES.contains(&self.difficulty.as_str()) {
            problems.push(format!("Unknown difficulty \"{}\"", self.difficulty));
        }

        let mut cmds = HashSet::new();
        for button in &self.buttons {
            let cmd = button.cmd();
            if !cmds.insert(cmd.clone()) {
                problems.push(format!("Button \"{}\" duplicates command {}", button.name, cmd));
            }
            if let Err(e) = button.endpoint.parse::<Endpoint>() {
                problems.push(format!("Button \"{}\": {}", button.name, e));
            }
            if let Err(e) = template::placeholders(&button.prompt) {
                problems.push(format!("Button \"{}\" prompt: {}", button.name, e));
            }
        }

        for (note_type, note_template) in &self.note_templates {
            if let Err(e) = template::placeholders(&note_template.shared_prompt) {
                problems.push(format!("Note type {note_type} shared prompt: {e}"));
            }
            for (field, completion) in &note_template.fields {
                if let Err(e) = completion.endpoint.parse::<Endpoint>() {
                    problems.push(format!("Note type {note_type} field \"{field}\": {e}"));
                }
                if let Err(e) = template::placeholders(&completion.prompt) {
                    problems.push(format!("Note type {note_type} field \"{field}\" prompt: {e}"));
                }
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GlobalConfig::default();
        assert_eq!(config.validate(), Vec::<String>::new());
        assert_eq!(config.active_profile().unwrap().name, "Default");
        let cmds: Vec<String> = config.buttons.iter().map(|b| b.cmd()).collect();
        assert_eq!(cmds, vec!["suggestImages", "suggestPronunciation", "suggestSentence"]);
    }

    #[test]
    fn test_active_profile_fallback() {
        let mut config = GlobalConfig::default();
        config.add_profile(ProfileConfig::named("French")).unwrap();

        config.active_profile_name = None;
        assert_eq!(config.active_profile().unwrap().name, "Default");

        config.active_profile_name = Some("Gone".to_string());
        assert_eq!(config.active_profile().unwrap().name, "Default");
        assert!(config.validate().iter().any(|p| p.contains("Gone")));

        config.set_active_profile("French").unwrap();
        assert_eq!(config.active_profile().unwrap().name, "French");
        assert!(config.set_active_profile("Klingon").is_err());
    }

    #[test]
    fn test_profile_names_stay_unique() {
        let mut config = GlobalConfig::default();
        assert!(config.add_profile(ProfileConfig::named("Default")).is_err());

        let copy = config.duplicate_profile("Default").unwrap().name.clone();
        assert_eq!(copy, "Default (copy)");
        let copy2 = config.duplicate_profile("Default").unwrap().name.clone();
        assert_eq!(copy2, "Default (copy) 2");

        assert!(config.rename_profile(&copy, "Default").is_err());
        config.rename_profile("Default", "Main").unwrap();
        assert_eq!(config.active_profile_name.as_deref(), Some("Main"));

        config.remove_profile("Main").unwrap();
        assert_eq!(config.active_profile_name.as_deref(), Some("Default (copy)"));
    }

    #[test]
    fn test_duplicate_button_keeps_cmds_unique() {
        let mut config = GlobalConfig::default();
        let name = config.duplicate_button(0).unwrap().name.clone();
        assert_eq!(name, "Images Copy");
        config.duplicate_button(0).unwrap();
        assert_eq!(config.buttons[1].name, "Images Copy 2");
        assert_eq!(config.validate(), Vec::<String>::new());

        config.buttons[1].name = "images".to_string();
        assert!(config.validate().iter().any(|p| p.contains("suggestImages")));
        assert_eq!(config.button("suggestSentence").unwrap().name, "Sentence");
    }

    #[test]
    fn test_validate_reports_bad_templates_and_endpoints() {
        let mut config = GlobalConfig::default();
        config.buttons[0].endpoint = "Unknown".to_string();
        config.buttons[1].prompt = "{0".to_string();
        config.set_note_template(
            "1234",
            NoteTypeTemplate::default().with_field("Back", FieldCompletion::new("sms", "{Front}")),
        );

        let problems = config.validate();
        assert_eq!(problems.len(), 3, "{problems:?}");
    }

    #[test]
    fn test_legacy_credential_keys() {
        let config: GlobalConfig = serde_json::from_str(
            r#"{"bing_api_key": "b", "forvo_api_key": "f", "openai_api_key": "o"}"#,
        )
        .unwrap();
        assert_eq!(config.image_api_key, "b");
        assert_eq!(config.pronunciation_api_key, "f");
        assert_eq!(config.text_api_key, "o");
        assert_eq!(config.buttons.len(), 3);
    }
}
