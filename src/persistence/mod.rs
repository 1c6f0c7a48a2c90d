use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    config::GlobalConfig,
    core::SuggestError,
};

const APP_NAME: &str = "suggestr";
pub const CONFIG_FILE: &str = "config.json";

pub fn get_app_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        let app_dir = data_dir.join(APP_NAME);
        let _ = fs::create_dir_all(&app_dir);
        app_dir
    } else {
        PathBuf::from(".")
    }
}

pub fn get_data_file_path(filename: &str) -> PathBuf {
    get_app_data_dir().join(filename)
}

pub fn write_json<T: Serialize>(data: &T, path: &Path) -> Result<(), SuggestError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json)?;
    tracing::debug!("Data saved to: {}", path.display());
    Ok(())
}

/// Missing files read as `T::default()`.
pub fn read_json<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> Result<T, SuggestError> {
    if !path.exists() {
        return Ok(T::default());
    }

    let json = fs::read_to_string(path)?;
    let data: T = serde_json::from_str(&json)?;
    tracing::debug!("Data loaded from: {}", path.display());
    Ok(data)
}

/// Where the session's [`GlobalConfig`] lives on disk.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self { path: get_data_file_path(CONFIG_FILE) }
    }
}

impl ConfigStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<GlobalConfig, SuggestError> {
        let config: GlobalConfig = read_json(&self.path)?;
        tracing::info!(
            "Loaded config from {} ({} profiles, {} buttons, {} note templates)",
            self.path.display(),
            config.profiles.len(),
            config.buttons.len(),
            config.note_templates.len()
        );
        Ok(config)
    }

    pub fn save(&self, config: &GlobalConfig) -> Result<(), SuggestError> {
        write_json(config, &self.path)?;
        tracing::info!("Saved config to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::{
        FieldCompletion,
        NoteTypeTemplate,
        ProfileConfig,
    };

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path().join("nested").join("config.json"));
        assert_eq!(store.load().unwrap(), GlobalConfig::default());
    }

    #[test]
    fn test_round_trip_after_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path().join("nested").join("config.json"));

        let mut config = store.load().unwrap();
        config.text_api_key = "sk-test".to_string();
        let mut profile = ProfileConfig::named("French");
        profile.set("language", "fr").unwrap();
        profile.set("max_tokens", "250").unwrap();
        config.add_profile(profile).unwrap();
        config.set_active_profile("French").unwrap();
        config.buttons[0].keys = Some("Ctrl+I, Alt+I".to_string());
        config.set_note_template(
            "1700000000",
            NoteTypeTemplate {
                shared_prompt: "The word is {Front}.".to_string(),
                ..NoteTypeTemplate::default()
            }
            .with_field("Back", FieldCompletion::new("text-generation", "Translate {Front}")),
        );
        store.save(&config).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, config);
        assert_eq!(reloaded.profile("French").unwrap().max_tokens(), 250);
    }

    #[test]
    fn test_top_level_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        write_json(&GlobalConfig::default(), &path).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        for key in ["buttons", "profiles", "active_profile_name", "note_templates", "text_api_key"] {
            assert!(raw.get(key).is_some(), "missing {key}");
        }
        // derived command ids are never persisted
        assert!(raw["buttons"][0].get("cmd").is_none());
    }
}
