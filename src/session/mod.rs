//! Which profile an editing session is using.

use crate::{
    config::{
        GlobalConfig,
        ProfileConfig,
    },
    core::SuggestError,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSelection {
    selected: Option<String>,
}

impl ProfileSelection {
    /// Starts from the config's active profile name.
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self { selected: config.active_profile_name.clone() }
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The selected profile, falling back to the first one when the
    /// selection is unset or no longer exists.
    pub fn profile<'a>(&self, config: &'a GlobalConfig) -> Result<&'a ProfileConfig, SuggestError> {
        self.selected
            .as_deref()
            .and_then(|name| config.profile(name))
            .or_else(|| config.profiles.first())
            .ok_or_else(|| SuggestError::validation("No profiles configured"))
    }

    pub fn select(&mut self, config: &GlobalConfig, name: &str) -> Result<(), SuggestError> {
        if config.profile(name).is_none() {
            return Err(SuggestError::validation(format!("No profile named \"{name}\"")));
        }
        if self.selected.as_deref() != Some(name) {
            tracing::info!("Switched to profile \"{}\"", name);
            self.selected = Some(name.to_string());
        }
        Ok(())
    }

    /// Moves to the next profile in display order, wrapping around.
    pub fn cycle<'a>(&mut self, config: &'a GlobalConfig) -> Result<&'a ProfileConfig, SuggestError> {
        let current = self.profile(config)?;
        let index = config.profiles.iter().position(|p| p.name == current.name).unwrap_or(0);
        let next = &config.profiles[(index + 1) % config.profiles.len()];
        self.selected = Some(next.name.clone());
        Ok(next)
    }

    /// Writes the selection back so the next session starts from it.
    pub fn store(&self, config: &mut GlobalConfig) -> Result<(), SuggestError> {
        match &self.selected {
            Some(name) => config.set_active_profile(name),
            None => Ok(()),
        }
    }
}
