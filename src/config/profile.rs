use serde::{
    Deserialize,
    Deserializer,
    Serialize,
};

use crate::{
    core::SuggestError,
    resolve::{
        Layer,
        Precedence,
        Value,
    },
};

pub const DEFAULT_PROFILE_NAME: &str = "Default";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert {language} teacher helping a \
    {difficulty} student write flashcards. Reply with the requested content only, in {language}.";

pub const MAX_TEMPERATURE: f64 = 2.0;

/// A named bundle of generation parameters.
///
/// The numeric fields only change through the setters, which coerce and
/// validate the new value before storing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub name: String,
    pub language: String,
    #[serde(deserialize_with = "deserialize_num_images")]
    num_images: u32,
    pub model: String,
    #[serde(deserialize_with = "deserialize_max_tokens")]
    max_tokens: u32,
    #[serde(deserialize_with = "deserialize_temperature")]
    temperature: f64,
    pub system_prompt: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            language: "en".to_string(),
            num_images: 3,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 100,
            temperature: 0.7,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl ProfileConfig {
    pub fn named(name: &str) -> Self {
        Self { name: name.to_string(), ..Self::default() }
    }

    pub fn num_images(&self) -> u32 {
        self.num_images
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn set_num_images(&mut self, value: impl Into<Value>) -> Result<(), SuggestError> {
        self.num_images = coerce_num_images(&value.into())?;
        Ok(())
    }

    pub fn set_max_tokens(&mut self, value: impl Into<Value>) -> Result<(), SuggestError> {
        self.max_tokens = coerce_max_tokens(&value.into())?;
        Ok(())
    }

    pub fn set_temperature(&mut self, value: impl Into<Value>) -> Result<(), SuggestError> {
        self.temperature = coerce_temperature(&value.into())?;
        Ok(())
    }

    /// Keyed setter used by the settings surface. `"100"` stores 100, `"lots"` is rejected.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), SuggestError> {
        let value = value.into();
        match key {
            "name" => {
                let name = value.to_string();
                if name.trim().is_empty() {
                    return Err(SuggestError::validation("Profile name cannot be empty"));
                }
                self.name = name;
            }
            "language" => self.language = value.to_string(),
            "model" => self.model = value.to_string(),
            "system_prompt" => self.system_prompt = value.to_string(),
            "num_images" => self.set_num_images(value)?,
            "max_tokens" => self.set_max_tokens(value)?,
            "temperature" => self.set_temperature(value)?,
            _ => return Err(SuggestError::validation(format!("Unknown profile setting: {key}"))),
        }
        Ok(())
    }
}

impl Layer for ProfileConfig {
    fn precedence(&self) -> Precedence {
        Precedence::Profile
    }

    fn entries(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::from(&self.name)),
            ("language", Value::from(&self.language)),
            ("num_images", Value::from(self.num_images)),
            ("model", Value::from(&self.model)),
            ("max_tokens", Value::from(self.max_tokens)),
            ("temperature", Value::from(self.temperature)),
            ("system_prompt", Value::from(&self.system_prompt)),
        ]
    }
}

fn whole_number(key: &str, value: &Value) -> Result<i64, SuggestError> {
    let parsed = match value {
        Value::Bool(_) => None,
        _ => value.as_i64(),
    };
    parsed.ok_or_else(|| {
        SuggestError::validation(format!("{key} must be a whole number, got \"{value}\""))
    })
}

fn coerce_num_images(value: &Value) -> Result<u32, SuggestError> {
    let n = whole_number("num_images", value)?;
    u32::try_from(n)
        .map_err(|_| SuggestError::validation(format!("num_images must be 0 or more, got {n}")))
}

fn coerce_max_tokens(value: &Value) -> Result<u32, SuggestError> {
    let n = whole_number("max_tokens", value)?;
    match u32::try_from(n) {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(SuggestError::validation(format!("max_tokens must be greater than 0, got {n}"))),
    }
}

fn coerce_temperature(value: &Value) -> Result<f64, SuggestError> {
    let t = match value {
        Value::Bool(_) => None,
        _ => value.as_f64(),
    }
    .ok_or_else(|| {
        SuggestError::validation(format!("temperature must be a number, got \"{value}\""))
    })?;

    if !t.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&t) {
        return Err(SuggestError::validation(format!(
            "temperature must be between 0 and {MAX_TEMPERATURE}, got {t}"
        )));
    }
    Ok(t)
}

// Persisted configs may carry numbers as strings ("100"); accept both forms.
fn deserialize_with_coercion<'de, D, T>(
    deserializer: D,
    coerce: fn(&Value) -> Result<T, SuggestError>,
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    coerce(&raw).map_err(serde::de::Error::custom)
}

fn deserialize_num_images<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    deserialize_with_coercion(deserializer, coerce_num_images)
}

fn deserialize_max_tokens<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    deserialize_with_coercion(deserializer, coerce_max_tokens)
}

fn deserialize_temperature<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    deserialize_with_coercion(deserializer, coerce_temperature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_numerals_are_coerced() {
        let mut profile = ProfileConfig::default();
        profile.set("max_tokens", "100").unwrap();
        profile.set("num_images", " 5 ").unwrap();
        profile.set("temperature", "1.25").unwrap();

        assert_eq!(profile.max_tokens(), 100);
        assert_eq!(profile.num_images(), 5);
        assert_eq!(profile.temperature(), 1.25);
        assert!(profile.entries().contains(&("max_tokens", Value::Int(100))));
    }

    #[test]
    fn test_non_numerals_are_rejected() {
        let mut profile = ProfileConfig::default();
        for (key, bad) in [("max_tokens", "lots"), ("num_images", "3.5"), ("temperature", "warm")] {
            let err = profile.set(key, bad).unwrap_err();
            assert!(err.is_skip(), "{key}: {err}");
        }
        assert!(profile.set("max_tokens", 0).is_err());
        assert!(profile.set("num_images", -1).is_err());
        assert!(profile.set("temperature", 2.5).is_err());
        assert!(profile.set("max_tokens", true).is_err());

        // failed assignments leave the previous values in place
        assert_eq!(profile, ProfileConfig::default());
    }

    #[test]
    fn test_string_fields_and_unknown_keys() {
        let mut profile = ProfileConfig::default();
        profile.set("language", "fr").unwrap();
        profile.set("model", "m1").unwrap();
        assert_eq!(profile.language, "fr");
        assert_eq!(profile.model, "m1");
        assert!(profile.set("name", "  ").is_err());
        assert!(profile.set("colour", "blue").is_err());
    }

    #[test]
    fn test_deserialize_accepts_numeric_strings() {
        let profile: ProfileConfig = serde_json::from_str(
            r#"{"name": "Japanese", "language": "ja", "max_tokens": "250", "num_images": 2, "temperature": "0.2"}"#,
        )
        .unwrap();
        assert_eq!(profile.name, "Japanese");
        assert_eq!(profile.max_tokens(), 250);
        assert_eq!(profile.num_images(), 2);
        assert_eq!(profile.temperature(), 0.2);
        assert_eq!(profile.model, "gpt-4o-mini");

        let err = serde_json::from_str::<ProfileConfig>(r#"{"max_tokens": "many"}"#);
        assert!(err.is_err());
    }
}
