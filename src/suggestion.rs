use std::fmt;

use serde::{
    Deserialize,
    Serialize,
};

use crate::core::{
    utils::escape_html,
    SuggestError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Image,
    Sound,
    Text,
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SuggestionKind::Image => "image",
            SuggestionKind::Sound => "sound",
            SuggestionKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// The result of one provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Suggestion {
    Image { urls: Vec<String> },
    Sound { urls: Vec<String> },
    Text { content: String },
}

impl Suggestion {
    pub fn text(content: impl Into<String>) -> Self {
        Suggestion::Text { content: content.into() }
    }

    pub fn kind(&self) -> SuggestionKind {
        match self {
            Suggestion::Image { .. } => SuggestionKind::Image,
            Suggestion::Sound { .. } => SuggestionKind::Sound,
            Suggestion::Text { .. } => SuggestionKind::Text,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Suggestion::Image { urls } | Suggestion::Sound { urls } => urls.is_empty(),
            Suggestion::Text { content } => content.trim().is_empty(),
        }
    }

    /// Renders into note markup. `resolve_url` maps each remote URL to a
    /// local media reference; only the first sound URL is used.
    pub fn to_markup<F>(&self, mut resolve_url: F) -> Result<String, SuggestError>
    where
        F: FnMut(&str) -> Result<String, SuggestError>,
    {
        let markup = match self {
            Suggestion::Text { content } => content.clone(),
            Suggestion::Image { urls } => {
                let mut links = String::new();
                for url in urls {
                    let local = resolve_url(url)?;
                    links.push_str(&format!("<img src=\"{}\" />", escape_html(&local)));
                }
                links
            }
            Suggestion::Sound { urls } => match urls.first() {
                Some(url) => {
                    let local = resolve_url(url)?;
                    if local.is_empty() {
                        String::new()
                    } else {
                        format!("[sound:{}]", escape_html(&local))
                    }
                }
                None => String::new(),
            },
        };
        Ok(markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(url: &str) -> Result<String, SuggestError> {
        Ok(url.rsplit('/').next().unwrap_or_default().to_string())
    }

    #[test]
    fn test_image_markup() {
        let suggestion = Suggestion::Image {
            urls: vec!["https://x.test/a.jpg".to_string(), "https://x.test/b&c.jpg".to_string()],
        };
        assert_eq!(
            suggestion.to_markup(local).unwrap(),
            "<img src=\"a.jpg\" /><img src=\"b&amp;c.jpg\" />"
        );
    }

    #[test]
    fn test_sound_markup_uses_first_url() {
        let mut resolved = Vec::new();
        let suggestion = Suggestion::Sound {
            urls: vec!["https://x.test/1.mp3".to_string(), "https://x.test/2.mp3".to_string()],
        };
        let markup = suggestion
            .to_markup(|url| {
                resolved.push(url.to_string());
                local(url)
            })
            .unwrap();
        assert_eq!(markup, "[sound:1.mp3]");
        assert_eq!(resolved, vec!["https://x.test/1.mp3"]);
    }

    #[test]
    fn test_empty_suggestions_render_empty() {
        assert_eq!(Suggestion::Image { urls: vec![] }.to_markup(local).unwrap(), "");
        assert_eq!(Suggestion::Sound { urls: vec![] }.to_markup(local).unwrap(), "");
        assert_eq!(Suggestion::text("").to_markup(local).unwrap(), "");
        assert!(Suggestion::text("  ").is_empty());
    }

    #[test]
    fn test_text_markup_is_verbatim() {
        let suggestion = Suggestion::text("bonjour");
        assert_eq!(suggestion.kind(), SuggestionKind::Text);
        assert_eq!(suggestion.to_markup(|_| panic!("no urls to resolve")).unwrap(), "bonjour");
    }

    #[test]
    fn test_resolve_errors_propagate() {
        let suggestion = Suggestion::Image { urls: vec!["https://x.test/a.jpg".to_string()] };
        let result = suggestion.to_markup(|_| Err(SuggestError::Custom("offline".to_string())));
        assert!(result.is_err());
    }
}
