use reqwest::{
    blocking::Client,
    header::USER_AGENT,
    Url,
};
use serde::Deserialize;

use super::{
    checked,
    languages::code_or_english,
    require_key,
};
use crate::{
    core::{
        http::BROWSER_USER_AGENT,
        SuggestError,
    },
    resolve::ParameterBag,
    suggestion::Suggestion,
};

pub const FORVO_API_ENDPOINT: &str = "https://apifree.forvo.com/action/word-pronunciations";
const PROVIDER: &str = "Forvo";

#[derive(Debug, Deserialize)]
pub struct Pronunciation {
    #[serde(default)]
    pub username: String,
    pub pathmp3: Option<String>,
    pub pathogg: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PronunciationResponse {
    #[serde(default)]
    pub items: Vec<Pronunciation>,
}

pub fn request_url(endpoint: &str, query: &str, language: &str, key: &str) -> Result<Url, SuggestError> {
    let word = query.trim().to_lowercase();
    let mut url = Url::parse(endpoint).map_err(|e| SuggestError::provider(PROVIDER, e))?;
    url.path_segments_mut()
        .map_err(|_| SuggestError::provider(PROVIDER, format!("cannot extend URL {endpoint}")))?
        .pop_if_empty()
        .extend([
            "format", "json", "word", word.as_str(), "language", language, "order", "rate-desc", "key", key, "",
        ]);
    Ok(url)
}

/// Pronunciation MP3 URLs for `query`, best rated first.
pub fn get_pronunciations(
    client: &Client,
    endpoint: &str,
    query: &str,
    params: &ParameterBag,
) -> Result<Suggestion, SuggestError> {
    let key = require_key(PROVIDER, params, "pronunciation_api_key")?;
    let language = code_or_english(params.str("language").unwrap_or_default());
    let url = request_url(endpoint, query, language, key)?;

    tracing::debug!("GET Forvo pronunciations for {:?} ({})", query, language);
    let response = checked(PROVIDER, client.get(url).header(USER_AGENT, BROWSER_USER_AGENT).send())?;
    let body: PronunciationResponse =
        response.json().map_err(|e| SuggestError::provider(PROVIDER, e))?;

    Ok(Suggestion::Sound { urls: body.items.into_iter().filter_map(|item| item.pathmp3).collect() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url() {
        let url = request_url(FORVO_API_ENDPOINT, "  Bonjour ", "fr", "abc").unwrap();
        assert_eq!(
            url.as_str(),
            "https://apifree.forvo.com/action/word-pronunciations/format/json/word/bonjour/language/fr/order/rate-desc/key/abc/"
        );
    }

    #[test]
    fn test_request_url_encodes_word() {
        let url = request_url(FORVO_API_ENDPOINT, "à bientôt", "fr", "abc").unwrap();
        assert!(url.as_str().contains("/word/%C3%A0%20bient%C3%B4t/"));
    }

    #[test]
    fn test_response_skips_items_without_mp3() {
        let body: PronunciationResponse = serde_json::from_str(
            r#"{"attributes": {"total": 2}, "items": [
                {"username": "a", "pathmp3": "https://forvo/a.mp3"},
                {"username": "b", "pathogg": "https://forvo/b.ogg"}
            ]}"#,
        )
        .unwrap();
        let urls: Vec<_> = body.items.into_iter().filter_map(|i| i.pathmp3).collect();
        assert_eq!(urls, vec!["https://forvo/a.mp3"]);
    }
}
