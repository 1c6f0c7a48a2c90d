use reqwest::blocking::Client;
use serde::Deserialize;

use super::{
    checked,
    languages::code_or_english,
    require_key,
};
use crate::{
    core::SuggestError,
    resolve::ParameterBag,
    suggestion::Suggestion,
};

pub const BING_API_ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/images/search";
const PROVIDER: &str = "Bing";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    #[serde(default)]
    pub name: String,
    pub content_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub host_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub value: Vec<ImageResult>,
}

/// Thumbnail URLs for `query`, at most `num_images` of them.
pub fn get_images(
    client: &Client,
    endpoint: &str,
    query: &str,
    params: &ParameterBag,
) -> Result<Suggestion, SuggestError> {
    let key = require_key(PROVIDER, params, "image_api_key")?;
    let num_images = params.int("num_images").unwrap_or(3).max(0) as usize;
    if num_images == 0 {
        return Ok(Suggestion::Image { urls: Vec::new() });
    }
    let setlang = code_or_english(params.str("language").unwrap_or_default());

    tracing::debug!("GET {} q={:?} setlang={} count={}", endpoint, query, setlang, num_images);
    let response = checked(
        PROVIDER,
        client
            .get(endpoint)
            .header("Ocp-Apim-Subscription-Key", key)
            .query(&[("q", query), ("setlang", setlang), ("count", &num_images.to_string())])
            .send(),
    )?;

    let results: SearchResponse =
        response.json().map_err(|e| SuggestError::provider(PROVIDER, e))?;
    Ok(Suggestion::Image { urls: thumbnails(results, num_images) })
}

fn thumbnails(results: SearchResponse, limit: usize) -> Vec<String> {
    results
        .value
        .into_iter()
        .filter_map(|img| img.thumbnail_url.or(img.content_url))
        .take(limit)
        .collect()
}
