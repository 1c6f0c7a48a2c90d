//! Provider adapters: one synchronous request per call, no retries.

use std::collections::BTreeMap;

use reqwest::blocking::{
    Client,
    Response,
};

use crate::{
    core::{
        http::{
            http_client,
            DEFAULT_TIMEOUT,
        },
        SuggestError,
    },
    resolve::ParameterBag,
    suggestion::Suggestion,
};

pub mod bing;
pub mod forvo;
pub mod languages;
pub mod openai;

/// The adapter seam the dispatch engine calls through.
pub trait Providers {
    /// Empty `urls` means no results; errors are transport, auth or format failures.
    fn image_search(&self, query: &str, params: &ParameterBag) -> Result<Suggestion, SuggestError>;

    fn pronunciation_lookup(
        &self,
        query: &str,
        params: &ParameterBag,
    ) -> Result<Suggestion, SuggestError>;

    fn text_completion(&self, query: &str, params: &ParameterBag)
        -> Result<Suggestion, SuggestError>;

    /// One request for every query; the response is keyed like `queries`.
    fn batch_text_completion(
        &self,
        queries: &BTreeMap<String, String>,
        system_context: &str,
        params: &ParameterBag,
    ) -> Result<BTreeMap<String, Suggestion>, SuggestError>;
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub bing: String,
    pub forvo: String,
    pub openai: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            bing: bing::BING_API_ENDPOINT.to_string(),
            forvo: forvo::FORVO_API_ENDPOINT.to_string(),
            openai: openai::OPENAI_API_ENDPOINT.to_string(),
        }
    }
}

/// Bing image search, Forvo pronunciations and OpenAI chat completions over one HTTP client.
pub struct HttpProviders {
    client: Client,
    endpoints: Endpoints,
}

impl HttpProviders {
    pub fn new() -> Result<Self, SuggestError> {
        Self::with_endpoints(Endpoints::default())
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Result<Self, SuggestError> {
        Ok(Self { client: http_client(DEFAULT_TIMEOUT)?, endpoints })
    }
}

impl Providers for HttpProviders {
    fn image_search(&self, query: &str, params: &ParameterBag) -> Result<Suggestion, SuggestError> {
        bing::get_images(&self.client, &self.endpoints.bing, query, params)
    }

    fn pronunciation_lookup(
        &self,
        query: &str,
        params: &ParameterBag,
    ) -> Result<Suggestion, SuggestError> {
        forvo::get_pronunciations(&self.client, &self.endpoints.forvo, query, params)
    }

    fn text_completion(
        &self,
        query: &str,
        params: &ParameterBag,
    ) -> Result<Suggestion, SuggestError> {
        openai::get_completion(&self.client, &self.endpoints.openai, query, params)
    }

    fn batch_text_completion(
        &self,
        queries: &BTreeMap<String, String>,
        system_context: &str,
        params: &ParameterBag,
    ) -> Result<BTreeMap<String, Suggestion>, SuggestError> {
        openai::get_completions(&self.client, &self.endpoints.openai, queries, system_context, params)
    }
}

pub(crate) fn require_key<'a>(
    provider: &'static str,
    params: &'a ParameterBag,
    key: &str,
) -> Result<&'a str, SuggestError> {
    match params.str(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SuggestError::provider(provider, format!("missing API key (set {key})"))),
    }
}

/// Maps transport failures and non-success statuses to a provider error.
pub(crate) fn checked(
    provider: &'static str,
    response: Result<Response, reqwest::Error>,
) -> Result<Response, SuggestError> {
    let response = response.map_err(|e| SuggestError::provider(provider, e))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        return Err(SuggestError::provider(provider, format!("HTTP {status}: {snippet}")));
    }
    Ok(response)
}
