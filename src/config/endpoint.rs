use std::{
    fmt,
    str::FromStr,
};

use crate::core::SuggestError;

/// The provider category an action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ImageSearch,
    Pronunciation,
    TextGeneration,
}

impl Endpoint {
    pub const ALL: [Endpoint; 3] =
        [Endpoint::ImageSearch, Endpoint::Pronunciation, Endpoint::TextGeneration];

    pub fn tag(&self) -> &'static str {
        match self {
            Endpoint::ImageSearch => "image-search",
            Endpoint::Pronunciation => "pronunciation",
            Endpoint::TextGeneration => "text-generation",
        }
    }

    /// Only text generation has a batched request form.
    pub fn is_batchable(&self) -> bool {
        matches!(self, Endpoint::TextGeneration)
    }
}

impl FromStr for Endpoint {
    type Err = SuggestError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let normalized = tag.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "image-search" | "bing" => Ok(Endpoint::ImageSearch),
            "pronunciation" | "forvo" => Ok(Endpoint::Pronunciation),
            "text-generation" | "openai" => Ok(Endpoint::TextGeneration),
            _ => Err(SuggestError::UnknownEndpoint(tag.to_string())),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
