use thiserror::Error;

#[derive(Error, Debug)]
pub enum SuggestError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    /// Bad user input: nothing selected, empty query, invalid setting value.
    #[error("{0}")]
    Validation(String),

    #[error("Template references unknown key: {{{0}}}")]
    TemplateKey(String),

    #[error("Template syntax error at byte {position}: {message}")]
    TemplateSyntax { position: usize, message: String },

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("{provider} request failed: {message}")]
    Provider { provider: &'static str, message: String },

    #[error("Batched response is missing field: {0}")]
    PartialBatch(String),

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("No content found")]
    NoContent,

    #[error("SuggestError: {0}")]
    Custom(String),
}

impl SuggestError {
    pub fn validation(message: impl Into<String>) -> Self {
        SuggestError::Validation(message.into())
    }

    pub fn provider(provider: &'static str, message: impl ToString) -> Self {
        SuggestError::Provider { provider, message: message.to_string() }
    }

    /// Validation errors end a flow as skipped, everything else as failed.
    pub fn is_skip(&self) -> bool {
        matches!(self, SuggestError::Validation(_))
    }
}

impl From<std::io::Error> for SuggestError {
    fn from(error: std::io::Error) -> Self {
        SuggestError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for SuggestError {
    fn from(error: reqwest::Error) -> Self {
        SuggestError::Reqwest(Box::new(error))
    }
}
