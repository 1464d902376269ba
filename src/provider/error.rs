use thiserror::Error;

/// Errors from remote model providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Missing API credential: set GOOGLE_API_KEY or provider.api_key")]
    MissingCredential,

    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },
}

impl ProviderError {
    /// True when the service answered but the payload was unusable.
    pub fn is_malformed(&self) -> bool {
        matches!(self, ProviderError::Malformed { .. })
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
