//! ---
//! edc_section: "05-backend-api"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Error taxonomy for backend requests."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid backend base URL {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{endpoint} answered HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },
    #[error("{endpoint} returned a malformed payload: {reason}")]
    MalformedPayload {
        endpoint: &'static str,
        reason: String,
    },
}
