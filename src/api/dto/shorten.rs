//! DTOs for the link shortening endpoint.

use serde::{Deserialize, Serialize};

/// Form-encoded request to shorten a URL.
///
/// `long_url` is optional at the deserialization level so a missing field
/// produces the endpoint's own 400 response instead of a framework
/// rejection.
#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub long_url: Option<String>,
}

/// Response for a shortening request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_url: Option<String>,
}

impl ShortenResponse {
    /// A successful response carrying the public short URL.
    pub fn created(short_url: String) -> Self {
        Self {
            success: true,
            message: None,
            short_url: Some(short_url),
        }
    }
}
