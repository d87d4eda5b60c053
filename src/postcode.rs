//! Postcode lookup
//!
//! Used to prefill the city. A failed or empty lookup never blocks a booking.

use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{config::EndpointConfig, customer::normalize_postcode};

/// A postcode resolved to its town or city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostcodeMatch {
    /// Canonical postcode
    pub postcode: String,

    /// Town or city
    pub city: String,
}

/// Errors raised by a postcode lookup.
#[derive(Debug, Error)]
pub enum PostcodeError {
    /// An HTTP transport error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an unexpected status.
    #[error("postcode lookup failed with status {0}")]
    Status(u16),
}

/// Resolves postcodes to places.
#[automock]
#[async_trait]
pub trait PostcodeLookup: Send + Sync {
    /// Look up a postcode; `None` when it does not exist.
    async fn lookup(&self, postcode: &str) -> Result<Option<PostcodeMatch>, PostcodeError>;
}

/// Client for a postcodes.io-compatible API.
#[derive(Debug, Clone)]
pub struct PostcodesIoClient {
    http: Client,
    base_url: String,
}

impl PostcodesIoClient {
    /// Create a client for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PostcodeError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PostcodeError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from endpoint configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PostcodeError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &EndpointConfig) -> Result<Self, PostcodeError> {
        Self::new(&config.postcodes_url, config.http_timeout())
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    result: Option<LookupResult>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    postcode: String,
    admin_district: Option<String>,
    post_town: Option<String>,
}

impl LookupResult {
    fn into_match(self) -> Option<PostcodeMatch> {
        let city = self.admin_district.or(self.post_town)?;

        Some(PostcodeMatch {
            postcode: self.postcode,
            city,
        })
    }
}

#[async_trait]
impl PostcodeLookup for PostcodesIoClient {
    #[instrument(skip(self))]
    async fn lookup(&self, postcode: &str) -> Result<Option<PostcodeMatch>, PostcodeError> {
        let normalized = normalize_postcode(postcode).replace(' ', "");

        if normalized.is_empty() {
            return Ok(None);
        }

        let url = format!("{}/postcodes/{normalized}", self.base_url);
        let response = self.http.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!("postcode not found");

                Ok(None)
            }
            status if status.is_success() => {
                let body: LookupResponse = response.json().await?;

                Ok(body.result.and_then(LookupResult::into_match))
            }
            status => Err(PostcodeError::Status(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn response_maps_admin_district_to_city() -> TestResult {
        let body: LookupResponse = serde_json::from_str(
            r#"{"status":200,"result":{"postcode":"SW1A 1AA","admin_district":"Westminster","region":"London"}}"#,
        )?;

        let found = body.result.and_then(LookupResult::into_match);

        assert_eq!(
            found,
            Some(PostcodeMatch {
                postcode: "SW1A 1AA".to_string(),
                city: "Westminster".to_string(),
            })
        );

        Ok(())
    }

    #[test]
    fn response_without_district_is_not_a_match() -> TestResult {
        let body: LookupResponse =
            serde_json::from_str(r#"{"status":200,"result":{"postcode":"ZZ1 1ZZ"}}"#)?;

        assert_eq!(body.result.and_then(LookupResult::into_match), None);

        Ok(())
    }

    #[tokio::test]
    async fn blank_postcode_skips_request() -> TestResult {
        let client = PostcodesIoClient::new("http://127.0.0.1:9", Duration::from_millis(10))?;

        assert_eq!(client.lookup("   ").await?, None);

        Ok(())
    }
}
