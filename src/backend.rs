//! Edge function client
//!
//! The checkout backend exposes a handful of JSON functions. [`FunctionsClient`]
//! calls them and implements the collaborator traits on top.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    config::EndpointConfig,
    payments::{CreatedIntent, IntentRequest},
    subscription::{LookupError, SubscriptionLookup},
    tracking::{AbandonedCheckout, AbandonmentTracker, TrackingError},
};

const CREATE_PAYMENT_INTENT: &str = "create-payment-intent";

const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

/// Errors that can occur when calling an edge function.
#[derive(Debug, Error)]
pub enum BackendError {
    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The function answered with a non-success status.
    #[error("{function} failed with status {status}: {message}")]
    Status {
        /// Function name
        function: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body or error message
        message: String,
    },

    /// The response body could not be understood.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// HTTP client for the checkout edge functions.
#[derive(Debug, Clone)]
pub struct FunctionsClient {
    http: Client,
    base_url: String,
    anon_key: String,
}

impl FunctionsClient {
    /// Create a client for the functions at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        })
    }

    /// Create a client from endpoint configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &EndpointConfig) -> Result<Self, BackendError> {
        Self::new(
            &config.functions_url,
            &config.functions_anon_key,
            config.http_timeout(),
        )
    }

    /// POST a JSON body to a function and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an error on HTTP failure, a non-success status or an undecodable body.
    pub async fn invoke<B, T>(&self, function: &'static str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        Self::send(function, self.post(function, body)).await
    }

    /// Create a payment intent through the `create-payment-intent` function.
    ///
    /// The request's idempotency key is sent as the `Idempotency-Key` header.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self, request), fields(amount = request.amount))]
    pub async fn create_payment_intent(
        &self,
        request: &IntentRequest,
    ) -> Result<CreatedIntent, BackendError> {
        let created: CreatedIntent =
            Self::send(CREATE_PAYMENT_INTENT, self.create_intent_request(request)).await?;

        debug!(intent_id = %created.id, "payment intent created by backend");

        Ok(created)
    }

    fn create_intent_request(&self, request: &IntentRequest) -> RequestBuilder {
        self.post(CREATE_PAYMENT_INTENT, request)
            .header(IDEMPOTENCY_KEY, request.idempotency_key.to_string())
    }

    fn post<B>(&self, function: &'static str, body: &B) -> RequestBuilder
    where
        B: Serialize + ?Sized,
    {
        self.http
            .post(format!("{}/{function}", self.base_url))
            .bearer_auth(&self.anon_key)
            .header("apikey", &self.anon_key)
            .json(body)
    }

    async fn send<T>(function: &'static str, request: RequestBuilder) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            return Err(BackendError::Status {
                function,
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let text = response.text().await?;

        serde_json::from_str(&text).map_err(|err| BackendError::InvalidResponse(err.to_string()))
    }
}

/// Pull `error` out of a JSON error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    serde_json::from_str::<ErrorBody>(body).map_or_else(|_| body.to_string(), |parsed| parsed.error)
}

/// A flag that may arrive as a JSON bool or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Truthy {
    Bool(bool),
    Text(String),
}

impl Truthy {
    fn is_true(&self) -> bool {
        match self {
            Truthy::Bool(value) => *value,
            Truthy::Text(text) => text.trim().eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    #[serde(alias = "active")]
    has_subscription: Option<Truthy>,
}

#[derive(Debug, Serialize)]
struct SubscriptionRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct TrackRequest<'a> {
    action: &'static str,
    #[serde(flatten)]
    checkout: &'a AbandonedCheckout,
}

#[async_trait]
impl SubscriptionLookup for FunctionsClient {
    #[instrument(skip_all)]
    async fn check_status(&self, email: &str) -> Result<bool, LookupError> {
        let response: SubscriptionResponse = self
            .invoke("check-subscription", &SubscriptionRequest { email })
            .await?;

        Ok(response
            .has_subscription
            .as_ref()
            .is_some_and(Truthy::is_true))
    }
}

#[async_trait]
impl AbandonmentTracker for FunctionsClient {
    #[instrument(skip_all, fields(intent_id = %checkout.intent_id))]
    async fn track(&self, checkout: &AbandonedCheckout) -> Result<(), TrackingError> {
        let _: serde_json::Value = self
            .invoke(
                "track-checkout",
                &TrackRequest {
                    action: "abandon",
                    checkout,
                },
            )
            .await?;

        Ok(())
    }
}
