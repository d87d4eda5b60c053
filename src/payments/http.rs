//! HTTP payment processor
//!
//! Intents are created server-side through the edge functions. Confirmation and
//! retrieval use the processor's client-secret endpoints with the publishable key,
//! the same calls a browser checkout makes.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{
    ClientSecret, CreatedIntent, IntentRequest, IntentSnapshot, PaymentProcessor, ProcessorError,
};
use crate::{
    backend::{BackendError, FunctionsClient},
    config::EndpointConfig,
};

/// Payment processor backed by the edge functions and the processor's public API.
#[derive(Debug, Clone)]
pub struct StripeProcessor {
    functions: FunctionsClient,
    http: Client,
    api_url: String,
    publishable_key: String,
    payment_method: Option<String>,
    return_url: Option<String>,
}

impl StripeProcessor {
    /// Create a processor.
    pub fn new(
        functions: FunctionsClient,
        http: Client,
        api_url: impl Into<String>,
        publishable_key: impl Into<String>,
    ) -> Self {
        Self {
            functions,
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            publishable_key: publishable_key.into(),
            payment_method: None,
            return_url: None,
        }
    }

    /// Create a processor from endpoint configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn from_config(config: &EndpointConfig) -> Result<Self, ProcessorError> {
        let http = Client::builder().timeout(config.http_timeout()).build()?;

        let mut processor = Self::new(
            FunctionsClient::from_config(config)?,
            http,
            &config.stripe_api_url,
            &config.stripe_publishable_key,
        );

        processor.return_url.clone_from(&config.return_url);

        Ok(processor)
    }

    /// Use a tokenised payment method when confirming.
    #[must_use]
    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = Some(payment_method.into());
        self
    }

    fn intent_url(&self, secret: &ClientSecret) -> Result<String, ProcessorError> {
        let id = secret.intent_id().ok_or_else(|| {
            ProcessorError::InvalidResponse("client secret has no intent id".to_string())
        })?;

        Ok(format!("{}/payment_intents/{id}", self.api_url))
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    code: Option<String>,
}

async fn read_snapshot(response: Response) -> Result<IntentSnapshot, ProcessorError> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        return serde_json::from_str(&text)
            .map_err(|err| ProcessorError::InvalidResponse(err.to_string()));
    }

    match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) if status.is_client_error() => Err(ProcessorError::Declined(
            body.error
                .message
                .or(body.error.code)
                .unwrap_or_else(|| format!("request failed with status {status}")),
        )),
        _ => Err(ProcessorError::InvalidResponse(format!(
            "request failed with status {status}: {text}"
        ))),
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    async fn create_intent(&self, request: &IntentRequest) -> Result<CreatedIntent, ProcessorError> {
        self.functions
            .create_payment_intent(request)
            .await
            .map_err(|err| match err {
                BackendError::Status {
                    status: 400..=499,
                    message,
                    ..
                } => ProcessorError::Declined(message),
                err => ProcessorError::Backend(err),
            })
    }

    #[instrument(skip_all)]
    async fn confirm(&self, secret: &ClientSecret) -> Result<IntentSnapshot, ProcessorError> {
        let url = format!("{}/confirm", self.intent_url(secret)?);

        let mut form = vec![("client_secret", secret.expose())];

        if let Some(payment_method) = &self.payment_method {
            form.push(("payment_method", payment_method.as_str()));
        }

        if let Some(return_url) = &self.return_url {
            form.push(("return_url", return_url.as_str()));
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.publishable_key)
            .form(&form)
            .send()
            .await?;

        let snapshot = read_snapshot(response).await?;

        debug!(intent_id = %snapshot.id, status = %snapshot.status, "intent confirmed");

        Ok(snapshot)
    }

    #[instrument(skip_all)]
    async fn retrieve(&self, secret: &ClientSecret) -> Result<IntentSnapshot, ProcessorError> {
        let url = self.intent_url(secret)?;

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.publishable_key)
            .query(&[("client_secret", secret.expose())])
            .send()
            .await?;

        let snapshot = read_snapshot(response).await?;

        debug!(intent_id = %snapshot.id, status = %snapshot.status, "intent retrieved");

        Ok(snapshot)
    }
}
