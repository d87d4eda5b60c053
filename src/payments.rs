//! Payments
//!
//! Types shared between the payment lifecycle and the processor implementations.

use std::{collections::BTreeMap, fmt};

use async_trait::async_trait;
use jiff::civil::Date;
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{backend::BackendError, booking::TimeSlot};

pub mod http;
pub mod lifecycle;
pub mod state;

pub use lifecycle::{CreateTicket, PaymentLifecycle};
pub use state::{PaymentIntentState, VerificationOutcome};

/// Status reported by the processor for a payment intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    /// Payment completed.
    Succeeded,
    /// Further customer action (e.g. 3-D Secure) is required.
    RequiresAction,
    /// The processor is still working on it.
    Processing,
    /// The payment method failed; another must be supplied.
    RequiresPaymentMethod,
    /// The intent awaits confirmation.
    RequiresConfirmation,
    /// Authorised, awaiting capture.
    RequiresCapture,
    /// The intent was canceled.
    Canceled,
    /// A status this crate does not know.
    #[serde(other)]
    Unknown,
}

impl IntentStatus {
    /// Statuses that may still turn into a success without customer input.
    pub fn is_pending(self) -> bool {
        matches!(self, IntentStatus::RequiresAction | IntentStatus::Processing)
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IntentStatus::Succeeded => "succeeded",
            IntentStatus::RequiresAction => "requires_action",
            IntentStatus::Processing => "processing",
            IntentStatus::RequiresPaymentMethod => "requires_payment_method",
            IntentStatus::RequiresConfirmation => "requires_confirmation",
            IntentStatus::RequiresCapture => "requires_capture",
            IntentStatus::Canceled => "canceled",
            IntentStatus::Unknown => "unknown",
        })
    }
}

/// Secret used by the client to confirm and retrieve an intent.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(String);

impl ClientSecret {
    /// Wrap a client secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// The intent id embedded in the secret (`pi_123_secret_abc` → `pi_123`).
    pub fn intent_id(&self) -> Option<&str> {
        self.0.split_once("_secret_").map(|(id, _)| id)
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClientSecret").field(&"<redacted>").finish()
    }
}

/// Booking details stored alongside the intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookingData {
    /// Customer's full name
    pub customer_name: String,
    /// Normalized email
    pub customer_email: String,
    /// Phone number
    pub customer_phone: String,
    /// Address line 1
    pub address_line1: Option<String>,
    /// Address line 2
    pub address_line2: Option<String>,
    /// Town or city
    pub city: Option<String>,
    /// Postcode
    pub postcode: String,
    /// Service label
    pub service_name: String,
    /// Service category
    pub service_category: Option<String>,
    /// Description of the job
    pub job_description: Option<String>,
    /// Dates offered
    pub scheduled_dates: Vec<Date>,
    /// Arrival slots offered
    pub scheduled_time_slots: Vec<TimeSlot>,
}

/// Request to create a payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentRequest {
    /// Amount in minor units
    pub amount: i64,

    /// Lower-case ISO currency code
    pub currency: String,

    /// Normalized customer email
    pub customer_email: String,

    /// Free-form metadata attached to the intent
    pub metadata: BTreeMap<String, String>,

    /// Booking saved with the intent
    pub booking_data: BookingData,

    /// Sent as the `Idempotency-Key` header, not in the body
    #[serde(skip)]
    pub idempotency_key: Uuid,
}

/// Response to an intent creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedIntent {
    /// Intent id
    pub id: String,

    /// Client secret
    #[serde(rename = "clientSecret")]
    pub client_secret: ClientSecret,
}

/// The processor's view of an intent at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IntentSnapshot {
    /// Intent id
    pub id: String,

    /// Status
    pub status: IntentStatus,
}

/// A payment intent this session has created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// Intent id
    pub id: String,

    /// Client secret
    pub client_secret: ClientSecret,

    /// Amount, in minor units, the intent was created for
    pub amount_minor: i64,
}

/// Errors reported by a payment processor.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// An edge function call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// An HTTP transport error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The processor declined the request.
    #[error("{0}")]
    Declined(String),

    /// The processor returned something unexpected.
    #[error("unexpected processor response: {0}")]
    InvalidResponse(String),
}

/// Errors raised by the payment lifecycle.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The form is not complete.
    #[error("please complete all required fields before paying")]
    FormIncomplete,

    /// A creation is already in flight.
    #[error("a payment is already being prepared")]
    CreationInFlight,

    /// An intent already exists for this session.
    #[error("a payment has already been prepared")]
    IntentExists,

    /// The amount is zero or negative.
    #[error("amount must be greater than 0")]
    InvalidAmount,

    /// The amount is above the allowed maximum.
    #[error("amount exceeds maximum allowed")]
    AmountTooLarge,

    /// The membership add-on needs a valid email.
    #[error("a valid email is required to join the membership")]
    InvalidMembershipEmail,

    /// No intent exists to confirm.
    #[error("no payment has been prepared")]
    NoIntent,

    /// The intent is being confirmed and cannot change.
    #[error("payment is in progress")]
    Locked,

    /// The intent was created for a different total.
    #[error("the order total changed; the payment has been reset")]
    StaleAmount,

    /// The processor failed.
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

/// A payment processor reached through client-side credentials.
#[automock]
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create an intent for the requested amount.
    async fn create_intent(&self, request: &IntentRequest) -> Result<CreatedIntent, ProcessorError>;

    /// Confirm an intent.
    async fn confirm(&self, secret: &ClientSecret) -> Result<IntentSnapshot, ProcessorError>;

    /// Fetch the current state of an intent.
    async fn retrieve(&self, secret: &ClientSecret) -> Result<IntentSnapshot, ProcessorError>;
}
