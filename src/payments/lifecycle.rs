//! Payment lifecycle
//!
//! Drives one session's payment intent through creation, confirmation,
//! verification and the single pending re-check.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::BackendError;

use super::{
    CreatedIntent, IntentStatus, PaymentError, PaymentIntent, PaymentProcessor, ProcessorError,
    state::{PaymentIntentState, VerificationOutcome},
};

/// Shown when the outcome of a payment cannot be established.
pub const SUPPORT_MESSAGE: &str =
    "We could not confirm your payment. Please contact support before trying again.";

/// Shown when the processor asks for another payment method.
pub const RETRY_MESSAGE: &str =
    "Your payment method was declined. Please try again with a different card.";

/// Shown when intent creation fails for a reason without a more specific message.
pub const CREATE_FAILED_MESSAGE: &str = "We could not prepare your payment. Please try again.";

const SERVICE_MISSING_MESSAGE: &str = "Payment service not available. Please contact support.";

const SERVICE_UNAVAILABLE_MESSAGE: &str =
    "Payment service is temporarily unavailable. Please try again in a moment.";

const NOT_CONFIGURED_MESSAGE: &str =
    "Payment service is not configured on the server. Please contact support.";

const TIMED_OUT_MESSAGE: &str = "Payment request timed out. Please try again.";

const NETWORK_MESSAGE: &str = "Network error. Please check your connection and try again.";

/// Identifies one intent creation; stale completions are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateTicket {
    generation: u64,
    amount_minor: i64,
}

impl CreateTicket {
    /// Amount, in minor units, the intent is being created for.
    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }
}

/// Payment state plus the messages shown to the customer.
#[derive(Debug, Clone, Default)]
pub struct PaymentLifecycle {
    state: PaymentIntentState,
    generation: u64,
    banner: Option<String>,
    inline_error: Option<String>,
}

impl PaymentLifecycle {
    /// Current state.
    pub fn state(&self) -> &PaymentIntentState {
        &self.state
    }

    /// Banner message (creation failures, support notices).
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Inline message next to the payment form (confirmation failures).
    pub fn inline_error(&self) -> Option<&str> {
        self.inline_error.as_deref()
    }

    /// Amount, in minor units, of the intent being created or already created.
    pub fn pending_amount(&self) -> Option<i64> {
        match &self.state {
            PaymentIntentState::Creating { amount_minor, .. } => Some(*amount_minor),
            state => state.intent().map(|intent| intent.amount_minor),
        }
    }

    /// Start creating an intent for `amount_minor`.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::CreationInFlight`]: another creation has not finished.
    /// - [`PaymentError::IntentExists`]: an intent already exists.
    /// - [`PaymentError::InvalidAmount`]: the amount is not positive.
    /// - [`PaymentError::AmountTooLarge`]: the amount is above `max_minor`.
    pub fn begin_create(
        &mut self,
        amount_minor: i64,
        max_minor: i64,
    ) -> Result<CreateTicket, PaymentError> {
        match self.state {
            PaymentIntentState::None => {}
            PaymentIntentState::Creating { .. } => return Err(PaymentError::CreationInFlight),
            _ => return Err(PaymentError::IntentExists),
        }

        if amount_minor <= 0 {
            return Err(PaymentError::InvalidAmount);
        }

        if amount_minor > max_minor {
            return Err(PaymentError::AmountTooLarge);
        }

        self.generation = self.generation.wrapping_add(1);
        self.state = PaymentIntentState::Creating {
            generation: self.generation,
            amount_minor,
        };
        self.banner = None;

        debug!(generation = self.generation, amount_minor, "creating payment intent");

        Ok(CreateTicket {
            generation: self.generation,
            amount_minor,
        })
    }

    /// Finish a creation started with [`Self::begin_create`].
    ///
    /// Returns the new intent, or `None` when the ticket is stale and the result was
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Processor`] when creation failed; the state returns to
    /// [`PaymentIntentState::None`] and a banner is set.
    pub fn complete_create(
        &mut self,
        ticket: CreateTicket,
        result: Result<CreatedIntent, ProcessorError>,
    ) -> Result<Option<PaymentIntent>, PaymentError> {
        let current = matches!(
            self.state,
            PaymentIntentState::Creating { generation, .. } if generation == ticket.generation
        );

        if !current {
            debug!(generation = ticket.generation, "discarding stale payment intent creation");

            return Ok(None);
        }

        match result {
            Ok(created) => {
                let intent = PaymentIntent {
                    id: created.id,
                    client_secret: created.client_secret,
                    amount_minor: ticket.amount_minor,
                };

                info!(intent_id = %intent.id, amount_minor = intent.amount_minor, "payment intent created");

                self.state = PaymentIntentState::Created {
                    intent: intent.clone(),
                };

                Ok(Some(intent))
            }
            Err(err) => {
                warn!(error = %err, "payment intent creation failed");

                self.state = PaymentIntentState::None;
                self.banner = Some(creation_failure_message(&err));

                Err(err.into())
            }
        }
    }

    /// Discard the current intent so the next creation uses the current total.
    ///
    /// Returns whether anything was discarded.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Locked`] once confirmation has started.
    pub fn invalidate(&mut self) -> Result<bool, PaymentError> {
        match self.state {
            PaymentIntentState::None => Ok(false),
            PaymentIntentState::Creating { .. } | PaymentIntentState::Created { .. } => {
                info!(state = self.state.name(), "payment intent invalidated");

                self.generation = self.generation.wrapping_add(1);
                self.state = PaymentIntentState::None;
                self.inline_error = None;

                Ok(true)
            }
            _ => Err(PaymentError::Locked),
        }
    }

    /// Move from `Created` to `Confirming`.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::NoIntent`]: no intent exists yet.
    /// - [`PaymentError::Locked`]: confirmation already started or finished.
    pub fn begin_confirm(&mut self) -> Result<PaymentIntent, PaymentError> {
        let intent = match &self.state {
            PaymentIntentState::Created { intent } => intent.clone(),
            PaymentIntentState::None | PaymentIntentState::Creating { .. } => {
                return Err(PaymentError::NoIntent);
            }
            _ => return Err(PaymentError::Locked),
        };

        self.state = PaymentIntentState::Confirming {
            intent: intent.clone(),
        };
        self.inline_error = None;

        Ok(intent)
    }

    /// Confirm the intent, then verify it independently of the confirmation result.
    ///
    /// A pending status is re-checked exactly once after `poll_delay`.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no confirmable intent, or if confirmation itself
    /// fails. In the latter case the intent is kept and the state returns to
    /// `Created` with an inline message.
    pub async fn confirm(
        &mut self,
        processor: &dyn PaymentProcessor,
        poll_delay: Duration,
    ) -> Result<VerificationOutcome, PaymentError> {
        let intent = self.begin_confirm()?;

        match processor.confirm(&intent.client_secret).await {
            Ok(snapshot) => {
                debug!(intent_id = %intent.id, status = %snapshot.status, "confirmation returned");
            }
            Err(err) => {
                warn!(intent_id = %intent.id, error = %err, "payment confirmation failed");

                self.inline_error = Some(err.to_string());
                self.state = PaymentIntentState::Created { intent };

                return Err(err.into());
            }
        }

        let outcome = self.verify(processor, &intent, poll_delay).await;

        self.finish(intent, outcome);

        Ok(outcome)
    }

    async fn verify(
        &mut self,
        processor: &dyn PaymentProcessor,
        intent: &PaymentIntent,
        poll_delay: Duration,
    ) -> VerificationOutcome {
        let first = match processor.retrieve(&intent.client_secret).await {
            Ok(snapshot) => VerificationOutcome::classify(snapshot.status),
            Err(err) => {
                warn!(intent_id = %intent.id, error = %err, "payment verification failed");

                VerificationOutcome::StillPending { last_status: None }
            }
        };

        if !matches!(first, VerificationOutcome::StillPending { .. }) {
            return first;
        }

        self.state = PaymentIntentState::Polling {
            intent: intent.clone(),
        };

        debug!(intent_id = %intent.id, delay_ms = poll_delay.as_millis(), "payment pending, re-checking once");

        tokio::time::sleep(poll_delay).await;

        match processor.retrieve(&intent.client_secret).await {
            Ok(snapshot) => VerificationOutcome::classify(snapshot.status),
            Err(err) => {
                warn!(intent_id = %intent.id, error = %err, "payment re-check failed");

                first
            }
        }
    }

    fn finish(&mut self, intent: PaymentIntent, outcome: VerificationOutcome) {
        match outcome {
            VerificationOutcome::Succeeded => {
                info!(intent_id = %intent.id, "payment succeeded");

                self.banner = None;
                self.state = PaymentIntentState::Succeeded { intent };
            }
            VerificationOutcome::StillPending { last_status } => {
                warn!(intent_id = %intent.id, ?last_status, "payment still pending after re-check");

                self.banner = Some(SUPPORT_MESSAGE.to_string());
                self.state = PaymentIntentState::NeedsSupport {
                    intent,
                    status: last_status,
                };
            }
            VerificationOutcome::Failed(IntentStatus::RequiresPaymentMethod) => {
                info!(intent_id = %intent.id, "payment method declined, intent kept for retry");

                self.inline_error = Some(RETRY_MESSAGE.to_string());
                self.state = PaymentIntentState::Created { intent };
            }
            VerificationOutcome::Failed(status) => {
                warn!(intent_id = %intent.id, %status, "payment failed");

                self.banner = Some(SUPPORT_MESSAGE.to_string());
                self.state = PaymentIntentState::Failed { intent, status };
            }
        }
    }
}

/// Banner text for a failed intent creation.
fn creation_failure_message(err: &ProcessorError) -> String {
    let message = match err {
        ProcessorError::Declined(reason) => reason.as_str(),
        ProcessorError::Backend(BackendError::Status { status: 404, .. }) => SERVICE_MISSING_MESSAGE,
        ProcessorError::Backend(BackendError::Status { status: 503, .. }) => {
            SERVICE_UNAVAILABLE_MESSAGE
        }
        ProcessorError::Backend(BackendError::Status { message, .. })
            if message.contains("not configured") || message.contains("STRIPE_SECRET_KEY") =>
        {
            NOT_CONFIGURED_MESSAGE
        }
        ProcessorError::Backend(BackendError::Status { message, .. })
            if !message.trim().is_empty() =>
        {
            message.as_str()
        }
        ProcessorError::Backend(BackendError::Http(http)) | ProcessorError::Http(http)
            if http.is_timeout() =>
        {
            TIMED_OUT_MESSAGE
        }
        ProcessorError::Backend(BackendError::Http(_)) | ProcessorError::Http(_) => NETWORK_MESSAGE,
        ProcessorError::Backend(_) | ProcessorError::InvalidResponse(_) => CREATE_FAILED_MESSAGE,
    };

    message.to_string()
}
