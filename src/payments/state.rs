//! Payment intent state

use super::{IntentStatus, PaymentIntent};

/// Where the payment for this session stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PaymentIntentState {
    /// No intent exists.
    #[default]
    None,

    /// An intent creation is in flight.
    Creating {
        /// Generation the creation was started in
        generation: u64,

        /// Amount, in minor units, being requested
        amount_minor: i64,
    },

    /// An intent exists and can be confirmed.
    Created {
        /// The intent
        intent: PaymentIntent,
    },

    /// The intent is being confirmed.
    Confirming {
        /// The intent
        intent: PaymentIntent,
    },

    /// Confirmation left the intent pending; waiting to re-check once.
    Polling {
        /// The intent
        intent: PaymentIntent,
    },

    /// Payment succeeded.
    Succeeded {
        /// The intent
        intent: PaymentIntent,
    },

    /// The outcome could not be established; the customer should contact support.
    NeedsSupport {
        /// The intent
        intent: PaymentIntent,

        /// Last status seen, if any
        status: Option<IntentStatus>,
    },

    /// Payment failed terminally.
    Failed {
        /// The intent
        intent: PaymentIntent,

        /// Terminal status
        status: IntentStatus,
    },
}

impl PaymentIntentState {
    /// The intent, if one exists.
    pub fn intent(&self) -> Option<&PaymentIntent> {
        match self {
            PaymentIntentState::None | PaymentIntentState::Creating { .. } => None,
            PaymentIntentState::Created { intent }
            | PaymentIntentState::Confirming { intent }
            | PaymentIntentState::Polling { intent }
            | PaymentIntentState::Succeeded { intent }
            | PaymentIntentState::NeedsSupport { intent, .. }
            | PaymentIntentState::Failed { intent, .. } => Some(intent),
        }
    }

    /// Whether the intent may still be discarded.
    pub fn is_mutable(&self) -> bool {
        matches!(
            self,
            PaymentIntentState::None
                | PaymentIntentState::Creating { .. }
                | PaymentIntentState::Created { .. }
        )
    }

    /// Whether payment succeeded.
    pub fn is_succeeded(&self) -> bool {
        matches!(self, PaymentIntentState::Succeeded { .. })
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            PaymentIntentState::None => "none",
            PaymentIntentState::Creating { .. } => "creating",
            PaymentIntentState::Created { .. } => "created",
            PaymentIntentState::Confirming { .. } => "confirming",
            PaymentIntentState::Polling { .. } => "polling",
            PaymentIntentState::Succeeded { .. } => "succeeded",
            PaymentIntentState::NeedsSupport { .. } => "needs_support",
            PaymentIntentState::Failed { .. } => "failed",
        }
    }
}

/// Result of verifying an intent after confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The processor reports success.
    Succeeded,

    /// Still pending after the single re-check.
    StillPending {
        /// Last status seen, if the re-check returned one
        last_status: Option<IntentStatus>,
    },

    /// The processor reports a non-pending, non-success status.
    Failed(IntentStatus),
}

impl VerificationOutcome {
    /// Classify a freshly retrieved status.
    pub fn classify(status: IntentStatus) -> Self {
        match status {
            IntentStatus::Succeeded => VerificationOutcome::Succeeded,
            status if status.is_pending() => VerificationOutcome::StillPending {
                last_status: Some(status),
            },
            status => VerificationOutcome::Failed(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_maps_statuses() {
        assert_eq!(
            VerificationOutcome::classify(IntentStatus::Succeeded),
            VerificationOutcome::Succeeded
        );
        assert_eq!(
            VerificationOutcome::classify(IntentStatus::Processing),
            VerificationOutcome::StillPending {
                last_status: Some(IntentStatus::Processing)
            }
        );
        assert_eq!(
            VerificationOutcome::classify(IntentStatus::Canceled),
            VerificationOutcome::Failed(IntentStatus::Canceled)
        );
    }

    #[test]
    fn only_early_states_are_mutable() {
        assert!(PaymentIntentState::None.is_mutable());
        assert!(PaymentIntentState::Creating {
            generation: 1,
            amount_minor: 100
        }.is_mutable());
        assert!(!PaymentIntentState::Succeeded {
            intent: crate::payments::PaymentIntent {
                id: "pi_1".to_string(),
                client_secret: crate::payments::ClientSecret::new("pi_1_secret_x"),
                amount_minor: 100,
            }
        }
        .is_mutable());
    }
}
