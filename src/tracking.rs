//! Abandoned checkout tracking
//!
//! When a customer leaves after an intent was created but before paying, a
//! best-effort report is sent so the checkout can be followed up. Reporting never
//! blocks or fails the caller.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, warn};

use crate::{backend::BackendError, customer::mask_email};

/// An abandoned checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbandonedCheckout {
    /// Customer email
    pub email: String,

    /// Customer name
    pub name: String,

    /// Service label
    #[serde(rename = "service")]
    pub service_label: String,

    /// Order total in major units
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    /// Intent the checkout was abandoned with
    #[serde(rename = "paymentIntentId")]
    pub intent_id: String,
}

/// Errors raised while reporting an abandoned checkout.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Receives abandoned checkout reports.
#[automock]
#[async_trait]
pub trait AbandonmentTracker: Send + Sync {
    /// Record an abandoned checkout.
    async fn track(&self, checkout: &AbandonedCheckout) -> Result<(), TrackingError>;
}

/// Send a report on a detached task.
///
/// Returns `None` when called outside a Tokio runtime; the report is dropped.
pub fn report_abandonment(
    tracker: Arc<dyn AbandonmentTracker>,
    checkout: AbandonedCheckout,
) -> Option<JoinHandle<()>> {
    let Ok(handle) = Handle::try_current() else {
        warn!("no async runtime available, abandoned checkout not reported");

        return None;
    };

    Some(handle.spawn(async move {
        match tracker.track(&checkout).await {
            Ok(()) => debug!(
                email = %mask_email(&checkout.email),
                intent_id = %checkout.intent_id,
                "abandoned checkout reported"
            ),
            Err(err) => warn!(
                email = %mask_email(&checkout.email),
                intent_id = %checkout.intent_id,
                error = %err,
                "failed to report abandoned checkout"
            ),
        }
    }))
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn checkout() -> AbandonedCheckout {
        AbandonedCheckout {
            email: "jane@example.com".to_string(),
            name: "Jane Smith".to_string(),
            service_label: "Oven clean".to_string(),
            amount: Decimal::new(4500, 2),
            intent_id: "pi_1".to_string(),
        }
    }

    #[test]
    fn serializes_with_backend_field_names() -> TestResult {
        let json = serde_json::to_value(checkout())?;

        assert_eq!(json["service"], "Oven clean");
        assert_eq!(json["paymentIntentId"], "pi_1");
        assert_eq!(json["amount"], 45.0);

        Ok(())
    }

    #[tokio::test]
    async fn report_runs_on_detached_task() -> TestResult {
        let mut tracker = MockAbandonmentTracker::new();

        tracker
            .expect_track()
            .once()
            .withf(|checkout| checkout.intent_id == "pi_1")
            .returning(|_| Ok(()));

        let handle = report_abandonment(Arc::new(tracker), checkout()).ok_or("no runtime")?;

        handle.await?;

        Ok(())
    }

    #[tokio::test]
    async fn failures_are_swallowed() -> TestResult {
        let mut tracker = MockAbandonmentTracker::new();

        tracker.expect_track().once().returning(|_| {
            Err(TrackingError::Backend(BackendError::InvalidResponse(
                "boom".to_string(),
            )))
        });

        let handle = report_abandonment(Arc::new(tracker), checkout()).ok_or("no runtime")?;

        handle.await?;

        Ok(())
    }

    #[test]
    fn outside_runtime_is_dropped() {
        let tracker = MockAbandonmentTracker::new();

        assert!(report_abandonment(Arc::new(tracker), checkout()).is_none());
    }
}
