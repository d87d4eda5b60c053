//! Subscription status
//!
//! Membership is looked up per email. Every email change starts a new generation;
//! a lookup result is only committed when its ticket still matches the current
//! generation, so the last request always wins.

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    backend::BackendError,
    customer::{mask_email, validate_email},
};

/// Membership status of the entered email.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// Not looked up yet, or the email is not valid.
    #[default]
    Unknown,

    /// The email holds an active membership.
    Active,

    /// The email holds no active membership.
    Inactive,
}

/// Errors raised by a membership lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The lookup service could not be reached.
    #[error("subscription lookup unavailable: {0}")]
    Unavailable(String),
}

/// Looks up whether an email holds an active membership.
#[automock]
#[async_trait]
pub trait SubscriptionLookup: Send + Sync {
    /// Returns `true` when the email holds an active membership.
    async fn check_status(&self, email: &str) -> Result<bool, LookupError>;
}

/// Identifies one lookup; stale tickets are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    generation: u64,
    email: String,
}

impl LookupTicket {
    /// The normalized email to look up.
    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Tracks the membership status for the current email.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionResolver {
    status: SubscriptionStatus,
    generation: u64,
}

impl SubscriptionResolver {
    /// Current status.
    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    /// Record an email change.
    ///
    /// The status resets to [`SubscriptionStatus::Unknown`]. A ticket is issued only
    /// when the email is valid.
    pub fn email_changed(&mut self, email: &str) -> Option<LookupTicket> {
        self.generation = self.generation.wrapping_add(1);
        self.status = SubscriptionStatus::Unknown;

        let email = validate_email(email).ok()?;

        Some(LookupTicket {
            generation: self.generation,
            email,
        })
    }

    /// Commit a lookup result.
    ///
    /// Returns the new status, or `None` when the ticket is stale and the result was
    /// discarded. Lookup failures resolve to [`SubscriptionStatus::Inactive`].
    pub fn apply(
        &mut self,
        ticket: &LookupTicket,
        result: Result<bool, LookupError>,
    ) -> Option<SubscriptionStatus> {
        if ticket.generation != self.generation {
            debug!(email = %mask_email(&ticket.email), "discarding stale subscription lookup");

            return None;
        }

        self.status = match result {
            Ok(true) => SubscriptionStatus::Active,
            Ok(false) => SubscriptionStatus::Inactive,
            Err(err) => {
                warn!(
                    email = %mask_email(&ticket.email),
                    error = %err,
                    "subscription lookup failed, treating as inactive"
                );

                SubscriptionStatus::Inactive
            }
        };

        Some(self.status)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn invalid_email_issues_no_ticket() {
        let mut resolver = SubscriptionResolver::default();

        assert!(resolver.email_changed("not-an-email").is_none());
        assert_eq!(resolver.status(), SubscriptionStatus::Unknown);
    }

    #[test]
    fn ticket_carries_normalized_email() -> TestResult {
        let mut resolver = SubscriptionResolver::default();

        let ticket = resolver.email_changed(" Jane@Example.com ").ok_or("no ticket")?;

        assert_eq!(ticket.email(), "jane@example.com");

        Ok(())
    }

    #[test]
    fn last_request_wins() -> TestResult {
        let mut resolver = SubscriptionResolver::default();

        let first = resolver.email_changed("a@example.com").ok_or("no ticket")?;
        let second = resolver.email_changed("b@example.com").ok_or("no ticket")?;

        assert_eq!(resolver.apply(&second, Ok(false)), Some(SubscriptionStatus::Inactive));
        assert_eq!(resolver.apply(&first, Ok(true)), None);
        assert_eq!(resolver.status(), SubscriptionStatus::Inactive);

        Ok(())
    }

    #[test]
    fn change_resets_previous_result() -> TestResult {
        let mut resolver = SubscriptionResolver::default();

        let ticket = resolver.email_changed("a@example.com").ok_or("no ticket")?;
        resolver.apply(&ticket, Ok(true));

        resolver.email_changed("a@example.co");

        assert_eq!(resolver.status(), SubscriptionStatus::Unknown);

        Ok(())
    }

    #[test]
    fn failure_resolves_inactive() -> TestResult {
        let mut resolver = SubscriptionResolver::default();

        let ticket = resolver.email_changed("a@example.com").ok_or("no ticket")?;

        let status = resolver.apply(&ticket, Err(LookupError::Unavailable("timeout".into())));

        assert_eq!(status, Some(SubscriptionStatus::Inactive));

        Ok(())
    }
}
