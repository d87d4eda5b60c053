//! Utils

use clap::{Parser, ValueEnum};

use crate::subscription::SubscriptionStatus;

/// Membership status to assume for a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QuoteStatus {
    /// Email not checked
    Unknown,

    /// Existing member
    Member,

    /// Checked, not a member
    Guest,
}

impl From<QuoteStatus> for SubscriptionStatus {
    fn from(status: QuoteStatus) -> Self {
        match status {
            QuoteStatus::Unknown => SubscriptionStatus::Unknown,
            QuoteStatus::Member => SubscriptionStatus::Active,
            QuoteStatus::Guest => SubscriptionStatus::Inactive,
        }
    }
}

/// Arguments for the quote example
#[derive(Debug, Parser)]
pub struct QuoteArgs {
    /// Fixture set to use for the cart and pricing
    #[clap(short, long, default_value = "oven-clean")]
    pub fixture: String,

    /// Hours to book, for hourly services
    #[clap(short = 'H', long)]
    pub hours: Option<u32>,

    /// Membership status of the customer
    #[clap(short, long, value_enum, default_value_t = QuoteStatus::Unknown)]
    pub status: QuoteStatus,

    /// Opt into the membership add-on
    #[clap(short, long)]
    pub addon: bool,
}
