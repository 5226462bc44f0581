//! Outbound email notifications for collect and donation events.

mod queue;
pub mod templates;

use serde::{Deserialize, Serialize};

pub use queue::QueuedNotifier;

/// Event a message was rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CollectCreated,
    DonationReceipt,
    DonationReceived,
    GoalReached,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationKind::CollectCreated => "collect_created",
            NotificationKind::DonationReceipt => "donation_receipt",
            NotificationKind::DonationReceived => "donation_received",
            NotificationKind::GoalReached => "goal_reached",
        }
    }
}

/// Rendered email ready for a mail transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub kind: NotificationKind,
    pub from: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail hook (SMTP relay, provider API, log sink).
pub trait Notifier: Send + Sync {
    fn deliver(&self, message: EmailMessage) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("notification queue closed")]
    QueueClosed,
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn deliver(&self, message: EmailMessage) -> Result<(), NotifyError> {
        (**self).deliver(message)
    }
}
