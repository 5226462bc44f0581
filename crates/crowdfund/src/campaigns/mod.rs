//! Collects, donations and the running-total ledger.
//!
//! Donations are validated against the state of their collect, applied to its running
//! total under a single ledger lock, and announced by email once the total is updated.

pub mod domain;
pub mod export;
pub mod memory;
pub mod notifications;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    donors_count, money, Collect, CollectDraft, CollectId, Occasion, Payment, PaymentDraft,
    PaymentId, User, UserId, UserRegistration,
};
pub use memory::InMemoryCampaignRepository;
pub use notifications::{EmailMessage, NotificationKind, Notifier, NotifyError, QueuedNotifier};
pub use repository::{CampaignRepository, RepositoryError};
pub use router::{campaign_router, USER_HEADER};
pub use service::{CampaignService, CampaignServiceError, CollectDetails, Page};
pub use validation::ValidationError;
pub use views::{CollectView, PageView, PaymentView};
