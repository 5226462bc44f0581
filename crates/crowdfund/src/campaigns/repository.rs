use super::domain::{Collect, CollectId, Payment, PaymentId, User, UserId};

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Listings are returned newest first. Removing a collect also removes its payments.
pub trait CampaignRepository: Send + Sync {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError>;
    fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    fn insert_collect(&self, collect: Collect) -> Result<Collect, RepositoryError>;
    fn update_collect(&self, collect: Collect) -> Result<(), RepositoryError>;
    fn fetch_collect(&self, id: CollectId) -> Result<Option<Collect>, RepositoryError>;
    fn list_collects(&self) -> Result<Vec<Collect>, RepositoryError>;
    fn delete_collect(&self, id: CollectId) -> Result<(), RepositoryError>;

    fn insert_payment(&self, payment: Payment) -> Result<Payment, RepositoryError>;
    fn fetch_payment(&self, id: PaymentId) -> Result<Option<Payment>, RepositoryError>;
    fn delete_payment(&self, id: PaymentId) -> Result<(), RepositoryError>;
    fn payments_for(&self, collect: CollectId) -> Result<Vec<Payment>, RepositoryError>;
    fn list_payments(&self) -> Result<Vec<Payment>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
