use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::campaigns::domain::{
    Collect, CollectDraft, CollectId, Occasion, Payment, PaymentDraft, PaymentId, User, UserId,
    UserRegistration,
};
use crate::campaigns::notifications::{EmailMessage, NotificationKind, Notifier, NotifyError};
use crate::campaigns::repository::{CampaignRepository, RepositoryError};
use crate::campaigns::{campaign_router, CampaignService, InMemoryCampaignRepository};
use crate::config::CampaignConfig;

pub(super) type TestService = CampaignService<InMemoryCampaignRepository, MemoryMailer>;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn settings() -> CampaignConfig {
    CampaignConfig {
        from_email: "noreply@crowdfund.test".to_string(),
        public_base_url: "https://crowdfund.test".to_string(),
        page_size: 2,
    }
}

pub(super) fn build_service() -> (
    TestService,
    Arc<InMemoryCampaignRepository>,
    Arc<MemoryMailer>,
) {
    let repository = Arc::new(InMemoryCampaignRepository::default());
    let mailer = Arc::new(MemoryMailer::default());
    let service = CampaignService::new(repository.clone(), mailer.clone(), settings());
    (service, repository, mailer)
}

pub(super) fn register<R, N>(service: &CampaignService<R, N>, username: &str) -> User
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    service
        .register_user(UserRegistration {
            username: username.to_string(),
            email: format!("{username}@example.com"),
        })
        .expect("user registers")
}

pub(super) fn collect_draft(target: Option<i64>, now: DateTime<Utc>) -> CollectDraft {
    CollectDraft {
        name: "Existing collect".to_string(),
        occasion: Occasion::Birthday,
        description: "Description".to_string(),
        target_amount: target.map(Decimal::from),
        end_datetime: now + Duration::days(7),
    }
}

pub(super) fn payment_draft(collect: CollectId, amount: i64) -> PaymentDraft {
    PaymentDraft {
        collect,
        amount: Decimal::from(amount),
        comment: Some("Good luck!".to_string()),
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryMailer {
    messages: Arc<Mutex<Vec<EmailMessage>>>,
}

impl MemoryMailer {
    pub(super) fn messages(&self) -> Vec<EmailMessage> {
        self.messages.lock().expect("mailer mutex poisoned").clone()
    }

    pub(super) fn of_kind(&self, kind: NotificationKind) -> Vec<EmailMessage> {
        self.messages()
            .into_iter()
            .filter(|message| message.kind == kind)
            .collect()
    }

    pub(super) fn clear(&self) {
        self.messages.lock().expect("mailer mutex poisoned").clear();
    }
}

impl Notifier for MemoryMailer {
    fn deliver(&self, message: EmailMessage) -> Result<(), NotifyError> {
        self.messages
            .lock()
            .expect("mailer mutex poisoned")
            .push(message);
        Ok(())
    }
}

pub(super) struct FailingMailer;

impl Notifier for FailingMailer {
    fn deliver(&self, _message: EmailMessage) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}

/// Delegates to the in-memory repository but refuses to update collects.
#[derive(Default)]
pub(super) struct FrozenTotalsRepository {
    pub(super) inner: InMemoryCampaignRepository,
}

impl CampaignRepository for FrozenTotalsRepository {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        self.inner.insert_user(user)
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.inner.fetch_user(id)
    }

    fn insert_collect(&self, collect: Collect) -> Result<Collect, RepositoryError> {
        self.inner.insert_collect(collect)
    }

    fn update_collect(&self, _collect: Collect) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("collects table locked".to_string()))
    }

    fn fetch_collect(&self, id: CollectId) -> Result<Option<Collect>, RepositoryError> {
        self.inner.fetch_collect(id)
    }

    fn list_collects(&self) -> Result<Vec<Collect>, RepositoryError> {
        self.inner.list_collects()
    }

    fn delete_collect(&self, id: CollectId) -> Result<(), RepositoryError> {
        self.inner.delete_collect(id)
    }

    fn insert_payment(&self, payment: Payment) -> Result<Payment, RepositoryError> {
        self.inner.insert_payment(payment)
    }

    fn fetch_payment(&self, id: PaymentId) -> Result<Option<Payment>, RepositoryError> {
        self.inner.fetch_payment(id)
    }

    fn delete_payment(&self, id: PaymentId) -> Result<(), RepositoryError> {
        self.inner.delete_payment(id)
    }

    fn payments_for(&self, collect: CollectId) -> Result<Vec<Payment>, RepositoryError> {
        self.inner.payments_for(collect)
    }

    fn list_payments(&self) -> Result<Vec<Payment>, RepositoryError> {
        self.inner.list_payments()
    }
}

pub(super) struct UnavailableRepository;

impl CampaignRepository for UnavailableRepository {
    fn insert_user(&self, _user: User) -> Result<User, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_user(&self, _id: UserId) -> Result<Option<User>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_collect(&self, _collect: Collect) -> Result<Collect, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_collect(&self, _collect: Collect) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_collect(&self, _id: CollectId) -> Result<Option<Collect>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_collects(&self) -> Result<Vec<Collect>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_collect(&self, _id: CollectId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_payment(&self, _payment: Payment) -> Result<Payment, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_payment(&self, _id: PaymentId) -> Result<Option<Payment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_payment(&self, _id: PaymentId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn payments_for(&self, _collect: CollectId) -> Result<Vec<Payment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_payments(&self) -> Result<Vec<Payment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    campaign_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
