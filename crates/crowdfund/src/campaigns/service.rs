use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::config::CampaignConfig;

use super::domain::{
    donors_count, money, Collect, CollectDraft, CollectId, Payment, PaymentDraft, PaymentId,
    User, UserId, UserRegistration,
};
use super::notifications::{templates, EmailMessage, Notifier};
use super::repository::{CampaignRepository, RepositoryError};
use super::validation::{
    validate_collect_active, validate_email, validate_future_date, validate_money_scale,
    validate_payment_amount, validate_positive_amount, validate_required, validate_target_amount,
    ValidationError, MAX_NAME_LENGTH,
};

const MAX_USERNAME_LENGTH: usize = 150;

/// A collect together with its donations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectDetails {
    pub collect: Collect,
    pub payments: Vec<Payment>,
    pub donors_count: usize,
}

/// One page of a listing; pages are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub number: usize,
    pub size: usize,
    pub count: usize,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number * self.size < self.count
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

/// Service composing the repository, validation predicates and notification templates.
///
/// Every change to a running total happens while the ledger lock is held, so the
/// read-modify-write of `current_amount` never interleaves with another donation.
pub struct CampaignService<R, N: ?Sized> {
    repository: Arc<R>,
    notifier: Arc<N>,
    settings: CampaignConfig,
    ledger: Mutex<()>,
    user_sequence: AtomicU64,
    collect_sequence: AtomicU64,
    payment_sequence: AtomicU64,
}

impl<R, N> CampaignService<R, N>
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, settings: CampaignConfig) -> Self {
        Self {
            repository,
            notifier,
            settings,
            ledger: Mutex::new(()),
            user_sequence: AtomicU64::new(1),
            collect_sequence: AtomicU64::new(1),
            payment_sequence: AtomicU64::new(1),
        }
    }

    pub fn settings(&self) -> &CampaignConfig {
        &self.settings
    }

    /// Create an account; usernames are unique.
    pub fn register_user(
        &self,
        registration: UserRegistration,
    ) -> Result<User, CampaignServiceError> {
        validate_required("username", &registration.username, MAX_USERNAME_LENGTH)?;
        validate_email(&registration.email)?;

        let user = User {
            id: UserId(self.user_sequence.fetch_add(1, Ordering::Relaxed)),
            username: registration.username.trim().to_string(),
            email: registration.email.trim().to_string(),
        };
        let stored = self.repository.insert_user(user)?;
        info!(user_id = %stored.id, username = %stored.username, "user registered");
        Ok(stored)
    }

    /// Open a new collect with an empty running total.
    pub fn create_collect(
        &self,
        author: UserId,
        draft: CollectDraft,
        now: DateTime<Utc>,
    ) -> Result<Collect, CampaignServiceError> {
        let author = self.resolve_user(author)?;

        validate_required("name", &draft.name, MAX_NAME_LENGTH)?;
        validate_future_date(draft.end_datetime, now)?;
        validate_target_amount(draft.target_amount)?;
        if let Some(target) = draft.target_amount {
            validate_money_scale("target_amount", target)?;
        }

        let collect = Collect {
            id: CollectId(self.collect_sequence.fetch_add(1, Ordering::Relaxed)),
            author,
            name: draft.name.trim().to_string(),
            occasion: draft.occasion,
            description: draft.description,
            target_amount: draft.target_amount.map(money),
            current_amount: money(Decimal::ZERO),
            end_datetime: draft.end_datetime,
            created_at: now,
            updated_at: now,
            goal_notified: false,
        };

        let stored = self.repository.insert_collect(collect)?;
        info!(collect_id = %stored.id, author = %stored.author.id, "collect created");
        self.notify(templates::collect_created(&self.settings, &stored));
        Ok(stored)
    }

    pub fn get_collect(&self, id: CollectId) -> Result<CollectDetails, CampaignServiceError> {
        let collect = self
            .repository
            .fetch_collect(id)?
            .ok_or(CampaignServiceError::CollectNotFound(id))?;
        self.details(collect)
    }

    pub fn list_collects(
        &self,
        page: usize,
    ) -> Result<Page<CollectDetails>, CampaignServiceError> {
        let size = self.settings.page_size.max(1);
        let collects = self.repository.list_collects()?;
        let count = collects.len();

        let last_page = count.div_ceil(size).max(1);
        if page == 0 || page > last_page {
            return Err(CampaignServiceError::PageOutOfRange(page));
        }

        let results = collects
            .into_iter()
            .skip((page - 1) * size)
            .take(size)
            .map(|collect| self.details(collect))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            number: page,
            size,
            count,
            results,
        })
    }

    /// Remove a collect and its donations. Only the author may do so.
    pub fn delete_collect(
        &self,
        actor: UserId,
        id: CollectId,
    ) -> Result<(), CampaignServiceError> {
        let _ledger = self.ledger()?;
        let collect = self
            .repository
            .fetch_collect(id)?
            .ok_or(CampaignServiceError::CollectNotFound(id))?;
        if collect.author.id != actor {
            return Err(CampaignServiceError::Forbidden {
                actor,
                resource: format!("collect {id}"),
            });
        }

        self.repository.delete_collect(id)?;
        info!(collect_id = %id, "collect deleted");
        Ok(())
    }

    /// Accept a donation and add it to the collect's running total.
    ///
    /// Checks run in order: positive amount, at most two decimal places and twelve
    /// digits, known collect, collect still active, target (or storable total) not
    /// exceeded. The goal-reached email goes out only
    /// for the donation that moves the total onto or past the target, and only once per
    /// collect.
    pub fn make_payment(
        &self,
        donator: UserId,
        draft: PaymentDraft,
        now: DateTime<Utc>,
    ) -> Result<Payment, CampaignServiceError> {
        let donator = self.resolve_user(donator)?;

        validate_positive_amount(draft.amount)?;
        validate_money_scale("amount", draft.amount)?;
        let amount = money(draft.amount);
        let comment = draft
            .comment
            .map(|comment| comment.trim().to_string())
            .filter(|comment| !comment.is_empty());

        let (payment, collect, goal_crossed) = {
            let _ledger = self.ledger()?;

            let mut collect = self
                .repository
                .fetch_collect(draft.collect)?
                .ok_or(ValidationError::UnknownCollect(draft.collect))?;
            validate_collect_active(&collect, now)?;
            validate_payment_amount(&collect, amount)?;
            let previous = collect.current_amount;
            let total = previous
                .checked_add(amount)
                .ok_or(ValidationError::TotalOverflow)?;

            let payment = self.repository.insert_payment(Payment {
                id: PaymentId(self.payment_sequence.fetch_add(1, Ordering::Relaxed)),
                collect_id: collect.id,
                donator,
                amount,
                comment,
                date_added: now,
            })?;

            collect.current_amount = money(total);
            collect.updated_at = now;
            let goal_crossed = collect.crossed_goal_from(previous) && !collect.goal_notified;
            if goal_crossed {
                collect.goal_notified = true;
            }

            if let Err(err) = self.repository.update_collect(collect.clone()) {
                if let Err(rollback) = self.repository.delete_payment(payment.id) {
                    error!(
                        payment_id = %payment.id,
                        error = %rollback,
                        "failed to roll back payment after total update failure"
                    );
                }
                return Err(err.into());
            }

            (payment, collect, goal_crossed)
        };

        info!(
            payment_id = %payment.id,
            collect_id = %collect.id,
            amount = %payment.amount,
            total = %collect.current_amount,
            "payment accepted"
        );

        self.notify(templates::donation_receipt(&self.settings, &collect, &payment));
        if let Some(message) = templates::donation_received(&self.settings, &collect, &payment) {
            self.notify(message);
        }
        if goal_crossed {
            info!(collect_id = %collect.id, "collect reached its target");
            let donors = match self.repository.payments_for(collect.id) {
                Ok(payments) => donors_count(&payments),
                Err(err) => {
                    warn!(collect_id = %collect.id, error = %err, "could not count donors");
                    0
                }
            };
            self.notify(templates::goal_reached(&self.settings, &collect, donors));
        }

        Ok(payment)
    }

    /// Withdraw a donation and subtract it from the running total. Only the donator may
    /// do so.
    pub fn delete_payment(
        &self,
        actor: UserId,
        id: PaymentId,
        now: DateTime<Utc>,
    ) -> Result<(), CampaignServiceError> {
        let _ledger = self.ledger()?;

        let payment = self
            .repository
            .fetch_payment(id)?
            .ok_or(CampaignServiceError::PaymentNotFound(id))?;
        if payment.donator.id != actor {
            return Err(CampaignServiceError::Forbidden {
                actor,
                resource: format!("payment {id}"),
            });
        }
        let mut collect = self
            .repository
            .fetch_collect(payment.collect_id)?
            .ok_or(CampaignServiceError::CollectNotFound(payment.collect_id))?;

        self.repository.delete_payment(id)?;

        let mut total = collect.current_amount - payment.amount;
        if total < Decimal::ZERO {
            warn!(collect_id = %collect.id, total = %total, "running total went negative, clamping");
            total = Decimal::ZERO;
        }
        collect.current_amount = money(total);
        collect.updated_at = now;

        if let Err(err) = self.repository.update_collect(collect) {
            if let Err(restore) = self.repository.insert_payment(payment) {
                error!(
                    payment_id = %id,
                    error = %restore,
                    "failed to restore payment after total update failure"
                );
            }
            return Err(err.into());
        }

        info!(payment_id = %id, "payment withdrawn");
        Ok(())
    }

    pub fn payments_for_collect(
        &self,
        id: CollectId,
    ) -> Result<Vec<Payment>, CampaignServiceError> {
        if self.repository.fetch_collect(id)?.is_none() {
            return Err(CampaignServiceError::CollectNotFound(id));
        }
        Ok(self.repository.payments_for(id)?)
    }

    pub fn list_payments(&self) -> Result<Vec<Payment>, CampaignServiceError> {
        Ok(self.repository.list_payments()?)
    }

    fn details(&self, collect: Collect) -> Result<CollectDetails, CampaignServiceError> {
        let payments = self.repository.payments_for(collect.id)?;
        let donors_count = donors_count(&payments);
        Ok(CollectDetails {
            collect,
            payments,
            donors_count,
        })
    }

    fn resolve_user(&self, id: UserId) -> Result<User, CampaignServiceError> {
        self.repository
            .fetch_user(id)?
            .ok_or(CampaignServiceError::UnknownUser(id))
    }

    fn ledger(&self) -> Result<MutexGuard<'_, ()>, RepositoryError> {
        self.ledger
            .lock()
            .map_err(|_| RepositoryError::Unavailable("ledger lock poisoned".to_string()))
    }

    fn notify(&self, message: EmailMessage) {
        let kind = message.kind.label();
        if let Err(err) = self.notifier.deliver(message) {
            warn!(kind, error = %err, "notification dispatch failed");
        }
    }
}

/// Error raised by the campaign service.
#[derive(Debug, thiserror::Error)]
pub enum CampaignServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error("collect {0} not found")]
    CollectNotFound(CollectId),
    #[error("payment {0} not found")]
    PaymentNotFound(PaymentId),
    #[error("user {actor} may not modify {resource}")]
    Forbidden { actor: UserId, resource: String },
    #[error("invalid page {0}")]
    PageOutOfRange(usize),
}
