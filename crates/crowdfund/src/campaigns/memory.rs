use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{Collect, CollectId, Payment, PaymentId, User, UserId};
use super::repository::{CampaignRepository, RepositoryError};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    collects: BTreeMap<CollectId, Collect>,
    payments: BTreeMap<PaymentId, Payment>,
}

/// Process-local repository backed by ordered maps.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCampaignRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryCampaignRepository {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

fn newest_payments_first<'a>(payments: impl Iterator<Item = &'a Payment>) -> Vec<Payment> {
    let mut payments: Vec<Payment> = payments.cloned().collect();
    payments.sort_by(|a, b| {
        b.date_added
            .cmp(&a.date_added)
            .then_with(|| b.id.cmp(&a.id))
    });
    payments
}

impl CampaignRepository for InMemoryCampaignRepository {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut tables = self.tables()?;
        let taken = tables.users.contains_key(&user.id)
            || tables
                .users
                .values()
                .any(|existing| existing.username == user.username);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables()?.users.get(&id).cloned())
    }

    fn insert_collect(&self, collect: Collect) -> Result<Collect, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.collects.contains_key(&collect.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.collects.insert(collect.id, collect.clone());
        Ok(collect)
    }

    fn update_collect(&self, collect: Collect) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.collects.get_mut(&collect.id) {
            Some(slot) => {
                *slot = collect;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_collect(&self, id: CollectId) -> Result<Option<Collect>, RepositoryError> {
        Ok(self.tables()?.collects.get(&id).cloned())
    }

    fn list_collects(&self) -> Result<Vec<Collect>, RepositoryError> {
        let tables = self.tables()?;
        let mut collects: Vec<Collect> = tables.collects.values().cloned().collect();
        collects.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(collects)
    }

    fn delete_collect(&self, id: CollectId) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        if tables.collects.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        tables.payments.retain(|_, payment| payment.collect_id != id);
        Ok(())
    }

    fn insert_payment(&self, payment: Payment) -> Result<Payment, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.payments.contains_key(&payment.id) {
            return Err(RepositoryError::Conflict);
        }
        if !tables.collects.contains_key(&payment.collect_id) {
            return Err(RepositoryError::NotFound);
        }
        tables.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    fn fetch_payment(&self, id: PaymentId) -> Result<Option<Payment>, RepositoryError> {
        Ok(self.tables()?.payments.get(&id).cloned())
    }

    fn delete_payment(&self, id: PaymentId) -> Result<(), RepositoryError> {
        match self.tables()?.payments.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound),
        }
    }

    fn payments_for(&self, collect: CollectId) -> Result<Vec<Payment>, RepositoryError> {
        let tables = self.tables()?;
        Ok(newest_payments_first(
            tables
                .payments
                .values()
                .filter(|payment| payment.collect_id == collect),
        ))
    }

    fn list_payments(&self) -> Result<Vec<Payment>, RepositoryError> {
        let tables = self.tables()?;
        Ok(newest_payments_first(tables.payments.values()))
    }
}
