use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{CollectId, Occasion, Payment, PaymentId, User};
use super::service::{CollectDetails, Page};

/// Donation as exposed over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    pub id: PaymentId,
    pub collect: CollectId,
    pub donator: User,
    pub amount: Decimal,
    pub comment: Option<String>,
    pub date_added: DateTime<Utc>,
}

impl From<Payment> for PaymentView {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            collect: payment.collect_id,
            donator: payment.donator,
            amount: payment.amount,
            comment: payment.comment,
            date_added: payment.date_added,
        }
    }
}

/// Collect as exposed over HTTP, including derived activity and donor figures.
#[derive(Debug, Clone, Serialize)]
pub struct CollectView {
    pub id: CollectId,
    pub author: User,
    pub name: String,
    pub occasion: Occasion,
    pub description: String,
    pub target_amount: Option<Decimal>,
    pub current_amount: Decimal,
    pub end_datetime: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
    pub donors_count: usize,
    pub payments: Vec<PaymentView>,
}

impl CollectView {
    pub fn from_details(details: CollectDetails, now: DateTime<Utc>) -> Self {
        let CollectDetails {
            collect,
            payments,
            donors_count,
        } = details;
        let is_active = collect.is_active(now);

        Self {
            id: collect.id,
            author: collect.author,
            name: collect.name,
            occasion: collect.occasion,
            description: collect.description,
            target_amount: collect.target_amount,
            current_amount: collect.current_amount,
            end_datetime: collect.end_datetime,
            created_at: collect.created_at,
            updated_at: collect.updated_at,
            is_active,
            donors_count,
            payments: payments.into_iter().map(PaymentView::from).collect(),
        }
    }
}

/// Paginated envelope with links to neighbouring pages.
#[derive(Debug, Clone, Serialize)]
pub struct PageView<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageView<T> {
    pub fn from_page<S>(page: Page<S>, path: &str, map: impl FnMut(S) -> T) -> Self {
        let link = |number: usize| format!("{path}?page={number}");
        Self {
            count: page.count,
            next: page.has_next().then(|| link(page.number + 1)),
            previous: page.has_previous().then(|| link(page.number - 1)),
            results: page.results.into_iter().map(map).collect(),
        }
    }
}
