use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Identifier wrapper for fundraising collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectId(pub u64);

/// Identifier wrapper for donations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CollectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account that authors collects and donates to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// Inbound payload for creating an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistration {
    pub username: String,
    pub email: String,
}

/// Reason a collect was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occasion {
    Birthday,
    Wedding,
    Medical,
    Charity,
    Other,
}

impl Occasion {
    pub const ALL: [Occasion; 5] = [
        Occasion::Birthday,
        Occasion::Wedding,
        Occasion::Medical,
        Occasion::Charity,
        Occasion::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Occasion::Birthday => "Birthday",
            Occasion::Wedding => "Wedding",
            Occasion::Medical => "Medical treatment",
            Occasion::Charity => "Charity",
            Occasion::Other => "Other",
        }
    }
}

/// Inbound payload for opening a collect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectDraft {
    pub name: String,
    pub occasion: Occasion,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_amount: Option<Decimal>,
    pub end_datetime: DateTime<Utc>,
}

/// A fundraising campaign with its running total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collect {
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
    /// Set once the goal-reached email has been dispatched.
    #[serde(default)]
    pub goal_notified: bool,
}

impl Collect {
    /// Collects accept donations strictly before their end time.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.end_datetime > now
    }

    pub fn remaining(&self) -> Option<Decimal> {
        self.target_amount
            .map(|target| money(target - self.current_amount))
    }

    pub fn goal_reached(&self) -> bool {
        self.target_amount
            .is_some_and(|target| self.current_amount >= target)
    }

    /// Whether moving the total from `previous` to the current amount crossed the target.
    pub fn crossed_goal_from(&self, previous: Decimal) -> bool {
        self.target_amount
            .is_some_and(|target| previous < target && self.current_amount >= target)
    }

    pub fn progress_percent(&self) -> Option<Decimal> {
        self.target_amount
            .filter(|target| !target.is_zero())
            .map(|target| (self.current_amount / target * Decimal::ONE_HUNDRED).round_dp(1))
    }
}

/// Inbound payload for a donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDraft {
    pub collect: CollectId,
    pub amount: Decimal,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A stored donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub collect_id: CollectId,
    pub donator: User,
    pub amount: Decimal,
    pub comment: Option<String>,
    pub date_added: DateTime<Utc>,
}

impl Payment {
    pub fn comment_or_default(&self) -> &str {
        match self.comment.as_deref() {
            Some(comment) if !comment.trim().is_empty() => comment,
            _ => "No comment",
        }
    }
}

/// Number of distinct users that donated.
pub fn donors_count(payments: &[Payment]) -> usize {
    payments
        .iter()
        .map(|payment| payment.donator.id)
        .collect::<BTreeSet<_>>()
        .len()
}

/// Normalize an amount to two decimal places using banker's rounding.
pub fn money(value: Decimal) -> Decimal {
    let mut normalized = value.round_dp(2);
    normalized.rescale(2);
    normalized
}
