use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::domain::{Collect, CollectId};

pub(crate) const MAX_NAME_LENGTH: usize = 255;
const MAX_MONEY_SCALE: u32 = 2;
/// Total digits allowed in a stored amount, decimal places included.
const MAX_MONEY_DIGITS: u32 = 12;

/// Rejected input, tagged with the payload field that caused it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("end date must be in the future")]
    EndDateNotInFuture,
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("target amount must be positive or empty")]
    NonPositiveTarget,
    #[error("payment exceeds the target amount; remaining to collect: {remaining}")]
    ExceedsTarget { remaining: Decimal },
    #[error("cannot donate to a finished collect")]
    CollectClosed,
    #[error("collect {0} does not exist")]
    UnknownCollect(CollectId),
    #[error("ensure that there are no more than 2 decimal places")]
    TooManyDecimalPlaces { field: &'static str },
    #[error("ensure that there are no more than {max_digits} digits in total")]
    TooManyDigits {
        field: &'static str,
        max_digits: u32,
    },
    #[error("payment would take the collected total past the largest storable amount")]
    TotalOverflow,
    #[error("this field may not be blank")]
    Blank { field: &'static str },
    #[error("ensure this field has no more than {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("enter a valid email address")]
    InvalidEmail,
}

impl ValidationError {
    /// Payload field the error is reported against.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EndDateNotInFuture => "end_datetime",
            ValidationError::NonPositiveAmount
            | ValidationError::ExceedsTarget { .. }
            | ValidationError::TotalOverflow => "amount",
            ValidationError::NonPositiveTarget => "target_amount",
            ValidationError::CollectClosed | ValidationError::UnknownCollect(_) => "collect",
            ValidationError::TooManyDecimalPlaces { field }
            | ValidationError::TooManyDigits { field, .. }
            | ValidationError::Blank { field }
            | ValidationError::TooLong { field, .. } => *field,
            ValidationError::InvalidEmail => "email",
        }
    }
}

pub fn validate_future_date(
    value: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if value <= now {
        return Err(ValidationError::EndDateNotInFuture);
    }
    Ok(())
}

pub fn validate_positive_amount(value: Decimal) -> Result<(), ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount);
    }
    Ok(())
}

pub fn validate_target_amount(value: Option<Decimal>) -> Result<(), ValidationError> {
    match value {
        Some(target) if target <= Decimal::ZERO => Err(ValidationError::NonPositiveTarget),
        _ => Ok(()),
    }
}

/// A donation may fill a targeted collect up to, but never beyond, its target. Untargeted
/// collects are capped by the largest storable amount.
pub fn validate_payment_amount(collect: &Collect, amount: Decimal) -> Result<(), ValidationError> {
    let total = collect
        .current_amount
        .checked_add(amount)
        .filter(|total| *total < money_bound())
        .ok_or(ValidationError::TotalOverflow)?;
    if let Some(target) = collect.target_amount {
        if total > target {
            return Err(ValidationError::ExceedsTarget {
                remaining: collect.remaining().unwrap_or(Decimal::ZERO),
            });
        }
    }
    Ok(())
}

pub fn validate_collect_active(
    collect: &Collect,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if !collect.is_active(now) {
        return Err(ValidationError::CollectClosed);
    }
    Ok(())
}

/// Amounts carry at most two decimal places and twelve digits overall, so every
/// accepted value fits `NUMERIC(12, 2)`.
pub fn validate_money_scale(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    let normalized = value.normalize();
    if normalized.scale() > MAX_MONEY_SCALE {
        return Err(ValidationError::TooManyDecimalPlaces { field });
    }
    if normalized.abs() >= money_bound() {
        return Err(ValidationError::TooManyDigits {
            field,
            max_digits: MAX_MONEY_DIGITS,
        });
    }
    Ok(())
}

/// Smallest amount that no longer fits the money column.
fn money_bound() -> Decimal {
    Decimal::from(10_i64.pow(MAX_MONEY_DIGITS - MAX_MONEY_SCALE))
}

pub fn validate_required(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}
