use super::payment::PaymentCategory;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Business constants applied when a payment is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentPolicy {
    /// Largest amount a single payment may carry (inclusive).
    pub max_amount: Decimal,
}

impl PaymentPolicy {
    pub const DEFAULT_MAX_AMOUNT: Decimal = Decimal::ONE_HUNDRED;
}

impl Default for PaymentPolicy {
    fn default() -> Self {
        Self {
            max_amount: Self::DEFAULT_MAX_AMOUNT,
        }
    }
}

/// Raw creation request. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreatePayment {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<PaymentCategory>,
    pub amount: Option<Decimal>,
    pub user_dni: Option<String>,
}

/// A creation request that passed [`PaymentValidator::validate_creation`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPayment {
    pub title: String,
    pub description: String,
    pub category: PaymentCategory,
    pub amount: Decimal,
    pub user_dni: String,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentValidator {
    policy: PaymentPolicy,
}

impl PaymentValidator {
    pub fn new(policy: PaymentPolicy) -> Self {
        Self { policy }
    }

    /// Checks a creation request against the payment invariants.
    ///
    /// The amount is checked first, so an out-of-range amount is reported
    /// even when other fields are also missing.
    pub fn validate_creation(&self, request: &CreatePayment) -> Result<ValidPayment> {
        let amount = request.amount.ok_or_else(|| missing("amount"))?;
        if amount <= Decimal::ZERO {
            return Err(PaymentError::BusinessRuleViolation(
                "amount must be greater than zero".to_string(),
            ));
        }
        if amount > self.policy.max_amount {
            return Err(PaymentError::BusinessRuleViolation(format!(
                "amount greater than {} is not valid",
                self.policy.max_amount.normalize()
            )));
        }

        let category = request.category.ok_or_else(|| missing("category"))?;
        let title = required(&request.title, "title")?;
        let description = required(&request.description, "description")?;
        let user_dni = required(&request.user_dni, "user dni")?;

        Ok(ValidPayment {
            title,
            description,
            category,
            amount,
            user_dni,
        })
    }
}

fn missing(field: &str) -> PaymentError {
    PaymentError::InvalidArgument(format!("{field} must not be null"))
}

/// Blank text counts as absent.
fn required(value: &Option<String>, field: &str) -> Result<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text.clone()),
        _ => Err(missing(field)),
    }
}
