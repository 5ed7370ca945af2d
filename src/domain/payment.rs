use super::lifecycle::{IllegalTransition, PaymentEvent, PaymentState};
use super::validator::ValidPayment;
use crate::error::{PaymentError, Result};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a payment record.
///
/// Backed by a UUIDv7, so identifiers generated by one process sort by
/// creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for PaymentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown payment category: {0}")]
pub struct UnknownCategory(String);

/// Purpose of a payment. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum PaymentCategory {
    /// Yearly federation licence fee.
    Federate,
    /// Club membership fee.
    Membership,
    /// Tournament entry fee.
    Tournament,
    /// Training course fee.
    Course,
}

impl PaymentCategory {
    pub const ALL: [PaymentCategory; 4] = [
        PaymentCategory::Federate,
        PaymentCategory::Membership,
        PaymentCategory::Tournament,
        PaymentCategory::Course,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentCategory::Federate => "FEDERATE",
            PaymentCategory::Membership => "MEMBERSHIP",
            PaymentCategory::Tournament => "TOURNAMENT",
            PaymentCategory::Course => "COURSE",
        }
    }
}

impl fmt::Display for PaymentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(wanted.to_string()))
    }
}

impl TryFrom<String> for PaymentCategory {
    type Error = UnknownCategory;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Persisted state of one member payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub title: String,
    pub description: String,
    pub category: PaymentCategory,
    pub amount: Decimal,
    pub state: PaymentState,
    pub user_dni: String,
    pub created_at: NaiveDateTime,
    /// Set exactly when `state` is `PAID`.
    pub paid_at: Option<NaiveDateTime>,
    /// Optimistic concurrency token, maintained by the repository.
    /// Zero means the record was never persisted.
    #[serde(default)]
    pub version: u64,
}

impl PaymentRecord {
    /// Builds a fresh `UNPAID` record from a validated request.
    pub fn new(payment: ValidPayment, created_at: NaiveDateTime) -> Self {
        Self {
            id: PaymentId::new(),
            title: payment.title,
            description: payment.description,
            category: payment.category,
            amount: payment.amount,
            state: PaymentState::Unpaid,
            user_dni: payment.user_dni,
            created_at,
            paid_at: None,
            version: 0,
        }
    }

    /// Settles the payment. Requires an explicit settlement instant.
    pub fn mark_paid(&mut self, paid_at: Option<NaiveDateTime>) -> Result<()> {
        let paid_at = paid_at.ok_or_else(|| {
            PaymentError::InvalidArgument("payment date must not be null".to_string())
        })?;
        self.apply(PaymentEvent::MarkPaid(paid_at))
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.apply(PaymentEvent::Cancel)
    }

    /// Applies a lifecycle event, leaving the record untouched on failure.
    pub fn apply(&mut self, event: PaymentEvent) -> Result<()> {
        let next = self
            .state
            .next(&event)
            .map_err(|reason| self.conflict(reason))?;

        if let PaymentEvent::MarkPaid(at) = event {
            self.paid_at = Some(at);
        }
        self.state = next;
        Ok(())
    }

    fn conflict(&self, reason: IllegalTransition) -> PaymentError {
        let id = self.id;
        let message = match reason {
            IllegalTransition::NotUnpaid => format!("payment {id} have not UNPAID state"),
            IllegalTransition::AlreadyCancelled => format!("payment {id} is already CANCELLED"),
            IllegalTransition::AlreadyPaid => {
                format!("payment {id} is already PAID and cannot be CANCELLED")
            }
        };
        PaymentError::StateConflict(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, day)
            .and_then(|d| d.and_hms_opt(10, 20, 0))
            .unwrap()
    }

    fn record() -> PaymentRecord {
        PaymentRecord::new(
            ValidPayment {
                title: "t".to_string(),
                description: "d".to_string(),
                category: PaymentCategory::Federate,
                amount: dec!(10),
                user_dni: "X".to_string(),
            },
            at(1),
        )
    }

    #[test]
    fn test_new_record_is_unpaid() {
        let record = record();
        assert_eq!(record.state, PaymentState::Unpaid);
        assert_eq!(record.paid_at, None);
        assert_eq!(record.version, 0);
        assert_eq!(record.created_at, at(1));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(record().id, record().id);
    }

    #[test]
    fn test_mark_paid_sets_timestamp() {
        let mut record = record();
        record.mark_paid(Some(at(10))).unwrap();
        assert_eq!(record.state, PaymentState::Paid);
        assert_eq!(record.paid_at, Some(at(10)));
    }

    #[test]
    fn test_mark_paid_requires_timestamp() {
        let mut record = record();
        let err = record.mark_paid(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(record.state, PaymentState::Unpaid);
    }

    #[test]
    fn test_mark_paid_twice_keeps_first_timestamp() {
        let mut record = record();
        record.mark_paid(Some(at(10))).unwrap();

        let err = record.mark_paid(Some(at(11))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert!(err.to_string().contains("have not UNPAID state"));
        assert_eq!(record.paid_at, Some(at(10)));
    }

    #[test]
    fn test_cancel_twice() {
        let mut record = record();
        record.cancel().unwrap();
        assert_eq!(record.state, PaymentState::Cancelled);
        assert_eq!(record.paid_at, None);

        let err = record.cancel().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert!(err.to_string().contains("already CANCELLED"));
    }

    #[test]
    fn test_paid_cannot_be_cancelled() {
        let mut record = record();
        record.mark_paid(Some(at(10))).unwrap();
        let err = record.cancel().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(record.state, PaymentState::Paid);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(
            "federate".parse::<PaymentCategory>().unwrap(),
            PaymentCategory::Federate
        );
        assert_eq!(
            " MEMBERSHIP ".parse::<PaymentCategory>().unwrap(),
            PaymentCategory::Membership
        );
        assert!("donation".parse::<PaymentCategory>().is_err());
    }

    #[test]
    fn test_record_json_round_trip() {
        let mut record = record();
        record.mark_paid(Some(at(10))).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"FEDERATE\""));
        assert!(json.contains("\"PAID\""));
        let decoded: PaymentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);
    }
}
