use crate::domain::payment::PaymentId;
use thiserror::Error;

/// Coarse classification of a [`PaymentError`].
///
/// Callers branch on the kind; the message is meant for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required field is missing.
    InvalidArgument,
    /// A field is present but breaks a domain policy.
    BusinessRuleViolation,
    /// The requested transition is illegal for the current state.
    StateConflict,
    /// The referenced payment (or member) does not exist.
    NotFound,
    /// Storage or I/O failure, unrelated to the domain rules.
    Infrastructure,
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    BusinessRuleViolation(String),
    #[error("{0}")]
    StateConflict(String),
    #[error("{0}")]
    NotFound(String),
    /// A versioned save lost against a concurrent writer.
    #[error("payment {0} was modified concurrently")]
    ConcurrentModification(PaymentId),
    #[error("Storage error: {0}")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            PaymentError::BusinessRuleViolation(_) => ErrorKind::BusinessRuleViolation,
            PaymentError::StateConflict(_) | PaymentError::ConcurrentModification(_) => {
                ErrorKind::StateConflict
            }
            PaymentError::NotFound(_) => ErrorKind::NotFound,
            PaymentError::Storage(_) | PaymentError::Io(_) | PaymentError::Csv(_) => {
                ErrorKind::Infrastructure
            }
            #[cfg(feature = "storage-rocksdb")]
            PaymentError::RocksDb(_) => ErrorKind::Infrastructure,
        }
    }

    pub(crate) fn payment_not_found(id: PaymentId) -> Self {
        PaymentError::NotFound(format!("no payment with id: {id} found"))
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_messages_are_verbatim() {
        let err = PaymentError::BusinessRuleViolation("amount must be greater than zero".into());
        assert_eq!(err.to_string(), "amount must be greater than zero");
        assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);
    }

    #[test]
    fn test_concurrent_modification_is_a_state_conflict() {
        let err = PaymentError::ConcurrentModification(PaymentId::new());
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn test_not_found_mentions_id() {
        let id = PaymentId::new();
        let err = PaymentError::payment_not_found(id);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_io_is_infrastructure() {
        let err: PaymentError = std::io::Error::other("disk gone").into();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }
}
