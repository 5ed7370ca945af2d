use super::payment::{PaymentId, PaymentRecord};
use crate::error::Result;
use async_trait::async_trait;

/// Durable storage for payment records.
///
/// `save` is the only write and doubles as the transaction boundary: it is a
/// compare-and-swap on [`PaymentRecord::version`].
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Inserts a record with version `0` and an unknown id, or replaces the
    /// stored record when its version equals `record.version`.
    ///
    /// Returns the stored record carrying the new version. A stale or
    /// duplicate write fails with `PaymentError::ConcurrentModification`.
    async fn save(&self, record: PaymentRecord) -> Result<PaymentRecord>;
    async fn find_by_id(&self, id: PaymentId) -> Result<Option<PaymentRecord>>;
    /// Payments owned by `user_dni`, in creation order.
    async fn find_by_user(&self, user_dni: &str) -> Result<Vec<PaymentRecord>>;
    /// Every payment, in creation order.
    async fn find_all(&self) -> Result<Vec<PaymentRecord>>;
}

/// Registry of association members.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn is_member(&self, user_dni: &str) -> Result<bool>;
}

pub type PaymentRepositoryBox = Box<dyn PaymentRepository>;
pub type MemberDirectoryBox = Box<dyn MemberDirectory>;
