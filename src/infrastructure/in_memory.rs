use crate::domain::payment::{PaymentId, PaymentRecord};
use crate::domain::ports::{MemberDirectory, PaymentRepository};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct PaymentTable {
    records: HashMap<PaymentId, PaymentRecord>,
    insertion_order: Vec<PaymentId>,
}

impl PaymentTable {
    fn in_order(&self) -> impl Iterator<Item = &PaymentRecord> + '_ {
        self.insertion_order
            .iter()
            .filter_map(|id| self.records.get(id))
    }
}

/// A thread-safe in-memory payment repository.
///
/// Uses `Arc<RwLock<..>>` to allow shared concurrent access. The version check
/// and the write of `save` happen under a single write guard.
#[derive(Default, Clone)]
pub struct InMemoryPaymentRepository {
    table: Arc<RwLock<PaymentTable>>,
}

impl InMemoryPaymentRepository {
    /// Creates a new, empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn save(&self, mut record: PaymentRecord) -> Result<PaymentRecord> {
        let mut table = self.table.write().await;

        let stored_version = table.records.get(&record.id).map(|r| r.version);
        match stored_version {
            None if record.version == 0 => table.insertion_order.push(record.id),
            Some(version) if version == record.version && version > 0 => {}
            _ => return Err(PaymentError::ConcurrentModification(record.id)),
        }

        record.version += 1;
        table.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<PaymentRecord>> {
        let table = self.table.read().await;
        Ok(table.records.get(&id).cloned())
    }

    async fn find_by_user(&self, user_dni: &str) -> Result<Vec<PaymentRecord>> {
        let table = self.table.read().await;
        Ok(table
            .in_order()
            .filter(|record| record.user_dni == user_dni)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<PaymentRecord>> {
        let table = self.table.read().await;
        Ok(table.in_order().cloned().collect())
    }
}

/// In-memory member registry keyed by DNI.
#[derive(Default, Clone)]
pub struct InMemoryMemberDirectory {
    members: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryMemberDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, user_dni: impl Into<String>) {
        self.members.write().await.insert(user_dni.into());
    }
}

#[async_trait]
impl MemberDirectory for InMemoryMemberDirectory {
    async fn is_member(&self, user_dni: &str) -> Result<bool> {
        Ok(self.members.read().await.contains(user_dni))
    }
}
