use crate::domain::payment::{PaymentId, PaymentRecord};
use crate::domain::ports::PaymentRepository;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing payment records, keyed by payment id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family indexing payments by owner:
/// `len(dni) as u32 BE ‖ dni ‖ created_at ‖ id`.
pub const CF_PAYMENTS_BY_USER: &str = "payments_by_user";

/// A persistent payment repository backed by RocksDB.
///
/// Records are stored as JSON. Writes of the record and its user index entry
/// go through one `WriteBatch`; a process-wide mutex serialises the
/// read-compare-write of `save`.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBPaymentRepository {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBPaymentRepository {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let cf_by_user = ColumnFamilyDescriptor::new(CF_PAYMENTS_BY_USER, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments, cf_by_user])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::Storage(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn get_record(&self, id: PaymentId) -> Result<Option<PaymentRecord>> {
        let cf = self.cf(CF_PAYMENTS)?;
        match self.db.get_cf(cf, id.as_bytes())? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }
}

// The length prefix keeps one DNI from being a key prefix of another.
fn user_prefix(user_dni: &str) -> Result<Vec<u8>> {
    let len = u32::try_from(user_dni.len()).map_err(|_| {
        PaymentError::Storage(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "user dni too long for the user index",
        )))
    })?;
    let mut key = Vec::with_capacity(4 + user_dni.len());
    key.extend_from_slice(&len.to_be_bytes());
    key.extend_from_slice(user_dni.as_bytes());
    Ok(key)
}

fn user_index_key(record: &PaymentRecord) -> Result<Vec<u8>> {
    let mut key = user_prefix(&record.user_dni)?;
    // Flip the sign bit so negative timestamps still sort first.
    let micros = record.created_at.and_utc().timestamp_micros() as u64 ^ (1 << 63);
    key.extend_from_slice(&micros.to_be_bytes());
    key.extend_from_slice(record.id.as_bytes());
    Ok(key)
}

fn id_from_index_key(key: &[u8]) -> Result<PaymentId> {
    let bytes: [u8; 16] = key
        .len()
        .checked_sub(16)
        .and_then(|start| key[start..].try_into().ok())
        .ok_or_else(|| {
            PaymentError::Storage(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "malformed user index key",
            )))
        })?;
    Ok(PaymentId::from_bytes(bytes))
}

fn encode(record: &PaymentRecord) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| {
        PaymentError::Storage(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

fn decode(bytes: &[u8]) -> Result<PaymentRecord> {
    serde_json::from_slice(bytes).map_err(|e| {
        PaymentError::Storage(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

#[async_trait]
impl PaymentRepository for RocksDBPaymentRepository {
    async fn save(&self, mut record: PaymentRecord) -> Result<PaymentRecord> {
        let _guard = self.write_lock.lock().await;

        let stored_version = self.get_record(record.id)?.map(|r| r.version);
        let is_insert = match stored_version {
            None if record.version == 0 => true,
            Some(version) if version == record.version && version > 0 => false,
            _ => return Err(PaymentError::ConcurrentModification(record.id)),
        };

        record.version += 1;

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_PAYMENTS)?, record.id.as_bytes(), encode(&record)?);
        if is_insert {
            batch.put_cf(self.cf(CF_PAYMENTS_BY_USER)?, user_index_key(&record)?, b"");
        }
        self.db.write(batch)?;

        Ok(record)
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<PaymentRecord>> {
        self.get_record(id)
    }

    async fn find_by_user(&self, user_dni: &str) -> Result<Vec<PaymentRecord>> {
        let cf = self.cf(CF_PAYMENTS_BY_USER)?;
        let prefix = user_prefix(user_dni)?;

        let mut records = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix.as_slice(), Direction::Forward));
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let id = id_from_index_key(&key)?;
            if let Some(record) = self.get_record(id)? {
                records.push(record);
            }
        }

        Ok(records)
    }

    async fn find_all(&self) -> Result<Vec<PaymentRecord>> {
        let cf = self.cf(CF_PAYMENTS)?;

        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(decode(&value)?);
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(records)
    }
}
