use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A glossary entry. `acronym` is the uppercase unique key; only approved
/// entries are visible to the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcronymRecord {
    pub id: u64,
    pub acronym: String,
    pub expansion: String,
    pub context: Option<String>,
    pub approved: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields of a record to be inserted; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewAcronym {
    pub acronym: String,
    pub expansion: String,
    pub context: Option<String>,
    pub approved: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate acronym key")]
    Conflict,
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),
    #[error("record encoding error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("storage backend unavailable")]
    Unavailable,
}

/// Authoritative store for the acronym glossary. Implementations must
/// leave the store unchanged when an operation returns an error, so a
/// failed insert can be reported without leaving a partial write behind.
pub trait AcronymStore: Send + Sync {
    fn all_approved(&self) -> Result<Vec<AcronymRecord>, StoreError>;

    /// Look up by exact (uppercase) acronym key.
    fn find(&self, acronym: &str) -> Result<Option<AcronymRecord>, StoreError>;

    /// Insert a new record. Fails with [`StoreError::Conflict`] when the
    /// key is already taken, including when a concurrent insert wins the
    /// race for it.
    fn insert(&self, record: NewAcronym) -> Result<AcronymRecord, StoreError>;

    /// Overwrite the record stored under `record.acronym`.
    fn update(&self, record: AcronymRecord) -> Result<(), StoreError>;

    /// Approve the record with the given id, returning its acronym key, or
    /// `None` when no record has that id.
    fn set_approved(&self, id: u64) -> Result<Option<String>, StoreError>;
}

/// sled-backed store: one tree keyed by the uppercase acronym, values
/// bincode-encoded records. Insert uniqueness rides on compare_and_swap,
/// so the losing side of a race writes nothing.
pub struct SledAcronymStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledAcronymStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let tree = db.open_tree("acronyms")?;
        Ok(Self { db, tree })
    }
}

impl AcronymStore for SledAcronymStore {
    fn all_approved(&self) -> Result<Vec<AcronymRecord>, StoreError> {
        let mut out = Vec::new();
        for entry in self.tree.iter() {
            let (_, value) = entry?;
            let record: AcronymRecord = bincode::deserialize(&value)?;
            if record.approved {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn find(&self, acronym: &str) -> Result<Option<AcronymRecord>, StoreError> {
        match self.tree.get(acronym.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, record: NewAcronym) -> Result<AcronymRecord, StoreError> {
        let now = OffsetDateTime::now_utc();
        let record = AcronymRecord {
            id: self.db.generate_id()?,
            acronym: record.acronym,
            expansion: record.expansion,
            context: record.context,
            approved: record.approved,
            created_at: now,
            updated_at: now,
        };
        let encoded = bincode::serialize(&record)?;
        let swapped = self.tree.compare_and_swap(
            record.acronym.as_bytes(),
            None as Option<&[u8]>,
            Some(encoded),
        )?;
        if swapped.is_err() {
            return Err(StoreError::Conflict);
        }
        self.tree.flush()?;
        Ok(record)
    }

    fn update(&self, record: AcronymRecord) -> Result<(), StoreError> {
        let encoded = bincode::serialize(&record)?;
        self.tree.insert(record.acronym.as_bytes(), encoded)?;
        self.tree.flush()?;
        Ok(())
    }

    fn set_approved(&self, id: u64) -> Result<Option<String>, StoreError> {
        // The glossary is small enough to scan for an id.
        for entry in self.tree.iter() {
            let (key, value) = entry?;
            let mut record: AcronymRecord = bincode::deserialize(&value)?;
            if record.id == id {
                record.approved = true;
                record.updated_at = OffsetDateTime::now_utc();
                let encoded = bincode::serialize(&record)?;
                self.tree.insert(key, encoded)?;
                self.tree.flush()?;
                return Ok(Some(record.acronym));
            }
        }
        Ok(None)
    }
}

/// In-memory store for tests and for running without a data directory.
#[derive(Default)]
pub struct MemoryAcronymStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    records: HashMap<String, AcronymRecord>,
    next_id: u64,
}

impl MemoryAcronymStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AcronymStore for MemoryAcronymStore {
    fn all_approved(&self) -> Result<Vec<AcronymRecord>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.records.values().filter(|r| r.approved).cloned().collect())
    }

    fn find(&self, acronym: &str) -> Result<Option<AcronymRecord>, StoreError> {
        Ok(self.inner.lock().records.get(acronym).cloned())
    }

    fn insert(&self, record: NewAcronym) -> Result<AcronymRecord, StoreError> {
        let mut inner = self.inner.lock();
        if inner.records.contains_key(&record.acronym) {
            return Err(StoreError::Conflict);
        }
        inner.next_id += 1;
        let now = OffsetDateTime::now_utc();
        let record = AcronymRecord {
            id: inner.next_id,
            acronym: record.acronym,
            expansion: record.expansion,
            context: record.context,
            approved: record.approved,
            created_at: now,
            updated_at: now,
        };
        inner.records.insert(record.acronym.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: AcronymRecord) -> Result<(), StoreError> {
        self.inner.lock().records.insert(record.acronym.clone(), record);
        Ok(())
    }

    fn set_approved(&self, id: u64) -> Result<Option<String>, StoreError> {
        let mut inner = self.inner.lock();
        for record in inner.records.values_mut() {
            if record.id == id {
                record.approved = true;
                record.updated_at = OffsetDateTime::now_utc();
                return Ok(Some(record.acronym.clone()));
            }
        }
        Ok(None)
    }
}
