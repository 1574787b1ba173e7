//! Durable publish-history store backing cross-run dedup.
//!
//! One redb table maps an article fingerprint to `(sent_at_unix, title)`.
//! A record exists if and only if a publish attempt for that fingerprint
//! completed successfully — the pipeline commits strictly after a
//! confirmed delivery, so a crash mid-publish leaves no false-positive
//! behind. Records are pruned after a retention window to bound growth.

use crate::models::Fingerprint;
use chrono::Utc;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::fmt;
use std::path::Path;
use tracing::{debug, instrument};

const PUBLISHED_TABLE: TableDefinition<&str, (u64, &str)> = TableDefinition::new("published");

/// Error surface of the store. Wraps the distinct redb error families so
/// callers keep one error type per operation.
#[derive(Debug)]
pub enum StoreError {
    Database(Box<redb::DatabaseError>),
    Transaction(Box<redb::TransactionError>),
    Table(redb::TableError),
    Storage(redb::StorageError),
    Commit(redb::CommitError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "database error: {e}"),
            Self::Transaction(e) => write!(f, "transaction error: {e}"),
            Self::Table(e) => write!(f, "table error: {e}"),
            Self::Storage(e) => write!(f, "storage error: {e}"),
            Self::Commit(e) => write!(f, "commit error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<redb::DatabaseError> for StoreError {
    fn from(e: redb::DatabaseError) -> Self {
        Self::Database(Box::new(e))
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

impl From<redb::TableError> for StoreError {
    fn from(e: redb::TableError) -> Self {
        Self::Table(e)
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(e: redb::StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(e: redb::CommitError) -> Self {
        Self::Commit(e)
    }
}

/// Persistent set of already-published article fingerprints.
pub struct DedupStore {
    db: Database,
}

impl DedupStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            db: Database::create(path)?,
        })
    }

    /// Volatile store for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            db: Database::builder()
                .create_with_backend(redb::backends::InMemoryBackend::new())?,
        })
    }

    /// Has this fingerprint already been published?
    pub fn exists(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        let txn = self.db.begin_read()?;
        match txn.open_table(PUBLISHED_TABLE) {
            Ok(table) => Ok(table.get(fingerprint.as_str())?.is_some()),
            // A fresh database has no table until the first commit.
            Err(redb::TableError::TableDoesNotExist(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Record a successful publish. Idempotent: an already-present
    /// fingerprint is left untouched, keeping its original timestamp.
    /// The check-and-insert runs inside a single write transaction.
    #[instrument(level = "debug", skip_all, fields(fingerprint = %fingerprint))]
    pub fn commit(&self, fingerprint: &Fingerprint, title: &str) -> Result<(), StoreError> {
        self.commit_at(fingerprint, title, Utc::now().timestamp().max(0) as u64)
    }

    fn commit_at(
        &self,
        fingerprint: &Fingerprint,
        title: &str,
        sent_at_unix: u64,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PUBLISHED_TABLE)?;
            if table.get(fingerprint.as_str())?.is_none() {
                table.insert(fingerprint.as_str(), (sent_at_unix, title))?;
                debug!("Recorded publish");
            } else {
                debug!("Fingerprint already recorded; no-op");
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Drop records older than the retention window. Returns how many
    /// were removed.
    #[instrument(level = "info", skip_all)]
    pub fn prune(&self, older_than: chrono::Duration) -> Result<usize, StoreError> {
        let cutoff = (Utc::now() - older_than).timestamp().max(0) as u64;
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(PUBLISHED_TABLE)?;
            let stale: Vec<String> = table
                .iter()?
                .filter_map(|entry| entry.ok())
                .filter(|(_, value)| value.value().0 < cutoff)
                .map(|(key, _)| key.value().to_string())
                .collect();
            for key in &stale {
                table.remove(key.as_str())?;
            }
            stale.len()
        };
        txn.commit()?;
        Ok(removed)
    }

    /// Number of records currently held. Used for reporting and tests.
    pub fn len(&self) -> Result<usize, StoreError> {
        let txn = self.db.begin_read()?;
        match txn.open_table(PUBLISHED_TABLE) {
            Ok(table) => Ok(table.len()? as usize),
            Err(redb::TableError::TableDoesNotExist(_)) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
