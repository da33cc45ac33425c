//! Transaction log for ingestion batches.
//!
//! Each committed ingestion appends an immutable record of the identifiers
//! it added. The log is a JSONL file next to the manifest, persisted
//! independently of it. Entries are never rewritten in place: updating a
//! record appends a new version, and the last entry for an id wins when
//! the log is replayed.

use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::alloc;
use crate::models::Manifest;
use crate::storage::DATA_DIR;
use crate::{Error, Result};

/// Transaction log file name within the data directory.
const LOG_FILE: &str = "transactions.jsonl";

/// Lifecycle state of a transaction record.
///
/// The only transition is `active -> reverted`, after the rollback's
/// manifest commit succeeds. Redo is a fresh ingestion, not a state change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Active,
    Reverted,
}

/// Audit entry for one committed ingestion batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Identifier of the form `TXN-YYYYMMDD-NNN`, lexically increasing
    pub id: String,

    /// When the ingestion committed
    pub timestamp: DateTime<Utc>,

    /// Task identifiers the transaction added, in batch order
    pub added: Vec<String>,

    /// Free-form description of where the batch came from
    pub source: String,

    #[serde(default)]
    pub status: TransactionStatus,

    /// When the transaction was reverted, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverted_at: Option<DateTime<Utc>>,
}

/// Append-ordered log of ingestion transactions.
pub struct TransactionLog {
    path: PathBuf,
}

impl TransactionLog {
    /// Open the transaction log for an initialized project.
    ///
    /// The log file itself is created lazily on first append.
    pub fn open(project_dir: &Path) -> Result<Self> {
        let root = project_dir.join(DATA_DIR);
        if !root.is_dir() {
            return Err(Error::NotInitialized);
        }
        Ok(Self {
            path: root.join(LOG_FILE),
        })
    }

    /// Replay the log: records ordered by first appearance, last entry
    /// winning for each id.
    pub fn list(&self) -> Result<Vec<TransactionRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = std::fs::File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut order: Vec<String> = Vec::new();
        let mut latest: HashMap<String, TransactionRecord> = HashMap::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: TransactionRecord = serde_json::from_str(&line)?;
            if !latest.contains_key(&record.id) {
                order.push(record.id.clone());
            }
            latest.insert(record.id.clone(), record);
        }

        Ok(order
            .into_iter()
            .map(|id| latest.remove(&id).unwrap())
            .collect())
    }

    /// Find a transaction record by id.
    pub fn lookup(&self, transaction_id: &str) -> Result<Option<TransactionRecord>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|r| r.id == transaction_id))
    }

    /// Append a new record for a committed ingestion and return it.
    pub fn record(&self, added: &[String], source: &str) -> Result<TransactionRecord> {
        let now = Utc::now();
        let record = TransactionRecord {
            id: next_transaction_id(&self.list()?, now),
            timestamp: now,
            added: added.to_vec(),
            source: source.to_string(),
            status: TransactionStatus::Active,
            reverted_at: None,
        };
        self.append(&record)?;
        Ok(record)
    }

    /// Surviving tasks outside the transaction that directly depend on any
    /// task it added. An empty list means rollback is safe.
    pub fn check_rollback_safety(
        &self,
        transaction_id: &str,
        manifest: &Manifest,
    ) -> Result<Vec<String>> {
        let record = self
            .lookup(transaction_id)?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", transaction_id)))?;

        let added: HashSet<&String> = record.added.iter().collect();
        Ok(manifest
            .tasks
            .iter()
            .filter(|t| !added.contains(&t.id))
            .filter(|t| t.dependencies.iter().any(|d| added.contains(d)))
            .map(|t| t.id.clone())
            .collect())
    }

    /// Transition a record to reverted.
    ///
    /// Called only after the rollback's manifest commit has succeeded.
    pub fn mark_reverted(&self, transaction_id: &str) -> Result<()> {
        let mut record = self
            .lookup(transaction_id)?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", transaction_id)))?;
        record.status = TransactionStatus::Reverted;
        record.reverted_at = Some(Utc::now());
        self.append(&record)
    }

    /// Highest task number ever issued, across every recorded transaction.
    ///
    /// Used as the allocator floor so identifiers freed by rollback are
    /// never reissued.
    pub fn high_water_mark(&self) -> Result<u64> {
        Ok(self
            .list()?
            .iter()
            .flat_map(|r| r.added.iter())
            .filter_map(|id| alloc::parse_id(id).map(|(n, _)| n))
            .max()
            .unwrap_or(0))
    }

    fn append(&self, record: &TransactionRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let json = serde_json::to_string(record)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Next transaction id: per-day sequence with zero-padded counter.
fn next_transaction_id(records: &[TransactionRecord], now: DateTime<Utc>) -> String {
    let date = now.format("%Y%m%d").to_string();
    let prefix = format!("TXN-{}-", date);
    let max_seq = records
        .iter()
        .filter_map(|r| r.id.strip_prefix(&prefix)?.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:03}", prefix, max_seq + 1)
}
