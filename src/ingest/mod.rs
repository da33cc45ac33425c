//! Batch validation and transactional ingestion.
//!
//! The pipeline runs in a fixed order: normalize -> schema -> dependency
//! resolution -> cycle detection -> identifier allocation -> commit ->
//! transaction record. A later stage never runs once an earlier stage has
//! reported an error, and no stage before commit has external side effects,
//! so a rejected batch leaves the manifest untouched.

pub mod alloc;
pub mod resolve;
pub mod schema;

use std::collections::HashSet;
use std::fmt;

use chrono::Utc;
use serde::Serialize;

use crate::models::graph::DependencyGraph;
use crate::models::{Manifest, ManifestStats, RawCandidate, Task};
use crate::storage::txlog::{TransactionLog, TransactionStatus};
use crate::storage::ManifestStore;
use crate::{Error, Result};

/// Kind of a collected validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Schema,
    Dependency,
    Circular,
}

/// A single validation failure, tagged by kind and offending position.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,

    /// Zero-based batch position of the offending candidate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,

    /// Field name for schema issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    pub message: String,

    /// The full cycle, in order, for circular issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<Vec<String>>,
}

impl ValidationIssue {
    pub fn schema(index: usize, field: &str, message: &str) -> Self {
        Self {
            kind: IssueKind::Schema,
            index: Some(index),
            field: Some(field.to_string()),
            message: message.to_string(),
            cycle: None,
        }
    }

    pub fn dependency(index: usize, message: &str) -> Self {
        Self {
            kind: IssueKind::Dependency,
            index: Some(index),
            field: None,
            message: message.to_string(),
            cycle: None,
        }
    }

    pub fn circular(cycle: Vec<String>) -> Self {
        let mut path = cycle.clone();
        if let Some(first) = cycle.first() {
            path.push(first.clone());
        }
        Self {
            kind: IssueKind::Circular,
            index: None,
            field: None,
            message: format!("circular dependency: {}", path.join(" -> ")),
            cycle: Some(cycle),
        }
    }
}

/// Every issue collected for a rejected batch.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.issues.iter().map(|i| i.message.as_str()).collect();
        write!(
            f,
            "Batch rejected: {} issue(s): {}",
            self.issues.len(),
            messages.join("; ")
        )
    }
}

/// A batch that passed every validation stage.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedBatch {
    /// Fully resolved tasks with speculative identifiers assigned
    pub tasks: Vec<Task>,
    /// The identifier a subsequent batch would start at
    pub next_id: String,
}

/// Outcome of a committed ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub transaction_id: String,
    pub added: Vec<String>,
    pub stats: ManifestStats,
}

/// Outcome of a rollback.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackReceipt {
    pub transaction_id: String,
    pub removed: Vec<String>,
    pub forced: bool,
    pub stats: ManifestStats,
}

/// Run the validation stages against a batch without committing anything.
///
/// `floor` is the allocator's lifetime high-water mark, normally taken from
/// the transaction log. On success the returned tasks carry their assigned
/// identifiers and canonical dependency lists; on failure the error wraps
/// the collected [`ValidationReport`].
pub fn validate_batch(
    manifest: &Manifest,
    floor: u64,
    raw: &[RawCandidate],
) -> Result<ResolvedBatch> {
    let normalized = schema::normalize(raw);
    let candidates = schema::validate(&normalized).map_err(Error::Validation)?;

    // Identifiers must exist before batch indices can be translated; the
    // sequence stays speculative until the cycle check passes.
    let seq = alloc::allocate(manifest, floor, candidates.len());
    let resolved =
        resolve::resolve(manifest, &candidates, &seq.ids).map_err(Error::Validation)?;

    let mut graph = DependencyGraph::new();
    for task in &manifest.tasks {
        graph.add_node(task.id.clone(), task.dependencies.clone());
    }
    for (id, deps) in seq.ids.iter().zip(&resolved) {
        graph.add_node(id.clone(), deps.clone());
    }
    if let Some(cycle) = graph.find_cycle() {
        return Err(Error::Validation(ValidationReport {
            issues: vec![ValidationIssue::circular(cycle)],
        }));
    }

    let now = Utc::now();
    let tasks = candidates
        .into_iter()
        .zip(seq.ids)
        .zip(resolved)
        .map(|((candidate, id), dependencies)| Task {
            id,
            title: candidate.title,
            description: candidate.description,
            status: candidate.status,
            dependencies,
            test_strategy: candidate.test_strategy,
            risk: candidate.risk,
            context: candidate.context,
            created_at: now,
            updated_at: now,
        })
        .collect();

    Ok(ResolvedBatch {
        tasks,
        next_id: seq.next_id,
    })
}

/// Run the full pipeline and commit the batch as one transaction.
pub fn ingest_batch(
    store: &ManifestStore,
    txlog: &TransactionLog,
    raw: &[RawCandidate],
    source: &str,
) -> Result<IngestReceipt> {
    let mut manifest = store.load()?;
    let floor = txlog.high_water_mark()?;
    let batch = validate_batch(&manifest, floor, raw)?;

    let added: Vec<String> = batch.tasks.iter().map(|t| t.id.clone()).collect();
    manifest.tasks.extend(batch.tasks);
    store.commit(&mut manifest)?;

    let record = txlog.record(&added, source)?;
    Ok(IngestReceipt {
        transaction_id: record.id,
        added,
        stats: manifest.stats,
    })
}

/// Remove every task a transaction added.
///
/// Refused while surviving tasks outside the transaction depend on any of
/// them, unless `force` is set. Removal also strips the removed identifiers
/// from surviving dependency lists so the manifest never keeps references
/// to tasks that are gone. The record transitions to reverted only after
/// the manifest commit succeeds.
pub fn rollback(
    store: &ManifestStore,
    txlog: &TransactionLog,
    transaction_id: &str,
    force: bool,
) -> Result<RollbackReceipt> {
    let mut manifest = store.load()?;
    let record = txlog
        .lookup(transaction_id)?
        .ok_or_else(|| Error::NotFound(format!("transaction {}", transaction_id)))?;

    if record.status == TransactionStatus::Reverted {
        return Err(Error::AlreadyReverted(record.id));
    }

    let dependents = txlog.check_rollback_safety(&record.id, &manifest)?;
    if !dependents.is_empty() && !force {
        return Err(Error::RollbackConflict {
            transaction_id: record.id,
            dependents,
        });
    }

    let removed: HashSet<&String> = record.added.iter().collect();
    let now = Utc::now();
    manifest.tasks.retain(|t| !removed.contains(&t.id));
    for task in &mut manifest.tasks {
        let before = task.dependencies.len();
        task.dependencies.retain(|d| !removed.contains(d));
        if task.dependencies.len() != before {
            task.updated_at = now;
        }
    }
    store.commit(&mut manifest)?;

    txlog.mark_reverted(&record.id)?;
    Ok(RollbackReceipt {
        transaction_id: record.id,
        removed: record.added,
        forced: force,
        stats: manifest.stats,
    })
}
