//! Command implementations for the Cairn CLI.
//!
//! This module contains the business logic for each CLI command. Every
//! command returns a typed result that can be serialized to JSON (the
//! default output) or formatted for humans.

use std::io::Read;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::ingest::{self, IngestReceipt, RollbackReceipt};
use crate::models::{Manifest, ManifestStats, RawCandidate, Task, TaskStatus};
use crate::storage::txlog::{TransactionLog, TransactionRecord, TransactionStatus};
use crate::storage::ManifestStore;
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output: Serialize {
    /// Format for human-readable output.
    fn to_human(&self) -> String;

    /// Serialize to JSON string.
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Read an ingestion batch from a file or stdin.
///
/// Accepts either a bare JSON array of candidates or an object with a
/// top-level `tasks` array.
pub fn read_batch(file: Option<&Path>) -> Result<Vec<RawCandidate>> {
    let data = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let value: serde_json::Value = serde_json::from_str(&data)
        .map_err(|e| Error::InvalidInput(format!("batch is not valid JSON: {}", e)))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("tasks") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(Error::InvalidInput(
                    "batch must be a JSON array or an object with a \"tasks\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(Error::InvalidInput(
                "batch must be a JSON array or an object with a \"tasks\" array".to_string(),
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item)
                .map_err(|e| Error::InvalidInput(format!("candidate at position {}: {}", i, e)))
        })
        .collect()
}

// === Init ===

#[derive(Debug, Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub path: String,
}

impl Output for InitResult {
    fn to_human(&self) -> String {
        if self.initialized {
            format!("Initialized cairn manifest at {}", self.path)
        } else {
            format!("Already initialized ({})", self.path)
        }
    }
}

/// Initialize a manifest for the project directory.
pub fn init(dir: &Path, name: Option<String>, description: Option<String>) -> Result<InitResult> {
    let existed = ManifestStore::exists(dir);
    let name = name.unwrap_or_else(|| {
        dir.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string())
    });
    let store = ManifestStore::init(dir, name, description)?;
    Ok(InitResult {
        initialized: !existed,
        path: store.manifest_path().display().to_string(),
    })
}

// === Validate / Ingest ===

#[derive(Debug, Serialize)]
pub struct ValidateResult {
    pub valid: bool,
    pub count: usize,
    pub next_id: String,
    pub tasks: Vec<Task>,
}

impl Output for ValidateResult {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Batch OK: {} task(s), next available id {}",
            self.count, self.next_id
        )];
        for task in &self.tasks {
            if task.dependencies.is_empty() {
                lines.push(format!("  {} {}", task.id, task.title));
            } else {
                lines.push(format!(
                    "  {} {} (depends on {})",
                    task.id,
                    task.title,
                    task.dependencies.join(", ")
                ));
            }
        }
        lines.join("\n")
    }
}

/// Run the validation stages against a batch without committing.
pub fn validate(dir: &Path, file: Option<&Path>) -> Result<ValidateResult> {
    let batch = read_batch(file)?;
    let store = ManifestStore::open(dir)?;
    let txlog = TransactionLog::open(dir)?;
    let manifest = store.load()?;

    let resolved = ingest::validate_batch(&manifest, txlog.high_water_mark()?, &batch)?;
    Ok(ValidateResult {
        valid: true,
        count: resolved.tasks.len(),
        next_id: resolved.next_id,
        tasks: resolved.tasks,
    })
}

#[derive(Debug, Serialize)]
pub struct IngestResult {
    pub transaction_id: String,
    pub added: Vec<String>,
    pub stats: ManifestStats,
}

impl Output for IngestResult {
    fn to_human(&self) -> String {
        format!(
            "Committed {}: added {} task(s) [{}]\n{}",
            self.transaction_id,
            self.added.len(),
            self.added.join(", "),
            human_stats(&self.stats)
        )
    }
}

impl From<IngestReceipt> for IngestResult {
    fn from(receipt: IngestReceipt) -> Self {
        Self {
            transaction_id: receipt.transaction_id,
            added: receipt.added,
            stats: receipt.stats,
        }
    }
}

/// Run the full pipeline and commit the batch as one transaction.
pub fn ingest_cmd(dir: &Path, file: Option<&Path>, source: &str) -> Result<IngestResult> {
    let batch = read_batch(file)?;
    let store = ManifestStore::open(dir)?;
    let txlog = TransactionLog::open(dir)?;
    Ok(ingest::ingest_batch(&store, &txlog, &batch, source)?.into())
}

// === Task commands ===

#[derive(Debug, Serialize)]
pub struct TaskAddResult {
    pub task: Task,
    pub transaction_id: String,
}

impl Output for TaskAddResult {
    fn to_human(&self) -> String {
        format!(
            "Created {}: {} ({})",
            self.task.id, self.task.title, self.transaction_id
        )
    }
}

/// Create a single task; internally a batch of size one.
#[allow(clippy::too_many_arguments)]
pub fn task_add(
    dir: &Path,
    title: String,
    description: String,
    depends_on: Vec<String>,
    test_strategy: Option<String>,
    risk: Option<String>,
    source: &str,
) -> Result<TaskAddResult> {
    let store = ManifestStore::open(dir)?;
    let txlog = TransactionLog::open(dir)?;

    let candidate = RawCandidate {
        title: Some(title),
        description: Some(description),
        dependencies: Some(serde_json::Value::Array(
            depends_on
                .into_iter()
                .map(serde_json::Value::String)
                .collect(),
        )),
        test_strategy,
        risk,
        ..RawCandidate::default()
    };

    let receipt = ingest::ingest_batch(&store, &txlog, &[candidate], source)?;
    let manifest = store.load()?;
    let task = manifest
        .task(&receipt.added[0])
        .cloned()
        .ok_or_else(|| Error::NotFound(receipt.added[0].clone()))?;

    Ok(TaskAddResult {
        task,
        transaction_id: receipt.transaction_id,
    })
}

/// One row of `task list` output; status is the derived value.
#[derive(Debug, Serialize)]
pub struct TaskSummary {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskListResult {
    pub tasks: Vec<TaskSummary>,
}

impl Output for TaskListResult {
    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return "No tasks".to_string();
        }
        self.tasks
            .iter()
            .map(|t| format!("{} [{}] {}", t.id, t.status, t.title))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn summarize(manifest: &Manifest) -> Vec<TaskSummary> {
    manifest
        .tasks
        .iter()
        .map(|t| TaskSummary {
            id: t.id.clone(),
            title: t.title.clone(),
            status: manifest.effective_status(t),
            dependencies: t.dependencies.clone(),
        })
        .collect()
}

/// List tasks, optionally filtered by derived status.
pub fn task_list(dir: &Path, status: Option<&str>) -> Result<TaskListResult> {
    let store = ManifestStore::open(dir)?;
    let manifest = store.load()?;

    let filter = match status {
        Some(raw) => Some(raw.parse::<TaskStatus>().map_err(Error::InvalidInput)?),
        None => None,
    };

    let tasks = summarize(&manifest)
        .into_iter()
        .filter(|t| filter.map(|f| t.status == f).unwrap_or(true))
        .collect();
    Ok(TaskListResult { tasks })
}

#[derive(Debug, Serialize)]
pub struct TaskShowResult {
    #[serde(flatten)]
    pub task: Task,
    pub effective_status: TaskStatus,
}

impl Output for TaskShowResult {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("{}: {}", self.task.id, self.task.title),
            format!("  status: {}", self.effective_status),
            format!("  description: {}", self.task.description),
        ];
        if !self.task.dependencies.is_empty() {
            lines.push(format!(
                "  depends on: {}",
                self.task.dependencies.join(", ")
            ));
        }
        if let Some(strategy) = self.task.test_strategy {
            lines.push(format!("  test strategy: {}", strategy));
        }
        if let Some(risk) = self.task.risk {
            lines.push(format!("  risk: {}", risk));
        }
        lines.join("\n")
    }
}

/// Show a single task by id.
pub fn task_show(dir: &Path, id: &str) -> Result<TaskShowResult> {
    let store = ManifestStore::open(dir)?;
    let manifest = store.load()?;
    let task = manifest
        .task(id)
        .cloned()
        .ok_or_else(|| Error::NotFound(id.to_string()))?;
    let effective_status = manifest.effective_status(&task);
    Ok(TaskShowResult {
        task,
        effective_status,
    })
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateResult {
    pub id: String,
    pub previous: TaskStatus,
    pub status: TaskStatus,
}

impl Output for StatusUpdateResult {
    fn to_human(&self) -> String {
        format!("{}: {} -> {}", self.id, self.previous, self.status)
    }
}

/// Set a task's persisted status.
pub fn task_status(dir: &Path, id: &str, status: &str) -> Result<StatusUpdateResult> {
    let status = status.parse::<TaskStatus>().map_err(Error::InvalidInput)?;

    let store = ManifestStore::open(dir)?;
    let mut manifest = store.load()?;
    let task = manifest
        .task_mut(id)
        .ok_or_else(|| Error::NotFound(id.to_string()))?;

    let previous = task.status;
    task.status = status;
    task.updated_at = Utc::now();
    let id = task.id.clone();
    store.commit(&mut manifest)?;

    Ok(StatusUpdateResult {
        id,
        previous,
        status,
    })
}

/// Tasks ready to work on: workable and with every dependency completed.
pub fn ready(dir: &Path) -> Result<TaskListResult> {
    task_list(dir, Some("pending"))
}

/// Tasks waiting on incomplete dependencies.
pub fn blocked(dir: &Path) -> Result<TaskListResult> {
    task_list(dir, Some("blocked"))
}

// === Rollback / History / Stats ===

#[derive(Debug, Serialize)]
pub struct RollbackResult {
    pub transaction_id: String,
    pub removed: Vec<String>,
    pub forced: bool,
    pub stats: ManifestStats,
}

impl Output for RollbackResult {
    fn to_human(&self) -> String {
        let forced = if self.forced { " (forced)" } else { "" };
        format!(
            "Rolled back {}{}: removed {} task(s) [{}]",
            self.transaction_id,
            forced,
            self.removed.len(),
            self.removed.join(", ")
        )
    }
}

impl From<RollbackReceipt> for RollbackResult {
    fn from(receipt: RollbackReceipt) -> Self {
        Self {
            transaction_id: receipt.transaction_id,
            removed: receipt.removed,
            forced: receipt.forced,
            stats: receipt.stats,
        }
    }
}

/// Remove every task added by a transaction.
pub fn rollback(dir: &Path, transaction_id: &str, force: bool) -> Result<RollbackResult> {
    let store = ManifestStore::open(dir)?;
    let txlog = TransactionLog::open(dir)?;
    Ok(ingest::rollback(&store, &txlog, transaction_id, force)?.into())
}

#[derive(Debug, Serialize)]
pub struct HistoryResult {
    pub transactions: Vec<TransactionRecord>,
}

impl Output for HistoryResult {
    fn to_human(&self) -> String {
        if self.transactions.is_empty() {
            return "No transactions".to_string();
        }
        self.transactions
            .iter()
            .map(|r| {
                let status = match r.status {
                    TransactionStatus::Active => "active",
                    TransactionStatus::Reverted => "reverted",
                };
                format!(
                    "{} [{}] {} task(s) from {}",
                    r.id,
                    status,
                    r.added.len(),
                    r.source
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Show recorded transactions, or one record by id.
pub fn history(dir: &Path, transaction_id: Option<&str>) -> Result<HistoryResult> {
    let txlog = TransactionLog::open(dir)?;
    let transactions = match transaction_id {
        Some(id) => {
            let record = txlog
                .lookup(id)?
                .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))?;
            vec![record]
        }
        None => txlog.list()?,
    };
    Ok(HistoryResult { transactions })
}

#[derive(Debug, Serialize)]
pub struct StatsResult {
    pub project: String,
    pub stats: ManifestStats,
}

impl Output for StatsResult {
    fn to_human(&self) -> String {
        format!("Project {}\n{}", self.project, human_stats(&self.stats))
    }
}

/// Show manifest statistics.
pub fn stats(dir: &Path) -> Result<StatsResult> {
    let store = ManifestStore::open(dir)?;
    let manifest = store.load()?;
    Ok(StatsResult {
        project: manifest.project.name,
        stats: manifest.stats,
    })
}

#[derive(Debug, Serialize)]
pub struct OverviewResult {
    pub name: &'static str,
    pub version: &'static str,
    pub initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ManifestStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

impl Output for OverviewResult {
    fn to_human(&self) -> String {
        match &self.stats {
            Some(stats) => format!("Cairn {}\n{}", self.version, human_stats(stats)),
            None => format!(
                "Cairn {}\nNo manifest here yet; run `cn init` to create one",
                self.version
            ),
        }
    }
}

/// Default output when `cn` runs with no subcommand.
pub fn overview(dir: &Path) -> OverviewResult {
    let stats = ManifestStore::open(dir)
        .and_then(|store| store.load())
        .map(|manifest| manifest.stats)
        .ok();
    let initialized = stats.is_some();
    OverviewResult {
        name: "cairn",
        version: env!("CARGO_PKG_VERSION"),
        initialized,
        stats,
        hint: if initialized {
            None
        } else {
            Some("run `cn init` to create a manifest")
        },
    }
}

fn human_stats(stats: &ManifestStats) -> String {
    format!(
        "{} task(s): {} pending, {} in progress, {} completed, {} blocked",
        stats.total_tasks, stats.pending, stats.in_progress, stats.completed, stats.blocked
    )
}
