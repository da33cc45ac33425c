//! Data models for Cairn entities.
//!
//! This module defines the core data structures:
//! - `Task` - Work items with status, dependencies, and metadata
//! - `Manifest` - The persisted aggregate: project info, derived stats, tasks
//! - `RawCandidate` - An unvalidated task proposal from an ingestion batch
//! - `DepRef` - A dependency reference, either a batch position or a task id

pub mod graph;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task status in the workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    /// All valid status values, in display order.
    pub fn all() -> &'static [TaskStatus] {
        &[
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Blocked,
        ]
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in-progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

/// How a task is expected to be verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStrategy {
    Tdd,
    Unit,
    Integration,
    Direct,
}

impl fmt::Display for TestStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestStrategy::Tdd => "tdd",
            TestStrategy::Unit => "unit",
            TestStrategy::Integration => "integration",
            TestStrategy::Direct => "direct",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TestStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tdd" => Ok(TestStrategy::Tdd),
            "unit" => Ok(TestStrategy::Unit),
            "integration" => Ok(TestStrategy::Integration),
            "direct" => Ok(TestStrategy::Direct),
            _ => Err(format!("Unknown test strategy: {}", s)),
        }
    }
}

/// Risk level attached to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(format!("Unknown risk level: {}", s)),
        }
    }
}

/// A unit of work tracked in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Canonical identifier (e.g., "TASK-001")
    pub id: String,

    /// Task title
    pub title: String,

    /// Detailed description
    pub description: String,

    /// Last-known status; "blocked" is re-derived from dependencies at read time
    #[serde(default)]
    pub status: TaskStatus,

    /// Canonical ids of tasks this task depends on
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Expected verification approach
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_strategy: Option<TestStrategy>,

    /// Risk level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskLevel>,

    /// Opaque rich-context payload, passed through unchanged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new pending task with the given id, title, and description.
    pub fn new(id: String, title: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            description,
            status: TaskStatus::default(),
            dependencies: Vec::new(),
            test_strategy: None,
            risk: None,
            context: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Project descriptor stored at the top of the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Project name
    pub name: String,

    /// Optional project description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// When the manifest was created
    pub created_at: DateTime<Utc>,
}

/// Per-status counts over the task sequence.
///
/// Never hand-edited; recomputed from the tasks on every commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestStats {
    pub total_tasks: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub blocked: usize,
}

impl ManifestStats {
    /// Compute stats as a pure function of the task sequence.
    pub fn compute(tasks: &[Task]) -> Self {
        let mut stats = Self {
            total_tasks: tasks.len(),
            ..Self::default()
        };
        for task in tasks {
            match task.status {
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Blocked => stats.blocked += 1,
            }
        }
        stats
    }
}

/// The persisted aggregate: project descriptor, derived stats, ordered tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub project: ProjectInfo,

    #[serde(default)]
    pub stats: ManifestStats,

    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Manifest {
    /// Create an empty manifest for a new project.
    pub fn new(name: String, description: Option<String>) -> Self {
        Self {
            project: ProjectInfo {
                name,
                description,
                created_at: Utc::now(),
            },
            stats: ManifestStats::default(),
            tasks: Vec::new(),
        }
    }

    /// Look up a task by id.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Look up a task by id, mutably.
    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Whether a task with the given id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    /// Recompute `stats` from the task sequence.
    pub fn refresh_stats(&mut self) {
        self.stats = ManifestStats::compute(&self.tasks);
    }

    /// Status with "blocked" derived from unmet dependencies.
    ///
    /// Completed and in-progress tasks keep their persisted status. A task
    /// that is otherwise workable is blocked while any dependency is not
    /// completed (a dangling reference counts as unmet).
    pub fn effective_status(&self, task: &Task) -> TaskStatus {
        match task.status {
            TaskStatus::Completed | TaskStatus::InProgress => task.status,
            TaskStatus::Pending | TaskStatus::Blocked => {
                let unmet = task.dependencies.iter().any(|dep| {
                    self.task(dep)
                        .map(|d| d.status != TaskStatus::Completed)
                        .unwrap_or(true)
                });
                if unmet {
                    TaskStatus::Blocked
                } else {
                    TaskStatus::Pending
                }
            }
        }
    }
}

/// A dependency reference inside an ingestion batch.
///
/// Candidates may reference each other by zero-based batch position before
/// identifiers exist; references to already-persisted tasks use the
/// canonical id. Resolution replaces both forms with canonical ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepRef {
    /// Zero-based position within the batch being ingested
    BatchIndex(u32),
    /// Canonical task identifier
    TaskRef(String),
}

impl fmt::Display for DepRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepRef::BatchIndex(i) => write!(f, "[{}]", i),
            DepRef::TaskRef(id) => write!(f, "{}", id),
        }
    }
}

/// An unvalidated task proposal, as submitted in an ingestion batch.
///
/// Field types are deliberately loose so that schema problems surface as
/// collected validation issues rather than parse failures. `dependencies`
/// stays a raw JSON value until the shape check runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCandidate {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub dependencies: Option<serde_json::Value>,

    #[serde(default)]
    pub test_strategy: Option<String>,

    #[serde(default, alias = "risk_level")]
    pub risk: Option<String>,

    #[serde(default)]
    pub context: Option<serde_json::Value>,
}
