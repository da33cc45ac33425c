//! CLI argument definitions for Cairn.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cairn - a task manifest manager for AI agents and humans.
///
/// Start with `cn init`, then `cn ready` to find workable tasks and
/// `cn ingest` to load a generated batch.
#[derive(Parser, Debug)]
#[command(name = "cn")]
#[command(author, version, about = "A CLI tool for AI agents and humans to manage task manifests", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if cn was started in <path> instead of the current directory.
    /// The path must exist and is used literally (no project-root search).
    /// Can also be set via the CN_DIR environment variable.
    #[arg(short = 'C', long = "dir", global = true, env = "CN_DIR")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a task manifest for this project
    Init {
        /// Project name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,

        /// Project description
        #[arg(long)]
        description: Option<String>,
    },

    /// Validate a batch of candidate tasks without committing anything
    ///
    /// Reads a JSON array of candidates (or {"tasks": [...]}) from FILE,
    /// or from stdin when FILE is omitted.
    Validate {
        /// Batch file (defaults to stdin)
        file: Option<PathBuf>,
    },

    /// Validate and commit a batch of candidate tasks as one transaction
    Ingest {
        /// Batch file (defaults to stdin)
        file: Option<PathBuf>,

        /// Where the batch came from, recorded in the transaction log
        #[arg(long, default_value = "manual")]
        source: String,
    },

    /// Task management commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Show tasks ready to work on (no incomplete dependencies)
    Ready,

    /// Show tasks waiting on dependencies
    Blocked,

    /// Remove every task added by a transaction
    Rollback {
        /// Transaction id (e.g., TXN-20260805-001)
        transaction_id: String,

        /// Proceed even if surviving tasks depend on the removed ones
        #[arg(long)]
        force: bool,
    },

    /// Show recorded ingestion transactions
    History {
        /// Optional transaction id to show a single record
        transaction_id: Option<String>,
    },

    /// Show manifest statistics
    Stats,
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a single task (a batch of one)
    Add {
        /// Task title
        title: String,

        /// Detailed description
        #[arg(long)]
        description: String,

        /// Canonical ids of tasks this task depends on
        #[arg(long = "depends-on", value_name = "ID")]
        depends_on: Vec<String>,

        /// Verification approach (tdd, unit, integration, direct)
        #[arg(long)]
        test_strategy: Option<String>,

        /// Risk level (low, medium, high)
        #[arg(long)]
        risk: Option<String>,

        /// Source recorded in the transaction log
        #[arg(long, default_value = "task add")]
        source: String,
    },

    /// List tasks, optionally filtered by status
    List {
        /// Filter by status (pending, in-progress, completed, blocked)
        #[arg(long)]
        status: Option<String>,
    },

    /// Show a task by id
    Show {
        /// Task id (e.g., TASK-001)
        id: String,
    },

    /// Set a task's status
    Status {
        /// Task id (e.g., TASK-001)
        id: String,

        /// New status (pending, in-progress, completed, blocked)
        status: String,
    },
}
