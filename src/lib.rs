//! Cairn - a task manifest library for AI agents and humans.
//!
//! This library provides the core functionality for the `cn` CLI tool:
//! batch validation, dependency resolution, cycle detection, identifier
//! allocation, atomic manifest persistence, and reversible transactions.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod ingest;
pub mod models;
pub mod storage;

/// Library-level error type for Cairn operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not initialized: run `cn init` first")]
    NotInitialized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The batch was rejected; carries every collected issue.
    #[error("{0}")]
    Validation(crate::ingest::ValidationReport),

    /// Surviving tasks outside the transaction depend on tasks it added.
    #[error("Rollback blocked: {} surviving task(s) depend on tasks added by {transaction_id}", dependents.len())]
    RollbackConflict {
        transaction_id: String,
        dependents: Vec<String>,
    },

    #[error("Transaction already reverted: {0}")]
    AlreadyReverted(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Cairn operations.
pub type Result<T> = std::result::Result<T, Error>;
