//! Action logging for Cairn commands.
//!
//! Every CLI invocation is appended to a structured JSONL log under the
//! user data directory, giving agents and humans an audit trail across
//! projects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Project path the command ran against
    pub project_path: String,

    /// Command name (e.g., "ingest", "rollback", "task add")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

/// Log an action to the configured log file.
///
/// This function never fails the command it logs: problems are reported as
/// warnings on stderr and otherwise ignored. Set `CN_ACTION_LOG=off` to
/// disable logging, `CN_ACTION_LOG_PATH` to change the destination.
pub fn log_action(
    project_path: &Path,
    command: &str,
    args: serde_json::Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    if !enabled() {
        return;
    }

    let log_path = match get_log_path() {
        Some(path) => path,
        None => {
            eprintln!("Warning: Failed to determine action log path");
            return;
        }
    };

    let entry = ActionLog {
        timestamp: Utc::now(),
        project_path: project_path.to_string_lossy().to_string(),
        command: command.to_string(),
        args: sanitize_args(&args),
        success,
        error,
        duration_ms,
        user: get_current_user(),
    };

    if let Err(e) = write_log_entry(&log_path, &entry) {
        eprintln!("Warning: Failed to write action log: {}", e);
    }
}

fn enabled() -> bool {
    match std::env::var("CN_ACTION_LOG") {
        Ok(v) => !matches!(v.to_lowercase().as_str(), "off" | "0" | "false" | "no"),
        Err(_) => true,
    }
}

/// Get the log file path: `CN_ACTION_LOG_PATH` if set, else the default
/// under the user data directory.
fn get_log_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CN_ACTION_LOG_PATH") {
        return Some(PathBuf::from(path));
    }
    let home = dirs::home_dir()?;
    Some(home.join(".local/share/cairn/action.log"))
}

/// Write a log entry to the log file.
fn write_log_entry(path: &Path, entry: &ActionLog) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;

    Ok(())
}

/// Sanitize arguments to remove sensitive data.
fn sanitize_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, value) in map {
                let key_lower = key.to_lowercase();
                if key_lower.contains("password")
                    || key_lower.contains("token")
                    || key_lower.contains("secret")
                {
                    sanitized.insert(
                        key.clone(),
                        serde_json::Value::String("[REDACTED]".to_string()),
                    );
                } else {
                    sanitized.insert(key.clone(), sanitize_args(value));
                }
            }
            serde_json::Value::Object(sanitized)
        }
        serde_json::Value::Array(arr) => {
            if arr.len() > 10 {
                // Summarize large arrays
                serde_json::Value::String(format!("[Array with {} items]", arr.len()))
            } else {
                serde_json::Value::Array(arr.iter().map(sanitize_args).collect())
            }
        }
        serde_json::Value::String(s) => {
            if s.len() > 100 {
                serde_json::Value::String(format!("{}... ({} chars)", &s[..97], s.len()))
            } else {
                args.clone()
            }
        }
        _ => args.clone(),
    }
}

/// Get the current user's username.
fn get_current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
