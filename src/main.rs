//! Cairn CLI - a task manifest manager for AI agents and humans.

use cairn::action_log;
use cairn::cli::{Cli, Commands, TaskCommands};
use cairn::commands::{self, Output};
use cairn::storage::find_project_root;
use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    // Determine project dir: --dir flag > CN_DIR env > nearest .cairn > cwd
    let dir = resolve_project_dir(cli.dir, human);

    // Serialize command for logging
    let (cmd_name, args_json) = describe_command(&cli.command);

    // Execute command
    let start = Instant::now();
    let result = run_command(cli.command, &dir, human);
    let duration = start.elapsed().as_millis() as u64;

    // Determine success/error
    let (success, error) = match &result {
        Ok(()) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    // Log the action (warns and continues on logging problems)
    action_log::log_action(&dir, &cmd_name, args_json, success, error, duration);

    if let Err(e) = result {
        report_error(&e, human);
        process::exit(exit_code(&e));
    }
}

/// Resolve the project directory.
///
/// An explicit path (via -C/--dir or CN_DIR) is used literally and must
/// exist. Otherwise the nearest ancestor containing a `.cairn` directory
/// wins, falling back to the current working directory.
fn resolve_project_dir(explicit: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit {
        Some(path) => {
            if !path.exists() {
                if human {
                    eprintln!("Error: Specified project dir does not exist: {}", path.display());
                } else {
                    eprintln!(
                        r#"{{"error": "Specified project dir does not exist: {}"}}"#,
                        path.display()
                    );
                }
                process::exit(1);
            }
            path
        }
        None => {
            let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            find_project_root(&cwd).unwrap_or(cwd)
        }
    }
}

fn run_command(
    command: Option<Commands>,
    dir: &std::path::Path,
    human: bool,
) -> Result<(), cairn::Error> {
    match command {
        None => {
            let result = commands::overview(dir);
            output(&result, human);
        }

        Some(Commands::Init { name, description }) => {
            let result = commands::init(dir, name, description)?;
            output(&result, human);
        }

        Some(Commands::Validate { file }) => {
            let result = commands::validate(dir, file.as_deref())?;
            output(&result, human);
        }

        Some(Commands::Ingest { file, source }) => {
            let result = commands::ingest_cmd(dir, file.as_deref(), &source)?;
            output(&result, human);
        }

        Some(Commands::Task { command }) => match command {
            TaskCommands::Add {
                title,
                description,
                depends_on,
                test_strategy,
                risk,
                source,
            } => {
                let result = commands::task_add(
                    dir,
                    title,
                    description,
                    depends_on,
                    test_strategy,
                    risk,
                    &source,
                )?;
                output(&result, human);
            }

            TaskCommands::List { status } => {
                let result = commands::task_list(dir, status.as_deref())?;
                output(&result, human);
            }

            TaskCommands::Show { id } => {
                let result = commands::task_show(dir, &id)?;
                output(&result, human);
            }

            TaskCommands::Status { id, status } => {
                let result = commands::task_status(dir, &id, &status)?;
                output(&result, human);
            }
        },

        Some(Commands::Ready) => {
            let result = commands::ready(dir)?;
            output(&result, human);
        }

        Some(Commands::Blocked) => {
            let result = commands::blocked(dir)?;
            output(&result, human);
        }

        Some(Commands::Rollback {
            transaction_id,
            force,
        }) => {
            let result = commands::rollback(dir, &transaction_id, force)?;
            output(&result, human);
        }

        Some(Commands::History { transaction_id }) => {
            let result = commands::history(dir, transaction_id.as_deref())?;
            output(&result, human);
        }

        Some(Commands::Stats) => {
            let result = commands::stats(dir)?;
            output(&result, human);
        }
    }

    Ok(())
}

/// Print a command result as JSON (default) or human-readable text.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Print an error to stderr, with structured detail where the error
/// carries it.
fn report_error(error: &cairn::Error, human: bool) {
    match error {
        cairn::Error::Validation(report) => {
            if human {
                eprintln!("Error: batch rejected with {} issue(s)", report.issues.len());
                for issue in &report.issues {
                    eprintln!("  - {}", issue.message);
                }
            } else {
                let envelope = serde_json::json!({
                    "error": "batch rejected",
                    "issues": report.issues,
                });
                eprintln!("{}", envelope);
            }
        }
        cairn::Error::RollbackConflict {
            transaction_id,
            dependents,
        } => {
            if human {
                eprintln!("Error: {}", error);
                for id in dependents {
                    eprintln!("  - {}", id);
                }
            } else {
                let envelope = serde_json::json!({
                    "error": error.to_string(),
                    "transaction_id": transaction_id,
                    "dependents": dependents,
                });
                eprintln!("{}", envelope);
            }
        }
        _ => {
            if human {
                eprintln!("Error: {}", error);
            } else {
                let envelope = serde_json::json!({ "error": error.to_string() });
                eprintln!("{}", envelope);
            }
        }
    }
}

/// Map errors onto the CLI's exit codes.
///
/// 0 success, 2 batch rejected (schema/dependency/circular or malformed
/// input), 3 rollback blocked, 4 persistence failure, 1 anything else.
fn exit_code(error: &cairn::Error) -> i32 {
    match error {
        cairn::Error::Validation(_) | cairn::Error::InvalidInput(_) => 2,
        cairn::Error::RollbackConflict { .. } => 3,
        cairn::Error::Io(_) | cairn::Error::Json(_) => 4,
        _ => 1,
    }
}

/// Produce a command name and sanitized argument payload for the action log.
fn describe_command(command: &Option<Commands>) -> (String, serde_json::Value) {
    match command {
        None => ("overview".to_string(), serde_json::json!({})),
        Some(Commands::Init { name, description }) => (
            "init".to_string(),
            serde_json::json!({ "name": name, "description": description }),
        ),
        Some(Commands::Validate { file }) => (
            "validate".to_string(),
            serde_json::json!({ "file": file.as_ref().map(|p| p.display().to_string()) }),
        ),
        Some(Commands::Ingest { file, source }) => (
            "ingest".to_string(),
            serde_json::json!({
                "file": file.as_ref().map(|p| p.display().to_string()),
                "source": source,
            }),
        ),
        Some(Commands::Task { command }) => match command {
            TaskCommands::Add { title, depends_on, .. } => (
                "task add".to_string(),
                serde_json::json!({ "title": title, "depends_on": depends_on }),
            ),
            TaskCommands::List { status } => (
                "task list".to_string(),
                serde_json::json!({ "status": status }),
            ),
            TaskCommands::Show { id } => {
                ("task show".to_string(), serde_json::json!({ "id": id }))
            }
            TaskCommands::Status { id, status } => (
                "task status".to_string(),
                serde_json::json!({ "id": id, "status": status }),
            ),
        },
        Some(Commands::Ready) => ("ready".to_string(), serde_json::json!({})),
        Some(Commands::Blocked) => ("blocked".to_string(), serde_json::json!({})),
        Some(Commands::Rollback {
            transaction_id,
            force,
        }) => (
            "rollback".to_string(),
            serde_json::json!({ "transaction_id": transaction_id, "force": force }),
        ),
        Some(Commands::History { transaction_id }) => (
            "history".to_string(),
            serde_json::json!({ "transaction_id": transaction_id }),
        ),
        Some(Commands::Stats) => ("stats".to_string(), serde_json::json!({})),
    }
}
