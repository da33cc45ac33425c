//! Candidate normalization and schema validation.
//!
//! Normalization is the single place defaults are applied; the validator
//! then checks required fields and enumerated values. Validation collects
//! every violation for a record, but the batch fails closed at the first
//! record with any violation.

use crate::ingest::{ValidationIssue, ValidationReport};
use crate::models::{DepRef, RawCandidate, RiskLevel, TaskStatus, TestStrategy};

/// A candidate that passed schema validation, with typed fields.
#[derive(Debug, Clone)]
pub struct ValidCandidate {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub dependencies: Vec<DepRef>,
    pub test_strategy: Option<TestStrategy>,
    pub risk: Option<RiskLevel>,
    pub context: Option<serde_json::Value>,
}

/// Apply defaults to a batch of raw candidates.
///
/// Missing `status` becomes `pending`; missing `dependencies` becomes an
/// empty array. All other fields pass through untouched, so every default
/// the pipeline applies is visible here.
pub fn normalize(raw: &[RawCandidate]) -> Vec<RawCandidate> {
    raw.iter()
        .map(|c| {
            let mut c = c.clone();
            if c.status.is_none() {
                c.status = Some(TaskStatus::Pending.to_string());
            }
            if c.dependencies.is_none() {
                c.dependencies = Some(serde_json::Value::Array(Vec::new()));
            }
            c
        })
        .collect()
}

/// Validate a normalized batch against the task schema.
///
/// Returns typed candidates on success. On failure the report carries every
/// violation found in the first failing record; later records are not
/// examined and no resolution or allocation happens downstream.
pub fn validate(batch: &[RawCandidate]) -> Result<Vec<ValidCandidate>, ValidationReport> {
    let mut valid = Vec::with_capacity(batch.len());

    for (index, candidate) in batch.iter().enumerate() {
        let mut issues = Vec::new();

        let title = match &candidate.title {
            Some(t) if !t.trim().is_empty() => Some(t.clone()),
            Some(_) => {
                issues.push(ValidationIssue::schema(index, "title", "title must not be empty"));
                None
            }
            None => {
                issues.push(ValidationIssue::schema(index, "title", "title is required"));
                None
            }
        };

        let description = match &candidate.description {
            Some(d) if !d.trim().is_empty() => Some(d.clone()),
            Some(_) => {
                issues.push(ValidationIssue::schema(
                    index,
                    "description",
                    "description must not be empty",
                ));
                None
            }
            None => {
                issues.push(ValidationIssue::schema(
                    index,
                    "description",
                    "description is required",
                ));
                None
            }
        };

        // Normalization guarantees status is present.
        let status = match candidate.status.as_deref().unwrap_or_default().parse::<TaskStatus>() {
            Ok(s) => Some(s),
            Err(e) => {
                issues.push(ValidationIssue::schema(index, "status", &e));
                None
            }
        };

        let test_strategy = match &candidate.test_strategy {
            Some(raw) => match raw.parse::<TestStrategy>() {
                Ok(s) => Some(s),
                Err(e) => {
                    issues.push(ValidationIssue::schema(index, "test_strategy", &e));
                    None
                }
            },
            None => None,
        };

        let risk = match &candidate.risk {
            Some(raw) => match raw.parse::<RiskLevel>() {
                Ok(r) => Some(r),
                Err(e) => {
                    issues.push(ValidationIssue::schema(index, "risk", &e));
                    None
                }
            },
            None => None,
        };

        let dependencies = match parse_dependencies(candidate.dependencies.as_ref()) {
            Ok(deps) => Some(deps),
            Err(msg) => {
                issues.push(ValidationIssue::schema(index, "dependencies", &msg));
                None
            }
        };

        // Fail closed: the first bad record rejects the whole batch.
        if !issues.is_empty() {
            return Err(ValidationReport { issues });
        }

        valid.push(ValidCandidate {
            title: title.unwrap(),
            description: description.unwrap(),
            status: status.unwrap(),
            dependencies: dependencies.unwrap(),
            test_strategy,
            risk,
            context: candidate.context.clone(),
        });
    }

    Ok(valid)
}

/// Check the shape of a raw `dependencies` value.
///
/// Must be an array whose elements are non-negative integers (batch-local
/// indices) or strings (task identifiers).
fn parse_dependencies(raw: Option<&serde_json::Value>) -> Result<Vec<DepRef>, String> {
    let items = match raw {
        // Normalization fills absent dependencies with an empty array.
        None => return Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => items,
        Some(other) => {
            return Err(format!(
                "dependencies must be an array, got {}",
                json_type_name(other)
            ))
        }
    };

    let mut deps = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            serde_json::Value::Number(n) => match n.as_u64() {
                Some(v) if u32::try_from(v).is_ok() => deps.push(DepRef::BatchIndex(v as u32)),
                _ => {
                    return Err(format!(
                        "dependency at position {} must be a non-negative integer or a task id",
                        i
                    ))
                }
            },
            serde_json::Value::String(s) => deps.push(DepRef::TaskRef(s.clone())),
            other => {
                return Err(format!(
                    "dependency at position {} must be an integer or a string, got {}",
                    i,
                    json_type_name(other)
                ))
            }
        }
    }

    Ok(deps)
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
