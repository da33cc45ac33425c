//! Dependency resolution for ingestion batches.
//!
//! Replaces every dependency reference with a canonical identifier.
//! Batch-local indices translate through the speculative identifier
//! sequence; string references must name an existing or in-batch task.

use std::collections::HashSet;

use crate::ingest::schema::ValidCandidate;
use crate::ingest::{ValidationIssue, ValidationReport};
use crate::models::{DepRef, Manifest, TaskStatus};

/// Resolve each candidate's dependencies to canonical identifiers.
///
/// `batch_ids` is the speculative identifier sequence for the batch, in
/// batch order. Returns one resolved dependency list per candidate, with
/// order kept and duplicates dropped. All dependency errors across the
/// batch are collected before failing:
///
/// - a string reference to an id that is neither in the manifest nor in
///   the batch does not resolve
/// - a reference to an already-completed task cannot model an ordering
///   constraint and is rejected as a distinct error class
/// - a batch index outside `[0, batch_len)` is out of bounds
pub fn resolve(
    manifest: &Manifest,
    batch: &[ValidCandidate],
    batch_ids: &[String],
) -> Result<Vec<Vec<String>>, ValidationReport> {
    let mut issues = Vec::new();
    let mut resolved = Vec::with_capacity(batch.len());

    for (index, candidate) in batch.iter().enumerate() {
        let mut deps = Vec::with_capacity(candidate.dependencies.len());
        let mut seen: HashSet<String> = HashSet::new();

        for dep in &candidate.dependencies {
            let id = match dep {
                DepRef::TaskRef(id) => {
                    if batch_ids.iter().any(|b| b == id) {
                        Some(id.clone())
                    } else if let Some(existing) = manifest.task(id) {
                        if existing.status == TaskStatus::Completed {
                            issues.push(ValidationIssue::dependency(
                                index,
                                &format!(
                                    "task \"{}\" depends on {} which is already completed",
                                    candidate.title, id
                                ),
                            ));
                            None
                        } else {
                            Some(id.clone())
                        }
                    } else {
                        issues.push(ValidationIssue::dependency(
                            index,
                            &format!(
                                "task \"{}\" depends on {} which does not exist",
                                candidate.title, id
                            ),
                        ));
                        None
                    }
                }
                DepRef::BatchIndex(i) => {
                    let i = *i as usize;
                    if i < batch_ids.len() {
                        Some(batch_ids[i].clone())
                    } else {
                        issues.push(ValidationIssue::dependency(
                            index,
                            &format!(
                                "task \"{}\" references batch index {} but the batch has {} task(s)",
                                candidate.title,
                                i,
                                batch_ids.len()
                            ),
                        ));
                        None
                    }
                }
            };

            if let Some(id) = id {
                if seen.insert(id.clone()) {
                    deps.push(id);
                }
            }
        }

        resolved.push(deps);
    }

    if issues.is_empty() {
        Ok(resolved)
    } else {
        Err(ValidationReport { issues })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::IssueKind;
    use crate::models::Task;

    fn candidate(title: &str, deps: Vec<DepRef>) -> ValidCandidate {
        ValidCandidate {
            title: title.to_string(),
            description: "d".to_string(),
            status: TaskStatus::Pending,
            dependencies: deps,
            test_strategy: None,
            risk: None,
            context: None,
        }
    }

    fn manifest_with(tasks: Vec<Task>) -> Manifest {
        let mut m = Manifest::new("p".into(), None);
        m.tasks = tasks;
        m.refresh_stats();
        m
    }

    #[test]
    fn test_resolve_batch_index() {
        let manifest = manifest_with(vec![]);
        let batch = vec![
            candidate("A", vec![]),
            candidate("B", vec![DepRef::BatchIndex(0)]),
        ];
        let ids = vec!["TASK-001".to_string(), "TASK-002".to_string()];

        let resolved = resolve(&manifest, &batch, &ids).unwrap();
        assert!(resolved[0].is_empty());
        assert_eq!(resolved[1], vec!["TASK-001".to_string()]);
    }

    #[test]
    fn test_resolve_existing_reference() {
        let manifest = manifest_with(vec![Task::new("TASK-001".into(), "E".into(), "d".into())]);
        let batch = vec![candidate("A", vec![DepRef::TaskRef("TASK-001".into())])];
        let ids = vec!["TASK-002".to_string()];

        let resolved = resolve(&manifest, &batch, &ids).unwrap();
        assert_eq!(resolved[0], vec!["TASK-001".to_string()]);
    }

    #[test]
    fn test_resolve_mixed_references() {
        let manifest = manifest_with(vec![Task::new("TASK-050".into(), "E".into(), "d".into())]);
        let batch = vec![
            candidate("A", vec![]),
            candidate(
                "B",
                vec![DepRef::BatchIndex(0), DepRef::TaskRef("TASK-050".into())],
            ),
        ];
        let ids = vec!["TASK-051".to_string(), "TASK-052".to_string()];

        let resolved = resolve(&manifest, &batch, &ids).unwrap();
        assert_eq!(
            resolved[1],
            vec!["TASK-051".to_string(), "TASK-050".to_string()]
        );
    }

    #[test]
    fn test_resolve_unknown_reference() {
        let manifest = manifest_with(vec![]);
        let batch = vec![candidate("A", vec![DepRef::TaskRef("TASK-999".into())])];
        let ids = vec!["TASK-001".to_string()];

        let report = resolve(&manifest, &batch, &ids).unwrap_err();
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::Dependency);
        assert!(report.issues[0].message.contains("TASK-999"));
        assert!(report.issues[0].message.contains("does not exist"));
    }

    #[test]
    fn test_resolve_completed_reference_is_distinct_error() {
        let mut done = Task::new("TASK-001".into(), "E".into(), "d".into());
        done.status = TaskStatus::Completed;
        let manifest = manifest_with(vec![done]);
        let batch = vec![candidate("A", vec![DepRef::TaskRef("TASK-001".into())])];
        let ids = vec!["TASK-002".to_string()];

        let report = resolve(&manifest, &batch, &ids).unwrap_err();
        assert_eq!(report.issues[0].kind, IssueKind::Dependency);
        assert!(report.issues[0].message.contains("already completed"));
    }

    #[test]
    fn test_resolve_out_of_bounds_index_names_index_and_task() {
        let manifest = manifest_with(vec![]);
        let batch = vec![candidate("Alpha", vec![DepRef::BatchIndex(5)])];
        let ids = vec!["TASK-001".to_string()];

        let report = resolve(&manifest, &batch, &ids).unwrap_err();
        assert!(report.issues[0].message.contains("Alpha"));
        assert!(report.issues[0].message.contains("batch index 5"));
    }

    #[test]
    fn test_resolve_collects_errors_across_batch() {
        let manifest = manifest_with(vec![]);
        let batch = vec![
            candidate("A", vec![DepRef::TaskRef("TASK-888".into())]),
            candidate("B", vec![DepRef::TaskRef("TASK-999".into())]),
        ];
        let ids = vec!["TASK-001".to_string(), "TASK-002".to_string()];

        let report = resolve(&manifest, &batch, &ids).unwrap_err();
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].index, Some(0));
        assert_eq!(report.issues[1].index, Some(1));
    }

    #[test]
    fn test_resolve_deduplicates_preserving_order() {
        let manifest = manifest_with(vec![]);
        let batch = vec![
            candidate("A", vec![]),
            candidate(
                "B",
                vec![
                    DepRef::BatchIndex(0),
                    DepRef::TaskRef("TASK-001".into()),
                    DepRef::BatchIndex(0),
                ],
            ),
        ];
        // Index 0 and the literal id resolve to the same task.
        let ids = vec!["TASK-001".to_string(), "TASK-002".to_string()];

        let resolved = resolve(&manifest, &batch, &ids).unwrap();
        assert_eq!(resolved[1], vec!["TASK-001".to_string()]);
    }
}
