//! Integration tests for batch validation via the CLI.
//!
//! Validation runs the full pipeline without committing: the manifest must
//! be untouched whatever the outcome.

use predicates::prelude::*;

mod common;
use common::TestEnv;

#[test]
fn test_validate_success_reports_ids_and_next() {
    let env = TestEnv::init();
    env.seed_two_tasks();

    let batch = env.write_batch(
        "batch.json",
        r#"[
            {"title": "X", "description": "d"},
            {"title": "Y", "description": "d", "dependencies": [0]}
        ]"#,
    );

    env.cn()
        .args(["validate", batch.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\":true"))
        .stdout(predicate::str::contains("\"count\":2"))
        .stdout(predicate::str::contains("\"next_id\":\"TASK-005\""))
        .stdout(predicate::str::contains("\"id\":\"TASK-003\""))
        .stdout(predicate::str::contains("\"dependencies\":[\"TASK-003\"]"));
}

#[test]
fn test_validate_does_not_commit() {
    let env = TestEnv::init();
    env.seed_two_tasks();

    let batch = env.write_batch("batch.json", r#"[{"title": "X", "description": "d"}]"#);
    env.cn()
        .args(["validate", batch.to_str().unwrap()])
        .assert()
        .success();

    env.cn()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_tasks\":2"));
    env.cn()
        .args(["task", "show", "TASK-003"])
        .assert()
        .failure();
}

#[test]
fn test_validate_unknown_dependency() {
    let env = TestEnv::init();
    env.seed_two_tasks();

    let batch = env.write_batch(
        "batch.json",
        r#"[{"title": "A", "description": "d", "dependencies": ["TASK-999"]}]"#,
    );

    env.cn()
        .args(["validate", batch.to_str().unwrap()])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("\"kind\":\"dependency\""))
        .stderr(predicate::str::contains("TASK-999"));

    env.cn()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_tasks\":2"));
}

#[test]
fn test_validate_completed_dependency_is_distinct_error() {
    let env = TestEnv::init();
    env.seed_two_tasks();

    let batch = env.write_batch(
        "batch.json",
        r#"[{"title": "A", "description": "d", "dependencies": ["TASK-001"]}]"#,
    );

    env.cn()
        .args(["validate", batch.to_str().unwrap()])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("already completed"))
        .stderr(predicate::str::contains("TASK-001"));
}

#[test]
fn test_validate_pending_dependency_is_fine() {
    let env = TestEnv::init();
    env.seed_two_tasks();

    let batch = env.write_batch(
        "batch.json",
        r#"[{"title": "A", "description": "d", "dependencies": ["TASK-002"]}]"#,
    );

    env.cn()
        .args(["validate", batch.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dependencies\":[\"TASK-002\"]"));
}

#[test]
fn test_validate_schema_errors_are_collected_per_record() {
    let env = TestEnv::init();

    let batch = env.write_batch(
        "batch.json",
        r#"[{"status": "done", "risk": "extreme"}]"#,
    );

    env.cn()
        .args(["validate", batch.to_str().unwrap()])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("\"field\":\"title\""))
        .stderr(predicate::str::contains("\"field\":\"description\""))
        .stderr(predicate::str::contains("\"field\":\"status\""))
        .stderr(predicate::str::contains("\"field\":\"risk\""));
}

#[test]
fn test_validate_out_of_bounds_index() {
    let env = TestEnv::init();

    let batch = env.write_batch(
        "batch.json",
        r#"[{"title": "Alpha", "description": "d", "dependencies": [7]}]"#,
    );

    env.cn()
        .args(["validate", batch.to_str().unwrap()])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("batch index 7"))
        .stderr(predicate::str::contains("Alpha"));
}

#[test]
fn test_validate_rejected_batch_is_idempotent() {
    let env = TestEnv::init();

    let batch = env.write_batch(
        "batch.json",
        r#"[{"title": "", "description": "", "risk": "extreme"}]"#,
    );

    let first = env
        .cn()
        .args(["validate", batch.to_str().unwrap()])
        .output()
        .unwrap();
    let second = env
        .cn()
        .args(["validate", batch.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!first.status.success());
    assert_eq!(first.stderr, second.stderr);
}

#[test]
fn test_validate_human_output() {
    let env = TestEnv::init();

    let batch = env.write_batch("batch.json", r#"[{"title": "X", "description": "d"}]"#);
    env.cn()
        .args(["validate", batch.to_str().unwrap(), "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Batch OK: 1 task(s)"))
        .stdout(predicate::str::contains("TASK-001 X"));
}
