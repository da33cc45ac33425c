//! Integration tests for transaction rollback via the CLI.

use predicates::prelude::*;

mod common;
use common::TestEnv;

/// Ingest a batch and return the transaction id from the JSON output.
fn ingest(env: &TestEnv, batch: &str) -> String {
    let output = env
        .cn()
        .arg("ingest")
        .write_stdin(batch.to_string())
        .output()
        .unwrap();
    assert!(output.status.success(), "ingest failed: {:?}", output);

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    value["transaction_id"].as_str().unwrap().to_string()
}

#[test]
fn test_rollback_removes_transaction_tasks() {
    let env = TestEnv::init();
    let txn = ingest(
        &env,
        r#"[{"title": "A", "description": "d"}, {"title": "B", "description": "d"}]"#,
    );

    env.cn()
        .args(["rollback", &txn])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"removed\":[\"TASK-001\",\"TASK-002\"]"))
        .stdout(predicate::str::contains("\"forced\":false"));

    env.cn()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_tasks\":0"));
}

#[test]
fn test_rollback_blocked_by_surviving_dependents() {
    let env = TestEnv::init();
    let first = ingest(&env, r#"[{"title": "A", "description": "d"}]"#);
    let second = ingest(
        &env,
        r#"[{"title": "B", "description": "d", "dependencies": ["TASK-001"]}]"#,
    );
    assert!(second > first, "transaction ids must increase lexically");

    env.cn()
        .args(["rollback", &first])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Rollback blocked"))
        .stderr(predicate::str::contains("\"dependents\":[\"TASK-002\"]"));

    // Refusal must not mutate the manifest.
    env.cn()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_tasks\":2"));
}

#[test]
fn test_forced_rollback_strips_dependency_references() {
    let env = TestEnv::init();
    let first = ingest(&env, r#"[{"title": "A", "description": "d"}]"#);
    ingest(
        &env,
        r#"[{"title": "B", "description": "d", "dependencies": ["TASK-001"]}]"#,
    );

    env.cn()
        .args(["rollback", &first, "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"forced\":true"));

    env.cn()
        .args(["task", "show", "TASK-002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dependencies\":[]"));
}

#[test]
fn test_rollback_twice_fails() {
    let env = TestEnv::init();
    let txn = ingest(&env, r#"[{"title": "A", "description": "d"}]"#);

    env.cn().args(["rollback", &txn]).assert().success();
    env.cn()
        .args(["rollback", &txn])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already reverted"));
}

#[test]
fn test_rollback_unknown_transaction() {
    let env = TestEnv::init();
    env.cn()
        .args(["rollback", "TXN-19990101-001"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("TXN-19990101-001"));
}

#[test]
fn test_rolled_back_id_is_not_reissued() {
    let env = TestEnv::init();
    let txn = ingest(&env, r#"[{"title": "A", "description": "d"}]"#);
    env.cn().args(["rollback", &txn]).assert().success();

    env.cn()
        .arg("ingest")
        .write_stdin(r#"[{"title": "B", "description": "d"}]"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"added\":[\"TASK-002\"]"));
}

#[test]
fn test_rollback_marks_record_reverted_in_history() {
    let env = TestEnv::init();
    let txn = ingest(&env, r#"[{"title": "A", "description": "d"}]"#);
    env.cn().args(["rollback", &txn]).assert().success();

    env.cn()
        .args(["history", &txn])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\":\"reverted\""))
        .stdout(predicate::str::contains("\"reverted_at\""));
}
