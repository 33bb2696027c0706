use std::path::Path;

use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn devpool_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("devpool").expect("devpool binary");
    cmd.current_dir(dir)
        .env_remove("GITHUB_TOKEN")
        .env("DEVPOOL_GITHUB_TOKEN", "test-token")
        .env("RUST_LOG", "warn");
    cmd
}

fn write_config(dir: &Path, server: &MockServer) {
    let yaml = format!(
        "devpool:\n  owner: o\n  repo: devpool\n\
         partners:\n  urls:\n    - https://github.com/acme/widgets\n\
         retry:\n  max_attempts: 1\n  base_delay_ms: 0\n\
         statistics:\n  local_path: stats.json\n\
         github:\n  api_url: {}\n",
        server.base_url()
    );
    std::fs::write(dir.join("devpool.yaml"), yaml).unwrap();
}

fn source_issue() -> Value {
    json!({
        "node_id": "I_kw1",
        "number": 3,
        "title": "Fix the widget",
        "body": "It is broken.",
        "state": "open",
        "labels": [{ "name": "Price: 100 USD" }, { "name": "Time: <1 Day" }],
        "html_url": "https://github.com/acme/widgets/issues/3",
        "assignee": null,
        "assignees": []
    })
}

fn mirror_issue() -> Value {
    json!({
        "node_id": "I_mirror1",
        "number": 1,
        "title": "Fix the widget",
        "body": "https://github.com/acme/widgets/issues/3",
        "state": "open",
        "labels": [
            { "name": "id: I_kw1" },
            { "name": "Partner: acme/widgets" },
            { "name": "Pricing: 100 USD" },
            { "name": "Time: <1 Day" }
        ],
        "html_url": "https://github.com/o/devpool/issues/1"
    })
}

/// Mocks for a devpool with no mirrors and one priced partner issue.
fn mock_tracker(server: &MockServer, devpool_issues: Value) {
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/devpool");
        then.status(200).json_body(json!({
            "name": "devpool",
            "owner": { "login": "o" },
            "fork": false,
            "archived": false
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/devpool/issues");
        then.status(200).json_body(devpool_issues);
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets/issues");
        then.status(200).json_body(json!([source_issue()]));
    });
}

#[test]
fn help_lists_subcommands() {
    let tmp = TempDir::new().unwrap();
    devpool_cmd(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("stats"));
}

#[test]
fn init_scaffolds_and_refuses_overwrite() {
    let tmp = TempDir::new().unwrap();
    devpool_cmd(tmp.path())
        .args(["init", "ubiquity/devpool-directory"])
        .assert()
        .success()
        .stdout(predicate::str::contains("devpool.yaml"));

    let written = std::fs::read_to_string(tmp.path().join("devpool.yaml")).unwrap();
    assert!(written.contains("owner: ubiquity"));
    assert!(written.contains("repo: devpool-directory"));

    devpool_cmd(tmp.path())
        .args(["init", "ubiquity/other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    let after = std::fs::read_to_string(tmp.path().join("devpool.yaml")).unwrap();
    assert_eq!(written, after);
}

#[test]
fn init_accepts_url_and_custom_path() {
    let tmp = TempDir::new().unwrap();
    devpool_cmd(tmp.path())
        .args([
            "--config",
            "conf/pool.yaml",
            "init",
            "https://github.com/ubiquity/devpool-directory",
        ])
        .assert()
        .success();
    assert!(tmp.path().join("conf/pool.yaml").exists());
}

#[test]
fn init_rejects_non_repository() {
    let tmp = TempDir::new().unwrap();
    devpool_cmd(tmp.path())
        .args(["init", "just-an-owner"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected owner/repo"));
    assert!(!tmp.path().join("devpool.yaml").exists());
}

#[test]
fn sync_without_config_points_at_init() {
    let tmp = TempDir::new().unwrap();
    devpool_cmd(tmp.path())
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("devpool init"));
}

#[test]
fn dry_run_sync_reports_and_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let server = MockServer::start();
    mock_tracker(&server, json!([]));
    let create = server.mock(|when, then| {
        when.method(POST).path("/repos/o/devpool/issues");
        then.status(201).json_body(mirror_issue());
    });
    write_config(tmp.path(), &server);

    let output = devpool_cmd(tmp.path())
        .args(["sync", "--dry-run", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["outcomes"][0]["action"], "would_create");
    assert_eq!(report["outcomes"][0]["identity"], "I_kw1");
    assert_eq!(report["published"][0]["status"], "would_write");

    create.assert_hits(0);
    assert!(!tmp.path().join("stats.json").exists());
    assert!(!tmp.path().join(".devpool/announcements.json").exists());
}

#[test]
fn sync_creates_mirror_and_writes_statistics() {
    let tmp = TempDir::new().unwrap();
    let server = MockServer::start();
    mock_tracker(&server, json!([]));
    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/o/devpool/issues")
            .header("Authorization", "Bearer test-token")
            .json_body_partial(r#"{"title": "Fix the widget"}"#);
        then.status(201).json_body(mirror_issue());
    });
    write_config(tmp.path(), &server);

    devpool_cmd(tmp.path())
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 created"));

    create.assert_hits(1);
    let stats: Value =
        serde_json::from_str(&std::fs::read_to_string(tmp.path().join("stats.json")).unwrap())
            .unwrap();
    assert_eq!(stats["total_reward"], "100");
    assert_eq!(stats["total_tasks"], 1);
    assert!(tmp.path().join(".devpool/announcements.json").exists());
}

#[test]
fn sync_fails_when_partner_cannot_be_fetched() {
    let tmp = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/devpool");
        then.status(200).json_body(json!({
            "name": "devpool",
            "owner": { "login": "o" },
            "fork": false,
            "archived": false
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/devpool/issues");
        then.status(200).json_body(json!([]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets/issues");
        then.status(404).json_body(json!({ "message": "Not Found" }));
    });
    write_config(tmp.path(), &server);

    devpool_cmd(tmp.path())
        .arg("sync")
        .assert()
        .failure()
        .stdout(predicate::str::contains("acme/widgets"))
        .stderr(predicate::str::contains("finished with failures"));
}

#[test]
fn stats_json_counts_open_priced_mirrors() {
    let tmp = TempDir::new().unwrap();
    let server = MockServer::start();
    mock_tracker(&server, json!([mirror_issue()]));
    write_config(tmp.path(), &server);

    let output = devpool_cmd(tmp.path())
        .args(["stats", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stats: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["total_reward"], "100");
    assert_eq!(stats["unassigned_tasks"], 1);
    assert_eq!(stats["assigned_tasks"], 0);
}
