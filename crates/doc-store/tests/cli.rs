use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use uuid::Uuid;

fn dstore_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dstore"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/dstore.sqlite"

[chunking]
max_tokens = 8

[search]
default_language = "en"
default_limit = 10
"#,
        root.display()
    );

    let config_path = config_dir.join("dstore.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_dstore(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = dstore_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run dstore binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// `put` a document and return its id parsed from `created <id>#<index>`.
fn put(config_path: &Path, developer: &str, extra: &[&str]) -> String {
    let mut args = vec![
        "put",
        "--developer",
        developer,
        "--embedding-model",
        "voyage-3",
        "--embedding-dimensions",
        "1024",
    ];
    args.extend_from_slice(extra);
    let (stdout, stderr, success) = run_dstore(config_path, &args);
    assert!(success, "put failed: stdout={}, stderr={}", stdout, stderr);
    let line = stdout.lines().next().unwrap();
    let id = line
        .trim_start_matches("created ")
        .split('#')
        .next()
        .unwrap();
    id.to_string()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_dstore(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/dstore.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_dstore(&config_path, &["init"]);
    assert!(success1, "First init failed");
    let (_, _, success2) = run_dstore(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_put_get_search_round_trip() {
    let (_tmp, config_path) = setup_test_env();
    run_dstore(&config_path, &["init"]);
    let dev = Uuid::new_v4().to_string();

    let id = put(
        &config_path,
        &dev,
        &[
            "--title",
            "Mint julep",
            "--content",
            "Bourbon, sugar and fresh mint.",
            "--metadata",
            r#"{"kind":"recipe"}"#,
        ],
    );

    let (stdout, _, success) = run_dstore(&config_path, &["get", "--developer", &dev, "--doc", &id]);
    assert!(success);
    assert!(stdout.contains("Mint julep"));
    assert!(stdout.contains("recipe"));

    let (stdout, _, success) =
        run_dstore(&config_path, &["search", "--developer", &dev, "julpe", "--explain"]);
    assert!(success);
    assert!(stdout.contains("1. ["), "expected a hit, got: {}", stdout);
    assert!(stdout.contains(&id));
    assert!(stdout.contains("exact: 0"));
}

#[test]
fn test_search_is_tenant_scoped() {
    let (_tmp, config_path) = setup_test_env();
    run_dstore(&config_path, &["init"]);
    let owner_dev = Uuid::new_v4().to_string();
    let other_dev = Uuid::new_v4().to_string();
    put(
        &config_path,
        &owner_dev,
        &["--title", "Secret plans", "--content", "hidden"],
    );

    let (stdout, _, success) =
        run_dstore(&config_path, &["search", "--developer", &other_dev, "secret"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_unsupported_language_fails_without_writing() {
    let (_tmp, config_path) = setup_test_env();
    run_dstore(&config_path, &["init"]);
    let dev = Uuid::new_v4().to_string();
    let doc = Uuid::new_v4().to_string();

    let (_, stderr, success) = run_dstore(
        &config_path,
        &[
            "put",
            "--developer",
            &dev,
            "--doc",
            &doc,
            "--content",
            "text",
            "--embedding-model",
            "m",
            "--embedding-dimensions",
            "8",
            "--language",
            "xx",
        ],
    );
    assert!(!success);
    assert!(stderr.contains("language"), "stderr: {}", stderr);

    let (_, _, found) = run_dstore(&config_path, &["get", "--developer", &dev, "--doc", &doc]);
    assert!(!found);
}

#[test]
fn test_split_put_creates_chunks() {
    let (_tmp, config_path) = setup_test_env();
    run_dstore(&config_path, &["init"]);
    let dev = Uuid::new_v4().to_string();

    let (stdout, stderr, success) = run_dstore(
        &config_path,
        &[
            "put",
            "--developer",
            &dev,
            "--title",
            "Handbook",
            "--content",
            "First section about onboarding.\n\nSecond section about payroll.",
            "--embedding-model",
            "m",
            "--embedding-dimensions",
            "8",
            "--split",
        ],
    );
    assert!(success, "stderr: {}", stderr);
    assert!(stdout.contains("#0"));
    assert!(stdout.contains("#1"));
}

#[test]
fn test_owner_link_filters_search_and_delete_cascades() {
    let (_tmp, config_path) = setup_test_env();
    run_dstore(&config_path, &["init"]);
    let dev = Uuid::new_v4().to_string();
    let agent = Uuid::new_v4().to_string();

    let (_, stderr, success) = run_dstore(
        &config_path,
        &["owner", "add", "--developer", &dev, "--kind", "agent", "--id", &agent],
    );
    assert!(success, "owner add failed: {}", stderr);

    let linked = put(&config_path, &dev, &["--title", "Agent manual", "--content", "tools"]);
    let unlinked = put(&config_path, &dev, &["--title", "Other manual", "--content", "tools"]);

    let (_, stderr, success) = run_dstore(
        &config_path,
        &["link", "--developer", &dev, "--doc", &linked, "--kind", "agent", "--id", &agent],
    );
    assert!(success, "link failed: {}", stderr);

    let (stdout, _, _) = run_dstore(
        &config_path,
        &["search", "--developer", &dev, "manual", "--agent", &agent],
    );
    assert!(stdout.contains(&linked));
    assert!(!stdout.contains(&unlinked));
    assert!(stdout.contains(&format!("owners: agent:{}", agent)));

    let (stdout, _, success) =
        run_dstore(&config_path, &["delete", "--developer", &dev, "--doc", &linked]);
    assert!(success);
    assert!(stdout.contains("deleted 1 chunk(s), 1 link(s)"));

    let (stdout, _, success) =
        run_dstore(&config_path, &["delete", "--developer", &dev, "--doc", &linked]);
    assert!(success);
    assert!(stdout.contains("not found"));
}

#[test]
fn test_update_changes_search_terms() {
    let (_tmp, config_path) = setup_test_env();
    run_dstore(&config_path, &["init"]);
    let dev = Uuid::new_v4().to_string();
    let id = put(&config_path, &dev, &["--title", "Notes", "--content", "zebra"]);

    let (_, stderr, success) = run_dstore(
        &config_path,
        &["update", "--developer", &dev, "--doc", &id, "--content", "giraffe"],
    );
    assert!(success, "update failed: {}", stderr);

    let (stdout, _, _) = run_dstore(&config_path, &["search", "--developer", &dev, "giraffe"]);
    assert!(stdout.contains(&id));
    let (stdout, _, _) = run_dstore(&config_path, &["search", "--developer", &dev, "zebra"]);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_rejects_out_of_range_limit() {
    let (_tmp, config_path) = setup_test_env();
    run_dstore(&config_path, &["init"]);
    let dev = Uuid::new_v4().to_string();

    let (_, stderr, success) = run_dstore(
        &config_path,
        &["search", "--developer", &dev, "anything", "--limit", "101"],
    );
    assert!(!success);
    assert!(stderr.contains("limit"), "stderr: {}", stderr);
}
