use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn synapse_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("synapse");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("alpha.txt"),
        "Alpha handbook.\n\nRefunds are processed within five business days.\n\nShipping is free above fifty euros.",
    )
    .unwrap();
    fs::write(files_dir.join("long.txt"), "x".repeat(2500)).unwrap();
    fs::write(files_dir.join("blank.txt"), " \r\n\t \r\n").unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/synapse.sqlite"

[chunking]
max_chars = 900

[retrieval]
top_k = 5
"#,
        root.display()
    );

    let config_path = config_dir.join("synapse.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_synapse(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = synapse_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run synapse binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn file(config_path: &Path, name: &str) -> String {
    config_path
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("files")
        .join(name)
        .display()
        .to_string()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_synapse(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/synapse.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_synapse(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_synapse(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_chunk_preview_splits_long_text() {
    let (_tmp, config_path) = setup_test_env();
    let long = file(&config_path, "long.txt");

    let (stdout, stderr, success) = run_synapse(&config_path, &["chunk", &long]);
    assert!(success, "chunk failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("[chunk 0] (900 chars)"));
    assert!(stdout.contains("[chunk 2] (700 chars)"));
    assert!(stdout.contains("total chunks: 3"));
}

#[test]
fn test_chunk_preview_without_config_file() {
    let (tmp, config_path) = setup_test_env();
    let alpha = file(&config_path, "alpha.txt");
    let missing = tmp.path().join("nope.toml");

    let (stdout, stderr, success) =
        run_synapse(&missing, &["chunk", &alpha, "--max-chars", "40"]);
    assert!(success, "chunk failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("[chunk 0] (40 chars)"));
    assert!(stdout.contains("Alpha handbook."));
}

#[test]
fn test_chunk_blank_file_has_no_chunks() {
    let (_tmp, config_path) = setup_test_env();
    let blank = file(&config_path, "blank.txt");

    let (stdout, _, success) = run_synapse(&config_path, &["chunk", &blank]);
    assert!(success);
    assert!(stdout.contains("No chunks"));
}

#[test]
fn test_empty_query_rejected() {
    let (_tmp, config_path) = setup_test_env();
    run_synapse(&config_path, &["init"]);

    let (_, stderr, success) = run_synapse(&config_path, &["query", "   "]);
    assert!(!success, "empty query should fail");
    assert!(stderr.contains("query must not be empty"), "stderr={}", stderr);
}

#[test]
fn test_query_empty_index() {
    let (_tmp, config_path) = setup_test_env();
    run_synapse(&config_path, &["init"]);

    let (stdout, stderr, success) = run_synapse(&config_path, &["query", "refunds"]);
    assert!(success, "query failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("No results."));

    let (stdout, _, success) = run_synapse(&config_path, &["query", "refunds", "--json"]);
    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(parsed, serde_json::json!([]));
}

#[test]
fn test_index_with_embeddings_disabled_writes_nothing() {
    let (_tmp, config_path) = setup_test_env();
    run_synapse(&config_path, &["init"]);
    let alpha = file(&config_path, "alpha.txt");

    let (_, stderr, success) = run_synapse(&config_path, &["index", &alpha, "--id", "alpha"]);
    assert!(!success, "index should fail without an embedding provider");
    assert!(stderr.contains("disabled"), "stderr={}", stderr);

    let (stdout, _, success) = run_synapse(&config_path, &["documents"]);
    assert!(success);
    assert!(stdout.contains("No documents indexed."));
}

#[test]
fn test_index_blank_file_rejected() {
    let (_tmp, config_path) = setup_test_env();
    run_synapse(&config_path, &["init"]);
    let blank = file(&config_path, "blank.txt");

    let (_, stderr, success) = run_synapse(&config_path, &["index", &blank]);
    assert!(!success);
    assert!(stderr.contains("no readable text"), "stderr={}", stderr);
}

#[test]
fn test_remove_unknown_document() {
    let (_tmp, config_path) = setup_test_env();
    run_synapse(&config_path, &["init"]);

    let (stdout, _, success) = run_synapse(&config_path, &["remove", "ghost"]);
    assert!(success);
    assert!(stdout.contains("No chunks found for document ghost."));
}

#[test]
fn test_invalid_config_rejected() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(
        &bad,
        format!(
            "[db]\npath = \"{}/data/x.sqlite\"\n\n[retrieval]\ntop_k = 0\n",
            tmp.path().display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_synapse(&bad, &["init"]);
    assert!(!success);
    assert!(stderr.contains("retrieval.top_k must be >= 1"), "stderr={}", stderr);
}
