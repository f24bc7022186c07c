use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn shellai_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("shellai");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_content = format!(
        r#"ollama:
  base_url: http://localhost:11434
  default_model: mistral
  request_timeout: 60
embedding:
  model: nomic-embed-text
system_info:
  output_dir: "{}/system_info"
  storage_dir: storage
"#,
        root.display()
    );

    let config_path = root.join("config.yaml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_shellai(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = shellai_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .current_dir(config_path.parent().unwrap())
        .output()
        .unwrap_or_else(|e| panic!("Failed to run shellai binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn write_fake_index(storage_dir: &Path) {
    fs::create_dir_all(storage_dir).unwrap();
    fs::write(
        storage_dir.join("index_store.json"),
        r#"{"version":1,"embedding_model":"nomic-embed-text","dims":4,"built_at":"2025-01-01T00:00:00Z","document_ids":[]}"#,
    )
    .unwrap();
    fs::write(storage_dir.join("docstore.json"), r#"{"docs":{}}"#).unwrap();
    fs::write(storage_dir.join("vector_store.json"), r#"{"vectors":{}}"#).unwrap();
}

#[test]
fn test_collect_custom_command() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_shellai(
        &config_path,
        &["collect", "--custom-command", "greeting:echo hello"],
    );
    assert!(
        success,
        "collect failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("Collection complete."));

    let artifact = tmp.path().join("system_info/greeting.txt");
    let content = fs::read_to_string(&artifact).unwrap();
    assert!(content.starts_with("Custom Command: echo hello\n"));
    assert!(content.contains(&"=".repeat(50)));
    assert!(content.contains("hello"));
}

#[test]
fn test_collect_reports_aggregate_count() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_shellai(&config_path, &["collect"]);
    assert!(success);
    assert!(
        stdout.contains("Successfully collected") && stdout.contains("/10 items"),
        "missing aggregate count in: {}",
        stdout
    );
}

#[test]
fn test_collect_invalid_custom_spec_is_skipped() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_shellai(
        &config_path,
        &["collect", "--custom-command", "no-colon-here"],
    );
    assert!(success, "stdout={}, stderr={}", stdout, stderr);
    assert!(stderr.contains("Invalid custom command format"));
}

#[test]
fn test_status_without_collect_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_shellai(&config_path, &["status"]);
    assert!(!success);
    assert!(stderr.contains("does not exist"));
}

#[test]
fn test_status_after_collect() {
    let (tmp, config_path) = setup_test_env();

    let info_dir = tmp.path().join("system_info");
    fs::create_dir_all(&info_dir).unwrap();
    fs::write(info_dir.join("os.txt"), "Command: uname -a\nLinux").unwrap();

    let (stdout, stderr, success) = run_shellai(&config_path, &["status"]);
    assert!(success, "stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("os.txt"));
    assert!(stdout.contains("Persisted index: none"));
}

#[test]
fn test_status_reports_persisted_index() {
    let (tmp, config_path) = setup_test_env();

    let info_dir = tmp.path().join("system_info");
    fs::create_dir_all(&info_dir).unwrap();
    fs::write(info_dir.join("os.txt"), "Command: uname -a\nLinux").unwrap();
    write_fake_index(&info_dir.join("storage"));

    let (stdout, _, success) = run_shellai(&config_path, &["status"]);
    assert!(success);
    assert!(stdout.contains("Persisted index:"));
    assert!(stdout.contains("nomic-embed-text"));
}

#[test]
fn test_cleanup_refuses_without_index() {
    let (tmp, config_path) = setup_test_env();

    let info_dir = tmp.path().join("system_info");
    fs::create_dir_all(&info_dir).unwrap();
    fs::write(info_dir.join("os.txt"), "data").unwrap();

    let (_, stderr, success) = run_shellai(&config_path, &["cleanup", "--force"]);
    assert!(!success);
    assert!(stderr.contains("Refusing to delete"));
    assert!(info_dir.join("os.txt").exists());
}

#[test]
fn test_cleanup_force_deletes_artifacts_keeps_index() {
    let (tmp, config_path) = setup_test_env();

    let info_dir = tmp.path().join("system_info");
    fs::create_dir_all(&info_dir).unwrap();
    fs::write(info_dir.join("os.txt"), "data").unwrap();
    fs::write(info_dir.join("disk.txt"), "data").unwrap();
    write_fake_index(&info_dir.join("storage"));

    let (stdout, stderr, success) = run_shellai(&config_path, &["cleanup", "--force"]);
    assert!(success, "stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Deleted 2 artifact file(s)."));

    assert!(!info_dir.join("os.txt").exists());
    assert!(!info_dir.join("disk.txt").exists());
    assert!(info_dir.join("storage/index_store.json").exists());
    assert!(info_dir.join("storage/docstore.json").exists());
    assert!(info_dir.join("storage/vector_store.json").exists());
}

#[test]
fn test_config_show_defaults() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_shellai(&config_path, &["config", "--show"]);
    assert!(success);
    assert!(stdout.contains("base_url"));
    assert!(stdout.contains("http://localhost:11434"));
}

#[test]
fn test_config_set_persists() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success) = run_shellai(
        &config_path,
        &["config", "--set", "ollama.default_model=llama3"],
    );
    assert!(success);

    let file = fs::read_to_string(&config_path).unwrap();
    assert!(file.contains("llama3"));

    let (stdout, _, success) = run_shellai(&config_path, &["config", "--show"]);
    assert!(success);
    assert!(stdout.contains("llama3"));
}

#[test]
fn test_config_reset_restores_defaults() {
    let (_tmp, config_path) = setup_test_env();

    run_shellai(
        &config_path,
        &["config", "--set", "ollama.default_model=llama3"],
    );
    let (_, _, success) = run_shellai(&config_path, &["config", "--reset"]);
    assert!(success);

    let file = fs::read_to_string(&config_path).unwrap();
    assert!(file.contains("mistral"));
    assert!(!file.contains("llama3"));
}

#[test]
fn test_missing_config_file_is_created_with_defaults() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("fresh.yaml");

    let (stdout, _, success) = run_shellai(&config_path, &["config", "--show"]);
    assert!(success);
    assert!(stdout.contains("Created default configuration file"));
    assert!(config_path.exists());
}

#[test]
fn test_ask_missing_dir_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_shellai(
        &config_path,
        &["ask", "--question", "how much memory?"],
    );
    assert!(!success);
    assert!(stderr.contains("not found"), "stderr={}", stderr);
}

#[test]
fn test_refresh_missing_dir_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success) = run_shellai(&config_path, &["refresh"]);
    assert!(!success);
}

#[test]
fn test_config_reset_recovers_from_invalid_values() {
    let (_tmp, config_path) = setup_test_env();

    fs::write(&config_path, "ollama:\n  request_timeout: 0\n").unwrap();

    // Validated commands must reject the file...
    let (_, stderr, success) = run_shellai(&config_path, &["status"]);
    assert!(!success);
    assert!(stderr.contains("request_timeout"), "stderr={}", stderr);

    // ...but `config` must still work so the operator can repair it.
    let (_, stderr, success) = run_shellai(&config_path, &["config", "--reset"]);
    assert!(success, "config --reset failed: stderr={}", stderr);

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("request_timeout: 60"), "content={}", content);

    let (_, _, success) = run_shellai(
        &config_path,
        &["config", "--set", "ollama.request_timeout=90"],
    );
    assert!(success);
}

#[test]
fn test_status_after_cleanup_reports_index() {
    let (tmp, config_path) = setup_test_env();
    let info_dir = tmp.path().join("system_info");
    fs::create_dir_all(&info_dir).unwrap();
    write_fake_index(&info_dir.join("storage"));

    // No .txt artifacts left, only the persisted index.
    let (stdout, stderr, success) = run_shellai(&config_path, &["status"]);
    assert!(success, "status failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Persisted index:"), "stdout={}", stdout);
    assert!(stdout.contains("cleaned up after indexing"), "stdout={}", stdout);
}
