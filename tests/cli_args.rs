//! Integration tests for the `nomad` binary
//!
//! Only the cache subcommands and argument errors are exercised here; they
//! never touch the network.

use std::process::Command;

use nomad_api::{CacheKey, CacheManager};
use tempfile::TempDir;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_nomad"))
        .args(args)
        .env_remove("NOMAD_CACHE_DIR")
        .env_remove("NOMAD_URL")
        .env_remove("NOMAD_CLIENT_ACCESS_TOKEN")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute nomad")
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = stdout_of(&output);
    assert!(stdout.contains("nomad"), "Help should mention nomad");
    assert!(stdout.contains("cache"), "Help should mention the cache subcommand");
}

#[test]
fn test_missing_subcommand_fails() {
    let output = run_cli(&[]);
    assert!(!output.status.success());
}

#[test]
fn test_invalid_oasis_prints_error_and_exits() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap();
    let output = run_cli(&["--oasis", "atlantis", "--cache-dir", dir, "cache", "stats"]);
    assert!(!output.status.success(), "Expected invalid oasis to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid oasis"), "Should explain the error: {}", stderr);
}

#[test]
fn test_cache_stats_on_empty_directory() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap();

    let output = run_cli(&["cache", "stats", "--cache-dir", dir]);

    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Entries: 0"), "Unexpected output: {}", stdout);
    assert!(!stdout.contains("Oldest entry"));
}

#[test]
fn test_cache_stats_list_and_clear() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap();
    let cache = CacheManager::with_dir(temp_dir.path().to_path_buf());
    cache.save(&CacheKey::new("batch:123"), &vec![1, 2, 3]).unwrap();
    cache.save(&CacheKey::new("batch:456"), &vec![4]).unwrap();

    let stats = stdout_of(&run_cli(&["cache", "stats", "--cache-dir", dir]));
    assert!(stats.contains("Entries: 2"), "Unexpected output: {}", stats);
    assert!(stats.contains("Oldest entry"));

    let list = stdout_of(&run_cli(&["cache", "list", "--cache-dir", dir]));
    assert!(list.contains("batch:123"));
    assert!(list.contains("batch:456"));

    let cleared = stdout_of(&run_cli(&["cache", "clear", "batch:123", "--cache-dir", dir]));
    assert!(cleared.contains("Removed 1 entry"), "Unexpected output: {}", cleared);
    assert!(cache.load::<Vec<i32>>(&CacheKey::new("batch:123")).unwrap().is_none());
    assert!(cache.load::<Vec<i32>>(&CacheKey::new("batch:456")).unwrap().is_some());

    let cleared = stdout_of(&run_cli(&["cache", "clear", "--cache-dir", dir]));
    assert!(cleared.contains("Removed 1 entry"), "Unexpected output: {}", cleared);
    assert_eq!(cache.stats().unwrap().entry_count, 0);
}

#[test]
fn test_cache_clear_absent_key_is_noop() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap();

    let output = run_cli(&["cache", "clear", "never-saved", "--cache-dir", dir]);

    assert!(output.status.success());
    assert!(stdout_of(&output).contains("Removed 0 entries"));
}

#[test]
fn test_cache_path_matches_library() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap();
    let cache = CacheManager::with_dir(temp_dir.path().to_path_buf());

    let output = run_cli(&["cache", "path", "batch:123", "--cache-dir", dir]);

    assert!(output.status.success());
    let expected = cache.cache_path(&CacheKey::new("batch:123"));
    assert_eq!(stdout_of(&output).trim(), expected.to_str().unwrap());
}

#[test]
fn test_verify_without_token_fails() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap();

    let output = run_cli(&["verify", "--cache-dir", dir, "--url", "http://127.0.0.1:9"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no access token"), "Unexpected stderr: {}", stderr);
}
