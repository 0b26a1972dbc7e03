//! Command execution tests for ukbsearch

mod common;

use common::TestEnv;
use predicates::prelude::*;
use serde_json::Value;

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ============================================================================
// init
// ============================================================================

#[test]
fn test_init_creates_config() {
    let env = TestEnv::new().expect("Failed to create test environment");

    env.command()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initializing ukbsearch"));

    let written = std::fs::read_to_string(env.config_file()).unwrap();
    let config: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(config["api"]["model"], "glm-4.5-flash");
    assert_eq!(config["agent"]["max_iterations"], 6);
}

#[test]
fn test_init_keeps_existing_config() {
    let env = TestEnv::new().unwrap();
    env.create_config(r#"{ "api": { "model": "glm-4-plus" } }"#)
        .unwrap();

    env.command().arg("init").assert().success();

    let written = std::fs::read_to_string(env.config_file()).unwrap();
    assert!(written.contains("glm-4-plus"));
}

// ============================================================================
// tools / guide
// ============================================================================

#[test]
fn test_tools_lists_seven_descriptors() {
    let env = TestEnv::new().unwrap();
    let output = env.command().arg("tools").output().unwrap();
    assert!(output.status.success());

    let tools = stdout_json(&output);
    let names: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 7);
    assert_eq!(names[0], "explain_field_by_id");
    assert!(names.contains(&"get_recommended_fields"));
    assert_eq!(tools[1]["parameters"]["required"][0], "keyword");
}

#[test]
fn test_guide_languages() {
    let env = TestEnv::new().unwrap();

    env.command()
        .args(["guide", "--lang", "en"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## Usage Guide"));

    env.command()
        .arg("guide")
        .assert()
        .success()
        .stdout(predicate::str::contains("使用指南"));
}

#[test]
fn test_guide_rejects_unknown_language() {
    let env = TestEnv::new().unwrap();
    env.command()
        .args(["guide", "--lang", "fr"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported language"));
}

// ============================================================================
// init-db / call
// ============================================================================

#[test]
fn test_init_db_and_call_tool() {
    let env = TestEnv::new().unwrap();
    env.create_database().unwrap();
    assert!(env.db_path.exists());

    let output = env
        .command()
        .args(["call", "explain_field_by_id", "--args", r#"{"field_id": 31}"#])
        .output()
        .unwrap();
    assert!(output.status.success());

    let field = stdout_json(&output);
    assert_eq!(field["title"], "Sex");
    assert_eq!(field["encoding_values"][0]["meaning"], "Female");
}

#[test]
fn test_call_ignores_extra_arguments() {
    let env = TestEnv::new().unwrap();
    env.create_database().unwrap();

    let output = env
        .command()
        .args([
            "call",
            "search_fields_by_keyword",
            "--args",
            r#"{"keyword": "heart", "limit": 5, "fuzzy": true}"#,
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["count"], 1);
}

#[test]
fn test_call_unknown_field_prints_error_payload() {
    let env = TestEnv::new().unwrap();
    env.create_database().unwrap();

    env.command()
        .args(["call", "explain_field_by_id", "--args", r#"{"field_id": 424242}"#])
        .assert()
        .failure()
        .stdout(predicate::str::contains("ToolExecutionError"))
        .stdout(predicate::str::contains("Field 424242 not found"));
}

#[test]
fn test_call_without_database_fails() {
    let env = TestEnv::new().unwrap();
    env.command()
        .args(["call", "get_all_categories"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot open dictionary"));
}

#[test]
fn test_call_rejects_bad_json() {
    let env = TestEnv::new().unwrap();
    env.create_database().unwrap();
    env.command()
        .args(["call", "get_all_categories", "--args", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--args must be valid JSON"));
}

// ============================================================================
// status / ask
// ============================================================================

#[test]
fn test_status_without_database() {
    let env = TestEnv::new().unwrap();
    env.command()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config:"))
        .stdout(predicate::str::contains("[Missing]"))
        .stdout(predicate::str::contains("connection          [FAIL]"));
}

#[test]
fn test_status_runs_smoke_checks() {
    let env = TestEnv::new().unwrap();
    env.create_database().unwrap();

    env.command()
        .arg("status")
        .env("GLM_API_KEY", "test-key")
        .assert()
        .success()
        .stdout(predicate::str::contains("field 31            [OK] Sex"))
        .stdout(predicate::str::contains("1 results"))
        .stdout(predicate::str::contains("2 categories"))
        .stdout(predicate::str::contains("Ready"));
}

#[test]
fn test_ask_without_api_key_fails() {
    let env = TestEnv::new().unwrap();
    env.create_database().unwrap();

    env.command()
        .args(["ask", "What does field 31 mean?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key configured"));
}

#[test]
fn test_ask_with_placeholder_key_fails() {
    let env = TestEnv::new().unwrap();
    env.create_database().unwrap();

    env.command()
        .args(["ask", "field 31"])
        .env("GLM_API_KEY", "your-api-key-here")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key configured"));
}
