//! CLI argument parsing tests for ukbsearch

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    let env = TestEnv::new().unwrap();
    let assert = env.command().arg("--help").assert().success();
    let out = String::from_utf8_lossy(&assert.get_output().stdout).to_string();

    for command in ["init", "ask", "tools", "call", "status", "guide", "init-db"] {
        assert!(out.contains(command), "help is missing '{}': {}", command, out);
    }
}

#[test]
fn test_version() {
    let env = TestEnv::new().unwrap();
    env.command()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_ask_requires_query() {
    let env = TestEnv::new().unwrap();
    env.command()
        .arg("ask")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<QUERY>"));
}

#[test]
fn test_ask_rejects_unknown_language() {
    let env = TestEnv::new().unwrap();
    env.command()
        .args(["ask", "field 31", "--lang", "de"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported language"));
}

#[test]
fn test_call_requires_tool_name() {
    let env = TestEnv::new().unwrap();
    env.command().arg("call").assert().failure();
}

#[test]
fn test_verbose_is_global() {
    let env = TestEnv::new().unwrap();
    env.command()
        .args(["tools", "--verbose"])
        .assert()
        .success();
}

#[test]
fn test_unknown_command() {
    let env = TestEnv::new().unwrap();
    env.command()
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
