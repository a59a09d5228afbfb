//! CLI tests for the `agent` binary.
//!
//! Spawns the binary and checks exit codes and the JSON event lines on stdout.
//! Model traffic goes to a local stub server configured through `agent.toml`.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use agent::exit_codes;
use agent::io::config::{AgentConfig, RouteMode, write_config};
use agent::test_support::{StubHttpServer, call_block};
use serde_json::{Value, json};

fn agent(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_agent"));
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

fn candidate(text: &str) -> (u16, String) {
    let body = json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] });
    (200, body.to_string())
}

fn event_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("event json"))
        .collect()
}

#[test]
fn init_writes_default_config_once() {
    let temp = tempfile::tempdir().expect("tempdir");

    let status = agent(temp.path()).arg("init").status().expect("agent init");
    assert_eq!(status.code(), Some(exit_codes::OK));
    assert!(temp.path().join("agent.toml").exists());

    let status = agent(temp.path()).arg("init").status().expect("agent init again");
    assert_eq!(status.code(), Some(exit_codes::INVALID));

    let status = agent(temp.path())
        .args(["init", "--force"])
        .status()
        .expect("agent init --force");
    assert_eq!(status.code(), Some(exit_codes::OK));
}

#[test]
fn tools_lists_sub_tools_and_master_view() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = agent(temp.path()).arg("tools").output().expect("agent tools");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout.contains("create_file(path, content=\"\"): "));
    assert!(!stdout.contains("autonomous_loop"));

    let output = agent(temp.path())
        .args(["tools", "--master"])
        .output()
        .expect("agent tools --master");
    assert!(String::from_utf8_lossy(&output.stdout).contains("autonomous_loop(task): "));
}

#[test]
fn run_without_api_key_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = agent(temp.path())
        .env_remove("API_KEY")
        .args(["run", "hello"])
        .output()
        .expect("agent run");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("API_KEY"));
}

#[test]
fn invalid_config_is_reported() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("agent.toml"), "max_turns = 0\n").expect("write config");

    let output = agent(temp.path())
        .env("API_KEY", "k")
        .args(["run", "hello"])
        .output()
        .expect("agent run");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_turns"));
}

#[test]
fn loop_run_streams_events_and_writes_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let server = StubHttpServer::serve(vec![
        candidate(&call_block("create_file('notes.txt', 'hello')")),
        candidate("Done."),
    ]);

    let mut cfg = AgentConfig::default();
    cfg.workspace_root = temp.path().join("ws");
    cfg.routing.mode = RouteMode::Loop;
    cfg.model.api_url_template = format!("{}/models/{{model}}?key={{api_key}}", server.base_url());
    cfg.model.models = vec!["stub-model".to_string()];
    write_config(&temp.path().join("agent.toml"), &cfg).expect("write config");

    let output = agent(temp.path())
        .env("API_KEY", "test-key")
        .args(["run", "Create notes.txt with hello"])
        .output()
        .expect("agent run");

    assert_eq!(
        output.status.code(),
        Some(exit_codes::OK),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let events = event_lines(&output);
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["kind"], "tool_call");
    assert_eq!(events[1]["kind"], "tool_output");
    assert_eq!(events[1]["content"], "Success: File 'notes.txt' created.");
    assert!(events[1].get("model_used").is_none());
    assert_eq!(events[2]["kind"], "final_answer");
    assert_eq!(events[2]["content"], "Done.");
    assert_eq!(events[2]["model_used"], "stub-model");

    assert_eq!(
        fs::read_to_string(temp.path().join("ws/notes.txt")).expect("notes"),
        "hello"
    );
    let requests = server.finish();
    assert!(requests[0].starts_with("POST /models/stub-model?key=test-key"));
}

#[test]
fn unavailable_models_exit_with_agent_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let server = StubHttpServer::serve(vec![(503, "{}".to_string()), (503, "{}".to_string())]);

    let mut cfg = AgentConfig::default();
    cfg.workspace_root = temp.path().join("ws");
    cfg.routing.mode = RouteMode::Direct;
    cfg.model.api_url_template = format!("{}/models/{{model}}?key={{api_key}}", server.base_url());
    cfg.model.models = vec!["m1".to_string(), "m2".to_string()];
    write_config(&temp.path().join("agent.toml"), &cfg).expect("write config");

    let output = agent(temp.path())
        .env("API_KEY", "test-key")
        .args(["run", "hello"])
        .output()
        .expect("agent run");

    assert_eq!(output.status.code(), Some(exit_codes::AGENT_ERROR));
    let events = event_lines(&output);
    assert_eq!(
        events,
        vec![json!({
            "kind": "error",
            "content": "All AI models are currently unavailable. Please try again later."
        })]
    );
    assert_eq!(server.finish().len(), 2);
}
