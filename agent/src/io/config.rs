//! Agent configuration stored in `agent.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::atomic::write_atomic;

pub const DEFAULT_CONFIG_PATH: &str = "agent.toml";

/// Largest accepted `max_turns`.
pub const MAX_TURNS_LIMIT: u32 = 50;

/// Agent configuration (TOML).
///
/// Every field has a default, so a partial file (or no file) is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Directory all tools are confined to. Relative paths are taken from the
    /// current directory.
    pub workspace_root: PathBuf,

    /// Tool turns allowed before the loop gives up.
    pub max_turns: u32,

    pub tools: ToolsConfig,
    pub model: ModelConfig,
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    /// Wall-clock limit for `execute_python` and `execute_shell`.
    pub exec_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    /// Characters of a fetched body returned to the model.
    pub fetch_preview_chars: usize,
    /// Per-stream cap on captured subprocess output.
    pub output_limit_bytes: usize,
    /// Interpreter command; the staged script path is appended.
    pub python: Vec<String>,
    /// Shell command prefix; the command string is appended.
    pub shell: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            exec_timeout_secs: 30,
            fetch_timeout_secs: 10,
            fetch_preview_chars: 2000,
            output_limit_bytes: 100_000,
            python: vec!["python3".to_string()],
            shell: vec!["sh".to_string(), "-c".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelConfig {
    /// Endpoint with `{model}` and `{api_key}` placeholders.
    pub api_url_template: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Fallback order. The first model that answers wins.
    pub models: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_url_template: "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent?key={api_key}".to_string(),
            api_key_env: "API_KEY".to_string(),
            timeout_secs: 20,
            models: [
                "gemini-2.5-pro",
                "gemini-2.5-flash",
                "gemini-2.5-flash-lite",
                "gemini-2.0-flash",
                "gemini-2.0-flash-lite",
                "gemini-1.5-pro-latest",
                "gemini-1.5-flash-latest",
                "gemini-1.5-flash",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

/// How the dispatcher decides between a direct answer and the loop.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    /// Ask the model; it opts into the loop by calling `autonomous_loop`.
    #[default]
    Auto,
    /// Always run the loop.
    Loop,
    /// Always answer directly.
    Direct,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoutingConfig {
    pub mode: RouteMode,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("workspace"),
            max_turns: 7,
            tools: ToolsConfig::default(),
            model: ModelConfig::default(),
            routing: RoutingConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workspace_root.as_os_str().is_empty() {
            return Err(anyhow!("workspace_root must not be empty"));
        }
        if !(1..=MAX_TURNS_LIMIT).contains(&self.max_turns) {
            return Err(anyhow!("max_turns must be between 1 and {MAX_TURNS_LIMIT}"));
        }
        let tools = &self.tools;
        if tools.exec_timeout_secs == 0 {
            return Err(anyhow!("tools.exec_timeout_secs must be > 0"));
        }
        if tools.fetch_timeout_secs == 0 {
            return Err(anyhow!("tools.fetch_timeout_secs must be > 0"));
        }
        if tools.fetch_preview_chars == 0 {
            return Err(anyhow!("tools.fetch_preview_chars must be > 0"));
        }
        if tools.output_limit_bytes == 0 {
            return Err(anyhow!("tools.output_limit_bytes must be > 0"));
        }
        if tools.python.first().is_none_or(|p| p.trim().is_empty()) {
            return Err(anyhow!("tools.python must be a non-empty array"));
        }
        if tools.shell.first().is_none_or(|p| p.trim().is_empty()) {
            return Err(anyhow!("tools.shell must be a non-empty array"));
        }
        let model = &self.model;
        if !model.api_url_template.contains("{model}") {
            return Err(anyhow!("model.api_url_template must contain {{model}}"));
        }
        if model.api_key_env.trim().is_empty() {
            return Err(anyhow!("model.api_key_env must not be empty"));
        }
        if model.timeout_secs == 0 {
            return Err(anyhow!("model.timeout_secs must be > 0"));
        }
        if model.models.is_empty() || model.models.iter().any(|m| m.trim().is_empty()) {
            return Err(anyhow!("model.models must be a non-empty array of names"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AgentConfig::default());
        assert_eq!(cfg.max_turns, 7);
        assert_eq!(cfg.tools.exec_timeout_secs, 30);
        assert_eq!(cfg.model.timeout_secs, 20);
        assert_eq!(cfg.model.api_key_env, "API_KEY");
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("agent.toml");
        let mut cfg = AgentConfig::default();
        cfg.max_turns = 12;
        cfg.routing.mode = RouteMode::Loop;
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("agent.toml");
        fs::write(
            &path,
            "max_turns = 3\n[tools]\nexec_timeout_secs = 5\n[routing]\nmode = \"direct\"\n",
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_turns, 3);
        assert_eq!(cfg.tools.exec_timeout_secs, 5);
        assert_eq!(cfg.tools.fetch_preview_chars, 2000);
        assert_eq!(cfg.routing.mode, RouteMode::Direct);
        assert_eq!(cfg.model, ModelConfig::default());
    }

    #[test]
    fn out_of_range_turns_are_rejected() {
        for turns in [0, MAX_TURNS_LIMIT + 1] {
            let cfg = AgentConfig {
                max_turns: turns,
                ..AgentConfig::default()
            };
            assert!(cfg.validate().is_err(), "max_turns = {turns}");
        }
    }

    #[test]
    fn invalid_file_reports_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("agent.toml");
        fs::write(&path, "[model]\nmodels = []\n").expect("write");

        let err = load_config(&path).expect_err("empty model list");
        let msg = format!("{err:#}");
        assert!(msg.contains("agent.toml"), "{msg}");
        assert!(msg.contains("model.models"), "{msg}");
    }

    #[test]
    fn template_without_model_placeholder_is_rejected() {
        let mut cfg = AgentConfig::default();
        cfg.model.api_url_template = "https://example.invalid/generate".to_string();
        assert!(cfg.validate().is_err());
    }
}
