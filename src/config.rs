use std::path::PathBuf;

use serde::Deserialize;

use crate::mode::Mode;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Supports ${ENV_VAR} substitution
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_mode")]
    pub default_mode: Mode,
    /// How many past messages are handed to the planner.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SandboxConfig {
    /// All tool effects are confined to this directory tree.
    #[serde(default = "default_sandbox_path")]
    pub path: PathBuf,
    /// Interpreter binary for the "python" code variant.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Wall-clock budget for one execute_code call.
    #[serde(default = "default_exec_timeout")]
    pub exec_timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_max_output_tokens() -> u32 {
    4096
}

fn default_name() -> String {
    "tinker".to_string()
}

fn default_mode() -> Mode {
    Mode::Accurate
}

fn default_history_window() -> usize {
    10
}

fn default_session_path() -> PathBuf {
    PathBuf::from("./data/session.jsonl")
}

fn default_sandbox_path() -> PathBuf {
    PathBuf::from("./workspace")
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_exec_timeout() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: String::new(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            default_mode: default_mode(),
            history_window: default_history_window(),
            session_path: default_session_path(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            path: default_sandbox_path(),
            interpreter: default_interpreter(),
            exec_timeout_secs: default_exec_timeout(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Expand environment variables like ${GEMINI_API_KEY}
        let expanded = shellexpand::env(&content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }
}
