//! Client for the Gemini generateContent API.
//!
//! Implements [`Brain`] on top of a single non-streaming endpoint.
//! Planner responses are expected to be JSON (often wrapped in a
//! markdown fence); anything unparseable is downgraded to a zero-step
//! plan whose thought reports the problem, so the runtime never
//! crashes on a bad planner round.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::llm::client::{Brain, FALLBACK_SUMMARY};
use crate::mode::Mode;
use crate::plan::{Plan, StepRecord};
use crate::session::SessionEntry;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Tool catalog shown to the planner. The action names must match
/// what the executor dispatches on.
const TOOLS_DOC: &str = "\
- execute_code: run code in the workspace. params: language (\"python\" or \"bash\"), code
- create_file: write a file (full overwrite). params: path, content
- read_file: read a whole file. params: path
- edit_file: replace every occurrence of a literal substring. params: path, old_str, new_str
- list_files: recursively list workspace files. params: path (optional, default \".\")";

pub struct GeminiClient {
    client: Client,
    config: LlmConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

impl GeminiClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Sends one prompt and returns the concatenated text parts.
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        debug!(
            "Calling Gemini API ({}) with a {} char prompt",
            self.config.model,
            prompt.len()
        );

        let url = format!(
            "{API_BASE}/{}:generateContent?key={}",
            self.config.model, self.config.api_key
        );
        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({status}): {body}");
        }

        let resp: GenerateResponse = response.json().await?;
        let text = resp
            .candidates
            .iter()
            .flat_map(|c| c.content.parts.iter())
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        info!("Gemini response: {} chars", text.len());
        Ok(text)
    }
}

#[async_trait]
impl Brain for GeminiClient {
    async fn create_plan(
        &self,
        query: &str,
        mode: Mode,
        history: &[SessionEntry],
        error_context: Option<&str>,
    ) -> Result<Plan> {
        let prompt = planning_prompt(query, mode, history, error_context);
        let text = self.generate(&prompt).await?;

        match Plan::parse(&text) {
            Ok(plan) => Ok(plan),
            Err(e) => {
                warn!("Planner returned malformed output: {e}");
                Ok(Plan::chat(format!("Planner error: {e}")))
            }
        }
    }

    async fn synthesize(&self, query: &str, results: &[StepRecord]) -> String {
        let prompt = synthesis_prompt(query, results);
        match self.generate(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Synthesizer call failed: {e}");
                FALLBACK_SUMMARY.to_string()
            }
        }
    }

    fn description(&self) -> String {
        format!("gemini ({})", self.config.model)
    }
}

fn planning_prompt(
    query: &str,
    mode: Mode,
    history: &[SessionEntry],
    error_context: Option<&str>,
) -> String {
    let mut prompt = format!(
        "ROLE: Expert developer and system administrator operating a sandboxed workspace.\n\
         MODE: {} - {}\n\n\
         AVAILABLE TOOLS:\n{TOOLS_DOC}\n\n\
         INSTRUCTIONS:\n\
         1. Analyze the USER REQUEST.\n\
         2. If tools are needed, plan the steps in execution order.\n\
         3. All paths are relative to the workspace root.\n\
         4. If a PREVIOUS ERROR is given, analyze it and fix the plan.\n\
         5. If no tools are needed, return an empty steps array and answer in \"thought\".\n\
         6. RETURN ONLY JSON.\n\n\
         FORMAT:\n\
         {{\n  \"thought\": \"reasoning\",\n  \"steps\": [\n    {{ \"action\": \"tool_name\", \"params\": {{ ... }} }}\n  ]\n}}\n",
        mode.name().to_uppercase(),
        mode.planner_style(),
    );

    if !history.is_empty() {
        prompt.push_str("\nCONVERSATION HISTORY:\n");
        for entry in history {
            prompt.push_str(&format!("{}: {}\n", entry.role, entry.content));
        }
    }

    prompt.push_str(&format!("\nUSER REQUEST: {query}\n"));

    if let Some(error) = error_context {
        prompt.push_str(&format!("\nPREVIOUS ERROR (please fix):\n{error}\n"));
    }

    prompt
}

fn synthesis_prompt(query: &str, results: &[StepRecord]) -> String {
    let log = serde_json::to_string_pretty(results).unwrap_or_else(|_| "[]".to_string());
    format!(
        "USER REQUEST: {query}\n\n\
         EXECUTION RESULTS:\n{log}\n\n\
         Task: write a helpful response summarizing what was done.\n\
         If there was output, show it. If files were created, list them.\n\
         If the log ends in an error, explain what failed and why."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ExecutionResult, ToolCall};
    use std::collections::HashMap;

    fn entry(role: &str, content: &str) -> SessionEntry {
        SessionEntry {
            role: role.to_string(),
            content: content.to_string(),
            ts: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_planning_prompt_carries_mode_style() {
        let prompt = planning_prompt("do it", Mode::Teaching, &[], None);
        assert!(prompt.contains("MODE: TEACHING"));
        assert!(prompt.contains(Mode::Teaching.planner_style()));
    }

    #[test]
    fn test_planning_prompt_lists_every_tool() {
        let prompt = planning_prompt("q", Mode::Fast, &[], None);
        for action in ["execute_code", "create_file", "read_file", "edit_file", "list_files"] {
            assert!(prompt.contains(action), "missing {action}");
        }
    }

    #[test]
    fn test_planning_prompt_includes_history() {
        let history = vec![entry("user", "earlier question"), entry("model", "earlier answer")];
        let prompt = planning_prompt("q", Mode::Accurate, &history, None);
        assert!(prompt.contains("earlier question"));
        assert!(prompt.contains("earlier answer"));
    }

    #[test]
    fn test_planning_prompt_omits_history_section_when_empty() {
        let prompt = planning_prompt("q", Mode::Accurate, &[], None);
        assert!(!prompt.contains("CONVERSATION HISTORY"));
    }

    #[test]
    fn test_planning_prompt_error_context_on_retry_only() {
        let without = planning_prompt("q", Mode::Accurate, &[], None);
        assert!(!without.contains("PREVIOUS ERROR"));

        let with = planning_prompt("q", Mode::Accurate, &[], Some("step failed: boom"));
        assert!(with.contains("PREVIOUS ERROR"));
        assert!(with.contains("step failed: boom"));
    }

    #[test]
    fn test_synthesis_prompt_embeds_results_log() {
        let records = vec![StepRecord {
            step: ToolCall {
                action: "create_file".to_string(),
                params: HashMap::from([("path".to_string(), "out.txt".to_string())]),
            },
            result: ExecutionResult::success("File created: out.txt"),
        }];
        let prompt = synthesis_prompt("make a file", &records);
        assert!(prompt.contains("make a file"));
        assert!(prompt.contains("create_file"));
        assert!(prompt.contains("File created: out.txt"));
    }

    #[test]
    fn test_generate_response_deserializes() {
        let json = r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "{\"thought\": \"ok\"}"}]}}]}"#;
        let resp: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.candidates.len(), 1);
        assert_eq!(resp.candidates[0].content.parts[0].text, "{\"thought\": \"ok\"}");
    }
}
