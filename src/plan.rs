//! Plan wire format — the contract between the planner and the executor.
//!
//! The planner returns a JSON object `{ "thought": ..., "steps": [...] }`,
//! usually wrapped in a markdown code fence. Each step names an action
//! and carries a flat string→string parameter map. A plan is immutable
//! once parsed; a failed round produces a *new* plan.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// The tool vocabulary the executor understands.
///
/// Parsed from the wire action name at dispatch time, so an action the
/// planner invented becomes a step-level `UnknownTool` error instead of
/// failing the whole plan parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolAction {
    RunCode,
    CreateFile,
    ReadFile,
    EditFile,
    ListFiles,
}

impl ToolAction {
    pub fn parse(action: &str) -> Option<ToolAction> {
        match action {
            "execute_code" => Some(ToolAction::RunCode),
            "create_file" => Some(ToolAction::CreateFile),
            "read_file" => Some(ToolAction::ReadFile),
            "edit_file" => Some(ToolAction::EditFile),
            "list_files" => Some(ToolAction::ListFiles),
            _ => None,
        }
    }
}

/// One tool invocation as produced by the planner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub action: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl ToolCall {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// A planner-produced round: rationale plus an ordered step sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    #[serde(default)]
    pub thought: String,
    #[serde(default)]
    pub steps: Vec<ToolCall>,
}

impl Plan {
    /// A zero-step plan — the pure-chat short-circuit. The thought is
    /// surfaced to the user as the final response.
    pub fn chat(thought: impl Into<String>) -> Plan {
        Plan {
            thought: thought.into(),
            steps: Vec::new(),
        }
    }

    /// Parses planner output, stripping a surrounding markdown code
    /// fence if present.
    pub fn parse(text: &str) -> Result<Plan, ToolError> {
        let cleaned = strip_code_fence(text);
        serde_json::from_str(cleaned).map_err(|e| ToolError::PlanParseFailure(e.to_string()))
    }
}

/// Extracts the body of a ```json ... ``` (or plain ```) fence.
/// Text without a fence is returned trimmed as-is.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line
    let body = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    body.rsplit_once("```").map(|(b, _)| b).unwrap_or(body).trim()
}

/// Outcome status of one executed tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Uniform result record for one executed tool call. Immutable;
/// appended to the round's results log.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExecutionResult {
    pub status: ToolStatus,
    pub output: String,
    /// Child exit code, for execute_code steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Resolved path, for file-producing steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>) -> ExecutionResult {
        ExecutionResult {
            status: ToolStatus::Success,
            output: output.into(),
            exit_code: None,
            path: None,
        }
    }

    pub fn error(output: impl Into<String>) -> ExecutionResult {
        ExecutionResult {
            status: ToolStatus::Error,
            output: output.into(),
            exit_code: None,
            path: None,
        }
    }

    pub fn failure(error: &ToolError) -> ExecutionResult {
        ExecutionResult::error(error.to_string())
    }

    pub fn with_path(mut self, path: impl Into<String>) -> ExecutionResult {
        self.path = Some(path.into());
        self
    }

    pub fn with_exit_code(mut self, code: Option<i32>) -> ExecutionResult {
        self.exit_code = code;
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Error
    }
}

/// One entry of the results log: the step and what it produced.
/// The full log (across all rounds) is what the synthesizer sees.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepRecord {
    pub step: ToolCall,
    pub result: ExecutionResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_json() {
        let plan = Plan::parse(r#"{"thought": "just chatting", "steps": []}"#).unwrap();
        assert_eq!(plan.thought, "just chatting");
        assert!(plan.steps.is_empty());
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "```json\n{\"thought\": \"t\", \"steps\": [{\"action\": \"read_file\", \"params\": {\"path\": \"a.txt\"}}]}\n```";
        let plan = Plan::parse(text).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].action, "read_file");
        assert_eq!(plan.steps[0].param("path"), Some("a.txt"));
    }

    #[test]
    fn test_parse_fence_without_language_tag() {
        let text = "```\n{\"thought\": \"t\", \"steps\": []}\n```";
        assert_eq!(Plan::parse(text).unwrap().thought, "t");
    }

    #[test]
    fn test_parse_malformed_is_plan_parse_failure() {
        let err = Plan::parse("I cannot answer that.").unwrap_err();
        assert!(matches!(err, ToolError::PlanParseFailure(_)));
    }

    #[test]
    fn test_parse_missing_fields_default() {
        let plan = Plan::parse("{}").unwrap();
        assert_eq!(plan.thought, "");
        assert!(plan.steps.is_empty());
    }

    #[test]
    fn test_tool_action_parse() {
        assert_eq!(ToolAction::parse("execute_code"), Some(ToolAction::RunCode));
        assert_eq!(ToolAction::parse("create_file"), Some(ToolAction::CreateFile));
        assert_eq!(ToolAction::parse("read_file"), Some(ToolAction::ReadFile));
        assert_eq!(ToolAction::parse("edit_file"), Some(ToolAction::EditFile));
        assert_eq!(ToolAction::parse("list_files"), Some(ToolAction::ListFiles));
        assert_eq!(ToolAction::parse("drop_database"), None);
    }

    #[test]
    fn test_step_params_are_string_to_string() {
        let plan = Plan::parse(
            r#"{"thought": "t", "steps": [{"action": "create_file", "params": {"path": "x", "content": "y"}}]}"#,
        )
        .unwrap();
        let step = &plan.steps[0];
        assert_eq!(step.param("path"), Some("x"));
        assert_eq!(step.param("content"), Some("y"));
        assert_eq!(step.param("missing"), None);
    }

    #[test]
    fn test_execution_result_serializes_without_empty_extras() {
        let json = serde_json::to_string(&ExecutionResult::success("ok")).unwrap();
        assert!(json.contains("\"status\":\"success\""));
        assert!(!json.contains("exit_code"));
        assert!(!json.contains("path"));
    }

    #[test]
    fn test_execution_result_failure_carries_message() {
        let result = ExecutionResult::failure(&ToolError::NotFound("a.txt".to_string()));
        assert!(result.is_error());
        assert!(result.output.contains("a.txt"));
    }

    #[test]
    fn test_chat_plan_is_zero_step() {
        let plan = Plan::chat("hello");
        assert!(plan.steps.is_empty());
        assert_eq!(plan.thought, "hello");
    }
}
