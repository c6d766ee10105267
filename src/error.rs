//! Uniform failure taxonomy for tool execution.
//!
//! Every way a tool invocation can go wrong is one of these variants.
//! None of them crosses the executor boundary as an `Err`: the executor
//! folds them into an `ExecutionResult` with `status: error` so the
//! retry loop can pattern-match on status uniformly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested path resolves outside the sandbox root.
    /// Never retried by the executor itself; the filesystem is not
    /// touched once this is detected.
    #[error("access denied: '{0}' resolves outside the workspace")]
    SandboxEscape(String),

    /// Missing file on read or edit.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The edit target substring is absent from the file.
    #[error("old_str not found in {0}")]
    PatternNotFound(String),

    /// Child process exceeded the wall-clock budget and was killed.
    #[error("process timed out after {0}s")]
    ProcessTimeout(u64),

    /// Unrecognized action name in a plan step.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The planner returned something that does not parse as a plan.
    #[error("failed to parse plan: {0}")]
    PlanParseFailure(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_input() {
        let err = ToolError::SandboxEscape("../../etc/passwd".to_string());
        assert!(err.to_string().contains("../../etc/passwd"));

        let err = ToolError::NotFound("missing.txt".to_string());
        assert!(err.to_string().contains("missing.txt"));

        let err = ToolError::UnknownTool("delete_everything".to_string());
        assert!(err.to_string().contains("delete_everything"));
    }

    #[test]
    fn test_timeout_message_includes_budget() {
        let err = ToolError::ProcessTimeout(30);
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ToolError = io.into();
        assert!(matches!(err, ToolError::Io(_)));
    }
}
