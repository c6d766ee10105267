//! Sandboxed tool executor.
//!
//! Five capabilities: run code (python or shell), create/read/edit a
//! file, list the workspace. Every operation resolves paths through the
//! sandbox and returns an [`ExecutionResult`] — never an `Err` — so the
//! agent loop treats all outcomes uniformly and failures feed the retry
//! cycle instead of unwinding the stack.
//!
//! The executor is stateless across calls apart from its injected
//! sandbox root: each invocation is independent, and a later step may
//! rely only on the filesystem effects of earlier ones.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::ToolError;
use crate::plan::{ExecutionResult, ToolAction, ToolCall};
use crate::sandbox::Sandbox;

pub struct ToolExecutor {
    sandbox: Sandbox,
    /// Interpreter binary for the "python" code variant. Configurable
    /// so tests can substitute a universally available one.
    interpreter: String,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(sandbox: Sandbox, interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            sandbox,
            interpreter: interpreter.into(),
            timeout,
        }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Executes one plan step. Unknown actions and missing parameters
    /// are error results like any other tool failure.
    pub async fn dispatch(&self, call: &ToolCall) -> ExecutionResult {
        let Some(action) = ToolAction::parse(&call.action) else {
            return ExecutionResult::failure(&ToolError::UnknownTool(call.action.clone()));
        };

        match action {
            ToolAction::RunCode => {
                let language = call.param("language").unwrap_or("python");
                match call.param("code") {
                    Some(code) => self.run_code(language, code).await,
                    None => missing_param("execute_code", "code"),
                }
            }
            ToolAction::CreateFile => match (call.param("path"), call.param("content")) {
                (Some(path), Some(content)) => self.create_file(path, content),
                (None, _) => missing_param("create_file", "path"),
                (_, None) => missing_param("create_file", "content"),
            },
            ToolAction::ReadFile => match call.param("path") {
                Some(path) => self.read_file(path),
                None => missing_param("read_file", "path"),
            },
            ToolAction::EditFile => {
                match (call.param("path"), call.param("old_str"), call.param("new_str")) {
                    (Some(path), Some(old), Some(new)) => self.edit_file(path, old, new),
                    (None, _, _) => missing_param("edit_file", "path"),
                    (_, None, _) => missing_param("edit_file", "old_str"),
                    (_, _, None) => missing_param("edit_file", "new_str"),
                }
            }
            ToolAction::ListFiles => self.list_files(call.param("path").unwrap_or(".")),
        }
    }

    // ── execute_code ─────────────────────────────────────

    pub async fn run_code(&self, language: &str, code: &str) -> ExecutionResult {
        match language {
            "python" => self.run_interpreted(code).await,
            "bash" | "sh" | "shell" => self.run_shell(code).await,
            other => ExecutionResult::error(format!("unsupported language: {other}")),
        }
    }

    /// Writes the code to a uniquely named script inside the sandbox,
    /// runs the interpreter on it, and removes the script on every
    /// outcome (success, failure, timeout).
    async fn run_interpreted(&self, code: &str) -> ExecutionResult {
        let filename = format!("tmp_exec_{}.py", Uuid::new_v4().simple());
        let script = match self.sandbox.resolve(&filename) {
            Ok(path) => path,
            Err(e) => return ExecutionResult::failure(&e),
        };

        if let Err(e) = tokio::fs::write(&script, code).await {
            return ExecutionResult::failure(&ToolError::Io(e));
        }

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&script);
        let result = self.spawn_with_timeout(cmd).await;

        // Scoped cleanup: the script must not survive the call
        if let Err(e) = tokio::fs::remove_file(&script).await {
            warn!("Failed to remove temp script {}: {e}", script.display());
        }

        result
    }

    /// Runs a command string through the shell. No temp file; same
    /// capture, timeout, and cwd rules as the interpreted variant.
    async fn run_shell(&self, command: &str) -> ExecutionResult {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        self.spawn_with_timeout(cmd).await
    }

    /// Spawns a child with cwd = sandbox root, captures stdout+stderr,
    /// and enforces the wall-clock budget. `kill_on_drop` guarantees the
    /// child is terminated when the wait future is dropped on timeout
    /// (or when the whole request is cancelled) — no orphans.
    async fn spawn_with_timeout(&self, mut cmd: Command) -> ExecutionResult {
        cmd.current_dir(self.sandbox.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return ExecutionResult::failure(&ToolError::Io(e)),
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return ExecutionResult::failure(&ToolError::Io(e)),
            Err(_) => {
                // Dropping the wait future killed the child
                return ExecutionResult::failure(&ToolError::ProcessTimeout(
                    self.timeout.as_secs(),
                ));
            }
        };

        let mut merged = String::from_utf8_lossy(&output.stdout).into_owned();
        merged.push_str(&String::from_utf8_lossy(&output.stderr));
        let merged = merged.trim().to_string();

        let code = output.status.code();
        debug!("Child exited with {:?} ({} output bytes)", code, merged.len());

        if output.status.success() {
            ExecutionResult::success(merged).with_exit_code(code)
        } else {
            ExecutionResult::error(merged).with_exit_code(code)
        }
    }

    // ── File operations ──────────────────────────────────

    /// Full overwrite, parent directories created as needed.
    pub fn create_file(&self, path: &str, content: &str) -> ExecutionResult {
        let resolved = match self.sandbox.resolve(path) {
            Ok(p) => p,
            Err(e) => return ExecutionResult::failure(&e),
        };

        if let Some(parent) = resolved.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return ExecutionResult::failure(&ToolError::Io(e));
            }
        }
        if let Err(e) = std::fs::write(&resolved, content) {
            return ExecutionResult::failure(&ToolError::Io(e));
        }

        ExecutionResult::success(format!("File created: {path}"))
            .with_path(resolved.display().to_string())
    }

    /// Whole-file read; no partial or streamed variant.
    pub fn read_file(&self, path: &str) -> ExecutionResult {
        let resolved = match self.sandbox.resolve(path) {
            Ok(p) => p,
            Err(e) => return ExecutionResult::failure(&e),
        };

        if !resolved.exists() {
            return ExecutionResult::failure(&ToolError::NotFound(path.to_string()));
        }
        match std::fs::read_to_string(&resolved) {
            Ok(content) => {
                ExecutionResult::success(content).with_path(resolved.display().to_string())
            }
            Err(e) => ExecutionResult::failure(&ToolError::Io(e)),
        }
    }

    /// Literal substitution: every non-overlapping occurrence of `old`
    /// is replaced. Multiple matches are all replaced by design, not an
    /// error. The file is left untouched when `old` is absent.
    pub fn edit_file(&self, path: &str, old: &str, new: &str) -> ExecutionResult {
        let read = self.read_file(path);
        if read.is_error() {
            return read;
        }

        if !read.output.contains(old) {
            return ExecutionResult::failure(&ToolError::PatternNotFound(path.to_string()));
        }

        let updated = read.output.replace(old, new);
        let written = self.create_file(path, &updated);
        if written.is_error() {
            return written;
        }
        ExecutionResult::success(format!("File edited: {path}")).with_path(
            written.path.unwrap_or_default(),
        )
    }

    /// Recursive listing of regular files, sandbox-relative, one per
    /// line, in traversal order. An empty tree yields "(empty)".
    pub fn list_files(&self, path: &str) -> ExecutionResult {
        let resolved = match self.sandbox.resolve(path) {
            Ok(p) => p,
            Err(e) => return ExecutionResult::failure(&e),
        };

        if !resolved.exists() {
            return ExecutionResult::failure(&ToolError::NotFound(path.to_string()));
        }

        let mut lines = Vec::new();
        for entry in WalkDir::new(&resolved).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() {
                lines.push(self.sandbox.relative(entry.path()).display().to_string());
            }
        }

        if lines.is_empty() {
            ExecutionResult::success("(empty)")
        } else {
            ExecutionResult::success(lines.join("\n"))
        }
    }
}

fn missing_param(action: &str, param: &str) -> ExecutionResult {
    ExecutionResult::error(format!("{action}: missing required parameter '{param}'"))
}
