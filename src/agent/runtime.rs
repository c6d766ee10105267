//! The agent runtime — plan, execute, retry, synthesize.
//!
//! One user request is one pass through an explicit state machine:
//!
//! ```text
//! Planning → Executing → Succeeded
//!                ↘ Retrying → Planning (budget left)
//!                          ↘ Exhausted
//! ```
//!
//! The loop is enum-driven rather than recursive so the attempt bound
//! is a plain counter check. Both terminal states hand the accumulated
//! results log to the synthesizer; they differ only in whether the log
//! ends in an error.

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::llm::Brain;
use crate::mode::Mode;
use crate::plan::{Plan, StepRecord};
use crate::session::SessionStore;
use crate::tools::ToolExecutor;

use super::retry::RetryContext;

enum LoopState {
    Planning,
    Executing(Plan),
    Retrying { failed_action: String, error: String },
    /// `Some` carries the pure-chat short-circuit text (zero-step
    /// plan); the synthesizer is skipped in that case.
    Succeeded(Option<String>),
    Exhausted,
}

pub struct AgentRuntime {
    config: Config,
    brain: Box<dyn Brain>,
    tools: ToolExecutor,
    session: SessionStore,
    mode: Mode,
    start_time: Instant,
}

impl AgentRuntime {
    pub fn new(
        config: Config,
        brain: Box<dyn Brain>,
        tools: ToolExecutor,
        session: SessionStore,
    ) -> Self {
        let mode = config.agent.default_mode;
        Self {
            config,
            brain,
            tools,
            session,
            mode,
            start_time: Instant::now(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    // ── Slash commands ────────────────────────────────────

    /// Handles a slash command. These never reach the planner.
    pub fn handle_command(&mut self, body: &str) -> Result<String> {
        let parts: Vec<&str> = body.splitn(2, ' ').collect();
        let command = parts[0].to_lowercase();

        match command.as_str() {
            "/mode" => self.cmd_mode(parts.get(1).copied()),
            "/status" => self.cmd_status(),
            "/forget" => self.cmd_forget(),
            "/help" => Ok(self.cmd_help()),
            _ => Ok(format!(
                "Unknown command: {command}\nType /help for available commands."
            )),
        }
    }

    fn cmd_mode(&mut self, arg: Option<&str>) -> Result<String> {
        match arg.and_then(Mode::parse) {
            Some(mode) => {
                self.mode = mode;
                Ok(format!("Mode set to: {mode}"))
            }
            None => Ok(format!(
                "Usage: /mode [{}]",
                Mode::ALL.map(|m| m.name()).join("|")
            )),
        }
    }

    fn cmd_status(&self) -> Result<String> {
        let uptime = self.start_time.elapsed();
        let hours = uptime.as_secs() / 3600;
        let minutes = (uptime.as_secs() % 3600) / 60;
        let msg_count = self.session.message_count()?;

        Ok(format!(
            "{} — status\n\
             Uptime: {hours}h {minutes}m\n\
             Mode: {} (retry budget: {})\n\
             Planner: {}\n\
             Workspace: {}\n\
             Session: {msg_count} messages",
            self.config.agent.name,
            self.mode,
            self.mode.max_attempts(),
            self.brain.description(),
            self.tools.sandbox().root().display(),
        ))
    }

    fn cmd_forget(&self) -> Result<String> {
        self.session.clear()?;
        Ok("Session history erased.".to_string())
    }

    fn cmd_help(&self) -> String {
        "\
Commands:\n\
  /mode <m>  — Change agent behavior (accurate|fast|creative|debug|teaching)\n\
  /status    — Agent info, uptime, session stats\n\
  /forget    — Erase session history\n\
  /exit      — Quit\n\
  /help      — This message"
            .to_string()
    }

    // ── Request processing ───────────────────────────────

    /// Runs one user request through the plan-execute-retry loop and
    /// returns the final user-visible text.
    ///
    /// The only `Err` here is failure to obtain any plan at all (the
    /// planner backend is unreachable); every tool failure is absorbed
    /// into the retry mechanics instead.
    pub async fn process_request(&mut self, query: &str) -> Result<String> {
        let history = self
            .session
            .recent(self.config.agent.history_window)
            .unwrap_or_default();
        self.session.append("user", query)?;

        let mut retry = RetryContext::new(self.mode.max_attempts());
        let mut log: Vec<StepRecord> = Vec::new();
        let mut state = LoopState::Planning;

        let final_text = loop {
            state = match state {
                LoopState::Planning => {
                    info!(
                        "Planning (attempt {}/{})",
                        retry.attempt + 1,
                        retry.max_attempts()
                    );
                    let plan = self
                        .brain
                        .create_plan(query, self.mode, &history, retry.last_error.as_deref())
                        .await
                        .context("no plan obtainable from the planner")?;

                    if plan.steps.is_empty() {
                        let text = if plan.thought.is_empty() {
                            "I'm not sure what to do with that.".to_string()
                        } else {
                            plan.thought
                        };
                        LoopState::Succeeded(Some(text))
                    } else {
                        info!("Plan: {} ({} steps)", plan.thought, plan.steps.len());
                        LoopState::Executing(plan)
                    }
                }

                LoopState::Executing(plan) => {
                    let mut failed: Option<(String, String)> = None;
                    for step in plan.steps {
                        info!("Executing {}", step.action);
                        let result = self.tools.dispatch(&step).await;
                        let action = step.action.clone();
                        let is_error = result.is_error();
                        let output = result.output.clone();
                        log.push(StepRecord { step, result });

                        // Fail fast: later steps may depend on this one
                        if is_error {
                            warn!("Step {action} failed: {output}");
                            failed = Some((action, output));
                            break;
                        }
                    }
                    match failed {
                        Some((failed_action, error)) => {
                            LoopState::Retrying { failed_action, error }
                        }
                        None => LoopState::Succeeded(None),
                    }
                }

                LoopState::Retrying { failed_action, error } => {
                    retry.record_failure(format!(
                        "Step '{failed_action}' failed with error: {error}"
                    ));
                    if retry.exhausted() {
                        LoopState::Exhausted
                    } else {
                        info!(
                            "Auto-fixing (attempt {}/{})",
                            retry.attempt + 1,
                            retry.max_attempts()
                        );
                        LoopState::Planning
                    }
                }

                LoopState::Succeeded(Some(text)) => break text,
                LoopState::Succeeded(None) => break self.brain.synthesize(query, &log).await,
                LoopState::Exhausted => {
                    warn!("Retry budget exhausted after {} attempts", retry.attempt);
                    break self.brain.synthesize(query, &log).await;
                }
            };
        };

        self.session.append("model", &final_text)?;
        Ok(final_text)
    }
}
