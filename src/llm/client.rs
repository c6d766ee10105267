//! `Brain` trait — abstraction over the external planner/synthesizer.
//!
//! The agent runtime treats the planner as an opaque oracle: it hands
//! over the request, mode, history, and (on retries) the previous
//! failure, and gets back a structured [`Plan`]. Implementations
//! translate that contract to a concrete LLM API; tests substitute a
//! scripted one.

use anyhow::Result;
use async_trait::async_trait;

use crate::mode::Mode;
use crate::plan::{Plan, StepRecord};
use crate::session::SessionEntry;

#[async_trait]
pub trait Brain: Send + Sync {
    /// Produces a plan for the request.
    ///
    /// `error_context` carries the previous round's failure when this
    /// is a retry. Implementations must return `Ok` with a zero-step
    /// plan (thought explaining the problem) when the backend answers
    /// with something unparseable; `Err` is reserved for not reaching
    /// the backend at all, which the runtime treats as fatal for the
    /// request.
    async fn create_plan(
        &self,
        query: &str,
        mode: Mode,
        history: &[SessionEntry],
        error_context: Option<&str>,
    ) -> Result<Plan>;

    /// Summarizes the results log into the final user-visible text.
    ///
    /// Never fails: implementations degrade to a fixed fallback string
    /// when the backend is unreachable.
    async fn synthesize(&self, query: &str, results: &[StepRecord]) -> String;

    /// Human-readable description of the backend and model, for
    /// status output.
    fn description(&self) -> String;
}

/// Fallback summary used when the synthesizer call fails.
pub const FALLBACK_SUMMARY: &str = "Task completed (could not generate summary).";
