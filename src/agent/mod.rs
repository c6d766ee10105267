pub mod retry;
pub mod runtime;

pub use runtime::AgentRuntime;
