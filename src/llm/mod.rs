pub mod client;
pub mod gemini;

pub use client::{Brain, FALLBACK_SUMMARY};
pub use gemini::GeminiClient;
