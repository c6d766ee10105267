//! Agent behavior modes.
//!
//! A mode bundles two policies: how many planning rounds the
//! auto-correction loop may spend on one request, and the style
//! instruction injected into the planner prompt. `accurate` is the
//! only mode that retries; the others trade robustness for speed.

use std::fmt;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Accurate,
    Fast,
    Creative,
    Debug,
    Teaching,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::Accurate,
        Mode::Fast,
        Mode::Creative,
        Mode::Debug,
        Mode::Teaching,
    ];

    pub fn parse(s: &str) -> Option<Mode> {
        match s.trim().to_lowercase().as_str() {
            "accurate" => Some(Mode::Accurate),
            "fast" => Some(Mode::Fast),
            "creative" => Some(Mode::Creative),
            "debug" => Some(Mode::Debug),
            "teaching" => Some(Mode::Teaching),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Accurate => "accurate",
            Mode::Fast => "fast",
            Mode::Creative => "creative",
            Mode::Debug => "debug",
            Mode::Teaching => "teaching",
        }
    }

    /// Total planning rounds allowed per user request (always ≥ 1).
    pub fn max_attempts(self) -> u32 {
        match self {
            Mode::Accurate => 3,
            _ => 1,
        }
    }

    /// Style instruction appended to the planner prompt.
    pub fn planner_style(self) -> &'static str {
        match self {
            Mode::Accurate => {
                "Prioritize correctness. Write robust code with checks. \
                 If you write code, ensure it prints the result."
            }
            Mode::Fast => "Be concise. Provide the simplest working solution.",
            Mode::Creative => "Think outside the box. Suggest innovative approaches.",
            Mode::Debug => "Analyze thoroughly. Add debug prints. Explain the 'why'.",
            Mode::Teaching => "Explain every step like a tutor. Add comments to code.",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
