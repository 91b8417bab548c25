//! Front-end error types.

use std::path::PathBuf;

/// Error type for front-end operations.
///
/// None of these end a debugging session: each one either rejects a single
/// input line or degrades a single pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendError {
    /// The input matches no production of the command grammar
    GrammarMismatch { input: String },
    /// An embedded expression was rejected by the expression validator
    InvalidExpression { expression: String, reason: String },
    /// Malformed numeric argument to the list operation
    ArgumentParse { arg: String },
    /// Source file missing or unreadable
    FileUnavailable { path: PathBuf, reason: String },
    /// The grammar could not be lowered into a matcher
    GrammarCompile(String),
    /// Configuration file could not be read or parsed
    Config(String),
    /// Terminal setup, draw or input failure
    Terminal(String),
    /// Error reported by the debug engine
    Engine(String),
}

impl std::fmt::Display for FrontendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrontendError::GrammarMismatch { input } => {
                write!(f, "Invalid command: {:?}", input.trim())
            }
            FrontendError::InvalidExpression { expression, reason } => {
                write!(f, "Invalid expression {:?}: {}", expression, reason)
            }
            FrontendError::ArgumentParse { arg } => write!(f, "Error in argument: {:?}", arg),
            FrontendError::FileUnavailable { path, reason } => {
                write!(f, "Cannot read {}: {}", path.display(), reason)
            }
            FrontendError::GrammarCompile(msg) => write!(f, "Grammar error: {}", msg),
            FrontendError::Config(msg) => write!(f, "Config error: {}", msg),
            FrontendError::Terminal(msg) => write!(f, "Terminal error: {}", msg),
            FrontendError::Engine(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FrontendError {}

impl From<regex::Error> for FrontendError {
    fn from(e: regex::Error) -> Self {
        FrontendError::GrammarCompile(e.to_string())
    }
}
