//! CLI support for udq-lang
//!
//! Provides programmatic access to the `udq` commands so other tools can
//! check expressions and evaluate decks without spawning the binary.

mod check;
mod convert;
mod eval;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use convert::{parse_state, state_to_json};
pub use eval::{EvalOptions, execute_eval};

use std::io;

/// Errors that can occur during CLI operations
#[derive(Debug)]
pub enum CliError {
    /// Parser error
    Parse(crate::ParseError),
    /// Evaluation error
    Eval(crate::EvalError),
    /// A quantity of the deck failed to evaluate
    Udq(crate::UdqError),
    /// Invalid deck statement
    Input(crate::InputError),
    /// JSON parsing error
    Json(serde_json::Error),
    /// IO error
    Io(io::Error),
    /// No summary state provided
    NoInput,
    /// `--target` is not a quantity kind
    UnknownTarget(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Parse(e) => write!(f, "Parse error: {}", e),
            CliError::Eval(e) => write!(f, "Evaluation error: {}", e),
            CliError::Udq(e) => write!(f, "Evaluation error: {}", e),
            CliError::Input(e) => write!(f, "Input error: {}", e),
            CliError::Json(e) => write!(f, "Invalid JSON: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::NoInput => write!(f, "No summary state provided. Use --state or pipe JSON to stdin."),
            CliError::UnknownTarget(t) => {
                write!(f, "Unknown target: '{}'\nUse a keyword prefix such as W, G, F, S or R.", t)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Parse(e) => Some(e),
            CliError::Eval(e) => Some(e),
            CliError::Udq(e) => Some(e),
            CliError::Input(e) => Some(e),
            CliError::Json(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<crate::ParseError> for CliError {
    fn from(e: crate::ParseError) -> Self {
        CliError::Parse(e)
    }
}

impl From<crate::EvalError> for CliError {
    fn from(e: crate::EvalError) -> Self {
        CliError::Eval(e)
    }
}

impl From<crate::UdqError> for CliError {
    fn from(e: crate::UdqError) -> Self {
        CliError::Udq(e)
    }
}

impl From<crate::InputError> for CliError {
    fn from(e: crate::InputError) -> Self {
        CliError::Input(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
