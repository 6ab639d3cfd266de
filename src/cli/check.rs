//! Check UDQ expressions and evaluate them against a summary state

use super::{CliError, parse_state};
use crate::output::set_to_value;
use crate::{EvalContext, VarType, parser::parse_expression};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The expression to check
    pub expression: String,
    /// Keyword or prefix giving the kind to evaluate for, e.g. `W`
    pub target: Option<String>,
    /// Summary state as JSON
    pub state: Option<String>,
    /// Only validate syntax, don't evaluate
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Syntax validation passed; holds the canonical expression
    SyntaxValid(String),
    /// Expression evaluated successfully with JSON output
    Success(serde_json::Value),
}

/// The target kind: `--target` if given, otherwise the kind of the expression.
fn target_type(target: Option<&str>, inferred: VarType) -> Result<VarType, CliError> {
    match target {
        Some(t) => VarType::from_keyword(t).ok_or_else(|| CliError::UnknownTarget(t.to_string())),
        None if inferred == VarType::Scalar => Ok(VarType::Field),
        None => Ok(inferred),
    }
}

/// Execute a udq check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let node = parse_expression(&options.expression)?;
    let target = target_type(options.target.as_deref(), node.var_type)?;

    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid(node.to_string()));
    }

    let json_str = options.state.as_ref().ok_or(CliError::NoInput)?;
    let state = parse_state(json_str)?;

    let result = node.eval(target, &EvalContext::new(&state))?;
    Ok(CheckResult::Success(set_to_value(&result)))
}
