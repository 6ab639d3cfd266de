//! Evaluate every quantity of a deck

use super::{CliError, parse_state};
use crate::{SummaryState, UdqConfig, UdqSet, deck};

/// Options for the eval command
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// Text of the deck holding `UDQ` blocks
    pub deck: String,
    /// Deck file name, used in error locations
    pub filename: String,
    /// Summary state as JSON; an empty state when absent
    pub state: Option<String>,
}

/// Load the deck, evaluate it once and return the evaluated sets
pub fn execute_eval(options: &EvalOptions) -> Result<Vec<UdqSet>, CliError> {
    let mut config = UdqConfig::default();
    deck::load(&options.deck, &options.filename, &mut config)?;

    let mut state = match &options.state {
        Some(json) => parse_state(json)?,
        None => SummaryState::new(),
    };
    Ok(config.eval(&mut state)?)
}
