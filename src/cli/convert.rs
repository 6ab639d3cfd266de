//! JSON <-> SummaryState conversion utilities

use crate::SummaryState;

/// Parse a summary state from JSON
///
/// Missing members default to empty, so `{"field": {"FOPR": 10.0}}` is a
/// complete state. Wells, groups, regions and segments are taken from the
/// values when their lists are left out.
///
/// ```
/// use udq_lang::cli::parse_state;
///
/// let st = parse_state(r#"{"well": {"WOPR": {"PROD1": 100.0, "PROD2": 200.0}}}"#).unwrap();
/// assert_eq!(st.wells(), ["PROD1".to_string(), "PROD2".to_string()]);
/// ```
pub fn parse_state(json: &str) -> Result<SummaryState, serde_json::Error> {
    let mut state: SummaryState = serde_json::from_str(json)?;
    state.register_entities();
    Ok(state)
}

/// Convert a summary state to serde_json::Value
pub fn state_to_json(state: &SummaryState) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(state)
}
