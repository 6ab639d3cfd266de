//! JSON rendering of evaluated quantities.
//!
//! Every set becomes an object with its kind and one member per entity;
//! undefined entries are `null`. Keys are sorted, so output is
//! deterministic.
//!
//! # Examples
//!
//! ```
//! use udq_lang::UdqSet;
//! use udq_lang::output::to_json;
//!
//! let wells = vec!["PROD1".to_string(), "PROD2".to_string()];
//! let mut set = UdqSet::wells("WUOPRL", &wells, None);
//! set.assign_entity("PROD1", Some(78.0));
//!
//! assert_eq!(
//!     to_json(&[set]),
//!     r#"{"WUOPRL":{"type":"well","values":{"PROD1":78.0,"PROD2":null}}}"#
//! );
//! ```

use serde_json::{Map, Value, json};

use crate::value::UdqSet;

/// One evaluated set as a JSON value.
pub fn set_to_value(set: &UdqSet) -> Value {
    let values: Map<String, Value> = set
        .iter()
        .map(|entry| {
            let value = entry.value.map_or(Value::Null, |v| json!(v));
            (entry.label(), value)
        })
        .collect();
    json!({
        "type": set.var_type().name(),
        "values": values,
    })
}

fn sets_to_value(sets: &[UdqSet]) -> Value {
    Value::Object(
        sets.iter()
            .map(|set| (set.name().to_string(), set_to_value(set)))
            .collect(),
    )
}

/// Compact JSON for a list of sets, keyed by quantity name.
pub fn to_json(sets: &[UdqSet]) -> String {
    sets_to_value(sets).to_string()
}

/// Pretty JSON with two space indentation.
pub fn to_json_pretty(sets: &[UdqSet]) -> String {
    format!("{:#}", sets_to_value(sets))
}
