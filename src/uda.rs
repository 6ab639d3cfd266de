//! User defined arguments: control targets given either as a number or as
//! the name of a quantity.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    context::SummaryState,
    units::{Measure, UnitSystem},
    well_injection::InjectorType,
};

/// A control target: a literal in deck units or a UDQ name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UdaValue {
    Numeric(f64),
    Udq(String),
}

impl UdaValue {
    pub fn is_numeric(&self) -> bool {
        matches!(self, UdaValue::Numeric(_))
    }

    pub fn numeric(&self) -> Option<f64> {
        match self {
            UdaValue::Numeric(value) => Some(*value),
            UdaValue::Udq(_) => None,
        }
    }

    pub fn udq(&self) -> Option<&str> {
        match self {
            UdaValue::Udq(name) => Some(name),
            UdaValue::Numeric(_) => None,
        }
    }
}

impl Default for UdaValue {
    fn default() -> Self {
        UdaValue::Numeric(0.0)
    }
}

impl From<f64> for UdaValue {
    fn from(value: f64) -> Self {
        UdaValue::Numeric(value)
    }
}

impl From<&str> for UdaValue {
    fn from(name: &str) -> Self {
        UdaValue::Udq(name.to_string())
    }
}

impl fmt::Display for UdaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UdaValue::Numeric(value) => write!(f, "{}", value),
            UdaValue::Udq(name) => f.write_str(name),
        }
    }
}

/// Controls whose target may be a user defined argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UdaControl {
    WconinjeRate,
    WconinjeResv,
    WconinjeBhp,
    WconinjeThp,
    WeltargOrat,
    WeltargWrat,
    WeltargGrat,
    WeltargResv,
    WeltargBhp,
    WeltargThp,
}

impl UdaControl {
    pub fn name(&self) -> &'static str {
        match self {
            UdaControl::WconinjeRate => "WCONINJE_RATE",
            UdaControl::WconinjeResv => "WCONINJE_RESV",
            UdaControl::WconinjeBhp => "WCONINJE_BHP",
            UdaControl::WconinjeThp => "WCONINJE_THP",
            UdaControl::WeltargOrat => "WELTARG_ORAT",
            UdaControl::WeltargWrat => "WELTARG_WRAT",
            UdaControl::WeltargGrat => "WELTARG_GRAT",
            UdaControl::WeltargResv => "WELTARG_RESV",
            UdaControl::WeltargBhp => "WELTARG_BHP",
            UdaControl::WeltargThp => "WELTARG_THP",
        }
    }
}

impl fmt::Display for UdaControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors binding controls, fatal to deck processing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Tried to set invalid control: {mode} for well: {well}")]
    InvalidControlMode { mode: String, well: String },

    #[error("Unknown injector type '{name}'")]
    UnknownInjectorType { name: String },

    #[error("Well {well}: well type must be {required} to set the {target} target")]
    InjectorTypeMismatch {
        well: String,
        required: InjectorType,
        target: String,
    },

    #[error("UDQ {udq} used by {control} of {entity} is not defined")]
    UnknownUdq {
        udq: String,
        entity: String,
        control: UdaControl,
    },

    #[error("Well {well}: cannot apply WTMULT to the UDQ bound {target} target")]
    UdqTarget { well: String, target: String },

    #[error("Invalid target {target} supplied to {keyword}")]
    InvalidTarget { keyword: String, target: String },

    #[error("Well {well} must have a VFP table to handle non-zero THP constraint")]
    MissingVfpTable { well: String },
}

/// Resolves a well control target to SI.
///
/// A quantity name is looked up as a well value first, then as a field
/// value, and falls back to `undefined_value`. Rates from quantities are
/// never negative.
pub fn eval_well_uda(
    value: &UdaValue,
    well: &str,
    st: &SummaryState,
    undefined_value: f64,
    measure: Measure,
    units: UnitSystem,
) -> f64 {
    let raw = match value {
        UdaValue::Numeric(v) => return units.to_si(measure, *v),
        UdaValue::Udq(name) => st
            .get_well_var(well, name)
            .or_else(|| st.get(name))
            .unwrap_or(undefined_value),
    };
    let raw = match measure {
        Measure::Pressure | Measure::Identity => raw,
        _ => raw.max(0.0),
    };
    units.to_si(measure, raw)
}

/// Surface rates are measured by the injected phase.
pub fn eval_well_uda_rate(
    value: &UdaValue,
    well: &str,
    st: &SummaryState,
    undefined_value: f64,
    injector_type: InjectorType,
    units: UnitSystem,
) -> f64 {
    let measure = match injector_type {
        InjectorType::Gas => Measure::GasSurfaceRate,
        _ => Measure::LiquidSurfaceRate,
    };
    eval_well_uda(value, well, st, undefined_value, measure, units)
}
