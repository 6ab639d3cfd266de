//! Minimal unit system: conversion of deck values to SI.

use serde::{Deserialize, Serialize};

const DAY: f64 = 86_400.0;
const BARSA: f64 = 1.0e5;
const PSIA: f64 = 6_894.757_293_168_36;
const STB: f64 = 0.158_987_294_928;
const MSCF: f64 = 28.316_846_592;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measure {
    Identity,
    LiquidSurfaceRate,
    GasSurfaceRate,
    /// Reservoir volume rate
    Rate,
    Pressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitSystem {
    #[default]
    Metric,
    Field,
}

impl UnitSystem {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "METRIC" => Some(UnitSystem::Metric),
            "FIELD" => Some(UnitSystem::Field),
            _ => None,
        }
    }

    /// Multiplier taking a deck value of `measure` to SI.
    pub fn si_factor(&self, measure: Measure) -> f64 {
        match (self, measure) {
            (_, Measure::Identity) => 1.0,
            (UnitSystem::Metric, Measure::Pressure) => BARSA,
            (UnitSystem::Metric, _) => 1.0 / DAY,
            (UnitSystem::Field, Measure::Pressure) => PSIA,
            (UnitSystem::Field, Measure::GasSurfaceRate) => MSCF / DAY,
            (UnitSystem::Field, Measure::LiquidSurfaceRate | Measure::Rate) => STB / DAY,
        }
    }

    pub fn to_si(&self, measure: Measure, value: f64) -> f64 {
        value * self.si_factor(measure)
    }

    pub fn from_si(&self, measure: Measure, value: f64) -> f64 {
        value / self.si_factor(measure)
    }
}

/// Convert bars to Pascal.
pub fn barsa(value: f64) -> f64 {
    value * BARSA
}
