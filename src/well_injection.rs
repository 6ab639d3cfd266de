//! Injection controls of a well and their resolution to SI targets.
//!
//! Targets are [`UdaValue`]s: a literal in deck units or the name of a
//! quantity that is looked up in the summary state when the controls are
//! resolved.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    active::UdqActive,
    config::UdqConfig,
    context::SummaryState,
    uda::{ConfigError, UdaControl, UdaValue, eval_well_uda, eval_well_uda_rate},
    units::{Measure, UnitSystem, barsa},
};

/// Historical BHP limit used when none is given, in barsa.
pub const DEFAULT_HISTORICAL_BHP_LIMIT: f64 = 6891.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InjectorType {
    #[default]
    Water,
    Gas,
    Oil,
    Multi,
}

impl InjectorType {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "WATER" | "WAT" => Ok(InjectorType::Water),
            "GAS" => Ok(InjectorType::Gas),
            "OIL" => Ok(InjectorType::Oil),
            "MULTI" => Ok(InjectorType::Multi),
            _ => Err(ConfigError::UnknownInjectorType {
                name: name.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InjectorType::Water => "WATER",
            InjectorType::Gas => "GAS",
            InjectorType::Oil => "OIL",
            InjectorType::Multi => "MULTI",
        }
    }
}

impl fmt::Display for InjectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Injection control modes; each enabled mode is one bit of the control mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InjectorCMode {
    Rate,
    Resv,
    Bhp,
    Thp,
    Grup,
    #[default]
    Undefined,
}

impl InjectorCMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "RATE" => Some(InjectorCMode::Rate),
            "RESV" => Some(InjectorCMode::Resv),
            "BHP" => Some(InjectorCMode::Bhp),
            "THP" => Some(InjectorCMode::Thp),
            "GRUP" => Some(InjectorCMode::Grup),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InjectorCMode::Rate => "RATE",
            InjectorCMode::Resv => "RESV",
            InjectorCMode::Bhp => "BHP",
            InjectorCMode::Thp => "THP",
            InjectorCMode::Grup => "GRUP",
            InjectorCMode::Undefined => "CMODE_UNDEFINED",
        }
    }

    pub fn bit(&self) -> u32 {
        match self {
            InjectorCMode::Rate => 1,
            InjectorCMode::Resv => 2,
            InjectorCMode::Bhp => 4,
            InjectorCMode::Thp => 8,
            InjectorCMode::Grup => 16,
            InjectorCMode::Undefined => 512,
        }
    }
}

impl fmt::Display for InjectorCMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Targets that `WELTARG` and `WTMULT` can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeltargCMode {
    Orat,
    Wrat,
    Grat,
    Lrat,
    Crat,
    Resv,
    Bhp,
    Thp,
    Vfp,
    Lift,
    Guid,
}

impl WeltargCMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "ORAT" => Some(WeltargCMode::Orat),
            "WRAT" => Some(WeltargCMode::Wrat),
            "GRAT" => Some(WeltargCMode::Grat),
            "LRAT" => Some(WeltargCMode::Lrat),
            "CRAT" => Some(WeltargCMode::Crat),
            "RESV" => Some(WeltargCMode::Resv),
            "BHP" => Some(WeltargCMode::Bhp),
            "THP" => Some(WeltargCMode::Thp),
            "VFP" => Some(WeltargCMode::Vfp),
            "LIFT" => Some(WeltargCMode::Lift),
            "GUID" => Some(WeltargCMode::Guid),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WeltargCMode::Orat => "ORAT",
            WeltargCMode::Wrat => "WRAT",
            WeltargCMode::Grat => "GRAT",
            WeltargCMode::Lrat => "LRAT",
            WeltargCMode::Crat => "CRAT",
            WeltargCMode::Resv => "RESV",
            WeltargCMode::Bhp => "BHP",
            WeltargCMode::Thp => "THP",
            WeltargCMode::Vfp => "VFP",
            WeltargCMode::Lift => "LIFT",
            WeltargCMode::Guid => "GUID",
        }
    }

    /// The injector type a surface rate target requires.
    fn required_type(&self) -> Option<InjectorType> {
        match self {
            WeltargCMode::Orat => Some(InjectorType::Oil),
            WeltargCMode::Wrat => Some(InjectorType::Water),
            WeltargCMode::Grat => Some(InjectorType::Gas),
            _ => None,
        }
    }
}

/// The injection items of a `WCONINJE` record, already split into values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InjectionRecord {
    pub injector_type: InjectorType,
    pub cmode: String,
    pub rate: Option<UdaValue>,
    pub resv: Option<UdaValue>,
    pub bhp: Option<UdaValue>,
    pub thp: Option<UdaValue>,
    pub vfp_table: u32,
}

/// The items of a `WCONINJH` record, in deck units.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InjectionHistory {
    pub injector_type: InjectorType,
    pub cmode: String,
    pub rate: Option<f64>,
    pub bhp: Option<f64>,
    pub thp: Option<f64>,
}

/// Resolved injection controls, all values in SI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionControls {
    pub controls: u32,
    pub surface_rate: f64,
    pub reservoir_rate: f64,
    pub bhp_limit: f64,
    pub thp_limit: f64,
    pub injector_type: InjectorType,
    pub cmode: InjectorCMode,
    pub vfp_table_number: u32,
    pub prediction_mode: bool,
}

impl InjectionControls {
    pub fn has_control(&self, mode: InjectorCMode) -> bool {
        self.controls & mode.bit() != 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellInjectionProperties {
    pub name: String,
    pub units: UnitSystem,
    pub surface_injection_rate: UdaValue,
    pub reservoir_injection_rate: UdaValue,
    pub bhp_target: UdaValue,
    pub thp_target: UdaValue,
    /// Historical limits, SI
    pub bhp_hist_limit: f64,
    pub thp_hist_limit: f64,
    /// Observed historical pressures, SI
    pub bhph: f64,
    pub thph: f64,
    pub vfp_table_number: u32,
    pub prediction_mode: bool,
    injection_controls: u32,
    pub injector_type: InjectorType,
    pub control_mode: InjectorCMode,
}

impl WellInjectionProperties {
    pub fn new(units: UnitSystem, name: impl Into<String>) -> Self {
        WellInjectionProperties {
            name: name.into(),
            units,
            surface_injection_rate: UdaValue::default(),
            reservoir_injection_rate: UdaValue::default(),
            bhp_target: UdaValue::default(),
            thp_target: UdaValue::default(),
            bhp_hist_limit: 0.0,
            thp_hist_limit: 0.0,
            bhph: 0.0,
            thph: 0.0,
            vfp_table_number: 0,
            prediction_mode: true,
            injection_controls: 0,
            injector_type: InjectorType::Water,
            control_mode: InjectorCMode::Undefined,
        }
    }

    pub fn injection_controls(&self) -> u32 {
        self.injection_controls
    }

    pub fn has_injection_control(&self, mode: InjectorCMode) -> bool {
        self.injection_controls & mode.bit() != 0
    }

    pub fn add_injection_control(&mut self, mode: InjectorCMode) {
        self.injection_controls |= mode.bit();
    }

    pub fn drop_injection_control(&mut self, mode: InjectorCMode) {
        self.injection_controls &= !mode.bit();
    }

    pub fn clear_controls(&mut self) {
        self.injection_controls = 0;
    }

    /// Switches to the control mode named `mode`, which must be enabled.
    pub fn set_control_mode(&mut self, mode: &str) -> Result<(), ConfigError> {
        match InjectorCMode::from_name(mode) {
            Some(cmode) if self.has_injection_control(cmode) => {
                self.control_mode = cmode;
                Ok(())
            }
            _ => Err(ConfigError::InvalidControlMode {
                mode: mode.to_string(),
                well: self.name.clone(),
            }),
        }
    }

    /// Applies a `WCONINJE` record. `bhp_default` (deck units) is the BHP
    /// limit when the record leaves it out; BHP is always a control.
    pub fn handle_wconinje(
        &mut self,
        record: &InjectionRecord,
        bhp_default: f64,
        group_control: bool,
    ) -> Result<(), ConfigError> {
        self.injector_type = record.injector_type;
        self.prediction_mode = true;

        match &record.rate {
            Some(rate) => {
                self.surface_injection_rate = rate.clone();
                self.add_injection_control(InjectorCMode::Rate);
            }
            None => self.drop_injection_control(InjectorCMode::Rate),
        }
        match &record.resv {
            Some(resv) => {
                self.reservoir_injection_rate = resv.clone();
                self.add_injection_control(InjectorCMode::Resv);
            }
            None => self.drop_injection_control(InjectorCMode::Resv),
        }

        self.vfp_table_number = record.vfp_table;
        match &record.thp {
            Some(thp) => {
                if self.vfp_table_number == 0 {
                    return Err(ConfigError::MissingVfpTable {
                        well: self.name.clone(),
                    });
                }
                self.thp_target = thp.clone();
                self.add_injection_control(InjectorCMode::Thp);
            }
            None => self.drop_injection_control(InjectorCMode::Thp),
        }

        self.bhp_target = record.bhp.clone().unwrap_or(UdaValue::Numeric(bhp_default));
        self.add_injection_control(InjectorCMode::Bhp);

        if group_control {
            self.add_injection_control(InjectorCMode::Grup);
        } else {
            self.drop_injection_control(InjectorCMode::Grup);
        }

        self.set_control_mode(&record.cmode)
    }

    /// Applies a `WCONINJH` record and switches the well to history mode.
    ///
    /// Only `RATE` and `BHP` are historical control modes; others are reset
    /// to `RATE` with a warning. `bhp_default` is in SI.
    pub fn handle_wconinjh(
        &mut self,
        record: &InjectionHistory,
        vfp_table: u32,
        bhp_default: f64,
        is_producer: bool,
    ) -> Result<(), ConfigError> {
        self.injector_type = record.injector_type;
        if let Some(rate) = record.rate {
            self.surface_injection_rate = UdaValue::Numeric(rate);
        }
        if let Some(bhp) = record.bhp {
            self.bhph = self.units.to_si(Measure::Pressure, bhp);
        }
        if let Some(thp) = record.thp {
            self.thph = self.units.to_si(Measure::Pressure, thp);
        }

        let requested = InjectorCMode::from_name(&record.cmode).ok_or_else(|| ConfigError::InvalidControlMode {
            mode: record.cmode.clone(),
            well: self.name.clone(),
        })?;
        let cmode = match requested {
            InjectorCMode::Rate | InjectorCMode::Bhp => requested,
            _ => {
                warn!(
                    well = %self.name,
                    requested = %requested,
                    target = %self.surface_injection_rate,
                    "only RATE and BHP controls are supported in history mode, control reset to RATE"
                );
                InjectorCMode::Rate
            }
        };

        if cmode == InjectorCMode::Bhp {
            self.bhp_hist_limit = self.bhph;
        } else if self.prediction_mode || self.control_mode == InjectorCMode::Bhp || is_producer {
            self.bhp_hist_limit = bhp_default;
        }

        self.add_injection_control(InjectorCMode::Bhp);
        self.add_injection_control(cmode);
        self.control_mode = cmode;
        self.prediction_mode = false;
        self.vfp_table_number = vfp_table;
        Ok(())
    }

    pub fn reset_default_historical_bhp_limit(&mut self) {
        self.bhp_hist_limit = barsa(DEFAULT_HISTORICAL_BHP_LIMIT);
    }

    pub fn reset_bhp_limit(&mut self) {
        self.bhp_hist_limit = 0.0;
    }

    fn check_type(&self, cmode: WeltargCMode) -> Result<(), ConfigError> {
        match cmode.required_type() {
            Some(required) if required != self.injector_type => Err(ConfigError::InjectorTypeMismatch {
                well: self.name.clone(),
                required,
                target: cmode.name().to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn invalid_target(keyword: &str, cmode: WeltargCMode) -> ConfigError {
        ConfigError::InvalidTarget {
            keyword: keyword.to_string(),
            target: cmode.name().to_string(),
        }
    }

    /// Changes one target with `WELTARG`.
    pub fn handle_weltarg(&mut self, cmode: WeltargCMode, value: UdaValue) -> Result<(), ConfigError> {
        match cmode {
            WeltargCMode::Bhp if self.prediction_mode => self.bhp_target = value,
            WeltargCMode::Bhp => {
                let bhp = value.numeric().ok_or_else(|| Self::invalid_target("WELTARG", cmode))?;
                self.bhp_hist_limit = self.units.to_si(Measure::Pressure, bhp);
            }
            WeltargCMode::Orat | WeltargCMode::Wrat | WeltargCMode::Grat => {
                self.check_type(cmode)?;
                self.surface_injection_rate = value;
            }
            WeltargCMode::Thp => self.thp_target = value,
            WeltargCMode::Resv => self.reservoir_injection_rate = value,
            WeltargCMode::Vfp => {
                let table = value
                    .numeric()
                    .filter(|t| *t >= 0.0 && t.fract() == 0.0 && *t <= f64::from(u32::MAX))
                    .ok_or_else(|| Self::invalid_target("WELTARG", cmode))?;
                self.vfp_table_number = table as u32;
            }
            WeltargCMode::Guid => {}
            WeltargCMode::Lrat | WeltargCMode::Crat | WeltargCMode::Lift => {
                return Err(Self::invalid_target("WELTARG", cmode));
            }
        }
        Ok(())
    }

    /// Scales a numeric target with `WTMULT`.
    pub fn handle_wtmult(&mut self, cmode: WeltargCMode, factor: f64) -> Result<(), ConfigError> {
        self.check_type(cmode)?;
        let well = self.name.clone();
        let target = match cmode {
            WeltargCMode::Bhp => &mut self.bhp_target,
            WeltargCMode::Orat | WeltargCMode::Wrat | WeltargCMode::Grat => &mut self.surface_injection_rate,
            WeltargCMode::Thp => &mut self.thp_target,
            WeltargCMode::Resv => &mut self.reservoir_injection_rate,
            _ => return Err(Self::invalid_target("WTMULT", cmode)),
        };
        match target {
            UdaValue::Numeric(value) => {
                *value *= factor;
                Ok(())
            }
            UdaValue::Udq(_) => Err(ConfigError::UdqTarget {
                well,
                target: cmode.name().to_string(),
            }),
        }
    }

    /// Sets the target of `control` and records the binding in `active`.
    ///
    /// Surface rate controls of another phase leave both untouched.
    pub fn update_uda(
        &mut self,
        config: &UdqConfig,
        active: &mut UdqActive,
        control: UdaControl,
        value: UdaValue,
    ) -> Result<(), ConfigError> {
        let applies = match control {
            UdaControl::WconinjeRate => true,
            UdaControl::WeltargOrat => self.injector_type == InjectorType::Oil,
            UdaControl::WeltargWrat => self.injector_type == InjectorType::Water,
            UdaControl::WeltargGrat => self.injector_type == InjectorType::Gas,
            _ => true,
        };
        if !applies {
            debug!(well = %self.name, %control, "UDA ignored for injector type");
            return Ok(());
        }

        active.update(config, &value, &self.name, control)?;
        match control {
            UdaControl::WconinjeRate
            | UdaControl::WeltargOrat
            | UdaControl::WeltargWrat
            | UdaControl::WeltargGrat => self.surface_injection_rate = value,
            UdaControl::WconinjeResv | UdaControl::WeltargResv => self.reservoir_injection_rate = value,
            UdaControl::WconinjeBhp | UdaControl::WeltargBhp => self.bhp_target = value,
            UdaControl::WconinjeThp | UdaControl::WeltargThp => self.thp_target = value,
        }
        Ok(())
    }

    /// Registers the `WCONINJE` targets in `active`; true when anything changed.
    pub fn update_udq_active(&self, config: &UdqConfig, active: &mut UdqActive) -> Result<bool, ConfigError> {
        let mut count = 0;
        count += active.update(config, &self.surface_injection_rate, &self.name, UdaControl::WconinjeRate)?;
        count += active.update(config, &self.reservoir_injection_rate, &self.name, UdaControl::WconinjeResv)?;
        count += active.update(config, &self.bhp_target, &self.name, UdaControl::WconinjeBhp)?;
        count += active.update(config, &self.thp_target, &self.name, UdaControl::WconinjeThp)?;
        Ok(count > 0)
    }

    /// Registers the target changed by a `WELTARG` record.
    pub fn update_weltarg_active(
        &self,
        config: &UdqConfig,
        cmode: WeltargCMode,
        active: &mut UdqActive,
    ) -> Result<bool, ConfigError> {
        let (value, control) = match cmode {
            WeltargCMode::Orat | WeltargCMode::Wrat | WeltargCMode::Grat
                if cmode.required_type() != Some(self.injector_type) =>
            {
                return Ok(false);
            }
            WeltargCMode::Orat => (&self.surface_injection_rate, UdaControl::WeltargOrat),
            WeltargCMode::Wrat => (&self.surface_injection_rate, UdaControl::WeltargWrat),
            WeltargCMode::Grat => (&self.surface_injection_rate, UdaControl::WeltargGrat),
            WeltargCMode::Resv => (&self.reservoir_injection_rate, UdaControl::WeltargResv),
            WeltargCMode::Bhp => (&self.bhp_target, UdaControl::WeltargBhp),
            WeltargCMode::Thp => (&self.thp_target, UdaControl::WeltargThp),
            _ => return Ok(false),
        };
        Ok(active.update(config, value, &self.name, control)? > 0)
    }

    /// Resolves every target to SI against the current summary state.
    ///
    /// In history mode the BHP and THP limits are the historical ones.
    pub fn controls(&self, st: &SummaryState, undefined_value: f64) -> InjectionControls {
        let (bhp_limit, thp_limit) = if self.prediction_mode {
            (
                eval_well_uda(&self.bhp_target, &self.name, st, undefined_value, Measure::Pressure, self.units),
                eval_well_uda(&self.thp_target, &self.name, st, undefined_value, Measure::Pressure, self.units),
            )
        } else {
            (self.bhp_hist_limit, self.thp_hist_limit)
        };

        InjectionControls {
            controls: self.injection_controls,
            surface_rate: eval_well_uda_rate(
                &self.surface_injection_rate,
                &self.name,
                st,
                undefined_value,
                self.injector_type,
                self.units,
            ),
            reservoir_rate: eval_well_uda(
                &self.reservoir_injection_rate,
                &self.name,
                st,
                undefined_value,
                Measure::Rate,
                self.units,
            ),
            bhp_limit,
            thp_limit,
            injector_type: self.injector_type,
            cmode: self.control_mode,
            vfp_table_number: self.vfp_table_number,
            prediction_mode: self.prediction_mode,
        }
    }
}
