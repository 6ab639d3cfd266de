//! Tracks which controls are currently driven by a quantity.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::UdqConfig,
    uda::{ConfigError, UdaControl, UdaValue},
};

/// One control bound to a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Declaration position of the quantity in the configuration
    pub input_index: usize,
    pub udq: String,
    pub wgname: String,
    pub control: UdaControl,
}

/// Bindings of controls to quantities, in registration order.
///
/// # Examples
///
/// ```
/// use udq_lang::{UdqActive, UdqConfig};
/// use udq_lang::uda::{UdaControl, UdaValue};
///
/// let mut config = UdqConfig::default();
/// config.add_assign("WUBHP", vec![], 250.0).unwrap();
///
/// let mut active = UdqActive::default();
/// let value = UdaValue::from("WUBHP");
/// assert_eq!(active.update(&config, &value, "INJ1", UdaControl::WconinjeBhp).unwrap(), 1);
/// assert_eq!(active.update(&config, &value, "INJ1", UdaControl::WconinjeBhp).unwrap(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UdqActive {
    records: Vec<InputRecord>,
}

impl UdqActive {
    /// Records the current target of `control` on `wgname`.
    ///
    /// Returns 1 when the tracked bindings changed and 0 otherwise. A
    /// numeric target drops any binding of the control.
    pub fn update(
        &mut self,
        config: &UdqConfig,
        value: &UdaValue,
        wgname: &str,
        control: UdaControl,
    ) -> Result<usize, ConfigError> {
        match value {
            UdaValue::Udq(udq) => {
                let index = config.input_index(udq).filter(|_| config.has_keyword(udq));
                let Some(index) = index else {
                    return Err(ConfigError::UnknownUdq {
                        udq: udq.clone(),
                        entity: wgname.to_string(),
                        control,
                    });
                };
                Ok(self.add(index.insert_index, udq, wgname, control))
            }
            UdaValue::Numeric(_) => Ok(self.drop(wgname, control)),
        }
    }

    fn position(&self, wgname: &str, control: UdaControl) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.wgname == wgname && r.control == control)
    }

    fn add(&mut self, input_index: usize, udq: &str, wgname: &str, control: UdaControl) -> usize {
        match self.position(wgname, control) {
            Some(at) if self.records[at].udq == udq => 0,
            Some(at) => {
                let record = &mut self.records[at];
                debug!(%wgname, %control, from = %record.udq, to = udq, "UDA rebound");
                record.udq = udq.to_string();
                record.input_index = input_index;
                1
            }
            None => {
                debug!(%wgname, %control, udq, "UDA bound");
                self.records.push(InputRecord {
                    input_index,
                    udq: udq.to_string(),
                    wgname: wgname.to_string(),
                    control,
                });
                1
            }
        }
    }

    fn drop(&mut self, wgname: &str, control: UdaControl) -> usize {
        match self.position(wgname, control) {
            Some(at) => {
                self.records.remove(at);
                1
            }
            None => 0,
        }
    }

    pub fn records(&self) -> &[InputRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The quantity driving `control` on `wgname`, if any.
    pub fn udq_for(&self, wgname: &str, control: UdaControl) -> Option<&str> {
        self.position(wgname, control)
            .map(|at| self.records[at].udq.as_str())
    }

    /// Every (entity, control) pair bound to `udq`.
    pub fn controls_for(&self, udq: &str) -> Vec<(&str, UdaControl)> {
        self.records
            .iter()
            .filter(|r| r.udq == udq)
            .map(|r| (r.wgname.as_str(), r.control))
            .collect()
    }

    /// How many entities use `udq` for `control`.
    pub fn use_count(&self, udq: &str, control: UdaControl) -> usize {
        self.records
            .iter()
            .filter(|r| r.udq == udq && r.control == control)
            .count()
    }
}
