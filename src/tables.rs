//! User defined tables (UDT) for `TU_NAME[expr]` lookups.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    /// Value of the closest tabulated point (`NV`)
    Nearest,
    /// Linear between neighbouring points (`LC`)
    Linear,
}

impl Interpolation {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "NV" => Some(Interpolation::Nearest),
            "LC" => Some(Interpolation::Linear),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("table has no points")]
    Empty,

    #[error("table abscissas must be strictly increasing (point {index})")]
    NotIncreasing { index: usize },

    #[error("table point {index} is not a finite number")]
    NonFinite { index: usize },

    #[error("table has {x} abscissas but {y} values")]
    LengthMismatch { x: usize, y: usize },
}

/// A one dimensional table. Lookups outside the tabulated range return the
/// value at the nearest end.
///
/// # Examples
///
/// ```
/// use udq_lang::tables::{Interpolation, UserTable};
///
/// let table = UserTable::new(Interpolation::Linear, vec![(0.0, 0.0), (10.0, 100.0)]).unwrap();
/// assert_eq!(table.lookup(2.5), Some(25.0));
/// assert_eq!(table.lookup(20.0), Some(100.0));
/// assert_eq!(table.lookup(f64::NAN), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct UserTable {
    interpolation: Interpolation,
    x: Vec<f64>,
    y: Vec<f64>,
}

/// Serialized form; checked through [`UserTable::new`] on the way in.
#[derive(Deserialize)]
struct RawTable {
    interpolation: Interpolation,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl TryFrom<RawTable> for UserTable {
    type Error = TableError;

    fn try_from(raw: RawTable) -> Result<Self, TableError> {
        if raw.x.len() != raw.y.len() {
            return Err(TableError::LengthMismatch {
                x: raw.x.len(),
                y: raw.y.len(),
            });
        }
        UserTable::new(raw.interpolation, raw.x.into_iter().zip(raw.y).collect())
    }
}

impl UserTable {
    pub fn new(interpolation: Interpolation, points: Vec<(f64, f64)>) -> Result<Self, TableError> {
        if points.is_empty() {
            return Err(TableError::Empty);
        }
        if let Some(index) = points.iter().position(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(TableError::NonFinite { index });
        }
        if let Some(index) = points.windows(2).position(|w| w[1].0 <= w[0].0) {
            return Err(TableError::NotIncreasing { index: index + 1 });
        }
        let (x, y) = points.into_iter().unzip();
        Ok(UserTable { interpolation, x, y })
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// The tabulated value at `arg`; `None` when `arg` is NaN.
    pub fn lookup(&self, arg: f64) -> Option<f64> {
        if arg.is_nan() {
            return None;
        }
        let (first, last) = (self.x.first()?, self.x.last()?);
        if arg <= *first {
            return self.y.first().copied();
        }
        if arg >= *last {
            return self.y.last().copied();
        }
        // first point strictly above arg, 1..len
        let upper = self.x.partition_point(|x| *x <= arg);
        let lower = upper.checked_sub(1)?;
        let (x0, x1) = (self.x[lower], self.x[upper]);
        let value = match self.interpolation {
            Interpolation::Nearest => {
                if arg - x0 <= x1 - arg {
                    self.y[lower]
                } else {
                    self.y[upper]
                }
            }
            Interpolation::Linear => {
                let t = (arg - x0) / (x1 - x0);
                self.y[lower] + t * (self.y[upper] - self.y[lower])
            }
        };
        Some(value)
    }
}
