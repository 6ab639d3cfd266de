use serde::{Deserialize, Serialize};

use crate::{ast::Node, tables::UserTable};

/// One record of a `UDQ` keyword, or a whole `UDT` table.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Defines a quantity by an expression
    ///
    /// A later `DEFINE` or `ASSIGN` of the same name replaces this one.
    ///
    /// # Example
    /// ```text
    /// DEFINE WUOPRL (WOPR PROD1 - 150) * 0.90 /
    /// ```
    Define {
        name: String,
        expression: String,
        node: Node,
    },

    /// Assigns a constant, optionally only to the entities matching a selector
    ///
    /// # Examples
    /// ```text
    /// ASSIGN WULPRL 400. /
    /// ASSIGN WUBHP 'INJ*' 250 /
    /// ```
    Assign {
        name: String,
        selector: Vec<String>,
        value: f64,
    },

    /// Declares the unit string of a quantity
    ///
    /// # Example
    /// ```text
    /// UNITS WUOPRL SM3/DAY /
    /// ```
    Units { name: String, unit: String },

    /// Controls when a defined quantity is re-evaluated
    ///
    /// # Example
    /// ```text
    /// UPDATE WUOPRL NEXT /
    /// ```
    Update { name: String, status: UpdateStatus },

    /// A user defined table from a `UDT` keyword
    ///
    /// # Example
    /// ```text
    /// UDT
    /// 'TU_FBHP' 1 /
    /// 'LC' 0 1000 /
    /// 150 250 /
    /// /
    /// ```
    Table { name: String, table: UserTable },
}

impl Statement {
    pub fn name(&self) -> &str {
        match self {
            Statement::Define { name, .. }
            | Statement::Assign { name, .. }
            | Statement::Units { name, .. }
            | Statement::Update { name, .. }
            | Statement::Table { name, .. } => name,
        }
    }

    /// The deck keyword the statement is read from.
    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::Table { .. } => "UDT",
            _ => "UDQ",
        }
    }
}

/// Evaluation status of a defined quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateStatus {
    /// Evaluated at every step
    #[default]
    On,
    /// Never evaluated, the previous value is kept
    Off,
    /// Evaluated once more, then switched off
    Next,
}

impl UpdateStatus {
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "ON" => Some(UpdateStatus::On),
            "OFF" => Some(UpdateStatus::Off),
            "NEXT" => Some(UpdateStatus::Next),
            _ => None,
        }
    }
}
