//! The ordered set of quantities declared by `UDQ` statements.
//!
//! Quantities are keyed by name. A later `DEFINE` or `ASSIGN` of a name
//! replaces the earlier statement but keeps the position of the first
//! declaration, so evaluation order is declaration order.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    ast::{Node, RequiredObjects, Statement, UpdateStatus, expressions::DEFAULT_REGION_SET},
    context::{EvalContext, SummaryState, match_names, pattern_regex},
    deck::Location,
    evaluator::EvalError,
    parser::{ParseError, parse_define},
    tables::{TableError, UserTable},
    value::{UdqScalar, UdqSet, VarType, is_udq_name},
};

/// Numeric parameters of the UDQ system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UdqParams {
    /// Value used when a control bound to an undefined quantity needs a number
    pub undefined_value: f64,
}

impl Default for UdqParams {
    fn default() -> Self {
        UdqParams {
            undefined_value: -1.0e20,
        }
    }
}

/// A statement that could not be added to the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatementError {
    #[error(transparent)]
    Syntax(#[from] ParseError),

    #[error("'{name}' is not a valid user defined quantity name")]
    InvalidName { name: String },

    #[error("UDQ {name} must be defined before UPDATE")]
    UpdateWithoutDefine { name: String },

    #[error("Invalid table {name}: {source}")]
    Table { name: String, source: TableError },
}

/// Evaluation failure of one quantity.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Failed to evaluate UDQ {udq}: {source}")]
pub struct UdqError {
    pub udq: String,
    pub source: EvalError,
}

/// The statement that currently decides the value of a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UdqAction {
    Define,
    Assign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputIndex {
    /// Position of the first declaration of the name
    pub insert_index: usize,
    pub action: UdqAction,
}

/// A quantity defined by an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    name: String,
    expression: String,
    node: Node,
    var_type: VarType,
    status: UpdateStatus,
    location: Option<Location>,
}

impl Definition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The expression as written in the deck.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn var_type(&self) -> VarType {
        self.var_type
    }

    pub fn status(&self) -> UpdateStatus {
        self.status
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Evaluates the expression and spreads the result over every entity of
    /// the quantity's kind.
    pub fn eval(&self, context: &EvalContext) -> Result<UdqSet, EvalError> {
        let result = self.node.eval(self.var_type, context)?;
        broadcast(&self.name, self.var_type, result, context.summary())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignRecord {
    pub selector: Vec<String>,
    pub value: f64,
}

/// A quantity set to constants by one or more `ASSIGN` statements.
///
/// Records apply in order, so a later record wins on the entities it selects.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    name: String,
    var_type: VarType,
    records: Vec<AssignRecord>,
}

impl Assignment {
    fn new(name: String, var_type: VarType) -> Self {
        Assignment {
            name,
            var_type,
            records: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn var_type(&self) -> VarType {
        self.var_type
    }

    pub fn records(&self) -> &[AssignRecord] {
        &self.records
    }

    pub fn eval(&self, st: &SummaryState) -> Result<UdqSet, EvalError> {
        let mut set = target_shape(&self.name, self.var_type, st)?;

        for record in &self.records {
            let value = Some(record.value);
            match self.var_type {
                VarType::Well | VarType::Group => {
                    let entities = if self.var_type == VarType::Well {
                        st.wells()
                    } else {
                        st.groups()
                    };
                    let selected = match_names(entities, &record.selector)?;
                    if selected.is_empty() && !record.selector.is_empty() {
                        warn!(udq = %self.name, selector = ?record.selector, "ASSIGN selector matches nothing");
                    }
                    set.assign_entities(selected.iter().map(|name| (name.as_str(), value)));
                }
                VarType::Segment | VarType::Region => {
                    for index in 0..set.len() {
                        if numbered_entry_matches(self.var_type, &set[index], &record.selector)? {
                            set.assign(index, value);
                        }
                    }
                }
                _ => set = set.with_shape(value),
            }
        }
        Ok(set)
    }
}

/// Segment selectors are `[well pattern, segment]`, region selectors `[region]`.
fn numbered_entry_matches(var_type: VarType, entry: &UdqScalar, selector: &[String]) -> Result<bool, EvalError> {
    let (name_pattern, number) = match var_type {
        VarType::Segment => (selector.first(), selector.get(1)),
        _ => (None, selector.first()),
    };
    if let Some(pattern) = name_pattern
        && !pattern_regex(pattern)?.is_match(&entry.name)
    {
        return Ok(false);
    }
    match number {
        Some(text) => {
            let number = text
                .parse::<usize>()
                .map_err(|_| EvalError::InvalidPattern { pattern: text.clone() })?;
            Ok(entry.number == Some(number))
        }
        None => Ok(true),
    }
}

/// Every entity a quantity of kind `var_type` is defined for, all undefined.
fn target_shape(name: &str, var_type: VarType, st: &SummaryState) -> Result<UdqSet, EvalError> {
    match var_type {
        VarType::Scalar | VarType::Field => Ok(UdqSet::field(name, None)),
        VarType::Well => Ok(UdqSet::wells(name, st.wells(), None)),
        VarType::Group => Ok(UdqSet::groups(name, st.groups(), None)),
        VarType::Segment => Ok(UdqSet::segments(name, &st.segments(), None)),
        VarType::Region => Ok(UdqSet::regions(
            name,
            DEFAULT_REGION_SET,
            st.regions(DEFAULT_REGION_SET),
            None,
        )),
        other => Err(EvalError::UnsupportedTarget {
            keyword: name.to_string(),
            found: other,
            target: other,
        }),
    }
}

fn broadcast(name: &str, var_type: VarType, result: UdqSet, st: &SummaryState) -> Result<UdqSet, EvalError> {
    let mut shape = target_shape(name, var_type, st)?;
    if result.is_scalar() {
        return Ok(shape.with_shape(result.scalar_value()));
    }
    if result.var_type() != var_type {
        return Err(EvalError::UnsupportedTarget {
            keyword: name.to_string(),
            found: result.var_type(),
            target: var_type,
        });
    }
    match var_type {
        VarType::Well | VarType::Group => {
            shape.assign_entities(result.iter().map(|entry| (entry.name.as_str(), entry.value)));
            Ok(shape)
        }
        _ => Ok(result.rename(name)),
    }
}

/// All quantities declared so far, in declaration order.
///
/// # Examples
///
/// ```
/// use udq_lang::{SummaryState, UdqConfig};
///
/// let mut config = UdqConfig::default();
/// config.add_define("WUOPRL", "(WOPR PROD1 - 150) * 0.90", None).unwrap();
/// config.add_define("WUOPRL", "(WOPR PROD1 - 170) * 0.60", None).unwrap();
///
/// let mut st = SummaryState::new();
/// st.update_well_var("PROD1", "WOPR", 300.0);
/// config.eval(&mut st).unwrap();
///
/// assert_eq!(st.get_well_var("PROD1", "WUOPRL"), Some(78.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UdqConfig {
    params: UdqParams,
    input_index: IndexMap<String, InputIndex>,
    definitions: IndexMap<String, Definition>,
    assignments: IndexMap<String, Assignment>,
    units: IndexMap<String, String>,
    tables: IndexMap<String, UserTable>,
}

impl UdqConfig {
    pub fn new(params: UdqParams) -> Self {
        UdqConfig {
            params,
            ..Self::default()
        }
    }

    pub fn params(&self) -> &UdqParams {
        &self.params
    }

    fn record_input(&mut self, name: &str, action: UdqAction) {
        let insert_index = self.input_index.len();
        self.input_index
            .entry(name.to_string())
            .and_modify(|index| index.action = action)
            .or_insert(InputIndex { insert_index, action });
    }

    fn checked_name(name: &str) -> Result<(String, VarType), StatementError> {
        let name = name.to_ascii_uppercase();
        match VarType::from_keyword(&name) {
            Some(var_type) if is_udq_name(&name) => Ok((name, var_type)),
            _ => Err(StatementError::InvalidName { name }),
        }
    }

    /// `DEFINE <name> <expression>`
    pub fn add_define(&mut self, name: &str, expression: &str, location: Option<Location>) -> Result<(), StatementError> {
        let (name, _) = Self::checked_name(name)?;
        let node = parse_define(&name, expression)?;
        self.insert_definition(name, expression.to_string(), node, location)
    }

    fn insert_definition(
        &mut self,
        name: String,
        expression: String,
        node: Node,
        location: Option<Location>,
    ) -> Result<(), StatementError> {
        let (name, var_type) = Self::checked_name(&name)?;
        if self.assignments.shift_remove(&name).is_some() {
            debug!(udq = %name, "DEFINE replaces ASSIGN");
        }
        if let Some(previous) = self.definitions.get(&name) {
            debug!(udq = %name, previous = %previous.node, current = %node, "UDQ redefined");
        }

        self.definitions.insert(
            name.clone(),
            Definition {
                name: name.clone(),
                expression,
                node,
                var_type,
                status: UpdateStatus::On,
                location,
            },
        );
        self.record_input(&name, UdqAction::Define);
        Ok(())
    }

    /// `ASSIGN <name> [selector...] <value>`
    pub fn add_assign(&mut self, name: &str, selector: Vec<String>, value: f64) -> Result<(), StatementError> {
        let (name, var_type) = Self::checked_name(name)?;
        if self.definitions.shift_remove(&name).is_some() {
            debug!(udq = %name, value, "ASSIGN overrides DEFINE");
        }
        self.assignments
            .entry(name.clone())
            .or_insert_with(|| Assignment::new(name.clone(), var_type))
            .records
            .push(AssignRecord { selector, value });
        self.record_input(&name, UdqAction::Assign);
        Ok(())
    }

    /// `UNITS <name> <unit>`
    pub fn add_units(&mut self, name: &str, unit: &str) -> Result<(), StatementError> {
        let (name, _) = Self::checked_name(name)?;
        self.units.insert(name, unit.to_string());
        Ok(())
    }

    /// `UPDATE <name> ON|OFF|NEXT`
    pub fn add_update(&mut self, name: &str, status: UpdateStatus) -> Result<(), StatementError> {
        let name = name.to_ascii_uppercase();
        match self.definitions.get_mut(&name) {
            Some(definition) => {
                definition.status = status;
                Ok(())
            }
            None => Err(StatementError::UpdateWithoutDefine { name }),
        }
    }

    /// Registers a user defined table for `TU_NAME[expr]` lookups.
    pub fn add_table(&mut self, name: &str, table: UserTable) -> Result<(), StatementError> {
        let name = name.to_ascii_uppercase();
        if !name.starts_with("TU_") {
            return Err(StatementError::InvalidName { name });
        }
        self.tables.insert(name, table);
        Ok(())
    }

    pub fn add_statement(&mut self, statement: Statement, location: Option<Location>) -> Result<(), StatementError> {
        match statement {
            Statement::Define { name, expression, node } => {
                self.insert_definition(name, expression, node, location)
            }
            Statement::Assign { name, selector, value } => self.add_assign(&name, selector, value),
            Statement::Units { name, unit } => self.add_units(&name, &unit),
            Statement::Update { name, status } => self.add_update(&name, status),
            Statement::Table { name, table } => self.add_table(&name, table),
        }
    }

    /// Whether `name` is currently defined or assigned.
    pub fn has_keyword(&self, name: &str) -> bool {
        self.definitions.contains_key(name) || self.assignments.contains_key(name)
    }

    pub fn input_index(&self, name: &str) -> Option<&InputIndex> {
        self.input_index.get(name)
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn assignment(&self, name: &str) -> Option<&Assignment> {
        self.assignments.get(name)
    }

    /// Definitions in declaration order.
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.input_index
            .keys()
            .filter_map(|name| self.definitions.get(name))
    }

    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.input_index
            .keys()
            .filter_map(|name| self.assignments.get(name))
    }

    pub fn unit(&self, name: &str) -> Option<&str> {
        self.units.get(name).map(String::as_str)
    }

    pub fn table(&self, name: &str) -> Option<&UserTable> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> &IndexMap<String, UserTable> {
        &self.tables
    }

    pub fn var_type(&self, name: &str) -> Option<VarType> {
        self.definitions
            .get(name)
            .map(Definition::var_type)
            .or_else(|| self.assignments.get(name).map(Assignment::var_type))
    }

    /// Number of quantities currently defined or assigned.
    pub fn size(&self) -> usize {
        self.definitions.len() + self.assignments.len()
    }

    /// Summary keywords read by any definition.
    pub fn required_summary(&self) -> BTreeSet<String> {
        self.definitions
            .values()
            .flat_map(|definition| definition.node.required_summary())
            .filter(|keyword| !self.has_keyword(keyword))
            .collect()
    }

    /// Entities read by any definition.
    pub fn required_objects(&self) -> RequiredObjects {
        let mut objects = RequiredObjects::default();
        for definition in self.definitions.values() {
            objects.merge(definition.node.required_objects());
        }
        objects
    }

    /// Evaluates every quantity in declaration order and stores the results
    /// in `st`, so later quantities see the values of earlier ones.
    ///
    /// Returns the sets evaluated in this call. Quantities with status `OFF`
    /// keep their previous values; `NEXT` is evaluated once and switched off.
    pub fn eval(&mut self, st: &mut SummaryState) -> Result<Vec<UdqSet>, UdqError> {
        let mut results = Vec::new();
        let names: Vec<String> = self.input_index.keys().cloned().collect();

        for name in names {
            let udq_error = |source| UdqError {
                udq: name.clone(),
                source,
            };

            if let Some(assignment) = self.assignments.get(&name) {
                let set = assignment.eval(st).map_err(udq_error)?;
                st.update_udq(&set);
                results.push(set);
                continue;
            }

            let Some(definition) = self.definitions.get_mut(&name) else {
                continue;
            };
            if definition.status == UpdateStatus::Off {
                debug!(udq = %name, "UPDATE OFF, keeping previous value");
                continue;
            }

            let set = {
                let context = EvalContext::new(st).with_tables(&self.tables);
                definition.eval(&context)
            }
            .map_err(udq_error)?;
            debug!(udq = %name, defined = set.defined_size(), size = set.len(), "UDQ evaluated");

            if definition.status == UpdateStatus::Next {
                definition.status = UpdateStatus::Off;
            }
            st.update_udq(&set);
            results.push(set);
        }
        Ok(results)
    }
}
