use std::fmt;
use std::ops::{Index, Mul};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::evaluator::EvalError;

/// The kind of entity a quantity is defined over.
///
/// The kind of a keyword is read from its first letter: `WOPR` is a well
/// quantity, `GOPR` a group quantity, `FOPR` a field quantity and so on.
///
/// # Examples
///
/// ```
/// use udq_lang::VarType;
///
/// assert_eq!(VarType::from_keyword("WOPR"), Some(VarType::Well));
/// assert_eq!(VarType::from_keyword("FU_CS13"), Some(VarType::Field));
/// assert_eq!(VarType::from_keyword("XYZ"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarType {
    /// A single value that broadcasts to any other kind
    Scalar,
    /// The field as a whole
    Field,
    Well,
    Group,
    Segment,
    Region,
    Aquifer,
    Block,
    Connection,
}

impl VarType {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.chars().next()?.to_ascii_uppercase() {
            'W' => Some(VarType::Well),
            'G' => Some(VarType::Group),
            'F' => Some(VarType::Field),
            'R' => Some(VarType::Region),
            'S' => Some(VarType::Segment),
            'A' => Some(VarType::Aquifer),
            'B' => Some(VarType::Block),
            'C' => Some(VarType::Connection),
            _ => None,
        }
    }

    /// Scalar and field quantities hold exactly one value.
    pub fn is_scalar(&self) -> bool {
        matches!(self, VarType::Scalar | VarType::Field)
    }

    /// The kind of `left op right`, or `None` when the two sides can not be
    /// combined.
    pub fn combine(left: VarType, right: VarType) -> Option<VarType> {
        match (left.is_scalar(), right.is_scalar()) {
            (true, true) if left == VarType::Field && right == VarType::Field => Some(VarType::Field),
            (true, true) => Some(VarType::Scalar),
            (true, false) => Some(right),
            (false, true) => Some(left),
            (false, false) if left == right => Some(left),
            (false, false) => None,
        }
    }

    /// Whether an expression of kind `found` may define a quantity of kind `self`.
    pub fn accepts(&self, found: VarType) -> bool {
        found.is_scalar() || found == *self
    }

    pub fn name(&self) -> &'static str {
        match self {
            VarType::Scalar => "scalar",
            VarType::Field => "field",
            VarType::Well => "well",
            VarType::Group => "group",
            VarType::Segment => "segment",
            VarType::Region => "region",
            VarType::Aquifer => "aquifer",
            VarType::Block => "block",
            VarType::Connection => "connection",
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a keyword names a user defined quantity (`WU*`, `GU*`, `FU*`, ...).
pub fn is_udq_name(keyword: &str) -> bool {
    let mut chars = keyword.chars();
    VarType::from_keyword(keyword).is_some()
        && chars.nth(1).is_some_and(|c| c.eq_ignore_ascii_case(&'U'))
}

/// One entry of a [`UdqSet`].
///
/// Segment and region entries carry a number; for segments the name is the
/// owning well, for regions it is the region set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UdqScalar {
    pub name: String,
    pub number: Option<usize>,
    pub value: Option<f64>,
}

impl UdqScalar {
    pub fn new(name: impl Into<String>, value: Option<f64>) -> Self {
        UdqScalar {
            name: name.into(),
            number: None,
            value,
        }
    }

    pub fn numbered(name: impl Into<String>, number: usize, value: Option<f64>) -> Self {
        UdqScalar {
            name: name.into(),
            number: Some(number),
            value,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }

    pub fn same_entity(&self, other: &UdqScalar) -> bool {
        self.name == other.name && self.number == other.number
    }

    /// Human readable entity label used in error messages.
    pub fn label(&self) -> String {
        match self.number {
            Some(n) => format!("{}:{}", self.name, n),
            None => self.name.clone(),
        }
    }
}

/// The evaluated result of an expression: one optional value per entity.
///
/// An entry whose value is `None` is undefined. Arithmetic propagates
/// undefined entries instead of replacing them with a default.
///
/// # Examples
///
/// ```
/// use udq_lang::{UdqSet, VarType};
///
/// let wells = vec!["PROD1".to_string(), "PROD2".to_string()];
/// let mut set = UdqSet::wells("WOPR", &wells, None);
/// set.assign_entity("PROD1", Some(100.0));
///
/// assert_eq!(set.var_type(), VarType::Well);
/// assert_eq!(set.value_of("PROD1"), Some(100.0));
/// assert_eq!(set.value_of("PROD2"), None);
/// assert_eq!(set.defined_size(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UdqSet {
    name: String,
    var_type: VarType,
    values: Vec<UdqScalar>,
}

impl UdqSet {
    pub fn empty(name: impl Into<String>, var_type: VarType) -> Self {
        UdqSet {
            name: name.into(),
            var_type,
            values: Vec::new(),
        }
    }

    /// A single value that broadcasts against any other set.
    pub fn scalar(name: impl Into<String>, value: Option<f64>) -> Self {
        let name = name.into();
        UdqSet {
            values: vec![UdqScalar::new(name.clone(), value)],
            name,
            var_type: VarType::Scalar,
        }
    }

    pub fn field(name: impl Into<String>, value: Option<f64>) -> Self {
        let mut set = UdqSet::scalar(name, value);
        set.var_type = VarType::Field;
        set
    }

    pub fn wells(name: impl Into<String>, wells: &[String], value: Option<f64>) -> Self {
        UdqSet::named(name, VarType::Well, wells, value)
    }

    pub fn groups(name: impl Into<String>, groups: &[String], value: Option<f64>) -> Self {
        UdqSet::named(name, VarType::Group, groups, value)
    }

    /// Region entries are keyed by region set and region number.
    pub fn regions(
        name: impl Into<String>,
        region_set: &str,
        regions: &[usize],
        value: Option<f64>,
    ) -> Self {
        UdqSet {
            name: name.into(),
            var_type: VarType::Region,
            values: regions
                .iter()
                .map(|r| UdqScalar::numbered(region_set, *r, value))
                .collect(),
        }
    }

    /// Segment entries are keyed by well name and segment number.
    pub fn segments(name: impl Into<String>, segments: &[(String, usize)], value: Option<f64>) -> Self {
        UdqSet {
            name: name.into(),
            var_type: VarType::Segment,
            values: segments
                .iter()
                .map(|(well, seg)| UdqScalar::numbered(well.clone(), *seg, value))
                .collect(),
        }
    }

    fn named(name: impl Into<String>, var_type: VarType, entities: &[String], value: Option<f64>) -> Self {
        UdqSet {
            name: name.into(),
            var_type,
            values: entities.iter().map(|e| UdqScalar::new(e.clone(), value)).collect(),
        }
    }

    /// A set with the same kind and entities as `self`, every entry set to `value`.
    pub fn with_shape(&self, value: Option<f64>) -> Self {
        UdqSet {
            name: self.name.clone(),
            var_type: self.var_type,
            values: self
                .values
                .iter()
                .map(|s| UdqScalar {
                    value,
                    ..s.clone()
                })
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn var_type(&self) -> VarType {
        self.var_type
    }

    /// Scalar and field sets broadcast against every other kind.
    pub fn is_scalar(&self) -> bool {
        self.var_type.is_scalar()
    }

    /// The value of a scalar set.
    pub fn scalar_value(&self) -> Option<f64> {
        self.values.first().and_then(|s| s.value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UdqScalar> {
        self.values.iter()
    }

    pub fn entry(&self, name: &str) -> Option<&UdqScalar> {
        self.values.iter().find(|s| s.name == name)
    }

    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.entry(name).and_then(|s| s.value)
    }

    pub fn value_at(&self, name: &str, number: usize) -> Option<f64> {
        self.values
            .iter()
            .find(|s| s.name == name && s.number == Some(number))
            .and_then(|s| s.value)
    }

    pub fn push(&mut self, entry: UdqScalar) {
        self.values.push(entry);
    }

    pub fn assign(&mut self, index: usize, value: Option<f64>) {
        if let Some(entry) = self.values.get_mut(index) {
            entry.value = value;
        }
    }

    /// Assigns every entry belonging to `name`.
    pub fn assign_entity(&mut self, name: &str, value: Option<f64>) {
        for entry in self.values.iter_mut().filter(|s| s.name == name) {
            entry.value = value;
        }
    }

    /// Assigns `(entity, value)` pairs in one pass over the set.
    pub fn assign_entities<'a, I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (&'a str, Option<f64>)>,
    {
        let mut by_name: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (index, entry) in self.values.iter().enumerate() {
            by_name.entry(entry.name.clone()).or_default().push(index);
        }
        for (name, value) in values {
            for &index in by_name.get(name).into_iter().flatten() {
                self.values[index].value = value;
            }
        }
    }

    pub fn defined_values(&self) -> Vec<f64> {
        self.values.iter().filter_map(|s| s.value).collect()
    }

    pub fn defined_size(&self) -> usize {
        self.values.iter().filter(|s| s.is_defined()).count()
    }

    /// Entity names in set order.
    pub fn names(&self) -> Vec<String> {
        self.values.iter().map(|s| s.name.clone()).collect()
    }

    /// Applies `f` to every entry, keeping the shape of the set.
    pub fn try_map<F>(&self, mut f: F) -> Result<UdqSet, EvalError>
    where
        F: FnMut(&UdqScalar) -> Result<Option<f64>, EvalError>,
    {
        let mut values = Vec::with_capacity(self.values.len());
        for entry in &self.values {
            values.push(UdqScalar {
                value: f(entry)?,
                ..entry.clone()
            });
        }
        Ok(UdqSet {
            name: self.name.clone(),
            var_type: self.var_type,
            values,
        })
    }

    /// Combines two sets entry by entry.
    ///
    /// A scalar side is broadcast over the other side. Two non-scalar sides
    /// must have the same kind and the same entities; the result follows the
    /// entity order of `self`.
    pub fn combine<F>(&self, other: &UdqSet, op: &str, f: F) -> Result<UdqSet, EvalError>
    where
        F: Fn(Option<f64>, Option<f64>) -> Option<f64>,
    {
        match (self.is_scalar(), other.is_scalar()) {
            (true, true) => {
                let var_type = VarType::combine(self.var_type, other.var_type).unwrap_or(VarType::Scalar);
                let mut result = UdqSet::scalar(self.name.clone(), f(self.scalar_value(), other.scalar_value()));
                result.var_type = var_type;
                Ok(result)
            }
            (true, false) => {
                let lhs = self.scalar_value();
                Ok(other.map_values(|rhs| f(lhs, rhs)))
            }
            (false, true) => {
                let rhs = other.scalar_value();
                Ok(self.map_values(|lhs| f(lhs, rhs)))
            }
            (false, false) => {
                if self.var_type != other.var_type || !self.same_entities(other) {
                    return Err(EvalError::IncompatibleSets {
                        op: op.to_string(),
                        left: self.var_type,
                        left_size: self.len(),
                        right: other.var_type,
                        right_size: other.len(),
                    });
                }
                let positions = other.positions();
                let mut result = self.clone();
                for entry in result.values.iter_mut() {
                    let rhs = positions
                        .get(&(entry.name.as_str(), entry.number))
                        .and_then(|&index| other.values[index].value);
                    entry.value = f(entry.value, rhs);
                }
                Ok(result)
            }
        }
    }

    fn map_values<F>(&self, f: F) -> UdqSet
    where
        F: Fn(Option<f64>) -> Option<f64>,
    {
        let mut result = self.clone();
        for entry in result.values.iter_mut() {
            entry.value = f(entry.value);
        }
        result
    }

    fn same_entities(&self, other: &UdqSet) -> bool {
        if self.values.len() != other.values.len() {
            return false;
        }
        let positions = other.positions();
        self.values
            .iter()
            .all(|s| positions.contains_key(&(s.name.as_str(), s.number)))
    }

    /// Entry index keyed by entity.
    fn positions(&self) -> IndexMap<(&str, Option<usize>), usize> {
        self.values
            .iter()
            .enumerate()
            .map(|(index, s)| ((s.name.as_str(), s.number), index))
            .collect()
    }
}

impl Index<usize> for UdqSet {
    type Output = UdqScalar;

    fn index(&self, index: usize) -> &UdqScalar {
        &self.values[index]
    }
}

impl Mul<f64> for UdqSet {
    type Output = UdqSet;

    fn mul(self, factor: f64) -> UdqSet {
        self.map_values(|v| v.map(|x| x * factor))
    }
}

impl<'a> IntoIterator for &'a UdqSet {
    type Item = &'a UdqScalar;
    type IntoIter = std::slice::Iter<'a, UdqScalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(a: Option<f64>, b: Option<f64>) -> Option<f64> {
        Some(a? + b?)
    }

    fn wells() -> Vec<String> {
        vec!["P1".to_string(), "P2".to_string()]
    }

    #[test]
    fn test_scalar_broadcasts_over_wells() {
        let scalar = UdqSet::scalar("N", Some(3.0));
        let mut set = UdqSet::wells("WOPR", &wells(), None);
        set.assign_entity("P1", Some(10.0));

        let result = scalar.combine(&set, "+", add).unwrap();
        assert_eq!(result.var_type(), VarType::Well);
        assert_eq!(result.value_of("P1"), Some(13.0));
        assert_eq!(result.value_of("P2"), None);
    }

    #[test]
    fn test_mismatched_entities_fail() {
        let lhs = UdqSet::wells("A", &wells(), Some(1.0));
        let rhs = UdqSet::wells("B", &["P1".to_string()], Some(1.0));
        assert!(matches!(
            lhs.combine(&rhs, "+", add),
            Err(EvalError::IncompatibleSets { .. })
        ));
    }

    #[test]
    fn test_kinds_must_match() {
        let lhs = UdqSet::wells("A", &wells(), Some(1.0));
        let rhs = UdqSet::groups("B", &wells(), Some(1.0));
        assert!(lhs.combine(&rhs, "*", add).is_err());
    }

    #[test]
    fn test_entity_order_is_irrelevant() {
        let lhs = UdqSet::wells("A", &wells(), Some(1.0));
        let mut rhs = UdqSet::wells("B", &["P2".to_string(), "P1".to_string()], None);
        rhs.assign_entity("P1", Some(5.0));
        let result = lhs.combine(&rhs, "+", add).unwrap();
        assert_eq!(result.value_of("P1"), Some(6.0));
        assert_eq!(result.value_of("P2"), None);
    }

    #[test]
    fn test_assign_entities() {
        let names: Vec<String> = (0..2000).map(|i| format!("W{}", i)).collect();
        let mut set = UdqSet::wells("WUX", &names, None);
        set.assign_entities(names.iter().rev().map(|n| (n.as_str(), Some(n[1..].parse().unwrap()))));
        assert_eq!(set.value_of("W0"), Some(0.0));
        assert_eq!(set.value_of("W1999"), Some(1999.0));

        set.assign_entities([("W7", None), ("MISSING", Some(1.0))]);
        assert_eq!(set.value_of("W7"), None);
        assert_eq!(set.defined_size(), 1999);

        let doubled = set.combine(&set.clone(), "+", add).unwrap();
        assert_eq!(doubled.value_of("W1999"), Some(3998.0));
    }

    #[test]
    fn test_scale_keeps_undefined() {
        let mut set = UdqSet::wells("A", &wells(), None);
        set.assign(0, Some(2.0));
        let scaled = set * -1.0;
        assert_eq!(scaled[0].value, Some(-2.0));
        assert_eq!(scaled[1].value, None);
    }

    #[test]
    fn test_combine_var_types() {
        assert_eq!(VarType::combine(VarType::Scalar, VarType::Well), Some(VarType::Well));
        assert_eq!(VarType::combine(VarType::Field, VarType::Field), Some(VarType::Field));
        assert_eq!(VarType::combine(VarType::Field, VarType::Scalar), Some(VarType::Scalar));
        assert_eq!(VarType::combine(VarType::Well, VarType::Group), None);
    }

    #[test]
    fn test_udq_names() {
        assert!(is_udq_name("WUOPRL"));
        assert!(is_udq_name("FU_CS13"));
        assert!(!is_udq_name("WOPR"));
        assert!(!is_udq_name("XU"));
    }
}
