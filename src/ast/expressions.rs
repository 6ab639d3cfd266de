use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use rust_decimal::{Decimal, prelude::FromPrimitive};
use serde::{Deserialize, Serialize};

use crate::ast::{BinaryOp, Function};
use crate::value::VarType;

/// Region set used when a region keyword carries no `_SET` suffix.
pub const DEFAULT_REGION_SET: &str = "NUM";

/// A node of a parsed UDQ expression.
///
/// Trees are immutable once built. Children are shared through [`Arc`], so
/// cloning a tree is cheap and subtrees can be shared between definitions.
/// The `sign` factor folds a prefix minus into the node it applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// The kind of entity the node evaluates over
    pub var_type: VarType,

    /// Factor applied to the evaluated result
    pub sign: f64,

    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Numeric literal
    ///
    /// # Example
    /// ```text
    /// 0.90
    /// ```
    Number(f64),

    /// Summary vector or user defined quantity, optionally narrowed by a
    /// selector
    ///
    /// # Examples
    /// ```text
    /// FLPR
    /// WOPR PROD1
    /// WOPR 'PROD*'
    /// SOFR 'PROD1' 3
    /// WUOPRL
    /// ```
    Vector {
        keyword: String,
        selector: Vec<String>,
    },

    /// Function call
    ///
    /// # Examples
    /// ```text
    /// SUM(WOPR)
    /// LOG(FOPR)
    /// ```
    Function {
        function: Function,
        arg: Arc<Node>,
    },

    /// Binary operation (arithmetic, union, comparison)
    Binary {
        op: BinaryOp,
        left: Arc<Node>,
        right: Arc<Node>,
    },

    /// Region vector or user table lookup
    TableLookup(TableLookup),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableLookup {
    /// Region vector indexed through a region set
    ///
    /// # Examples
    /// ```text
    /// RGPR_RE2 1
    /// ROIP_RE2
    /// RPR 3
    /// ```
    Region {
        keyword: String,
        region_set: String,
        region: Option<usize>,
    },

    /// Interpolation in a user defined table
    ///
    /// # Example
    /// ```text
    /// TU_PI[WOPR]
    /// ```
    UserTable { table: String, arg: Arc<Node> },
}

impl Node {
    fn new(var_type: VarType, kind: NodeKind) -> Self {
        Node {
            var_type,
            sign: 1.0,
            kind,
        }
    }

    pub fn number(value: f64) -> Self {
        Node::new(VarType::Scalar, NodeKind::Number(value))
    }

    /// A keyword reference. `category` is the kind implied by the keyword;
    /// a single well, group or segment without wildcards narrows it to a
    /// scalar.
    pub fn vector(keyword: impl Into<String>, category: VarType, selector: Vec<String>) -> Self {
        let var_type = match category {
            VarType::Well | VarType::Group if selector.len() == 1 && !has_wildcard(&selector[0]) => {
                VarType::Scalar
            }
            VarType::Segment if selector.len() == 2 && !has_wildcard(&selector[0]) => VarType::Scalar,
            other => other,
        };
        Node::new(
            var_type,
            NodeKind::Vector {
                keyword: keyword.into(),
                selector,
            },
        )
    }

    pub fn function(function: Function, arg: Node) -> Self {
        let var_type = if function.is_scalar() {
            VarType::Scalar
        } else {
            arg.var_type
        };
        Node::new(
            var_type,
            NodeKind::Function {
                function,
                arg: Arc::new(arg),
            },
        )
    }

    /// Callers check [`VarType::combine`] first; incompatible sides fall back
    /// to the left kind.
    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        let var_type = VarType::combine(left.var_type, right.var_type).unwrap_or(left.var_type);
        Node::new(
            var_type,
            NodeKind::Binary {
                op,
                left: Arc::new(left),
                right: Arc::new(right),
            },
        )
    }

    pub fn region(keyword: impl Into<String>, region_set: impl Into<String>, region: Option<usize>) -> Self {
        let var_type = if region.is_some() {
            VarType::Scalar
        } else {
            VarType::Region
        };
        Node::new(
            var_type,
            NodeKind::TableLookup(TableLookup::Region {
                keyword: keyword.into(),
                region_set: region_set.into(),
                region,
            }),
        )
    }

    pub fn user_table(table: impl Into<String>, arg: Node) -> Self {
        Node::new(
            arg.var_type,
            NodeKind::TableLookup(TableLookup::UserTable {
                table: table.into(),
                arg: Arc::new(arg),
            }),
        )
    }

    /// Folds a constant factor into the node. Literals absorb it directly.
    pub fn scale(&mut self, factor: f64) {
        match &mut self.kind {
            NodeKind::Number(value) => *value *= factor,
            _ => self.sign *= factor,
        }
    }

    pub fn left(&self) -> Option<&Node> {
        match &self.kind {
            NodeKind::Function { arg, .. } => Some(arg),
            NodeKind::Binary { left, .. } => Some(left),
            NodeKind::TableLookup(TableLookup::UserTable { arg, .. }) => Some(arg),
            _ => None,
        }
    }

    pub fn right(&self) -> Option<&Node> {
        match &self.kind {
            NodeKind::Binary { right, .. } => Some(right),
            _ => None,
        }
    }

    /// Summary keywords and quantities read by this tree.
    pub fn required_summary(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        self.collect_summary(&mut keys);
        keys
    }

    fn collect_summary(&self, keys: &mut BTreeSet<String>) {
        match &self.kind {
            NodeKind::Vector { keyword, .. } => {
                keys.insert(keyword.clone());
            }
            NodeKind::TableLookup(TableLookup::Region { keyword, .. }) => {
                keys.insert(keyword.clone());
            }
            _ => {}
        }
        if let Some(left) = self.left() {
            left.collect_summary(keys);
        }
        if let Some(right) = self.right() {
            right.collect_summary(keys);
        }
    }

    /// Wells, groups, regions and segments this tree reads.
    ///
    /// ```
    /// use udq_lang::parser::parse_expression;
    ///
    /// let node = parse_expression("WOPR 'PROD*' + SOFR 'PROD1' 3").unwrap();
    /// let objects = node.required_objects();
    /// assert!(objects.wells.contains("PROD*"));
    /// assert!(objects.segments["PROD1"].contains(&3));
    /// ```
    pub fn required_objects(&self) -> RequiredObjects {
        let mut objects = RequiredObjects::default();
        self.collect_objects(&mut objects);
        objects
    }

    fn collect_objects(&self, objects: &mut RequiredObjects) {
        match &self.kind {
            NodeKind::Vector { keyword, selector } => match VarType::from_keyword(keyword) {
                Some(VarType::Well) => add_names(&mut objects.wells, selector),
                Some(VarType::Group) => add_names(&mut objects.groups, selector),
                Some(VarType::Segment) => {
                    let well = selector.first().cloned().unwrap_or_else(|| ALL.to_string());
                    let numbers = objects.segments.entry(well).or_default();
                    if let Some(segment) = selector.get(1).and_then(|s| s.parse::<usize>().ok()) {
                        numbers.insert(segment);
                    }
                }
                _ => {}
            },
            NodeKind::TableLookup(TableLookup::Region {
                region_set, region, ..
            }) => {
                let numbers = objects.regions.entry(region_set.clone()).or_default();
                numbers.extend(*region);
            }
            _ => {}
        }
        if let Some(left) = self.left() {
            left.collect_objects(objects);
        }
        if let Some(right) = self.right() {
            right.collect_objects(objects);
        }
    }

    /// Functions and operators used by this tree.
    pub fn func_tokens(&self) -> BTreeSet<&'static str> {
        let mut tokens = BTreeSet::new();
        self.collect_func_tokens(&mut tokens);
        tokens
    }

    fn collect_func_tokens(&self, tokens: &mut BTreeSet<&'static str>) {
        match &self.kind {
            NodeKind::Function { function, .. } => {
                tokens.insert(function.name());
            }
            NodeKind::Binary { op, .. } => {
                tokens.insert(op.symbol());
            }
            _ => {}
        }
        if let Some(left) = self.left() {
            left.collect_func_tokens(tokens);
        }
        if let Some(right) = self.right() {
            right.collect_func_tokens(tokens);
        }
    }

    /// Binding strength used when printing. Negated nodes and negative
    /// literals print as prefix minus.
    fn precedence(&self) -> u8 {
        if self.sign < 0.0 {
            return 3;
        }
        match &self.kind {
            NodeKind::Number(v) if *v < 0.0 => 3,
            NodeKind::Binary { op, .. } => op.precedence(),
            _ => 6,
        }
    }

    fn fmt_unsigned(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Number(value) => f.write_str(&format_number(*value)),
            NodeKind::Vector { keyword, selector } => {
                f.write_str(keyword)?;
                for item in selector {
                    if item.chars().all(|c| c.is_ascii_digit()) {
                        write!(f, " {}", item)?;
                    } else {
                        write!(f, " '{}'", item)?;
                    }
                }
                Ok(())
            }
            NodeKind::Function { function, arg } => write!(f, "{}({})", function.name(), arg),
            NodeKind::Binary { op, left, right } => {
                let prec = op.precedence();
                write_operand(f, left, left.precedence() < prec)?;
                write!(f, " {} ", op.symbol())?;
                // exponents are always literals and may carry their own sign
                let parens = *op != BinaryOp::Power && right.precedence() <= prec;
                write_operand(f, right, parens)
            }
            NodeKind::TableLookup(TableLookup::Region {
                keyword,
                region_set,
                region,
            }) => {
                f.write_str(keyword)?;
                if region_set != DEFAULT_REGION_SET {
                    write!(f, "_{}", region_set)?;
                }
                if let Some(region) = region {
                    write!(f, " {}", region)?;
                }
                Ok(())
            }
            NodeKind::TableLookup(TableLookup::UserTable { table, arg }) => write!(f, "{}[{}]", table, arg),
        }
    }
}

/// Prints the canonical expression text. Parsing the output yields an
/// equivalent tree.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sign == 1.0 {
            return self.fmt_unsigned(f);
        }
        let mut unsigned = self.clone();
        unsigned.sign = 1.0;
        if self.sign == -1.0 {
            f.write_str("-")?;
        } else {
            write!(f, "{} * ", format_number(self.sign))?;
        }
        write_operand(f, &unsigned, unsigned.precedence() < 4)
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, node: &Node, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({})", node)
    } else {
        write!(f, "{}", node)
    }
}

fn format_number(value: f64) -> String {
    match Decimal::from_f64(value) {
        Some(d) => d.normalize().to_string(),
        None => value.to_string(),
    }
}

/// Stands for every entity when a reference carries no selector.
pub const ALL: &str = "*";

/// Entities a definition needs values for.
///
/// Names may be patterns. A region set or segment well mapped to an empty
/// set needs every region or segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredObjects {
    pub wells: BTreeSet<String>,
    pub groups: BTreeSet<String>,
    /// region set -> region numbers
    pub regions: BTreeMap<String, BTreeSet<usize>>,
    /// well -> segment numbers
    pub segments: BTreeMap<String, BTreeSet<usize>>,
}

fn add_names(names: &mut BTreeSet<String>, selector: &[String]) {
    if selector.is_empty() {
        names.insert(ALL.to_string());
    } else {
        names.extend(selector.iter().cloned());
    }
}

impl RequiredObjects {
    /// Adds everything `other` requires.
    pub fn merge(&mut self, other: RequiredObjects) {
        self.wells.extend(other.wells);
        self.groups.extend(other.groups);
        for (region_set, numbers) in other.regions {
            self.regions.entry(region_set).or_default().extend(numbers);
        }
        for (well, numbers) in other.segments {
            self.segments.entry(well).or_default().extend(numbers);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.wells.is_empty() && self.groups.is_empty() && self.regions.is_empty() && self.segments.is_empty()
    }
}

pub(crate) fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}
