use thiserror::Error;

use crate::{
    ast::{BinaryOp, Function, Node, NodeKind, TableLookup, expressions::has_wildcard},
    context::{EvalContext, match_names},
    value::{UdqScalar, UdqSet, VarType, is_udq_name},
};

/// Errors that can occur while evaluating an expression.
///
/// Evaluation never substitutes a default for a failure; the caller decides
/// whether to abort or fall back.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Keyword not present in the summary state
    #[error("Unknown keyword: {keyword}")]
    UnknownKeyword { keyword: String },

    /// A selector that names entities matched none of them
    #[error("Selector {selector:?} of {keyword} matches no {var_type}")]
    NoMatchingEntities {
        keyword: String,
        selector: Vec<String>,
        var_type: VarType,
    },

    /// Function argument outside the function domain
    #[error("Domain error: {function} is undefined for {value} ({entity})")]
    Domain {
        function: String,
        entity: String,
        value: f64,
    },

    /// Two sets that can not be combined entry by entry
    #[error(
        "Incompatible operands for '{op}': {left} set of {left_size} and {right} set of {right_size}"
    )]
    IncompatibleSets {
        op: String,
        left: VarType,
        left_size: usize,
        right: VarType,
        right_size: usize,
    },

    /// A quantity used where its kind can not be converted to the target
    #[error("Cannot evaluate {found} quantity {keyword} in a {target} expression")]
    UnsupportedTarget {
        keyword: String,
        found: VarType,
        target: VarType,
    },

    #[error("Unknown user defined table: {table}")]
    UnknownTable { table: String },

    #[error("Invalid selector pattern: '{pattern}'")]
    InvalidPattern { pattern: String },
}

impl Node {
    /// Evaluates the tree for a quantity of kind `target`.
    ///
    /// Evaluation only reads `context`. The result is either a scalar set,
    /// which the caller broadcasts, or a set of kind `target`.
    ///
    /// # Examples
    ///
    /// ```
    /// use udq_lang::{EvalContext, SummaryState, VarType, parser::parse_expression};
    ///
    /// let mut st = SummaryState::new();
    /// st.update_well_var("PROD1", "WOPR", 100.0);
    /// st.update_well_var("PROD2", "WOPR", 200.0);
    ///
    /// let node = parse_expression("SUM(WOPR)").unwrap();
    /// let result = node.eval(VarType::Field, &EvalContext::new(&st)).unwrap();
    /// assert_eq!(result.scalar_value(), Some(300.0));
    /// ```
    pub fn eval(&self, target: VarType, context: &EvalContext) -> Result<UdqSet, EvalError> {
        let result = match &self.kind {
            NodeKind::Number(value) => UdqSet::scalar(value.to_string(), Some(*value)),
            NodeKind::Vector { keyword, selector } => {
                let set = eval_vector(keyword, selector, context)?;
                check_target(keyword, set, target)?
            }
            NodeKind::Function { function, arg } if function.is_scalar() => {
                eval_scalar_function(*function, arg, target, context)?
            }
            NodeKind::Function { function, arg } => eval_elemental_function(*function, arg, target, context)?,
            NodeKind::Binary { op, left, right } => eval_binary(*op, left, right, target, context)?,
            NodeKind::TableLookup(TableLookup::Region {
                keyword,
                region_set,
                region,
            }) => {
                let set = eval_region(keyword, region_set, *region, context)?;
                check_target(keyword, set, target)?
            }
            NodeKind::TableLookup(TableLookup::UserTable { table, arg }) => {
                let lookup = context.table(table).ok_or_else(|| EvalError::UnknownTable {
                    table: table.clone(),
                })?;
                arg.eval(target, context)?
                    .try_map(|entry| match entry.value {
                        Some(x) => lookup.lookup(x).map(Some).ok_or_else(|| EvalError::Domain {
                            function: table.clone(),
                            entity: entry.label(),
                            value: x,
                        }),
                        None => Ok(None),
                    })?
                    .rename(table.clone())
            }
        };

        if self.sign == 1.0 {
            Ok(result)
        } else {
            Ok(result * self.sign)
        }
    }
}

/// Scalar results fit any target; other kinds must match it exactly.
fn check_target(keyword: &str, set: UdqSet, target: VarType) -> Result<UdqSet, EvalError> {
    if set.is_scalar() || set.var_type() == target {
        Ok(set)
    } else {
        Err(EvalError::UnsupportedTarget {
            keyword: keyword.to_string(),
            found: set.var_type(),
            target,
        })
    }
}

fn eval_vector(keyword: &str, selector: &[String], context: &EvalContext) -> Result<UdqSet, EvalError> {
    match VarType::from_keyword(keyword) {
        Some(VarType::Field) => eval_field(keyword, context),
        Some(VarType::Well) => eval_well(keyword, selector, context),
        Some(VarType::Group) => eval_group(keyword, selector, context),
        Some(VarType::Segment) => eval_segment(keyword, selector, context),
        Some(other) => Err(EvalError::UnsupportedTarget {
            keyword: keyword.to_string(),
            found: other,
            target: other,
        }),
        None => Err(EvalError::UnknownKeyword {
            keyword: keyword.to_string(),
        }),
    }
}

fn unknown_keyword(keyword: &str) -> EvalError {
    EvalError::UnknownKeyword {
        keyword: keyword.to_string(),
    }
}

fn no_match(keyword: &str, selector: &[String], var_type: VarType) -> EvalError {
    EvalError::NoMatchingEntities {
        keyword: keyword.to_string(),
        selector: selector.to_vec(),
        var_type,
    }
}

fn eval_field(keyword: &str, context: &EvalContext) -> Result<UdqSet, EvalError> {
    let st = context.summary();
    match st.get(keyword) {
        Some(value) => Ok(UdqSet::field(keyword, Some(value))),
        // quantities that have not been evaluated yet are undefined
        None if is_udq_name(keyword) => Ok(UdqSet::field(keyword, None)),
        None => Err(unknown_keyword(keyword)),
    }
}

fn eval_well(keyword: &str, selector: &[String], context: &EvalContext) -> Result<UdqSet, EvalError> {
    let st = context.summary();
    if !st.has_well_keyword(keyword) && !is_udq_name(keyword) {
        return Err(unknown_keyword(keyword));
    }

    if let [well] = selector
        && !has_wildcard(well)
    {
        if !context.wells().contains(well) {
            return Err(no_match(keyword, selector, VarType::Well));
        }
        return Ok(UdqSet::scalar(keyword, st.get_well_var(well, keyword)));
    }

    let wells = context.matching_wells(selector)?;
    if !selector.is_empty() && wells.is_empty() {
        return Err(no_match(keyword, selector, VarType::Well));
    }
    let mut set = UdqSet::wells(keyword, &wells, None);
    for (index, well) in wells.iter().enumerate() {
        set.assign(index, st.get_well_var(well, keyword));
    }
    Ok(set)
}

fn eval_group(keyword: &str, selector: &[String], context: &EvalContext) -> Result<UdqSet, EvalError> {
    let st = context.summary();
    if !st.has_group_keyword(keyword) && !is_udq_name(keyword) {
        return Err(unknown_keyword(keyword));
    }

    if let [group] = selector
        && !has_wildcard(group)
    {
        if !context.groups().contains(group) {
            return Err(no_match(keyword, selector, VarType::Group));
        }
        return Ok(UdqSet::scalar(keyword, st.get_group_var(group, keyword)));
    }

    let groups = context.matching_groups(selector)?;
    if !selector.is_empty() && groups.is_empty() {
        return Err(no_match(keyword, selector, VarType::Group));
    }
    let mut set = UdqSet::groups(keyword, &groups, None);
    for (index, group) in groups.iter().enumerate() {
        set.assign(index, st.get_group_var(group, keyword));
    }
    Ok(set)
}

/// `selector` is empty, `[well]` or `[well, segment]`.
fn eval_segment(keyword: &str, selector: &[String], context: &EvalContext) -> Result<UdqSet, EvalError> {
    let st = context.summary();
    if !st.has_segment_keyword(keyword) && !is_udq_name(keyword) {
        return Err(unknown_keyword(keyword));
    }

    let segment = match selector.get(1) {
        Some(s) => Some(s.parse::<usize>().map_err(|_| EvalError::InvalidPattern { pattern: s.clone() })?),
        None => None,
    };
    let all = st.segments();
    let mut wells: Vec<String> = Vec::new();
    for (well, _) in &all {
        if !wells.contains(well) {
            wells.push(well.clone());
        }
    }
    let wells = match selector.first() {
        Some(pattern) => match_names(&wells, std::slice::from_ref(pattern))?,
        None => wells,
    };

    let matching: Vec<(String, usize)> = all
        .into_iter()
        .filter(|(well, seg)| wells.contains(well) && segment.is_none_or(|s| s == *seg))
        .collect();
    if !selector.is_empty() && matching.is_empty() {
        return Err(no_match(keyword, selector, VarType::Segment));
    }

    if let [(well, seg)] = matching.as_slice()
        && segment.is_some()
        && !has_wildcard(&selector[0])
    {
        return Ok(UdqSet::scalar(keyword, st.get_segment_var(well, keyword, *seg)));
    }

    let mut set = UdqSet::empty(keyword, VarType::Segment);
    for (well, seg) in &matching {
        set.push(UdqScalar::numbered(well.clone(), *seg, st.get_segment_var(well, keyword, *seg)));
    }
    Ok(set)
}

fn eval_region(
    keyword: &str,
    region_set: &str,
    region: Option<usize>,
    context: &EvalContext,
) -> Result<UdqSet, EvalError> {
    let st = context.summary();
    if !st.has_region_keyword(keyword, region_set) && !is_udq_name(keyword) {
        return Err(unknown_keyword(&format!("{}_{}", keyword, region_set)));
    }

    let regions = st.regions(region_set);
    match region {
        Some(r) => {
            if !regions.contains(&r) {
                return Err(no_match(keyword, &[r.to_string()], VarType::Region));
            }
            Ok(UdqSet::scalar(keyword, st.get_region_var(keyword, region_set, r)))
        }
        None => {
            let mut set = UdqSet::empty(keyword, VarType::Region);
            for r in regions {
                set.push(UdqScalar::numbered(region_set, *r, st.get_region_var(keyword, region_set, *r)));
            }
            Ok(set)
        }
    }
}

fn domain_error(function: Function, entry: &UdqScalar, value: f64) -> EvalError {
    EvalError::Domain {
        function: function.name().to_string(),
        entity: entry.label(),
        value,
    }
}

/// Reduces the argument to one value computed from its defined entries.
///
/// `SUM` and the norms of an empty selection are zero; the averages,
/// `MAX`, `MIN` and `PROD` are undefined.
fn eval_scalar_function(
    function: Function,
    arg: &Node,
    target: VarType,
    context: &EvalContext,
) -> Result<UdqSet, EvalError> {
    // the argument is evaluated over its own kind, not the target's
    let arg_target = if arg.var_type.is_scalar() {
        target
    } else {
        arg.var_type
    };
    let values = arg.eval(arg_target, context)?;
    let defined: Vec<(&UdqScalar, f64)> = values
        .iter()
        .filter_map(|entry| entry.value.map(|v| (entry, v)))
        .collect();
    let count = defined.len() as f64;
    let non_empty = !defined.is_empty();

    let value: Option<f64> = match function {
        Function::Sum => Some(defined.iter().map(|(_, v)| v).sum()),
        Function::Avea => non_empty.then(|| defined.iter().map(|(_, v)| v).sum::<f64>() / count),
        Function::Aveg => {
            let mut log_sum = 0.0;
            for (entry, v) in &defined {
                if *v <= 0.0 {
                    return Err(domain_error(function, entry, *v));
                }
                log_sum += v.ln();
            }
            non_empty.then(|| (log_sum / count).exp())
        }
        Function::Aveh => {
            let mut inverse_sum = 0.0;
            for (entry, v) in &defined {
                if *v == 0.0 {
                    return Err(domain_error(function, entry, *v));
                }
                inverse_sum += 1.0 / v;
            }
            non_empty.then(|| count / inverse_sum)
        }
        Function::Max => defined.iter().map(|(_, v)| *v).reduce(f64::max),
        Function::Min => defined.iter().map(|(_, v)| *v).reduce(f64::min),
        Function::Norm1 => Some(defined.iter().map(|(_, v)| v.abs()).sum()),
        Function::Norm2 => Some(defined.iter().map(|(_, v)| v * v).sum::<f64>().sqrt()),
        Function::NormI => Some(defined.iter().map(|(_, v)| v.abs()).fold(0.0, f64::max)),
        Function::Prod => non_empty.then(|| defined.iter().map(|(_, v)| v).product()),
        _ => unreachable!("{} is not a scalar function", function.name()),
    };
    if let Some(v) = value
        && !v.is_finite()
    {
        return Err(EvalError::Domain {
            function: function.name().to_string(),
            entity: values.name().to_string(),
            value: v,
        });
    }
    Ok(UdqSet::scalar(function.name(), value))
}

fn eval_elemental_function(
    function: Function,
    arg: &Node,
    target: VarType,
    context: &EvalContext,
) -> Result<UdqSet, EvalError> {
    let values = arg.eval(target, context)?;
    match function {
        Function::Sorta => Ok(rank(&values, true)),
        Function::Sortd => Ok(rank(&values, false)),
        _ => values.try_map(|entry| elemental(function, entry)),
    }
}

fn elemental(function: Function, entry: &UdqScalar) -> Result<Option<f64>, EvalError> {
    let Some(x) = entry.value else {
        return Ok(match function {
            Function::Undef => Some(1.0),
            Function::Idv => Some(0.0),
            _ => None,
        });
    };

    let y = match function {
        Function::Abs => x.abs(),
        Function::Def | Function::Idv => 1.0,
        Function::Undef => return Ok(None),
        Function::Exp => x.exp(),
        Function::Ln | Function::Log if x <= 0.0 => return Err(domain_error(function, entry, x)),
        Function::Ln => x.ln(),
        Function::Log => x.log10(),
        Function::Nint => x.round(),
        _ => unreachable!("{} is not an elemental function", function.name()),
    };
    if !y.is_finite() {
        return Err(domain_error(function, entry, x));
    }
    Ok(Some(y))
}

/// Rank of every defined entry, starting at 1; ties keep set order.
fn rank(values: &UdqSet, ascending: bool) -> UdqSet {
    let mut order: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| entry.value.map(|v| (index, v)))
        .collect();
    if ascending {
        order.sort_by(|a, b| a.1.total_cmp(&b.1));
    } else {
        order.sort_by(|a, b| b.1.total_cmp(&a.1));
    }

    let mut result = values.with_shape(None);
    for (position, (index, _)) in order.iter().enumerate() {
        result.assign(*index, Some((position + 1) as f64));
    }
    result
}

fn union(a: Option<f64>, b: Option<f64>, f: impl Fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(f(x, y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

fn compare(a: Option<f64>, b: Option<f64>, f: impl Fn(f64, f64) -> bool) -> Option<f64> {
    Some(if f(a?, b?) { 1.0 } else { 0.0 })
}

fn eval_binary(
    op: BinaryOp,
    left: &Node,
    right: &Node,
    target: VarType,
    context: &EvalContext,
) -> Result<UdqSet, EvalError> {
    let lhs = left.eval(target, context)?;
    let rhs = right.eval(target, context)?;
    let symbol = op.symbol();

    let result = match op {
        BinaryOp::Add => lhs.combine(&rhs, symbol, |a, b| Some(a? + b?)),
        BinaryOp::Subtract => lhs.combine(&rhs, symbol, |a, b| Some(a? - b?)),
        BinaryOp::Multiply => lhs.combine(&rhs, symbol, |a, b| Some(a? * b?)),
        // division by zero leaves the entry undefined
        BinaryOp::Divide => lhs.combine(&rhs, symbol, |a, b| {
            let (a, b) = (a?, b?);
            (b != 0.0).then(|| a / b)
        }),
        BinaryOp::Power => lhs.combine(&rhs, symbol, |a, b| Some(a?.powf(b?))),
        BinaryOp::UnionAdd => lhs.combine(&rhs, symbol, |a, b| union(a, b, |x, y| x + y)),
        BinaryOp::UnionMultiply => lhs.combine(&rhs, symbol, |a, b| union(a, b, |x, y| x * y)),
        BinaryOp::UnionMin => lhs.combine(&rhs, symbol, |a, b| union(a, b, f64::min)),
        BinaryOp::UnionMax => lhs.combine(&rhs, symbol, |a, b| union(a, b, f64::max)),
        BinaryOp::Equal => lhs.combine(&rhs, symbol, |a, b| compare(a, b, |x, y| x == y)),
        BinaryOp::NotEqual => lhs.combine(&rhs, symbol, |a, b| compare(a, b, |x, y| x != y)),
        BinaryOp::LessThan => lhs.combine(&rhs, symbol, |a, b| compare(a, b, |x, y| x < y)),
        BinaryOp::LessEqual => lhs.combine(&rhs, symbol, |a, b| compare(a, b, |x, y| x <= y)),
        BinaryOp::GreaterThan => lhs.combine(&rhs, symbol, |a, b| compare(a, b, |x, y| x > y)),
        BinaryOp::GreaterEqual => lhs.combine(&rhs, symbol, |a, b| compare(a, b, |x, y| x >= y)),
    }?;
    check_finite(symbol, &lhs, result)
}

/// Overflow and `inf - inf` are domain errors of the operator; the error
/// reports the left operand of the failing entry.
fn check_finite(symbol: &str, lhs: &UdqSet, result: UdqSet) -> Result<UdqSet, EvalError> {
    let Some(bad) = result.iter().find(|e| e.value.is_some_and(|v| !v.is_finite())) else {
        return Ok(result);
    };
    let operand = if lhs.is_scalar() {
        lhs.scalar_value()
    } else {
        lhs.iter()
            .find(|e| e.same_entity(bad))
            .and_then(|e| e.value)
    };
    Err(EvalError::Domain {
        function: symbol.to_string(),
        entity: bad.label(),
        value: operand.unwrap_or(f64::NAN),
    })
}
