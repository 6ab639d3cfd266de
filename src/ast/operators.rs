use serde::{Deserialize, Serialize};

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    /// Addition (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Power (`^`)
    Power,

    // Union
    //
    // The result is defined wherever at least one operand is defined; a
    // single defined operand passes through unchanged.
    /// Union addition (`UADD`)
    UnionAdd,
    /// Union multiplication (`UMUL`)
    UnionMultiply,
    /// Union minimum (`UMIN`)
    UnionMin,
    /// Union maximum (`UMAX`)
    UnionMax,

    // Comparison, producing 1 for true and 0 for false
    /// Equal (`==`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than (`>`)
    GreaterThan,
    /// Greater than or equal (`>=`)
    GreaterEqual,
}

impl BinaryOp {
    /// Union operators are written as words rather than symbols.
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "UADD" => Some(BinaryOp::UnionAdd),
            "UMUL" => Some(BinaryOp::UnionMultiply),
            "UMIN" => Some(BinaryOp::UnionMin),
            "UMAX" => Some(BinaryOp::UnionMax),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Power => "^",
            BinaryOp::UnionAdd => "UADD",
            BinaryOp::UnionMultiply => "UMUL",
            BinaryOp::UnionMin => "UMIN",
            BinaryOp::UnionMax => "UMAX",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterEqual => ">=",
        }
    }

    /// Binding strength, higher binds tighter.
    ///
    /// Prefix minus sits at 3, between the additive and multiplicative levels.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::LessThan
            | BinaryOp::LessEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterEqual => 1,
            BinaryOp::Add
            | BinaryOp::Subtract
            | BinaryOp::UnionAdd
            | BinaryOp::UnionMin
            | BinaryOp::UnionMax => 2,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::UnionMultiply => 4,
            BinaryOp::Power => 5,
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(
            self,
            BinaryOp::UnionAdd | BinaryOp::UnionMultiply | BinaryOp::UnionMin | BinaryOp::UnionMax
        )
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == 1
    }
}

/// Functions applied to a single parenthesized argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Function {
    // Scalar functions, collapsing a set into one value
    /// Sum of defined values, zero when none are defined
    Sum,
    /// Arithmetic mean
    Avea,
    /// Geometric mean
    Aveg,
    /// Harmonic mean
    Aveh,
    /// Largest defined value
    Max,
    /// Smallest defined value
    Min,
    /// Sum of absolute values
    Norm1,
    /// Euclidean norm
    Norm2,
    /// Largest absolute value
    NormI,
    /// Product of defined values
    Prod,

    // Elemental functions, applied entry by entry
    /// Absolute value
    Abs,
    /// 1 where defined, undefined elsewhere
    Def,
    /// 1 where undefined, undefined elsewhere
    Undef,
    /// 1 where defined, 0 where undefined
    Idv,
    /// Exponential
    Exp,
    /// Natural logarithm
    Ln,
    /// Base 10 logarithm
    Log,
    /// Nearest integer
    Nint,
    /// Rank in ascending order, starting at 1
    Sorta,
    /// Rank in descending order, starting at 1
    Sortd,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name.to_ascii_uppercase().as_str() {
            "SUM" => Function::Sum,
            "AVEA" => Function::Avea,
            "AVEG" => Function::Aveg,
            "AVEH" => Function::Aveh,
            "MAX" => Function::Max,
            "MIN" => Function::Min,
            "NORM1" => Function::Norm1,
            "NORM2" => Function::Norm2,
            "NORMI" => Function::NormI,
            "PROD" => Function::Prod,
            "ABS" => Function::Abs,
            "DEF" => Function::Def,
            "UNDEF" => Function::Undef,
            "IDV" => Function::Idv,
            "EXP" => Function::Exp,
            "LN" => Function::Ln,
            "LOG" => Function::Log,
            "NINT" => Function::Nint,
            "SORTA" => Function::Sorta,
            "SORTD" => Function::Sortd,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Sum => "SUM",
            Function::Avea => "AVEA",
            Function::Aveg => "AVEG",
            Function::Aveh => "AVEH",
            Function::Max => "MAX",
            Function::Min => "MIN",
            Function::Norm1 => "NORM1",
            Function::Norm2 => "NORM2",
            Function::NormI => "NORMI",
            Function::Prod => "PROD",
            Function::Abs => "ABS",
            Function::Def => "DEF",
            Function::Undef => "UNDEF",
            Function::Idv => "IDV",
            Function::Exp => "EXP",
            Function::Ln => "LN",
            Function::Log => "LOG",
            Function::Nint => "NINT",
            Function::Sorta => "SORTA",
            Function::Sortd => "SORTD",
        }
    }

    /// Scalar functions reduce their argument to a single value.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Function::Sum
                | Function::Avea
                | Function::Aveg
                | Function::Aveh
                | Function::Max
                | Function::Min
                | Function::Norm1
                | Function::Norm2
                | Function::NormI
                | Function::Prod
        )
    }
}
