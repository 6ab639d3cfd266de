use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Numeric literal
    ///
    /// Deck numbers may omit the fraction or use a Fortran style exponent.
    ///
    /// # Examples
    /// ```text
    /// 150
    /// 0.90
    /// 400.
    /// 1.5E3
    /// 2.0D-1
    /// ```
    Number(f64),

    /// Keyword, function name, union operator or entity name
    ///
    /// Must start with a letter or underscore, followed by letters, digits or
    /// underscores. The parser decides what an identifier means from its
    /// position.
    ///
    /// # Examples
    /// ```text
    /// WOPR
    /// FU_CS13
    /// SUM
    /// UADD
    /// PROD1
    /// ```
    Identifier(String),

    /// Name enclosed in single quotes
    ///
    /// Used for selectors containing wildcards or characters that are not
    /// allowed in identifiers.
    ///
    /// # Examples
    /// ```text
    /// 'PROD*'
    /// 'OP-1'
    /// ```
    Quoted(String),

    // Arithmetic
    /// Addition
    Plus,

    /// Subtraction or negation
    Minus,

    /// Multiplication
    Star,

    /// Division
    Slash,

    /// Power
    Caret,

    // Comparison
    /// Equality operator
    EqEq,

    /// Inequality operator
    NotEq,

    /// Less than
    Lt,

    /// Greater than
    Gt,

    /// Less than or equal
    LtEq,

    /// Greater than or equal
    GtEq,

    // Delimiters
    /// Left parenthesis for grouping or function calls
    LParen,

    /// Right parenthesis
    RParen,

    /// Left bracket opening a user table lookup
    ///
    /// # Examples
    /// ```text
    /// TU_PI[WOPR]
    /// ```
    LBracket,

    /// Right bracket
    RBracket,

    /// End of input
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", n),
            Token::Identifier(s) => write!(f, "'{}'", s),
            Token::Quoted(s) => write!(f, "quoted name '{}'", s),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::Caret => write!(f, "'^'"),
            Token::EqEq => write!(f, "'=='"),
            Token::NotEq => write!(f, "'!='"),
            Token::Lt => write!(f, "'<'"),
            Token::Gt => write!(f, "'>'"),
            Token::LtEq => write!(f, "'<='"),
            Token::GtEq => write!(f, "'>='"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Eof => write!(f, "end of expression"),
        }
    }
}
