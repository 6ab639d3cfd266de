use std::mem;

use thiserror::Error;

use crate::{
    ast::{BinaryOp, Function, Node, Token, expressions::DEFAULT_REGION_SET},
    lexer::{LexError, Lexer, Position},
    value::{VarType, is_udq_name},
};

/// Syntax errors, raised before any quantity is registered.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("Expected {expected}, got {found} at {position}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: Position,
    },

    #[error("Unknown function '{name}' at {position}")]
    UnknownFunction { name: String, position: Position },

    #[error("Unknown keyword '{keyword}' at {position}")]
    UnknownKeyword { keyword: String, position: Position },

    #[error("The exponent of '^' must be a number, got {found} at {position}")]
    InvalidExponent { found: String, position: Position },

    #[error("Cannot combine a {left} expression with a {right} expression using '{op}'")]
    IncompatibleTypes {
        op: String,
        left: VarType,
        right: VarType,
    },

    #[error("A {found} expression cannot define {target} quantity {name}")]
    IncompatibleTarget {
        name: String,
        target: VarType,
        found: VarType,
    },
}

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    /// Where `current_token` starts
    position: Position,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let position = lexer.token_start();
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
            position,
        })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.position = self.lexer.token_start();
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if mem::discriminant(&self.current_token) != mem::discriminant(&expected) {
            return Err(self.unexpected(expected.to_string()));
        }
        self.advance()
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: self.current_token.to_string(),
            position: self.position,
        }
    }

    fn binary(&self, op: BinaryOp, left: Node, right: Node) -> Result<Node, ParseError> {
        if VarType::combine(left.var_type, right.var_type).is_none() {
            return Err(ParseError::IncompatibleTypes {
                op: op.symbol().to_string(),
                left: left.var_type,
                right: right.var_type,
            });
        }
        Ok(Node::binary(op, left, right))
    }

    /// Parse primary expressions: numbers, keywords, function calls,
    /// table lookups, parenthesized expressions and prefix minus on a factor
    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let position = self.position;
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Number(n) => {
                self.advance()?;
                Ok(Node::number(n))
            }

            Token::LParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }

            // Negated factor, e.g. the right hand side of `A * -B`
            Token::Minus => {
                self.advance()?;
                let mut operand = self.parse_power()?;
                operand.scale(-1.0);
                Ok(operand)
            }
            Token::Plus => {
                self.advance()?;
                self.parse_power()
            }

            Token::Identifier(name) => {
                self.advance()?;
                self.parse_identifier(name.to_ascii_uppercase(), position)
            }

            token => {
                self.current_token = token;
                Err(self.unexpected("a number, keyword, function or '('"))
            }
        }
    }

    fn parse_identifier(&mut self, name: String, position: Position) -> Result<Node, ParseError> {
        if self.check(&Token::LParen) {
            let function = Function::from_name(&name).ok_or(ParseError::UnknownFunction {
                name: name.clone(),
                position,
            })?;
            self.advance()?;
            let arg = self.parse_expression()?;
            self.expect(Token::RParen)?;
            return Ok(Node::function(function, arg));
        }

        if name.starts_with("TU_") && self.check(&Token::LBracket) {
            self.advance()?;
            let arg = self.parse_expression()?;
            self.expect(Token::RBracket)?;
            return Ok(Node::user_table(name, arg));
        }

        if BinaryOp::from_word(&name).is_some() || Function::from_name(&name).is_some() {
            return Err(ParseError::UnexpectedToken {
                expected: "a number, keyword, function or '('".to_string(),
                found: format!("'{}'", name),
                position,
            });
        }

        let category = VarType::from_keyword(&name).ok_or(ParseError::UnknownKeyword {
            keyword: name.clone(),
            position,
        })?;

        match category {
            VarType::Region => self.parse_region(name),
            VarType::Segment => {
                let mut selector = Vec::new();
                if let Some(well) = self.take_name()? {
                    selector.push(well);
                    if let Token::Number(n) = self.current_token {
                        selector.push(self.entity_number(n)?.to_string());
                    }
                }
                Ok(Node::vector(name, category, selector))
            }
            VarType::Well | VarType::Group => {
                let mut selector = Vec::new();
                while let Some(item) = self.take_name()? {
                    selector.push(item);
                }
                Ok(Node::vector(name, category, selector))
            }
            _ => Ok(Node::vector(name, category, Vec::new())),
        }
    }

    /// `RGPR_RE2 1`: keyword, region set suffix and optional region number.
    fn parse_region(&mut self, name: String) -> Result<Node, ParseError> {
        let split = if is_udq_name(&name) {
            None
        } else {
            name.rsplit_once('_')
                .filter(|(keyword, set)| !keyword.is_empty() && !set.is_empty())
                .map(|(keyword, set)| (keyword.to_string(), set.to_string()))
        };
        let (keyword, region_set) = split.unwrap_or((name, DEFAULT_REGION_SET.to_string()));
        let region = match self.current_token {
            Token::Number(n) => Some(self.entity_number(n)?),
            _ => None,
        };
        Ok(Node::region(keyword, region_set, region))
    }

    /// Consumes a positive integer such as a region or segment number.
    fn entity_number(&mut self, n: f64) -> Result<usize, ParseError> {
        if n < 1.0 || n.fract() != 0.0 {
            return Err(self.unexpected("a positive integer"));
        }
        self.advance()?;
        Ok(n as usize)
    }

    /// Consumes a selector name if the current token is one.
    fn take_name(&mut self) -> Result<Option<String>, ParseError> {
        let name = match &self.current_token {
            Token::Quoted(s) => s.clone(),
            Token::Identifier(s)
                if BinaryOp::from_word(s).is_none() && Function::from_name(s).is_none() =>
            {
                s.clone()
            }
            _ => return Ok(None),
        };
        self.advance()?;
        Ok(Some(name))
    }

    /// `^` binds tightest; its exponent is a literal, optionally signed.
    fn parse_power(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_primary()?;

        while self.check(&Token::Caret) {
            self.advance()?;
            let sign = match self.current_token {
                Token::Minus => {
                    self.advance()?;
                    -1.0
                }
                Token::Plus => {
                    self.advance()?;
                    1.0
                }
                _ => 1.0,
            };
            let exponent = match self.current_token {
                Token::Number(n) => n * sign,
                _ => {
                    return Err(ParseError::InvalidExponent {
                        found: self.current_token.to_string(),
                        position: self.position,
                    });
                }
            };
            self.advance()?;
            left = self.binary(BinaryOp::Power, left, Node::number(exponent))?;
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_power()?;

        loop {
            let op = match &self.current_token {
                Token::Star => BinaryOp::Multiply,
                Token::Slash => BinaryOp::Divide,
                Token::Identifier(word) if BinaryOp::from_word(word) == Some(BinaryOp::UnionMultiply) => {
                    BinaryOp::UnionMultiply
                }
                _ => break,
            };

            self.advance()?;
            let right = self.parse_power()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    /// Prefix minus applies to a whole product: `-A * B` is `-(A * B)`.
    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        match self.current_token {
            Token::Minus => {
                self.advance()?;
                let mut operand = self.parse_multiplicative()?;
                operand.scale(-1.0);
                Ok(operand)
            }
            Token::Plus => {
                self.advance()?;
                self.parse_multiplicative()
            }
            _ => self.parse_multiplicative(),
        }
    }

    fn parse_additive(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match &self.current_token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                Token::Identifier(word) => match BinaryOp::from_word(word) {
                    Some(op) if op.precedence() == 2 => op,
                    _ => break,
                },
                _ => break,
            };

            self.advance()?;
            let right = self.parse_unary()?;
            left = self.binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Node, ParseError> {
        let left = self.parse_additive()?;

        let op = match &self.current_token {
            Token::EqEq => BinaryOp::Equal,
            Token::NotEq => BinaryOp::NotEqual,
            Token::Lt => BinaryOp::LessThan,
            Token::Gt => BinaryOp::GreaterThan,
            Token::LtEq => BinaryOp::LessEqual,
            Token::GtEq => BinaryOp::GreaterEqual,
            _ => return Ok(left),
        };
        self.advance()?;
        let right = self.parse_additive()?;
        self.binary(op, left, right)
    }

    pub fn parse_expression(&mut self) -> Result<Node, ParseError> {
        self.parse_comparison()
    }

    pub fn parse(&mut self) -> Result<Node, ParseError> {
        let expr = self.parse_expression()?;
        if !self.check(&Token::Eof) {
            return Err(self.unexpected("an operator or end of expression"));
        }
        Ok(expr)
    }
}

/// Parses a complete expression.
///
/// # Examples
///
/// ```
/// use udq_lang::parser::parse_expression;
/// use udq_lang::VarType;
///
/// let node = parse_expression("SUM(WOPR) + FWPR").unwrap();
/// assert_eq!(node.var_type, VarType::Scalar);
/// ```
pub fn parse_expression(text: &str) -> Result<Node, ParseError> {
    Parser::new(Lexer::new(text))?.parse()
}

/// Parses the expression of `DEFINE <name> <expression>` and checks that it
/// can produce a quantity of the kind implied by `name`.
pub fn parse_define(name: &str, text: &str) -> Result<Node, ParseError> {
    let node = parse_expression(text)?;
    let target = VarType::from_keyword(name).ok_or(ParseError::UnknownKeyword {
        keyword: name.to_string(),
        position: Position::default(),
    })?;
    if !target.accepts(node.var_type) {
        return Err(ParseError::IncompatibleTarget {
            name: name.to_string(),
            target,
            found: node.var_type,
        });
    }
    Ok(node)
}
