use std::fmt;

use thiserror::Error;

use crate::ast::Token;

/// Location of a character in the expression text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Zero based character offset
    pub offset: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column {}", self.offset + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {position}")]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Position of the next unread character.
    pub fn position(&self) -> Position {
        Position {
            offset: self.position,
        }
    }

    /// Skips whitespace and returns where the next token starts.
    pub fn token_start(&mut self) -> Position {
        self.skip_whitespace();
        self.position()
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> LexError {
        LexError {
            message: message.into(),
            position: Position { offset },
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_quoted(&mut self) -> Result<String, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == '\'' {
                return Ok(result);
            }
            result.push(ch);
        }

        Err(self.error("Unterminated quoted name", start))
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut number = String::new();
        let mut seen_dot = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.' && !seen_dot {
                seen_dot = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Exponent, also in Fortran notation (1.0D3)
        if let Some(e) = self.current_char()
            && matches!(e, 'e' | 'E' | 'd' | 'D')
        {
            let digits_at = match self.peek_char(1) {
                Some('+') | Some('-') => 2,
                _ => 1,
            };
            if self.peek_char(digits_at).is_some_and(|c| c.is_ascii_digit()) {
                number.push('e');
                self.advance();
                if digits_at == 2 {
                    number.extend(self.current_char());
                    self.advance();
                }
                while let Some(ch) = self.current_char() {
                    if !ch.is_ascii_digit() {
                        break;
                    }
                    number.push(ch);
                    self.advance();
                }
            }
        }

        if number == "." {
            return Err(self.error("Expected digits around '.'", start));
        }
        if number.ends_with('.') {
            number.push('0');
        }
        number
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| self.error(format!("Invalid number '{}'", number), start))
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let start = self.position;
        let token = match self.current_char() {
            None => Token::Eof,
            Some('+') => {
                self.advance();
                Token::Plus
            }
            Some('-') => {
                self.advance();
                Token::Minus
            }
            Some('*') => {
                self.advance();
                Token::Star
            }
            Some('/') => {
                self.advance();
                Token::Slash
            }
            Some('^') => {
                self.advance();
                Token::Caret
            }
            Some('=') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::EqEq
                } else {
                    return Err(self.error("Unexpected '=' (did you mean '=='?)", start));
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::NotEq
                } else {
                    return Err(self.error("Unexpected '!' (did you mean '!='?)", start));
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::GtEq
                } else {
                    self.advance();
                    Token::Gt
                }
            }
            Some('<') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::LtEq
                } else {
                    self.advance();
                    Token::Lt
                }
            }
            Some('(') => {
                self.advance();
                Token::LParen
            }
            Some(')') => {
                self.advance();
                Token::RParen
            }
            Some('[') => {
                self.advance();
                Token::LBracket
            }
            Some(']') => {
                self.advance();
                Token::RBracket
            }
            Some('\'') => Token::Quoted(self.read_quoted()?),
            Some(ch) if ch.is_alphabetic() || ch == '_' => Token::Identifier(self.read_identifier()),
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some('.') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => self.read_number()?,
            Some(ch) => return Err(self.error(format!("Unexpected character '{}'", ch), start)),
        };
        Ok(token)
    }
}

#[test]
fn test_fortran_exponent() {
    let mut lexer = Lexer::new("1.5D2 2E-1 400.");
    assert_eq!(lexer.next_token().unwrap(), Token::Number(150.0));
    assert_eq!(lexer.next_token().unwrap(), Token::Number(0.2));
    assert_eq!(lexer.next_token().unwrap(), Token::Number(400.0));
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}

#[test]
fn test_define_expression() {
    let mut lexer = Lexer::new("(WOPR PROD1 - 150) * 0.90");
    assert_eq!(lexer.next_token().unwrap(), Token::LParen);
    assert_eq!(lexer.next_token().unwrap(), Token::Identifier("WOPR".to_string()));
    assert_eq!(lexer.next_token().unwrap(), Token::Identifier("PROD1".to_string()));
    assert_eq!(lexer.next_token().unwrap(), Token::Minus);
    assert_eq!(lexer.next_token().unwrap(), Token::Number(150.0));
    assert_eq!(lexer.next_token().unwrap(), Token::RParen);
    assert_eq!(lexer.next_token().unwrap(), Token::Star);
    assert_eq!(lexer.next_token().unwrap(), Token::Number(0.9));
}
