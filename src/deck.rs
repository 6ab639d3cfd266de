//! Reader for the text of `UDQ` and `UDT` keyword blocks.
//!
//! ```text
//! UDQ
//! -- comment
//! DEFINE WUOPRL (WOPR PROD1 - 150) * 0.90 /
//! ASSIGN WULPRL 400. /
//! UNITS  WUOPRL 'SM3/DAY' /
//! /
//!
//! UDT
//! 'TU_FBHP' 1 /
//! 'LC' 0 1000 /
//! 150 250 /
//! /
//! ```
//!
//! A record ends at a `/` that is the last character of a line, so `/`
//! inside an expression is division. Records may continue over several
//! lines. A `UDT` block holds one table: name and dimension, then the
//! interpolation code with the abscissas, then the values.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    ast::{Statement, UpdateStatus},
    config::{StatementError, UdqConfig},
    parser::parse_define,
    tables::{Interpolation, TableError, UserTable},
};

/// Where a statement was read from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub filename: String,
    pub lineno: usize,
}

impl Location {
    pub fn new(filename: impl Into<String>, lineno: usize) -> Self {
        Location {
            filename: filename.into(),
            lineno,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} line {}", self.filename, self.lineno)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputErrorKind {
    #[error(transparent)]
    Statement(#[from] StatementError),

    #[error("Unknown UDQ action '{action}'")]
    UnknownAction { action: String },

    #[error("Unexpected keyword '{keyword}', expected UDQ or UDT")]
    UnexpectedKeyword { keyword: String },

    #[error("UDT needs 3 records (name, abscissas, values), found {found}")]
    TableRecords { found: usize },

    #[error("Only one dimensional tables are supported, found dimension {dimension}")]
    TableDimension { dimension: String },

    #[error("Unknown interpolation '{code}', expected NV or LC")]
    UnknownInterpolation { code: String },

    #[error("{action} is missing the {item}")]
    MissingItem { action: String, item: String },

    #[error("Invalid number '{text}'")]
    InvalidNumber { text: String },

    #[error("Unterminated quoted string")]
    UnterminatedQuote,

    #[error("Record is not terminated with '/'")]
    UnterminatedRecord,
}

/// A deck statement failure, fatal to loading.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Problem with keyword {keyword} in {location}: {kind}")]
pub struct InputError {
    pub keyword: String,
    pub location: Location,
    pub kind: InputErrorKind,
}

impl InputError {
    fn new(keyword: impl Into<String>, location: Location, kind: InputErrorKind) -> Self {
        InputError {
            keyword: keyword.into(),
            location,
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Udq,
    Udt,
}

impl Keyword {
    fn from_line(line: &str) -> Option<Self> {
        match line.to_ascii_uppercase().as_str() {
            "UDQ" => Some(Keyword::Udq),
            "UDT" => Some(Keyword::Udt),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Keyword::Udq => "UDQ",
            Keyword::Udt => "UDT",
        }
    }
}

/// One complete record and the line it started on.
struct Record {
    text: String,
    lineno: usize,
}

/// The records of one keyword up to its closing `/`.
struct Block {
    keyword: Keyword,
    lineno: usize,
    records: Vec<Record>,
}

fn strip_comment(line: &str) -> &str {
    let mut in_quote = false;
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    for (i, &(offset, ch)) in chars.iter().enumerate() {
        match ch {
            '\'' => in_quote = !in_quote,
            '-' if !in_quote && chars.get(i + 1).is_some_and(|(_, c)| *c == '-') => {
                return &line[..offset];
            }
            _ => {}
        }
    }
    line
}

/// Splits a record into words; quotes group words and are removed.
fn words(text: &str) -> Result<Vec<String>, InputErrorKind> {
    let mut result = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch == '\'' {
            chars.next();
            let mut word = String::new();
            loop {
                match chars.next() {
                    Some('\'') => break,
                    Some(c) => word.push(c),
                    None => return Err(InputErrorKind::UnterminatedQuote),
                }
            }
            result.push(word);
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                word.push(c);
                chars.next();
            }
            result.push(word);
        }
    }
    Ok(result)
}

/// Splits off the first word, returning it and the remaining text.
fn split_word(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    match text.find(char::is_whitespace) {
        Some(end) => Some((&text[..end], text[end..].trim())),
        None => Some((text, "")),
    }
}

/// Deck numbers allow Fortran exponents (`1.0D3`).
fn parse_number(text: &str) -> Result<f64, InputErrorKind> {
    text.replace(['D', 'd'], "e")
        .parse::<f64>()
        .map_err(|_| InputErrorKind::InvalidNumber { text: text.to_string() })
}

fn missing(action: &str, item: &str) -> InputErrorKind {
    InputErrorKind::MissingItem {
        action: action.to_string(),
        item: item.to_string(),
    }
}

fn parse_record(text: &str) -> Result<Statement, InputErrorKind> {
    let (action, rest) = split_word(text).ok_or_else(|| missing("UDQ record", "action"))?;
    let action = action.to_ascii_uppercase();

    match action.as_str() {
        "DEFINE" => {
            let (name, expression) = split_word(rest).ok_or_else(|| missing("DEFINE", "quantity name"))?;
            if expression.is_empty() {
                return Err(missing("DEFINE", "expression"));
            }
            let name = name.trim_matches('\'').to_ascii_uppercase();
            let node = parse_define(&name, expression).map_err(StatementError::from)?;
            Ok(Statement::Define {
                name,
                expression: expression.to_string(),
                node,
            })
        }
        "ASSIGN" => {
            let mut items = words(rest)?;
            if items.len() < 2 {
                return Err(missing("ASSIGN", "value"));
            }
            let name = items.remove(0).to_ascii_uppercase();
            let value = items.pop().map(|v| parse_number(&v)).transpose()?;
            Ok(Statement::Assign {
                name,
                selector: items,
                value: value.unwrap_or_default(),
            })
        }
        "UNITS" => {
            let items = words(rest)?;
            match items.as_slice() {
                [name, unit, ..] => Ok(Statement::Units {
                    name: name.to_ascii_uppercase(),
                    unit: unit.clone(),
                }),
                _ => Err(missing("UNITS", "unit")),
            }
        }
        "UPDATE" => {
            let items = words(rest)?;
            let [name, status] = items.as_slice() else {
                return Err(missing("UPDATE", "status"));
            };
            let status = UpdateStatus::from_word(status).ok_or_else(|| InputErrorKind::UnknownAction {
                action: status.clone(),
            })?;
            Ok(Statement::Update {
                name: name.to_ascii_uppercase(),
                status,
            })
        }
        _ => Err(InputErrorKind::UnknownAction { action }),
    }
}

/// Collects the records of every keyword block in `text`.
fn blocks(text: &str, filename: &str) -> Result<Vec<Block>, InputError> {
    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;
    let mut pending: Option<Record> = None;

    for (index, raw) in text.lines().enumerate() {
        let lineno = index + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if current.is_none() {
            let Some(keyword) = Keyword::from_line(line) else {
                let keyword = line.split_whitespace().next().unwrap_or(line);
                return Err(InputError::new(
                    keyword,
                    Location::new(filename, lineno),
                    InputErrorKind::UnexpectedKeyword {
                        keyword: line.to_string(),
                    },
                ));
            };
            current = Some(Block {
                keyword,
                lineno,
                records: Vec::new(),
            });
            continue;
        }

        // a lone slash closes the keyword
        if line == "/" && pending.is_none() {
            blocks.extend(current.take());
            continue;
        }
        let Some(block) = current.as_mut() else {
            continue;
        };

        let (body, terminated) = match line.strip_suffix('/') {
            Some(body) => (body.trim_end(), true),
            None => (line, false),
        };
        let record = pending.get_or_insert_with(|| Record {
            text: String::new(),
            lineno,
        });
        if !record.text.is_empty() {
            record.text.push(' ');
        }
        record.text.push_str(body);

        if terminated && let Some(record) = pending.take() {
            block.records.push(record);
        }
    }

    if let Some(record) = pending {
        let keyword = current.as_ref().map_or("UDQ", |block| block.keyword.name());
        return Err(InputError::new(
            keyword,
            Location::new(filename, record.lineno),
            InputErrorKind::UnterminatedRecord,
        ));
    }
    blocks.extend(current);
    Ok(blocks)
}

fn numbers(items: &[String]) -> Result<Vec<f64>, InputErrorKind> {
    items.iter().map(|item| parse_number(item)).collect()
}

/// Builds the table of a `UDT` block.
fn parse_table(block: &Block, filename: &str) -> Result<(Statement, Location), InputError> {
    let error = |lineno, kind| InputError::new("UDT", Location::new(filename, lineno), kind);

    let [header, abscissas, values] = block.records.as_slice() else {
        let lineno = block.records.first().map_or(block.lineno, |r| r.lineno);
        return Err(error(
            lineno,
            InputErrorKind::TableRecords {
                found: block.records.len(),
            },
        ));
    };

    let items = words(&header.text).map_err(|kind| error(header.lineno, kind))?;
    let [name, dimension, ..] = items.as_slice() else {
        return Err(error(header.lineno, missing("UDT", "dimension")));
    };
    let name = name.to_ascii_uppercase();
    if parse_number(dimension).map_err(|kind| error(header.lineno, kind))? != 1.0 {
        return Err(error(
            header.lineno,
            InputErrorKind::TableDimension {
                dimension: dimension.clone(),
            },
        ));
    }

    let items = words(&abscissas.text).map_err(|kind| error(abscissas.lineno, kind))?;
    let Some((code, x)) = items.split_first() else {
        return Err(error(abscissas.lineno, missing("UDT", "interpolation")));
    };
    let interpolation = Interpolation::from_code(code).ok_or_else(|| {
        error(
            abscissas.lineno,
            InputErrorKind::UnknownInterpolation { code: code.clone() },
        )
    })?;
    let x = numbers(x).map_err(|kind| error(abscissas.lineno, kind))?;

    let items = words(&values.text).map_err(|kind| error(values.lineno, kind))?;
    let y = numbers(&items).map_err(|kind| error(values.lineno, kind))?;

    let table_error = |lineno, source| {
        error(
            lineno,
            StatementError::Table {
                name: name.clone(),
                source,
            }
            .into(),
        )
    };
    if x.len() != y.len() {
        return Err(table_error(
            values.lineno,
            TableError::LengthMismatch { x: x.len(), y: y.len() },
        ));
    }
    let table = UserTable::new(interpolation, x.into_iter().zip(y).collect())
        .map_err(|source| table_error(abscissas.lineno, source))?;

    let location = Location::new(filename, header.lineno);
    Ok((Statement::Table { name, table }, location))
}

/// Reads the statements of the `UDQ` and `UDT` blocks in `text`.
///
/// # Examples
///
/// ```
/// use udq_lang::{ast::Statement, deck::read_statements};
///
/// let deck = "UDQ\nDEFINE WUOPRL (WOPR PROD1 - 150) * 0.90 /\nASSIGN WULPRL 400. /\n/\n";
/// let statements = read_statements(deck, "TEST.DATA").unwrap();
/// assert_eq!(statements.len(), 2);
/// assert!(matches!(statements[1].0, Statement::Assign { value, .. } if value == 400.0));
/// ```
pub fn read_statements(text: &str, filename: &str) -> Result<Vec<(Statement, Location)>, InputError> {
    let mut statements = Vec::new();
    for block in blocks(text, filename)? {
        match block.keyword {
            Keyword::Udq => {
                for record in &block.records {
                    let location = Location::new(filename, record.lineno);
                    match parse_record(&record.text) {
                        Ok(statement) => statements.push((statement, location)),
                        Err(kind) => return Err(InputError::new("UDQ", location, kind)),
                    }
                }
            }
            Keyword::Udt => statements.push(parse_table(&block, filename)?),
        }
    }
    Ok(statements)
}

/// Reads `text` and adds every statement to `config`, stopping at the first
/// error.
pub fn load(text: &str, filename: &str, config: &mut UdqConfig) -> Result<usize, InputError> {
    let statements = read_statements(text, filename)?;
    let count = statements.len();
    for (statement, location) in statements {
        debug!(udq = statement.name(), %location, "UDQ statement");
        let keyword = statement.keyword();
        config
            .add_statement(statement, Some(location.clone()))
            .map_err(|source| InputError::new(keyword, location, source.into()))?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_division_is_not_a_terminator() {
        let deck = "UDQ\n  DEFINE FU_RATIO FOPR / FWPR /\n/";
        let statements = read_statements(deck, "A.DATA").unwrap();
        match &statements[0].0 {
            Statement::Define { expression, .. } => assert_eq!(expression, "FOPR / FWPR"),
            other => panic!("Expected DEFINE, got {:?}", other),
        }
    }

    #[test]
    fn test_continuation_lines() {
        let deck = "UDQ\nDEFINE WUX WOPR * 2\n   + WWPR /\n/";
        let statements = read_statements(deck, "A.DATA").unwrap();
        assert_eq!(statements[0].1.lineno, 2);
        assert!(matches!(&statements[0].0, Statement::Define { expression, .. } if expression == "WOPR * 2 + WWPR"));
    }

    #[test]
    fn test_comments_and_quotes() {
        let deck = "UDQ\n-- units\nUNITS WUX 'SM3/DAY' / -- trailing\n/";
        let statements = read_statements(deck, "A.DATA").unwrap();
        assert_eq!(
            statements[0].0,
            Statement::Units {
                name: "WUX".to_string(),
                unit: "SM3/DAY".to_string()
            }
        );
    }

    #[test]
    fn test_error_carries_line() {
        let deck = "UDQ\nASSIGN WUX 1 /\nDEFINE WUY LOG( /\n/";
        let err = read_statements(deck, "B.DATA").unwrap_err();
        assert_eq!(err.location, Location::new("B.DATA", 3));
        assert!(err.to_string().contains("B.DATA line 3"));
    }

    #[test]
    fn test_table_block() {
        let deck = "UDT\n-- bhp limit\n'tu_fbhp' 1 /\n'LC' 0 1000 /\n150\n 250 /\n/\nUDQ\nDEFINE FUX TU_FBHP[FOPR] /\n/";
        let statements = read_statements(deck, "T.DATA").unwrap();
        assert_eq!(statements.len(), 2);
        match &statements[0] {
            (Statement::Table { name, table }, location) => {
                assert_eq!(name, "TU_FBHP");
                assert_eq!(location.lineno, 3);
                assert_eq!(table.interpolation(), Interpolation::Linear);
                assert_eq!(table.lookup(500.0), Some(200.0));
            }
            other => panic!("Expected UDT, got {:?}", other),
        }
    }

    #[test]
    fn test_table_errors() {
        let err = read_statements("UDT\n'TU_A' 2 /\n'NV' 1 /\n1 /\n/", "T.DATA").unwrap_err();
        assert_eq!(err.keyword, "UDT");
        assert!(matches!(err.kind, InputErrorKind::TableDimension { .. }));

        let err = read_statements("UDT\n'TU_A' 1 /\n'XX' 1 /\n1 /\n/", "T.DATA").unwrap_err();
        assert_eq!(err.location.lineno, 3);
        assert!(matches!(err.kind, InputErrorKind::UnknownInterpolation { .. }));

        let err = read_statements("UDT\n'TU_A' 1 /\n'NV' 1 2 /\n1 /\n/", "T.DATA").unwrap_err();
        assert_eq!(err.location.lineno, 4);
        assert!(matches!(
            err.kind,
            InputErrorKind::Statement(StatementError::Table {
                source: TableError::LengthMismatch { x: 2, y: 1 },
                ..
            })
        ));

        let err = read_statements("UDT\n'TU_A' 1 /\n'NV' 2 1 /\n1 2 /\n/", "T.DATA").unwrap_err();
        assert!(err.to_string().starts_with("Problem with keyword UDT in T.DATA line 3"));

        let err = read_statements("UDT\n'TU_A' 1 /\n/", "T.DATA").unwrap_err();
        assert_eq!(err.kind, InputErrorKind::TableRecords { found: 1 });
    }

    #[test]
    fn test_unknown_keyword() {
        let err = read_statements("WCONINJE\n/", "C.DATA").unwrap_err();
        assert_eq!(err.keyword, "WCONINJE");
        assert_eq!(err.location.lineno, 1);
    }

    #[test]
    fn test_fortran_number() {
        assert_eq!(parse_number("1.5D2"), Ok(150.0));
        assert_eq!(parse_number("400."), Ok(400.0));
        assert!(parse_number("abc").is_err());
    }
}
