pub mod active;
pub mod ast;
pub mod cli;
pub mod config;
pub mod context;
pub mod deck;
pub mod evaluator;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod tables;
pub mod uda;
pub mod units;
pub mod value;
pub mod well_injection;

pub use active::UdqActive;
pub use ast::{BinaryOp, Function, Node, NodeKind, Statement, TableLookup, Token};
pub use config::{UdqConfig, UdqError, UdqParams};
pub use context::{EvalContext, SummaryState};
pub use deck::{InputError, Location};
pub use evaluator::EvalError;
pub use lexer::{LexError, Lexer, Position};
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, Parser};
pub use value::{UdqScalar, UdqSet, VarType};
