//! # UDQ Expression Language - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for User Defined Quantity
//! expressions, the small arithmetic language deck authors use to derive new
//! well, group, field, region and segment quantities from summary vectors.
//!
//! ## Architecture Overview
//!
//! The AST module is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - The expression tree ([`Node`]) and its variants
//! - **[operators]** - Binary operators and the function library
//! - **[statements]** - `DEFINE`, `ASSIGN`, `UNITS` and `UPDATE` records
//!
//! ## Quick Start
//!
//! ```text
//! DEFINE WUOPRL (WOPR PROD1 - 150) * 0.90 /
//! DEFINE FU_TOT SUM(WOPR) + FWPR /
//! ```
//!
//! ## Core Concepts
//!
//! ### Quantity kinds
//!
//! The first letter of a keyword decides what it is defined over:
//!
//! - `W` → wells, `G` → groups, `F` → the field
//! - `R` → regions (an optional `_SET` suffix picks the region set)
//! - `S` → well segments
//!
//! A second letter `U` marks a user defined quantity (`WUOPRL`, `FU_CS13`).
//!
//! ### Selectors
//!
//! Well and group keywords take an optional list of names or patterns:
//!
//! ```text
//! WOPR PROD1        // a single well, evaluates to a scalar
//! WOPR 'PROD*'      // every well matching the pattern
//! WOPR              // every well
//! ```
//!
//! ### Precedence
//!
//! From loosest to tightest: comparisons, `+ - UADD UMIN UMAX`, prefix `-`,
//! `* / UMUL`, `^`, then literals, keywords, function calls and parentheses.
pub mod expressions;
pub mod operators;
pub mod statements;
pub mod tokens;

pub use expressions::{Node, NodeKind, RequiredObjects, TableLookup};
pub use operators::{BinaryOp, Function};
pub use statements::{Statement, UpdateStatus};
pub use tokens::Token;
