//! # modelc-ast — abstract declaration and expression tree types
//!
//! This crate defines the input the compilation pipeline in the `modelc`
//! crate consumes. Producing a value of these types from UTF-8 source text is
//! the job of an external lexer/parser collaborator (out of scope here, see
//! `spec.md` §1); this crate only fixes the *shape* that collaborator must
//! hand over, plus a small [`builders`] API for constructing trees
//! programmatically (used throughout the compiler's own test suite, the way
//! a hand-rolled parser's output would be asserted against in a parser crate
//! that ships its own AST builders).
//!
//! ## Layout
//!
//! - [`location`] — `SourceLocation`, attached to every node for diagnostics.
//! - [`units`] — the *declared* form of a unit expression (`[k g, m -3]`),
//!   preserved verbatim the way the user wrote it; canonicalization to
//!   standard form is a job of `modelc`'s unit algebra (C1), not this crate.
//! - [`expr`] — the expression dialect used inside declaration bodies.
//! - [`decl`] — top-level entity declarations, notes, and programs/modules.
//! - [`builders`] — fluent construction helpers for tests and tooling.

pub mod builders;
pub mod decl;
pub mod expr;
pub mod location;
pub mod units;

pub use decl::{Decl, DeclArg, EntityKind, Module, NoteDecl, Program};
pub use expr::{ArrowKind, BinOp, DirectiveCall, ExprAst, Literal, RestrictionKind, UnaryOp};
pub use location::SourceLocation;
pub use units::{SiPrefix, UnitAst, UnitPartAst};
