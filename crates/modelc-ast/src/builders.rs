//! Fluent builders for programmatic AST construction, particularly useful
//! for tests that want to build a small declaration tree without writing a
//! parser.
//!
//! ## Example
//!
//! ```rust
//! use modelc_ast::builders::{DeclBuilder, UnitBuilder};
//! use modelc_ast::EntityKind;
//!
//! // var(a.x, [k g], 1.0)
//! let decl = DeclBuilder::new(EntityKind::Quantity, "x")
//!     .unit_arg(UnitBuilder::new().part("g", 1).with_kilo().build())
//!     .build();
//! assert_eq!(decl.handle.as_deref(), Some("x"));
//! ```

use crate::decl::{Decl, DeclArg, EntityKind, NoteDecl};
use crate::expr::ExprAst;
use crate::location::SourceLocation;
use crate::units::{RationalLit, SiPrefix, UnitAst, UnitPartAst};

fn test_loc() -> SourceLocation {
    SourceLocation::new("<builder>", 0, 0)
}

/// Builder for a declared unit, e.g. `[k g, m -3]`.
#[derive(Debug, Clone, Default)]
pub struct UnitBuilder {
    parts: Vec<UnitPartAst>,
}

impl UnitBuilder {
    pub fn new() -> Self {
        UnitBuilder::default()
    }

    /// Add a part with an explicit integer power and no SI prefix.
    pub fn part(mut self, symbol: &str, power: i64) -> Self {
        self.parts.push(UnitPartAst {
            prefix: SiPrefix::None,
            symbol: symbol.to_string(),
            power: RationalLit::whole(power),
        });
        self
    }

    /// Marks the most recently added part as kilo-prefixed.
    pub fn with_kilo(mut self) -> Self {
        if let Some(last) = self.parts.last_mut() {
            last.prefix = SiPrefix::Kilo;
        }
        self
    }

    pub fn build(self) -> UnitAst {
        UnitAst {
            parts: self.parts,
            location: test_loc(),
        }
    }
}

/// Builder for a top-level `Decl`.
#[derive(Debug, Clone)]
pub struct DeclBuilder {
    kind: EntityKind,
    handle: Option<String>,
    serial_name: Option<String>,
    args: Vec<DeclArg>,
    body: Option<ExprAst>,
    notes: Vec<NoteDecl>,
    declared: bool,
}

impl DeclBuilder {
    pub fn new(kind: EntityKind, handle: impl Into<String>) -> Self {
        DeclBuilder {
            kind,
            handle: Some(handle.into()),
            serial_name: None,
            args: Vec::new(),
            body: None,
            notes: Vec::new(),
            declared: true,
        }
    }

    pub fn serial_name(mut self, name: impl Into<String>) -> Self {
        self.serial_name = Some(name.into());
        self
    }

    pub fn unit_arg(mut self, unit: UnitAst) -> Self {
        self.args.push(DeclArg::Unit(unit));
        self
    }

    pub fn expr_arg(mut self, expr: ExprAst) -> Self {
        self.args.push(DeclArg::Expr(expr));
        self
    }

    pub fn location_arg(mut self, loc: ExprAst) -> Self {
        self.args.push(DeclArg::Location(loc));
        self
    }

    pub fn string_arg(mut self, s: impl Into<String>) -> Self {
        self.args.push(DeclArg::StringLit(s.into()));
        self
    }

    pub fn body(mut self, body: ExprAst) -> Self {
        self.body = Some(body);
        self
    }

    pub fn note(mut self, name: impl Into<String>) -> Self {
        self.notes.push(NoteDecl {
            name: name.into(),
            args: Vec::new(),
            body: None,
            location: test_loc(),
        });
        self
    }

    pub fn undeclared(mut self) -> Self {
        self.declared = false;
        self
    }

    pub fn build(self) -> Decl {
        Decl {
            kind: self.kind,
            handle: self.handle,
            serial_name: self.serial_name,
            args: self.args,
            body: self.body,
            notes: self.notes,
            location: test_loc(),
            declared: self.declared,
        }
    }
}

/// Helpers for constructing common expression shapes without spelling out
/// a `SourceLocation` at every call site.
pub mod expr {
    use crate::expr::{BinOp, ExprAst, Literal};
    use crate::location::SourceLocation;

    fn loc() -> SourceLocation {
        SourceLocation::new("<builder>", 0, 0)
    }

    pub fn real(v: f64) -> ExprAst {
        ExprAst::Literal(Literal::Real(v), loc())
    }

    pub fn int(v: i64) -> ExprAst {
        ExprAst::Literal(Literal::Int(v), loc())
    }

    pub fn ident(segments: &[&str]) -> ExprAst {
        ExprAst::IdentifierChain {
            segments: segments.iter().map(|s| s.to_string()).collect(),
            restriction: None,
            location: loc(),
        }
    }

    pub fn binary(op: BinOp, lhs: ExprAst, rhs: ExprAst) -> ExprAst {
        ExprAst::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            location: loc(),
        }
    }
}
