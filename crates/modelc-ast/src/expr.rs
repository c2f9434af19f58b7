//! The expression dialect used inside declaration bodies (spec.md §6,
//! "Expression dialect inside bodies"). This is the abstract tree C3
//! (`modelc`'s typed expression tree) resolves; nothing here is typed or
//! unit-checked yet — that's what resolution produces.

use crate::location::SourceLocation;
use crate::units::UnitAst;

/// Literal values as they appear in source text.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Real(f64),
    Bool(bool),
    /// Bare ISO-like datetime token, kept as text; C3 parses it against the
    /// model's declared start date / calendar at resolve time.
    DateTime(String),
    Str(String),
}

/// Binary operators, spanning spec.md §6's `| & < > <= >= = != + - * / % ^`
/// plus integer division `//`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Or,
    And,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Pow,
}

/// Unary operators `- !`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Which of the four conversion arrows was used. See spec.md §4.3:
/// "Unit conversion x => [u], x ==> [u], x ->> [u], x -->> [u]: arrows
/// distinguish checked (compile-time factor required) vs force (bypass
/// unit check) vs auto (use the expected unit)." Four arrow spellings map
/// to three semantics; the doubled arrows (`==>`, `-->>`) add "apply across
/// an aggregate/distributed context" on top of the single-arrow semantics —
/// see DESIGN.md for the resolved mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrowKind {
    /// `=>` — checked: a compile-time conversion factor is required.
    Checked,
    /// `==>` — checked, additionally broadcast across the target's index
    /// distribution (same factor requirement as `Checked`).
    CheckedBroadcast,
    /// `->>` — force: bypass the unit check, using the conversion factor
    /// unconditionally (or 1 if none exists).
    Force,
    /// `-->>` — force, additionally broadcast across the target's index
    /// distribution.
    ForceBroadcast,
}

/// Reserved directive calls (spec.md §4.3: `last`, `in_flux`, `out_flux`,
/// `aggregate`, `result`, `conc`, `tuple`).
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveCall {
    Last(Box<ExprAst>),
    InFlux {
        connection: Option<String>,
        target: Box<ExprAst>,
    },
    OutFlux {
        connection: Option<String>,
        source: Box<ExprAst>,
    },
    Aggregate(Box<ExprAst>),
    Result(Box<ExprAst>),
    Conc(Box<ExprAst>),
    Tuple(Vec<ExprAst>),
}

/// A restriction kind attached to a bracketed location suffix
/// `[connection, kind]` (spec.md §3 "Restrictions").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RestrictionKind {
    None,
    Top,
    Bottom,
    Above,
    Below,
    Specific(String),
}

/// One node of the expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprAst {
    Literal(Literal, SourceLocation),

    /// A dotted identifier chain (`a.x`, `water`, `my_solver`), optionally
    /// suffixed with a restriction bracket `[connection, kind]`.
    IdentifierChain {
        segments: Vec<String>,
        restriction: Option<(String, RestrictionKind)>,
        location: SourceLocation,
    },

    DirectiveCall(DirectiveCall, SourceLocation),

    /// A call to a user/linked function: `f(a, b)`.
    FunctionCall {
        callee: String,
        args: Vec<ExprAst>,
        location: SourceLocation,
    },

    Binary {
        op: BinOp,
        lhs: Box<ExprAst>,
        rhs: Box<ExprAst>,
        location: SourceLocation,
    },

    Unary {
        op: UnaryOp,
        operand: Box<ExprAst>,
        location: SourceLocation,
    },

    /// `{ stmt, stmt, ..., final_expr }` — value is the value of the last
    /// child; every earlier child must not itself be a value (spec.md §4.3).
    Block {
        statements: Vec<ExprAst>,
        location: SourceLocation,
    },

    /// `a if c, b if c2, ... otherwise` conditional chain.
    IfChain {
        branches: Vec<(ExprAst, ExprAst)>,
        otherwise: Box<ExprAst>,
        location: SourceLocation,
    },

    /// `name := expr` local declaration (rejects shadowing in the same
    /// block).
    LocalDecl {
        name: String,
        value: Box<ExprAst>,
        location: SourceLocation,
    },

    /// `name <- expr` reassignment of an existing binding.
    Reassign {
        name: String,
        value: Box<ExprAst>,
        location: SourceLocation,
    },

    /// `x => [u]`, `x ==> [u]`, `x ->> [u]`, `x -->> [u]`.
    UnitConversion {
        value: Box<ExprAst>,
        arrow: ArrowKind,
        target_unit: UnitAst,
        location: SourceLocation,
    },

    /// A labeled block: `label: { ... }`, giving the block a fresh scope id
    /// that an `Iterate` node elsewhere can reference.
    IterateTag {
        label: String,
        body: Box<ExprAst>,
        location: SourceLocation,
    },

    /// A reference to a previously tagged block's iteration context.
    Iterate {
        label: String,
        location: SourceLocation,
    },

    /// `tuple(a, b, c)` surface form (also reachable via `DirectiveCall`;
    /// this variant exists for tuple *patterns* produced by unpacking).
    TupleLiteral {
        elements: Vec<ExprAst>,
        location: SourceLocation,
    },

    /// `(a, b, c) := expr` — unpacks a tuple value into named bindings.
    TupleUnpack {
        names: Vec<String>,
        value: Box<ExprAst>,
        location: SourceLocation,
    },

    /// Access a single slot of a resolved tuple value, `t.0`.
    TupleElement {
        tuple: Box<ExprAst>,
        index: usize,
        location: SourceLocation,
    },
}

impl ExprAst {
    pub fn location(&self) -> &SourceLocation {
        match self {
            ExprAst::Literal(_, loc)
            | ExprAst::IdentifierChain { location: loc, .. }
            | ExprAst::DirectiveCall(_, loc)
            | ExprAst::FunctionCall { location: loc, .. }
            | ExprAst::Binary { location: loc, .. }
            | ExprAst::Unary { location: loc, .. }
            | ExprAst::Block { location: loc, .. }
            | ExprAst::IfChain { location: loc, .. }
            | ExprAst::LocalDecl { location: loc, .. }
            | ExprAst::Reassign { location: loc, .. }
            | ExprAst::UnitConversion { location: loc, .. }
            | ExprAst::IterateTag { location: loc, .. }
            | ExprAst::Iterate { location: loc, .. }
            | ExprAst::TupleLiteral { location: loc, .. }
            | ExprAst::TupleUnpack { location: loc, .. }
            | ExprAst::TupleElement { location: loc, .. } => loc,
        }
    }
}
