//! The typed intermediate form C3 resolves an `ExprAst` into: every
//! scalar carries a `ValueType`, every identifier/binary/conversion node
//! carries a standard-form unit rather than source text. Grounded on the
//! tagged-variant style of an `IRExpression`
//! (`src/ir/mod.rs`) — one enum, one case per node kind, no inheritance,
//! matching spec.md §9 ("Dynamic dispatch over expression kinds").

use modelc_ast::RestrictionKind;
use modelc_ir::{StandardUnit, VarId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Real,
}

impl ValueType {
    /// real dominates integer dominates boolean (spec.md §4.3, "unify
    /// scalar types").
    pub fn unify(self, other: ValueType) -> ValueType {
        use ValueType::*;
        match (self, other) {
            (Real, _) | (_, Real) => Real,
            (Int, _) | (_, Int) => Int,
            _ => Bool,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// A resolved reference to an identifier chain's target (spec.md §4.3,
/// "Identifier chain").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Local(u32),
    Parameter(VarId),
    Series(VarId),
    StateVar(VarId),
    Connection(modelc_ir::ConnectionId),
    Constant(VarId),
    NoOverride,
    IsAt,
    TimeAttribute(String),
    TimeStepLengthSeconds,
}

/// One node of the typed expression tree. Every variant carries its own
/// payload only — no shared base fields, no inheritance (spec.md §9).
#[derive(Debug, Clone, PartialEq)]
pub enum TypedExpr {
    LiteralBool(bool),
    LiteralInt(i64),
    LiteralReal(f64, StandardUnit),
    Ref {
        binding: Binding,
        ty: ValueType,
        unit: StandardUnit,
        /// The `[connection, kind]` suffix on the source identifier chain,
        /// if any (spec.md §3 "Restrictions") — `None` for an unrestricted
        /// reference.
        restriction: Option<RestrictionKind>,
    },
    Arith {
        op: ArithOp,
        lhs: Box<TypedExpr>,
        rhs: Box<TypedExpr>,
        ty: ValueType,
        unit: StandardUnit,
    },
    Compare {
        op: CompareOp,
        lhs: Box<TypedExpr>,
        rhs: Box<TypedExpr>,
    },
    BoolOp {
        op: BoolOp,
        lhs: Box<TypedExpr>,
        rhs: Box<TypedExpr>,
    },
    Neg(Box<TypedExpr>),
    Not(Box<TypedExpr>),
    /// An implicit or explicit numeric cast, e.g. int -> real.
    Cast { value: Box<TypedExpr>, to: ValueType },
    /// A unit conversion by a precomputed factor, or `None` for an
    /// exact-match no-op (spec.md §4.3 pruning: "short-circuits trivial
    /// conversions").
    Convert {
        value: Box<TypedExpr>,
        factor: Option<f64>,
        offset: Option<f64>,
        target_unit: StandardUnit,
    },
    Block(Vec<TypedExpr>),
    /// `value if cond` chain, `otherwise` is the default branch.
    IfChain {
        branches: Vec<(TypedExpr, TypedExpr)>,
        otherwise: Box<TypedExpr>,
    },
    LocalDecl {
        slot: u32,
        value: Box<TypedExpr>,
    },
    Reassign {
        slot: u32,
        value: Box<TypedExpr>,
    },
    /// A labeled block; referenced by `Iterate`.
    IterateTag {
        label: u32,
        body: Box<TypedExpr>,
    },
    Iterate {
        label: u32,
    },
    Tuple(Vec<TypedExpr>),
    TupleElement {
        tuple: Box<TypedExpr>,
        index: u32,
    },
    /// A directive call already specialized to its kind (`last`, `in_flux`,
    /// `out_flux`, `aggregate`, `conc`, `result`) — resolved, not
    /// re-dispatched at evaluation time.
    Directive(DirectiveExpr),
    /// A user function inlined at this call site (spec.md §9 "Function
    /// inlining").
    Inlined(Box<TypedExpr>),
    /// A no-op left behind by a pruned conversion or statement.
    NoOp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveExpr {
    Last(VarId),
    InFlux {
        connection: modelc_ir::ConnectionId,
        target: VarId,
    },
    OutFlux {
        connection: modelc_ir::ConnectionId,
        source: VarId,
    },
    Aggregate(VarId),
    Result(VarId),
    Conc(VarId),
}

impl TypedExpr {
    pub fn value_type(&self) -> ValueType {
        match self {
            TypedExpr::LiteralBool(_) => ValueType::Bool,
            TypedExpr::LiteralInt(_) => ValueType::Int,
            TypedExpr::LiteralReal(..) => ValueType::Real,
            TypedExpr::Ref { ty, .. } | TypedExpr::Arith { ty, .. } => *ty,
            TypedExpr::Compare { .. } | TypedExpr::BoolOp { .. } | TypedExpr::Not(_) => {
                ValueType::Bool
            }
            TypedExpr::Neg(inner) => inner.value_type(),
            TypedExpr::Cast { to, .. } => *to,
            TypedExpr::Convert { value, .. } => value.value_type(),
            TypedExpr::Block(stmts) => stmts.last().map(TypedExpr::value_type).unwrap_or(ValueType::Bool),
            TypedExpr::IfChain { otherwise, .. } => otherwise.value_type(),
            TypedExpr::LocalDecl { value, .. } | TypedExpr::Reassign { value, .. } => {
                value.value_type()
            }
            TypedExpr::IterateTag { body, .. } => body.value_type(),
            TypedExpr::Iterate { .. } => ValueType::Real,
            TypedExpr::Tuple(_) => ValueType::Real,
            TypedExpr::TupleElement { .. } => ValueType::Real,
            TypedExpr::Directive(_) => ValueType::Real,
            TypedExpr::Inlined(inner) => inner.value_type(),
            TypedExpr::NoOp => ValueType::Real,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_dominates_int_dominates_bool() {
        assert_eq!(ValueType::Real.unify(ValueType::Int), ValueType::Real);
        assert_eq!(ValueType::Int.unify(ValueType::Bool), ValueType::Int);
        assert_eq!(ValueType::Bool.unify(ValueType::Bool), ValueType::Bool);
    }

    #[test]
    fn block_value_type_is_last_statement() {
        let block = TypedExpr::Block(vec![TypedExpr::LiteralInt(1), TypedExpr::LiteralBool(true)]);
        assert_eq!(block.value_type(), ValueType::Bool);
    }
}
