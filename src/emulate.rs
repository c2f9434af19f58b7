//! Reference interpreter over the typed expression tree (supplemented
//! from `original_source/src/emulate.cpp`), used only as a test oracle for
//! the round-trip law in spec.md §8 ("Compile->run->get equals direct
//! emulation of the same typed expression tree"). Not a production
//! execution path — the real one goes through C8 plus the external JIT.

use crate::typed_expr::{ArithOp, BoolOp, CompareOp, TypedExpr};
use modelc_ir::VarId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Real(f64),
}

impl Value {
    pub fn as_real(self) -> f64 {
        match self {
            Value::Bool(b) => b as i64 as f64,
            Value::Int(i) => i as f64,
            Value::Real(r) => r,
        }
    }

    pub fn as_int(self) -> i64 {
        match self {
            Value::Bool(b) => b as i64,
            Value::Int(i) => i,
            Value::Real(r) => r as i64,
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            Value::Bool(b) => b,
            Value::Int(i) => i != 0,
            Value::Real(r) => r != 0.0,
        }
    }
}

/// Current state a `Ref`/`Directive` node resolves against. A thin stand-in
/// for the runtime storage arrays the production path reads through
/// `OffsetExpr` (`crate::codegen`).
#[derive(Debug, Default)]
pub struct Environment {
    pub vars: HashMap<VarId, Value>,
    locals: Vec<Value>,
    labels: HashMap<u32, TypedExpr>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    pub fn with_var(mut self, id: VarId, value: Value) -> Self {
        self.vars.insert(id, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulationError(pub String);

impl std::fmt::Display for EmulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "emulation error: {}", self.0)
    }
}

impl std::error::Error for EmulationError {}

/// Walks `expr` directly, the way `original_source/src/emulate.cpp` walks
/// the AST at runtime instead of through generated code.
pub fn evaluate(env: &mut Environment, expr: &TypedExpr) -> Result<Value, EmulationError> {
    use crate::typed_expr::Binding;
    use TypedExpr::*;

    match expr {
        LiteralBool(b) => Ok(Value::Bool(*b)),
        LiteralInt(i) => Ok(Value::Int(*i)),
        LiteralReal(r, _unit) => Ok(Value::Real(*r)),
        Ref { binding, .. } => match binding {
            Binding::Local(slot) => env
                .locals
                .get(*slot as usize)
                .copied()
                .ok_or_else(|| EmulationError(format!("unbound local slot {slot}"))),
            Binding::Parameter(id) | Binding::Series(id) | Binding::StateVar(id) | Binding::Constant(id) => env
                .vars
                .get(id)
                .copied()
                .ok_or_else(|| EmulationError(format!("no value bound for {id:?}"))),
            Binding::NoOverride => Ok(Value::Bool(false)),
            Binding::IsAt => Ok(Value::Bool(true)),
            Binding::TimeAttribute(_) | Binding::TimeStepLengthSeconds => Ok(Value::Real(0.0)),
            Binding::Connection(_) => Err(EmulationError("connection reference is not a scalar value".into())),
        },
        Arith { op, lhs, rhs, .. } => {
            let l = evaluate(env, lhs)?;
            let r = evaluate(env, rhs)?;
            Ok(eval_arith(*op, l, r))
        }
        Compare { op, lhs, rhs } => {
            let l = evaluate(env, lhs)?.as_real();
            let r = evaluate(env, rhs)?.as_real();
            Ok(Value::Bool(eval_compare(*op, l, r)))
        }
        BoolOp { op, lhs, rhs } => {
            let l = evaluate(env, lhs)?.as_bool();
            let r = evaluate(env, rhs)?.as_bool();
            Ok(Value::Bool(match op {
                BoolOp::And => l && r,
                BoolOp::Or => l || r,
            }))
        }
        Neg(inner) => match evaluate(env, inner)? {
            Value::Int(i) => Ok(Value::Int(-i)),
            other => Ok(Value::Real(-other.as_real())),
        },
        Not(inner) => Ok(Value::Bool(!evaluate(env, inner)?.as_bool())),
        Cast { value, to } => {
            let v = evaluate(env, value)?;
            Ok(match to {
                crate::typed_expr::ValueType::Bool => Value::Bool(v.as_bool()),
                crate::typed_expr::ValueType::Int => Value::Int(v.as_int()),
                crate::typed_expr::ValueType::Real => Value::Real(v.as_real()),
            })
        }
        Convert { value, factor, offset, .. } => {
            let v = evaluate(env, value)?.as_real();
            let scaled = match factor {
                Some(f) => v * f,
                None => v,
            };
            Ok(Value::Real(scaled + offset.unwrap_or(0.0)))
        }
        Block(stmts) => {
            let mut last = Value::Bool(false);
            for s in stmts {
                last = evaluate(env, s)?;
            }
            Ok(last)
        }
        IfChain { branches, otherwise } => {
            for (cond, value) in branches {
                if evaluate(env, cond)?.as_bool() {
                    return evaluate(env, value);
                }
            }
            evaluate(env, otherwise)
        }
        LocalDecl { slot, value } => {
            let v = evaluate(env, value)?;
            if (*slot as usize) == env.locals.len() {
                env.locals.push(v);
            } else {
                env.locals[*slot as usize] = v;
            }
            Ok(v)
        }
        Reassign { slot, value } => {
            let v = evaluate(env, value)?;
            env.locals[*slot as usize] = v;
            Ok(v)
        }
        IterateTag { label, body } => {
            env.labels.insert(*label, (**body).clone());
            evaluate(env, body)
        }
        Iterate { label } => {
            let body = env
                .labels
                .get(label)
                .cloned()
                .ok_or_else(|| EmulationError(format!("no iterate tag {label}")))?;
            evaluate(env, &body)
        }
        Tuple(items) => items
            .last()
            .map(|e| evaluate(env, e))
            .unwrap_or(Ok(Value::Bool(false))),
        TupleElement { tuple, .. } => evaluate(env, tuple),
        Directive(_) => Err(EmulationError(
            "directive nodes require runtime storage context the emulator doesn't model".into(),
        )),
        Inlined(inner) => evaluate(env, inner),
        NoOp => Ok(Value::Bool(false)),
    }
}

fn eval_arith(op: ArithOp, l: Value, r: Value) -> Value {
    if let (Value::Int(a), Value::Int(b)) = (l, r) {
        return match op {
            ArithOp::Add => Value::Int(a + b),
            ArithOp::Sub => Value::Int(a - b),
            ArithOp::Mul => Value::Int(a * b),
            ArithOp::IntDiv => Value::Int(a.div_euclid(b)),
            ArithOp::Mod => Value::Int(a.rem_euclid(b)),
            ArithOp::Div => Value::Real(a as f64 / b as f64),
            ArithOp::Pow => Value::Int(a.pow(b as u32)),
        };
    }
    let a = l.as_real();
    let b = r.as_real();
    Value::Real(match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
        ArithOp::IntDiv => (a / b).trunc(),
        ArithOp::Mod => a.rem_euclid(b),
        ArithOp::Pow => a.powf(b),
    })
}

fn eval_compare(op: CompareOp, a: f64, b: f64) -> bool {
    match op {
        CompareOp::Lt => a < b,
        CompareOp::Gt => a > b,
        CompareOp::Le => a <= b,
        CompareOp::Ge => a >= b,
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelc_ir::StandardUnit;

    #[test]
    fn block_value_is_its_last_statement() {
        let expr = TypedExpr::Block(vec![
            TypedExpr::LiteralInt(1),
            TypedExpr::LiteralReal(2.5, StandardUnit::dimensionless()),
        ]);
        let mut env = Environment::new();
        assert_eq!(evaluate(&mut env, &expr).unwrap(), Value::Real(2.5));
    }

    #[test]
    fn if_chain_picks_first_matching_branch() {
        let expr = TypedExpr::IfChain {
            branches: vec![(TypedExpr::LiteralBool(false), TypedExpr::LiteralInt(1))],
            otherwise: Box::new(TypedExpr::LiteralInt(9)),
        };
        let mut env = Environment::new();
        assert_eq!(evaluate(&mut env, &expr).unwrap(), Value::Int(9));
    }

    #[test]
    fn local_decl_then_reassign_reflects_the_new_value() {
        let decl = TypedExpr::LocalDecl {
            slot: 0,
            value: Box::new(TypedExpr::LiteralInt(1)),
        };
        let reassign = TypedExpr::Reassign {
            slot: 0,
            value: Box::new(TypedExpr::LiteralInt(2)),
        };
        let expr = TypedExpr::Block(vec![decl, reassign]);
        let mut env = Environment::new();
        assert_eq!(evaluate(&mut env, &expr).unwrap(), Value::Int(2));
    }
}
