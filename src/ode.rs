//! ODE solver registry (supplemented from `original_source/src/ode_solvers.h`
//! and `.cpp`). The original carries a table of named solver configurations
//! (function pointer, step size, minimum step); here that becomes a small
//! `SolverKind` enum with step-size fields. Only `Euler` is wired up to an
//! actual integrator, enough to make the end-to-end scenarios in spec.md §8
//! runnable in tests without depending on the out-of-scope external
//! integrator kernel. `Rk4` is declared but not implemented, the same
//! richer-enum-than-is-wired-up shape used elsewhere for e.g.
//! `CompressionType` variants that list formats beyond what one pass
//! currently emits.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SolverKind {
    Euler { step_seconds: f64 },
    Rk4 { step_seconds: f64, min_step_seconds: f64 },
}

impl SolverKind {
    pub fn step_seconds(&self) -> f64 {
        match self {
            SolverKind::Euler { step_seconds } => *step_seconds,
            SolverKind::Rk4 { step_seconds, .. } => *step_seconds,
        }
    }
}

/// A single state variable's current value plus its derivative, as laid
/// out in the dense derivative vector `codegen::CodeOp::OdeDerivative`
/// writes into.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OdeState {
    pub position: f64,
    pub derivative: f64,
}

/// Advances every state in `states` by one Euler step:
/// `position += derivative * step_seconds`. The only integrator this crate
/// implements in full — `Rk4` is declared-only (see module docs).
pub fn euler_step(states: &mut [OdeState], step_seconds: f64) {
    for s in states.iter_mut() {
        s.position += s.derivative * step_seconds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euler_step_integrates_a_constant_derivative() {
        let mut states = vec![OdeState { position: 0.0, derivative: 2.0 }];
        euler_step(&mut states, 0.5);
        assert_eq!(states[0].position, 1.0);
    }

    #[test]
    fn step_seconds_reads_through_either_variant() {
        assert_eq!(SolverKind::Euler { step_seconds: 0.1 }.step_seconds(), 0.1);
        assert_eq!(
            SolverKind::Rk4 {
                step_seconds: 0.2,
                min_step_seconds: 0.01
            }
            .step_seconds(),
            0.2
        );
    }
}
