//! # modelc-ir — shared intermediate representation
//!
//! Types shared by every later compiler stage (C2 through C8 in `spec.md`):
//! entity/variable/instruction identifiers, locations and restrictions, the
//! standard-form unit representation, state variables, instructions, and
//! the grouped-topological-sort output. None of these types know how to
//! *produce* themselves from source — that's `modelc`'s job — they are the
//! nouns the passes operate on, the same separation the teacher draws
//! between its `ir` crate (node shapes) and its `ir_builder`/`optimizer`
//! crates (the passes that build and transform them).

pub mod entity;
pub mod ids;
pub mod instruction;
pub mod location;
pub mod rational;
pub mod scope;
pub mod state_var;
pub mod unit;

pub use entity::Entity;
pub use ids::{ConnectionId, EntityId, GroupId, IndexSetId, InstructionId, ScopeId, SolverId, VarId};
pub use instruction::{Instruction, InstructionKind};
pub use location::{Restriction, RestrictionKind, VarLocation};
pub use rational::Rational;
pub use scope::Scope;
pub use state_var::{StateVar, StateVarKind};
pub use unit::{BaseUnit, StandardUnit, UnitData, BASE_UNIT_COUNT};
