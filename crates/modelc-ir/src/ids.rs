//! Every cross-reference inside the compiler is an id into an arena vector,
//! never a pointer or reference — see DESIGN.md ("Cyclic graph of state
//! variables"). A plain `usize`-wrapping newtype per id kind catches
//! accidentally mixing, say, a `VarId` and an `IndexSetId` at compile time.

use std::fmt;

macro_rules! newtype_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                $name(v as u32)
            }
        }
    };
}

newtype_id!(EntityId);
newtype_id!(VarId);
newtype_id!(InstructionId);
newtype_id!(GroupId);
newtype_id!(IndexSetId);
newtype_id!(ConnectionId);
newtype_id!(SolverId);
newtype_id!(ScopeId);
