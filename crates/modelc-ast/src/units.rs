//! Declared-form units: `[k g, m -3]` — the bracketed, comma-separated
//! syntax from spec.md §6. Each part is an optional SI prefix, a compound
//! unit symbol (a handle resolved against the unit registry, e.g. `g`, `m`,
//! `N`, `l`, `ton`, `min`), and an optional rational exponent.
//!
//! This is kept separate from the canonical standard form (C1, in
//! `modelc`'s `units` module) so that pretty-printing a unit reproduces what
//! the user wrote (spec.md §8 round-trip law: parse→pretty-print→parse
//! yields the same standard form, which requires keeping the declared form
//! around rather than immediately collapsing to standard form).

use crate::location::SourceLocation;

/// SI magnitude-of-ten prefixes, as they can appear before a unit symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiPrefix {
    Pico,
    Nano,
    Micro,
    Milli,
    Centi,
    Deci,
    None,
    Deca,
    Hecto,
    Kilo,
    Mega,
    Giga,
    Tera,
}

impl SiPrefix {
    /// Magnitude-of-ten exponent contributed by this prefix.
    pub fn magnitude(self) -> i16 {
        match self {
            SiPrefix::Pico => -12,
            SiPrefix::Nano => -9,
            SiPrefix::Micro => -6,
            SiPrefix::Milli => -3,
            SiPrefix::Centi => -2,
            SiPrefix::Deci => -1,
            SiPrefix::None => 0,
            SiPrefix::Deca => 1,
            SiPrefix::Hecto => 2,
            SiPrefix::Kilo => 3,
            SiPrefix::Mega => 6,
            SiPrefix::Giga => 9,
            SiPrefix::Tera => 12,
        }
    }
}

/// A rational exponent, `numerator / denominator`, kept unreduced until the
/// unit algebra reduces it (so `[m 2/4]` round-trips as written until it's
/// actually standardized).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RationalLit {
    pub numerator: i64,
    pub denominator: i64,
}

impl RationalLit {
    pub fn whole(n: i64) -> Self {
        RationalLit {
            numerator: n,
            denominator: 1,
        }
    }
}

/// One comma-separated part of a declared unit, e.g. `k g` or `m -3`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitPartAst {
    pub prefix: SiPrefix,
    /// The compound unit symbol/handle, e.g. "g", "m", "N", "l", "ton", "min".
    pub symbol: String,
    /// Defaults to 1 when omitted in source.
    pub power: RationalLit,
}

/// A full declared unit expression, e.g. `[k g, m -2]`. An empty part list
/// (`[]`) is legal and denotes dimensionless with multiplier 1 (spec.md §8).
#[derive(Debug, Clone, PartialEq)]
pub struct UnitAst {
    pub parts: Vec<UnitPartAst>,
    pub location: SourceLocation,
}

impl UnitAst {
    pub fn dimensionless(location: SourceLocation) -> Self {
        UnitAst {
            parts: Vec::new(),
            location,
        }
    }

    pub fn is_empty_bracket(&self) -> bool {
        self.parts.is_empty()
    }
}
