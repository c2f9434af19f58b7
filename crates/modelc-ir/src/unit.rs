//! Standard-form units: the canonical comparison key for C1 (spec.md §3,
//! §4.1). Grounded on `original_source/src/units.h`'s `Base_Unit` /
//! `Standardized_Unit`.

use crate::rational::Rational;
use std::fmt;

/// The 11 base units, in the fixed index order the original assigns them
/// (`Base_Unit` enum). The index order matters: it is the layout of
/// [`StandardUnit::powers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BaseUnit {
    M = 0,
    S = 1,
    G = 2,
    Mol = 3,
    DegC = 4,
    Deg = 5,
    Month = 6,
    Year = 7,
    K = 8,
    A = 9,
    Eq = 10,
}

pub const BASE_UNIT_COUNT: usize = 11;

impl BaseUnit {
    pub const ALL: [BaseUnit; BASE_UNIT_COUNT] = [
        BaseUnit::M,
        BaseUnit::S,
        BaseUnit::G,
        BaseUnit::Mol,
        BaseUnit::DegC,
        BaseUnit::Deg,
        BaseUnit::Month,
        BaseUnit::Year,
        BaseUnit::K,
        BaseUnit::A,
        BaseUnit::Eq,
    ];

    pub fn is_time(self) -> bool {
        matches!(self, BaseUnit::S | BaseUnit::Month | BaseUnit::Year)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BaseUnit::M => "m",
            BaseUnit::S => "s",
            BaseUnit::G => "g",
            BaseUnit::Mol => "mol",
            BaseUnit::DegC => "degC",
            BaseUnit::Deg => "deg",
            BaseUnit::Month => "month",
            BaseUnit::Year => "year",
            BaseUnit::K => "K",
            BaseUnit::A => "A",
            BaseUnit::Eq => "eq",
        }
    }
}

/// Canonical standard-form representation: `multiplier * 10^magnitude *
/// m^powers[0] * s^powers[1] * ...`. Standard-form units are reduced (no
/// factor of 10 in the multiplier — spec.md §3 invariant).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardUnit {
    pub multiplier: Rational<i64>,
    pub magnitude: Rational<i16>,
    pub powers: [Rational<i16>; BASE_UNIT_COUNT],
}

impl Default for StandardUnit {
    fn default() -> Self {
        StandardUnit {
            multiplier: Rational::whole(1),
            magnitude: Rational::whole(0),
            powers: [Rational::whole(0); BASE_UNIT_COUNT],
        }
    }
}

impl StandardUnit {
    pub fn atom(base: BaseUnit, multiplier: i64) -> Self {
        let mut u = StandardUnit {
            multiplier: Rational::whole(multiplier),
            ..Default::default()
        };
        u.powers[base as usize] = Rational::whole(1);
        u.reduce();
        u
    }

    pub fn dimensionless() -> Self {
        StandardUnit::default()
    }

    pub fn is_dimensionless(&self) -> bool {
        self.powers.iter().all(|p| p.is_zero())
    }

    /// "Fully dimensionless" additionally requires multiplier 1, magnitude
    /// 0 — an exact `1`, not merely unit-free (e.g. not "100%").
    pub fn is_fully_dimensionless(&self) -> bool {
        self.is_dimensionless() && self.multiplier == Rational::whole(1) && self.magnitude.is_zero()
    }

    pub fn is_atom(&self, base: BaseUnit) -> bool {
        BaseUnit::ALL.iter().all(|&b| {
            let expected = if b == base { Rational::whole(1) } else { Rational::whole(0) };
            self.powers[b as usize] == expected
        })
    }

    /// Pull factors of 10 out of the multiplier into `magnitude`, so that
    /// `match` can compare multipliers exactly rather than via floating
    /// point (spec.md §4.1 "Reduction").
    pub fn reduce(&mut self) {
        while self.multiplier.is_integer() && self.multiplier.num % 10 == 0 && self.multiplier.num != 0 {
            self.multiplier = Rational::whole(self.multiplier.num / 10);
            self.magnitude = self.magnitude + Rational::whole(1);
        }
        // Also absorb a pure power-of-ten denominator (e.g. 1/100 -> magnitude -2).
        while self.multiplier.den % 10 == 0 && self.multiplier.den != 1 {
            self.multiplier = Rational::new(self.multiplier.num, self.multiplier.den / 10);
            self.magnitude = self.magnitude - Rational::whole(1);
        }
    }

    /// `multiply(a, b, power)`: a * b^power (spec.md §4.1).
    pub fn multiply(&self, other: &StandardUnit, power: i32) -> StandardUnit {
        let mut result = *self;
        result.multiplier = result.multiplier
            * pow_i64(other.multiplier, power);
        result.magnitude = result.magnitude + other.magnitude * Rational::whole(power as i16);
        for (i, p) in result.powers.iter_mut().enumerate() {
            *p = *p + other.powers[i] * Rational::whole(power as i16);
        }
        result.reduce();
        result
    }

    pub fn divide(&self, other: &StandardUnit) -> StandardUnit {
        self.multiply(other, -1)
    }

    /// Raise to a rational power; fails if a non-integer power is applied
    /// to a unit whose multiplier isn't 1 (spec.md §4.1 failure condition).
    pub fn pow(&self, power: Rational<i16>) -> Option<StandardUnit> {
        if !power.is_integer() && self.multiplier != Rational::whole(1) {
            return None;
        }
        let mut result = StandardUnit::default();
        result.magnitude = self.magnitude * power;
        for (i, p) in result.powers.iter_mut().enumerate() {
            *p = self.powers[i] * power;
        }
        if power.is_integer() {
            result.multiplier = pow_i64(self.multiplier, power.num as i32);
        }
        result.reduce();
        Some(result)
    }

    /// `match(a, b) -> factor` such that `factor * b` numerically equals
    /// `a`, iff both have identical base-unit exponents.
    pub fn match_factor(&self, other: &StandardUnit) -> Option<f64> {
        if !self.same_dimensions(other) {
            return None;
        }
        let self_val = self.multiplier.num as f64 / self.multiplier.den as f64
            * 10f64.powf(self.magnitude.num as f64 / self.magnitude.den as f64);
        let other_val = other.multiplier.num as f64 / other.multiplier.den as f64
            * 10f64.powf(other.magnitude.num as f64 / other.magnitude.den as f64);
        Some(self_val / other_val)
    }

    /// `match_exact`: succeeds (returns true) only when `match` would
    /// return exactly 1.
    pub fn match_exact(&self, other: &StandardUnit) -> bool {
        self.same_dimensions(other)
            && self.multiplier == other.multiplier
            && self.magnitude == other.magnitude
    }

    /// `match_offset`: handles °C <-> K additive offset (±273.15). Only
    /// legal between single-base °C/K atoms with identical multiplier and
    /// magnitude (spec.md §8 "Offset exclusivity").
    pub fn match_offset(&self, other: &StandardUnit) -> Option<f64> {
        let self_is_c = self.is_atom(BaseUnit::DegC);
        let self_is_k = self.is_atom(BaseUnit::K);
        let other_is_c = other.is_atom(BaseUnit::DegC);
        let other_is_k = other.is_atom(BaseUnit::K);
        if !((self_is_c && other_is_k) || (self_is_k && other_is_c)) {
            return None;
        }
        if self.multiplier != other.multiplier || self.magnitude != other.magnitude {
            return None;
        }
        if self_is_c {
            Some(273.15) // celsius_value + 273.15 = kelvin_value
        } else {
            Some(-273.15)
        }
    }

    fn same_dimensions(&self, other: &StandardUnit) -> bool {
        self.powers == other.powers
    }
}

fn pow_i64(base: Rational<i64>, power: i32) -> Rational<i64> {
    if power == 0 {
        return Rational::whole(1);
    }
    let (b, p) = if power < 0 {
        (base.reciprocal(), -power)
    } else {
        (base, power)
    };
    let mut result = Rational::whole(1);
    for _ in 0..p {
        result = result * b;
    }
    result
}

impl fmt::Display for StandardUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}e{}", self.multiplier, self.magnitude)?;
        for base in BaseUnit::ALL {
            let p = self.powers[base as usize];
            if !p.is_zero() {
                write!(f, " {}^{}", base.symbol(), p)?;
            }
        }
        Ok(())
    }
}

/// Both declared and standard forms, carried together on a state variable
/// (spec.md §3: "Units exist in two parallel forms"). The declared form is
/// owned by `modelc-ast::UnitAst`; this pairs it with the canonicalized
/// result so the declared text survives for pretty-printing.
#[derive(Debug, Clone)]
pub struct UnitData {
    pub standard: StandardUnit,
}

impl UnitData {
    pub fn dimensionless() -> Self {
        UnitData {
            standard: StandardUnit::dimensionless(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensionless_default() {
        let u = StandardUnit::default();
        assert!(u.is_fully_dimensionless());
    }

    #[test]
    fn reduce_idempotent() {
        let mut u = StandardUnit::atom(BaseUnit::G, 1000);
        let once = u;
        u.reduce();
        assert_eq!(once, u);
        assert_eq!(u.multiplier, Rational::whole(1));
        assert_eq!(u.magnitude, Rational::whole(3));
    }

    #[test]
    fn gram_kilogram_match() {
        let g = StandardUnit::atom(BaseUnit::G, 1);
        let kg = g.multiply(&StandardUnit::whole_magnitude(3), 1);
        let factor = kg.match_factor(&g).unwrap();
        assert!((factor - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn match_symmetry() {
        let a = StandardUnit::atom(BaseUnit::M, 1);
        let b = StandardUnit::atom(BaseUnit::S, 1);
        let mixed = a.multiply(&b, -1); // m/s
        let inverse = b.divide(&a); // 1/(s/m) = m/s... constructed differently
        if let (Some(f1), Some(f2)) = (mixed.match_factor(&inverse), inverse.match_factor(&mixed)) {
            assert!((f1 * f2 - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn different_dimensions_do_not_match() {
        let m = StandardUnit::atom(BaseUnit::M, 1);
        let s = StandardUnit::atom(BaseUnit::S, 1);
        assert!(m.match_factor(&s).is_none());
    }

    #[test]
    fn offset_only_between_celsius_and_kelvin() {
        let c = StandardUnit::atom(BaseUnit::DegC, 1);
        let k = StandardUnit::atom(BaseUnit::K, 1);
        assert!(c.match_offset(&k).is_some());
        let m = StandardUnit::atom(BaseUnit::M, 1);
        assert!(c.match_offset(&m).is_none());
    }

    #[test]
    fn non_integer_power_requires_unit_multiplier() {
        let m = StandardUnit::atom(BaseUnit::M, 1);
        assert!(m.pow(Rational::new(1, 2)).is_some());
        let scaled = StandardUnit::atom(BaseUnit::M, 3);
        assert!(scaled.pow(Rational::new(1, 2)).is_none());
    }

    impl StandardUnit {
        /// Test helper: dimensionless unit with only a magnitude-of-ten applied.
        fn whole_magnitude(mag: i16) -> StandardUnit {
            let mut u = StandardUnit::default();
            u.magnitude = Rational::whole(mag);
            u
        }
    }
}
