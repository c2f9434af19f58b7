//! C1 — Unit algebra (spec.md §4.1). Canonicalizes a declared `UnitAst`
//! into a `StandardUnit`. Grounded directly on
//! `original_source/src/units.cpp`'s `Unit_Data::set_standard_form`: an
//! explicit per-symbol table of base and compound units, one branch per
//! unit, rather than a generic algebraic derivation.

use crate::diagnostics::CompileError;
use modelc_ast::{SourceLocation, UnitAst, UnitPartAst};
use modelc_ir::{BaseUnit, Rational, StandardUnit, BASE_UNIT_COUNT};

/// `standardize(unit) -> StandardUnit` (spec.md §4.1). An empty bracket
/// (`[]`) standardizes to dimensionless with multiplier 1.
pub fn standardize(unit: &UnitAst) -> Result<StandardUnit, CompileError> {
    let mut result = StandardUnit::dimensionless();
    for part in &unit.parts {
        let contribution = standardize_part(part, &unit.location)?;
        result.multiplier = result.multiplier * contribution.multiplier;
        result.magnitude = result.magnitude + contribution.magnitude;
        for i in 0..BASE_UNIT_COUNT {
            result.powers[i] = result.powers[i] + contribution.powers[i];
        }
    }
    result.reduce();
    Ok(result)
}

fn power_of(part: &UnitPartAst) -> Rational<i16> {
    Rational::new(part.power.numerator as i16, part.power.denominator as i16)
}

/// One declared part's contribution (already raised to `part.power`, SI
/// prefix included) — mirrors the per-`Declared_Unit_Part` branch in
/// `set_standard_form`.
fn standardize_part(part: &UnitPartAst, location: &SourceLocation) -> Result<StandardUnit, CompileError> {
    let power = power_of(part);
    let prefix_magnitude = Rational::whole(part.prefix.magnitude()) * power;

    let mut u = StandardUnit::dimensionless();
    match part.symbol.as_str() {
        "m" => u.powers[BaseUnit::M as usize] = power,
        "s" => u.powers[BaseUnit::S as usize] = power,
        "g" => u.powers[BaseUnit::G as usize] = power,
        "mol" => u.powers[BaseUnit::Mol as usize] = power,
        "degC" => u.powers[BaseUnit::DegC as usize] = power,
        "deg" => u.powers[BaseUnit::Deg as usize] = power,
        "month" => u.powers[BaseUnit::Month as usize] = power,
        "year" => u.powers[BaseUnit::Year as usize] = power,
        "K" => u.powers[BaseUnit::K as usize] = power,
        "A" => u.powers[BaseUnit::A as usize] = power,
        "eq" => u.powers[BaseUnit::Eq as usize] = power,

        // Newton = (10^3 g) m s^-2
        "N" => {
            u.powers[BaseUnit::G as usize] = power;
            u.powers[BaseUnit::M as usize] = power;
            u.powers[BaseUnit::S as usize] = Rational::whole(-2) * power;
            u.magnitude = Rational::whole(3) * power;
        }
        // Joule = (10^3 g) m^2 s^-2
        "J" => {
            u.powers[BaseUnit::G as usize] = power;
            u.powers[BaseUnit::M as usize] = Rational::whole(2) * power;
            u.powers[BaseUnit::S as usize] = Rational::whole(-2) * power;
            u.magnitude = Rational::whole(3) * power;
        }
        // Watt = (10^3 g) m^2 s^-3
        "W" => {
            u.powers[BaseUnit::G as usize] = power;
            u.powers[BaseUnit::M as usize] = Rational::whole(2) * power;
            u.powers[BaseUnit::S as usize] = Rational::whole(-3) * power;
            u.magnitude = Rational::whole(3) * power;
        }
        // liter = 10^-3 m^3
        "l" => {
            u.powers[BaseUnit::M as usize] = Rational::whole(3) * power;
            u.magnitude = Rational::whole(-3) * power;
        }
        // hectare = (10^2 m)^2
        "ha" => {
            u.powers[BaseUnit::M as usize] = Rational::whole(2) * power;
            u.magnitude = Rational::whole(4) * power;
        }
        // Pascal = (10^3 g) m^-1 s^-2
        "Pa" => {
            u.powers[BaseUnit::G as usize] = power;
            u.powers[BaseUnit::M as usize] = Rational::whole(-1) * power;
            u.powers[BaseUnit::S as usize] = Rational::whole(-2) * power;
            u.magnitude = Rational::whole(3) * power;
        }
        // bar = 10^5 * (10^3 g) m^-1 s^-2
        "bar" => {
            u.powers[BaseUnit::G as usize] = power;
            u.powers[BaseUnit::M as usize] = Rational::whole(-1) * power;
            u.powers[BaseUnit::S as usize] = Rational::whole(-2) * power;
            u.magnitude = Rational::whole(8) * power;
        }
        // Volt = (10^3 g) m^2 s^-3 A^-1
        "V" => {
            u.powers[BaseUnit::G as usize] = power;
            u.powers[BaseUnit::M as usize] = Rational::whole(2) * power;
            u.powers[BaseUnit::S as usize] = Rational::whole(-3) * power;
            u.powers[BaseUnit::A as usize] = Rational::whole(-1) * power;
            u.magnitude = Rational::whole(3) * power;
        }
        // Ohm = (10^3 g) m^2 s^-3 A^-2
        "ohm" => {
            u.powers[BaseUnit::G as usize] = power;
            u.powers[BaseUnit::M as usize] = Rational::whole(2) * power;
            u.powers[BaseUnit::S as usize] = Rational::whole(-3) * power;
            u.powers[BaseUnit::A as usize] = Rational::whole(-2) * power;
            u.magnitude = Rational::whole(3) * power;
        }
        // % = 1/100
        "%" => {
            u.magnitude = Rational::whole(-2) * power;
        }
        // ton = 10^6 g
        "ton" => {
            u.powers[BaseUnit::G as usize] = power;
            u.magnitude = Rational::whole(6) * power;
        }
        // minute/hour/day/week round-trip via an integer multiplier rather
        // than a fractional magnitude-of-ten, so they require an integer
        // power (matching the original's fatal_error on a fractional one).
        "min" => return time_multiple(power, 1, 6, location),
        "hour" => return time_multiple(power, 2, 36, location),
        "day" => return time_multiple(power, 2, 864, location),
        "week" => return time_multiple(power, 2, 6048, location),

        other => {
            return Err(CompileError::model_building(
                location.clone(),
                format!("unknown unit symbol '{other}'"),
            ))
        }
    }
    u.magnitude = u.magnitude + prefix_magnitude;
    Ok(u)
}

fn time_multiple(
    power: Rational<i16>,
    magnitude_per_unit: i16,
    multiplier_base: i64,
    location: &SourceLocation,
) -> Result<StandardUnit, CompileError> {
    if !power.is_integer() {
        return Err(CompileError::model_building(
            location.clone(),
            "minute/hour/day/week units do not support fractional exponents",
        ));
    }
    let mut u = StandardUnit::dimensionless();
    u.powers[BaseUnit::S as usize] = power;
    u.magnitude = Rational::whole(magnitude_per_unit) * power;
    u.multiplier = int_pow(Rational::whole(multiplier_base), power.num);
    Ok(u)
}

fn int_pow(base: Rational<i64>, power: i16) -> Rational<i64> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use modelc_ast::{RationalLit, SiPrefix};

    fn loc() -> SourceLocation {
        SourceLocation::synthesized()
    }

    fn part(symbol: &str, prefix: SiPrefix, power: i64) -> UnitPartAst {
        UnitPartAst {
            prefix,
            symbol: symbol.to_string(),
            power: RationalLit::whole(power),
        }
    }

    #[test]
    fn empty_bracket_is_dimensionless() {
        let unit = UnitAst::dimensionless(loc());
        let std = standardize(&unit).unwrap();
        assert!(std.is_fully_dimensionless());
    }

    #[test]
    fn kilogram_reduces_to_a_gram_atom_with_magnitude_three() {
        let unit = UnitAst {
            parts: vec![part("g", SiPrefix::Kilo, 1)],
            location: loc(),
        };
        let std = standardize(&unit).unwrap();
        assert!(std.is_atom(BaseUnit::G));
        assert_eq!(std.multiplier, Rational::whole(1));
        assert_eq!(std.magnitude, Rational::whole(3));
    }

    #[test]
    fn minute_is_sixty_seconds() {
        let unit = UnitAst {
            parts: vec![part("min", SiPrefix::None, 1)],
            location: loc(),
        };
        let std = standardize(&unit).unwrap();
        let seconds = StandardUnit::atom(BaseUnit::S, 1);
        let factor = std.match_factor(&seconds).unwrap();
        assert!((factor - 60.0).abs() < 1e-9);
    }

    #[test]
    fn week_is_604800_seconds() {
        let unit = UnitAst {
            parts: vec![part("week", SiPrefix::None, 1)],
            location: loc(),
        };
        let std = standardize(&unit).unwrap();
        let seconds = StandardUnit::atom(BaseUnit::S, 1);
        let factor = std.match_factor(&seconds).unwrap();
        assert!((factor - 604_800.0).abs() < 1e-6);
    }

    #[test]
    fn newton_decomposes_into_mass_length_time() {
        let unit = UnitAst {
            parts: vec![part("N", SiPrefix::None, 1)],
            location: loc(),
        };
        let std = standardize(&unit).unwrap();
        assert_eq!(std.powers[BaseUnit::G as usize], Rational::whole(1));
        assert_eq!(std.powers[BaseUnit::M as usize], Rational::whole(1));
        assert_eq!(std.powers[BaseUnit::S as usize], Rational::whole(-2));
    }

    #[test]
    fn fractional_power_on_a_calendar_unit_is_rejected() {
        let unit = UnitAst {
            parts: vec![UnitPartAst {
                prefix: SiPrefix::None,
                symbol: "hour".to_string(),
                power: RationalLit { numerator: 1, denominator: 2 },
            }],
            location: loc(),
        };
        assert!(standardize(&unit).is_err());
    }

    #[test]
    fn unknown_symbol_is_a_compile_error() {
        let unit = UnitAst {
            parts: vec![part("furlong", SiPrefix::None, 1)],
            location: loc(),
        };
        assert!(standardize(&unit).is_err());
    }
}
