//! Numeric token decoding.
//!
//! Two grammars live here:
//!
//! - [`parse_value`] for component values, which tolerates unit letters and
//!   resolves a lone `M` heuristically.
//! - [`model_value`] for `.MODEL` parameters, which only accepts a float with
//!   at most one magnitude letter.
use nom::{
    character::complete::one_of,
    combinator::{all_consuming, map, map_res, opt},
    number::complete::recognize_float,
    sequence::tuple,
    IResult,
};

use crate::parse::ValueParseError;

/// Trailing unit letters stripped before suffix lookup: Henry, Farad, Volt,
/// Watt, Ohm, Siemens. `A` is not here, it means atto.
const UNIT_LETTERS: [char; 6] = ['H', 'F', 'V', 'W', 'O', 'S'];

/// Magnitude letters accepted after a `.MODEL` parameter value.
const MODEL_SUFFIXES: &str = "afpnumkgtAFPNUMKGT";

/// A lone `M` below this magnitude is milli, otherwise mega.
const MILLI_MEGA_THRESHOLD: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suffix {
    Tera,
    Giga,
    /// `meg` suffix in spice.
    Mega,
    Kilo,
    /// `m` suffix in spice.
    Milli,
    Micro,
    Nano,
    Pico,
    Femto,
    Atto,
}

impl Suffix {
    pub fn factor(&self) -> f64 {
        match self {
            Suffix::Tera => 1e12,
            Suffix::Giga => 1e9,
            Suffix::Mega => 1e6,
            Suffix::Kilo => 1e3,
            Suffix::Milli => 1e-3,
            Suffix::Micro => 1e-6,
            Suffix::Nano => 1e-9,
            Suffix::Pico => 1e-12,
            Suffix::Femto => 1e-15,
            Suffix::Atto => 1e-18,
        }
    }

    pub fn value(&self, coeff: f64) -> f64 {
        coeff * self.factor()
    }

    /// Unambiguous single letters. `M` is left out on purpose, see
    /// [`Suffix::resolve_m`].
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'T' => Some(Suffix::Tera),
            'G' => Some(Suffix::Giga),
            'K' => Some(Suffix::Kilo),
            'U' => Some(Suffix::Micro),
            'N' => Some(Suffix::Nano),
            'P' => Some(Suffix::Pico),
            'F' => Some(Suffix::Femto),
            'A' => Some(Suffix::Atto),
            _ => None,
        }
    }

    /// `.MODEL` parameters read `m` as milli, always.
    fn from_model_letter(c: char) -> Option<Self> {
        if c.eq_ignore_ascii_case(&'m') {
            Some(Suffix::Milli)
        } else {
            Self::from_letter(c)
        }
    }

    /// 易混淆：`1M` 是 1e-3，`1500M` 是 1.5e9
    pub fn resolve_m(coeff: f64) -> Self {
        if coeff.abs() < MILLI_MEGA_THRESHOLD {
            Suffix::Milli
        } else {
            Suffix::Mega
        }
    }
}

/// A signed float literal, decimal point and exponent optional.
pub(crate) fn float(input: &str) -> IResult<&str, f64> {
    map_res(recognize_float, str::parse::<f64>)(input)
}

/// `.MODEL` parameter value: a float followed by at most one magnitude letter.
///
/// Whatever follows is left unconsumed, so `5meg` reads as `5m`.
pub fn model_value(input: &str) -> IResult<&str, f64> {
    map(
        tuple((float, opt(one_of(MODEL_SUFFIXES)))),
        |(coeff, letter)| match letter.and_then(Suffix::from_model_letter) {
            Some(suffix) => suffix.value(coeff),
            None => coeff,
        },
    )(input)
}

fn literal(token: &str) -> Option<f64> {
    all_consuming(float)(token).ok().map(|(_, value)| value)
}

fn strip_meg(token: &str) -> Option<&str> {
    let split = token.len().checked_sub(3)?;
    match token.get(split..) {
        Some(tail) if tail.eq_ignore_ascii_case("MEG") => Some(&token[..split]),
        _ => None,
    }
}

fn split_last(token: &str) -> Option<(&str, char)> {
    let last = token.chars().last()?;
    Some((&token[..token.len() - last.len_utf8()], last))
}

/// Parse a component value into SI base units.
///
/// - `4.7k` → `4700`
/// - `0.05mH` → `5e-5` (the unit letter goes first, then `m` is milli)
/// - `1MEG` → `1e6`
/// - `10uF` → `1e-5`
/// - empty → `0`
pub fn parse_value(token: &str) -> Result<f64, ValueParseError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    let mut body = trimmed;
    if body.chars().count() > 1 {
        if let Some((head, last)) = split_last(body) {
            if UNIT_LETTERS.contains(&last.to_ascii_uppercase()) {
                body = head;
            }
        }
    }

    scale(body).ok_or_else(|| ValueParseError::new(token))
}

fn scale(body: &str) -> Option<f64> {
    if let Some(head) = strip_meg(body) {
        return literal(head).map(|coeff| Suffix::Mega.value(coeff));
    }

    let (head, last) = split_last(body)?;
    if let Some(suffix) = Suffix::from_letter(last) {
        return literal(head).map(|coeff| suffix.value(coeff));
    }
    if last.eq_ignore_ascii_case(&'m') {
        return literal(head).map(|coeff| Suffix::resolve_m(coeff).value(coeff));
    }

    literal(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        let tolerance = expected.abs() * 1e-12;
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_parse_value_plain() {
        assert_eq!(parse_value("1").unwrap(), 1.);
        assert_eq!(parse_value(".1").unwrap(), 0.1);
        assert_eq!(parse_value("-2.5").unwrap(), -2.5);
        assert_eq!(parse_value("+8").unwrap(), 8.);
        assert_eq!(parse_value("1e-6").unwrap(), 1e-6);
        assert_eq!(parse_value("1.5E3").unwrap(), 1500.);
    }

    #[test]
    fn test_parse_value_suffix() {
        assert_eq!(parse_value("4.7k").unwrap(), 4700.0);
        assert_eq!(parse_value("4.7K").unwrap(), 4700.0);
        assert_close(parse_value("100n").unwrap(), 100e-9);
        assert_close(parse_value("22p").unwrap(), 22e-12);
        assert_close(parse_value("2T").unwrap(), 2e12);
        assert_close(parse_value("3g").unwrap(), 3e9);
        assert_close(parse_value("1.5e3u").unwrap(), 1.5e-3);
    }

    #[test]
    fn test_parse_value_unit_letters() {
        assert_close(parse_value("0.05mH").unwrap(), 5e-5);
        assert_close(parse_value("10uF").unwrap(), 1e-5);
        assert_close(parse_value("100pF").unwrap(), 1e-10);
        assert_eq!(parse_value("12V").unwrap(), 12.0);
        assert_eq!(parse_value("50W").unwrap(), 50.0);
        assert_eq!(parse_value("8O").unwrap(), 8.0);
        assert_eq!(parse_value("2s").unwrap(), 2.0);
    }

    /// 易混淆：F 是法拉，但 fF 里的 f 是 femto
    #[test]
    fn test_parse_value_farad_vs_femto() {
        assert_eq!(parse_value("1F").unwrap(), 1.0);
        assert_close(parse_value("100fF").unwrap(), 100e-15);
    }

    #[test]
    fn test_parse_value_atto_not_ampere() {
        assert_close(parse_value("3A").unwrap(), 3e-18);
    }

    #[test]
    fn test_parse_value_meg() {
        assert_eq!(parse_value("1MEG").unwrap(), 1e6);
        assert_eq!(parse_value("2.2meg").unwrap(), 2.2e6);
        assert_eq!(parse_value("1MegV").unwrap(), 1e6);
    }

    #[test]
    fn test_parse_value_milli_mega_heuristic() {
        assert_eq!(parse_value("1M").unwrap(), 1e-3);
        assert_close(parse_value("999m").unwrap(), 0.999);
        assert_eq!(parse_value("1000M").unwrap(), 1e9);
        assert_eq!(parse_value("1500M").unwrap(), 1.5e9);
        assert_close(parse_value("-5m").unwrap(), -5e-3);
    }

    #[test]
    fn test_parse_value_empty() {
        assert_eq!(parse_value("").unwrap(), 0.0);
        assert_eq!(parse_value("   ").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_value_invalid() {
        assert_eq!(parse_value("abc"), Err(ValueParseError::new("abc")));
        assert_eq!(parse_value("k"), Err(ValueParseError::new("k")));
        assert_eq!(parse_value("F"), Err(ValueParseError::new("F")));
        assert_eq!(parse_value("1e"), Err(ValueParseError::new("1e")));
        assert_eq!(parse_value("2.2kOhm"), Err(ValueParseError::new("2.2kOhm")));
        assert_eq!(parse_value("nan"), Err(ValueParseError::new("nan")));
        assert!(parse_value("SIN(0").is_err());
    }

    #[test]
    fn test_model_value() {
        assert_eq!(model_value("1e-14").unwrap(), ("", 1e-14));
        assert_eq!(model_value("50m").unwrap().1, Suffix::Milli.value(50.));
        assert_eq!(model_value("11.4956P").unwrap().1, Suffix::Pico.value(11.4956));
        assert_eq!(model_value("-0.7").unwrap(), ("", -0.7));
        assert_eq!(model_value("100)").unwrap(), (")", 100.));
    }

    #[test]
    fn test_model_value_no_meg_no_units() {
        // `meg` is read as milli and the rest is left over
        assert_eq!(model_value("5meg").unwrap(), ("eg", Suffix::Milli.value(5.)));
        assert_eq!(model_value("0.7V").unwrap(), ("V", 0.7));
    }

    #[test]
    fn test_model_value_invalid() {
        assert!(model_value("std_logic").is_err());
        assert!(model_value("").is_err());
    }
}
