//! Positional parameters given to a script on the command line.

use crate::ast::ParameterRef;
use crate::typing::Type;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: Vec<String>,
}

impl Params {
    pub fn new(values: Vec<String>) -> Params {
        Params { values }
    }

    /// Number of parameters, the value of `$#`.
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Raw value of `$index`, counting from 1. Missing parameters read as `""` when used
    /// as strings and as `"0"` otherwise.
    pub fn get(&self, index: usize, as_string: bool) -> &str {
        match index.checked_sub(1).and_then(|i| self.values.get(i)) {
            Some(value) => value,
            None if as_string => "",
            None => "0",
        }
    }

    /// Numeric value of `$index`, or `None` if the parameter is not a number.
    pub fn get_int(&self, index: usize) -> Option<i64> {
        parse_int(self.get(index, false))
    }

    /// Value of a parameter reference used numerically.
    pub fn int_value(&self, param: ParameterRef) -> Option<i64> {
        match param {
            ParameterRef::Index(index) => self.get_int(index),
            ParameterRef::Count => Some(self.count() as i64),
        }
    }

    /// Type of a parameter reference: `int64` when numeric, a string sized to fit otherwise.
    pub fn type_of(&self, param: ParameterRef) -> Type {
        match param {
            ParameterRef::Count => Type::int64(),
            ParameterRef::Index(index) => {
                let value = self.get(index, false);
                if parse_int(value).is_some() {
                    Type::int64()
                } else {
                    Type::string(value.len() + 1)
                }
            }
        }
    }
}

/// Parses decimal and `0x` hexadecimal integers, with an optional sign.
/// Unsigned values above `i64::MAX` wrap.
pub fn parse_int(value: &str) -> Option<i64> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()?
    } else {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u64>().ok()?
    };
    let magnitude = magnitude as i64;
    Some(if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameters_have_defaults() {
        let params = Params::new(vec!["42".to_string()]);
        assert_eq!(params.get(1, false), "42");
        assert_eq!(params.get(2, false), "0");
        assert_eq!(params.get(2, true), "");
        assert_eq!(params.get(0, true), "");
        assert_eq!(params.get_int(2), Some(0));
    }

    #[test]
    fn parameter_types_follow_values() {
        let params = Params::new(vec!["0x10".to_string(), "hello".to_string()]);
        assert_eq!(params.type_of(ParameterRef::Index(1)), Type::int64());
        assert_eq!(params.type_of(ParameterRef::Index(2)), Type::string(6));
        assert_eq!(params.type_of(ParameterRef::Count), Type::int64());
        assert_eq!(params.int_value(ParameterRef::Count), Some(2));
        assert_eq!(params.int_value(ParameterRef::Index(2)), None);
    }

    #[test]
    fn parses_integers() {
        assert_eq!(parse_int("-5"), Some(-5));
        assert_eq!(parse_int("0xff"), Some(255));
        assert_eq!(parse_int("12a"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("-"), None);
    }
}
