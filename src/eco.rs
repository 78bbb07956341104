//! Opening-code normalization.
//!
//! The outcome model was fit on a single integer per opening. Codes like
//! "C60" map to `(letter - 'A') * 100 + number`, so each of the 26 letter
//! groups owns a block of one hundred values ("A00" = 0, "C60" = 260).
//! Values that are already integers pass through untouched.

use serde_json::Value;

use crate::error::EcoError;

/// Width of one letter group in numeric ECO space.
pub const GROUP_WIDTH: i64 = 100;

/// Normalize a raw JSON `opening_eco` value.
///
/// Integers pass through with no range check. Strings go through
/// [`code_to_numeric`]. Anything else (floats, booleans, null, arrays,
/// objects) is rejected with [`EcoError::InvalidType`].
pub fn normalize(eco: &Value) -> Result<i64, EcoError> {
    match eco {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Ok(v)
            } else if n.is_u64() {
                Err(EcoError::InvalidFormat(n.to_string()))
            } else {
                Err(EcoError::InvalidType(format!("float {n}")))
            }
        }
        Value::String(s) => code_to_numeric(s),
        Value::Bool(_) => Err(EcoError::InvalidType("boolean".into())),
        Value::Null => Err(EcoError::InvalidType("null".into())),
        Value::Array(_) => Err(EcoError::InvalidType("array".into())),
        Value::Object(_) => Err(EcoError::InvalidType("object".into())),
    }
}

/// Convert a `<letter><digits>` code. The letter is case-insensitive and
/// must be `A`-`Z`; the remainder must be a non-empty run of ASCII digits.
pub fn code_to_numeric(code: &str) -> Result<i64, EcoError> {
    let bad = || EcoError::InvalidFormat(code.to_string());

    let mut chars = code.chars();
    let first = chars.next().ok_or_else(bad)?;
    let letter = first.to_ascii_uppercase();
    if !letter.is_ascii_uppercase() {
        return Err(bad());
    }

    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let number: i64 = digits.parse().map_err(|_| bad())?;

    let group = (letter as u8 - b'A') as i64;
    group
        .checked_mul(GROUP_WIDTH)
        .and_then(|base| base.checked_add(number))
        .ok_or_else(bad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integers_pass_through() {
        for n in [0i64, 7, 260, 499, -3, 123_456] {
            assert_eq!(normalize(&json!(n)), Ok(n));
        }
    }

    #[test]
    fn letter_groups_are_hundreds() {
        assert_eq!(code_to_numeric("A00"), Ok(0));
        assert_eq!(code_to_numeric("B12"), Ok(112));
        assert_eq!(code_to_numeric("C60"), Ok(260));
        assert_eq!(code_to_numeric("E99"), Ok(499));
        assert_eq!(code_to_numeric("Z05"), Ok(2505));
    }

    #[test]
    fn lowercase_letter_is_accepted() {
        assert_eq!(normalize(&json!("c60")), Ok(260));
        assert_eq!(normalize(&json!("a1")), Ok(1));
    }

    #[test]
    fn longer_numbers_are_parsed_whole() {
        assert_eq!(code_to_numeric("D150"), Ok(450));
    }

    #[test]
    fn single_digit_number_is_accepted() {
        assert_eq!(code_to_numeric("C6"), Ok(206));
        assert_eq!(code_to_numeric("C06"), Ok(206));
    }

    #[test]
    fn letter_without_digits_is_invalid() {
        assert_eq!(
            normalize(&json!("C")),
            Err(EcoError::InvalidFormat("C".into()))
        );
    }

    #[test]
    fn malformed_strings_are_invalid() {
        for s in ["", "C6x", "C-5", "C 60", "1C0", "#12", "É12", "60"] {
            assert!(
                matches!(code_to_numeric(s), Err(EcoError::InvalidFormat(_))),
                "{s:?} should be rejected"
            );
        }
    }

    #[test]
    fn overflowing_number_is_invalid() {
        assert!(matches!(
            code_to_numeric("C99999999999999999999"),
            Err(EcoError::InvalidFormat(_))
        ));
    }

    #[test]
    fn unsupported_types_are_rejected() {
        assert!(matches!(normalize(&json!(3.5)), Err(EcoError::InvalidType(_))));
        assert!(matches!(normalize(&json!(true)), Err(EcoError::InvalidType(_))));
        assert!(matches!(normalize(&json!(null)), Err(EcoError::InvalidType(_))));
        assert!(matches!(normalize(&json!(["C60"])), Err(EcoError::InvalidType(_))));
        assert!(matches!(normalize(&json!({"eco": "C60"})), Err(EcoError::InvalidType(_))));
    }
}
