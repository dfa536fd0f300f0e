//! Query-parameter and form-field values.
//!
//! # Design
//! A query entry or form field is always one of a small set of scalars. A
//! closed sum keeps the stringified form (`Display`) and the JSON form
//! (`to_json`) explicit, and makes "this value cannot be carried as JSON" a
//! checkable condition instead of a silent null.

use std::fmt;

use crate::error::EncodeError;

/// A single query-parameter or form-field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    /// JSON representation of the value. Fails for values JSON cannot carry,
    /// currently non-finite floats; `field` names the owning key so the error
    /// points at the offending entry.
    pub fn to_json(&self, field: &str) -> Result<serde_json::Value, EncodeError> {
        match self {
            Scalar::Str(s) => Ok(serde_json::Value::String(s.clone())),
            Scalar::Int(n) => Ok(serde_json::Value::from(*n)),
            Scalar::Float(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .ok_or_else(|| EncodeError::UnrepresentableJson {
                    field: field.to_string(),
                }),
            Scalar::Bool(b) => Ok(serde_json::Value::from(*b)),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Scalar {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Scalar {
        Scalar::Str(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Scalar {
        Scalar::Int(i64::from(value))
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Scalar {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Scalar {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Scalar {
        Scalar::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_stringification() {
        assert_eq!(Scalar::from("b c").to_string(), "b c");
        assert_eq!(Scalar::from(42i64).to_string(), "42");
        assert_eq!(Scalar::from(1.5).to_string(), "1.5");
        assert_eq!(Scalar::from(true).to_string(), "true");
    }

    #[test]
    fn finite_values_convert_to_json() {
        assert_eq!(
            Scalar::from("x").to_json("k").unwrap(),
            serde_json::Value::String("x".to_string())
        );
        assert_eq!(Scalar::from(7i64).to_json("k").unwrap(), serde_json::json!(7));
        assert_eq!(Scalar::from(false).to_json("k").unwrap(), serde_json::json!(false));
    }

    #[test]
    fn non_finite_floats_fail_with_the_field_name() {
        let error = Scalar::Float(f64::NAN).to_json("ratio").unwrap_err();
        assert_eq!(
            error,
            EncodeError::UnrepresentableJson {
                field: "ratio".to_string()
            }
        );

        assert!(Scalar::Float(f64::INFINITY).to_json("x").is_err());
    }
}
