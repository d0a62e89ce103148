//! Field type definitions
//!
//! Determines how a field is validated, indexed and queried.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field data type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "string[]")]
    StringArray,
    #[serde(rename = "int32[]")]
    Int32Array,
    #[serde(rename = "int64[]")]
    Int64Array,
    #[serde(rename = "float[]")]
    FloatArray,
}

impl FieldType {
    /// Whether values of this type are tokenized into the search index
    pub fn is_string_like(&self) -> bool {
        matches!(self, FieldType::String | FieldType::StringArray)
    }

    /// Whether this type can back sorting and token ranking
    pub fn is_single_numeric(&self) -> bool {
        matches!(self, FieldType::Int32 | FieldType::Int64 | FieldType::Float)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldType::Int32 | FieldType::Int64 | FieldType::Int32Array | FieldType::Int64Array
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, FieldType::Float | FieldType::FloatArray)
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            FieldType::StringArray
                | FieldType::Int32Array
                | FieldType::Int64Array
                | FieldType::FloatArray
        )
    }

    /// Validate a JSON value against this type
    ///
    /// Returns the requirement description on mismatch; the caller prefixes
    /// the field name.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match self {
            FieldType::String => {
                if !value.is_string() {
                    return Err("must be a string.".to_string());
                }
            }
            FieldType::Int32 => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| "must be an int32.".to_string())?;
                if n > i32::MAX as i64 {
                    return Err("exceeds maximum value of int32.".to_string());
                }
            }
            FieldType::Int64 => {
                if value.as_i64().is_none() {
                    return Err("must be an int64.".to_string());
                }
            }
            FieldType::Float => {
                // integers are allowed to flow into float fields
                if !value.is_number() {
                    return Err("must be a float.".to_string());
                }
            }
            FieldType::StringArray => {
                Self::validate_array(value, "must be a string array.", Value::is_string)?;
            }
            FieldType::Int32Array => {
                Self::validate_array(value, "must be an int32 array.", |v| {
                    v.as_i64().map(|n| n <= i32::MAX as i64).unwrap_or(false)
                })?;
            }
            FieldType::Int64Array => {
                Self::validate_array(value, "must be an int64 array.", |v| v.as_i64().is_some())?;
            }
            FieldType::FloatArray => {
                Self::validate_array(value, "must be a float array.", Value::is_number)?;
            }
        }
        Ok(())
    }

    /// Array validation only inspects the first element; a mixed-type tail
    /// is accepted as-is
    fn validate_array(
        value: &Value,
        requirement: &str,
        element_ok: impl Fn(&Value) -> bool,
    ) -> Result<(), String> {
        let elements = value.as_array().ok_or_else(|| requirement.to_string())?;
        if let Some(first) = elements.first() {
            if !element_ok(first) {
                return Err(requirement.to_string());
            }
        }
        Ok(())
    }
}

/// One declared field of a collection schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub facet: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            facet: false,
        }
    }

    /// Declare a faceted field
    pub fn faceted(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            facet: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_predicates() {
        assert!(FieldType::String.is_string_like());
        assert!(FieldType::StringArray.is_string_like());
        assert!(!FieldType::Int32.is_string_like());

        assert!(FieldType::Int32.is_single_numeric());
        assert!(FieldType::Float.is_single_numeric());
        assert!(!FieldType::Int32Array.is_single_numeric());

        assert!(FieldType::FloatArray.is_array());
        assert!(!FieldType::Float.is_array());
    }

    #[test]
    fn test_validate_string() {
        assert!(FieldType::String.validate(&json!("hello")).is_ok());
        assert!(FieldType::String.validate(&json!(3)).is_err());
    }

    #[test]
    fn test_validate_int32_bounds() {
        assert!(FieldType::Int32.validate(&json!(i32::MAX)).is_ok());
        assert!(FieldType::Int32
            .validate(&json!(i32::MAX as i64 + 1))
            .is_err());
        assert!(FieldType::Int32.validate(&json!(1.5)).is_err());
    }

    #[test]
    fn test_validate_float_accepts_integers() {
        assert!(FieldType::Float.validate(&json!(3)).is_ok());
        assert!(FieldType::Float.validate(&json!(3.25)).is_ok());
        assert!(FieldType::Float.validate(&json!("3.25")).is_err());
    }

    #[test]
    fn test_validate_arrays() {
        assert!(FieldType::StringArray.validate(&json!(["a", "b"])).is_ok());
        assert!(FieldType::StringArray.validate(&json!([2, "a"])).is_err());
        assert!(FieldType::StringArray.validate(&json!("a")).is_err());
        assert!(FieldType::StringArray.validate(&json!([])).is_ok());
        assert!(FieldType::Int32Array.validate(&json!([1, 2])).is_ok());
        assert!(FieldType::Int32Array
            .validate(&json!([i64::MAX, 1]))
            .is_err());
        assert!(FieldType::FloatArray.validate(&json!([1.0, 2])).is_ok());
    }

    #[test]
    fn test_validate_arrays_only_checks_first_element() {
        assert!(FieldType::StringArray.validate(&json!(["a", 2])).is_ok());
        assert!(FieldType::Int32Array
            .validate(&json!([1, i64::MAX]))
            .is_ok());
    }

    #[test]
    fn test_field_serialization() {
        let field = Field::faceted("tags", FieldType::StringArray);
        let json = serde_json::to_string(&field).unwrap();
        assert!(json.contains("\"string[]\""));
        assert!(json.contains("\"facet\":true"));

        let back: Field = serde_json::from_str(&json).unwrap();
        assert_eq!(back, field);
    }
}
