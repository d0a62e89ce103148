//! Schema and field type system
//!
//! A collection's schema is a flat field list projected into three maps:
//! - `search_schema`: every declared field (presence and type validation)
//! - `facet_schema`: fields declared with `facet: true`
//! - `sort_schema`: single-valued numeric fields, usable for sorting

mod field;

pub use field::{Field, FieldType};

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{Result, ShoalError};

/// Validated schema for one collection
#[derive(Clone, Debug)]
pub struct Schema {
    fields: Vec<Field>,
    search_schema: HashMap<String, Field>,
    facet_schema: HashMap<String, Field>,
    sort_schema: HashMap<String, Field>,
    token_ranking_field: Option<String>,
}

impl Schema {
    /// Build a schema from a field list and an optional token ranking field
    ///
    /// The token ranking field must be a declared single-valued numeric field.
    pub fn new(fields: Vec<Field>, token_ranking_field: Option<String>) -> Result<Self> {
        let mut search_schema = HashMap::new();
        let mut facet_schema = HashMap::new();
        let mut sort_schema = HashMap::new();

        for field in &fields {
            search_schema.insert(field.name.clone(), field.clone());

            if field.facet {
                facet_schema.insert(field.name.clone(), field.clone());
            }

            if field.field_type.is_single_numeric() {
                sort_schema.insert(field.name.clone(), field.clone());
            }
        }

        if let Some(trf) = &token_ranking_field {
            match search_schema.get(trf) {
                None => {
                    return Err(ShoalError::BadRequest(format!(
                        "Token ranking field `{}` is not declared in the schema.",
                        trf
                    )));
                }
                Some(field) if !field.field_type.is_single_numeric() => {
                    return Err(ShoalError::BadRequest(format!(
                        "Token ranking field `{}` must be a single-valued numeric field.",
                        trf
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(Self {
            fields,
            search_schema,
            facet_schema,
            sort_schema,
            token_ranking_field,
        })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn search_schema(&self) -> &HashMap<String, Field> {
        &self.search_schema
    }

    pub fn facet_schema(&self) -> &HashMap<String, Field> {
        &self.facet_schema
    }

    pub fn sort_schema(&self) -> &HashMap<String, Field> {
        &self.sort_schema
    }

    pub fn token_ranking_field(&self) -> Option<&str> {
        self.token_ranking_field.as_deref()
    }

    /// Validate a document against the schema
    ///
    /// Checks, in order: the token ranking field (presence, numeric type,
    /// int32/float bounds), every declared field (presence and type), and
    /// every facet field (string or string array, regardless of how it was
    /// declared). Returns the first violation as a 400.
    pub fn validate_document(&self, document: &Map<String, Value>) -> Result<()> {
        if let Some(trf) = &self.token_ranking_field {
            let value = document.get(trf).ok_or_else(|| {
                ShoalError::BadRequest(format!(
                    "Field `{}` has been declared as a token ranking field, \
                     but is not found in the document.",
                    trf
                ))
            })?;

            if !value.is_number() {
                return Err(ShoalError::BadRequest(format!(
                    "Token ranking field `{}` must be a number.",
                    trf
                )));
            }

            if let Some(n) = value.as_i64() {
                if n > i32::MAX as i64 {
                    return Err(ShoalError::BadRequest(format!(
                        "Token ranking field `{}` exceeds maximum value of int32.",
                        trf
                    )));
                }
            } else if let Some(n) = value.as_f64() {
                if n > f32::MAX as f64 {
                    return Err(ShoalError::BadRequest(format!(
                        "Token ranking field `{}` exceeds maximum value of a float.",
                        trf
                    )));
                }
            }
        }

        for (field_name, field) in &self.search_schema {
            let value = document.get(field_name).ok_or_else(|| {
                ShoalError::BadRequest(format!(
                    "Field `{}` has been declared in the schema, \
                     but is not found in the document.",
                    field_name
                ))
            })?;

            field.field_type.validate(value).map_err(|requirement| {
                ShoalError::BadRequest(format!("Field `{}` {}", field_name, requirement))
            })?;
        }

        for (field_name, field) in &self.facet_schema {
            let value = document.get(field_name).ok_or_else(|| {
                ShoalError::BadRequest(format!(
                    "Field `{}` has been declared as a facet field in the schema, \
                     but is not found in the document.",
                    field_name
                ))
            })?;

            let ok = match field.field_type {
                FieldType::String => value.is_string(),
                FieldType::StringArray => value
                    .as_array()
                    .map(|a| a.first().map(Value::is_string).unwrap_or(true))
                    .unwrap_or(false),
                _ => false,
            };

            if !ok {
                return Err(ShoalError::BadRequest(format!(
                    "Facet field `{}` must be a string or a string[].",
                    field_name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn schema() -> Schema {
        Schema::new(
            vec![
                Field::new("title", FieldType::String),
                Field::faceted("tags", FieldType::StringArray),
                Field::new("points", FieldType::Int32),
            ],
            Some("points".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_schema_maps() {
        let schema = schema();
        assert_eq!(schema.search_schema().len(), 3);
        assert_eq!(schema.facet_schema().len(), 1);
        assert_eq!(schema.sort_schema().len(), 1);
        assert!(schema.sort_schema().contains_key("points"));
        assert_eq!(schema.token_ranking_field(), Some("points"));
    }

    #[test]
    fn test_token_ranking_field_must_be_numeric() {
        let result = Schema::new(
            vec![Field::new("title", FieldType::String)],
            Some("title".to_string()),
        );
        assert!(result.is_err());

        let result = Schema::new(vec![], Some("missing".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_document_ok() {
        let schema = schema();
        let document = doc(json!({"title": "a", "tags": ["x"], "points": 10}));
        assert!(schema.validate_document(&document).is_ok());
    }

    #[test]
    fn test_validate_missing_field() {
        let schema = schema();
        let document = doc(json!({"title": "a", "tags": ["x"]}));
        let err = schema.validate_document(&document).unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn test_validate_int32_overflow() {
        let schema = schema();
        let document = doc(json!({"title": "a", "tags": [], "points": 3_000_000_000i64}));
        let err = schema.validate_document(&document).unwrap_err();
        assert_eq!(err.code(), 400);
        assert!(err.to_string().contains("int32"));
    }

    #[test]
    fn test_validate_facet_type() {
        let schema = Schema::new(vec![Field::faceted("tags", FieldType::Int32)], None).unwrap();
        let document = doc(json!({"tags": 3}));
        let err = schema.validate_document(&document).unwrap_err();
        assert!(err.to_string().contains("string or a string[]"));
    }

    #[test]
    fn test_validate_token_ranking_field_type() {
        let schema = schema();
        let document = doc(json!({"title": "a", "tags": [], "points": "many"}));
        let err = schema.validate_document(&document).unwrap_err();
        assert!(err.to_string().contains("must be a number"));
    }
}
