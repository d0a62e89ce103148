//! Simple filter query parsing
//!
//! Grammar: `field <op> value [&& field <op> value ...]`. String and array
//! fields support only `:` (equality, any-of for arrays); numeric fields
//! additionally allow a comparator straight after the colon, as in
//! `points:>=100` or `points:!=3`.

use crate::error::{Result, ShoalError};
use crate::schema::Schema;

/// Comparison operator of one filter clause
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Typed comparand, parsed according to the filtered field's declared type
#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    Str(String),
    Int(i64),
    Float(f64),
}

/// One parsed `field <op> value` clause
#[derive(Clone, Debug, PartialEq)]
pub struct FilterClause {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

/// Parse a simple filter query against a schema
///
/// An empty query parses to no clauses. Unknown fields and operators that a
/// field's type does not support fail with a 400.
pub fn parse_filter_query(raw: &str, schema: &Schema) -> Result<Vec<FilterClause>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let mut clauses = Vec::new();

    for part in raw.split("&&") {
        let part = part.trim();
        let (field_name, rest) = part.split_once(':').ok_or_else(|| {
            ShoalError::BadRequest(format!("Filter clause `{}` must look like `field: value`.", part))
        })?;

        let field_name = field_name.trim();
        let field = schema.search_schema().get(field_name).ok_or_else(|| {
            ShoalError::BadRequest(format!(
                "Could not find a filter field named `{}` in the schema.",
                field_name
            ))
        })?;

        let rest = rest.trim();
        let (op, value_str) = split_operator(rest);

        if field.field_type.is_string_like() || field.field_type.is_array() {
            if op != FilterOp::Eq {
                return Err(ShoalError::BadRequest(format!(
                    "Field `{}` only supports the `:` operator.",
                    field_name
                )));
            }
        }

        let value = if field.field_type.is_string_like() {
            FilterValue::Str(value_str.to_string())
        } else if field.field_type.is_float() {
            FilterValue::Float(value_str.parse::<f64>().map_err(|_| {
                ShoalError::BadRequest(format!(
                    "Value of filter field `{}` must be a number.",
                    field_name
                ))
            })?)
        } else {
            FilterValue::Int(value_str.parse::<i64>().map_err(|_| {
                ShoalError::BadRequest(format!(
                    "Value of filter field `{}` must be an integer.",
                    field_name
                ))
            })?)
        };

        clauses.push(FilterClause {
            field: field_name.to_string(),
            op,
            value,
        });
    }

    Ok(clauses)
}

fn split_operator(rest: &str) -> (FilterOp, &str) {
    for (token, op) in [
        (">=", FilterOp::Ge),
        ("<=", FilterOp::Le),
        ("!=", FilterOp::Ne),
        (">", FilterOp::Gt),
        ("<", FilterOp::Lt),
        ("=", FilterOp::Eq),
    ] {
        if let Some(value) = rest.strip_prefix(token) {
            return (op, value.trim());
        }
    }
    (FilterOp::Eq, rest)
}

impl FilterOp {
    /// Apply this operator to an ordering between value and comparand
    pub fn matches(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            FilterOp::Eq => ordering == Equal,
            FilterOp::Ne => ordering != Equal,
            FilterOp::Lt => ordering == Less,
            FilterOp::Le => ordering != Greater,
            FilterOp::Gt => ordering == Greater,
            FilterOp::Ge => ordering != Less,
        }
    }
}
