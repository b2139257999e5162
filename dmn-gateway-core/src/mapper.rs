//! Result Mapper
//!
//! Reads a declared subset of output bindings and coerces them into typed
//! fields. Every declared field is checked for presence and shape before a
//! response is assembled, so a response is either complete or not produced.

use std::collections::HashMap;

use crate::error::{ExtractionFailure, GatewayError, Result};
use crate::evaluator::EvaluationResult;
use crate::value::Value;

/// Target type of a response field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    StringList,
    Number,
    Integer,
    Boolean,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::StringList => "list of strings",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
        }
    }
}

/// One row of a response's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputField {
    /// Field name on the typed response
    pub field: &'static str,
    /// Output variable the model produces
    pub variable: &'static str,
    pub kind: FieldKind,
    /// Absence of the binding is an error only when set
    pub required: bool,
}

impl OutputField {
    pub const fn required(field: &'static str, variable: &'static str, kind: FieldKind) -> Self {
        Self {
            field,
            variable,
            kind,
            required: true,
        }
    }

    pub const fn optional(field: &'static str, variable: &'static str, kind: FieldKind) -> Self {
        Self {
            field,
            variable,
            kind,
            required: false,
        }
    }
}

/// A coerced field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    StringList(Vec<String>),
    Number(f64),
    Integer(i64),
    Boolean(bool),
}

/// A typed response that can be assembled from evaluation output.
pub trait FromBindings: Sized {
    /// The declared field table.
    fn output_fields() -> &'static [OutputField];

    fn from_fields(fields: ExtractedFields) -> Result<Self>;
}

/// Validated, coerced outputs keyed by response field name.
#[derive(Debug)]
pub struct ExtractedFields {
    table: &'static [OutputField],
    values: HashMap<&'static str, FieldValue>,
}

/// Each accessor must match the field's declared kind; reading a field as
/// another kind, or reading a field outside the table, is an error rather
/// than an absent value.
impl ExtractedFields {
    pub fn string(&mut self, field: &'static str) -> Result<Option<String>> {
        match self.take(field, FieldKind::String)? {
            Some(FieldValue::String(s)) => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    pub fn string_list(&mut self, field: &'static str) -> Result<Option<Vec<String>>> {
        match self.take(field, FieldKind::StringList)? {
            Some(FieldValue::StringList(items)) => Ok(Some(items)),
            _ => Ok(None),
        }
    }

    pub fn number(&mut self, field: &'static str) -> Result<Option<f64>> {
        match self.take(field, FieldKind::Number)? {
            Some(FieldValue::Number(n)) => Ok(Some(n)),
            _ => Ok(None),
        }
    }

    pub fn integer(&mut self, field: &'static str) -> Result<Option<i64>> {
        match self.take(field, FieldKind::Integer)? {
            Some(FieldValue::Integer(n)) => Ok(Some(n)),
            _ => Ok(None),
        }
    }

    pub fn boolean(&mut self, field: &'static str) -> Result<Option<bool>> {
        match self.take(field, FieldKind::Boolean)? {
            Some(FieldValue::Boolean(b)) => Ok(Some(b)),
            _ => Ok(None),
        }
    }

    pub fn require_string(&mut self, field: &'static str) -> Result<String> {
        let value = self.string(field)?;
        value.ok_or_else(|| self.missing(field))
    }

    pub fn require_string_list(&mut self, field: &'static str) -> Result<Vec<String>> {
        let value = self.string_list(field)?;
        value.ok_or_else(|| self.missing(field))
    }

    pub fn require_number(&mut self, field: &'static str) -> Result<f64> {
        let value = self.number(field)?;
        value.ok_or_else(|| self.missing(field))
    }

    pub fn require_integer(&mut self, field: &'static str) -> Result<i64> {
        let value = self.integer(field)?;
        value.ok_or_else(|| self.missing(field))
    }

    pub fn require_boolean(&mut self, field: &'static str) -> Result<bool> {
        let value = self.boolean(field)?;
        value.ok_or_else(|| self.missing(field))
    }

    fn take(&mut self, field: &'static str, requested: FieldKind) -> Result<Option<FieldValue>> {
        let Some(declared) = self.declared(field) else {
            return Err(GatewayError::FieldExtraction {
                field,
                variable: field,
                failure: ExtractionFailure::Undeclared,
            });
        };
        if declared.kind != requested {
            return Err(GatewayError::FieldExtraction {
                field,
                variable: declared.variable,
                failure: ExtractionFailure::AccessorMismatch {
                    declared: declared.kind.name(),
                    requested: requested.name(),
                },
            });
        }
        Ok(self.values.remove(field))
    }

    fn declared(&self, field: &str) -> Option<OutputField> {
        self.table.iter().find(|f| f.field == field).copied()
    }

    fn missing(&self, field: &'static str) -> GatewayError {
        GatewayError::FieldExtraction {
            field,
            variable: self.declared(field).map_or(field, |f| f.variable),
            failure: ExtractionFailure::Missing,
        }
    }
}

/// Check and coerce every declared output field.
pub fn extract(
    result: &EvaluationResult,
    table: &'static [OutputField],
) -> Result<ExtractedFields> {
    let mut values = HashMap::with_capacity(table.len());

    for output in table {
        let Some(value) = result.get(output.variable) else {
            if output.required {
                return Err(GatewayError::FieldExtraction {
                    field: output.field,
                    variable: output.variable,
                    failure: ExtractionFailure::Missing,
                });
            }
            continue;
        };

        let coerced = coerce(value, output.kind).map_err(|failure| {
            GatewayError::FieldExtraction {
                field: output.field,
                variable: output.variable,
                failure,
            }
        })?;
        values.insert(output.field, coerced);
    }

    Ok(ExtractedFields { table, values })
}

/// Build a typed response from an evaluation result.
pub fn map_result<R: FromBindings>(result: &EvaluationResult) -> Result<R> {
    R::from_fields(extract(result, R::output_fields())?)
}

fn coerce(value: &Value, kind: FieldKind) -> std::result::Result<FieldValue, ExtractionFailure> {
    let wrong_kind = || ExtractionFailure::WrongKind {
        expected: kind.name(),
        found: value.kind(),
    };

    match kind {
        FieldKind::String => value
            .as_str()
            .map(|s| FieldValue::String(s.to_string()))
            .ok_or_else(wrong_kind),
        FieldKind::StringList => {
            let items = value.as_list().ok_or_else(wrong_kind)?;
            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| ExtractionFailure::WrongElementKind {
                            index,
                            expected: "string",
                            found: item.kind(),
                        })
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(FieldValue::StringList)
        }
        FieldKind::Number => value
            .as_f64()
            .map(FieldValue::Number)
            .ok_or_else(wrong_kind),
        FieldKind::Integer => {
            let n = value.as_f64().ok_or_else(wrong_kind)?;
            // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
            if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
                Ok(FieldValue::Integer(n as i64))
            } else {
                Err(ExtractionFailure::NotIntegral(n))
            }
        }
        FieldKind::Boolean => value
            .as_bool()
            .map(FieldValue::Boolean)
            .ok_or_else(wrong_kind),
    }
}
