//! Error taxonomy for the evaluation gateway

use std::time::Duration;

use crate::diagnostics::Diagnostic;
use crate::value::ValueKind;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Everything that can go wrong between a typed request and a typed response.
///
/// None of these are retried: re-evaluating the same input against a
/// read-only model gives the same answer.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("model '{name}' (namespace '{namespace}') not found in artifact '{artifact}'")]
    ModelNotFound {
        namespace: String,
        name: String,
        artifact: String,
    },

    #[error("artifact '{artifact}' could not be loaded: {reason}")]
    ModelLoad { artifact: String, reason: String },

    #[error("evaluation of model '{model}' failed: {}", summarize(.diagnostics))]
    Evaluation {
        model: String,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("output field '{field}' (variable '{variable}'): {failure}")]
    FieldExtraction {
        field: &'static str,
        variable: &'static str,
        failure: ExtractionFailure,
    },

    #[error("evaluation did not finish within {timeout:?}")]
    DeadlineExceeded { timeout: Duration },

    #[error("evaluation task failed: {0}")]
    Join(String),
}

/// Why a declared output could not be read from the evaluation result
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionFailure {
    #[error("required binding is absent")]
    Missing,
    #[error("expected {expected}, found {found}")]
    WrongKind {
        expected: &'static str,
        found: ValueKind,
    },
    #[error("list element {index}: expected {expected}, found {found}")]
    WrongElementKind {
        index: usize,
        expected: &'static str,
        found: ValueKind,
    },
    #[error("number {0} is not representable as an integer")]
    NotIntegral(f64),
    #[error("field is declared as {declared} but was read as {requested}")]
    AccessorMismatch {
        declared: &'static str,
        requested: &'static str,
    },
    #[error("field is not in the output table")]
    Undeclared,
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
