//! Evaluator
//!
//! One-shot evaluation of a context against a model handle. The context is
//! consumed so it cannot be evaluated twice, and the result is handed back
//! whole: the caller reads it, nothing writes to it again.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::context::EvaluationContext;
use crate::diagnostics::{Diagnostic, Severity};
use crate::engine::ModelHandle;
use crate::error::{GatewayError, Result};
use crate::value::Value;

/// Output bindings and diagnostics from one evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationResult {
    bindings: BTreeMap<String, Value>,
    diagnostics: Vec<Diagnostic>,
}

impl EvaluationResult {
    pub fn new(bindings: BTreeMap<String, Value>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            bindings,
            diagnostics,
        }
    }

    pub fn get(&self, variable: &str) -> Option<&Value> {
        self.bindings.get(variable)
    }

    pub fn bindings(&self) -> &BTreeMap<String, Value> {
        &self.bindings
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Point in time after which evaluation gives up.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    pub at: Instant,
    pub timeout: Duration,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
            timeout,
        }
    }

    pub fn has_passed(&self) -> bool {
        Instant::now() >= self.at
    }
}

/// Evaluate a context exactly once.
///
/// Fails with [`GatewayError::Evaluation`] if the engine reported any error
/// diagnostic; warnings stay in the returned result.
pub fn evaluate(
    handle: &ModelHandle,
    context: EvaluationContext,
    deadline: Option<Deadline>,
) -> Result<EvaluationResult> {
    let result = handle
        .evaluate(&context, deadline.map(|d| d.at))
        .map_err(|_| GatewayError::DeadlineExceeded {
            timeout: deadline.map(|d| d.timeout).unwrap_or_default(),
        })?;

    if result.has_errors() {
        return Err(GatewayError::Evaluation {
            model: handle.name().to_string(),
            diagnostics: result.diagnostics,
        });
    }

    for warning in result.warnings() {
        tracing::warn!(
            model = handle.name(),
            variable = warning.source.as_deref().unwrap_or(""),
            "{}",
            warning.message
        );
    }

    Ok(result)
}
