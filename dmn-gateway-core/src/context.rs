//! Context Builder
//!
//! Maps a typed request onto the generic variable bindings the engine reads.
//! The mapping is a declared table of [`InputField`]s owned by the request
//! type, so renaming a model variable touches the table and nothing else.

use std::collections::BTreeMap;

use crate::value::{Value, ValueKind};

/// One row of a request's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputField {
    /// Field name on the typed request
    pub field: &'static str,
    /// Variable name the model declares
    pub variable: &'static str,
    pub kind: ValueKind,
}

impl InputField {
    pub const fn new(field: &'static str, variable: &'static str, kind: ValueKind) -> Self {
        Self {
            field,
            variable,
            kind,
        }
    }
}

/// A typed request that can be turned into an evaluation context.
pub trait IntoContext {
    /// The declared field table.
    fn input_fields() -> &'static [InputField];

    /// Current value of a declared field; `None` for an unset optional field.
    fn field_value(&self, field: &str) -> Option<Value>;
}

/// Variable bindings for exactly one evaluation.
///
/// Built fresh per request and moved into the evaluation, never shared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationContext {
    bindings: BTreeMap<String, Value>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, variable: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(variable.into(), value.into());
    }

    pub fn get(&self, variable: &str) -> Option<&Value> {
        self.bindings.get(variable)
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.bindings.contains_key(variable)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Build the evaluation context for a request.
///
/// Total over the declared table: unset optional fields become absent keys,
/// never null values.
pub fn build_context<R: IntoContext>(request: &R) -> EvaluationContext {
    let mut context = EvaluationContext::new();
    for input in R::input_fields() {
        if let Some(value) = request.field_value(input.field) {
            debug_assert_eq!(
                value.kind(),
                input.kind,
                "field table for '{}' disagrees with its value",
                input.field
            );
            context.set(input.variable, value);
        }
    }
    context
}
