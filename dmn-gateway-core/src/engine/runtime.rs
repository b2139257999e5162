//! Containers, runtimes and model handles
//!
//! A [`ModelContainer`] is one materialised artifact. Each call to
//! [`ModelContainer::new_runtime`] yields a [`DecisionRuntime`] whose options
//! are fixed before any model is handed out; [`DecisionRuntime::model`] then
//! produces a [`ModelHandle`] that carries those options into evaluation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use super::artifact::{parse_artifact, HitPolicy};
use super::compile::{compile_model, Column, CompiledDecision, CompiledModel, CompiledRule};
use super::loader::{BuildId, LoadError};
use crate::context::EvaluationContext;
use crate::diagnostics::Diagnostic;
use crate::evaluator::EvaluationResult;
use crate::value::Value;

/// Evaluation-time policy flags, applied once per runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Type mismatches on inputs and decision outputs are errors rather
    /// than warnings
    pub strict_type_check: bool,
}

/// A loaded, compiled artifact.
#[derive(Debug)]
pub struct ModelContainer {
    artifact: String,
    build_id: BuildId,
    models: Vec<Arc<CompiledModel>>,
}

impl ModelContainer {
    /// Parse and compile every model in an artifact.
    pub fn from_yaml(artifact: &str, build_id: BuildId, yaml: &str) -> Result<Self, LoadError> {
        let dto = parse_artifact(yaml).map_err(|e| LoadError::Malformed(e.to_string()))?;
        let models = dto
            .models
            .iter()
            .map(|m| compile_model(m).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LoadError::Malformed(e.to_string()))?;

        tracing::debug!(
            artifact,
            build_id = %build_id,
            models = models.len(),
            "Artifact compiled"
        );

        Ok(Self {
            artifact: artifact.to_string(),
            build_id,
            models,
        })
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn build_id(&self) -> &BuildId {
        &self.build_id
    }

    /// Start a fresh runtime over this container's models.
    pub fn new_runtime(&self) -> DecisionRuntime {
        DecisionRuntime {
            build_id: self.build_id.clone(),
            models: self.models.clone(),
            options: RuntimeOptions::default(),
        }
    }
}

pub struct DecisionRuntime {
    build_id: BuildId,
    models: Vec<Arc<CompiledModel>>,
    options: RuntimeOptions,
}

impl DecisionRuntime {
    pub fn with_options(mut self, options: RuntimeOptions) -> Self {
        self.options = options;
        self
    }

    /// Look up a model by namespace and name.
    pub fn model(&self, namespace: &str, name: &str) -> Option<ModelHandle> {
        self.models
            .iter()
            .find(|m| m.namespace == namespace && m.name == name)
            .map(|model| ModelHandle {
                model: Arc::clone(model),
                options: self.options,
                build_id: self.build_id.clone(),
            })
    }
}

/// The evaluation deadline passed before all decisions ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlinePassed;

/// An evaluation-ready model.
///
/// Immutable after construction and evaluated through `&self`, so one
/// handle can serve concurrent evaluations without locking.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    model: Arc<CompiledModel>,
    options: RuntimeOptions,
    build_id: BuildId,
}

impl ModelHandle {
    pub fn name(&self) -> &str {
        &self.model.name
    }

    pub fn build_id(&self) -> &BuildId {
        &self.build_id
    }

    pub fn options(&self) -> RuntimeOptions {
        self.options
    }

    /// Names of every variable this model can produce.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.model.decisions.iter().map(|d| d.name.as_str())
    }

    /// Evaluate every decision against the context.
    ///
    /// A decision that matches no rule leaves its variable unset. Errors are
    /// reported as diagnostics; only a passed deadline aborts evaluation.
    pub fn evaluate(
        &self,
        context: &EvaluationContext,
        deadline: Option<Instant>,
    ) -> Result<EvaluationResult, DeadlinePassed> {
        let strict = self.options.strict_type_check;
        let mut diagnostics = Vec::new();

        for input in &self.model.inputs {
            if let Some(value) = context.get(&input.name) {
                if !input.type_ref.accepts(value) {
                    diagnostics.push(type_mismatch(
                        strict,
                        &input.name,
                        format!(
                            "input expects {} but was given {} ({value})",
                            input.type_ref,
                            value.kind()
                        ),
                    ));
                }
            }
        }

        // Strict mode refuses to run decisions over ill-typed inputs.
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(EvaluationResult::new(BTreeMap::new(), diagnostics));
        }

        let mut bindings: BTreeMap<String, Value> = BTreeMap::new();

        for decision in &self.model.decisions {
            if deadline.is_some_and(|at| Instant::now() >= at) {
                return Err(DeadlinePassed);
            }

            let inputs: Vec<Option<&Value>> = decision
                .columns
                .iter()
                .map(|column| match column {
                    Column::InputData(name) => context.get(name),
                    Column::Decision(name) => bindings.get(name),
                })
                .collect();

            let Some(value) = apply_hit_policy(decision, &inputs, &mut diagnostics) else {
                continue;
            };

            if !decision.type_ref.accepts(&value) {
                diagnostics.push(type_mismatch(
                    strict,
                    &decision.name,
                    format!(
                        "decision declares {} but produced {} ({value})",
                        decision.type_ref,
                        value.kind()
                    ),
                ));
                if strict {
                    continue;
                }
            }

            bindings.insert(decision.name.clone(), value);
        }

        Ok(EvaluationResult::new(bindings, diagnostics))
    }
}

fn apply_hit_policy(
    decision: &CompiledDecision,
    inputs: &[Option<&Value>],
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Value> {
    let matched: Vec<&CompiledRule> = decision
        .rules
        .iter()
        .filter(|rule| {
            rule.tests
                .iter()
                .zip(inputs)
                .all(|(test, input)| test.matches(*input))
        })
        .collect();

    match decision.hit_policy {
        HitPolicy::Collect => Some(Value::List(
            matched.into_iter().map(|r| r.output.clone()).collect(),
        )),
        HitPolicy::First => match matched.first() {
            Some(rule) => Some(rule.output.clone()),
            None => {
                diagnostics.push(no_match(&decision.name));
                None
            }
        },
        HitPolicy::Unique => match matched.as_slice() {
            [] => {
                diagnostics.push(no_match(&decision.name));
                None
            }
            [rule] => Some(rule.output.clone()),
            rules => {
                diagnostics.push(Diagnostic::error(
                    &decision.name,
                    format!("{} rules matched under hit policy UNIQUE", rules.len()),
                ));
                None
            }
        },
    }
}

fn no_match(decision: &str) -> Diagnostic {
    Diagnostic::warning(decision, "no rule matched; variable left unset")
}

fn type_mismatch(strict: bool, variable: &str, message: String) -> Diagnostic {
    if strict {
        Diagnostic::error(variable, message)
    } else {
        Diagnostic::warning(variable, message)
    }
}
