//! Compile artifact DTOs into evaluable models
//!
//! Parses every cell, resolves every column reference, and orders decisions
//! so each one runs after the decisions it reads.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

use super::artifact::{DecisionDto, HitPolicy, ModelDto, TypeRef};
use super::unary::{parse_unary_test, UnaryTest};
use crate::value::Value;

/// A model ready for evaluation. Immutable once built.
#[derive(Debug, Clone)]
pub struct CompiledModel {
    pub namespace: String,
    pub name: String,
    pub inputs: Vec<InputData>,
    /// Decisions in dependency order
    pub decisions: Vec<CompiledDecision>,
}

#[derive(Debug, Clone)]
pub struct InputData {
    pub name: String,
    pub type_ref: TypeRef,
}

#[derive(Debug, Clone)]
pub struct CompiledDecision {
    pub name: String,
    pub type_ref: TypeRef,
    pub hit_policy: HitPolicy,
    pub columns: Vec<Column>,
    pub rules: Vec<CompiledRule>,
}

/// Where a decision-table column reads its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    InputData(String),
    Decision(String),
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub tests: Vec<UnaryTest>,
    pub output: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("model '{model}': variable '{variable}' is declared more than once")]
    DuplicateVariable { model: String, variable: String },

    #[error("decision '{decision}': column '{variable}' is neither an input nor a decision")]
    UnknownVariable { decision: String, variable: String },

    #[error("decision '{decision}' rule {rule}: expected {expected} tests, found {found}")]
    RuleArity {
        decision: String,
        rule: usize,
        expected: usize,
        found: usize,
    },

    #[error("decision '{decision}' rule {rule} column {column}: {message}")]
    InvalidTest {
        decision: String,
        rule: usize,
        column: usize,
        message: String,
    },

    #[error("model '{model}': decision '{decision}' depends on itself")]
    Cycle { model: String, decision: String },
}

pub fn compile_model(dto: &ModelDto) -> Result<CompiledModel, CompileError> {
    let mut seen = HashSet::new();
    let names = dto
        .inputs
        .iter()
        .map(|i| i.name.as_str())
        .chain(dto.decisions.iter().map(|d| d.name.as_str()));
    for name in names {
        if !seen.insert(name) {
            return Err(CompileError::DuplicateVariable {
                model: dto.name.clone(),
                variable: name.to_string(),
            });
        }
    }

    let decision_index: HashMap<&str, usize> = dto
        .decisions
        .iter()
        .enumerate()
        .map(|(i, d)| (d.name.as_str(), i))
        .collect();

    let mut compiled = Vec::with_capacity(dto.decisions.len());
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..dto.decisions.len()).map(|i| graph.add_node(i)).collect();

    for (idx, decision) in dto.decisions.iter().enumerate() {
        let columns = resolve_columns(dto, decision, &decision_index)?;
        for column in &columns {
            if let Column::Decision(dep) = column {
                graph.add_edge(nodes[decision_index[dep.as_str()]], nodes[idx], ());
            }
        }
        compiled.push(compile_decision(decision, columns)?);
    }

    let order = toposort(&graph, None).map_err(|cycle| CompileError::Cycle {
        model: dto.name.clone(),
        decision: dto.decisions[graph[cycle.node_id()]].name.clone(),
    })?;

    let mut slots: Vec<Option<CompiledDecision>> = compiled.into_iter().map(Some).collect();
    let decisions = order
        .into_iter()
        .filter_map(|node| slots[graph[node]].take())
        .collect();

    Ok(CompiledModel {
        namespace: dto.namespace.clone(),
        name: dto.name.clone(),
        inputs: dto
            .inputs
            .iter()
            .map(|i| InputData {
                name: i.name.clone(),
                type_ref: i.type_ref.clone(),
            })
            .collect(),
        decisions,
    })
}

fn resolve_columns(
    model: &ModelDto,
    decision: &DecisionDto,
    decision_index: &HashMap<&str, usize>,
) -> Result<Vec<Column>, CompileError> {
    decision
        .inputs
        .iter()
        .map(|variable| {
            if decision_index.contains_key(variable.as_str()) {
                Ok(Column::Decision(variable.clone()))
            } else if model.inputs.iter().any(|i| &i.name == variable) {
                Ok(Column::InputData(variable.clone()))
            } else {
                Err(CompileError::UnknownVariable {
                    decision: decision.name.clone(),
                    variable: variable.clone(),
                })
            }
        })
        .collect()
}

fn compile_decision(
    decision: &DecisionDto,
    columns: Vec<Column>,
) -> Result<CompiledDecision, CompileError> {
    let mut rules = Vec::with_capacity(decision.rules.len());

    // Rules are numbered from 1 in messages, matching how tables are read.
    for (i, rule) in decision.rules.iter().enumerate() {
        let number = i + 1;
        if rule.when.len() != columns.len() {
            return Err(CompileError::RuleArity {
                decision: decision.name.clone(),
                rule: number,
                expected: columns.len(),
                found: rule.when.len(),
            });
        }

        let tests = rule
            .when
            .iter()
            .enumerate()
            .map(|(column, cell)| {
                parse_unary_test(cell).map_err(|message| CompileError::InvalidTest {
                    decision: decision.name.clone(),
                    rule: number,
                    column: column + 1,
                    message,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        rules.push(CompiledRule {
            tests,
            output: rule.then.clone(),
        });
    }

    Ok(CompiledDecision {
        name: decision.name.clone(),
        type_ref: decision.type_ref.clone(),
        hit_policy: decision.hit_policy,
        columns,
        rules,
    })
}
