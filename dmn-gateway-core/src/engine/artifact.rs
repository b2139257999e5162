//! Model artifact DTOs
//!
//! The on-disk shape of a packaged decision model. Nothing here is
//! validated beyond what serde enforces; `compile` turns these into an
//! evaluable model and rejects anything inconsistent.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::value::Value;

/// A packaged artifact holding one or more models.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactDto {
    pub models: Vec<ModelDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelDto {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<InputDataDto>,
    pub decisions: Vec<DecisionDto>,
}

/// A variable the caller is expected to bind in the evaluation context.
#[derive(Debug, Clone, Deserialize)]
pub struct InputDataDto {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_ref: TypeRef,
}

/// A decision table producing one output variable.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionDto {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_ref: TypeRef,
    #[serde(default)]
    pub hit_policy: HitPolicy,
    /// Input columns, by variable name (input data or other decisions)
    #[serde(default)]
    pub inputs: Vec<String>,
    pub rules: Vec<RuleDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleDto {
    /// One unary test per input column
    #[serde(default)]
    pub when: Vec<String>,
    pub then: Value,
}

/// How matching rules combine into a decision's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HitPolicy {
    /// At most one rule may match
    #[default]
    Unique,
    /// First matching rule in declaration order wins
    First,
    /// All matching outputs, in rule order, as a list
    Collect,
}

/// Declared type of an input or decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum TypeRef {
    #[default]
    Any,
    String,
    Number,
    Boolean,
    List(Box<TypeRef>),
}

impl TypeRef {
    /// Whether a value conforms to this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeRef::Any, _) => true,
            (TypeRef::String, Value::String(_)) => true,
            (TypeRef::Number, Value::Number(_)) => true,
            (TypeRef::Boolean, Value::Bool(_)) => true,
            (TypeRef::List(item), Value::List(items)) => items.iter().all(|v| item.accepts(v)),
            _ => false,
        }
    }
}

impl FromStr for TypeRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "any" | "Any" => Ok(TypeRef::Any),
            "string" => Ok(TypeRef::String),
            "number" => Ok(TypeRef::Number),
            "boolean" => Ok(TypeRef::Boolean),
            _ => match s.strip_prefix("list<").and_then(|rest| rest.strip_suffix('>')) {
                Some(inner) => Ok(TypeRef::List(Box::new(inner.parse()?))),
                None => Err(format!("unknown type reference '{s}'")),
            },
        }
    }
}

impl TryFrom<String> for TypeRef {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Any => f.write_str("any"),
            TypeRef::String => f.write_str("string"),
            TypeRef::Number => f.write_str("number"),
            TypeRef::Boolean => f.write_str("boolean"),
            TypeRef::List(item) => write!(f, "list<{item}>"),
        }
    }
}

/// Parse an artifact from YAML text.
pub fn parse_artifact(yaml: &str) -> Result<ArtifactDto, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_parse() {
        assert_eq!("string".parse::<TypeRef>().unwrap(), TypeRef::String);
        assert_eq!(
            "list<string>".parse::<TypeRef>().unwrap(),
            TypeRef::List(Box::new(TypeRef::String))
        );
        assert!("date".parse::<TypeRef>().is_err());
    }

    #[test]
    fn test_list_type_checks_elements() {
        let t = TypeRef::List(Box::new(TypeRef::String));
        assert!(t.accepts(&Value::from(vec!["a", "b"])));
        assert!(!t.accepts(&Value::from(vec![Value::from("a"), Value::from(1)])));
        assert!(!t.accepts(&Value::from("a")));
    }

    #[test]
    fn test_parse_artifact_defaults() {
        let yaml = r#"
models:
  - namespace: urn:test
    name: Lights
    inputs:
      - name: Dark
        type: boolean
    decisions:
      - name: Lamp
        inputs: [Dark]
        rules:
          - when: ["true"]
            then: "on"
"#;
        let artifact = parse_artifact(yaml).unwrap();
        let model = &artifact.models[0];
        assert_eq!(model.name, "Lights");
        assert_eq!(model.inputs[0].type_ref, TypeRef::Boolean);
        assert_eq!(model.decisions[0].hit_policy, HitPolicy::Unique);
        assert_eq!(model.decisions[0].type_ref, TypeRef::Any);
        assert_eq!(model.decisions[0].rules[0].then, Value::from("on"));
    }

    #[test]
    fn test_unknown_hit_policy_rejected() {
        let yaml = r#"
models:
  - namespace: urn:test
    name: Broken
    decisions:
      - name: X
        hit_policy: ANY_OF_THEM
        rules: []
"#;
        assert!(parse_artifact(yaml).is_err());
    }
}
