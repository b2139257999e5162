//! DMN Gateway Core - typed evaluation over a decision-table engine
//!
//! The gateway sits between a strongly-typed RPC surface and an engine that
//! only understands dynamically typed variable bindings.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Typed request (IntoContext)                              │
//! └──────────────────────────────────────────────────────────┘
//!                 │ build_context (declared field table)
//!                 ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  EvaluationContext        ModelResolver ─► ModelHandle    │
//! │                           (per-call or cached)            │
//! └──────────────────────────────────────────────────────────┘
//!                 │ evaluator::evaluate (one-shot)
//!                 ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  EvaluationResult (bindings + diagnostics)                │
//! └──────────────────────────────────────────────────────────┘
//!                 │ mapper::map_result (presence + type checks)
//!                 ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  Typed response (FromBindings)                            │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use dmn_gateway_core::{DecisionGateway, EmbeddedArtifactLoader, HandlePolicy,
//!     ModelIdentifier, ModelResolver, RuntimeOptions};
//!
//! let loader = EmbeddedArtifactLoader::new().with_artifact("dinner.yaml", DINNER_YAML);
//! let resolver = ModelResolver::new(
//!     Arc::new(loader),
//!     HandlePolicy::PerCall,
//!     RuntimeOptions { strict_type_check: true },
//! );
//! let gateway = DecisionGateway::new(
//!     Arc::new(resolver),
//!     ModelIdentifier::new(NAMESPACE, "Dinner", "dinner.yaml"),
//! );
//! let outcome: Outcome<DinnerOutput> = gateway.process(&input).await?;
//! ```

pub mod context;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod gateway;
pub mod mapper;
pub mod resolver;
pub mod value;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use context::{build_context, EvaluationContext, InputField, IntoContext};
pub use diagnostics::{Diagnostic, Severity};
pub use engine::{
    ArtifactLoader, BuildId, EmbeddedArtifactLoader, FsArtifactLoader, ModelHandle,
    RuntimeOptions,
};
pub use error::{ExtractionFailure, GatewayError, Result};
pub use evaluator::{Deadline, EvaluationResult};
pub use gateway::{DecisionGateway, Outcome};
pub use mapper::{map_result, ExtractedFields, FieldKind, FromBindings, OutputField};
pub use resolver::{HandlePolicy, ModelIdentifier, ModelResolver};
pub use value::{Value, ValueKind};
