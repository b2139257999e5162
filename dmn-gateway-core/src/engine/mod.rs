//! Decision-table engine
//!
//! Stands behind the gateway as the black box that loads artifacts,
//! resolves models and evaluates contexts.

pub mod artifact;
pub mod compile;
pub mod loader;
pub mod runtime;
pub mod unary;

pub use artifact::{HitPolicy, TypeRef};
pub use compile::CompileError;
pub use loader::{ArtifactLoader, BuildId, EmbeddedArtifactLoader, FsArtifactLoader, LoadError};
pub use runtime::{DeadlinePassed, DecisionRuntime, ModelContainer, ModelHandle, RuntimeOptions};
