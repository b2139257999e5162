//! Model Resolver
//!
//! Turns a [`ModelIdentifier`] into an evaluation-ready [`ModelHandle`].
//!
//! Two handle policies are supported:
//!
//! - [`HandlePolicy::PerCall`] loads the artifact and builds a fresh runtime
//!   on every call. Nothing is shared; every call pays the load cost.
//! - [`HandlePolicy::Cached`] keeps one handle per identifier and hands out
//!   shared references. This relies on `ModelHandle` being immutable and
//!   `Sync`; evaluation never takes a lock.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::engine::{ArtifactLoader, BuildId, LoadError, ModelHandle, RuntimeOptions};
use crate::error::{GatewayError, Result};

/// Locates exactly one model inside one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelIdentifier {
    namespace: String,
    name: String,
    artifact: String,
}

impl ModelIdentifier {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        artifact: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            artifact: artifact.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{} ({})", self.namespace, self.name, self.artifact)
    }
}

/// Whether handles are rebuilt per call or shared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlePolicy {
    #[default]
    PerCall,
    Cached,
}

pub struct ModelResolver {
    loader: Arc<dyn ArtifactLoader>,
    policy: HandlePolicy,
    options: RuntimeOptions,
    cache: RwLock<HashMap<ModelIdentifier, Arc<ModelHandle>>>,
}

impl ModelResolver {
    pub fn new(
        loader: Arc<dyn ArtifactLoader>,
        policy: HandlePolicy,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            loader,
            policy,
            options,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> HandlePolicy {
        self.policy
    }

    /// Resolve a handle according to the configured policy.
    pub fn resolve(&self, id: &ModelIdentifier) -> Result<Arc<ModelHandle>> {
        match self.policy {
            HandlePolicy::PerCall => self.instantiate(id).map(Arc::new),
            HandlePolicy::Cached => {
                // Cached entries are immutable, so a poisoned lock still holds
                // valid handles.
                if let Some(handle) = self
                    .cache
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(id)
                {
                    return Ok(Arc::clone(handle));
                }

                let handle = Arc::new(self.instantiate(id)?);
                let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
                Ok(Arc::clone(cache.entry(id.clone()).or_insert(handle)))
            }
        }
    }

    fn instantiate(&self, id: &ModelIdentifier) -> Result<ModelHandle> {
        let build_id = BuildId::generate();
        let container = self
            .loader
            .load(id.artifact(), build_id)
            .map_err(|e| match e {
                LoadError::NotFound => not_found(id),
                LoadError::Malformed(reason) => GatewayError::ModelLoad {
                    artifact: id.artifact().to_string(),
                    reason,
                },
            })?;

        let handle = container
            .new_runtime()
            .with_options(self.options)
            .model(id.namespace(), id.name())
            .ok_or_else(|| not_found(id))?;

        tracing::debug!(
            model = %id,
            build_id = %handle.build_id(),
            policy = ?self.policy,
            "Model resolved"
        );

        Ok(handle)
    }
}

fn not_found(id: &ModelIdentifier) -> GatewayError {
    GatewayError::ModelNotFound {
        namespace: id.namespace().to_string(),
        name: id.name().to_string(),
        artifact: id.artifact().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EmbeddedArtifactLoader;
    use crate::test_support::{PARTY_ARTIFACT, PARTY_NAME, PARTY_NAMESPACE};

    fn resolver(policy: HandlePolicy) -> ModelResolver {
        let loader = EmbeddedArtifactLoader::new()
            .with_artifact("party.yaml", PARTY_ARTIFACT)
            .with_artifact("broken.yaml", "models: 42");
        ModelResolver::new(
            Arc::new(loader),
            policy,
            RuntimeOptions {
                strict_type_check: true,
            },
        )
    }

    fn party_id() -> ModelIdentifier {
        ModelIdentifier::new(PARTY_NAMESPACE, PARTY_NAME, "party.yaml")
    }

    #[test]
    fn test_per_call_builds_fresh_handles() {
        let resolver = resolver(HandlePolicy::PerCall);
        let a = resolver.resolve(&party_id()).unwrap();
        let b = resolver.resolve(&party_id()).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(a.build_id(), b.build_id());
        assert!(a.options().strict_type_check);
    }

    #[test]
    fn test_cached_shares_one_handle() {
        let resolver = resolver(HandlePolicy::Cached);
        let a = resolver.resolve(&party_id()).unwrap();
        let b = resolver.resolve(&party_id()).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unknown_model_and_artifact() {
        let resolver = resolver(HandlePolicy::PerCall);

        let err = resolver
            .resolve(&ModelIdentifier::new(PARTY_NAMESPACE, "Wedding", "party.yaml"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::ModelNotFound { ref name, .. } if name == "Wedding"));

        let err = resolver
            .resolve(&ModelIdentifier::new(PARTY_NAMESPACE, PARTY_NAME, "gone.yaml"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::ModelNotFound { .. }));
    }

    #[test]
    fn test_malformed_artifact() {
        let resolver = resolver(HandlePolicy::Cached);
        let err = resolver
            .resolve(&ModelIdentifier::new(PARTY_NAMESPACE, PARTY_NAME, "broken.yaml"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::ModelLoad { .. }));
    }

    #[test]
    fn test_policy_deserializes_snake_case() {
        let policy: HandlePolicy = serde_yaml::from_str("cached").unwrap();
        assert_eq!(policy, HandlePolicy::Cached);
        let policy: HandlePolicy = serde_yaml::from_str("per_call").unwrap();
        assert_eq!(policy, HandlePolicy::PerCall);
    }
}
