//! Evaluation gateway
//!
//! Runs the per-call pipeline: build context, resolve handle, evaluate, map.
//! Resolution and evaluation are blocking work and run on tokio's blocking
//! pool; the rest is cheap and stays on the calling task.

use std::sync::Arc;
use std::time::Duration;

use crate::context::{build_context, EvaluationContext, IntoContext};
use crate::diagnostics::Diagnostic;
use crate::error::{GatewayError, Result};
use crate::evaluator::{self, Deadline, EvaluationResult};
use crate::mapper::{map_result, FromBindings};
use crate::resolver::{ModelIdentifier, ModelResolver};

/// A typed response plus the warnings evaluation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<R> {
    pub response: R,
    pub warnings: Vec<Diagnostic>,
}

pub struct DecisionGateway {
    resolver: Arc<ModelResolver>,
    model: ModelIdentifier,
    timeout: Option<Duration>,
}

impl DecisionGateway {
    pub fn new(resolver: Arc<ModelResolver>, model: ModelIdentifier) -> Self {
        Self {
            resolver,
            model,
            timeout: None,
        }
    }

    /// Bound every call by `timeout`; `None` means unbounded.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &ModelIdentifier {
        &self.model
    }

    pub fn resolver(&self) -> &ModelResolver {
        &self.resolver
    }

    /// Process one request on the current thread.
    pub fn process_blocking<Req, Resp>(&self, request: &Req) -> Result<Outcome<Resp>>
    where
        Req: IntoContext,
        Resp: FromBindings,
    {
        let context = build_context(request);
        let deadline = self.deadline(None);
        let result = run(&self.resolver, &self.model, context, deadline)?;
        finish(result)
    }

    /// Process one request, evaluating on the blocking pool.
    pub async fn process<Req, Resp>(&self, request: &Req) -> Result<Outcome<Resp>>
    where
        Req: IntoContext,
        Resp: FromBindings,
    {
        self.process_with_deadline(request, None).await
    }

    /// Process one request under the caller's deadline as well as the
    /// configured timeout, whichever is shorter.
    ///
    /// An expired call returns [`GatewayError::DeadlineExceeded`]. The
    /// blocking task sees the same deadline: it stops after resolution or at
    /// the next decision instead of running on unobserved.
    pub async fn process_with_deadline<Req, Resp>(
        &self,
        request: &Req,
        caller_timeout: Option<Duration>,
    ) -> Result<Outcome<Resp>>
    where
        Req: IntoContext,
        Resp: FromBindings,
    {
        let context = build_context(request);
        let deadline = self.deadline(caller_timeout);
        let resolver = Arc::clone(&self.resolver);
        let model = self.model.clone();

        let task =
            tokio::task::spawn_blocking(move || run(&resolver, &model, context, deadline));

        let joined = match deadline {
            Some(deadline) => tokio::time::timeout(deadline.timeout, task)
                .await
                .map_err(|_| GatewayError::DeadlineExceeded {
                    timeout: deadline.timeout,
                })?,
            None => task.await,
        };

        let result = joined.map_err(|e| GatewayError::Join(e.to_string()))??;
        finish(result)
    }

    fn deadline(&self, caller_timeout: Option<Duration>) -> Option<Deadline> {
        effective_timeout(self.timeout, caller_timeout).map(Deadline::after)
    }
}

fn effective_timeout(
    configured: Option<Duration>,
    caller: Option<Duration>,
) -> Option<Duration> {
    match (configured, caller) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn run(
    resolver: &ModelResolver,
    model: &ModelIdentifier,
    context: EvaluationContext,
    deadline: Option<Deadline>,
) -> Result<EvaluationResult> {
    let handle = resolver.resolve(model)?;
    if let Some(deadline) = deadline.filter(Deadline::has_passed) {
        return Err(GatewayError::DeadlineExceeded {
            timeout: deadline.timeout,
        });
    }
    tracing::debug!(
        model = %model,
        policy = ?resolver.policy(),
        build_id = %handle.build_id(),
        variables = context.len(),
        "Evaluating"
    );
    evaluator::evaluate(&handle, context, deadline)
}

fn finish<Resp: FromBindings>(result: EvaluationResult) -> Result<Outcome<Resp>> {
    let response = map_result(&result)?;
    Ok(Outcome {
        response,
        warnings: result.warnings().cloned().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InputField;
    use crate::engine::{EmbeddedArtifactLoader, RuntimeOptions};
    use crate::mapper::{ExtractedFields, FieldKind, OutputField};
    use crate::resolver::HandlePolicy;
    use crate::test_support::{PARTY_ARTIFACT, PARTY_NAME, PARTY_NAMESPACE};
    use crate::value::{Value, ValueKind};

    struct PartyRequest {
        guests: i32,
        mood: String,
    }

    const PARTY_INPUTS: &[InputField] = &[
        InputField::new("guests", "Guests", ValueKind::Number),
        InputField::new("mood", "Mood", ValueKind::String),
    ];

    impl IntoContext for PartyRequest {
        fn input_fields() -> &'static [InputField] {
            PARTY_INPUTS
        }

        fn field_value(&self, field: &str) -> Option<Value> {
            match field {
                "guests" => Some(self.guests.into()),
                "mood" => Some(self.mood.as_str().into()),
                _ => None,
            }
        }
    }

    #[derive(Debug, PartialEq)]
    struct PartyPlan {
        venue: Option<String>,
        music: String,
        snacks: Vec<String>,
    }

    const PARTY_OUTPUTS: &[OutputField] = &[
        OutputField::optional("venue", "Venue", FieldKind::String),
        OutputField::required("music", "Music", FieldKind::String),
        OutputField::required("snacks", "Snacks", FieldKind::StringList),
    ];

    impl FromBindings for PartyPlan {
        fn output_fields() -> &'static [OutputField] {
            PARTY_OUTPUTS
        }

        fn from_fields(mut fields: ExtractedFields) -> Result<Self> {
            Ok(PartyPlan {
                venue: fields.string("venue")?,
                music: fields.require_string("music")?,
                snacks: fields.require_string_list("snacks")?,
            })
        }
    }

    fn gateway(policy: HandlePolicy, timeout: Option<Duration>) -> DecisionGateway {
        let loader = EmbeddedArtifactLoader::new().with_artifact("party.yaml", PARTY_ARTIFACT);
        let resolver = ModelResolver::new(
            Arc::new(loader),
            policy,
            RuntimeOptions {
                strict_type_check: true,
            },
        );
        DecisionGateway::new(
            Arc::new(resolver),
            ModelIdentifier::new(PARTY_NAMESPACE, PARTY_NAME, "party.yaml"),
        )
        .with_timeout(timeout)
    }

    fn request(guests: i32, mood: &str) -> PartyRequest {
        PartyRequest {
            guests,
            mood: mood.to_string(),
        }
    }

    #[tokio::test]
    async fn test_process_end_to_end() {
        let outcome: Outcome<PartyPlan> = gateway(HandlePolicy::PerCall, None)
            .process(&request(12, "festive"))
            .await
            .unwrap();

        assert_eq!(
            outcome.response,
            PartyPlan {
                venue: Some("Hall".into()),
                music: "Band".into(),
                snacks: vec!["Crisps".into(), "Cake".into(), "Punch".into()],
            }
        );
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_optional_absent_output_surfaces_warning() {
        let outcome: Outcome<PartyPlan> = gateway(HandlePolicy::Cached, None)
            .process(&request(-1, "calm"))
            .await
            .unwrap();

        assert_eq!(outcome.response.venue, None);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].source.as_deref(), Some("Venue"));
    }

    #[tokio::test]
    async fn test_unknown_model_gives_no_response() {
        let loader = EmbeddedArtifactLoader::new().with_artifact("party.yaml", PARTY_ARTIFACT);
        let resolver = ModelResolver::new(
            Arc::new(loader),
            HandlePolicy::PerCall,
            RuntimeOptions::default(),
        );
        let gateway = DecisionGateway::new(
            Arc::new(resolver),
            ModelIdentifier::new(PARTY_NAMESPACE, "Wedding", "party.yaml"),
        );

        let err = gateway
            .process::<_, PartyPlan>(&request(12, "festive"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ModelNotFound { .. }));
    }

    #[tokio::test]
    async fn test_zero_timeout_is_deadline_exceeded() {
        let err = gateway(HandlePolicy::PerCall, Some(Duration::ZERO))
            .process::<_, PartyPlan>(&request(12, "festive"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::DeadlineExceeded { .. }));
    }

    #[tokio::test]
    async fn test_caller_deadline_without_configured_timeout() {
        let err = gateway(HandlePolicy::PerCall, None)
            .process_with_deadline::<_, PartyPlan>(&request(12, "festive"), Some(Duration::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::DeadlineExceeded { timeout } if timeout.is_zero()));
    }

    #[tokio::test]
    async fn test_generous_caller_deadline_completes() {
        let outcome: Outcome<PartyPlan> = gateway(HandlePolicy::Cached, Some(Duration::from_secs(30)))
            .process_with_deadline(&request(12, "festive"), Some(Duration::from_secs(10)))
            .await
            .unwrap();
        assert_eq!(outcome.response.music, "Band");
    }

    #[test]
    fn test_shorter_timeout_wins() {
        let short = Duration::from_millis(50);
        let long = Duration::from_secs(2);

        assert_eq!(effective_timeout(None, None), None);
        assert_eq!(effective_timeout(Some(long), None), Some(long));
        assert_eq!(effective_timeout(None, Some(short)), Some(short));
        assert_eq!(effective_timeout(Some(long), Some(short)), Some(short));
        assert_eq!(effective_timeout(Some(short), Some(long)), Some(short));
    }

    #[test]
    fn test_deadline_checked_after_resolution() {
        let gw = gateway(HandlePolicy::PerCall, None);
        let expired = Deadline {
            at: std::time::Instant::now(),
            timeout: Duration::from_millis(7),
        };

        let err = run(
            gw.resolver(),
            gw.model(),
            build_context(&request(12, "festive")),
            Some(expired),
        )
        .unwrap_err();
        assert!(
            matches!(err, GatewayError::DeadlineExceeded { timeout } if timeout == Duration::from_millis(7))
        );
    }

    #[test]
    fn test_blocking_matches_async() {
        let gw = gateway(HandlePolicy::Cached, None);
        let blocking: Outcome<PartyPlan> = gw.process_blocking(&request(5, "calm")).unwrap();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let asynchronous: Outcome<PartyPlan> =
            runtime.block_on(gw.process(&request(5, "calm"))).unwrap();

        assert_eq!(blocking, asynchronous);
        assert_eq!(blocking.response.venue.as_deref(), Some("Living room"));
        assert_eq!(blocking.response.music, "Playlist");
    }
}
