//! gRPC service implementation for Dinner
//!
//! This module implements the `dinner.v1.Dinner` service as defined in the
//! proto contract, delegating every call to the evaluation gateway.

use std::sync::Arc;
use std::time::Duration;

use tonic::metadata::{AsciiMetadataValue, MetadataMap};
use tonic::{Request, Response, Status};

use dmn_gateway_core::{DecisionGateway, Diagnostic, GatewayError};

use crate::proto::dinner::v1::{dinner_server::Dinner, DinnerInput, DinnerOutput};

/// Response metadata key carrying one evaluation warning per entry
pub const WARNING_METADATA_KEY: &str = "x-dmn-warning";

/// Request header in which gRPC clients send their deadline
const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// gRPC service implementation
pub struct DinnerService {
    gateway: Arc<DecisionGateway>,
}

impl DinnerService {
    /// Create a new service over the given gateway
    pub fn new(gateway: Arc<DecisionGateway>) -> Self {
        Self { gateway }
    }
}

#[tonic::async_trait]
impl Dinner for DinnerService {
    async fn process(
        &self,
        request: Request<DinnerInput>,
    ) -> Result<Response<DinnerOutput>, Status> {
        let timeout = caller_timeout(request.metadata());
        let input = request.into_inner();

        tracing::debug!(
            season = %input.season,
            guests = input.number_of_guests,
            children = input.guests_with_children,
            timeout = ?timeout,
            "Process request"
        );

        let outcome = self
            .gateway
            .process_with_deadline::<DinnerInput, DinnerOutput>(&input, timeout)
            .await
            .map_err(into_status)?;

        let mut response = Response::new(outcome.response);
        attach_warnings(response.metadata_mut(), &outcome.warnings);
        Ok(response)
    }
}

/// Map a gateway failure onto a gRPC status. No partial output is sent.
pub fn into_status(err: GatewayError) -> Status {
    match &err {
        GatewayError::ModelNotFound { .. } => Status::not_found(err.to_string()),
        GatewayError::ModelLoad { .. } => Status::failed_precondition(err.to_string()),
        GatewayError::Evaluation { .. } => Status::invalid_argument(err.to_string()),
        GatewayError::FieldExtraction { .. } => {
            // The model and the response schema disagree: a server defect.
            tracing::error!(error = %err, "Failed to map evaluation result");
            Status::internal(err.to_string())
        }
        GatewayError::DeadlineExceeded { .. } => Status::deadline_exceeded(err.to_string()),
        GatewayError::Join(_) => {
            tracing::error!(error = %err, "Evaluation task failed");
            Status::internal(err.to_string())
        }
    }
}

/// The deadline the caller sent, if any. A malformed header is ignored.
fn caller_timeout(metadata: &MetadataMap) -> Option<Duration> {
    let raw = metadata.get(GRPC_TIMEOUT_HEADER)?.to_str().ok()?;
    let timeout = parse_grpc_timeout(raw);
    if timeout.is_none() {
        tracing::debug!(header = raw, "Ignoring malformed grpc-timeout");
    }
    timeout
}

/// Parse `TimeoutValue TimeoutUnit`: at most 8 digits followed by one of
/// `H M S m u n`.
fn parse_grpc_timeout(raw: &str) -> Option<Duration> {
    if !raw.is_ascii() {
        return None;
    }
    let (digits, unit) = raw.split_at(raw.len().checked_sub(1)?);
    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = digits.parse().ok()?;

    let timeout = match unit {
        "H" => Duration::from_secs(value * 60 * 60),
        "M" => Duration::from_secs(value * 60),
        "S" => Duration::from_secs(value),
        "m" => Duration::from_millis(value),
        "u" => Duration::from_micros(value),
        "n" => Duration::from_nanos(value),
        _ => return None,
    };
    Some(timeout)
}

fn attach_warnings(metadata: &mut MetadataMap, warnings: &[Diagnostic]) {
    for warning in warnings {
        match warning.to_string().parse::<AsciiMetadataValue>() {
            Ok(value) => {
                metadata.append(WARNING_METADATA_KEY, value);
            }
            Err(_) => {
                tracing::debug!(%warning, "Warning is not valid ASCII metadata, not forwarded");
            }
        }
    }
}
