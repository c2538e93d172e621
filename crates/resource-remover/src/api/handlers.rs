use std::sync::Arc;

use axum::{
    extract::{self, FromRequest},
    http::StatusCode,
    Json,
};
use tracing::{debug, error, Span};

use crate::{
    admission_request::AdmissionRequest,
    admission_response::AdmissionResponse,
    api::{
        admission_review::{AdmissionReviewRequest, AdmissionReviewResponse},
        api_error::ApiError,
        state::ApiServerState,
    },
    mutation::{mutate, Endpoint},
};

// create an extractor that internally uses `axum::Json` but has a custom rejection
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub(crate) struct JsonExtractor<T>(T);

#[tracing::instrument(
    name = "mutate_pod",
    fields(
        request_uid=tracing::field::Empty,
        host=crate::config::HOSTNAME.as_str(),
        name=tracing::field::Empty,
        namespace=tracing::field::Empty,
        operation=tracing::field::Empty,
        kind=tracing::field::Empty,
        allowed=tracing::field::Empty,
        mutated=tracing::field::Empty,
        patch_operations=tracing::field::Empty,
    ),
    skip_all)]
/// Drop the limits and shrink the requests of the containers of a Pod.
pub(crate) async fn mutate_pod_handler(
    extract::State(state): extract::State<Arc<ApiServerState>>,
    JsonExtractor(admission_review): JsonExtractor<AdmissionReviewRequest>,
) -> Result<Json<AdmissionReviewResponse>, ApiError> {
    handle_admission_review(Endpoint::Pods, &state, admission_review)
}

#[tracing::instrument(
    name = "mutate_hpa",
    fields(
        request_uid=tracing::field::Empty,
        host=crate::config::HOSTNAME.as_str(),
        name=tracing::field::Empty,
        namespace=tracing::field::Empty,
        operation=tracing::field::Empty,
        kind=tracing::field::Empty,
        allowed=tracing::field::Empty,
        mutated=tracing::field::Empty,
        patch_operations=tracing::field::Empty,
    ),
    skip_all)]
/// Pin a HorizontalPodAutoscaler to a single replica.
pub(crate) async fn mutate_hpa_handler(
    extract::State(state): extract::State<Arc<ApiServerState>>,
    JsonExtractor(admission_review): JsonExtractor<AdmissionReviewRequest>,
) -> Result<Json<AdmissionReviewResponse>, ApiError> {
    handle_admission_review(Endpoint::HorizontalPodAutoscalers, &state, admission_review)
}

#[tracing::instrument(
    name = "mutate_replicas",
    fields(
        request_uid=tracing::field::Empty,
        host=crate::config::HOSTNAME.as_str(),
        name=tracing::field::Empty,
        namespace=tracing::field::Empty,
        operation=tracing::field::Empty,
        kind=tracing::field::Empty,
        allowed=tracing::field::Empty,
        mutated=tracing::field::Empty,
        patch_operations=tracing::field::Empty,
    ),
    skip_all)]
/// Reset the replica count of a Deployment to one.
pub(crate) async fn mutate_replicas_handler(
    extract::State(state): extract::State<Arc<ApiServerState>>,
    JsonExtractor(admission_review): JsonExtractor<AdmissionReviewRequest>,
) -> Result<Json<AdmissionReviewResponse>, ApiError> {
    handle_admission_review(Endpoint::Replicas, &state, admission_review)
}

pub(crate) async fn healthz_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

fn handle_admission_review(
    endpoint: Endpoint,
    state: &ApiServerState,
    admission_review: AdmissionReviewRequest,
) -> Result<Json<AdmissionReviewResponse>, ApiError> {
    debug!(
        endpoint = endpoint.path(),
        admission_review = %serde_json::to_string(&admission_review).unwrap_or_default()
    );

    // namespace, name and patch_operations are recorded by `mutate`, once
    // the object has been decoded
    populate_span_with_admission_request_data(&admission_review.request);

    let response =
        mutate(endpoint, &admission_review.request, &state.policy).map_err(|e| {
            let api_error = ApiError::from(e);
            if api_error.status.is_server_error() {
                error!(error = api_error.message.as_str(), "cannot build admission response");
            } else {
                debug!(error = api_error.message.as_str(), "rejecting malformed admission review");
            }
            api_error
        })?;

    populate_span_with_mutation_results(&response);

    Ok(Json(AdmissionReviewResponse::new(response)))
}

fn populate_span_with_admission_request_data(adm_req: &AdmissionRequest) {
    Span::current().record("kind", adm_req.kind.kind.as_str());
    Span::current().record("operation", adm_req.operation.as_str());
    Span::current().record("request_uid", adm_req.uid.as_str());
}

fn populate_span_with_mutation_results(response: &AdmissionResponse) {
    Span::current().record("allowed", response.allowed);
    Span::current().record("mutated", response.patch.is_some());
}
