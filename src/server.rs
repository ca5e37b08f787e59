//! HTTP surface of the STS endpoint.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::sts::{AssumeRoleWithSamlResponse, ErrorResponse, StsError, StsErrorCode, StsService};

/// Largest request body read from a client (2 MB).
pub const MAX_REQUEST_BODY_SIZE: usize = 2 * 1024 * 1024;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-amz-request-id");

/// Build the STS router. Every path accepts `POST`; the request is unauthenticated.
pub fn router(service: Arc<StsService>) -> Router {
    Router::new()
        .route("/", post(assume_role_with_saml))
        .route("/{*path}", post(assume_role_with_saml))
        .with_state(service)
}

async fn assume_role_with_saml(State(service): State<Arc<StsService>>, body: Body) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    let body = match axum::body::to_bytes(body, MAX_REQUEST_BODY_SIZE).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let err = StsError::MalformedRequest(e.to_string());
            warn!(error = %err, request_id = %request_id, "Unable to read request body");
            return error_response(err.code(), &request_id);
        }
    };

    // Detached so a client disconnect does not cancel the IdP call or publication.
    let outcome = tokio::spawn(async move { service.assume_role_with_saml(&body).await }).await;

    match outcome {
        Ok(Ok(result)) => {
            match AssumeRoleWithSamlResponse::new(result, &request_id).to_xml() {
                Ok(xml) => xml_response(StatusCode::OK, &request_id, xml),
                Err(e) => {
                    error!(error = %e, request_id = %request_id, "Failed to encode STS response");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
        Ok(Err(e)) => {
            debug!(request_id = %request_id, code = %e.code(), "Writing STS error response");
            error_response(e.code(), &request_id)
        }
        Err(e) => {
            error!(error = %e, request_id = %request_id, "AssumeRoleWithSAML task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn error_response(code: StsErrorCode, request_id: &str) -> Response {
    let status =
        StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
    match ErrorResponse::new(code, request_id).to_xml() {
        Ok(xml) => xml_response(status, request_id, xml),
        Err(e) => {
            error!(error = %e, request_id = %request_id, "Failed to encode STS error response");
            status.into_response()
        }
    }
}

fn xml_response(status: StatusCode, request_id: &str, body: String) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, "application/xml".to_string()),
            (REQUEST_ID_HEADER, request_id.to_string()),
        ],
        body,
    )
        .into_response()
}
