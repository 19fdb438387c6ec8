//! Middleware for identity handoff and request logging

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;

/// Header carrying the verified user id, set by the upstream authentication
/// collaborator. This service never validates credentials itself.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Verified caller identity, as placed in request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i64);

/// Identity middleware for the stateless REST path.
///
/// Rejects requests without a usable identity header before any handler
/// runs; handlers then read `Extension<UserId>`.
pub async fn identity_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            GatewayError::AuthenticationFailed(format!(
                "missing or invalid {USER_ID_HEADER} header"
            ))
        })?;

    request.extensions_mut().insert(UserId(user_id));

    Ok(next.run(request).await)
}

/// Logging middleware for request/response logging
pub async fn logging_middleware(
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "request completed"
    );

    Ok(response)
}
