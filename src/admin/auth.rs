use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::server::AppState;

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.admin_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected);

    if authorized {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(path = %request.uri().path(), "Rejected unauthenticated admin request");
        Err(StatusCode::UNAUTHORIZED)
    }
}
