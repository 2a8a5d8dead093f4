//! Caller identity.
//!
//! The server sits behind a gateway that authenticates users and forwards the
//! resolved id in the `x-user-id` header. Every `/api/v1` route except the
//! health probes requires it.

use axum::{body::Body, http::Request, middleware::Next, response::Response};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
const MAX_USER_ID_LEN: usize = 128;

/// The authenticated caller, inserted into request extensions by
/// [`require_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

fn user_id_from(request: &Request<Body>) -> Option<String> {
    let value = request.headers().get(USER_ID_HEADER)?.to_str().ok()?.trim();
    if value.is_empty() || value.len() > MAX_USER_ID_LEN {
        return None;
    }
    Some(value.to_string())
}

pub async fn require_user(mut request: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let user_id = user_id_from(&request)
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;
    request.extensions_mut().insert(CurrentUser(user_id));
    Ok(next.run(request).await)
}
