use axum::http::HeaderMap;

use crate::error::ApiError;

pub const DEPLOY_TOKEN_HEADER: &str = "x-deploy-token";

fn presented(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(DEPLOY_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
}

/// Passes when no token is configured or the header matches it.
pub fn check_if_configured(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
    match expected {
        None => Ok(()),
        Some(token) if presented(headers) == Some(token) => Ok(()),
        Some(_) => Err(ApiError::unauthorized("Invalid token")),
    }
}

/// Passes only when a token is configured and the header matches it.
pub fn check_required(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
    match expected {
        Some(token) if presented(headers) == Some(token) => Ok(()),
        _ => Err(ApiError::unauthorized("Invalid deploy token")),
    }
}
