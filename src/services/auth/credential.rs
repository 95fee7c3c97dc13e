use axum::http::{HeaderMap, header};

use crate::error::AuthError;

pub const TOKEN_TYPE: &str = "Bearer";

/// Extracts the encoded token from `Authorization: Bearer <token>`.
///
/// The header must be exactly two tokens separated by a single space and the
/// scheme is compared case-sensitively. The token itself is returned as is.
pub fn parse_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = match headers.get(header::AUTHORIZATION) {
        Some(v) if !v.is_empty() => v,
        _ => return Err(AuthError::MissingCredential),
    };

    let value = value.to_str().map_err(|_| AuthError::MalformedCredential)?;

    let mut items = value.split(' ');
    match (items.next(), items.next(), items.next()) {
        (Some(TOKEN_TYPE), Some(token), None) => Ok(token),
        _ => Err(AuthError::MalformedCredential),
    }
}
