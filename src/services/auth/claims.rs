use axum::http::{HeaderName, HeaderValue};
use serde_json::Value;

use crate::error::AuthError;

use super::ClaimSet;

pub const USER_ID_CLAIM: &str = "user_id";
pub const USER_ROLE_CLAIM: &str = "user_role";

/// Header carrying the verified user id to the wrapped handler.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("user-id");

/// Identity of the caller, taken from a verified claim set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub user_role: String,
    user_id_value: HeaderValue,
}

impl Identity {
    /// `user_id` is checked first, then `user_role`. Both must be JSON strings.
    pub fn from_claims(claims: &ClaimSet) -> Result<Self, AuthError> {
        let (user_id, user_id_value) = match claims.get(USER_ID_CLAIM) {
            // It ends up in a request header, so it has to be a valid header value.
            Some(Value::String(s)) => match HeaderValue::from_str(s) {
                Ok(value) => (s.clone(), value),
                Err(_) => return Err(AuthError::MissingUserId),
            },
            _ => return Err(AuthError::MissingUserId),
        };

        let user_role = match claims.get(USER_ROLE_CLAIM) {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(AuthError::MissingUserRole),
        };

        Ok(Self {
            user_id,
            user_role,
            user_id_value,
        })
    }

    /// `User-Id` header to set on the forwarded request.
    pub fn header(&self) -> (HeaderName, HeaderValue) {
        (USER_ID_HEADER, self.user_id_value.clone())
    }
}
