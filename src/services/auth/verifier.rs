use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use crate::error::AuthError;

/// HMAC algorithms accepted for access tokens. Anything else is rejected
/// before the signature is looked at.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
const HMAC_ALGORITHM_NAMES: [&str; 3] = ["HS256", "HS384", "HS512"];

const ISSUED_AT_CLAIM: &str = "iat";

/// Process-wide HMAC key shared by every protected endpoint.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct SharedSecret(Arc<[u8]>);

impl SharedSecret {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self(Arc::from(secret.as_ref()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Decoded payload of a token whose signature and time claims checked out.
///
/// Only [`TokenVerifier::verify`] builds one, so holding a `ClaimSet` means
/// verification succeeded.
#[derive(Debug, Clone)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

/// HS256/HS384/HS512 access-token verifier.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("TokenVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(secret: &SharedSecret, leeway_seconds: u64) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        // exp/nbf are checked when present but no claim is mandatory.
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.leeway = leeway_seconds;

        Self {
            decoding_key,
            validation,
        }
    }

    /// Verify the signature and time claims of `token` and decode its payload.
    ///
    /// - `alg` outside HS256/HS384/HS512, including ones jsonwebtoken cannot
    ///   parse such as `none` ⇒ `UnexpectedSigningMethod`
    /// - bad encoding, bad signature, non-object payload, expired, not yet
    ///   valid or issued in the future ⇒ `TokenVerificationFailed`
    pub fn verify(&self, token: &str) -> Result<ClaimSet, AuthError> {
        let header = jsonwebtoken::decode_header(token).map_err(|e| {
            match unsupported_alg(token) {
                Some(alg) => AuthError::UnexpectedSigningMethod(alg),
                None => AuthError::TokenVerificationFailed(e.to_string()),
            }
        })?;

        if !HMAC_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::UnexpectedSigningMethod(format!("{:?}", header.alg)));
        }

        let data =
            jsonwebtoken::decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)
                .map_err(|e| AuthError::TokenVerificationFailed(e.to_string()))?;

        self.check_issued_at(&data.claims)?;

        Ok(ClaimSet(data.claims))
    }

    // jsonwebtoken leaves `iat` alone; a numeric one must not lie in the future.
    fn check_issued_at(&self, claims: &Map<String, Value>) -> Result<(), AuthError> {
        let Some(iat) = claims.get(ISSUED_AT_CLAIM).and_then(Value::as_f64) else {
            return Ok(());
        };

        let latest = jsonwebtoken::get_current_timestamp().saturating_add(self.validation.leeway);
        if iat.trunc() > latest as f64 {
            return Err(AuthError::TokenVerificationFailed(
                "token used before issued".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reads `alg` straight from the header segment when jsonwebtoken rejects the
/// header, so unknown algorithms are still reported by name.
fn unsupported_alg(token: &str) -> Option<String> {
    let segment = token.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()?;
    let header: Value = serde_json::from_slice(&bytes).ok()?;
    let alg = header.get("alg")?.as_str()?;

    if HMAC_ALGORITHM_NAMES.contains(&alg) {
        None
    } else {
        Some(alg.to_string())
    }
}
