use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, Header, Validation, decode, encode, errors::ErrorKind};
use thiserror::Error;
use uuid::Uuid;

use super::Claims;
use crate::{
    error::AppError,
    state::{AppState, JwtKeys},
};

/// Why a bearer token was rejected. Every variant surfaces to the client as
/// 401; the kinds are kept distinct for logging and tests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

pub fn now_unix() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

pub fn make_access_claims(user_id: &Uuid, ttl_secs: usize) -> Claims {
    let iat = now_unix();
    Claims {
        sub: user_id.to_string(),
        iat,
        exp: iat + ttl_secs,
    }
}

pub fn encode_token(keys: &JwtKeys, claims: &Claims) -> Result<String, AppError> {
    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".into());

    encode(&header, claims, &keys.enc).map_err(|_| AppError::internal("Token encoding failed"))
}

pub fn decode_token(keys: &JwtKeys, token: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    // No leeway: a past expiry must always fail as Expired.
    validation.leeway = 0;

    decode::<Claims>(token, &keys.dec, &validation)
        .map(|data| data.claims)
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        })
}

pub async fn jwt_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::unauthorized("Missing/invalid Authorization header").into_response()
    })?;

    let claims = decode_token(&state.jwt, token).map_err(|err| {
        tracing::debug!("rejected bearer token: {err}");
        AppError::unauthorized("Invalid or expired token").into_response()
    })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{JwtKeys, TokenError, decode_token, encode_token, make_access_claims, now_unix};
    use crate::auth::Claims;

    #[test]
    fn makes_claims_with_expected_subject_and_ttl() {
        let user_id = Uuid::new_v4();
        let claims = make_access_claims(&user_id, 1800);

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.exp.saturating_sub(claims.iat), 1800);
    }

    #[test]
    fn encodes_token_that_decodes_with_same_secret() {
        let keys = JwtKeys::from_secret(b"unit-test-secret");
        let claims = make_access_claims(&Uuid::new_v4(), 600);
        let token = encode_token(&keys, &claims).expect("token should encode");

        let decoded = decode_token(&keys, &token).expect("token should decode");
        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.iat, claims.iat);
        assert_eq!(decoded.exp, claims.exp);
    }

    #[test]
    fn past_expiry_fails_as_expired() {
        let keys = JwtKeys::from_secret(b"unit-test-secret");
        let now = now_unix();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            iat: now - 3600,
            exp: now - 1,
        };
        let token = encode_token(&keys, &claims).expect("token should encode");

        assert_eq!(decode_token(&keys, &token), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_secret_fails_as_invalid_signature() {
        let keys = JwtKeys::from_secret(b"unit-test-secret");
        let other = JwtKeys::from_secret(b"some-other-secret");
        let claims = make_access_claims(&Uuid::new_v4(), 600);
        let token = encode_token(&keys, &claims).expect("token should encode");

        assert_eq!(
            decode_token(&other, &token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn garbage_fails_as_malformed() {
        let keys = JwtKeys::from_secret(b"unit-test-secret");
        assert_eq!(decode_token(&keys, "not-a-token"), Err(TokenError::Malformed));
    }
}
