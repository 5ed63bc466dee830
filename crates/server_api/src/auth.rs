use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::domain::PrincipalId;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token_secret: String,
    pub token_ttl_seconds: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("custom token rejected: {0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),
    #[error("custom token has an empty subject")]
    EmptySubject,
}

/// Issues an HS256 custom token for `principal`, accepted by
/// [`verify_custom_token`] until it expires.
pub fn mint_custom_token(
    cfg: &AuthConfig,
    principal: &PrincipalId,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::seconds(cfg.token_ttl_seconds);
    let claims = Claims {
        sub: principal.0.clone(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.token_secret.as_bytes()),
    )
}

pub fn verify_custom_token(cfg: &AuthConfig, token: &str) -> Result<PrincipalId, TokenError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(cfg.token_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    let subject = data.claims.sub.trim();
    if subject.is_empty() {
        return Err(TokenError::EmptySubject);
    }
    Ok(PrincipalId(subject.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(secret: &str) -> AuthConfig {
        AuthConfig {
            token_secret: secret.into(),
            token_ttl_seconds: 60,
        }
    }

    #[test]
    fn minted_token_round_trips_subject() {
        let principal = PrincipalId("user-42".into());
        let token = mint_custom_token(&cfg("s"), &principal).expect("mint");
        assert_eq!(verify_custom_token(&cfg("s"), &token).expect("verify"), principal);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = mint_custom_token(&cfg("a"), &PrincipalId("u".into())).expect("mint");
        assert!(matches!(
            verify_custom_token(&cfg("b"), &token),
            Err(TokenError::Rejected(_))
        ));
    }
}
