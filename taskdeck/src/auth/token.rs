//! HS256 token signing and verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use super::{
    email::{EmailError, validate_email},
    models::{AccessClaims, TokenKind, UserId},
};

/// Issuer written into and required from every token
pub const TOKEN_ISSUER: &str = "task-management-auth";

/// Token codec errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("signing secret is not configured")]
    MissingSecret,

    #[error("owner id must not be nil")]
    NilOwner,

    #[error("invalid email: {0}")]
    InvalidEmail(EmailError),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("malformed token")]
    Malformed,

    #[error("unexpected token kind")]
    WrongKind,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Freshly signed token and the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: AccessClaims,
}

/// Signs and verifies self-contained bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    has_secret: bool,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            has_secret: !secret.is_empty(),
        }
    }

    /// Sign a token issued now.
    pub fn sign(
        &self,
        owner: UserId,
        email: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        self.sign_at(owner, email, kind, ttl, Utc::now())
    }

    /// Sign a token as if issued at `issued_at`.
    ///
    /// # Errors
    ///
    /// * `TokenError::MissingSecret` - Codec was built with an empty secret
    /// * `TokenError::NilOwner` - Owner id is the nil UUID
    /// * `TokenError::InvalidEmail` - Email fails the format check
    pub fn sign_at(
        &self,
        owner: UserId,
        email: &str,
        kind: TokenKind,
        ttl: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        if !self.has_secret {
            return Err(TokenError::MissingSecret);
        }
        if owner.is_nil() {
            return Err(TokenError::NilOwner);
        }
        validate_email(email).map_err(TokenError::InvalidEmail)?;

        let iat = issued_at.timestamp();
        // Timestamps have second resolution; never issue a token that is born expired.
        let lifetime = i64::try_from(ttl.as_secs().max(1)).unwrap_or(i64::MAX);

        let claims = AccessClaims {
            sub: owner,
            email: email.to_string(),
            iat,
            exp: iat.saturating_add(lifetime),
            iss: TOKEN_ISSUER.to_string(),
            jti: Uuid::new_v4(),
            typ: kind,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token's signature, issuer and shape, then check expiry against `now`.
    ///
    /// The accepted algorithm is fixed to HS256 regardless of what the header claims.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, TokenError> {
        if !self.has_secret {
            return Err(TokenError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);

        let claims = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(classify)?
            .claims;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Verify a token and require it to be an access token.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims = self.verify(token)?;
        if claims.typ != TokenKind::Access {
            return Err(TokenError::WrongKind);
        }
        Ok(claims)
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::InvalidSignature
        }
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}
