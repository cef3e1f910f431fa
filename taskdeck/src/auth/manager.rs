//! Session manager: signup, login, refresh rotation, logout and token verification.

use super::{
    config::{AuthConfig, MAX_TOKEN_TTL},
    email::validate_email,
    errors::{AuthError, AuthResult},
    fingerprint::fingerprint,
    models::{
        Account, AuthSession, AuthenticatedUser, LoginRequest, NewAccount, SessionTokens,
        SignupRequest, TokenKind, UserId,
    },
    password::PasswordHasher,
    token::{TokenCodec, TokenError},
};
use crate::db::{AccountRepository, RefreshTokenLedger};
use chrono::Utc;
use std::sync::Arc;

/// Longest accepted display name, in characters
const MAX_NAME_LEN: usize = 100;

/// Password hashed once at startup so logins for unknown emails cost the same as real ones
const TIMING_DUMMY_PASSWORD: &str = "timing-equalizer-password";

/// Authentication manager
#[derive(Clone)]
pub struct SessionManager {
    config: Arc<AuthConfig>,
    accounts: Arc<dyn AccountRepository>,
    ledger: Arc<dyn RefreshTokenLedger>,
    hasher: PasswordHasher,
    codec: TokenCodec,
    dummy_hash: Arc<str>,
}

impl SessionManager {
    /// Create a new session manager
    ///
    /// # Errors
    ///
    /// * `AuthError::Config` - Empty signing secret, a token lifetime above
    ///   [`MAX_TOKEN_TTL`], or unusable Argon2 parameters
    pub fn new(
        config: AuthConfig,
        accounts: Arc<dyn AccountRepository>,
        ledger: Arc<dyn RefreshTokenLedger>,
    ) -> AuthResult<Self> {
        if config.jwt_secret.is_empty() {
            return Err(AuthError::Config("JWT secret must not be empty".to_string()));
        }
        if config.access_token_ttl > MAX_TOKEN_TTL || config.refresh_token_ttl > MAX_TOKEN_TTL {
            return Err(AuthError::Config(format!(
                "Token lifetimes must not exceed {} days",
                MAX_TOKEN_TTL.as_secs() / 86_400
            )));
        }

        let hasher = PasswordHasher::from_config(&config)?;
        let dummy_hash = hasher.hash(TIMING_DUMMY_PASSWORD)?;
        let codec = TokenCodec::new(&config.jwt_secret);

        Ok(Self {
            config: Arc::new(config),
            accounts,
            ledger,
            hasher,
            codec,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Register a new account and open its first session
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidInput` - Email, password or name missing, or name too long
    /// * `AuthError::InvalidEmail` - Email format invalid
    /// * `AuthError::EmailTaken` - Email already registered (case-insensitive)
    pub async fn signup(&self, request: SignupRequest) -> AuthResult<AuthSession> {
        let email = request.email.trim().to_lowercase();
        let name = request.name.trim();

        if email.is_empty() || request.password.is_empty() || name.is_empty() {
            return Err(AuthError::InvalidInput(
                "Email, password, and name are required".to_string(),
            ));
        }
        validate_email(&email)?;
        if name.chars().count() > MAX_NAME_LEN {
            return Err(AuthError::InvalidInput(format!(
                "Name must be at most {MAX_NAME_LEN} characters"
            )));
        }

        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hash_password(request.password).await?;

        // The storage-level unique index still catches a concurrent signup for the same email.
        let account = self
            .accounts
            .create_account(NewAccount {
                email,
                password_hash,
                name: name.to_string(),
            })
            .await?;

        let tokens = self.issue_tokens(&account).await?;
        log::info!("Account {} signed up", account.id);

        Ok(AuthSession { tokens, account })
    }

    /// Authenticate with email and password
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidInput` - Email or password missing
    /// * `AuthError::InvalidCredentials` - Unknown email or wrong password
    pub async fn login(&self, request: LoginRequest) -> AuthResult<AuthSession> {
        let email = request.email.trim().to_lowercase();
        if email.is_empty() || request.password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Email and password are required".to_string(),
            ));
        }

        let Some(account) = self.accounts.find_by_email(&email).await? else {
            self.verify_password(request.password, self.dummy_hash.to_string())
                .await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .verify_password(request.password, account.password_hash.clone())
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_tokens(&account).await?;
        log::debug!("Account {} logged in", account.id);

        Ok(AuthSession { tokens, account })
    }

    /// Exchange a refresh token for a new pair, revoking the presented one
    ///
    /// Only the caller that wins the conditional revoke receives a new pair; a concurrent
    /// refresh with the same token fails with `AlreadyRevoked`.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidInput` - Empty token
    /// * `AuthError::RefreshTokenNotFound` - Unknown token or its owner no longer exists
    /// * `AuthError::AlreadyRevoked` - Token was rotated, logged out, or lost a concurrent race
    /// * `AuthError::RefreshTokenExpired` - Token is past its expiry
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<SessionTokens> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidInput("Refresh token is required".to_string()));
        }

        let record = self
            .ledger
            .find_by_fingerprint(&fingerprint(refresh_token))
            .await?
            .ok_or(AuthError::RefreshTokenNotFound)?;

        let now = Utc::now();
        if record.is_revoked() {
            self.handle_reuse(record.user_id).await?;
            return Err(AuthError::AlreadyRevoked);
        }
        if record.is_expired(now) {
            return Err(AuthError::RefreshTokenExpired);
        }

        let account = self
            .accounts
            .find_by_id(record.user_id)
            .await?
            .ok_or(AuthError::RefreshTokenNotFound)?;

        if !self.ledger.revoke(record.id, now).await? {
            log::warn!(
                "Concurrent refresh lost the revoke race for account {}",
                record.user_id
            );
            return Err(AuthError::AlreadyRevoked);
        }

        self.issue_tokens(&account).await
    }

    /// Owner of the ledger record behind a refresh token, whatever its state
    pub async fn refresh_token_owner(&self, refresh_token: &str) -> AuthResult<Option<UserId>> {
        if refresh_token.is_empty() {
            return Ok(None);
        }
        let record = self
            .ledger
            .find_by_fingerprint(&fingerprint(refresh_token))
            .await?;
        Ok(record.map(|r| r.user_id))
    }

    /// Revoke a refresh token
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidInput` - Empty token
    /// * `AuthError::RefreshTokenNotFound` - Unknown token
    /// * `AuthError::AlreadyLoggedOut` - Token already revoked, or revoked concurrently
    pub async fn logout(&self, refresh_token: &str) -> AuthResult<()> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidInput("Refresh token is required".to_string()));
        }

        let record = self
            .ledger
            .find_by_fingerprint(&fingerprint(refresh_token))
            .await?
            .ok_or(AuthError::RefreshTokenNotFound)?;

        if record.is_revoked() || !self.ledger.revoke(record.id, Utc::now()).await? {
            return Err(AuthError::AlreadyLoggedOut);
        }

        log::debug!("Refresh token {} revoked by logout", record.id);
        Ok(())
    }

    /// Verify an access token and return the identity it carries
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidAccessToken` - Bad signature, expired, malformed, or a refresh token
    pub fn verify_access_token(&self, token: &str) -> AuthResult<AuthenticatedUser> {
        let claims = self.codec.verify_access(token).map_err(|e| match e {
            TokenError::MissingSecret => AuthError::Token(e),
            other => AuthError::InvalidAccessToken(other),
        })?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }

    /// Verify the value of an `Authorization` header of the form `Bearer <token>`
    ///
    /// # Errors
    ///
    /// * `AuthError::MissingAuthorizationHeader` - No header value
    /// * `AuthError::InvalidAuthorizationHeader` - Not exactly `Bearer` and a token
    /// * `AuthError::InvalidAccessToken` - Token failed verification
    pub fn verify_bearer_header(&self, header: Option<&str>) -> AuthResult<AuthenticatedUser> {
        let value = match header {
            Some(value) if !value.is_empty() => value,
            _ => return Err(AuthError::MissingAuthorizationHeader),
        };

        let parts: Vec<&str> = value.split(' ').collect();
        match parts.as_slice() {
            ["Bearer", token] => self.verify_access_token(token),
            _ => Err(AuthError::InvalidAuthorizationHeader),
        }
    }

    /// Sign an access/refresh pair for `account` and record the refresh fingerprint
    async fn issue_tokens(&self, account: &Account) -> AuthResult<SessionTokens> {
        let access = self.codec.sign(
            account.id,
            &account.email,
            TokenKind::Access,
            self.config.access_token_ttl,
        )?;
        let refresh = self.codec.sign(
            account.id,
            &account.email,
            TokenKind::Refresh,
            self.config.refresh_token_ttl,
        )?;

        let expires_at = refresh
            .claims
            .expires_at()
            .ok_or_else(|| AuthError::Config("Refresh token expiry out of range".to_string()))?;
        self.ledger
            .store(account.id, &fingerprint(&refresh.token), expires_at)
            .await?;

        Ok(SessionTokens {
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl.as_secs().max(1),
        })
    }

    /// A revoked refresh token came back. Optionally end every session of its owner.
    ///
    /// Fires for tokens revoked by logout as well as by rotation.
    async fn handle_reuse(&self, owner: UserId) -> AuthResult<()> {
        if self.config.revoke_sessions_on_reuse {
            let revoked = self.ledger.revoke_all_for_owner(owner, Utc::now()).await?;
            log::warn!(
                "Revoked refresh token reused for account {owner}; revoked {revoked} active sessions"
            );
        } else {
            log::warn!("Revoked refresh token reused for account {owner}");
        }
        Ok(())
    }

    async fn hash_password(&self, password: String) -> AuthResult<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|_| AuthError::HashingFailed)?
    }

    async fn verify_password(&self, password: String, hash: String) -> AuthResult<bool> {
        let hasher = self.hasher.clone();
        let joined = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await;
        verification_outcome(joined)
    }
}

/// A verification task that panicked or was cancelled is a server fault, not a wrong password.
fn verification_outcome(joined: Result<bool, tokio::task::JoinError>) -> AuthResult<bool> {
    joined.map_err(|e| {
        log::error!("Password verification task failed: {e}");
        AuthError::HashingFailed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RefreshTokenRecord;
    use crate::db::memory::{InMemoryAccounts, InMemoryLedger};
    use chrono::Duration;
    use uuid::Uuid;

    const SECRET: &str = "unit-test-secret-with-enough-length!!";
    const DEFAULT_ACCESS: std::time::Duration = std::time::Duration::from_secs(15 * 60);

    fn manager_with(config: AuthConfig) -> (SessionManager, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let manager = SessionManager::new(
            config.with_argon2_params(8, 1, 1),
            Arc::new(InMemoryAccounts::new()),
            ledger.clone(),
        )
        .unwrap();
        (manager, ledger)
    }

    fn manager() -> (SessionManager, Arc<InMemoryLedger>) {
        manager_with(AuthConfig::new(SECRET))
    }

    async fn signed_up(manager: &SessionManager) -> AuthSession {
        manager
            .signup(SignupRequest {
                email: "User@Example.com".to_string(),
                password: "Secretpass1!".to_string(),
                name: " Test User ".to_string(),
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_rejects_empty_secret() {
        let result = SessionManager::new(
            AuthConfig::new("").with_argon2_params(8, 1, 1),
            Arc::new(InMemoryAccounts::new()),
            Arc::new(InMemoryLedger::new()),
        );
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_rejects_out_of_range_lifetimes() {
        let too_long = MAX_TOKEN_TTL + std::time::Duration::from_secs(1);
        for config in [
            AuthConfig::new(SECRET).with_token_ttls(DEFAULT_ACCESS, too_long),
            AuthConfig::new(SECRET).with_token_ttls(too_long, too_long),
        ] {
            let result = SessionManager::new(
                config.with_argon2_params(8, 1, 1),
                Arc::new(InMemoryAccounts::new()),
                Arc::new(InMemoryLedger::new()),
            );
            assert!(matches!(result, Err(AuthError::Config(_))));
        }
    }

    #[tokio::test]
    async fn test_longest_lifetime_still_issues() {
        let (manager, _) = manager_with(
            AuthConfig::new(SECRET).with_token_ttls(DEFAULT_ACCESS, MAX_TOKEN_TTL),
        );
        let session = signed_up(&manager).await;
        assert!(manager.refresh(&session.tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_panicked_verification_is_hashing_failure() {
        let joined = tokio::task::spawn_blocking(|| -> bool { panic!("hasher panicked") }).await;
        let err = verification_outcome(joined).unwrap_err();
        assert!(matches!(err, AuthError::HashingFailed));

        assert!(matches!(verification_outcome(Ok(false)), Ok(false)));
    }

    #[tokio::test]
    async fn test_refresh_token_owner() {
        let (manager, _) = manager();
        let session = signed_up(&manager).await;
        let token = session.tokens.refresh_token.clone();

        manager.refresh(&token).await.unwrap();
        assert_eq!(
            manager.refresh_token_owner(&token).await.unwrap(),
            Some(session.account.id)
        );
        assert_eq!(manager.refresh_token_owner("unknown").await.unwrap(), None);
        assert_eq!(manager.refresh_token_owner("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reuse_policy_fires_after_logout() {
        let (manager, ledger) = manager_with(AuthConfig::new(SECRET).with_reuse_revocation(true));
        let first = signed_up(&manager).await;
        let second = manager
            .login(LoginRequest {
                email: "user@example.com".to_string(),
                password: "Secretpass1!".to_string(),
            })
            .await
            .unwrap();

        manager.logout(&first.tokens.refresh_token).await.unwrap();
        assert!(matches!(
            manager.refresh(&first.tokens.refresh_token).await,
            Err(AuthError::AlreadyRevoked)
        ));

        assert!(ledger
            .records_for(first.account.id)
            .iter()
            .all(|r| r.is_revoked()));
        assert!(manager.refresh(&second.tokens.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_signup_normalizes_fields() {
        let (manager, ledger) = manager();
        let session = signed_up(&manager).await;

        assert_eq!(session.account.email, "user@example.com");
        assert_eq!(session.account.name, "Test User");
        assert_eq!(session.tokens.token_type, "Bearer");
        assert_eq!(session.tokens.expires_in, 900);
        assert_eq!(ledger.records_for(session.account.id).len(), 1);
    }

    #[tokio::test]
    async fn test_signup_input_errors() {
        let (manager, _) = manager();

        let missing = manager
            .signup(SignupRequest {
                email: "user@example.com".to_string(),
                password: String::new(),
                name: "User".to_string(),
            })
            .await;
        assert!(matches!(missing, Err(AuthError::InvalidInput(_))));

        let bad_email = manager
            .signup(SignupRequest {
                email: "invalid.com".to_string(),
                password: "pw".to_string(),
                name: "User".to_string(),
            })
            .await;
        assert!(matches!(bad_email, Err(AuthError::InvalidEmail(_))));

        let long_name = manager
            .signup(SignupRequest {
                email: "user@example.com".to_string(),
                password: "pw".to_string(),
                name: "n".repeat(101),
            })
            .await;
        assert!(matches!(long_name, Err(AuthError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_refresh_rejects_expired_record() {
        let (manager, ledger) = manager();
        let session = signed_up(&manager).await;

        let raw = "expired-refresh-token";
        ledger.insert_record(RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id: session.account.id,
            token_hash: fingerprint(raw),
            expires_at: Utc::now() - Duration::minutes(1),
            created_at: Utc::now() - Duration::days(7),
            revoked_at: None,
        });

        let err = manager.refresh(raw).await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshTokenExpired));
        assert_eq!(err.client_message(), "Invalid or expired refresh token");
    }

    #[tokio::test]
    async fn test_refresh_for_missing_owner() {
        let (manager, ledger) = manager();
        let raw = "orphaned-refresh-token";
        ledger.insert_record(RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: fingerprint(raw),
            expires_at: Utc::now() + Duration::days(1),
            created_at: Utc::now(),
            revoked_at: None,
        });

        assert!(matches!(
            manager.refresh(raw).await,
            Err(AuthError::RefreshTokenNotFound)
        ));
    }

    #[tokio::test]
    async fn test_reuse_policy_off_keeps_other_sessions() {
        let (manager, ledger) = manager();
        let session = signed_up(&manager).await;
        let rotated = manager.refresh(&session.tokens.refresh_token).await.unwrap();

        assert!(matches!(
            manager.refresh(&session.tokens.refresh_token).await,
            Err(AuthError::AlreadyRevoked)
        ));

        let active = ledger
            .records_for(session.account.id)
            .into_iter()
            .filter(|r| r.is_valid(Utc::now()))
            .count();
        assert_eq!(active, 1);
        assert!(manager.refresh(&rotated.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_reuse_policy_on_revokes_all_sessions() {
        let (manager, ledger) = manager_with(AuthConfig::new(SECRET).with_reuse_revocation(true));
        let session = signed_up(&manager).await;
        let rotated = manager.refresh(&session.tokens.refresh_token).await.unwrap();

        assert!(matches!(
            manager.refresh(&session.tokens.refresh_token).await,
            Err(AuthError::AlreadyRevoked)
        ));

        assert!(ledger
            .records_for(session.account.id)
            .iter()
            .all(|r| r.is_revoked()));
        assert!(matches!(
            manager.refresh(&rotated.refresh_token).await,
            Err(AuthError::AlreadyRevoked)
        ));
    }

    #[tokio::test]
    async fn test_bearer_header_parsing() {
        let (manager, _) = manager();
        let session = signed_up(&manager).await;
        let access = &session.tokens.access_token;

        let user = manager
            .verify_bearer_header(Some(&format!("Bearer {access}")))
            .unwrap();
        assert_eq!(user.user_id, session.account.id);
        assert_eq!(user.email, "user@example.com");

        assert!(matches!(
            manager.verify_bearer_header(None),
            Err(AuthError::MissingAuthorizationHeader)
        ));
        for bad in [
            access.to_string(),
            format!("bearer {access}"),
            format!("Bearer  {access}"),
            format!("Bearer {access} extra"),
        ] {
            assert!(
                matches!(
                    manager.verify_bearer_header(Some(&bad)),
                    Err(AuthError::InvalidAuthorizationHeader)
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!(matches!(
            manager.verify_bearer_header(Some("Bearer not-a-token")),
            Err(AuthError::InvalidAccessToken(TokenError::Malformed))
        ));
    }

    #[tokio::test]
    async fn test_refresh_token_cannot_be_used_as_bearer() {
        let (manager, _) = manager();
        let session = signed_up(&manager).await;

        let err = manager
            .verify_access_token(&session.tokens.refresh_token)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidAccessToken(TokenError::WrongKind)));
        assert_eq!(err.client_message(), "Invalid token");
    }
}
