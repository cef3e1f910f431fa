//! Argon2id password hashing.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use super::{
    config::AuthConfig,
    errors::{AuthError, AuthResult},
};

/// Salted, peppered Argon2id hasher with a tunable work factor.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    pepper: Option<String>,
}

impl PasswordHasher {
    /// Create a hasher with explicit Argon2 parameters.
    ///
    /// # Errors
    ///
    /// * `AuthError::Config` - Parameters outside what Argon2 accepts
    pub fn new(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
        pepper: Option<String>,
    ) -> AuthResult<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthError::Config(format!("Invalid Argon2 parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            pepper,
        })
    }

    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        Self::new(
            config.argon2_memory_kib,
            config.argon2_iterations,
            config.argon2_parallelism,
            config.password_pepper.clone(),
        )
    }

    /// Hash a password into a PHC string with a fresh random salt.
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(self.peppered(password).as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::HashingFailed)
    }

    /// Check a password against a stored hash.
    ///
    /// Returns `false` for a wrong password and for a stored hash that does not parse.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };

        self.argon2
            .verify_password(self.peppered(password).as_bytes(), &parsed)
            .is_ok()
    }

    fn peppered(&self, password: &str) -> String {
        match &self.pepper {
            Some(pepper) => format!("{password}{pepper}"),
            None => password.to_string(),
        }
    }
}
