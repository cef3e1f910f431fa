//! Session manager configuration.

use std::fmt;
use std::time::Duration;

/// Default access token lifetime (15 minutes)
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Default refresh token lifetime (7 days)
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Longest accepted lifetime for either token kind (365 days)
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Default Argon2 memory cost in KiB (19 MiB, the OWASP baseline)
pub const DEFAULT_ARGON2_MEMORY_KIB: u32 = 19_456;

/// Default Argon2 iteration count
pub const DEFAULT_ARGON2_ITERATIONS: u32 = 2;

/// Default Argon2 lanes
pub const DEFAULT_ARGON2_PARALLELISM: u32 = 1;

/// Immutable configuration for the [`SessionManager`](super::SessionManager).
///
/// Built once at startup and shared behind an `Arc`; nothing inside the library reads the
/// process environment.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens
    pub jwt_secret: String,

    /// Lifetime of access tokens
    pub access_token_ttl: Duration,

    /// Lifetime of refresh tokens
    pub refresh_token_ttl: Duration,

    /// Optional server-side secret appended to passwords before hashing
    pub password_pepper: Option<String>,

    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,

    /// Revoke every active refresh token of an owner when one of their revoked tokens is
    /// presented to refresh again.
    ///
    /// The ledger does not record why a token was revoked, so a token revoked by logout
    /// triggers this as well as one revoked by rotation.
    pub revoke_sessions_on_reuse: bool,
}

impl AuthConfig {
    /// Create a configuration with default lifetimes and work factors.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL,
            password_pepper: None,
            argon2_memory_kib: DEFAULT_ARGON2_MEMORY_KIB,
            argon2_iterations: DEFAULT_ARGON2_ITERATIONS,
            argon2_parallelism: DEFAULT_ARGON2_PARALLELISM,
            revoke_sessions_on_reuse: false,
        }
    }

    pub fn with_token_ttls(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_token_ttl = access;
        self.refresh_token_ttl = refresh;
        self
    }

    pub fn with_pepper(mut self, pepper: impl Into<String>) -> Self {
        self.password_pepper = Some(pepper.into());
        self
    }

    pub fn with_argon2_params(mut self, memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        self.argon2_memory_kib = memory_kib;
        self.argon2_iterations = iterations;
        self.argon2_parallelism = parallelism;
        self
    }

    pub fn with_reuse_revocation(mut self, enabled: bool) -> Self {
        self.revoke_sessions_on_reuse = enabled;
        self
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field(
                "password_pepper",
                &self.password_pepper.as_ref().map(|_| "<redacted>"),
            )
            .field("argon2_memory_kib", &self.argon2_memory_kib)
            .field("argon2_iterations", &self.argon2_iterations)
            .field("argon2_parallelism", &self.argon2_parallelism)
            .field("revoke_sessions_on_reuse", &self.revoke_sessions_on_reuse)
            .finish()
    }
}

/// Parse a duration string such as `15m`, `7d` or `1h30m`.
///
/// The input is a sequence of `<integer><unit>` groups with units `ms`, `s`, `m`, `h` and
/// `d`. Returns `None` for anything else, and for a total of zero.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use taskdeck::auth::parse_duration;
///
/// assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
/// assert_eq!(parse_duration("abc"), None);
/// ```
pub fn parse_duration(input: &str) -> Option<Duration> {
    let mut rest = input.trim();
    if rest.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return None;
        }
        let value: u64 = rest[..digits_end].parse().ok()?;
        rest = &rest[digits_end..];

        let unit_end = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let millis_per_unit: u64 = match &rest[..unit_end] {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            _ => return None,
        };
        rest = &rest[unit_end..];

        total = total.checked_add(Duration::from_millis(value.checked_mul(millis_per_unit)?))?;
    }

    (!total.is_zero()).then_some(total)
}

/// Parse an optional duration string, falling back to `default` when it is absent or
/// unusable.
pub fn parse_duration_or(input: Option<&str>, default: Duration) -> Duration {
    match input {
        None => default,
        Some(raw) => parse_duration(raw).unwrap_or_else(|| {
            log::warn!("Invalid duration {raw:?}, using default of {default:?}");
            default
        }),
    }
}
