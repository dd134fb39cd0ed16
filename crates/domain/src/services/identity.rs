//! Caller identity resolution.
//!
//! A bearer credential is turned into an external identity string either by
//! a remote verifier or, outside production, by a shared-secret bypass that
//! takes the identity from an explicit header. The strategy is chosen once
//! at startup.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use shared::crypto::constant_time_eq;

/// Header carrying the development subject on bypassed requests.
pub const DEV_SUBJECT_HEADER: &str = "X-Dev-Sub";

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub external_id: String,
    /// True when resolved through the development bypass. Outbound
    /// notifications are suppressed for such requests.
    pub bypassed: bool,
}

/// Failure reported by a remote verifier.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("verifier unreachable: {0}")]
    Transport(String),
    #[error("verifier returned status {0}")]
    Status(u16),
    #[error("malformed verifier response: {0}")]
    Malformed(String),
    #[error("verifier response has no subject")]
    MissingSubject,
}

/// Remote oracle that exchanges an identity token for a subject.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<String, VerifyError>;
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("missing or malformed bearer credential")]
    MissingCredential,
    /// Bypass secret matched but no subject header was supplied.
    #[error("X-Dev-Sub is required for dev auth")]
    MissingDevSubject,
    #[error("credential rejected: {0}")]
    Rejected(#[from] VerifyError),
}

/// Authentication strategy selected at startup.
#[derive(Clone)]
pub enum AuthStrategy {
    RemoteVerify,
    BypassWithHeader { secret: String },
}

impl std::fmt::Debug for AuthStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthStrategy::RemoteVerify => write!(f, "RemoteVerify"),
            AuthStrategy::BypassWithHeader { secret } => f
                .debug_struct("BypassWithHeader")
                .field("secret", &shared::crypto::redact(secret))
                .finish(),
        }
    }
}

/// Returns true for environment names that must never allow the bypass.
pub fn is_production(environment: &str) -> bool {
    matches!(
        environment.trim().to_ascii_lowercase().as_str(),
        "prod" | "production"
    )
}

/// Extracts the token from an `Authorization: Bearer <token>` value.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let token = authorization.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

pub struct IdentityResolver {
    strategy: AuthStrategy,
    verifier: Arc<dyn IdentityVerifier>,
}

impl IdentityResolver {
    pub fn new(strategy: AuthStrategy, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { strategy, verifier }
    }

    /// Picks the strategy from deployment settings: the bypass is armed only
    /// outside production and only when a non-empty secret is configured.
    pub fn from_environment(
        environment: &str,
        dev_auth_token: Option<&str>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        let strategy = match dev_auth_token.map(str::trim) {
            Some(secret) if !secret.is_empty() && !is_production(environment) => {
                tracing::warn!(environment = %environment, "Development auth bypass is enabled");
                AuthStrategy::BypassWithHeader {
                    secret: secret.to_string(),
                }
            }
            _ => AuthStrategy::RemoteVerify,
        };
        Self::new(strategy, verifier)
    }

    pub fn strategy(&self) -> &AuthStrategy {
        &self.strategy
    }

    pub fn bypass_enabled(&self) -> bool {
        matches!(self.strategy, AuthStrategy::BypassWithHeader { .. })
    }

    /// Resolve the caller from the raw `Authorization` header and the
    /// optional development subject header.
    pub async fn resolve(
        &self,
        authorization: Option<&str>,
        dev_subject: Option<&str>,
    ) -> Result<ResolvedIdentity, IdentityError> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or(IdentityError::MissingCredential)?;

        if let AuthStrategy::BypassWithHeader { secret } = &self.strategy {
            if constant_time_eq(token, secret) {
                let subject = dev_subject
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or(IdentityError::MissingDevSubject)?;
                tracing::debug!(external_id = %subject, "Resolved identity via dev bypass");
                return Ok(ResolvedIdentity {
                    external_id: subject.to_string(),
                    bypassed: true,
                });
            }
        }

        let external_id = self.verifier.verify(token).await.map_err(|e| {
            tracing::info!(error = %e, "Identity token verification failed");
            IdentityError::Rejected(e)
        })?;

        Ok(ResolvedIdentity {
            external_id,
            bypassed: false,
        })
    }
}

/// Verifier backed by a fixed token table, for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct MockIdentityVerifier {
    tokens: HashMap<String, String>,
    unreachable: bool,
}

impl MockIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A verifier whose every call fails at the transport level.
    pub fn unreachable() -> Self {
        Self {
            tokens: HashMap::new(),
            unreachable: true,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>, subject: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), subject.into());
        self
    }
}

#[async_trait]
impl IdentityVerifier for MockIdentityVerifier {
    async fn verify(&self, id_token: &str) -> Result<String, VerifyError> {
        if self.unreachable {
            return Err(VerifyError::Transport("connection refused".to_string()));
        }
        self.tokens
            .get(id_token)
            .cloned()
            .ok_or(VerifyError::Status(400))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBJECT: &str = "U0123456789abcdef0123456789abcdef";

    fn verifier() -> Arc<dyn IdentityVerifier> {
        Arc::new(MockIdentityVerifier::new().with_token("good-token", SUBJECT))
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn test_production_disables_bypass() {
        for env in ["prod", "PROD", "production", " Production "] {
            let resolver = IdentityResolver::from_environment(env, Some("secret"), verifier());
            assert!(!resolver.bypass_enabled(), "{} must not bypass", env);
        }
    }

    #[test]
    fn test_bypass_requires_secret() {
        assert!(!IdentityResolver::from_environment("dev", None, verifier()).bypass_enabled());
        assert!(!IdentityResolver::from_environment("dev", Some("  "), verifier()).bypass_enabled());
        assert!(IdentityResolver::from_environment("dev", Some("s3cret"), verifier()).bypass_enabled());
    }

    #[test]
    fn test_strategy_debug_redacts_secret() {
        let resolver = IdentityResolver::from_environment("dev", Some("s3cret"), verifier());
        let debug = format!("{:?}", resolver.strategy());
        assert!(!debug.contains("s3cret"));
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let resolver = IdentityResolver::new(AuthStrategy::RemoteVerify, verifier());
        let err = resolver.resolve(None, None).await.unwrap_err();
        assert!(matches!(err, IdentityError::MissingCredential));

        let err = resolver.resolve(Some("Token abc"), None).await.unwrap_err();
        assert!(matches!(err, IdentityError::MissingCredential));
    }

    #[tokio::test]
    async fn test_remote_verify_success() {
        let resolver = IdentityResolver::new(AuthStrategy::RemoteVerify, verifier());
        let identity = resolver
            .resolve(Some("Bearer good-token"), None)
            .await
            .unwrap();
        assert_eq!(identity.external_id, SUBJECT);
        assert!(!identity.bypassed);
    }

    #[tokio::test]
    async fn test_remote_verify_failures_are_rejections() {
        let resolver = IdentityResolver::new(AuthStrategy::RemoteVerify, verifier());
        let err = resolver
            .resolve(Some("Bearer bad-token"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Rejected(VerifyError::Status(400))));

        let offline = IdentityResolver::new(
            AuthStrategy::RemoteVerify,
            Arc::new(MockIdentityVerifier::unreachable()),
        );
        let err = offline
            .resolve(Some("Bearer good-token"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Rejected(VerifyError::Transport(_))));
    }

    #[tokio::test]
    async fn test_bypass_uses_header_subject() {
        let resolver = IdentityResolver::from_environment("dev", Some("s3cret"), verifier());
        let identity = resolver
            .resolve(Some("Bearer s3cret"), Some("Udev"))
            .await
            .unwrap();
        assert_eq!(identity.external_id, "Udev");
        assert!(identity.bypassed);
    }

    #[tokio::test]
    async fn test_bypass_without_subject_is_distinct_error() {
        let resolver = IdentityResolver::from_environment("dev", Some("s3cret"), verifier());
        let err = resolver
            .resolve(Some("Bearer s3cret"), Some("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::MissingDevSubject));
    }

    #[tokio::test]
    async fn test_bypass_mismatch_falls_back_to_verifier() {
        let resolver = IdentityResolver::from_environment("dev", Some("s3cret"), verifier());
        let identity = resolver
            .resolve(Some("Bearer good-token"), Some("Uignored"))
            .await
            .unwrap();
        assert_eq!(identity.external_id, SUBJECT);
        assert!(!identity.bypassed);
    }

    #[tokio::test]
    async fn test_production_ignores_dev_header() {
        let resolver = IdentityResolver::from_environment("prod", Some("s3cret"), verifier());
        let err = resolver
            .resolve(Some("Bearer s3cret"), Some("Udev"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Rejected(_)));
    }
}
