//! Handshake authentication
//!
//! The auth gate runs before the WebSocket upgrade is accepted: a rejected
//! credential produces a 401 and no gateway state is ever created for the
//! connection. Expired and malformed credentials are indistinguishable to
//! the client.

use async_trait::async_trait;
use relay_common::JwtService;
use relay_core::{AuthIdentity, CredentialVerifier, DomainError, DomainResult};
use std::sync::Arc;
use thiserror::Error;

/// Handshake authentication errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authentication token required")]
    MissingCredential,

    #[error("Invalid token")]
    InvalidCredential,
}

/// Validates bearer credentials at handshake time
pub struct AuthGate {
    verifier: Arc<dyn CredentialVerifier>,
}

impl AuthGate {
    /// Create a new auth gate backed by the given verifier
    #[must_use]
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }

    /// Resolve a bearer credential to a user identity
    ///
    /// Accepts the raw token with or without a `Bearer ` prefix.
    ///
    /// # Errors
    /// `MissingCredential` for an empty token, `InvalidCredential` for
    /// anything the verifier rejects.
    pub async fn authenticate(&self, credential: &str) -> Result<AuthIdentity, AuthError> {
        let token = credential.strip_prefix("Bearer ").unwrap_or(credential).trim();

        if token.is_empty() {
            return Err(AuthError::MissingCredential);
        }

        self.verifier.verify(token).await.map_err(|e| {
            tracing::debug!(error = %e, "Credential verification failed");
            AuthError::InvalidCredential
        })
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate").finish()
    }
}

/// Default credential verifier: validates HS256 access tokens
///
/// The auth service denormalizes display fields into the token claims, so
/// identity resolution needs no storage round-trip.
pub struct JwtVerifier {
    jwt: JwtService,
}

impl JwtVerifier {
    #[must_use]
    pub fn new(jwt: JwtService) -> Self {
        Self { jwt }
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> DomainResult<AuthIdentity> {
        let claims = self
            .jwt
            .validate_access_token(token)
            .map_err(|_| DomainError::CredentialRejected)?;

        let user_id = claims.user_id().map_err(|_| DomainError::CredentialRejected)?;

        Ok(AuthIdentity {
            user_id,
            display_name: claims.name,
            avatar: claims.avatar,
        })
    }
}
