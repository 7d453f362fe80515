//! Crate-wide error taxonomy.
//!
//! Every failure a caller can observe through the registry, the credential
//! manager or a session registry is one of these variants. Refresh failures are
//! always attributed to exactly one provider so the caller can ask the user to
//! re-authenticate with the right identity provider.

use crate::store;
use crate::types::ProviderKind;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("cluster {0} not found")]
    NotFound(String),

    #[error("no cluster is selected")]
    NoCurrentCluster,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("failed to persist settings: {0}")]
    Persistence(#[source] Arc<store::Error>),

    #[error("invalid session request: {0}")]
    InvalidRequest(String),

    #[error("failed to open session transport: {0}")]
    Transport(String),
}

impl From<store::Error> for Error {
    fn from(err: store::Error) -> Self {
        Error::Persistence(Arc::new(err))
    }
}

/// A refresh that could not produce a usable credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("re-authenticate with {provider}: {cause}")]
pub struct AuthError {
    pub provider: ProviderKind,
    pub cause: AuthCause,
}

impl AuthError {
    pub fn new(provider: ProviderKind, cause: AuthCause) -> Self {
        Self { provider, cause }
    }

    pub fn network(provider: ProviderKind, err: impl std::fmt::Display) -> Self {
        Self::new(provider, AuthCause::Network(err.to_string()))
    }

    pub fn malformed(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::new(provider, AuthCause::MalformedCredentials(message.into()))
    }

    pub fn rejected(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::new(provider, AuthCause::Provider(message.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthCause {
    #[error("network failure: {0}")]
    Network(String),

    #[error("malformed credentials: {0}")]
    MalformedCredentials(String),

    #[error("identity provider rejected the refresh: {0}")]
    Provider(String),

    #[error("issued credential is already expired")]
    ZeroValidity,

    #[error("refresh timed out after {0:?}")]
    Timeout(Duration),

    #[error("refresh task aborted: {0}")]
    Aborted(String),
}
