//! Authentication error types.

use crate::Role;
use portal_storage::StorageError;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Wrong email or password
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// An account already exists for this email
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// Password rejected by validation or by the provider
    #[error("Password too weak: {0}")]
    WeakPassword(String),

    /// Provider or role store unreachable (transient, can retry)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Operation needs a signed-in identity
    #[error("Not signed in")]
    Unauthenticated,

    /// A concurrent write already stored a different role
    #[error("Role already set to {actual}")]
    Conflict { actual: Role },

    /// Required form fields were empty
    #[error("Missing required fields: {0}")]
    MissingFields(String),

    /// Role cannot be assigned
    #[error("Role '{0}' cannot be assigned")]
    InvalidRole(Role),

    /// Invalid state transition in the credential FSM
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// Credential storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything the provider returned that is not classified above
    #[error("Auth error: {0}")]
    Unknown(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() || e.is_request() {
            AuthError::NetworkError(e.to_string())
        } else if e.status().is_some_and(|s| s.is_server_error()) {
            AuthError::NetworkError(e.to_string())
        } else {
            AuthError::Unknown(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        AuthError::Unknown(format!("unexpected response: {e}"))
    }
}

impl From<url::ParseError> for AuthError {
    fn from(e: url::ParseError) -> Self {
        AuthError::Config(format!("invalid URL: {e}"))
    }
}

/// How a front end surfaces an [`AuthError`] to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPresentation {
    /// Shown next to the form that produced it
    InlineFormError,
    /// Offer the user a retry
    RetryPrompt,
    /// No message, send the user to sign-in
    SilentRedirect,
    /// Generic "something went wrong"
    Generic,
}

impl AuthError {
    /// Returns true if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::NetworkError(_))
    }

    pub fn presentation(&self) -> ErrorPresentation {
        match self {
            AuthError::InvalidCredentials(_)
            | AuthError::EmailTaken(_)
            | AuthError::WeakPassword(_)
            | AuthError::MissingFields(_) => ErrorPresentation::InlineFormError,
            AuthError::NetworkError(_) => ErrorPresentation::RetryPrompt,
            AuthError::Unauthenticated => ErrorPresentation::SilentRedirect,
            _ => ErrorPresentation::Generic,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

/// Failure to read a role association. A missing row is not an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleResolutionError {
    #[error("Role lookup failed: {0}")]
    NetworkError(String),
}

/// Role store failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleStoreError {
    /// Backend unreachable or returned a server error
    #[error("Role store unavailable: {0}")]
    Unavailable(String),

    /// Compare-and-set lost against a concurrent writer
    #[error("Role already set to {actual}")]
    Conflict { actual: Role },

    /// No valid credential for the backend
    #[error("Role store requires a signed-in user")]
    Unauthenticated,

    /// Backend refused the request
    #[error("Role store rejected request: {0}")]
    Rejected(String),
}

impl From<RoleStoreError> for RoleResolutionError {
    fn from(e: RoleStoreError) -> Self {
        RoleResolutionError::NetworkError(e.to_string())
    }
}

impl From<RoleStoreError> for AuthError {
    fn from(e: RoleStoreError) -> Self {
        match e {
            RoleStoreError::Unavailable(msg) => AuthError::NetworkError(msg),
            RoleStoreError::Conflict { actual } => AuthError::Conflict { actual },
            RoleStoreError::Unauthenticated => AuthError::Unauthenticated,
            RoleStoreError::Rejected(msg) => AuthError::Unknown(msg),
        }
    }
}
