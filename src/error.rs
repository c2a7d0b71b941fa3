use thiserror::Error;
use reqwest::StatusCode;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Credential error: {0}")]
    DecodeError(#[from] DecodeError),

    #[error("Token storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("API error: {0}")]
    ApiError(#[from] ApiError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        ClientError::ConfigError(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::ConfigError(format!("invalid API base URL: {}", err))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::StorageError(StorageError::Io(err.to_string()))
    }
}

impl ClientError {
    /// Text suitable for an inline form message.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::AuthError(e) => e.detail().to_string(),
            ClientError::DecodeError(_) => {
                "Your session could not be read. Please sign in again.".to_string()
            }
            ClientError::StorageError(_) => {
                "Your session could not be saved on this device.".to_string()
            }
            ClientError::ApiError(ApiError::Rejected { detail, .. }) => detail.clone(),
            ClientError::ApiError(ApiError::Unauthorized) => {
                "Your session has expired. Please sign in again.".to_string()
            }
            ClientError::ApiError(ApiError::InvalidUpload(msg)) => msg.clone(),
            ClientError::ApiError(e) => e.to_string(),
            ClientError::ConfigError(e) => e.clone(),
            ClientError::AccessDenied(_) => "Please sign in to continue.".to_string(),
        }
    }

    /// True when the error means the stored credential is no longer usable.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::DecodeError(_) | ClientError::ApiError(ApiError::Unauthorized)
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Federated login rejected: {0}")]
    FederatedAuthRejected(String),

    #[error("Registration rejected: {0}")]
    RegistrationRejected(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("{message}")]
    PortalMismatch { message: String },
}

impl AuthError {
    pub fn detail(&self) -> &str {
        match self {
            AuthError::InvalidCredentials(d)
            | AuthError::FederatedAuthRejected(d)
            | AuthError::RegistrationRejected(d)
            | AuthError::NetworkFailure(d)
            | AuthError::UnexpectedResponse(d) => d,
            AuthError::PortalMismatch { message } => message,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AuthError::UnexpectedResponse(err.to_string())
        } else {
            AuthError::NetworkFailure(err.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed credential: {0}")]
    MalformedCredential(String),

    #[error("Credential has no role claim")]
    MissingRoleClaim,
}

impl From<jsonwebtoken::errors::Error> for DecodeError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        DecodeError::MalformedCredential(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("I/O failure: {0}")]
    Io(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthorized,

    #[error("Request rejected ({status}): {detail}")]
    Rejected { status: StatusCode, detail: String },

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Invalid response body: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    InvalidUpload(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::NetworkFailure(err.to_string())
        }
    }
}
