use thiserror::Error;

use crate::status::ApplicationStatus;

/// Coarse error class reported at the command boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidArgument,
    InvalidCredentials,
    Unauthenticated,
    Conflict,
    Internal,
}

/// Errors produced by the tracker core.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Token error: {0}")]
    Token(String),
}

impl TrackerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::NotFound(_) => ErrorKind::NotFound,
            TrackerError::Forbidden(_) => ErrorKind::Forbidden,
            TrackerError::InvalidArgument(_) | TrackerError::InvalidTransition { .. } => {
                ErrorKind::InvalidArgument
            }
            TrackerError::InvalidCredentials => ErrorKind::InvalidCredentials,
            TrackerError::Unauthenticated => ErrorKind::Unauthenticated,
            TrackerError::Conflict(_) => ErrorKind::Conflict,
            TrackerError::Database(_)
            | TrackerError::Serialization(_)
            | TrackerError::Io(_)
            | TrackerError::PasswordHash(_)
            | TrackerError::Token(_) => ErrorKind::Internal,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        TrackerError::InvalidArgument(message.into())
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
