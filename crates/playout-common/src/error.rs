//! Common error types used throughout playout.
//!
//! Every failure is classified into one of four kinds (see [`ErrorKind`]):
//! validation and not-found errors are surfaced to the caller and never
//! retried, dependency errors mean a collaborator (store, render dispatch,
//! mixer) could not be reached, and internal errors cover everything else.

use std::fmt;

use crate::ids::EntryId;

/// Common error type for playout.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A schedule entry would overlap an existing entry on the same channel.
    #[error("time already scheduled: overlaps entry {entry_id}")]
    ScheduleConflict { entry_id: EntryId },

    /// A conflicting resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The requested feature exists in the data model but is not supported.
    #[error("{0} not implemented")]
    NotImplemented(String),

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An external collaborator could not be reached or rejected the request.
    #[error("{service} error: {message}")]
    Dependency { service: String, message: String },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Dependency,
    Internal,
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create a new Validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new Dependency error.
    pub fn dependency(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dependency {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_)
            | Error::ScheduleConflict { .. }
            | Error::Conflict(_)
            | Error::NotImplemented(_) => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Database(_) | Error::Dependency { .. } => ErrorKind::Dependency,
            Error::Io(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::NotImplemented(_) => 422,
            Error::ScheduleConflict { .. } | Error::Conflict(_) => 409,
            Error::Database(_) => 503,
            Error::Dependency { .. } => 502,
            Error::Io(_) | Error::Internal(_) => 500,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
