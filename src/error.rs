//! Error types for banksampah.
//!
//! Internally everything is an `anyhow::Error` with context attached as it propagates. At the
//! command boundary errors are tagged with an `ErrorType` so that callers can tell a rejected
//! request (e.g. insufficient balance) apart from a broken database or a missing login.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// The broad category of a public error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The data directory or `config.json` is missing or invalid.
    Config,
    /// A database operation failed.
    Database,
    /// The request was understood but rejected, e.g. insufficient balance or duplicate username.
    Request,
    /// Not logged in, bad credentials, or the user lacks the required role.
    Auth,
    /// A backup file could not be read, parsed or applied.
    Backup,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// An error with a public `ErrorType`.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            inner: inner.into(),
        }
    }

    /// Creates a `Request` error with the given message.
    pub fn request(message: impl Display) -> Self {
        Self::new(ErrorType::Request, anyhow::anyhow!("{message}"))
    }

    /// Creates an `Auth` error with the given message.
    pub fn auth(message: impl Display) -> Self {
        Self::new(ErrorType::Auth, anyhow::anyhow!("{message}"))
    }

    /// Creates a `Backup` error with the given message.
    pub fn backup(message: impl Display) -> Self {
        Self::new(ErrorType::Backup, anyhow::anyhow!("{message}"))
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// Finds the `ErrorType` of an `anyhow::Error` if one was attached anywhere in its chain.
    pub fn type_of(e: &anyhow::Error) -> Option<ErrorType> {
        e.chain()
            .find_map(|cause| cause.downcast_ref::<Error>())
            .map(Error::error_type)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.inner)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.inner)
    }
}

impl std::error::Error for Error {}

/// Converts any result into one that carries a public `ErrorType`.
pub trait IntoResult<T> {
    /// Tags the error with `error_type`. An error that already carries an `ErrorType` keeps it,
    /// so a `Request` error raised deep in the ledger is not relabeled as `Database`.
    fn pub_result(self, error_type: ErrorType) -> std::result::Result<T, Error>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> std::result::Result<T, Error> {
        self.map_err(|e| {
            let e = e.into();
            match e.downcast::<Error>() {
                Ok(typed) => typed,
                Err(e) => match Error::type_of(&e) {
                    Some(inner_type) => Error::new(inner_type, e),
                    None => Error::new(error_type, e),
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_pub_result_tags_plain_errors() {
        let r: std::result::Result<(), anyhow::Error> = Err(anyhow::anyhow!("disk on fire"));
        let e = r.pub_result(ErrorType::Database).unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Database);
        assert_eq!(e.to_string(), "disk on fire");
    }

    #[test]
    fn test_pub_result_keeps_existing_type() {
        let r: std::result::Result<(), Error> = Err(Error::request("Insufficient balance"));
        let e = r.pub_result(ErrorType::Database).unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Request);
    }

    #[test]
    fn test_pub_result_finds_type_under_context() {
        let r: std::result::Result<(), anyhow::Error> =
            Err(anyhow::Error::new(Error::auth("Not logged in"))).context("Unable to list users");
        let e = r.pub_result(ErrorType::Database).unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Auth);
        assert!(e.to_string().contains("Not logged in"));
    }

    #[test]
    fn test_error_type_display() {
        assert_eq!(ErrorType::Request.to_string(), "request");
        assert_eq!(ErrorType::Backup.to_string(), "backup");
    }
}
