// Copyright (c) 2016 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

pub use url::ParseError;

use thiserror::Error;

use std::{error::Error as StdError, io, result};

use crate::version::VersionToken;

/// Result type alias for this library.
pub type Result<T> = result::Result<T, Error>;

/// This type enumerates library errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Config error: `{}'", _0)]
    Config(#[source] ConfigError),

    #[error("Connection error: {}", _0)]
    Connection(#[source] ConnectionError),

    #[error("Version comparison error: {}", _0)]
    Comparison(#[source] ComparisonError),

    #[error("URL error: `{}'", _0)]
    Url(#[source] UrlError),
}

impl Error {
    /// Returns true if the error means that connection is broken.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Connection(err) => err.is_fatal(),
            Error::Config(_) | Error::Comparison(_) | Error::Url(_) => false,
        }
    }
}

/// This type enumerates connection option errors.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value `{}' for connection option `{}'", value, field)]
    InvalidValue { field: String, value: String },

    #[error("Unknown connection option `{}'", param)]
    UnknownParameter { param: String },
}

impl ConfigError {
    pub(crate) fn invalid<F, V>(field: F, value: V) -> Self
    where
        F: Into<String>,
        V: Into<String>,
    {
        ConfigError::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// This type enumerates connection URL errors.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum UrlError {
    #[error("Invalid or incomplete connection URL")]
    Invalid,

    #[error("URL parse error: {}", _0)]
    Parse(#[source] ParseError),

    #[error("Unsupported connection URL scheme `{}'", scheme)]
    UnsupportedScheme { scheme: String },
}

/// This type represents MySql server error.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error("ERROR {} ({}): {}", state, code, message)]
pub struct ServerError {
    pub code: u16,
    pub message: String,
    pub state: String,
}

impl ServerError {
    pub fn new<M: Into<String>>(code: u16, message: M) -> Self {
        ServerError {
            code,
            message: message.into(),
            state: "HY000".to_owned(),
        }
    }

    pub fn with_state<S: Into<String>>(mut self, state: S) -> Self {
        self.state = state.into();
        self
    }
}

/// Errors reported by a [`crate::ConnectionLike`] implementation.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Input/output error: {}", _0)]
    Io(#[source] io::Error),

    #[error("Server error: `{}'", _0)]
    Server(#[source] ServerError),

    #[error("Connection to the server is closed.")]
    ConnectionClosed,

    #[error("Other error: {}", _0)]
    Other(#[source] Box<dyn StdError + Send + Sync + 'static>),
}

impl ConnectionError {
    /// Returns true if the error means that connection is broken.
    pub fn is_fatal(&self) -> bool {
        match self {
            ConnectionError::Io(_)
            | ConnectionError::ConnectionClosed
            | ConnectionError::Other(_) => true,
            ConnectionError::Server(_) => false,
        }
    }

    pub fn other<T>(err: T) -> Self
    where
        T: StdError + Send + Sync + 'static,
    {
        ConnectionError::Other(Box::new(err))
    }
}

/// Two server versions hold tokens of different kinds at the first position they differ.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error(
    "Can't compare version token `{}' with `{}' at position {}",
    left,
    right,
    position
)]
pub struct ComparisonError {
    pub position: usize,
    pub left: VersionToken,
    pub right: VersionToken,
}

/// Reason a capability probe could not answer.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error("Capability probe failed: {}", reason)]
pub struct ProbeError {
    pub reason: String,
}

impl ProbeError {
    pub fn new<T: Into<String>>(reason: T) -> Self {
        ProbeError {
            reason: reason.into(),
        }
    }
}

/// Returns the server diagnostic code carried by `err`, if any.
///
/// Walks the `source()` chain and returns the code of the first [`ServerError`] found.
/// Errors of any other shape yield `None`.
pub fn extract_error_code(err: &(dyn StdError + 'static)) -> Option<u16> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(server) = err.downcast_ref::<ServerError>() {
            return Some(server.code);
        }
        current = err.source();
    }
    None
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<ComparisonError> for Error {
    fn from(err: ComparisonError) -> Self {
        Error::Comparison(err)
    }
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::Url(err)
    }
}

impl From<io::Error> for ConnectionError {
    fn from(err: io::Error) -> Self {
        ConnectionError::Io(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Connection(err.into())
    }
}

impl From<ServerError> for ConnectionError {
    fn from(err: ServerError) -> Self {
        ConnectionError::Server(err)
    }
}

impl From<ServerError> for Error {
    fn from(err: ServerError) -> Self {
        Error::Connection(err.into())
    }
}

impl From<ParseError> for UrlError {
    fn from(err: ParseError) -> Self {
        UrlError::Parse(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Url(err.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_extract_code_from_server_error() {
        let err = ServerError::new(1045, "Access denied");
        assert_eq!(extract_error_code(&err), Some(1045));
    }

    #[test]
    fn should_extract_code_through_source_chain() {
        let err = Error::from(ServerError::new(2006, "MySQL server has gone away"));
        assert_eq!(extract_error_code(&err), Some(2006));
    }

    #[test]
    fn should_not_extract_code_from_other_shapes() {
        let err = Error::from(ConnectionError::ConnectionClosed);
        assert_eq!(extract_error_code(&err), None);

        let err = io::Error::new(io::ErrorKind::Other, "boom");
        assert_eq!(extract_error_code(&err), None);
    }

    #[test]
    fn server_errors_are_not_fatal() {
        assert!(!Error::from(ServerError::new(1062, "Duplicate entry")).is_fatal());
        assert!(Error::from(ConnectionError::ConnectionClosed).is_fatal());
        assert!(!Error::from(ConfigError::invalid("port", "x")).is_fatal());
    }
}
