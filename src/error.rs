//! Error types for the driver.
//!
//! Two taxonomies are kept apart: [`ClassifiedError`] is what the server (or a
//! broken byte stream) told us about a query, [`CursorError`] is the caller
//! driving a cursor out of contract. Transport failures that do not indicate
//! protocol corruption pass through unchanged as [`Error::Driver`].

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::protocol::{DriverError, RawResponse, RuntimeErrorType};

/// Outcome categories of a failed classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server could not parse or compile the query
    BadQuery,
    /// The query was valid but failed while executing
    RuntimeFailure,
    /// The response cannot be reconciled with any known protocol variant
    BrokenClient,
    /// Well-formed response, but not the shape the consumption mode asked for
    WrongResponseType,
}

impl ErrorKind {
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::BadQuery => "reql: server could not make sense of our query",
            ErrorKind::RuntimeFailure => "reql: server could not execute our query",
            ErrorKind::BrokenClient => {
                "reql: looks like there is a bug in this client library, please report it"
            }
            ErrorKind::WrongResponseType => {
                "reql: wrong response type, you may have used the wrong one of: exec(), one(), all()"
            }
        }
    }
}

/// A server or protocol failure, carrying the response that triggered it
#[derive(Debug, Clone)]
pub struct ClassifiedError {
    kind: ErrorKind,
    response: Option<Arc<RawResponse>>,
    detail: Option<String>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, response: Arc<RawResponse>) -> Self {
        Self {
            kind,
            response: Some(response),
            detail: None,
        }
    }

    /// An error with no response to point at, e.g. an undecodable frame.
    pub fn without_response(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            response: None,
            detail: Some(detail.into()),
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The response that triggered this error
    pub fn response(&self) -> Option<&RawResponse> {
        self.response.as_deref()
    }

    /// The error text sent by the server, if any
    pub fn server_message(&self) -> Option<&str> {
        self.response.as_deref().and_then(RawResponse::message)
    }

    pub fn runtime_error_type(&self) -> Option<RuntimeErrorType> {
        self.response
            .as_deref()
            .and_then(|r| r.error_type)
            .and_then(RuntimeErrorType::from_code)
    }

    pub fn backtrace(&self) -> Option<&[serde_json::Value]> {
        self.response
            .as_deref()
            .and_then(|r| r.backtrace.as_deref())
    }

    /// Internal-defect signal, worth reporting upstream
    pub fn is_broken_client(&self) -> bool {
        self.kind == ErrorKind::BrokenClient
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.message())?;
        if let Some(msg) = self.server_message() {
            write!(f, ": {}", msg)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for ClassifiedError {}

/// Caller misuse of a cursor
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorError {
    #[error("reql: rows closed")]
    RowsClosed,

    #[error("reql: no rows in the result set")]
    NoRows,

    #[error("reql: decode called without calling advance")]
    NoCurrentRow,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Classified(#[from] ClassifiedError),

    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error(transparent)]
    Driver(DriverError),

    #[error("reql: could not decode row: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("reql: invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Route a transport failure: corruption of the byte stream is a client
    /// defect, anything else is surfaced as the transport reported it.
    pub fn from_transport(err: DriverError) -> Self {
        if err.is_protocol_corruption() {
            tracing::warn!("Transport reported protocol corruption: {}", err);
            Error::Classified(ClassifiedError::without_response(
                ErrorKind::BrokenClient,
                err.to_string(),
            ))
        } else {
            Error::Driver(err)
        }
    }

    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Error::Classified(err) => Some(err),
            _ => None,
        }
    }

    pub fn cursor(&self) -> Option<CursorError> {
        match self {
            Error::Cursor(err) => Some(*err),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.classified().map(ClassifiedError::kind)
    }

    pub fn is_broken_client(&self) -> bool {
        self.kind() == Some(ErrorKind::BrokenClient)
    }
}

impl From<DriverError> for Error {
    fn from(err: DriverError) -> Self {
        Error::from_transport(err)
    }
}
