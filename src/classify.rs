//! Response classification
//!
//! Maps a [`RawResponse`] to either a [`Payload`] or a [`ClassifiedError`].
//! Checks run in a fixed order and the first match wins: query rejected,
//! execution failed, structurally broken, wrong shape for the caller, success.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{ClassifiedError, ErrorKind};
use crate::protocol::{RawResponse, ResponseType};

/// What the consuming call wants out of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expect {
    /// Manual cursor iteration, any success is usable
    #[default]
    Any,
    /// A row sequence, as `all()` needs
    Rows,
    /// Something to read a value from, as `one()` needs
    Single,
    /// Nothing at all, as `exec()` needs
    Nothing,
}

impl Expect {
    pub fn admits(self, payload: &Payload) -> bool {
        self.admits_shape(payload.shape())
    }

    pub fn admits_shape(self, shape: Shape) -> bool {
        match self {
            Expect::Any | Expect::Nothing => true,
            Expect::Rows => shape == Shape::Rows,
            Expect::Single => shape != Shape::Nothing,
        }
    }
}

/// Coarse form of a payload, all a consumption mode cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Rows,
    Scalar,
    Nothing,
}

/// Decoded content of a successful response
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A single value
    Atom(Value),
    /// A batch of rows; `complete == false` means the server holds more
    Sequence { rows: Vec<Value>, complete: bool },
    /// Acknowledgement with no content
    Empty,
}

impl Payload {
    /// Sequences and atoms holding an array can both be consumed row by row.
    pub fn shape(&self) -> Shape {
        match self {
            Payload::Sequence { .. } => Shape::Rows,
            Payload::Atom(value) if value.is_array() => Shape::Rows,
            Payload::Atom(_) => Shape::Scalar,
            Payload::Empty => Shape::Nothing,
        }
    }

    pub fn is_row_sequence(&self) -> bool {
        self.shape() == Shape::Rows
    }
}

/// Classify a response for manual cursor iteration.
pub fn classify(raw: RawResponse) -> Result<Payload, ClassifiedError> {
    classify_as(raw, Expect::Any)
}

pub fn classify_as(raw: RawResponse, expect: Expect) -> Result<Payload, ClassifiedError> {
    let kind = match raw.kind() {
        Some(kind) => kind,
        None => {
            let detail = format!("unknown response type {}", raw.response_type);
            return Err(reject(ErrorKind::BrokenClient, raw).with_detail(detail));
        }
    };

    match kind {
        ResponseType::CompileError => return Err(reject(ErrorKind::BadQuery, raw)),
        ResponseType::RuntimeError => return Err(reject(ErrorKind::RuntimeFailure, raw)),
        ResponseType::ClientError => return Err(reject(ErrorKind::BrokenClient, raw)),
        ResponseType::ServerInfo => {
            return Err(reject(ErrorKind::BrokenClient, raw)
                .with_detail("server info received in reply to a query"))
        }
        ResponseType::SuccessAtom if raw.results.len() != 1 => {
            let detail = format!("atom response with {} results", raw.results.len());
            return Err(reject(ErrorKind::BrokenClient, raw).with_detail(detail));
        }
        _ => {}
    }

    let payload = match kind {
        ResponseType::SuccessAtom => {
            let mut results = raw.results;
            Payload::Atom(results.pop().unwrap_or(Value::Null))
        }
        ResponseType::SuccessSequence | ResponseType::SuccessPartial => Payload::Sequence {
            rows: raw.results,
            complete: kind == ResponseType::SuccessSequence,
        },
        _ => Payload::Empty,
    };

    if !expect.admits(&payload) {
        tracing::debug!(token = raw.token, ?expect, "Response shape does not match");
        let header = RawResponse {
            results: payload_results(payload),
            ..raw
        };
        return Err(ClassifiedError::new(
            ErrorKind::WrongResponseType,
            Arc::new(header),
        ));
    }

    Ok(payload)
}

fn reject(kind: ErrorKind, raw: RawResponse) -> ClassifiedError {
    match kind {
        ErrorKind::BrokenClient => tracing::warn!(
            token = raw.token,
            response_type = raw.response_type,
            "Response could not be reconciled with the protocol"
        ),
        _ => tracing::debug!(
            token = raw.token,
            message = raw.message().unwrap_or_default(),
            "Query failed: {}",
            kind.message()
        ),
    }
    ClassifiedError::new(kind, Arc::new(raw))
}

fn payload_results(payload: Payload) -> Vec<Value> {
    match payload {
        Payload::Atom(value) => vec![value],
        Payload::Sequence { rows, .. } => rows,
        Payload::Empty => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compile_error_wins_over_shape() {
        let mut raw = RawResponse::error(1, ResponseType::CompileError, "Expected 1 argument");
        raw.results.push(json!("junk"));
        let err = classify_as(raw, Expect::Rows).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadQuery);
    }

    #[test]
    fn test_atom_with_two_results_is_broken() {
        let raw = RawResponse::new(1, ResponseType::SuccessAtom, vec![json!(1), json!(2)]);
        let err = classify(raw).unwrap_err();
        assert!(err.is_broken_client());
        assert!(err.to_string().contains("2 results"));
    }

    #[test]
    fn test_wrong_type_keeps_response() {
        let raw = RawResponse::atom(9, json!(42));
        let err = classify_as(raw, Expect::Rows).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongResponseType);
        assert_eq!(err.response().unwrap().results, vec![json!(42)]);
        assert_eq!(err.response().unwrap().token, 9);
    }

    #[test]
    fn test_expect_admits() {
        let rows = Payload::Sequence {
            rows: vec![],
            complete: true,
        };
        assert!(Expect::Rows.admits(&rows));
        assert!(Expect::Rows.admits(&Payload::Atom(json!([1, 2]))));
        assert!(!Expect::Rows.admits(&Payload::Atom(json!("scalar"))));
        assert!(!Expect::Single.admits(&Payload::Empty));
        assert!(Expect::Nothing.admits(&Payload::Empty));
    }
}
