//! Driver Protocol Tests
//!
//! Tests for the MessagePack-based wire format including:
//! - Query encoding
//! - Response decoding
//! - Frame limits

use reql_driver::protocol::{
    decode_message, encode_frame, encode_query, DriverError, Query, QueryType, RawResponse,
    ResponseType, RuntimeErrorType, MAX_MESSAGE_SIZE,
};
use serde::Serialize;
use serde_json::{json, Map};
use tokio_test::{assert_err, assert_ok};

// ============================================================================
// Query Serialization Tests
// ============================================================================

#[test]
fn test_query_start() {
    let mut optargs = Map::new();
    optargs.insert("db".to_string(), json!("marvel"));
    let query = Query::start(1, json!([15, ["heroes"]]), Some(optargs));

    let encoded = assert_ok!(encode_query(&query));
    let decoded: Query = assert_ok!(decode_message(&encoded[4..]));

    assert_eq!(decoded.query_type, QueryType::Start);
    assert_eq!(decoded.term, Some(json!([15, ["heroes"]])));
    assert_eq!(decoded.global_optargs.unwrap()["db"], "marvel");
}

#[test]
fn test_query_continue_has_no_term() {
    let encoded = encode_query(&Query::continue_(5)).unwrap();
    let decoded: Query = decode_message(&encoded[4..]).unwrap();

    assert_eq!(decoded.token, 5);
    assert_eq!(decoded.query_type, QueryType::Continue);
    assert!(decoded.term.is_none());
    assert!(decoded.global_optargs.is_none());
}

#[test]
fn test_query_stop_and_wait() {
    assert_eq!(Query::stop(2).query_type, QueryType::Stop);
    assert_eq!(Query::noreply_wait(3).query_type, QueryType::NoreplyWait);
}

#[test]
fn test_noreply_flag() {
    let mut optargs = Map::new();
    optargs.insert("noreply".to_string(), json!(true));
    assert!(Query::start(1, json!(null), Some(optargs)).is_noreply());
    assert!(!Query::start(1, json!(null), None).is_noreply());
}

// ============================================================================
// Response Tests
// ============================================================================

#[test]
fn test_response_sequence() {
    let response = RawResponse::sequence(9, vec![json!({"name": "Test"})], false);

    let encoded = encode_frame(&response, MAX_MESSAGE_SIZE).unwrap();
    let decoded: RawResponse = decode_message(&encoded[4..]).unwrap();

    assert_eq!(decoded.kind(), Some(ResponseType::SuccessPartial));
    assert_eq!(decoded.results[0]["name"], "Test");
}

#[test]
fn test_response_runtime_error() {
    let response = RawResponse::runtime_error(3, RuntimeErrorType::OpFailed, "Cannot write");

    let encoded = encode_frame(&response, MAX_MESSAGE_SIZE).unwrap();
    let decoded: RawResponse = decode_message(&encoded[4..]).unwrap();

    assert_eq!(decoded.message(), Some("Cannot write"));
    assert_eq!(decoded.error_type, Some(RuntimeErrorType::OpFailed.code()));
}

#[test]
fn test_response_unknown_type_decodes() {
    #[derive(Serialize)]
    struct Foreign {
        token: u64,
        #[serde(rename = "type")]
        response_type: i32,
    }

    let bytes = rmp_serde::to_vec_named(&Foreign {
        token: 4,
        response_type: 31,
    })
    .unwrap();
    let decoded: RawResponse = decode_message(&bytes).unwrap();

    assert_eq!(decoded.token, 4);
    assert_eq!(decoded.kind(), None);
    assert!(decoded.results.is_empty());
}

// ============================================================================
// Frame Limit Tests
// ============================================================================

#[test]
fn test_query_too_large() {
    let query = Query::start(1, json!("x".repeat(2048)), None);
    let err = assert_err!(encode_frame(&query, 1024));
    assert_eq!(err, DriverError::MessageTooLarge);
}

#[test]
fn test_driver_error_display() {
    assert_eq!(DriverError::MessageTooLarge.to_string(), "Message too large");
    assert!(DriverError::ConnectionError("refused".to_string())
        .to_string()
        .contains("refused"));
}
