use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Submit a new term
    Start,
    /// Ask for the next batch of an open cursor
    Continue,
    /// Close an open cursor on the server
    Stop,
    /// Wait for all outstanding noreply writes
    NoreplyWait,
}

/// A query frame sent to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub token: u64,
    #[serde(rename = "type")]
    pub query_type: QueryType,
    /// Serialized term, only present on START
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_optargs: Option<Map<String, Value>>,
}

impl Query {
    pub fn start(token: u64, term: Value, global_optargs: Option<Map<String, Value>>) -> Self {
        Query {
            token,
            query_type: QueryType::Start,
            term: Some(term),
            global_optargs,
        }
    }

    pub fn continue_(token: u64) -> Self {
        Self::bare(token, QueryType::Continue)
    }

    pub fn stop(token: u64) -> Self {
        Self::bare(token, QueryType::Stop)
    }

    pub fn noreply_wait(token: u64) -> Self {
        Self::bare(token, QueryType::NoreplyWait)
    }

    fn bare(token: u64, query_type: QueryType) -> Self {
        Query {
            token,
            query_type,
            term: None,
            global_optargs: None,
        }
    }

    /// Whether the server will not answer this query.
    pub fn is_noreply(&self) -> bool {
        self.global_optargs
            .as_ref()
            .and_then(|opts| opts.get("noreply"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
