use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response type codes as sent by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    SuccessAtom,
    SuccessSequence,
    SuccessPartial,
    WaitComplete,
    ServerInfo,
    ClientError,
    CompileError,
    RuntimeError,
}

impl ResponseType {
    pub fn code(self) -> i32 {
        match self {
            ResponseType::SuccessAtom => 1,
            ResponseType::SuccessSequence => 2,
            ResponseType::SuccessPartial => 3,
            ResponseType::WaitComplete => 4,
            ResponseType::ServerInfo => 5,
            ResponseType::ClientError => 16,
            ResponseType::CompileError => 17,
            ResponseType::RuntimeError => 18,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ResponseType::SuccessAtom),
            2 => Some(ResponseType::SuccessSequence),
            3 => Some(ResponseType::SuccessPartial),
            4 => Some(ResponseType::WaitComplete),
            5 => Some(ResponseType::ServerInfo),
            16 => Some(ResponseType::ClientError),
            17 => Some(ResponseType::CompileError),
            18 => Some(ResponseType::RuntimeError),
            _ => None,
        }
    }

    pub fn is_error(self) -> bool {
        matches!(
            self,
            ResponseType::ClientError | ResponseType::CompileError | ResponseType::RuntimeError
        )
    }
}

/// Sub-classification of a runtime error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeErrorType {
    Internal,
    ResourceLimit,
    QueryLogic,
    NonExistence,
    OpFailed,
    OpIndeterminate,
    User,
    PermissionError,
}

impl RuntimeErrorType {
    pub fn code(self) -> i32 {
        match self {
            RuntimeErrorType::Internal => 1_000_000,
            RuntimeErrorType::ResourceLimit => 2_000_000,
            RuntimeErrorType::QueryLogic => 3_000_000,
            RuntimeErrorType::NonExistence => 3_100_000,
            RuntimeErrorType::OpFailed => 4_100_000,
            RuntimeErrorType::OpIndeterminate => 4_200_000,
            RuntimeErrorType::User => 5_000_000,
            RuntimeErrorType::PermissionError => 6_000_000,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1_000_000 => Some(RuntimeErrorType::Internal),
            2_000_000 => Some(RuntimeErrorType::ResourceLimit),
            3_000_000 => Some(RuntimeErrorType::QueryLogic),
            3_100_000 => Some(RuntimeErrorType::NonExistence),
            4_100_000 => Some(RuntimeErrorType::OpFailed),
            4_200_000 => Some(RuntimeErrorType::OpIndeterminate),
            5_000_000 => Some(RuntimeErrorType::User),
            6_000_000 => Some(RuntimeErrorType::PermissionError),
            _ => None,
        }
    }
}

/// Response from the server, before classification
///
/// `response_type` keeps the raw code so that a frame carrying a code this
/// driver does not know still decodes and can be reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    pub token: u64,
    #[serde(rename = "type")]
    pub response_type: i32,
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<i32>,
}

impl RawResponse {
    pub fn new(token: u64, response_type: ResponseType, results: Vec<Value>) -> Self {
        RawResponse {
            token,
            response_type: response_type.code(),
            results,
            backtrace: None,
            profile: None,
            error_type: None,
            notes: Vec::new(),
        }
    }

    /// Create a single-value success response
    pub fn atom(token: u64, value: Value) -> Self {
        Self::new(token, ResponseType::SuccessAtom, vec![value])
    }

    /// Create a sequence response; `complete == false` means more batches follow
    pub fn sequence(token: u64, rows: Vec<Value>, complete: bool) -> Self {
        let response_type = if complete {
            ResponseType::SuccessSequence
        } else {
            ResponseType::SuccessPartial
        };
        Self::new(token, response_type, rows)
    }

    pub fn wait_complete(token: u64) -> Self {
        Self::new(token, ResponseType::WaitComplete, Vec::new())
    }

    /// Create an error response carrying the server message
    pub fn error(token: u64, response_type: ResponseType, message: &str) -> Self {
        Self::new(token, response_type, vec![Value::String(message.to_string())])
    }

    pub fn runtime_error(token: u64, error_type: RuntimeErrorType, message: &str) -> Self {
        let mut response = Self::error(token, ResponseType::RuntimeError, message);
        response.error_type = Some(error_type.code());
        response
    }

    pub fn with_backtrace(mut self, backtrace: Vec<Value>) -> Self {
        self.backtrace = Some(backtrace);
        self
    }

    /// Copy of everything but the result rows, kept for diagnostics
    pub fn without_results(&self) -> Self {
        RawResponse {
            token: self.token,
            response_type: self.response_type,
            results: Vec::new(),
            backtrace: self.backtrace.clone(),
            profile: self.profile.clone(),
            error_type: self.error_type,
            notes: self.notes.clone(),
        }
    }

    /// The known response type, `None` for codes this driver does not recognize
    pub fn kind(&self) -> Option<ResponseType> {
        ResponseType::from_code(self.response_type)
    }

    /// Diagnostic text of an error response
    pub fn message(&self) -> Option<&str> {
        match self.kind() {
            Some(kind) if kind.is_error() => self.results.first().and_then(Value::as_str),
            _ => None,
        }
    }
}
