//! Wire protocol definitions for the native driver
//!
//! Uses MessagePack for efficient binary serialization.
//!
//! - **Magic Header**: `reql-drv-v1` (12 bytes, sent once on connection)
//! - **Query Frame**: `[length: 4 bytes BE][msgpack payload]`
//! - **Response Frame**: `[length: 4 bytes BE][msgpack payload]`

pub mod codec;
pub mod error;
pub mod query;
pub mod response;

pub use codec::{decode_message, encode_frame, encode_query, DRIVER_MAGIC, MAX_MESSAGE_SIZE};
pub use error::DriverError;
pub use query::{Query, QueryType};
pub use response::{RawResponse, ResponseType, RuntimeErrorType};
