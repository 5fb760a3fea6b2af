//! ReQL native driver core
//!
//! Classifies server responses and exposes query results through cursors.
//!
//! # Example
//!
//! ```rust,no_run
//! use reql_driver::SessionBuilder;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reql_driver::Error> {
//!     let session = SessionBuilder::new("localhost:28015")
//!         .database("marvel")
//!         .build()
//!         .await?;
//!
//!     // The term is produced by a query builder
//!     let mut cursor = session.run(json!([15, ["heroes"]])).await?;
//!     while cursor.advance().await? {
//!         let hero: serde_json::Value = cursor.decode()?;
//!         println!("{}", hero);
//!     }
//!     cursor.close().await?;
//!
//!     let count: u64 = session.run(json!([43, [[15, ["heroes"]]]])).await?.one().await?;
//!     println!("{} heroes", count);
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod config;
pub mod cursor;
pub mod error;
pub mod protocol;
pub mod session;

pub use classify::{classify, classify_as, Expect, Payload, Shape};
pub use config::ConnectOpts;
pub use cursor::{BatchSource, CloseHandle, Cursor, CursorState, ReplaySource};
pub use error::{ClassifiedError, CursorError, Error, ErrorKind, Result};
pub use protocol::{DriverError, Query, QueryType, RawResponse, ResponseType, RuntimeErrorType};
pub use session::{Session, SessionBuilder};
