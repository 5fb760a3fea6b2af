//! Sessions over the native driver protocol
//!
//! A [`Session`] owns one [`Connection`] and turns serialized terms into
//! [`Cursor`]s. Cursors of the same session share the connection through the
//! handle given to their [`QueryFeed`]; round trips are serialized by its lock.

mod builder;
mod connection;

pub use builder::SessionBuilder;
pub use connection::Connection;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::classify::{classify_as, Expect, Payload};
use crate::config::ConnectOpts;
use crate::cursor::{BatchSource, Cursor};
use crate::error::{Error, Result};
use crate::protocol::{DriverError, Query, RawResponse, ResponseType};

pub struct Session<S> {
    conn: Arc<Mutex<Connection<S>>>,
    opts: ConnectOpts,
}

impl Session<TcpStream> {
    /// Connect to a server
    pub async fn connect(opts: ConnectOpts) -> Result<Self> {
        let connecting = TcpStream::connect(&opts.address);
        let stream = match opts.timeout() {
            Some(limit) => tokio::time::timeout(limit, connecting)
                .await
                .map_err(|_| DriverError::Timeout)?,
            None => connecting.await,
        }
        .map_err(|e| {
            DriverError::ConnectionError(format!("Failed to connect to {}: {}", opts.address, e))
        })?;

        stream.set_nodelay(true).map_err(|e| {
            DriverError::ConnectionError(format!("Failed to set TCP_NODELAY: {}", e))
        })?;

        tracing::info!("Connected to {}", opts.address);
        Self::with_stream(stream, opts).await
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Start a session over an already established stream.
    pub async fn with_stream(stream: S, opts: ConnectOpts) -> Result<Self> {
        let conn = Connection::open(stream, &opts).await?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            opts,
        })
    }

    pub fn opts(&self) -> &ConnectOpts {
        &self.opts
    }

    /// Run a serialized term and return a cursor over its result.
    pub async fn run(&self, term: Value) -> Result<Cursor> {
        self.run_with(term, Map::new()).await
    }

    /// Run with explicit global optargs. `noreply: true` returns an empty
    /// cursor without waiting for the server.
    pub async fn run_with(&self, term: Value, optargs: Map<String, Value>) -> Result<Cursor> {
        let optargs = self.global_optargs(optargs);
        let mut conn = self.conn.lock().await;
        let token = conn.next_token();
        let query = Query::start(token, term, Some(optargs));

        if query.is_noreply() {
            conn.send(&query).await?;
            tracing::debug!(token, "Sent noreply query");
            return Ok(Cursor::new(
                RawResponse::wait_complete(token),
                Payload::Empty,
                None,
            ));
        }

        let raw = conn.round_trip(&query).await?;
        drop(conn);
        tracing::debug!(token, response_type = raw.response_type, "Query answered");

        let source = if raw.kind() == Some(ResponseType::SuccessPartial) {
            Some(Box::new(QueryFeed::new(self.conn.clone(), token)) as Box<dyn BatchSource>)
        } else {
            None
        };
        Ok(Cursor::from_response(raw, source)?)
    }

    /// Run a term for its effect only.
    pub async fn exec(&self, term: Value) -> Result<()> {
        let mut cursor = self.run(term).await?;
        cursor.exec().await
    }

    /// Wait until the server has applied every noreply write of this connection.
    pub async fn noreply_wait(&self) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let token = conn.next_token();
        let raw = conn.round_trip(&Query::noreply_wait(token)).await?;
        classify_as(raw, Expect::Nothing)?;
        Ok(())
    }

    fn global_optargs(&self, mut optargs: Map<String, Value>) -> Map<String, Value> {
        if let Some(db) = &self.opts.database {
            optargs
                .entry("db")
                .or_insert_with(|| Value::String(db.clone()));
        }
        optargs
    }
}

/// Continuation batches of one query, fetched over the session's connection
pub struct QueryFeed<S> {
    conn: Arc<Mutex<Connection<S>>>,
    token: u64,
}

impl<S> QueryFeed<S> {
    pub fn new(conn: Arc<Mutex<Connection<S>>>, token: u64) -> Self {
        Self { conn, token }
    }
}

#[async_trait]
impl<S> BatchSource for QueryFeed<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn fetch(&mut self) -> Result<RawResponse> {
        let mut conn = self.conn.lock().await;
        conn.round_trip(&Query::continue_(self.token))
            .await
            .map_err(Error::from_transport)
    }

    async fn release(&mut self) -> Result<()> {
        let mut conn = self.conn.lock().await;
        tracing::debug!(token = self.token, "Stopping server cursor");
        let raw = conn.round_trip(&Query::stop(self.token)).await?;
        classify_as(raw, Expect::Nothing)?;
        Ok(())
    }
}
