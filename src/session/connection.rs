use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::ConnectOpts;
use crate::protocol::{decode_message, encode_frame, DriverError, Query, RawResponse, DRIVER_MAGIC};

/// One framed byte stream to the server
pub struct Connection<S> {
    stream: S,
    next_token: u64,
    timeout: Option<Duration>,
    max_message_size: usize,
    /// Set while a round trip is between its write and its read
    in_flight: bool,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Send the magic header and start using `stream`.
    pub async fn open(mut stream: S, opts: &ConnectOpts) -> Result<Self, DriverError> {
        stream.write_all(DRIVER_MAGIC).await.map_err(|e| {
            DriverError::ConnectionError(format!("Failed to send magic header: {}", e))
        })?;
        stream
            .flush()
            .await
            .map_err(|e| DriverError::ConnectionError(format!("Failed to flush: {}", e)))?;

        Ok(Self {
            stream,
            next_token: 1,
            timeout: opts.timeout(),
            max_message_size: opts.max_message_size,
            in_flight: false,
        })
    }

    pub fn next_token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        token
    }

    pub fn is_poisoned(&self) -> bool {
        self.in_flight
    }

    /// Send `query` and wait for the response carrying the same token.
    pub async fn round_trip(&mut self, query: &Query) -> Result<RawResponse, DriverError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange(query))
                .await
                .map_err(|_| {
                    tracing::warn!(token = query.token, "Round trip timed out");
                    DriverError::Timeout
                })?,
            None => self.exchange(query).await,
        }
    }

    /// Send a query the server will not answer.
    pub async fn send(&mut self, query: &Query) -> Result<(), DriverError> {
        if self.in_flight {
            return Err(DriverError::ConnectionPoisoned);
        }
        let frame = self.encode(query)?;
        self.in_flight = true;
        self.write_frame(&frame).await?;
        self.in_flight = false;
        Ok(())
    }

    async fn exchange(&mut self, query: &Query) -> Result<RawResponse, DriverError> {
        if self.in_flight {
            tracing::warn!(token = query.token, "Refusing to use a poisoned connection");
            return Err(DriverError::ConnectionPoisoned);
        }
        // Nothing has touched the stream yet if encoding fails
        let frame = self.encode(query)?;
        self.in_flight = true;
        self.write_frame(&frame).await?;
        let response = self.read_response().await?;
        self.in_flight = false;

        if response.token != query.token {
            return Err(DriverError::ProtocolError(format!(
                "Expected response for token {}, got {}",
                query.token, response.token
            )));
        }
        Ok(response)
    }

    fn encode(&self, query: &Query) -> Result<Vec<u8>, DriverError> {
        tracing::trace!(token = query.token, query_type = ?query.query_type, "Sending query");
        encode_frame(query, self.max_message_size)
    }

    async fn write_frame(&mut self, data: &[u8]) -> Result<(), DriverError> {
        self.stream
            .write_all(data)
            .await
            .map_err(|e| DriverError::ConnectionError(format!("Write failed: {}", e)))?;
        self.stream
            .flush()
            .await
            .map_err(|e| DriverError::ConnectionError(format!("Flush failed: {}", e)))
    }

    async fn read_response(&mut self) -> Result<RawResponse, DriverError> {
        let mut len_buf = [0u8; 4];
        self.stream
            .read_exact(&mut len_buf)
            .await
            .map_err(|e| DriverError::ConnectionError(format!("Read length failed: {}", e)))?;

        let msg_len = u32::from_be_bytes(len_buf) as usize;
        if msg_len > self.max_message_size {
            return Err(DriverError::MessageTooLarge);
        }

        let mut payload = vec![0u8; msg_len];
        self.stream
            .read_exact(&mut payload)
            .await
            .map_err(|e| DriverError::ConnectionError(format!("Read payload failed: {}", e)))?;

        decode_message(&payload)
    }
}
