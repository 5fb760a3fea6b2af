//! Common test utilities for driver tests
//!
//! Provides:
//! - An in-process mock server speaking the framed protocol over a duplex pipe
//! - Batch sources that never answer, for cancellation tests
//! - Log setup

#![allow(dead_code)]

use async_trait::async_trait;
use reql_driver::protocol::{decode_message, encode_frame, DRIVER_MAGIC, MAX_MESSAGE_SIZE};
use reql_driver::{BatchSource, ConnectOpts, Query, RawResponse, Result, Session};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reql_driver=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Server side of a duplex pipe
pub struct MockServer {
    stream: DuplexStream,
}

impl MockServer {
    pub async fn recv(&mut self) -> Option<Query> {
        let mut len_buf = [0u8; 4];
        self.stream.read_exact(&mut len_buf).await.ok()?;
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload).await.ok()?;
        Some(decode_message(&payload).expect("client sent an undecodable query"))
    }

    pub async fn reply(&mut self, response: &RawResponse) {
        let frame = encode_frame(response, MAX_MESSAGE_SIZE).unwrap();
        self.write_raw(&frame).await;
    }

    pub async fn write_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }
}

/// Open a session against a mock server; the magic header is already consumed.
pub async fn connect_mock(opts: ConnectOpts) -> (Session<DuplexStream>, MockServer) {
    let (client, mut server) = tokio::io::duplex(64 * 1024);
    let session = Session::with_stream(client, opts).await.unwrap();

    let mut magic = vec![0u8; DRIVER_MAGIC.len()];
    server.read_exact(&mut magic).await.unwrap();
    assert_eq!(magic, DRIVER_MAGIC);

    (session, MockServer { stream: server })
}

/// Answer every query with `handler` until the client hangs up. `None` means
/// no reply. Resolves to every query received.
pub fn serve<F>(mut server: MockServer, mut handler: F) -> JoinHandle<Vec<Query>>
where
    F: FnMut(&Query) -> Option<RawResponse> + Send + 'static,
{
    tokio::spawn(async move {
        let mut received = Vec::new();
        while let Some(query) = server.recv().await {
            if let Some(response) = handler(&query) {
                server.reply(&response).await;
            }
            received.push(query);
        }
        received
    })
}

/// A source whose fetch never completes
pub struct PendingSource;

#[async_trait]
impl BatchSource for PendingSource {
    async fn fetch(&mut self) -> Result<RawResponse> {
        futures::future::pending::<Result<RawResponse>>().await
    }

    async fn release(&mut self) -> Result<()> {
        Ok(())
    }
}
