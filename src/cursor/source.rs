use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ClassifiedError, ErrorKind, Result};
use crate::protocol::RawResponse;

/// Supplies the continuation batches of one open cursor.
///
/// A source belongs to exactly one cursor. Whatever session or connection
/// state it needs is handed to it when it is built, never looked up.
#[async_trait]
pub trait BatchSource: Send {
    /// Fetch the next batch. The cursor classifies the response.
    async fn fetch(&mut self) -> Result<RawResponse>;

    /// Tell the server the remaining batches are not wanted.
    async fn release(&mut self) -> Result<()>;
}

/// Replays a fixed list of responses, in order.
///
/// Useful for results that were already fetched in full and for tests.
#[derive(Debug, Default)]
pub struct ReplaySource {
    responses: VecDeque<RawResponse>,
    releases: Arc<AtomicUsize>,
}

impl ReplaySource {
    pub fn new(responses: impl IntoIterator<Item = RawResponse>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of `release` calls, readable after the source is boxed
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        self.releases.clone()
    }
}

#[async_trait]
impl BatchSource for ReplaySource {
    async fn fetch(&mut self) -> Result<RawResponse> {
        self.responses.pop_front().ok_or_else(|| {
            ClassifiedError::without_response(
                ErrorKind::BrokenClient,
                "continuation requested after the final batch",
            )
            .into()
        })
    }

    async fn release(&mut self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.responses.clear();
        Ok(())
    }
}
