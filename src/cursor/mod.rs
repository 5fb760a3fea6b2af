//! Result cursors
//!
//! A [`Cursor`] walks the rows of one query result. It starts `Fresh`, is
//! `Positioned` while a row is available, becomes `Exhausted` once the server
//! has no more rows and is `Closed` for good after [`Cursor::close`].
//!
//! A cursor has a single owner. Every operation takes `&mut self` or `&self`,
//! so callers that share one across tasks must serialize access themselves.
//! [`CloseHandle`] is the one exception: it may close the cursor from
//! anywhere, abandoning a fetch that is in flight.

mod source;

pub use source::{BatchSource, ReplaySource};

use std::collections::VecDeque;
use std::sync::Arc;

use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::classify::{classify, classify_as, Expect, Payload, Shape};
use crate::error::{ClassifiedError, CursorError, Error, ErrorKind, Result};
use crate::protocol::RawResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Nothing read yet
    Fresh,
    /// A row is available to `decode`
    Positioned,
    /// No more rows, no current row
    Exhausted,
    /// Terminal
    Closed,
}

/// Closes a cursor from outside its owner.
#[derive(Debug, Clone)]
pub struct CloseHandle(CancellationToken);

impl CloseHandle {
    pub fn close(&self) {
        self.0.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_cancelled()
    }
}

pub struct Cursor {
    header: Arc<RawResponse>,
    shape: Shape,
    buffer: VecDeque<Value>,
    /// The server still holds rows for this query
    more: bool,
    source: Option<Box<dyn BatchSource>>,
    current: Option<Value>,
    state: CursorState,
    failure: Option<ClassifiedError>,
    closing: CancellationToken,
}

impl Cursor {
    /// Build a cursor over an already classified payload.
    ///
    /// `header` is kept for diagnostics. Its result rows are dropped, except
    /// a scalar atom, which stays so a shape mismatch can show it.
    pub fn new(
        header: RawResponse,
        payload: Payload,
        source: Option<Box<dyn BatchSource>>,
    ) -> Self {
        let shape = payload.shape();
        let mut header = header.without_results();
        if let Payload::Atom(value) = &payload {
            if shape == Shape::Scalar {
                header.results = vec![value.clone()];
            }
        }
        let (rows, more): (VecDeque<Value>, bool) = match payload {
            Payload::Atom(Value::Array(items)) => (items.into(), false),
            Payload::Atom(value) => (VecDeque::from([value]), false),
            Payload::Sequence { rows, complete } => (rows.into(), !complete),
            Payload::Empty => (VecDeque::new(), false),
        };
        Self {
            header: Arc::new(header),
            shape,
            buffer: rows,
            more,
            source,
            current: None,
            state: CursorState::Fresh,
            failure: None,
            closing: CancellationToken::new(),
        }
    }

    /// Classify `raw` and wrap the payload in a cursor.
    pub fn from_response(
        raw: RawResponse,
        source: Option<Box<dyn BatchSource>>,
    ) -> std::result::Result<Self, ClassifiedError> {
        let header = raw.without_results();
        let payload = classify(raw)?;
        Ok(Self::new(header, payload, source))
    }

    pub fn state(&self) -> CursorState {
        if self.closing.is_cancelled() {
            CursorState::Closed
        } else {
            self.state
        }
    }

    /// The first response of the query, without its rows (a scalar atom is kept)
    pub fn response(&self) -> &RawResponse {
        &self.header
    }

    pub fn is_row_sequence(&self) -> bool {
        self.shape == Shape::Rows
    }

    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle(self.closing.clone())
    }

    /// The row `decode` would read
    pub fn current_row(&self) -> Option<&Value> {
        match self.state() {
            CursorState::Positioned => self.current.as_ref(),
            _ => None,
        }
    }

    /// Move to the next row, fetching a new batch when the buffered one is used up.
    ///
    /// Returns `false` once the result is exhausted, and keeps returning
    /// `false` until the cursor is closed. Fetching is the only point where
    /// this waits. If the future is dropped while waiting, the cursor keeps
    /// its previous state.
    pub async fn advance(&mut self) -> Result<bool> {
        if self.closing.is_cancelled() && self.state != CursorState::Closed {
            // Closed through a handle while idle, the source is still usable
            self.close().await?;
            return Err(CursorError::RowsClosed.into());
        }
        match self.state {
            CursorState::Closed => return Err(CursorError::RowsClosed.into()),
            CursorState::Exhausted => return Ok(false),
            CursorState::Fresh | CursorState::Positioned => {}
        }

        loop {
            if let Some(row) = self.buffer.pop_front() {
                self.current = Some(row);
                self.state = CursorState::Positioned;
                return Ok(true);
            }
            if !self.more {
                tracing::debug!(token = self.header.token, "Cursor exhausted");
                self.current = None;
                self.state = CursorState::Exhausted;
                self.source = None;
                return Ok(false);
            }
            self.fetch_batch().await?;
        }
    }

    async fn fetch_batch(&mut self) -> Result<()> {
        let closing = self.closing.clone();
        tracing::debug!(token = self.header.token, "Fetching next batch");
        let fetched = match self.source.as_mut() {
            Some(source) => tokio::select! {
                biased;
                _ = closing.cancelled() => None,
                result = source.fetch() => Some(result),
            },
            None => {
                let err = ClassifiedError::new(ErrorKind::BrokenClient, self.header.clone())
                    .with_detail("partial result with no batch source");
                self.fail(Some(err.clone()));
                return Err(err.into());
            }
        };

        let raw = match fetched {
            None => {
                self.abandon();
                return Err(CursorError::RowsClosed.into());
            }
            Some(Err(err)) => {
                let failure = err.classified().cloned();
                if failure.is_some() {
                    self.more = false;
                }
                self.fail(failure);
                return Err(err);
            }
            Some(Ok(raw)) => raw,
        };

        let header = raw.without_results();
        match classify_as(raw, Expect::Rows) {
            Ok(Payload::Sequence { rows, complete }) => {
                tracing::debug!(
                    token = header.token,
                    rows = rows.len(),
                    complete,
                    "Received batch"
                );
                self.buffer.extend(rows);
                self.more = !complete;
                Ok(())
            }
            Ok(_) => {
                let err = ClassifiedError::new(ErrorKind::BrokenClient, Arc::new(header))
                    .with_detail("continuation did not return a sequence");
                self.more = false;
                self.fail(Some(err.clone()));
                Err(err.into())
            }
            Err(err) => {
                self.more = false;
                self.fail(Some(err.clone()));
                Err(err.into())
            }
        }
    }

    /// Decode the current row into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        match self.state() {
            CursorState::Closed => Err(CursorError::RowsClosed.into()),
            CursorState::Positioned => {
                let row = self.current.as_ref().ok_or(CursorError::NoCurrentRow)?;
                Ok(T::deserialize(row)?)
            }
            CursorState::Fresh | CursorState::Exhausted => Err(CursorError::NoCurrentRow.into()),
        }
    }

    /// Close the cursor and release its batch source. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == CursorState::Closed {
            return Ok(());
        }
        tracing::debug!(token = self.header.token, "Closing cursor");
        self.state = CursorState::Closed;
        self.current = None;
        self.buffer.clear();
        self.closing.cancel();

        let source = self.source.take();
        if std::mem::take(&mut self.more) {
            if let Some(mut source) = source {
                source.release().await?;
            }
        }
        Ok(())
    }

    /// Read exactly one row and close.
    ///
    /// Like [`Cursor::all`] and [`Cursor::exec`] this expects a `Fresh`
    /// cursor; on one that was already advanced it reads from the current
    /// position onwards.
    pub async fn one<T: DeserializeOwned>(&mut self) -> Result<T> {
        self.expect(Expect::Single)?;
        let result = match self.advance().await {
            Ok(true) => self.decode(),
            Ok(false) => Err(CursorError::NoRows.into()),
            Err(err) => Err(err),
        };
        let closed = self.close().await;
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Read every remaining row and close.
    pub async fn all<T: DeserializeOwned>(&mut self) -> Result<Vec<T>> {
        self.expect(Expect::Rows)?;
        let result = self.collect().await;
        let closed = self.close().await;
        let rows = result?;
        closed?;
        Ok(rows)
    }

    async fn collect<T: DeserializeOwned>(&mut self) -> Result<Vec<T>> {
        let mut rows = Vec::with_capacity(self.buffer.len());
        while self.advance().await? {
            rows.push(self.decode()?);
        }
        Ok(rows)
    }

    /// Discard the result and close, surfacing any server failure seen so far.
    pub async fn exec(&mut self) -> Result<()> {
        let closed = self.close().await;
        if let Some(failure) = self.failure.take() {
            return Err(failure.into());
        }
        closed
    }

    /// Consume the cursor as a stream of decoded rows. The cursor is closed
    /// when the stream ends.
    pub fn into_stream<T>(mut self) -> impl Stream<Item = Result<T>> + Send
    where
        T: DeserializeOwned + Send + 'static,
    {
        async_stream::stream! {
            loop {
                match self.advance().await {
                    Ok(true) => {
                        yield self.decode::<T>();
                    }
                    Ok(false) => break,
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
            if let Err(err) = self.close().await {
                yield Err(err);
            }
        }
    }

    fn expect(&self, expect: Expect) -> Result<()> {
        if self.state() == CursorState::Closed {
            return Err(CursorError::RowsClosed.into());
        }
        if expect.admits_shape(self.shape) {
            return Ok(());
        }
        Err(Error::Classified(ClassifiedError::new(
            ErrorKind::WrongResponseType,
            self.header.clone(),
        )))
    }

    fn fail(&mut self, failure: Option<ClassifiedError>) {
        if failure.is_some() {
            self.failure = failure;
        }
        self.current = None;
        self.buffer.clear();
        self.state = CursorState::Exhausted;
    }

    /// Close without talking to the server. The source is dropped, not released.
    fn abandon(&mut self) {
        tracing::debug!(token = self.header.token, "Cursor closed while fetching");
        self.state = CursorState::Closed;
        self.current = None;
        self.buffer.clear();
        self.more = false;
        self.source = None;
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("token", &self.header.token)
            .field("state", &self.state())
            .field("buffered", &self.buffer.len())
            .field("more", &self.more)
            .finish()
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if self.more && self.state != CursorState::Closed {
            tracing::debug!(
                token = self.header.token,
                "Cursor dropped without close, server cursor left open"
            );
        }
    }
}
