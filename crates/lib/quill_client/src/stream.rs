//! Cancellable completion stream.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use futures_util::stream::BoxStream;
use futures_util::{FutureExt, Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;

/// Lazy, finite sequence of completion text chunks.
///
/// The stream ends as soon as its token is cancelled; dropping it closes the
/// underlying connection. It cannot be restarted.
pub struct CompletionStream {
    inner: BoxStream<'static, Result<String, DispatchError>>,
    cancel: CancellationToken,
    // Set only when cancellation cut the stream short.
    truncated: Arc<AtomicBool>,
}

impl CompletionStream {
    pub fn new<S>(chunks: S, cancel: CancellationToken) -> Self
    where
        S: Stream<Item = Result<String, DispatchError>> + Send + 'static,
    {
        let truncated = Arc::new(AtomicBool::new(false));
        let flag = truncated.clone();
        let stop = cancel
            .clone()
            .cancelled_owned()
            .map(move |()| flag.store(true, Ordering::SeqCst));
        let inner = chunks.take_until(stop).boxed();
        Self {
            inner,
            cancel,
            truncated,
        }
    }

    /// A stream over chunks already in memory.
    pub fn from_chunks<I>(chunks: I, cancel: CancellationToken) -> Self
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: Send + 'static,
    {
        Self::new(futures_util::stream::iter(chunks.into_iter().map(Ok)), cancel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drain the stream into one string.
    ///
    /// A stream cut short by cancellation yields [`DispatchError::Cancelled`],
    /// never the partial text. One that ended on its own keeps its text even
    /// if the token fires afterwards.
    pub async fn collect_text(mut self) -> Result<String, DispatchError> {
        let mut text = String::new();
        while let Some(chunk) = self.inner.next().await {
            text.push_str(&chunk?);
        }
        if self.truncated.load(Ordering::SeqCst) {
            return Err(DispatchError::Cancelled);
        }
        Ok(text)
    }
}

impl Stream for CompletionStream {
    type Item = Result<String, DispatchError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
