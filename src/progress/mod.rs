//! The Progress Channel (spec.md §4.D): an ordered, non-blocking conduit
//! from the Cloning Engine to an `axum` SSE response.

use axum::response::sse::{Event, Sse};
use futures_util::stream::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::models::ProgressMessage;
use crate::utils::EngineError;

/// Bounded so a slow reader applies back-pressure to the channel, not to the
/// Engine's call stack, without ever growing unbounded (spec.md §4.D).
const CHANNEL_CAPACITY: usize = 32;

/// The Engine-facing half: `send` never blocks past the channel's capacity
/// and never fails except when the receiver has already been dropped.
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<ProgressMessage>,
}

impl ProgressSender {
    /// Delivers messages in call order; the caller is responsible for
    /// keeping `progress` non-decreasing (spec.md §3 `ProgressMessage`).
    pub async fn send(&self, message: impl Into<String>, progress: u8) {
        let msg = ProgressMessage::new(message, progress);
        tracing::event!(tracing::Level::INFO, progress = msg.progress, message = %msg.message);
        // a dropped receiver (caller disconnected) is not an Engine failure —
        // the job continues to completion per spec.md §5 Cancellation.
        let _ = self.tx.send(msg).await;
    }
}

/// Builds a connected sender/stream pair. Construction itself cannot fail in
/// this in-process design (there's always a channel to build), but the
/// constructor still returns a `Result` to preserve the
/// `DomainError("streaming unsupported")` contract spec.md §4.D requires of
/// transports that can't support flushing.
pub fn channel() -> Result<(ProgressSender, impl Stream<Item = Result<Event, std::convert::Infallible>>), EngineError>
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let stream = ReceiverStream::new(rx).map(|msg| {
        let data = serde_json::to_string(&msg).unwrap_or_else(|_| "{}".to_owned());
        Ok(Event::default().data(data))
    });
    Ok((ProgressSender { tx }, stream))
}

/// Wraps the stream half in axum's SSE response type.
pub fn into_response(
    stream: impl Stream<Item = Result<Event, std::convert::Infallible>> + Send + 'static,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    Sse::new(stream)
}

/// Same pairing as [`channel`], but the receiving half yields bare
/// [`ProgressMessage`]s instead of encoded SSE [`Event`]s, so integration
/// tests can assert on `message`/`progress` directly (spec.md §8 P5).
#[cfg(any(test, feature = "test-utilities"))]
pub fn raw_channel() -> (ProgressSender, mpsc::Receiver<ProgressMessage>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    (ProgressSender { tx }, rx)
}
