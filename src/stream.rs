//! Background conversion with a channel-based handoff.
//!
//! [`convert_stream`] runs one conversion on its own tokio task and hands
//! back a [`ConversionHandle`]: a `Stream` of [`ConversionEvent`]s plus a
//! cancel switch. The worker never touches caller state; everything it
//! produces crosses the channel, and [`ConversionEvent::Finished`] is always
//! the last item.

use crate::config::ConversionConfig;
use crate::convert;
use crate::error::{ConversionFailure, OcrError, Pdf2MdError};
use crate::output::ConversionResult;
use crate::progress::{
    fallback_message, ConversionProgressCallback, ConversionStage, ProgressCallback,
};
use crate::request::{CancellationFlag, ConversionRequest};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

/// One item of a conversion's event stream.
#[derive(Debug)]
pub enum ConversionEvent {
    /// A stage began.
    Stage(ConversionStage),
    /// The primary path failed; the message names the error.
    Fallback(String),
    /// Terminal result. Always the last event.
    Finished(ConversionResult),
}

impl ConversionEvent {
    /// Status text for this event, as a progress label would show it.
    pub fn message(&self) -> String {
        match self {
            ConversionEvent::Stage(stage) => stage.message().to_string(),
            ConversionEvent::Fallback(msg) => msg.clone(),
            ConversionEvent::Finished(result) => result.status_line(),
        }
    }
}

/// Forwards orchestrator callbacks into the channel, and to the caller's own
/// callback when one is configured.
struct ChannelProgress {
    tx: mpsc::UnboundedSender<ConversionEvent>,
    inner: Option<ProgressCallback>,
}

impl ConversionProgressCallback for ChannelProgress {
    fn on_stage(&self, stage: ConversionStage) {
        if let Some(cb) = &self.inner {
            cb.on_stage(stage);
        }
        // A dropped receiver only means nobody is listening any more.
        let _ = self.tx.send(ConversionEvent::Stage(stage));
    }

    fn on_fallback(&self, primary_error: &OcrError) {
        if let Some(cb) = &self.inner {
            cb.on_fallback(primary_error);
        }
        let _ = self
            .tx
            .send(ConversionEvent::Fallback(fallback_message(primary_error)));
    }

    fn on_conversion_complete(&self, result: &ConversionResult) {
        if let Some(cb) = &self.inner {
            cb.on_conversion_complete(result);
        }
    }
}

/// Handle to a conversion running on a background task.
pub struct ConversionHandle {
    events: UnboundedReceiverStream<ConversionEvent>,
    cancel: CancellationFlag,
    task: JoinHandle<()>,
}

impl ConversionHandle {
    /// Stop at the next checkpoint. A call already in flight completes first.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the run's flag, e.g. for a signal handler.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Drain progress events and return the terminal result.
    pub async fn wait(mut self) -> ConversionResult {
        while let Some(event) = self.events.next().await {
            if let ConversionEvent::Finished(result) = event {
                return result;
            }
        }
        // Channel closed without a result: the worker task died.
        let detail = match self.task.await {
            Err(e) if e.is_panic() => "conversion task panicked".to_string(),
            Err(e) => format!("conversion task failed: {e}"),
            Ok(()) => "conversion task ended without a result".to_string(),
        };
        ConversionResult::Failed(ConversionFailure::preflight(Pdf2MdError::Internal(detail)))
    }
}

impl Stream for ConversionHandle {
    type Item = ConversionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

/// Start a conversion on a new tokio task.
///
/// Must be called from within a tokio runtime. The request's cancellation
/// flag is shared with the returned handle, so cancelling either stops the
/// run. Events emitted after the receiver is dropped are discarded.
pub fn convert_stream(request: ConversionRequest, config: &ConversionConfig) -> ConversionHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = request.cancellation().clone();
    let config = config.clone();

    let task = tokio::spawn(async move {
        let progress = ChannelProgress {
            tx: tx.clone(),
            inner: config.progress_callback.clone(),
        };
        let result = convert::run(&request, &config, &progress).await;
        if tx.send(ConversionEvent::Finished(result)).is_err() {
            debug!("Conversion finished after its receiver was dropped");
        }
    });

    ConversionHandle {
        events: UnboundedReceiverStream::new(rx),
        cancel,
        task,
    }
}
