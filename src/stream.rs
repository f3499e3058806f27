//! Ordered event streaming to callers.
//!
//! The engine broadcasts every [`OutputEvent`] immediately after the
//! checkpoint that contains it is durable (write-then-yield), strictly in
//! the order it was appended to the run log. A subscriber therefore never
//! observes a `final` event before the `step`/`note` events that precede it
//! in the same run. Events carry their `thread_id` so one hub can serve many
//! concurrent threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream;
use tokio::sync::broadcast::{self, Receiver, Sender};
use tokio::time::timeout;

use crate::event::OutputEvent;

/// An output event tagged with the thread that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadEvent {
    pub thread_id: String,
    pub event: OutputEvent,
}

/// Broadcast fan-out point for run events.
#[derive(Debug)]
pub struct StreamHub {
    sender: Sender<ThreadEvent>,
    dropped_events: AtomicUsize,
    capacity: usize,
}

impl StreamHub {
    /// Default ring-buffer capacity per subscriber.
    pub const DEFAULT_CAPACITY: usize = 1024;

    #[must_use]
    pub fn new(capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Arc::new(Self {
            sender,
            dropped_events: AtomicUsize::new(0),
            capacity,
        })
    }

    /// Publish an event to all current subscribers.
    ///
    /// Publishing with no subscribers is not an error; events are simply
    /// not retained for late joiners.
    pub fn publish(&self, thread_id: &str, event: OutputEvent) {
        let _ = self.sender.send(ThreadEvent {
            thread_id: thread_id.to_string(),
            event,
        });
    }

    #[must_use]
    pub fn subscribe(self: &Arc<Self>) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
            hub: Arc::clone(self),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events dropped across all lagging subscribers.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped_events.load(Ordering::Relaxed)
    }
}

/// A subscriber handle yielding events in publication order.
#[derive(Debug)]
pub struct EventStream {
    receiver: Receiver<ThreadEvent>,
    hub: Arc<StreamHub>,
}

impl EventStream {
    pub async fn recv(&mut self) -> Result<ThreadEvent, broadcast::error::RecvError> {
        match self.receiver.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                self.hub
                    .dropped_events
                    .fetch_add(missed as usize, Ordering::Relaxed);
                Err(broadcast::error::RecvError::Lagged(missed))
            }
            Err(err) => Err(err),
        }
    }

    pub fn try_recv(&mut self) -> Result<ThreadEvent, broadcast::error::TryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(event),
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                self.hub
                    .dropped_events
                    .fetch_add(missed as usize, Ordering::Relaxed);
                Err(broadcast::error::TryRecvError::Lagged(missed))
            }
            Err(err) => Err(err),
        }
    }

    /// Next event within `duration`, skipping over lag gaps; `None` on
    /// timeout or hub shutdown.
    pub async fn next_timeout(&mut self, duration: Duration) -> Option<ThreadEvent> {
        loop {
            match timeout(duration, self.recv()).await {
                Ok(Ok(event)) => return Some(event),
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                Err(_) => return None,
            }
        }
    }

    /// Adapt into a `futures_util::Stream`, silently skipping lag gaps.
    pub fn into_async_stream(self) -> impl futures_util::stream::Stream<Item = ThreadEvent> {
        stream::unfold(self, |mut stream| async move {
            loop {
                match stream.recv().await {
                    Ok(event) => return Some((event, stream)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
    }

    /// Pump events into a flume channel until the hub closes or the
    /// receiving side is dropped. Useful for bridging to single-consumer
    /// pipelines (an SSE writer, a line-framed socket).
    pub async fn forward(mut self, sink: flume::Sender<ThreadEvent>) {
        loop {
            match self.recv().await {
                Ok(event) => {
                    if sink.send_async(event).await.is_err() {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}
