//! State-wait bridge between the harness's synchronous request/response
//! model and the agent's asynchronous event stream.
//!
//! The bridge buffers every proof state-change event it has seen since
//! `start`, so a wait issued after the matching event was emitted still
//! resolves immediately. Waiters replay the buffer from the beginning and
//! then park on a notifier; multiple concurrent waiters are independent
//! (broadcast semantics, not a queue).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, Notify};

use backchannel_agent::ProofStateChangedEvent;
use backchannel_core::ProofState;

/// Failure modes of a state wait.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("timed out after {timeout:?} waiting for thread {thread_id} to reach {state}")]
    Timeout {
        thread_id: String,
        state: ProofState,
        timeout: Duration,
    },

    #[error("event stream closed before thread {thread_id} reached {state}")]
    StreamClosed {
        thread_id: String,
        state: ProofState,
    },
}

struct Buffer {
    events: VecDeque<ProofStateChangedEvent>,
    /// Absolute offset of the oldest buffered event; advances on eviction.
    base: u64,
    capacity: usize,
    closed: bool,
}

impl Buffer {
    fn push(&mut self, event: ProofStateChangedEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.base += 1;
        }
        self.events.push_back(event);
    }
}

struct BridgeInner {
    buffer: Mutex<Buffer>,
    notify: Notify,
}

/// Buffers agent state-change events and lets request handlers wait for a
/// (thread id, state) pair with a timeout.
pub struct StateWaitBridge {
    inner: Arc<BridgeInner>,
}

impl StateWaitBridge {
    /// Create a bridge whose replay buffer holds at most `capacity` events;
    /// older events are evicted oldest-first.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                buffer: Mutex::new(Buffer {
                    events: VecDeque::new(),
                    base: 0,
                    capacity,
                    closed: false,
                }),
                notify: Notify::new(),
            }),
        }
    }

    /// Begin buffering events from the agent's broadcast stream. Must be
    /// called once before any wait; events emitted earlier are not observed.
    pub fn start(&self, mut events: broadcast::Receiver<ProofStateChangedEvent>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        inner.buffer.lock().unwrap().push(event);
                        inner.notify.notify_waiters();
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "state event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        inner.buffer.lock().unwrap().closed = true;
                        inner.notify.notify_waiters();
                        tracing::debug!("state event stream closed");
                        break;
                    }
                }
            }
        });
    }

    /// Wait until an event for `thread_id` with `state` is observed, starting
    /// from the oldest buffered event. Fails with [`BridgeError::Timeout`]
    /// after `timeout`, or [`BridgeError::StreamClosed`] if the source closes
    /// first. A single timeout is terminal; no retry is attempted.
    pub async fn wait_for(
        &self,
        thread_id: &str,
        state: ProofState,
        timeout: Duration,
    ) -> Result<ProofStateChangedEvent, BridgeError> {
        tracing::debug!(%thread_id, %state, ?timeout, "waiting for proof state");
        match tokio::time::timeout(timeout, self.next_match(thread_id, state)).await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::Timeout {
                thread_id: thread_id.to_string(),
                state,
                timeout,
            }),
        }
    }

    async fn next_match(
        &self,
        thread_id: &str,
        state: ProofState,
    ) -> Result<ProofStateChangedEvent, BridgeError> {
        // Absolute position of the next event this waiter has not scanned.
        let mut position: u64 = 0;
        loop {
            // Register for notification before scanning, so an event pushed
            // between the scan and the await still wakes us.
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let buffer = self.inner.buffer.lock().unwrap();
                let skip = position.saturating_sub(buffer.base) as usize;
                for event in buffer.events.iter().skip(skip) {
                    if event.thread_id == thread_id && event.state == state {
                        return Ok(event.clone());
                    }
                }
                position = buffer.base + buffer.events.len() as u64;
                if buffer.closed {
                    return Err(BridgeError::StreamClosed {
                        thread_id: thread_id.to_string(),
                        state,
                    });
                }
            }

            notified.await;
        }
    }
}
