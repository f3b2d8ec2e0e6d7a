//! Reconnectable bidirectional stream wrapper
//!
//! [`BiDirectionStream`] wraps one raw session handed out by a
//! [`StreamClientProvider`]. The session is opened lazily on first use; once
//! the inbound side ends or either direction fails, the wrapper closes for
//! good and the owner constructs a replacement. Reconnection policy lives
//! with the owner, never here.

use crate::error::{ReplicationError, Result};
use crate::observability::ReplicationMetrics;
use crate::protocol::{ReplicationStreamRequest, ReplicationStreamResponse};
use crate::shutdown::ShutdownOnce;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Send and receive halves of one raw bidirectional session.
///
/// The transport that produced the pair owns framing and serialization;
/// dropping the halves tears the session down. An `Err` element on the
/// receive half reports a transport failure; the channel closing reports a
/// clean end of stream.
#[derive(Debug)]
pub struct RawStream<Req, Resp> {
    pub tx: mpsc::Sender<Req>,
    pub rx: mpsc::Receiver<Result<Resp>>,
}

/// Opens one raw session per call, attributed to a fixed shard pair.
///
/// No retries at this layer; retry is the stream owner's concern.
#[async_trait]
pub trait StreamClientProvider<Req, Resp>: Send + Sync {
    async fn open(&self) -> Result<RawStream<Req, Resp>>;
}

/// One logical stream over one raw session.
///
/// `send` and `next` may run concurrently; `next` allows a single active
/// consumer. The inbound side is a finite, non-restartable sequence:
/// `next` returns `None` once the session ended or the wrapper was closed.
pub struct BiDirectionStream<Req, Resp> {
    provider: Arc<dyn StreamClientProvider<Req, Resp>>,
    opening: Mutex<()>,
    sender: RwLock<Option<mpsc::Sender<Req>>>,
    receiver: Mutex<Option<mpsc::Receiver<Result<Resp>>>>,
    closed: ShutdownOnce,
}

impl<Req, Resp> BiDirectionStream<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    pub fn new(provider: Arc<dyn StreamClientProvider<Req, Resp>>) -> Self {
        Self {
            provider,
            opening: Mutex::new(()),
            sender: RwLock::new(None),
            receiver: Mutex::new(None),
            closed: ShutdownOnce::new(),
        }
    }

    /// Serialize one outbound frame onto the session, opening it on first
    /// use. Fails with `StreamClosed` after `close`, with a transport error
    /// if the session is torn down.
    pub async fn send(&self, request: Req) -> Result<()> {
        self.ensure_open().await?;

        let sender = self.sender.read().clone();
        let Some(sender) = sender else {
            return Err(ReplicationError::StreamClosed);
        };

        match sender.send(request).await {
            Ok(()) => {
                ReplicationMetrics::increment_messages_sent();
                Ok(())
            }
            Err(_) => {
                self.close();
                Err(ReplicationError::Transport(
                    "session torn down by transport".to_string(),
                ))
            }
        }
    }

    /// Next inbound element. An `Err` element is terminal and closes the
    /// wrapper; so does the end of the sequence.
    pub async fn next(&self) -> Option<Result<Resp>> {
        if let Err(err) = self.ensure_open().await {
            return match err {
                ReplicationError::StreamClosed => None,
                err => Some(Err(err)),
            };
        }

        let mut slot = self.receiver.lock().await;
        let receiver = slot.as_mut()?;

        tokio::select! {
            element = receiver.recv() => match element {
                Some(Ok(response)) => {
                    ReplicationMetrics::increment_messages_received();
                    Some(Ok(response))
                }
                Some(Err(err)) => {
                    self.close();
                    Some(Err(err))
                }
                None => {
                    self.close();
                    None
                }
            },
            _ = self.closed.wait() => None,
        }
    }

    /// Close the wrapper and drop the outbound half of the session.
    /// Unblocks an in-flight `next`. Idempotent.
    pub fn close(&self) {
        self.closed.shutdown();
        *self.sender.write() = None;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_shutdown()
    }

    async fn ensure_open(&self) -> Result<()> {
        if self.closed.is_shutdown() {
            return Err(ReplicationError::StreamClosed);
        }
        if self.sender.read().is_some() {
            return Ok(());
        }

        let _guard = self.opening.lock().await;
        if self.closed.is_shutdown() {
            return Err(ReplicationError::StreamClosed);
        }
        if self.sender.read().is_some() {
            return Ok(());
        }

        match self.provider.open().await {
            Ok(raw) => {
                *self.sender.write() = Some(raw.tx);
                *self.receiver.lock().await = Some(raw.rx);
                ReplicationMetrics::increment_streams_opened();
                Ok(())
            }
            Err(err) => {
                // A session that never opened is as dead as one that broke.
                self.close();
                Err(err)
            }
        }
    }
}

/// The wire instantiation used by replication receivers
pub type ReplicationStream =
    BiDirectionStream<ReplicationStreamRequest, ReplicationStreamResponse>;

/// The raw session handle behind [`ReplicationStream`]
pub type ReplicationRawStream = RawStream<ReplicationStreamRequest, ReplicationStreamResponse>;
