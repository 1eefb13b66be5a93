//! Bridging a pull [`Iter`] into a push channel
//!
//! Exactly one blocking producer task pulls the iterator and hands values
//! over a single-slot tokio channel. The channel closes on EOI, on the first
//! iteration error (which is captured), and on cancellation (which is not
//! reported as an error).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_core::stream::BoxStream;
use futures_util::stream::{self, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, StreamResult};
use crate::iter::{allow_blocking, Iter};
use crate::value::Value;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Iter {
    /// Materialize this iterator into a channel fed by a background task.
    ///
    /// Outside a Tokio runtime the channel is returned already closed, with
    /// the failure available from [`IterChannel::err`].
    pub fn channel(self) -> IterChannel {
        IterChannel::spawn(self, CancellationToken::new())
    }

    /// Like [`Iter::channel`], stopping once `token` is cancelled.
    pub fn channel_with_token(self, token: CancellationToken) -> IterChannel {
        IterChannel::spawn(self, token)
    }
}

/// The receiving side of a materialized iterator
pub struct IterChannel {
    rx: mpsc::Receiver<Value>,
    err: Arc<Mutex<Option<Error>>>,
    token: CancellationToken,
    producer: Option<JoinHandle<()>>,
}

impl IterChannel {
    fn spawn(mut iter: Iter, parent: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let err = Arc::new(Mutex::new(None));
        let token = parent.child_token();

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                log::debug!("iterator channel has no runtime: {}", e);
                *lock(&err) = Some(Error::custom(format!("no tokio runtime: {}", e)));
                return Self {
                    rx,
                    err,
                    token,
                    producer: None,
                };
            }
        };

        let slot = Arc::clone(&err);
        let cancelled = token.clone();
        let producer = runtime.clone().spawn_blocking(move || {
            allow_blocking(|| loop {
                if cancelled.is_cancelled() {
                    log::debug!("iterator channel cancelled");
                    return;
                }
                let v = match iter.pull() {
                    Ok(v) => v,
                    Err(Error::Eoi) => {
                        log::debug!("iterator channel reached EOI");
                        return;
                    }
                    Err(e) => {
                        log::debug!("iterator channel stopped by error: {}", e);
                        *lock(&slot) = Some(e);
                        return;
                    }
                };
                let sent = runtime.block_on(async {
                    tokio::select! {
                        biased;
                        _ = cancelled.cancelled() => false,
                        r = tx.send(v) => r.is_ok(),
                    }
                });
                if !sent {
                    log::debug!("iterator channel closed before EOI");
                    return;
                }
            })
        });

        Self {
            rx,
            err,
            token,
            producer: Some(producer),
        }
    }

    /// Once cancelled, close the channel and drop whatever it still holds.
    fn discard_if_cancelled(&mut self) -> bool {
        if !self.token.is_cancelled() {
            return false;
        }
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
        true
    }

    /// Receive the next value, `None` once the channel is closed.
    /// Nothing is delivered after cancellation, even values already buffered.
    pub async fn recv(&mut self) -> Option<Value> {
        if self.discard_if_cancelled() {
            return None;
        }
        let v = tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            v = self.rx.recv() => v,
        };
        if self.discard_if_cancelled() {
            return None;
        }
        v
    }

    /// Blocking variant of [`IterChannel::recv`] for use outside async code.
    pub fn blocking_recv(&mut self) -> Option<Value> {
        if self.discard_if_cancelled() {
            return None;
        }
        let v = self.rx.blocking_recv();
        if self.discard_if_cancelled() {
            return None;
        }
        v
    }

    /// The first non-EOI error the iteration hit, if any.
    ///
    /// Only meaningful after the channel has been drained.
    pub fn err(&self) -> Option<Error> {
        lock(&self.err).clone()
    }

    /// Stop the producer. Later receives return `None`.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.producer.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Drain the channel, returning every received value and the captured error.
    pub async fn collect(mut self) -> (Vec<Value>, Option<Error>) {
        let mut values = Vec::new();
        while let Some(v) = self.recv().await {
            values.push(v);
        }
        (values, self.err())
    }

    /// Expose the channel as a stream of results. A captured error is
    /// yielded as the final item.
    pub fn into_stream(self) -> BoxStream<'static, StreamResult<Value>> {
        let IterChannel { rx, err, token, .. } = self;
        let tail = stream::once(async move {
            let captured = lock(&err).take();
            captured
        })
        .filter_map(|e| async move { e.map(Err) });
        ReceiverStream::new(rx)
            .take_until(token.cancelled_owned())
            .map(Ok)
            .chain(tail)
            .boxed()
    }
}
