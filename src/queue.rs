//! Serialized executor for authentication flows.
//!
//! All flows run on a single FIFO: at most one operation is in flight, and
//! the next starts only once the previous one completed. An operation may
//! suspend on any number of HTTP exchanges or navigation waits in between;
//! the queue does not observe those steps.

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};

/// FIFO of pending operations, drained one at a time by the
/// [`OperationRunner`].
pub(crate) struct OperationQueue {
    sender: mpsc::UnboundedSender<BoxFuture<'static, ()>>,
}

/// Single-use handle to an operation's eventual output.
///
/// The paired oneshot sender is the right to complete the operation; sending
/// consumes it, so completion fires exactly once no matter how the operation
/// branches internally.
pub(crate) struct Completion<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> Completion<T> {
    /// Waits for the operation to complete. `None` only when the runner went
    /// away before the operation finished.
    pub(crate) async fn wait(self) -> Option<T> {
        self.receiver.await.ok()
    }
}

impl OperationQueue {
    /// Creates a queue and the runner that drains it.
    pub(crate) fn new() -> (Self, OperationRunner) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (OperationQueue { sender }, OperationRunner { receiver })
    }

    /// Enqueues an operation behind everything already submitted.
    pub(crate) fn submit<T, F>(&self, operation: F) -> Completion<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let wrapped = async move {
            let output = operation.await;
            // The caller may have stopped waiting; the operation's side
            // effects stand either way.
            let _ = sender.send(output);
        }
        .boxed();
        let _ = self.sender.send(wrapped);
        Completion { receiver }
    }
}

/// Drives queued operations strictly in order, one at a time.
pub(crate) struct OperationRunner {
    receiver: mpsc::UnboundedReceiver<BoxFuture<'static, ()>>,
}

impl OperationRunner {
    /// Runs until every queue handle is dropped.
    pub(crate) async fn run(mut self) {
        while let Some(operation) = self.receiver.recv().await {
            operation.await;
        }
    }
}
