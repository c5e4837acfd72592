//! Dispatcher — the operation queue and its worker loop.

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Notify, watch};
use tracing::{debug, error, info};

use crate::error::{DispatchError, DispatchResult};
use crate::operation::{Operation, OperationPayload, Priority};

/// Applies dequeued operations. Called on the blocking thread pool, one
/// operation at a time, in dispatch order.
pub trait OperationHandler: Send + Sync + 'static {
    fn apply(&self, operation: &Operation) -> DispatchResult<()>;
}

struct Queue {
    heap: BinaryHeap<Operation>,
    closed: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    notify: Notify,
    capacity: usize,
    next_sequence: AtomicU64,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Submission side of the dispatcher, shared with API handlers.
#[derive(Clone)]
pub struct DispatcherHandle {
    shared: Arc<Shared>,
}

impl DispatcherHandle {
    /// Enqueue an operation. Returns its sequence number.
    pub fn submit(
        &self,
        payload: OperationPayload,
        priority: Priority,
        request_id: &str,
    ) -> DispatchResult<u64> {
        let mut queue = self.shared.queue();
        if queue.closed {
            return Err(DispatchError::Closed);
        }
        if queue.heap.len() >= self.shared.capacity {
            return Err(DispatchError::QueueFull(queue.heap.len()));
        }

        let sequence = self.shared.next_sequence.fetch_add(1, Ordering::Relaxed);
        debug!(
            request_id,
            %priority,
            sequence,
            operation = %payload.describe(),
            "operation queued"
        );
        queue.heap.push(Operation {
            payload,
            priority,
            request_id: request_id.to_string(),
            sequence,
        });
        drop(queue);

        self.shared.notify.notify_one();
        Ok(sequence)
    }

    /// Number of operations waiting to be applied.
    pub fn pending(&self) -> usize {
        self.shared.queue().heap.len()
    }
}

/// Worker side of the dispatcher.
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Create a dispatcher holding at most `capacity` pending operations.
    pub fn new(capacity: usize) -> (Self, DispatcherHandle) {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                heap: BinaryHeap::new(),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
            next_sequence: AtomicU64::new(0),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            DispatcherHandle { shared },
        )
    }

    fn pop(&self) -> Option<Operation> {
        self.shared.queue().heap.pop()
    }

    /// Apply operations until the shutdown signal fires, then refuse new
    /// submissions and drain what is already queued.
    pub async fn run<H: OperationHandler>(
        self,
        handler: Arc<H>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(capacity = self.shared.capacity, "dispatcher started");

        loop {
            while let Some(operation) = self.pop() {
                apply(&handler, operation).await;
            }

            tokio::select! {
                _ = self.shared.notify.notified() => {}
                _ = shutdown.changed() => {
                    self.shared.queue().closed = true;
                    let remaining = self.shared.queue().heap.len();
                    info!(remaining, "dispatcher shutting down, draining queue");
                    while let Some(operation) = self.pop() {
                        apply(&handler, operation).await;
                    }
                    break;
                }
            }
        }

        info!("dispatcher stopped");
    }
}

/// A failed operation is logged with its request id; it never stops the loop.
async fn apply<H: OperationHandler>(handler: &Arc<H>, operation: Operation) {
    let handler = Arc::clone(handler);
    let request_id = operation.request_id.clone();
    let description = operation.payload.describe();
    let priority = operation.priority;

    let result = tokio::task::spawn_blocking(move || handler.apply(&operation))
        .await
        .unwrap_or_else(|e| Err(DispatchError::Handler(e.to_string())));

    match result {
        Ok(()) => debug!(%request_id, %priority, operation = %description, "operation applied"),
        Err(e) => error!(
            %request_id,
            %priority,
            operation = %description,
            error = %e,
            "operation failed"
        ),
    }
}
