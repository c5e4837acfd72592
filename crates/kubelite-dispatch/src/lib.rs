//! kubelite-dispatch — priority-ordered mutation dispatcher.
//!
//! API handlers do not write to the stores directly. They submit an
//! [`Operation`] carrying a priority and a request-correlation id; a single
//! worker pops operations highest-priority-first (FIFO within a priority)
//! and applies them through an [`OperationHandler`].
//!
//! # Architecture
//!
//! ```text
//! DispatcherHandle::submit()  ← API handlers (cloneable)
//!   └── BinaryHeap<Operation> + Notify
//!         └── Dispatcher::run() → OperationHandler::apply()
//!                                   └── StoreApplier (ConfigMaps, Secrets, Namespaces)
//! ```

pub mod applier;
pub mod dispatcher;
pub mod error;
pub mod operation;

pub use applier::StoreApplier;
pub use dispatcher::{Dispatcher, DispatcherHandle, OperationHandler};
pub use error::{DispatchError, DispatchResult};
pub use operation::{Operation, OperationPayload, Priority};
