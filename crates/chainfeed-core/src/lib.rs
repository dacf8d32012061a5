//! chainfeed-core: data model and seams for the contract event consumer.
//!
//! # Architecture
//!
//! ```text
//! ContractDirectory → InterfaceResolver → (per contract) Poller
//!                                              ├── LogFetcher   (eth_getLogs)
//!                                              ├── Dispatcher   (decode → Job → WorkQueue)
//!                                              └── Cursor       (CursorStore)
//! WorkQueue → JobWorker → HandlerRegistry → JobHandler
//! ```

pub mod block;
pub mod config;
pub mod cursor;
pub mod error;
pub mod event;
pub mod handler;
pub mod job;
pub mod logging;
pub mod queue;
pub mod types;

pub use block::BlockNumber;
pub use config::{BidderSource, ConsumerConfig};
pub use cursor::{Cursor, CursorStore, FileCursorStore, MemoryCursorStore};
pub use error::{HandlerError, IngestError};
pub use event::TrackedEvent;
pub use handler::{HandlerRegistry, JobHandler, JobProgress};
pub use job::{Job, JobPayload};
pub use queue::{MemoryQueue, PutAck, WorkQueue};
pub use types::{ContractInstance, DecodedEvent, NormalizedValue, RawLogEntry, TargetRecord};
