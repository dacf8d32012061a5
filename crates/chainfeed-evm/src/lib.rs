//! chainfeed-evm: contract discovery, polling and job dispatch.
//!
//! ```text
//! ContractDirectory ─▶ InterfaceResolver ─▶ Poller (one task per contract)
//!   (registry)          (blob store,          ├── LogFetcher  eth_getLogs
//!                        DecodeTable)         └── Dispatcher  decode → WorkQueue
//! ```

pub mod blob;
pub mod consumer;
pub mod directory;
pub mod dispatcher;
mod error;
pub mod fetcher;
pub mod poller;
pub mod registry;
pub mod resolver;

pub use blob::{BlobStore, IpfsBlobStore};
pub use consumer::{Consumer, ConsumerBuilder};
pub use directory::ContractDirectory;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use fetcher::LogFetcher;
pub use poller::{PollState, Poller};
pub use registry::{ContractRegistry, RouterRegistry};
pub use resolver::InterfaceResolver;
