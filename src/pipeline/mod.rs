//! Demand-driven processing pipeline.
//!
//! Process objects are connected output to input and recompute lazily: asking
//! a node for an output first brings every upstream node up to date, and a
//! node only executes when it or something upstream changed since its last
//! execution.
//!
//! # Architecture
//!
//! ```text
//! [AcquisitionFileReader] ──► [filter] ──► [AcquisitionFileWriter]
//!                        └──► [filter] ──┘
//! ```
//!
//! # Design
//!
//! - **Node-local clocks**: every node stamps its modifications and executions
//!   with its own [`Clock`]; consumers record the producer stamps they used.
//! - **Non-owning inputs**: inputs are `Weak` links; dropping a producer
//!   disconnects its consumers.
//! - **Transactional execution**: outputs and stamps change only when data
//!   generation succeeds.

pub mod data;
pub mod id;
pub mod port;
pub mod process;

pub use data::{DataKind, DataObject};
pub use id::{Clock, TimeStamp};
pub use port::{PortDescriptor, PortDirection};
pub use process::{shared, ProcessCore, ProcessHandle, ProcessObject};
