//! Collaborator store contracts for the monitoring engine
//!
//! Device CRUD, log history and alert persistence live outside this core;
//! the engine only consumes the trait contracts defined here.
//!
//! ## Design
//!
//! - **Trait-based**: `DeviceStore` / `LogStore` / `AlertStore` allow the
//!   surrounding system to plug in its own persistence
//! - **Async**: all operations are async for compatibility with Tokio
//! - **In-memory defaults**: `memory` provides concurrent map-backed
//!   implementations used by the bin and the tests

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;

pub use backend::{AlertStore, DeviceStore, LogStore};
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryAlertStore, MemoryDeviceStore, MemoryLogStore};
pub use schema::{LogStats, MonitoringLog};
