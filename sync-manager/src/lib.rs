//! # sync-manager
//!
//! Keeps an in-memory directory of Z-Wave nodes in step with the driver's
//! notification stream and serves it to clients.
//!
//! ## Architecture
//!
//! ```text
//!  driver callbacks
//!        │  NotificationSink (bounded, ordered)
//!        ▼
//! ┌───────────────────────┐      ┌─────────────────┐
//! │ LifecycleController   │      │  NodeManager    │◄── HTTP / clients
//! │  run loop             │      │  list / update  │
//! │   └ Dispatcher ──────►│ NodeDirectory ◄────────┤
//! │        │              │      │  (RwLock)       │
//! │        ▼              │      └─────────────────┘
//! │   SummaryProjector ───┼──► BroadcastHub ──► subscribers
//! └───────────────────────┘
//! ```
//!
//! One task runs the dispatch loop and is the directory's only writer.
//! Readers work on owned snapshots and never hold the lock across a driver
//! call.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod hub;
pub mod lifecycle;
pub mod manager;
pub mod metrics;
pub mod projector;

pub use config::{BroadcastConfig, Config, ConfigError, HttpConfig, SessionConfig};
pub use dispatcher::{NotificationDispatcher, Outcome};
pub use error::{
    LookupError, ManagerError, ProcessingError, Result, StartupError, TeardownError, TeardownStep,
};
pub use hub::{BroadcastHub, Subscription};
pub use lifecycle::{LifecycleController, SessionReport, StateWatch, StopHandle};
pub use manager::{NodeManager, UpdateOutcome};
pub use metrics::ManagerMetrics;
pub use projector::SummaryProjector;
