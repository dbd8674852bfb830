//! Core systems for Horizon Reconcile.
//!
//! This crate provides the runtime pieces the reconciliation engine is built on:
//!
//! - **Errors**: `ReconcileError` and `ConfigError`
//! - **Logging**: `tracing` targets, span names and a `PerfSpan` guard
//! - **Configuration**: `ReconcileConfig`, loadable from TOML
//! - **Owner-context checks**: `ThreadAffinity`
//! - **Update scheduling**: coalescing `UpdateScheduler` and per-segment `UpdateRequester`
//! - **Marshaling**: `Mailbox`/`MailboxSender` for changes raised on other threads
//! - **Signals**: direct-invocation `Signal` for commit notifications
//!
//! # Example
//!
//! ```
//! use horizon_reconcile_core::{mailbox, UpdateRequester, UpdateScheduler};
//!
//! let scheduler = UpdateScheduler::new();
//! let requester = UpdateRequester::new();
//! requester.attach(scheduler.clone());
//!
//! let (sender, inbox) = mailbox::<String>(requester);
//! sender.post("refreshed".to_string());
//!
//! if scheduler.take_pending() {
//!     for change in inbox.drain() {
//!         println!("applying {}", change);
//!     }
//! }
//! ```

mod config;
mod error;
pub mod logging;
mod mailbox;
mod scheduler;
pub mod signal;
pub mod thread_check;

pub use config::ReconcileConfig;
pub use error::{ConfigError, ReconcileError, Result};
pub use logging::PerfSpan;
pub use mailbox::{Mailbox, MailboxSender, mailbox};
pub use scheduler::{UpdateRequester, UpdateScheduler};
pub use signal::{ConnectionId, Signal};
pub use thread_check::ThreadAffinity;
