//! Horizon Reconcile - incremental list reconciliation.
//!
//! Composes independently refreshed segments into one sectioned list and
//! drives a list widget with batched insert/delete/move edits.
//!
//! This is the main crate; it re-exports the core runtime.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_reconcile::model::{Composite, FilterSegment, FnFactory, RecordingSink};
//!
//! let deck = Arc::new(FilterSegment::new(FnFactory::new(|s: &String| s.clone())));
//! deck.push("lido", "Lido".to_string()).unwrap();
//!
//! let mut composite = Composite::new();
//! composite.append(deck.clone()).unwrap();
//! composite.process_updates(Some(&mut RecordingSink::new()));
//!
//! deck.set_visible(&"lido", false);
//! let report = composite.process_updates(None);
//! assert_eq!(report.edits.section_deletes, 1);
//! ```

pub use horizon_reconcile_core::*;

pub mod model;
