//! Segmented list reconciliation for Horizon Reconcile.
//!
//! This module merges independently changing collections ("segments") into
//! one sectioned list and keeps a list widget in step with them through
//! batched structural edits. This enables:
//!
//! - Screens assembled from several data sources shown as one list
//! - Animated, minimal-churn updates driven by stable identities
//! - Backing data refreshed from any thread, applied on the owner context
//! - Lazy view creation for items that actually reach the screen
//!
//! # Core Types
//!
//! - `Edit` / `Transaction`: structural edits in the global index space
//! - `ListSink`: the widget-facing receiver of batched edits
//! - `Segment`: the capability every segment implements
//! - `ItemFactory`: produces and reclaims views for item payloads
//!
//! # Segment Implementations
//!
//! - `ListSegment`: a sectioned query result diffed by stable identity
//! - `FilterSegment`: a resident single-section array diffed by visibility
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_reconcile::model::{
//!     Composite, FnFactory, ListSegment, QueryItem, QuerySection, RecordingSink,
//! };
//!
//! let schedule = Arc::new(ListSegment::new(FnFactory::new(|e: &String| e.clone())));
//! schedule.set_snapshot(vec![
//!     QuerySection::new("mon", vec![QueryItem::new(1, "Trivia".to_string())]),
//!     QuerySection::new("tue", vec![QueryItem::new(2, "Karaoke".to_string())]),
//! ]);
//!
//! let mut composite = Composite::new();
//! composite.append(schedule.clone()).unwrap();
//!
//! let mut sink = RecordingSink::new();
//! composite.process_updates(Some(&mut sink));
//! assert_eq!(composite.section_count(), 2);
//! assert_eq!(composite.view(horizon_reconcile::model::IndexPath::new(1, 0)).as_deref(), Some("Karaoke"));
//! ```
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────┐  dirty + request  ┌─────────────┐  one batch  ┌──────────┐
//! │   Segments   │──────────────────>│  Composite  │────────────>│ ListSink │
//! │ (List/Filter)│<──────────────────│             │             │ (widget) │
//! └──────────────┘  diff / apply     └─────────────┘             └──────────┘
//!        ^                                  │
//!        │ Mailbox (any thread)             │ UpdateScheduler
//! ┌──────────────┐                          v
//! │ Query source │                   host event loop
//! └──────────────┘
//! ```

mod composite;
mod diff;
mod edit;
mod filter_segment;
mod item;
mod list_segment;
mod query;
mod segment;
mod sink;

pub use composite::{Composite, CompositeSignals, DrainReport, PassSummary};
pub use diff::{ListPlan, parallel_walk};
pub use edit::{Edit, EditCounts, IndexPath, Offsets, SectionSpan, Transaction};
pub use filter_segment::{FilterFn, FilterSegment};
pub use item::{FnFactory, Item, ItemFactory, ItemSize, Section};
pub use list_segment::ListSegment;
pub use query::{QueryItem, QueryProvider, QuerySection, QuerySnapshot};
pub use segment::{Segment, SegmentBase, SegmentId};
pub use sink::{ListSink, RecordingSink, SinkCall};
