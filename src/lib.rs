//! dirscan - Resumable Directory Traversal and Search Engine
//!
//! A traversal/search engine for embedding in host runtimes whose
//! scheduler must never be blocked for more than a bounded time slice.
//! The walk runs as an explicit state machine: traversal position lives on
//! a stack of directory cursors inside an opaque, handle-addressed scan
//! context, so a resume is a plain function call that continues exactly
//! where the previous slice stopped - no coroutines, no stack switching.
//!
//! # Features
//!
//! - **Bounded time slices**: every resume checks its budget after each
//!   produced entry and voluntarily yields with status `Suspended`.
//!
//! - **Opaque shared contexts**: contexts are addressed by numeric handle
//!   and released exactly once, from whichever of explicit close or
//!   host-GC finalization happens first.
//!
//! - **Unicode-correct names**: OS-native names are transcoded to UTF-8 at
//!   the cursor boundary; unencodable names are skipped, never fabricated.
//!
//! - **Filtered search**: a search is a traversal with a minimal glob
//!   predicate (`*` plus literals) over the same continuation contract.
//!
//! - **Cross-thread delivery**: scans dispatched to worker threads report
//!   back to the logical caller's mailbox, best-effort.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      api (term layer)                      │
//! │   defensive shape validation, timeslice accounting hook    │
//! └───────────────┬────────────────────────────┬───────────────┘
//!                 │                            │
//!         ┌───────▼────────┐          ┌────────▼────────┐
//!         │    registry    │          │     gateway     │
//!         │ handle table,  │          │ mailboxes,      │
//!         │ release-once,  │          │ worker dispatch │
//!         │ per-ctx lock   │          └────────┬────────┘
//!         └───────┬────────┘                   │
//!                 │              delivers results back to caller
//!         ┌───────▼────────┐
//!         │ engine/search  │  bounded slices, pre-order DFS
//!         └───────┬────────┘
//!         ┌───────▼────────┐
//!         │ context/cursor │  frame stack, OS readdir handles
//!         └────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use dirscan::{Budget, ContextRegistry, Status};
//!
//! let registry = ContextRegistry::global();
//! let handle = registry.create().unwrap();
//!
//! // Walk in 5ms slices until done
//! let mut root = Some("/data");
//! loop {
//!     let slice = registry.resume(handle, root, Budget::millis(5)).unwrap();
//!     root = None;
//!     for entry in &slice.entries {
//!         println!("{} ({:?})", entry.name, entry.kind);
//!     }
//!     if slice.status != Status::Suspended {
//!         break;
//!     }
//! }
//!
//! registry.close(handle).unwrap();
//! ```

pub mod api;
pub mod context;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod search;
pub mod types;

pub use api::{NoopAccountant, SliceAccountant, Term};
pub use context::{ScanContext, ScanStats};
pub use cursor::{DirCursor, RawEntry};
pub use engine::SliceResult;
pub use error::{ErrorKind, Result, ScanError};
pub use gateway::{Gateway, RecipientId, ScanMessage};
pub use registry::ContextRegistry;
pub use search::Pattern;
pub use types::{Budget, BudgetMeter, Entry, EntryKind, Status};
