//! Context registry - handle table and resource lifecycle controller
//!
//! The host sees a scan context only as an opaque numeric handle; this
//! module owns the mapping from handles to live contexts and enforces the
//! lifecycle rules:
//!
//! - release happens exactly once, from whichever of explicit `close` or
//!   host-GC `finalize` occurs first (atomic released guard)
//! - resume calls against one context are serialized by a per-context
//!   mutex; different contexts are fully independent
//! - a close racing an in-flight resume sets the context's cancel flag,
//!   so the resume halts at its next entry boundary before the close
//!   takes the lock and releases the cursors
//!
//! The process-wide registry is initialized once (`ContextRegistry::global`)
//! before any context is created; there is no other global mutable state.

use crate::context::ScanContext;
use crate::engine::{self, SliceResult};
use crate::error::{Result, ScanError};
use crate::search::{self, Pattern};
use crate::types::Budget;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, warn};

static GLOBAL: OnceLock<ContextRegistry> = OnceLock::new();

/// One registered context and its lifecycle flags
struct Slot {
    /// Set by close; an in-flight resume observes it between entries
    cancel: AtomicBool,

    /// Release-exactly-once guard across close and finalize
    released: AtomicBool,

    /// The context itself; the mutex serializes resumes
    ctx: Mutex<ScanContext>,
}

/// Handle table for scan contexts
pub struct ContextRegistry {
    slots: Mutex<HashMap<u64, Arc<Slot>>>,
    next_handle: AtomicU64,
}

impl ContextRegistry {
    /// Create a standalone registry (tests use this; production code goes
    /// through `global`).
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// The process-wide registry, initialized on first use.
    pub fn global() -> &'static ContextRegistry {
        GLOBAL.get_or_init(ContextRegistry::new)
    }

    /// Allocate an empty, `Active` context and return its handle.
    pub fn create(&self) -> Result<u64> {
        let ctx = ScanContext::new()?;
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(Slot {
            cancel: AtomicBool::new(false),
            released: AtomicBool::new(false),
            ctx: Mutex::new(ctx),
        });
        self.slots.lock().expect("registry poisoned").insert(handle, slot);
        debug!(handle, "context created");
        Ok(handle)
    }

    /// Number of live (not yet finalized) slots.
    pub fn len(&self) -> usize {
        self.slots.lock().expect("registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, handle: u64) -> Option<Arc<Slot>> {
        self.slots
            .lock()
            .expect("registry poisoned")
            .get(&handle)
            .cloned()
    }

    /// Explicitly close a context.
    ///
    /// Idempotent: closing twice, or closing after finalize, is a no-op.
    /// Safe against an in-flight resume: the cancel flag halts it before
    /// the release takes the context lock.
    pub fn close(&self, handle: u64) -> Result<()> {
        let Some(slot) = self.slot(handle) else {
            // Already finalized or never existed; tolerate the race with
            // host GC
            return Ok(());
        };
        slot.cancel.store(true, Ordering::Release);
        if !slot.released.swap(true, Ordering::AcqRel) {
            slot.ctx.lock().expect("context poisoned").release();
            debug!(handle, "context closed");
        }
        Ok(())
    }

    /// Host-GC finalizer: same release as `close`, then the handle is
    /// forgotten. Never fails.
    pub fn finalize(&self, handle: u64) {
        let removed = self
            .slots
            .lock()
            .expect("registry poisoned")
            .remove(&handle);
        let Some(slot) = removed else { return };
        slot.cancel.store(true, Ordering::Release);
        if !slot.released.swap(true, Ordering::AcqRel) {
            slot.ctx.lock().expect("context poisoned").release();
            debug!(handle, "context finalized");
        }
    }

    /// Run one bounded slice of traversal against the context behind
    /// `handle`. `root` is required on the first resume.
    pub fn resume(&self, handle: u64, root: Option<&str>, budget: Budget) -> Result<SliceResult> {
        self.with_context(handle, |ctx, cancel| {
            engine::resume(ctx, root, budget, cancel)
        })
    }

    /// Run one bounded slice of filtered traversal.
    pub fn search(
        &self,
        handle: u64,
        root: Option<&str>,
        pattern: &Pattern,
        budget: Budget,
    ) -> Result<SliceResult> {
        self.with_context(handle, |ctx, cancel| {
            search::search(ctx, root, pattern, budget, cancel)
        })
    }

    fn with_context<F>(&self, handle: u64, f: F) -> Result<SliceResult>
    where
        F: FnOnce(&mut ScanContext, &AtomicBool) -> Result<SliceResult>,
    {
        let Some(slot) = self.slot(handle) else {
            warn!(handle, "operation on unknown handle");
            return Err(ScanError::HandleInvalid { handle });
        };
        if slot.released.load(Ordering::Acquire) {
            return Err(ScanError::HandleInvalid { handle });
        }

        let mut ctx = slot.ctx.lock().expect("context poisoned");

        // Close may have won the race while we waited for the lock
        if slot.released.load(Ordering::Acquire) {
            return Err(ScanError::HandleInvalid { handle });
        }

        f(&mut ctx, &slot.cancel).map_err(|e| match e {
            // The engine does not know the handle; fill it in here
            ScanError::HandleInvalid { handle: 0 } => ScanError::HandleInvalid { handle },
            other => other,
        })
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_create_and_resume_through_registry() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        let root = dir.path().to_str().unwrap();

        let reg = ContextRegistry::new();
        let handle = reg.create().unwrap();

        let result = reg.resume(handle, Some(root), Budget::unbounded()).unwrap();
        assert_eq!(result.status, Status::Completed);
        assert_eq!(result.entries.len(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let reg = ContextRegistry::new();
        let handle = reg.create().unwrap();

        reg.close(handle).unwrap();
        reg.close(handle).unwrap();

        // Close after finalize is also a no-op
        reg.finalize(handle);
        reg.close(handle).unwrap();
    }

    #[test]
    fn test_resume_after_close_is_handle_invalid() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        File::create(dir.path().join("b.txt")).unwrap();
        let root = dir.path().to_str().unwrap();

        let reg = ContextRegistry::new();
        let handle = reg.create().unwrap();

        // Suspend mid-traversal, then close
        let slice = reg.resume(handle, Some(root), Budget::entries(1)).unwrap();
        assert_eq!(slice.status, Status::Suspended);
        reg.close(handle).unwrap();

        let err = reg.resume(handle, None, Budget::unbounded()).unwrap_err();
        assert_eq!(err, ScanError::HandleInvalid { handle });
    }

    #[test]
    fn test_resume_on_unknown_handle() {
        let reg = ContextRegistry::new();
        let err = reg.resume(9999, None, Budget::unbounded()).unwrap_err();
        assert_eq!(err, ScanError::HandleInvalid { handle: 9999 });
    }

    #[test]
    fn test_finalize_forgets_handle() {
        let reg = ContextRegistry::new();
        let handle = reg.create().unwrap();
        assert_eq!(reg.len(), 1);

        reg.finalize(handle);
        assert!(reg.is_empty());

        // Double finalize never faults
        reg.finalize(handle);
    }

    #[test]
    fn test_contexts_are_independent() {
        let dir_a = tempdir().unwrap();
        File::create(dir_a.path().join("a")).unwrap();
        let dir_b = tempdir().unwrap();
        File::create(dir_b.path().join("b")).unwrap();
        fs::create_dir(dir_b.path().join("sub")).unwrap();

        let reg = ContextRegistry::new();
        let ha = reg.create().unwrap();
        let hb = reg.create().unwrap();

        let ra = reg
            .resume(ha, Some(dir_a.path().to_str().unwrap()), Budget::unbounded())
            .unwrap();
        reg.close(hb).unwrap();

        assert_eq!(ra.status, Status::Completed);
        assert_eq!(ra.entries.len(), 1);
        assert!(reg
            .resume(hb, Some(dir_b.path().to_str().unwrap()), Budget::unbounded())
            .is_err());
    }

    #[test]
    fn test_search_through_registry() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("keep.txt")).unwrap();
        File::create(dir.path().join("drop.log")).unwrap();
        let root = dir.path().to_str().unwrap();

        let reg = ContextRegistry::new();
        let handle = reg.create().unwrap();
        let result = reg
            .search(handle, Some(root), &Pattern::new("*.txt"), Budget::unbounded())
            .unwrap();

        assert_eq!(result.status, Status::Completed);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].name, "keep.txt");
    }
}
