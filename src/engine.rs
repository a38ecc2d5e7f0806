//! Yieldable traversal engine
//!
//! Depth-first pre-order walk over a directory tree, executed in bounded
//! time slices against a `ScanContext`. There are no native stack frames to
//! save: the traversal position is the context's explicit frame stack, so a
//! resume is a plain function call that picks up exactly where the previous
//! slice stopped.
//!
//! Slice discipline:
//! - the budget is checked after each produced entry, never mid-entry
//! - on exhaustion the status becomes `Suspended` and the frame stack is
//!   left exactly as-is
//! - when the stack drains the status becomes `Completed`
//!
//! Failure policy:
//! - an unencodable or unreadable child is skipped and traversal continues
//! - an enumeration failure on the root frame is fatal: the context goes
//!   `Errored(kind)` and every later resume returns the same error without
//!   touching the filesystem
//!
//! Traversal order is whatever the OS enumeration returns, reproducible
//! across resumptions for unchanged directory contents. A tree that mutates
//! mid-scan yields a torn view; that is a documented limitation.

use crate::context::{Frame, ScanContext};
use crate::cursor::DirCursor;
use crate::error::{Result, ScanError};
use crate::search::Pattern;
use crate::types::{Budget, BudgetMeter, Entry, EntryKind, Status};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Outcome of one resume call: the entries produced in this slice, the
/// context status after it, and the budget meter for host accounting.
#[derive(Debug)]
pub struct SliceResult {
    /// Entries produced during this slice (matching entries only, for a
    /// filtered resume)
    pub entries: Vec<Entry>,

    /// Context status after the slice
    pub status: Status,

    /// Consumed budget, for host time-slice accounting
    pub meter: BudgetMeter,
}

/// Run one bounded slice of plain traversal against `ctx`.
///
/// `root` is required on the first resume of a context and ignored (may be
/// `None`) afterwards. `cancel` is the context's cancel flag; a concurrent
/// close sets it and this call halts at the next entry boundary.
pub fn resume(
    ctx: &mut ScanContext,
    root: Option<&str>,
    budget: Budget,
    cancel: &AtomicBool,
) -> Result<SliceResult> {
    run_slice(ctx, root, budget, cancel, None)
}

/// Run one bounded slice of filtered traversal (see `search` module).
///
/// The budget meters every examined entry, matching or not, so a search
/// over a large tree with few matches still yields on time.
pub fn resume_filtered(
    ctx: &mut ScanContext,
    root: Option<&str>,
    budget: Budget,
    cancel: &AtomicBool,
    pattern: &Pattern,
) -> Result<SliceResult> {
    run_slice(ctx, root, budget, cancel, Some(pattern))
}

fn run_slice(
    ctx: &mut ScanContext,
    root: Option<&str>,
    budget: Budget,
    cancel: &AtomicBool,
    pattern: Option<&Pattern>,
) -> Result<SliceResult> {
    let mut meter = budget.start();

    match ctx.status() {
        Status::Active | Status::Suspended => {}
        Status::Completed => {
            return Ok(SliceResult {
                entries: Vec::new(),
                status: Status::Completed,
                meter,
            });
        }
        Status::Closed => return Err(ScanError::HandleInvalid { handle: 0 }),
        Status::Errored(kind) => {
            return Err(kind.to_error(ctx.root().unwrap_or_default()));
        }
    }

    // First resume binds the root and opens the root frame
    if ctx.frames.is_empty() && ctx.root.is_none() {
        let Some(root) = root else {
            return Err(ScanError::BadArgument("first resume requires a root path"));
        };
        // Bind the root before opening so a sticky error can name it
        ctx.root = Some(root.to_string());
        let cursor = match DirCursor::open(root) {
            Ok(c) => c,
            Err(e) => {
                ctx.set_error(e.kind());
                return Err(e);
            }
        };
        debug!(root, "traversal started");
        ctx.frames.push(Frame::new(cursor, String::new()));
    }

    ctx.status = Status::Active;

    loop {
        // A concurrent close halts the slice without touching more state
        if cancel.load(Ordering::Acquire) {
            debug!("cancel observed mid-slice");
            ctx.status = Status::Suspended;
            break;
        }

        let Some(frame) = ctx.frames.last_mut() else {
            ctx.status = Status::Completed;
            break;
        };

        let raw = match frame.cursor.next_entry() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                // Frame exhausted; its OS handle is already closed
                ctx.frames.pop();
                continue;
            }
            Err(e) if e.is_recoverable() => {
                debug!(error = %e, "skipping unencodable entry");
                ctx.stats.skipped += 1;
                continue;
            }
            Err(e) => {
                if ctx.frames.len() == 1 {
                    // Enumeration failure at the root frame is fatal
                    ctx.set_error(e.kind());
                    return Err(e);
                }
                warn!(error = %e, "dropping unreadable subdirectory frame");
                ctx.stats.skipped += 1;
                ctx.frames.pop();
                continue;
            }
        };

        // Entries carry the bare name exactly as the OS reported it; the
        // root-relative prefix stays inside the frame, used only to open
        // child cursors
        let descend = raw.kind.is_dir().then(|| frame.child_path(&raw.name));
        let matched = pattern.map_or(true, |p| p.matches(&raw.name));

        if matched {
            let kind = raw.kind;
            if let Err(e) = ctx.push_entry(Entry::new(raw.name, kind)) {
                ctx.set_error(e.kind());
                return Err(e);
            }
            match kind {
                EntryKind::Directory => ctx.stats.dirs += 1,
                _ => ctx.stats.files += 1,
            }
        }

        // Pre-order: the directory entry is already buffered before its
        // children are visited
        if let Some(rel) = descend {
            let root_path = ctx.root.as_deref().unwrap_or_default();
            let child_path = join_path(root_path, &rel);
            match DirCursor::open(&child_path) {
                Ok(cursor) => ctx.frames.push(Frame::new(cursor, rel)),
                Err(e) => {
                    // The directory itself was reported; only its contents
                    // are lost
                    warn!(path = %child_path, error = %e, "cannot descend, skipping");
                    ctx.stats.skipped += 1;
                }
            }
        }

        meter.record_entry();
        if meter.exhausted() {
            ctx.status = if ctx.frames.is_empty() {
                Status::Completed
            } else {
                Status::Suspended
            };
            break;
        }
    }

    Ok(SliceResult {
        entries: ctx.drain_buffer(),
        status: ctx.status(),
        meter,
    })
}

/// Join the scan root with a root-relative directory path
fn join_path(root: &str, name: &str) -> String {
    if root.ends_with('/') {
        format!("{root}{name}")
    } else {
        format!("{root}/{name}")
    }
}
