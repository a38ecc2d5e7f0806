//! Core value types shared across the engine
//!
//! These types cross the boundary between the traversal engine and the
//! host-facing api layer, so they stay small and cheaply clonable.

use crate::error::ErrorKind;
use std::time::{Duration, Instant};

/// Kind of a discovered filesystem node
///
/// The engine only distinguishes what traversal needs: directories are
/// descended into, everything else is reported and passed over. Symlinks,
/// devices, pipes and sockets all collapse into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Anything else (symlink, device, fifo, socket, unknown)
    Other,
}

impl EntryKind {
    /// Check if this is a directory (traversal descends into these)
    pub fn is_dir(&self) -> bool {
        *self == EntryKind::Directory
    }

    /// Atom-style tag used when surfacing entries to the host
    pub fn tag(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Other => "other",
        }
    }
}

/// One discovered filesystem node
///
/// `name` is the bare entry name as the OS reported it, transcoded to
/// UTF-8: no directory prefix, no embedded NUL, never the `.`/`..`
/// pseudo-entries. Callers that need full paths join against the scan
/// root themselves. Names that fail transcoding are skipped at the
/// cursor layer and never appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry name, without any path prefix
    pub name: String,

    /// What kind of node this is
    pub kind: EntryKind,
}

impl Entry {
    pub fn new(name: String, kind: EntryKind) -> Self {
        Self { name, kind }
    }
}

/// Lifecycle status of a scan context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Created, no traversal started or traversal in progress
    Active,

    /// Budget ran out mid-traversal; the frame stack is intact and a later
    /// resume continues from exactly where this one stopped
    Suspended,

    /// The frame stack drained; the traversal produced its final entry
    Completed,

    /// Explicitly closed or finalized; terminal, all operations fail
    Closed,

    /// A context-wide failure; sticky until the context is closed
    Errored(ErrorKind),
}

impl Status {
    /// Whether a resume call may still make progress against this context
    pub fn is_resumable(&self) -> bool {
        matches!(self, Status::Active | Status::Suspended)
    }

    /// Atom-style tag used when surfacing status to the host
    pub fn tag(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Suspended => "suspended",
            Status::Completed => "completed",
            Status::Closed => "closed",
            Status::Errored(_) => "errored",
        }
    }
}

/// Time-slice allowance for a single resume call
///
/// The engine checks the budget after each produced entry; there is no
/// preemption mid-entry. An entry cap gives deterministic chunking for tests,
/// a wall-clock cap is what a host scheduler actually hands out.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    max_entries: Option<usize>,
    max_elapsed: Option<Duration>,
}

impl Budget {
    /// No limit; the resume runs to completion or error
    pub fn unbounded() -> Self {
        Self {
            max_entries: None,
            max_elapsed: None,
        }
    }

    /// Yield after producing at most `n` entries
    pub fn entries(n: usize) -> Self {
        Self {
            max_entries: Some(n),
            max_elapsed: None,
        }
    }

    /// Yield once `d` of wall-clock time has elapsed
    pub fn duration(d: Duration) -> Self {
        Self {
            max_entries: None,
            max_elapsed: Some(d),
        }
    }

    /// Convenience constructor for millisecond budgets from the host
    pub fn millis(ms: u64) -> Self {
        Self::duration(Duration::from_millis(ms))
    }

    /// Start metering one resume call
    pub fn start(&self) -> BudgetMeter {
        BudgetMeter {
            budget: *self,
            started: Instant::now(),
            produced: 0,
        }
    }
}

/// Running consumption state for one resume call
#[derive(Debug)]
pub struct BudgetMeter {
    budget: Budget,
    started: Instant,
    produced: usize,
}

impl BudgetMeter {
    /// Record one produced entry
    pub fn record_entry(&mut self) {
        self.produced += 1;
    }

    /// Check whether the slice is used up (called at entry boundaries only)
    pub fn exhausted(&self) -> bool {
        if let Some(max) = self.budget.max_entries {
            if self.produced >= max {
                return true;
            }
        }
        if let Some(max) = self.budget.max_elapsed {
            if self.started.elapsed() >= max {
                return true;
            }
        }
        false
    }

    /// Entries produced so far in this slice
    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Percent of the slice consumed, clamped to 1..=100, for host
    /// scheduler accounting. Unbounded budgets always report 100 on
    /// completion so the host charges a full slice for the work done.
    pub fn consumed_percent(&self) -> u8 {
        let pct = match (self.budget.max_entries, self.budget.max_elapsed) {
            (Some(max), _) if max > 0 => (self.produced * 100 / max).min(100),
            (_, Some(max)) if !max.is_zero() => {
                let used = self.started.elapsed().as_secs_f64() / max.as_secs_f64();
                ((used * 100.0) as usize).min(100)
            }
            _ => 100,
        };
        pct.max(1) as u8
    }
}
