//! Scan context - the unit of in-progress traversal state
//!
//! A `ScanContext` carries everything a traversal needs across yield points:
//! the stack of open directory cursors, the partial result buffer, and the
//! lifecycle status. It is owned jointly by the engine and the host's
//! resource registry; this module only holds the state and its release
//! logic, while handle addressing and sharing live in `registry`.

use crate::cursor::DirCursor;
use crate::error::{ErrorKind, Result, ScanError};
use crate::types::{Entry, Status};
use tracing::debug;

/// Initial capacity reserved for the result buffer on creation
const INITIAL_BUFFER_CAPACITY: usize = 64;

/// One open directory level on the traversal stack
#[derive(Debug)]
pub(crate) struct Frame {
    /// Cursor over this directory's entries
    pub(crate) cursor: DirCursor,

    /// Root-relative path of this frame's directory (empty for the root
    /// frame); internal to descent, never part of a reported entry
    pub(crate) prefix: String,
}

impl Frame {
    pub(crate) fn new(cursor: DirCursor, prefix: String) -> Self {
        Self { cursor, prefix }
    }

    /// Root-relative path of a child of this frame, for opening its cursor
    pub(crate) fn child_path(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }
}

/// Running counters for one traversal, surfaced for logging only
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanStats {
    /// Directories reported
    pub dirs: u64,

    /// Files reported
    pub files: u64,

    /// Per-entry errors absorbed (entry skipped, traversal continued)
    pub skipped: u64,
}

/// In-progress traversal/search state
///
/// Single-threaded-in-use: the registry serializes resume calls against the
/// same context, so nothing here needs interior synchronization.
#[derive(Debug)]
pub struct ScanContext {
    /// Root path bound by the first resume; `None` until then
    pub(crate) root: Option<String>,

    /// Open directory cursors, top of stack = deepest directory
    pub(crate) frames: Vec<Frame>,

    /// Entries accumulated since the last drain
    pub(crate) buffer: Vec<Entry>,

    /// Lifecycle status
    pub(crate) status: Status,

    /// Counters for logging
    pub(crate) stats: ScanStats,
}

impl ScanContext {
    /// Create an empty, `Active` context.
    ///
    /// The only failure mode is allocation failure while reserving the
    /// result buffer.
    pub fn new() -> Result<Self> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve(INITIAL_BUFFER_CAPACITY)
            .map_err(|_| ScanError::OutOfMemory)?;

        Ok(Self {
            root: None,
            frames: Vec::new(),
            buffer,
            status: Status::Active,
            stats: ScanStats::default(),
        })
    }

    /// Current lifecycle status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Counters for logging
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Root path, once bound by the first resume
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Current traversal depth (open frames)
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Append a produced entry to the result buffer.
    ///
    /// Growth is fallible so a huge directory cannot abort the host on
    /// allocation failure; the context goes `Errored(OutOfMemory)` instead.
    pub(crate) fn push_entry(&mut self, entry: Entry) -> Result<()> {
        if self.buffer.len() == self.buffer.capacity() {
            self.buffer
                .try_reserve(self.buffer.capacity().max(INITIAL_BUFFER_CAPACITY))
                .map_err(|_| ScanError::OutOfMemory)?;
        }
        self.buffer.push(entry);
        Ok(())
    }

    /// Take the entries accumulated since the last drain.
    ///
    /// The returned vector is shrunk to what was actually produced; the
    /// context keeps an empty buffer for the next slice.
    pub(crate) fn drain_buffer(&mut self) -> Vec<Entry> {
        let mut out = std::mem::take(&mut self.buffer);
        out.shrink_to_fit();
        out
    }

    /// Record a context-wide failure; sticky until close.
    pub(crate) fn set_error(&mut self, kind: ErrorKind) {
        debug!(kind = ?kind, "context errored");
        self.release_frames();
        self.status = Status::Errored(kind);
    }

    /// Close every open cursor from every stack frame.
    fn release_frames(&mut self) {
        for frame in &mut self.frames {
            frame.cursor.close();
        }
        self.frames.clear();
    }

    /// Release everything the context owns and transition to `Closed`.
    ///
    /// Idempotent: a second call finds no frames, no buffer, and the
    /// status already terminal. Must not fail - this runs on the host-GC
    /// finalization path as well as explicit close.
    pub(crate) fn release(&mut self) {
        if self.status == Status::Closed {
            return;
        }
        debug!(
            root = self.root.as_deref().unwrap_or("<unbound>"),
            frames = self.frames.len(),
            buffered = self.buffer.len(),
            "releasing context"
        );
        self.release_frames();
        self.buffer = Vec::new();
        self.status = Status::Closed;
    }
}

impl Drop for ScanContext {
    fn drop(&mut self) {
        // Safety net for contexts dropped without an explicit close
        self.release();
    }
}
