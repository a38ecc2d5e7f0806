//! Directory enumerator adapter
//!
//! Wraps the OS "list one directory level" primitive (`std::fs::read_dir`)
//! into a restartable cursor. The cursor:
//! - produces raw entries one at a time, never `.`/`..`
//! - converts OS-native names to UTF-8, surfacing `EncodingInvalid` for
//!   names that do not transcode (the caller decides to skip)
//! - holds exactly one OS directory handle while open, and closes it on
//!   both exhaustion and forced closure
//!
//! OS enumeration handles are single-pass forward-only; a cursor cannot be
//! rewound, only re-opened.

use crate::error::{classify_io, Result, ScanError};
use crate::types::EntryKind;
use std::fs::{self, ReadDir};
use std::path::Path;
use tracing::debug;

/// One raw entry produced by a cursor, before path-prefix assembly
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// UTF-8 name of the entry within its directory
    pub name: String,

    /// Node kind, as reported by the OS without following symlinks
    pub kind: EntryKind,
}

/// Forward-only cursor over a single directory level
///
/// The inner handle is dropped as soon as the OS reports exhaustion, so a
/// drained cursor sitting on the frame stack costs no file descriptor.
#[derive(Debug)]
pub struct DirCursor {
    /// Directory path this cursor was opened on (for error context)
    path: String,

    /// Live OS handle; `None` once exhausted or force-closed
    inner: Option<ReadDir>,
}

impl DirCursor {
    /// Open a cursor on `path`.
    ///
    /// Fails with `PathNotFound` when the directory does not exist or is
    /// inaccessible.
    pub fn open(path: &str) -> Result<Self> {
        let inner = fs::read_dir(Path::new(path)).map_err(|e| classify_io(&e, path))?;
        Ok(Self {
            path: path.to_string(),
            inner: Some(inner),
        })
    }

    /// Directory path this cursor enumerates
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the cursor still holds an OS handle
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Produce the next raw entry.
    ///
    /// Returns:
    /// - `Ok(Some(entry))` - the next entry, pseudo-entries filtered out
    /// - `Ok(None)` - no more entries; the OS handle has been closed
    /// - `Err(EncodingInvalid)` - this one name failed transcoding; the
    ///   cursor remains usable and the next call moves past it
    /// - `Err(PathNotFound)` - the OS enumeration itself failed
    pub fn next_entry(&mut self) -> Result<Option<RawEntry>> {
        loop {
            let Some(iter) = self.inner.as_mut() else {
                return Ok(None);
            };

            let dirent = match iter.next() {
                Some(Ok(d)) => d,
                Some(Err(e)) => return Err(classify_io(&e, &self.path)),
                None => {
                    // Exhausted - release the OS handle immediately
                    self.close();
                    return Ok(None);
                }
            };

            // read_dir never yields . or .., but the raw primitive on some
            // platforms does; filter defensively to keep the contract
            let os_name = dirent.file_name();
            if os_name == "." || os_name == ".." {
                continue;
            }

            let name = os_name.into_string().map_err(|_| ScanError::EncodingInvalid {
                parent: self.path.clone(),
            })?;
            if name.is_empty() || name.contains('\0') {
                return Err(ScanError::EncodingInvalid {
                    parent: self.path.clone(),
                });
            }

            // A stat failure on the entry downgrades it to Other rather
            // than dropping it; the name itself is still valid
            let kind = match dirent.file_type() {
                Ok(ft) if ft.is_dir() => EntryKind::Directory,
                Ok(ft) if ft.is_file() => EntryKind::File,
                Ok(_) => EntryKind::Other,
                Err(e) => {
                    debug!(path = %self.path, name = %name, error = %e, "file_type failed");
                    EntryKind::Other
                }
            };

            return Ok(Some(RawEntry { name, kind }));
        }
    }

    /// Force-close the cursor, releasing its OS handle if still open.
    ///
    /// Idempotent; called on context close and again (as a no-op) by drop.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!(path = %self.path, "cursor closed");
        }
    }
}

impl Drop for DirCursor {
    fn drop(&mut self) {
        self.close();
    }
}
