//! Error types for dirscan
//!
//! This module defines the error hierarchy for the traversal/search engine:
//! - Argument-shape errors from the host boundary
//! - Filesystem and transcoding errors raised during traversal
//! - Handle and lifecycle errors
//! - Gateway delivery errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Per-entry failures are absorbed locally (the entry is skipped);
//!   context-wide failures stick to the context as `Status::Errored`
//! - Every failure path returns a tagged result; destructors never fail

use thiserror::Error;

/// Top-level error type for the scan engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Malformed, missing, or wrong-typed argument at the host boundary
    #[error("bad argument: {0}")]
    BadArgument(&'static str),

    /// Allocation failure at any layer
    #[error("out of memory")]
    OutOfMemory,

    /// A path or name failed native/UTF-8 transcoding
    #[error("invalid encoding in name under '{parent}'")]
    EncodingInvalid { parent: String },

    /// Root path does not exist or is inaccessible
    #[error("path not found: '{path}'")]
    PathNotFound { path: String },

    /// Operation against a closed or unknown context
    #[error("invalid context handle: {handle}")]
    HandleInvalid { handle: u64 },

    /// The messaging gateway could not reach the recipient
    #[error("delivery failed: recipient {recipient} no longer valid")]
    DeliveryFailed { recipient: u64 },
}

impl ScanError {
    /// Check if this error is absorbable for a single entry (skip and
    /// continue) rather than fatal to the whole context.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ScanError::EncodingInvalid { .. })
    }

    /// The sticky kind recorded on a context that entered `Errored`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::BadArgument(_) => ErrorKind::BadArgument,
            ScanError::OutOfMemory => ErrorKind::OutOfMemory,
            ScanError::EncodingInvalid { .. } => ErrorKind::EncodingInvalid,
            ScanError::PathNotFound { .. } => ErrorKind::PathNotFound,
            ScanError::HandleInvalid { .. } => ErrorKind::HandleInvalid,
            ScanError::DeliveryFailed { .. } => ErrorKind::DeliveryFailed,
        }
    }

    /// Short tag for host-facing error tuples.
    pub fn tag(&self) -> &'static str {
        self.kind().tag()
    }
}

/// Discriminant-only error kind, stored on a context in `Status::Errored`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadArgument,
    OutOfMemory,
    EncodingInvalid,
    PathNotFound,
    HandleInvalid,
    DeliveryFailed,
}

impl ErrorKind {
    /// Rebuild the surfaced error for a context stuck in `Errored`.
    ///
    /// `path` is the context's root, used for the variants that carry one.
    /// Only allocation and filesystem kinds are ever recorded on a context
    /// (handle and delivery failures are reported at their call site and
    /// never stick); any other kind reports as a malformed context.
    pub(crate) fn to_error(self, path: &str) -> ScanError {
        match self {
            ErrorKind::OutOfMemory => ScanError::OutOfMemory,
            ErrorKind::EncodingInvalid => ScanError::EncodingInvalid {
                parent: path.to_string(),
            },
            ErrorKind::PathNotFound => ScanError::PathNotFound {
                path: path.to_string(),
            },
            _ => ScanError::BadArgument("context in errored state"),
        }
    }

    /// Atom-style tag used when surfacing errors to the host
    pub fn tag(&self) -> &'static str {
        match self {
            ErrorKind::BadArgument => "badarg",
            ErrorKind::OutOfMemory => "oom",
            ErrorKind::EncodingInvalid => "encoding_invalid",
            ErrorKind::PathNotFound => "path_not_found",
            ErrorKind::HandleInvalid => "handle_invalid",
            ErrorKind::DeliveryFailed => "delivery_failed",
        }
    }
}

/// Result type alias for ScanError
pub type Result<T> = std::result::Result<T, ScanError>;

/// Classify an OS-level readdir failure against the path it occurred on.
///
/// NotFound and PermissionDenied on the root frame both surface as
/// `PathNotFound` ("does not exist or is inaccessible").
pub fn classify_io(err: &std::io::Error, path: &str) -> ScanError {
    use std::io::ErrorKind as IoKind;
    match err.kind() {
        IoKind::OutOfMemory => ScanError::OutOfMemory,
        IoKind::InvalidData => ScanError::EncodingInvalid {
            parent: path.to_string(),
        },
        _ => ScanError::PathNotFound {
            path: path.to_string(),
        },
    }
}
