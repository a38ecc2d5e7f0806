//! Host-facing operations
//!
//! The host hands the engine loosely-typed term values; this layer
//! validates their shape defensively and translates between terms and the
//! engine's native types. A wrong-arity or wrong-typed call returns a
//! tagged error term - it must never panic, since a panic here would take
//! the host process down with it.
//!
//! Exposed operations:
//! - `create_context/0` -> `{ok, Context}` | `{error, oom}`
//! - `close_context/1` -> `ok` | `{error, badarg}`
//! - `resume_scan/3` (context, root | undefined, budget_ms) ->
//!   `{ok, {Entries, Status}}` | `{error, Reason}`
//! - `search_scan/4` (context, root | undefined, pattern, budget_ms) ->
//!   `{ok, {Entries, Status}}` | `{error, Reason}`
//!
//! Each entry term is `{Name, Kind}` with `Name` a UTF-8 binary and `Kind`
//! one of the atoms `file | directory | other`. A `budget_ms` of 0 means
//! unbounded. After every resume/search the layer reports the consumed
//! share of the time slice to the host scheduler hook.

use crate::error::ScanError;
use crate::gateway::RecipientId;
use crate::registry::ContextRegistry;
use crate::search::Pattern;
use crate::types::{Budget, Entry};
use tracing::debug;

/// Loosely-typed value exchanged with the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// Symbolic tag
    Atom(&'static str),
    /// Byte buffer (paths, patterns, entry names)
    Binary(Vec<u8>),
    /// Unsigned integer (budgets, counters)
    Uint(u64),
    /// Proper list
    List(Vec<Term>),
    /// Fixed-size tuple
    Tuple(Vec<Term>),
    /// Logical process identity
    Pid(RecipientId),
    /// Opaque context handle
    Resource(u64),
}

impl Term {
    /// UTF-8 binary from a string
    pub fn binary(s: &str) -> Term {
        let mut bytes = s.as_bytes().to_vec();
        bytes.shrink_to_fit();
        Term::Binary(bytes)
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Term::Binary(_))
    }

    pub fn is_pid(&self) -> bool {
        matches!(self, Term::Pid(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Term::List(_))
    }

    fn as_resource(&self) -> Option<u64> {
        match self {
            Term::Resource(h) => Some(*h),
            _ => None,
        }
    }

    fn as_uint(&self) -> Option<u64> {
        match self {
            Term::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// UTF-8 string from a binary term
    fn as_utf8(&self) -> Option<&str> {
        match self {
            Term::Binary(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }
}

/// Host scheduler hook for time-slice accounting
///
/// `consume_timeslice` receives the percent of the allotted slice this
/// call used; the return value tells the engine the host would prefer it
/// to yield (already done by the time this layer reports, so the value is
/// informational here).
pub trait SliceAccountant {
    fn consume_timeslice(&self, percent: u8) -> bool;
}

/// Accounting hook that discards the report (tests, synchronous hosts)
pub struct NoopAccountant;

impl SliceAccountant for NoopAccountant {
    fn consume_timeslice(&self, _percent: u8) -> bool {
        false
    }
}

fn ok_tag() -> Term {
    Term::Atom("ok")
}

fn error_term(err: &ScanError) -> Term {
    Term::Tuple(vec![Term::Atom("error"), Term::Atom(err.tag())])
}

fn badarg() -> Term {
    Term::Tuple(vec![Term::Atom("error"), Term::Atom("badarg")])
}

fn entry_term(entry: &Entry) -> Term {
    Term::Tuple(vec![
        Term::binary(&entry.name),
        Term::Atom(entry.kind.tag()),
    ])
}

fn slice_term(entries: &[Entry], status: crate::types::Status) -> Term {
    let list = entries.iter().map(entry_term).collect();
    Term::Tuple(vec![
        Term::Atom("ok"),
        Term::Tuple(vec![Term::List(list), Term::Atom(status.tag())]),
    ])
}

/// Decode the optional root argument: a path binary or the atom
/// `undefined` once the context is already bound.
fn decode_root(term: &Term) -> Option<Option<&str>> {
    match term {
        Term::Atom("undefined") => Some(None),
        Term::Binary(_) => term.as_utf8().map(Some),
        _ => None,
    }
}

fn decode_budget(term: &Term) -> Option<Budget> {
    let ms = term.as_uint()?;
    Some(if ms == 0 {
        Budget::unbounded()
    } else {
        Budget::millis(ms)
    })
}

/// `create_context/0`
pub fn create_context(args: &[Term]) -> Term {
    if !args.is_empty() {
        return badarg();
    }
    match ContextRegistry::global().create() {
        Ok(handle) => Term::Tuple(vec![Term::Atom("ok"), Term::Resource(handle)]),
        Err(e) => error_term(&e),
    }
}

/// `close_context/1`
pub fn close_context(args: &[Term]) -> Term {
    let [ctx] = args else { return badarg() };
    let Some(handle) = ctx.as_resource() else {
        return badarg();
    };
    match ContextRegistry::global().close(handle) {
        Ok(()) => ok_tag(),
        Err(e) => error_term(&e),
    }
}

/// `resume_scan/3` - (context, root | undefined, budget_ms)
pub fn resume_scan(args: &[Term], accountant: &dyn SliceAccountant) -> Term {
    let [ctx, root, budget] = args else {
        return badarg();
    };
    let Some(handle) = ctx.as_resource() else {
        return badarg();
    };
    let Some(root) = decode_root(root) else {
        return badarg();
    };
    let Some(budget) = decode_budget(budget) else {
        return badarg();
    };

    match ContextRegistry::global().resume(handle, root, budget) {
        Ok(slice) => {
            let pct = slice.meter.consumed_percent();
            accountant.consume_timeslice(pct);
            debug!(handle, produced = slice.entries.len(), pct, "resume slice");
            slice_term(&slice.entries, slice.status)
        }
        Err(e) => error_term(&e),
    }
}

/// `search_scan/4` - (context, root | undefined, pattern, budget_ms)
pub fn search_scan(args: &[Term], accountant: &dyn SliceAccountant) -> Term {
    let [ctx, root, pattern, budget] = args else {
        return badarg();
    };
    let Some(handle) = ctx.as_resource() else {
        return badarg();
    };
    let Some(root) = decode_root(root) else {
        return badarg();
    };
    let Some(pattern) = pattern.as_utf8() else {
        return badarg();
    };
    let Some(budget) = decode_budget(budget) else {
        return badarg();
    };

    let pattern = Pattern::new(pattern);
    match ContextRegistry::global().search(handle, root, &pattern, budget) {
        Ok(slice) => {
            let pct = slice.meter.consumed_percent();
            accountant.consume_timeslice(pct);
            debug!(handle, matched = slice.entries.len(), pct, "search slice");
            slice_term(&slice.entries, slice.status)
        }
        Err(e) => error_term(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unwrap_handle(term: Term) -> u64 {
        match term {
            Term::Tuple(parts) => match parts.as_slice() {
                [Term::Atom("ok"), Term::Resource(h)] => *h,
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_create_and_close_roundtrip() {
        let handle = unwrap_handle(create_context(&[]));
        assert_eq!(close_context(&[Term::Resource(handle)]), Term::Atom("ok"));
        // Idempotent through the term layer too
        assert_eq!(close_context(&[Term::Resource(handle)]), Term::Atom("ok"));
    }

    #[test]
    fn test_create_rejects_extra_args() {
        assert_eq!(create_context(&[Term::Uint(1)]), badarg());
    }

    #[test]
    fn test_close_rejects_wrong_shapes() {
        assert_eq!(close_context(&[]), badarg());
        assert_eq!(close_context(&[Term::Uint(3)]), badarg());
        assert_eq!(
            close_context(&[Term::Resource(1), Term::Resource(2)]),
            badarg()
        );
    }

    #[test]
    fn test_resume_rejects_wrong_shapes() {
        let acct = NoopAccountant;
        // Wrong arity
        assert_eq!(resume_scan(&[], &acct), badarg());
        // Not a resource
        assert_eq!(
            resume_scan(
                &[Term::Uint(1), Term::binary("/tmp"), Term::Uint(0)],
                &acct
            ),
            badarg()
        );
        // Root neither binary nor undefined
        let handle = unwrap_handle(create_context(&[]));
        assert_eq!(
            resume_scan(
                &[Term::Resource(handle), Term::Uint(1), Term::Uint(0)],
                &acct
            ),
            badarg()
        );
        // Invalid UTF-8 in the path binary
        assert_eq!(
            resume_scan(
                &[
                    Term::Resource(handle),
                    Term::Binary(vec![0xff, 0xfe]),
                    Term::Uint(0)
                ],
                &acct
            ),
            badarg()
        );
        close_context(&[Term::Resource(handle)]);
    }

    #[test]
    fn test_resume_missing_path_is_tagged_error() {
        let acct = NoopAccountant;
        let handle = unwrap_handle(create_context(&[]));
        let result = resume_scan(
            &[
                Term::Resource(handle),
                Term::binary("/definitely/not/here/dirscan"),
                Term::Uint(0),
            ],
            &acct,
        );
        assert_eq!(
            result,
            Term::Tuple(vec![Term::Atom("error"), Term::Atom("path_not_found")])
        );
        close_context(&[Term::Resource(handle)]);
    }

    #[test]
    fn test_resume_on_closed_context() {
        let acct = NoopAccountant;
        let handle = unwrap_handle(create_context(&[]));
        close_context(&[Term::Resource(handle)]);

        let result = resume_scan(
            &[Term::Resource(handle), Term::Atom("undefined"), Term::Uint(0)],
            &acct,
        );
        assert_eq!(
            result,
            Term::Tuple(vec![Term::Atom("error"), Term::Atom("handle_invalid")])
        );
    }

    #[test]
    fn test_full_scan_through_term_layer() {
        use std::fs::{self, File};
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let acct = NoopAccountant;
        let handle = unwrap_handle(create_context(&[]));
        let result = resume_scan(
            &[
                Term::Resource(handle),
                Term::binary(dir.path().to_str().unwrap()),
                Term::Uint(0),
            ],
            &acct,
        );

        match result {
            Term::Tuple(parts) => match parts.as_slice() {
                [Term::Atom("ok"), Term::Tuple(inner)] => {
                    let [Term::List(entries), Term::Atom(status)] = inner.as_slice() else {
                        panic!("unexpected inner: {inner:?}");
                    };
                    assert_eq!(*status, "completed");
                    assert_eq!(entries.len(), 2);
                    assert!(entries.iter().all(|e| matches!(
                        e,
                        Term::Tuple(pair) if pair.len() == 2 && pair[0].is_binary()
                    )));
                }
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
        close_context(&[Term::Resource(handle)]);
    }

    #[test]
    fn test_search_through_term_layer() {
        use std::fs::File;
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("keep.txt")).unwrap();
        File::create(dir.path().join("drop.log")).unwrap();

        let acct = NoopAccountant;
        let handle = unwrap_handle(create_context(&[]));
        let result = search_scan(
            &[
                Term::Resource(handle),
                Term::binary(dir.path().to_str().unwrap()),
                Term::binary("*.txt"),
                Term::Uint(0),
            ],
            &acct,
        );

        match result {
            Term::Tuple(parts) => match parts.as_slice() {
                [Term::Atom("ok"), Term::Tuple(inner)] => {
                    let [Term::List(entries), _] = inner.as_slice() else {
                        panic!("unexpected inner: {inner:?}");
                    };
                    assert_eq!(entries.len(), 1);
                    assert_eq!(
                        entries[0],
                        Term::Tuple(vec![Term::binary("keep.txt"), Term::Atom("file")])
                    );
                }
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
        close_context(&[Term::Resource(handle)]);
    }

    #[test]
    fn test_term_predicates() {
        assert!(Term::binary("x").is_binary());
        assert!(Term::Pid(RecipientId(1)).is_pid());
        assert!(Term::List(vec![]).is_list());
        assert!(!Term::Uint(0).is_binary());
    }

    #[test]
    fn test_timeslice_reported() {
        use std::sync::atomic::{AtomicU8, Ordering};

        struct Recording(AtomicU8);
        impl SliceAccountant for Recording {
            fn consume_timeslice(&self, percent: u8) -> bool {
                self.0.store(percent, Ordering::Relaxed);
                true
            }
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::File::create(dir.path().join("a")).unwrap();

        let acct = Recording(AtomicU8::new(0));
        let handle = unwrap_handle(create_context(&[]));
        resume_scan(
            &[
                Term::Resource(handle),
                Term::binary(dir.path().to_str().unwrap()),
                Term::Uint(0),
            ],
            &acct,
        );
        // Unbounded budgets report a full slice consumed
        assert_eq!(acct.0.load(Ordering::Relaxed), 100);
        close_context(&[Term::Resource(handle)]);
    }
}
