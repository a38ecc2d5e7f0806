//! Search engine - filtered traversal
//!
//! A search is a plain traversal with a match predicate applied to each
//! produced entry; it shares the traversal engine's frame stack, budget
//! discipline, and `Suspended`/`Completed` continuation contract.
//!
//! Pattern language (deliberately minimal):
//! - `*` matches any run of characters, including none
//! - every other character matches itself, case-sensitively
//!
//! The predicate is applied to the entry's bare name, so `*.txt` finds a
//! nested `c.txt` as readily as a top-level `a.txt`.

use crate::context::ScanContext;
use crate::engine::{self, SliceResult};
use crate::error::Result;
use crate::types::Budget;
use std::sync::atomic::AtomicBool;

/// Compiled match predicate for the minimal glob language
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    /// Literal runs between `*` wildcards, in order
    segments: Vec<String>,
    leading_star: bool,
    trailing_star: bool,
}

impl Pattern {
    /// Compile a pattern. Never fails: every string is a valid pattern.
    pub fn new(pattern: &str) -> Self {
        let leading_star = pattern.starts_with('*');
        let trailing_star = pattern.ends_with('*');
        let segments = pattern
            .split('*')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            raw: pattern.to_string(),
            segments,
            leading_star,
            trailing_star,
        }
    }

    /// The pattern source text
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this pattern matches every name (`*`, `**`, ...)
    pub fn is_match_all(&self) -> bool {
        self.segments.is_empty() && self.leading_star
    }

    /// Match against an entry name.
    ///
    /// Callers holding a full path may pass it as-is; only the final
    /// component is tested.
    pub fn matches(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);

        if self.segments.is_empty() {
            // Pure wildcard or the empty pattern
            return self.leading_star || name.is_empty();
        }

        let mut rest = name;

        // Without a leading star, the first segment is anchored
        let first = &self.segments[0];
        if !self.leading_star {
            match rest.strip_prefix(first.as_str()) {
                Some(r) => rest = r,
                None => return false,
            }
        }

        let anchored_skip = usize::from(!self.leading_star);
        let tail_segments = &self.segments[anchored_skip..];

        // Middle segments float: each must appear, in order
        let (middle, last) = match tail_segments.split_last() {
            Some((last, middle)) => (middle, Some(last)),
            None => (&[] as &[String], None),
        };

        for seg in middle {
            match rest.find(seg.as_str()) {
                Some(idx) => rest = &rest[idx + seg.len()..],
                None => return false,
            }
        }

        match last {
            None => {
                // Fully consumed by the anchored head; a trailing star
                // absorbs the remainder
                self.trailing_star || rest.is_empty()
            }
            Some(seg) if self.trailing_star => rest.contains(seg.as_str()),
            Some(seg) => {
                // Last segment anchored at the end, not overlapping what
                // the middle segments already consumed
                rest.len() >= seg.len() && rest.ends_with(seg.as_str())
            }
        }
    }
}

/// Run one bounded slice of search against `ctx`.
///
/// Same continuation contract as `engine::resume`: `Suspended` on budget
/// exhaustion with the frame stack intact, `Completed` when the tree is
/// done. Only matching entries are returned; non-matching entries still
/// count against the budget since examining them is work.
pub fn search(
    ctx: &mut ScanContext,
    root: Option<&str>,
    pattern: &Pattern,
    budget: Budget,
    cancel: &AtomicBool,
) -> Result<SliceResult> {
    engine::resume_filtered(ctx, root, budget, cancel, pattern)
}
