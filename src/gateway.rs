//! Cross-thread messaging gateway
//!
//! Long scans run on worker threads decoupled from the logical caller. The
//! gateway carries the outcome back to the caller's mailbox:
//!
//! - each message is constructed in isolation on the worker thread - it
//!   owns all of its data and never borrows from the recipient, which may
//!   be doing unrelated work concurrently
//! - delivery targets the recipient identity captured when the operation
//!   was dispatched, not whichever thread happens to run it
//! - delivery is best-effort and fire-and-forget from the engine's point
//!   of view: a vanished recipient yields `DeliveryFailed`, which is
//!   reported but never retried here (retry policy belongs to the caller)

use crate::engine::SliceResult;
use crate::error::{Result, ScanError};
use crate::registry::ContextRegistry;
use crate::search::Pattern;
use crate::types::{Budget, Entry, Status};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Identity of a logical message recipient
///
/// Captured at dispatch time; stays valid until the recipient unregisters
/// or drops its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecipientId(pub u64);

/// Outcome message delivered to a recipient's mailbox
///
/// Fully owned: entries are moved in, nothing borrows the recipient's
/// environment.
#[derive(Debug, Clone)]
pub enum ScanMessage {
    /// A resume or search slice finished
    SliceDone {
        handle: u64,
        entries: Vec<Entry>,
        status: Status,
    },

    /// The operation failed
    SliceFailed { handle: u64, error: ScanError },
}

struct GatewayInner {
    mailboxes: Mutex<HashMap<u64, Sender<ScanMessage>>>,
    next_recipient: AtomicU64,
    worker_seq: AtomicU64,
}

impl GatewayInner {
    fn deliver(&self, to: RecipientId, msg: ScanMessage) -> Result<()> {
        let sender = self
            .mailboxes
            .lock()
            .expect("gateway poisoned")
            .get(&to.0)
            .cloned();

        let Some(sender) = sender else {
            return Err(ScanError::DeliveryFailed { recipient: to.0 });
        };

        if sender.send(msg).is_err() {
            // Receiver dropped; prune the dead mailbox
            self.mailboxes.lock().expect("gateway poisoned").remove(&to.0);
            return Err(ScanError::DeliveryFailed { recipient: to.0 });
        }
        Ok(())
    }
}

/// Mailbox registry plus dispatch of scans onto worker threads
///
/// Cheap to clone; clones share the same mailbox table.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

impl Gateway {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                mailboxes: Mutex::new(HashMap::new()),
                next_recipient: AtomicU64::new(1),
                worker_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Register a recipient; the returned receiver is its mailbox.
    pub fn register(&self) -> (RecipientId, Receiver<ScanMessage>) {
        let id = RecipientId(self.inner.next_recipient.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = unbounded();
        self.inner
            .mailboxes
            .lock()
            .expect("gateway poisoned")
            .insert(id.0, tx);
        debug!(recipient = id.0, "recipient registered");
        (id, rx)
    }

    /// Drop a recipient's mailbox; later deliveries fail.
    pub fn unregister(&self, id: RecipientId) {
        self.inner
            .mailboxes
            .lock()
            .expect("gateway poisoned")
            .remove(&id.0);
        debug!(recipient = id.0, "recipient unregistered");
    }

    /// Deliver a message to `to`.
    ///
    /// Fails with `DeliveryFailed` when the recipient is unknown or its
    /// receiver has been dropped.
    pub fn deliver(&self, to: RecipientId, msg: ScanMessage) -> Result<()> {
        self.inner.deliver(to, msg)
    }

    /// Run a resume slice on a dedicated worker thread and deliver the
    /// outcome to `recipient`.
    ///
    /// The recipient identity is captured here, at dispatch time; the
    /// worker that executes the slice may be any thread.
    pub fn dispatch_resume(
        &self,
        registry: &'static ContextRegistry,
        handle: u64,
        root: Option<String>,
        budget: Budget,
        recipient: RecipientId,
    ) -> Result<JoinHandle<()>> {
        self.spawn_worker(recipient, handle, move || {
            registry.resume(handle, root.as_deref(), budget)
        })
    }

    /// Run a search slice on a dedicated worker thread and deliver the
    /// outcome to `recipient`.
    pub fn dispatch_search(
        &self,
        registry: &'static ContextRegistry,
        handle: u64,
        root: Option<String>,
        pattern: Pattern,
        budget: Budget,
        recipient: RecipientId,
    ) -> Result<JoinHandle<()>> {
        self.spawn_worker(recipient, handle, move || {
            registry.search(handle, root.as_deref(), &pattern, budget)
        })
    }

    /// Spawn failure means no worker will ever reach `recipient`, so it
    /// surfaces as `DeliveryFailed` against that recipient.
    fn spawn_worker<F>(&self, recipient: RecipientId, handle: u64, op: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce() -> Result<SliceResult> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let seq = self.inner.worker_seq.fetch_add(1, Ordering::Relaxed);

        thread::Builder::new()
            .name(format!("scan-worker-{seq}"))
            .spawn(move || {
                // Message built here, on the worker, from owned data only
                let msg = match op() {
                    Ok(slice) => ScanMessage::SliceDone {
                        handle,
                        entries: slice.entries,
                        status: slice.status,
                    },
                    Err(error) => ScanMessage::SliceFailed { handle, error },
                };
                if let Err(e) = inner.deliver(recipient, msg) {
                    // Fire-and-forget: report, never retry
                    warn!(recipient = recipient.0, error = %e, "result undeliverable");
                }
            })
            .map_err(|e| {
                warn!(recipient = recipient.0, error = %e, "worker spawn failed");
                ScanError::DeliveryFailed {
                    recipient: recipient.0,
                }
            })
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}
