//! Cross-context marshaling of backing-data changes.
//!
//! Change notifications may originate on any thread (a query observer, a
//! network callback). They must not touch segment state directly. Instead
//! they are posted to a [`MailboxSender`], which queues the message and
//! requests an update; the owner context drains the [`Mailbox`] at the top
//! of the next pass.
//!
//! # Example
//!
//! ```
//! use horizon_reconcile_core::{mailbox, UpdateRequester, UpdateScheduler};
//!
//! let scheduler = UpdateScheduler::new();
//! let requester = UpdateRequester::new();
//! requester.attach(scheduler.clone());
//!
//! let (sender, inbox) = mailbox::<Vec<u32>>(requester);
//!
//! std::thread::spawn(move || {
//!     sender.post(vec![1, 2, 3]);
//!     sender.post(vec![1, 2]);
//! })
//! .join()
//! .unwrap();
//!
//! assert!(scheduler.is_pending());
//! assert_eq!(inbox.latest(), Some(vec![1, 2]));
//! assert!(inbox.is_empty());
//! ```

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::scheduler::UpdateRequester;

/// Create a connected sender/mailbox pair.
///
/// Every successful post calls `requester.request()`.
pub fn mailbox<T: Send>(requester: UpdateRequester) -> (MailboxSender<T>, Mailbox<T>) {
    let (tx, rx) = unbounded();
    (MailboxSender { tx, requester }, Mailbox { rx })
}

/// Sending half; cheap to clone and safe to move to other threads.
pub struct MailboxSender<T> {
    tx: Sender<T>,
    requester: UpdateRequester,
}

impl<T> Clone for MailboxSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            requester: self.requester.clone(),
        }
    }
}

impl<T> std::fmt::Debug for MailboxSender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxSender")
            .field("queued", &self.tx.len())
            .finish()
    }
}

impl<T: Send> MailboxSender<T> {
    /// Queue a message for the owner context and request an update.
    ///
    /// Returns `false` if the mailbox has been dropped.
    pub fn post(&self, message: T) -> bool {
        if self.tx.send(message).is_err() {
            tracing::debug!(
                target: "horizon_reconcile_core",
                "mailbox dropped, discarding posted change"
            );
            return false;
        }
        self.requester.request();
        true
    }
}

/// Receiving half, owned by a segment and drained on the owner context.
pub struct Mailbox<T> {
    rx: Receiver<T>,
}

impl<T> std::fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox").field("queued", &self.rx.len()).finish()
    }
}

impl<T> Mailbox<T> {
    /// Take every queued message, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    /// Take every queued message and keep only the newest.
    ///
    /// Snapshots supersede each other, so intermediate ones are skipped.
    pub fn latest(&self) -> Option<T> {
        self.rx.try_iter().last()
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

static_assertions::assert_impl_all!(MailboxSender<Vec<u8>>: Send, Sync, Clone);
