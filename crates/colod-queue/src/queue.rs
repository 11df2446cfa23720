use std::collections::HashSet;

use colod_types::{Event, EventKind, SeqNo};
use thiserror::Error;

/// Default bound used by the daemon in practice.
pub const DEFAULT_QUEUE_SIZE: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("event queue is full")]
    Full,
}

/// Ordered multiset of [`Event`]s, bounded by `size`.
///
/// Ordering is a stable sort by `(interrupting?, seqno)`, re-evaluated whenever the
/// dynamic interrupting set changes via [`EventQueue::set_interrupting`]. The
/// always-interrupting kinds ([`EventKind::ALWAYS_INTERRUPTING`]) are immutable; the
/// dynamic set is replaced wholesale on every call, mirroring a state declaring its
/// preemption policy on entry.
#[derive(Debug)]
pub struct EventQueue {
    size: usize,
    items: Vec<Event>,
    next_seqno: SeqNo,
    dynamic_interrupting: HashSet<EventKind>,
}

impl EventQueue {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            items: Vec::with_capacity(size),
            next_seqno: 0,
            dynamic_interrupting: HashSet::new(),
        }
    }

    /// Replaces the dynamic interrupting set and re-sorts the queue. The
    /// always-interrupting kinds are unaffected and remain interrupting regardless of
    /// what's passed here.
    pub fn set_interrupting(&mut self, kinds: impl IntoIterator<Item = EventKind>) {
        self.dynamic_interrupting = kinds.into_iter().collect();
        self.resort();
    }

    /// Inserts `kind` at its sorted position. Fails without mutating the queue if it is
    /// already at capacity. A `kind` matching the last (most recently queued) event is
    /// coalesced into it and reports success without growing the queue.
    pub fn add(&mut self, kind: EventKind, payload: Option<serde_json::Value>) -> Result<(), QueueError> {
        if self.last().is_some_and(|event| event.kind == kind) {
            return Ok(());
        }

        if self.items.len() >= self.size {
            return Err(QueueError::Full);
        }

        let seqno = self.next_seqno;
        self.next_seqno += 1;

        let event = match payload {
            Some(payload) => Event::with_payload(kind, seqno, payload),
            None => Event::new(kind, seqno),
        };
        self.items.push(event);
        self.resort();

        Ok(())
    }

    /// Pops the smallest (most-interrupting, lowest `seqno`) event, if any.
    pub fn remove(&mut self) -> Option<Event> {
        if self.items.is_empty() {
            return None;
        }
        Some(self.items.remove(0))
    }

    pub fn peek(&self) -> Option<&Event> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&Event> {
        self.items.last()
    }

    pub fn pending(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn pending_interrupt(&self) -> bool {
        self.items
            .first()
            .is_some_and(|event| self.is_interrupting(event.kind))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn is_interrupting(&self, kind: EventKind) -> bool {
        kind.is_always_interrupting() || self.dynamic_interrupting.contains(&kind)
    }

    /// Re-sorts by `(¬interrupting, seqno)` ascending, so interrupting events come
    /// first, and within a priority class arrival order (`seqno`) is preserved.
    fn resort(&mut self) {
        let dynamic_interrupting = &self.dynamic_interrupting;
        self.items.sort_by_key(|event| {
            let interrupting =
                event.kind.is_always_interrupting() || dynamic_interrupting.contains(&event.kind);
            (!interrupting, event.seqno)
        });
    }
}
