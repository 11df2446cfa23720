//! The orchestrator's event queue: a small, bounded, priority-ordered multiset that
//! lets a state declare "for as long as I'm active, treat these kinds as interrupting"
//! and have a newly-arriving high-priority event preempt a long-queued low-priority one
//! while preserving arrival order within a priority class.
mod queue;

#[cfg(test)]
mod tests;

pub use queue::{EventQueue, QueueError, DEFAULT_QUEUE_SIZE};
