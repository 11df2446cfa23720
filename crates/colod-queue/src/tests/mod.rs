use colod_types::EventKind;

use crate::{EventQueue, QueueError};

#[test]
fn test_fifo_within_priority_class() {
    let mut queue = EventQueue::new(4);
    queue.add(EventKind::Yellow, None).unwrap();
    queue.add(EventKind::Unyellow, None).unwrap();
    queue.add(EventKind::StartMigration, None).unwrap();

    assert_eq!(queue.remove().unwrap().kind, EventKind::Yellow);
    assert_eq!(queue.remove().unwrap().kind, EventKind::Unyellow);
    assert_eq!(queue.remove().unwrap().kind, EventKind::StartMigration);
    assert!(queue.remove().is_none());
}

#[test]
fn test_always_interrupting_preempts_without_dynamic_set() {
    let mut queue = EventQueue::new(4);
    queue.add(EventKind::Yellow, None).unwrap();
    queue.add(EventKind::Failed, None).unwrap();

    // Failed is always-interrupting, Yellow isn't declared interrupting here.
    assert_eq!(queue.remove().unwrap().kind, EventKind::Failed);
    assert_eq!(queue.remove().unwrap().kind, EventKind::Yellow);
}

#[test]
fn test_set_interrupting_reorders_pending_events() {
    let mut queue = EventQueue::new(4);
    queue.add(EventKind::Yellow, None).unwrap();
    queue.add(EventKind::FailoverSync, None).unwrap();

    // Yellow arrived first, so with no dynamic set it would go first.
    queue.set_interrupting([EventKind::FailoverSync]);

    assert_eq!(queue.remove().unwrap().kind, EventKind::FailoverSync);
    assert_eq!(queue.remove().unwrap().kind, EventKind::Yellow);
}

#[test]
fn test_interrupting_preempts_lower_priority_regardless_of_arrival() {
    let mut queue = EventQueue::new(4);
    queue.set_interrupting([EventKind::Yellow]);

    queue.add(EventKind::StartMigration, None).unwrap();
    queue.add(EventKind::Yellow, None).unwrap();

    assert_eq!(queue.remove().unwrap().kind, EventKind::Yellow);
    assert_eq!(queue.remove().unwrap().kind, EventKind::StartMigration);
}

#[test]
fn test_add_when_full_is_rejected_and_does_not_mutate() {
    let mut queue = EventQueue::new(2);
    queue.add(EventKind::Yellow, None).unwrap();
    queue.add(EventKind::Unyellow, None).unwrap();

    let err = queue.add(EventKind::StartMigration, None).unwrap_err();
    assert_eq!(err, QueueError::Full);
    assert_eq!(queue.len(), 2);
}

#[test]
fn test_coalesces_repeated_kind_until_dequeue() {
    let mut queue = EventQueue::new(4);
    queue.add(EventKind::Yellow, None).unwrap();
    queue.add(EventKind::Yellow, None).unwrap();
    queue.add(EventKind::Yellow, None).unwrap();

    assert_eq!(queue.len(), 1);

    queue.remove().unwrap();
    queue.add(EventKind::Yellow, None).unwrap();
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_coalesces_only_against_the_last_kind_not_any_prior_kind() {
    let mut queue = EventQueue::new(4);
    queue.add(EventKind::Yellow, None).unwrap();
    queue.add(EventKind::Unyellow, None).unwrap();
    queue.add(EventKind::Yellow, None).unwrap();

    // Unyellow only coalesced against the Yellow before it; this third Yellow must
    // still queue since it isn't a repeat of the immediately preceding kind.
    assert_eq!(queue.len(), 3);
    assert_eq!(queue.remove().unwrap().kind, EventKind::Yellow);
    assert_eq!(queue.remove().unwrap().kind, EventKind::Unyellow);
    assert_eq!(queue.remove().unwrap().kind, EventKind::Yellow);
}

#[test]
fn test_pending_and_pending_interrupt() {
    let mut queue = EventQueue::new(4);
    assert!(!queue.pending());
    assert!(!queue.pending_interrupt());

    queue.add(EventKind::StartMigration, None).unwrap();
    assert!(queue.pending());
    assert!(!queue.pending_interrupt());

    queue.add(EventKind::Failed, None).unwrap();
    assert!(queue.pending_interrupt());
}

#[test]
fn test_peek_and_last() {
    let mut queue = EventQueue::new(4);
    queue.add(EventKind::StartMigration, None).unwrap();
    queue.add(EventKind::Failed, None).unwrap();

    assert_eq!(queue.peek().unwrap().kind, EventKind::Failed);
    assert_eq!(queue.last().unwrap().kind, EventKind::StartMigration);
}
