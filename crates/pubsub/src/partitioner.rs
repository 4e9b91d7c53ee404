//! Partition choice for publishing and partition ownership for replicas.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Spreads unkeyed work items over a topic's partitions in turn.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: AtomicUsize,
}

impl RoundRobin {
    /// Picks the next partition from `partitions`, or `None` if it is empty.
    pub fn pick(&self, partitions: &[i32]) -> Option<i32> {
        if partitions.is_empty() {
            return None;
        }
        let turn = self.next.fetch_add(1, Ordering::Relaxed);
        Some(partitions[turn % partitions.len()])
    }
}

/// Partitions owned by replica `member` out of `members`.
///
/// Partitions are dealt out by position, so every partition has exactly one
/// owner as long as all replicas agree on `members`.
pub fn assigned_partitions(partitions: &[i32], member: u32, members: u32) -> Vec<i32> {
    let members = members.max(1) as usize;
    let member = member as usize;
    partitions
        .iter()
        .enumerate()
        .filter(|(index, _)| index % members == member)
        .map(|(_, &partition)| partition)
        .collect()
}
