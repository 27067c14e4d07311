use std::collections::VecDeque;

use crate::models::TelemetryPayload;

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedPayload {
    pub payload: TelemetryPayload,
    /// Failed flushes this payload has been part of.
    pub attempts: u32,
}

/// FIFO of undelivered payloads. Once it grows past `capacity` it keeps
/// only the newest `retain` entries.
#[derive(Debug)]
pub struct DeliveryQueue {
    entries: VecDeque<QueuedPayload>,
    capacity: usize,
    retain: usize,
}

impl DeliveryQueue {
    pub fn new(capacity: usize, retain: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            retain: retain.min(capacity),
        }
    }

    /// Appends `payload`, returning how many old entries were discarded.
    pub fn push(&mut self, payload: TelemetryPayload) -> usize {
        self.entries.push_back(QueuedPayload {
            payload,
            attempts: 0,
        });
        self.enforce_capacity()
    }

    /// Removes up to `size` entries from the front.
    pub fn take_batch(&mut self, size: usize) -> Vec<QueuedPayload> {
        let count = size.min(self.entries.len());
        self.entries.drain(..count).collect()
    }

    /// Puts a failed batch back at the front, preserving its order.
    pub fn requeue_front(&mut self, batch: Vec<QueuedPayload>) -> usize {
        for entry in batch.into_iter().rev() {
            self.entries.push_front(entry);
        }
        self.enforce_capacity()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedPayload> {
        self.entries.iter()
    }

    fn enforce_capacity(&mut self) -> usize {
        if self.entries.len() <= self.capacity {
            return 0;
        }
        let excess = self.entries.len() - self.retain;
        self.entries.drain(..excess);
        excess
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::collector::TelemetryCollector;
    use crate::performance::ProcessHost;
    use crate::usability::SessionState;
    use chrono::Utc;
    use std::sync::Arc;

    /// Payload tagged through its user id so tests can tell entries apart.
    pub(crate) fn tagged_payload(tag: usize) -> TelemetryPayload {
        let now = Utc::now();
        let collector = TelemetryCollector::new(
            Arc::new(ProcessHost::new("/")),
            SessionState::with_id("session_queue".into(), now),
            10,
        );
        collector.build_payload("session_queue", Some(&tag.to_string()), now)
    }

    fn tag(entry: &QueuedPayload) -> usize {
        entry
            .payload
            .session_info
            .user_id
            .as_deref()
            .and_then(|id| id.parse().ok())
            .unwrap()
    }

    #[test]
    fn overflow_keeps_most_recent_fifty() {
        let mut queue = DeliveryQueue::new(100, 50);
        let mut dropped = 0;
        for i in 0..101 {
            dropped += queue.push(tagged_payload(i));
        }

        assert_eq!(queue.len(), 50);
        assert_eq!(dropped, 51);
        let tags: Vec<usize> = queue.iter().map(tag).collect();
        assert_eq!(tags, (51..101).collect::<Vec<_>>());
    }

    #[test]
    fn at_capacity_nothing_is_dropped() {
        let mut queue = DeliveryQueue::new(100, 50);
        for i in 0..100 {
            assert_eq!(queue.push(tagged_payload(i)), 0);
        }
        assert_eq!(queue.len(), 100);
    }

    #[test]
    fn take_then_requeue_restores_order() {
        let mut queue = DeliveryQueue::new(100, 50);
        for i in 0..15 {
            queue.push(tagged_payload(i));
        }

        let batch = queue.take_batch(10);
        assert_eq!(batch.iter().map(tag).collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
        assert_eq!(queue.len(), 5);

        queue.requeue_front(batch);
        assert_eq!(queue.iter().map(tag).collect::<Vec<_>>(), (0..15).collect::<Vec<_>>());
    }

    #[test]
    fn take_batch_on_short_queue_takes_everything() {
        let mut queue = DeliveryQueue::new(100, 50);
        queue.push(tagged_payload(1));
        assert_eq!(queue.take_batch(10).len(), 1);
        assert!(queue.is_empty());
        assert!(queue.take_batch(10).is_empty());
    }
}
