//! Correlation between escalated inquiries and administrator replies.
//!
//! A tracker holds the inquiries that are waiting for an administrator. A reply claims its entry
//! under the tracker's lock, so two overlapping replies never resolve the same inquiry. The entry
//! is restored if the response cannot be persisted.

use dbot_core::Chat;
use embedding::Language;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// An inquiry awaiting an administrator reply.
#[derive(Debug, Clone)]
pub struct PendingInquiry {
    /// Message log id.
    pub id: i64,
    /// Inquiry text as logged (mention stripped).
    pub text: String,
    pub language: Language,
    /// Chat the relay goes back to.
    pub chat: Chat,
}

pub trait CorrelationTracker: Send + Sync {
    /// Registers a newly logged, unanswered inquiry.
    fn track(&self, inquiry: PendingInquiry);

    /// The inquiry a reply should resolve: the cited one, or the tracker's default when
    /// `target` is `None`. Does not remove it.
    fn resolve(&self, target: Option<i64>) -> Option<PendingInquiry>;

    /// Like [`resolve`](Self::resolve), but removes the entry in the same critical section.
    fn claim(&self, target: Option<i64>) -> Option<PendingInquiry>;

    /// Puts a claimed entry back after its response failed to persist.
    fn restore(&self, inquiry: PendingInquiry);

    /// Removes the entry with this id. Returns false if it was not pending.
    fn clear(&self, id: i64) -> bool;

    /// Ids currently pending, oldest first.
    fn pending_ids(&self) -> Vec<i64>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One process-wide slot. A newly tracked inquiry overwrites the previous one, which is then
/// orphaned: its response stays empty forever.
#[derive(Debug, Default)]
pub struct SingleSlotTracker {
    slot: Mutex<Option<PendingInquiry>>,
}

impl SingleSlotTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CorrelationTracker for SingleSlotTracker {
    fn track(&self, inquiry: PendingInquiry) {
        let mut slot = lock(&self.slot);
        if let Some(previous) = slot.as_ref() {
            warn!(
                orphaned_id = previous.id,
                inquiry_id = inquiry.id,
                "Pending inquiry overwritten before an administrator replied"
            );
        }
        *slot = Some(inquiry);
    }

    fn resolve(&self, target: Option<i64>) -> Option<PendingInquiry> {
        let slot = lock(&self.slot);
        match (slot.as_ref(), target) {
            (Some(pending), Some(id)) if pending.id != id => None,
            (pending, _) => pending.cloned(),
        }
    }

    fn claim(&self, target: Option<i64>) -> Option<PendingInquiry> {
        let mut slot = lock(&self.slot);
        let cites_other = matches!((slot.as_ref(), target), (Some(p), Some(id)) if p.id != id);
        if cites_other {
            None
        } else {
            slot.take()
        }
    }

    fn restore(&self, inquiry: PendingInquiry) {
        let mut slot = lock(&self.slot);
        match slot.as_ref() {
            None => *slot = Some(inquiry),
            Some(newer) => warn!(
                orphaned_id = inquiry.id,
                inquiry_id = newer.id,
                "Slot taken while the response was being persisted"
            ),
        }
    }

    fn clear(&self, id: i64) -> bool {
        let mut slot = lock(&self.slot);
        if slot.as_ref().is_some_and(|p| p.id == id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    fn pending_ids(&self) -> Vec<i64> {
        lock(&self.slot).iter().map(|p| p.id).collect()
    }
}

/// FIFO queue per chat. An uncited reply resolves the oldest pending inquiry across all chats;
/// a cited reply resolves exactly that inquiry.
#[derive(Debug, Default)]
pub struct RoomQueueTracker {
    queues: Mutex<BTreeMap<i64, VecDeque<PendingInquiry>>>,
}

impl RoomQueueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending inquiries for one chat.
    pub fn pending_in(&self, chat_id: i64) -> usize {
        lock(&self.queues).get(&chat_id).map_or(0, VecDeque::len)
    }
}

impl CorrelationTracker for RoomQueueTracker {
    fn track(&self, inquiry: PendingInquiry) {
        let mut queues = lock(&self.queues);
        let queue = queues.entry(inquiry.chat.id).or_default();
        debug!(
            inquiry_id = inquiry.id,
            chat_id = inquiry.chat.id,
            queued = queue.len() + 1,
            "Tracking pending inquiry"
        );
        queue.push_back(inquiry);
    }

    fn resolve(&self, target: Option<i64>) -> Option<PendingInquiry> {
        let queues = lock(&self.queues);
        match target {
            Some(id) => queues.values().flatten().find(|p| p.id == id).cloned(),
            None => queues
                .values()
                .filter_map(VecDeque::front)
                .min_by_key(|p| p.id)
                .cloned(),
        }
    }

    fn claim(&self, target: Option<i64>) -> Option<PendingInquiry> {
        let mut queues = lock(&self.queues);
        let chat_id = match target {
            Some(id) => queues
                .iter()
                .find(|(_, queue)| queue.iter().any(|p| p.id == id))
                .map(|(chat_id, _)| *chat_id)?,
            None => queues
                .iter()
                .filter_map(|(chat_id, queue)| queue.front().map(|p| (p.id, *chat_id)))
                .min()
                .map(|(_, chat_id)| chat_id)?,
        };
        let queue = queues.get_mut(&chat_id)?;
        let at = match target {
            Some(id) => queue.iter().position(|p| p.id == id)?,
            None => 0,
        };
        let claimed = queue.remove(at);
        if queue.is_empty() {
            queues.remove(&chat_id);
        }
        claimed
    }

    fn restore(&self, inquiry: PendingInquiry) {
        let mut queues = lock(&self.queues);
        let queue = queues.entry(inquiry.chat.id).or_default();
        let at = queue.partition_point(|p| p.id < inquiry.id);
        debug!(inquiry_id = inquiry.id, chat_id = inquiry.chat.id, "Restoring pending inquiry");
        queue.insert(at, inquiry);
    }

    fn clear(&self, id: i64) -> bool {
        let mut queues = lock(&self.queues);
        let mut cleared = false;
        for queue in queues.values_mut() {
            if let Some(at) = queue.iter().position(|p| p.id == id) {
                queue.remove(at);
                cleared = true;
                break;
            }
        }
        queues.retain(|_, queue| !queue.is_empty());
        cleared
    }

    fn pending_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = lock(&self.queues).values().flatten().map(|p| p.id).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(id: i64, chat_id: i64) -> PendingInquiry {
        PendingInquiry {
            id,
            text: format!("question {id}?"),
            language: Language::En,
            chat: Chat {
                id: chat_id,
                chat_type: "group".to_string(),
                title: Some(format!("room {chat_id}")),
            },
        }
    }

    #[test]
    fn test_single_slot_overwrites() {
        let tracker = SingleSlotTracker::new();
        tracker.track(pending(1, 10));
        tracker.track(pending(2, 10));

        assert_eq!(tracker.resolve(None).map(|p| p.id), Some(2));
        assert!(tracker.resolve(Some(1)).is_none());
        assert_eq!(tracker.pending_ids(), vec![2]);
    }

    #[test]
    fn test_single_slot_clear_by_id_only() {
        let tracker = SingleSlotTracker::new();
        tracker.track(pending(2, 10));

        assert!(!tracker.clear(1));
        assert_eq!(tracker.pending_ids(), vec![2]);
        assert!(tracker.clear(2));
        assert!(tracker.resolve(None).is_none());
        assert!(!tracker.clear(2));
    }

    #[test]
    fn test_room_queue_resolves_oldest_first() {
        let tracker = RoomQueueTracker::new();
        tracker.track(pending(1, 10));
        tracker.track(pending(2, 20));
        tracker.track(pending(3, 10));

        assert_eq!(tracker.resolve(None).map(|p| p.id), Some(1));
        assert!(tracker.clear(1));
        assert_eq!(tracker.resolve(None).map(|p| p.id), Some(2));
        assert!(tracker.clear(2));
        assert_eq!(tracker.resolve(None).map(|p| p.id), Some(3));
        assert_eq!(tracker.pending_in(10), 1);
        assert_eq!(tracker.pending_in(20), 0);
    }

    #[test]
    fn test_room_queue_cited_reply() {
        let tracker = RoomQueueTracker::new();
        tracker.track(pending(1, 10));
        tracker.track(pending(2, 10));

        assert_eq!(tracker.resolve(Some(2)).map(|p| p.id), Some(2));
        assert!(tracker.resolve(Some(9)).is_none());
        assert!(tracker.clear(2));
        assert_eq!(tracker.pending_ids(), vec![1]);
    }

    #[test]
    fn test_room_queue_never_orphans() {
        let tracker = RoomQueueTracker::new();
        for id in 1..=5 {
            tracker.track(pending(id, id % 2));
        }
        assert_eq!(tracker.pending_ids(), vec![1, 2, 3, 4, 5]);
        while let Some(next) = tracker.resolve(None) {
            assert!(tracker.clear(next.id));
        }
        assert!(tracker.pending_ids().is_empty());
    }

    #[test]
    fn test_room_queue_claim_removes_entry() {
        let tracker = RoomQueueTracker::new();
        tracker.track(pending(1, 10));
        tracker.track(pending(2, 20));
        tracker.track(pending(3, 10));

        assert_eq!(tracker.claim(None).map(|p| p.id), Some(1));
        assert_eq!(tracker.claim(None).map(|p| p.id), Some(2));
        assert!(tracker.claim(Some(2)).is_none());
        assert_eq!(tracker.claim(Some(3)).map(|p| p.id), Some(3));
        assert!(tracker.claim(None).is_none());
        assert_eq!(tracker.pending_in(10), 0);
    }

    #[test]
    fn test_room_queue_restore_keeps_order() {
        let tracker = RoomQueueTracker::new();
        tracker.track(pending(1, 10));
        tracker.track(pending(2, 10));

        let first = tracker.claim(None).unwrap();
        tracker.track(pending(3, 10));
        tracker.restore(first);

        assert_eq!(tracker.pending_ids(), vec![1, 2, 3]);
        assert_eq!(tracker.resolve(None).map(|p| p.id), Some(1));
    }

    #[test]
    fn test_room_queue_concurrent_claims_are_distinct() {
        let tracker = std::sync::Arc::new(RoomQueueTracker::new());
        for id in 1..=64 {
            tracker.track(pending(id, id % 4));
        }
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    let mut claimed = Vec::new();
                    while let Some(p) = tracker.claim(None) {
                        claimed.push(p.id);
                    }
                    claimed
                })
            })
            .collect();
        let mut all: Vec<i64> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (1..=64).collect::<Vec<_>>());
    }

    #[test]
    fn test_single_slot_claim_and_restore() {
        let tracker = SingleSlotTracker::new();
        tracker.track(pending(5, 10));

        assert!(tracker.claim(Some(4)).is_none());
        let claimed = tracker.claim(None).unwrap();
        assert!(tracker.claim(None).is_none());
        tracker.restore(claimed);
        assert_eq!(tracker.pending_ids(), vec![5]);

        let claimed = tracker.claim(Some(5)).unwrap();
        tracker.track(pending(6, 10));
        tracker.restore(claimed);
        assert_eq!(tracker.pending_ids(), vec![6]);
    }
}
