//! Change notification around the single mutation entry point.
//!
//! # Responsibility
//! - Keep the subscriber registry.
//! - Collect follow-up mutations requested by subscribers into a bounded
//!   queue that the store drains after notification.
//!
//! # Invariants
//! - Subscribers are invoked in registration order.
//! - A subscriber never runs re-entrantly: follow-ups are queued, not
//!   applied inside the callback.
//! - The follow-up queue accepts at most `limit` mutations per entry-point
//!   call; the rest are counted as dropped.

use super::mutation::Mutation;
use crate::model::document::Document;
use std::collections::VecDeque;
use std::sync::Arc;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Subscriber callback: receives the freshly published snapshot and may queue
/// follow-up mutations.
pub type Subscriber = Box<dyn FnMut(&Arc<Document>, &mut FollowUps)>;

/// Bounded queue of mutations requested from inside notifications.
#[derive(Debug)]
pub struct FollowUps {
    queue: VecDeque<Mutation>,
    limit: usize,
    accepted: usize,
    dropped: usize,
}

impl FollowUps {
    pub fn new(limit: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            limit,
            accepted: 0,
            dropped: 0,
        }
    }

    /// Queues one follow-up mutation. Returns `false` when the budget is
    /// exhausted and the mutation was dropped.
    pub fn push(&mut self, mutation: Mutation) -> bool {
        if self.accepted >= self.limit {
            self.dropped += 1;
            return false;
        }
        self.accepted += 1;
        self.queue.push_back(mutation);
        true
    }

    pub(crate) fn pop(&mut self) -> Option<Mutation> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Subscriber registry.
#[derive(Default)]
pub struct Notifier {
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, subscriber));
        id
    }

    /// Removes one subscriber. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(current, _)| *current != id);
        self.subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Invokes every subscriber once with `snapshot`.
    pub fn notify(&mut self, snapshot: &Arc<Document>, follow_ups: &mut FollowUps) {
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(snapshot, follow_ups);
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscribers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{FollowUps, Notifier};
    use crate::model::document::Document;
    use crate::store::mutation::Mutation;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;

    #[test]
    fn follow_up_queue_drops_past_limit() {
        let mut follow_ups = FollowUps::new(1);
        assert!(follow_ups.push(Mutation::DeleteView {
            view_id: "a".to_string()
        }));
        assert!(!follow_ups.push(Mutation::DeleteView {
            view_id: "b".to_string()
        }));
        assert_eq!(follow_ups.len(), 1);
        assert_eq!(follow_ups.dropped(), 1);
    }

    #[test]
    fn unsubscribed_callbacks_are_not_invoked() {
        let calls = Rc::new(Cell::new(0));
        let mut notifier = Notifier::new();
        let counter = Rc::clone(&calls);
        let id = notifier.subscribe(Box::new(move |_, _| counter.set(counter.get() + 1)));

        let snapshot = Arc::new(Document::empty("notify"));
        let mut follow_ups = FollowUps::new(4);
        notifier.notify(&snapshot, &mut follow_ups);
        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify(&snapshot, &mut follow_ups);

        assert_eq!(calls.get(), 1);
        assert!(notifier.is_empty());
    }
}
