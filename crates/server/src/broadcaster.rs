//! Fan-out of session events to subscribers.
//!
//! Every subscriber owns a bounded queue. Publishing pushes into each queue
//! without waiting on any reader; when a queue is full its oldest unread
//! `rep` event is discarded. That is safe for `rep` because each one carries
//! the cumulative total, so a later event supersedes an earlier one.
//!
//! `milestone` and the terminal `stopped` event are never discarded. If a
//! full queue holds no `rep` to evict, it grows past its capacity instead;
//! that overflow is bounded by the number of badge tiers plus one.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::events::SessionEvent;

pub type SubscriberId = u64;

// =============================================================================
// Per-subscriber queue
// =============================================================================

#[derive(Debug, Default)]
struct QueueState {
    buffer: VecDeque<SessionEvent>,
    /// No more events will arrive once set
    finished: bool,
    dropped: u64,
}

#[derive(Debug)]
struct SubscriberQueue {
    capacity: usize,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl SubscriberQueue {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        }
    }

    fn push_locked(&self, state: &mut QueueState, event: SessionEvent) {
        if state.buffer.len() >= self.capacity {
            if let Some(oldest) = state.buffer.iter().position(is_superseded_by_later) {
                state.buffer.remove(oldest);
                state.dropped += 1;
            }
        }
        state.buffer.push_back(event);
    }

    fn push(&self, event: SessionEvent) {
        {
            let mut state = self.state.lock();
            if state.finished {
                return;
            }
            self.push_locked(&mut state, event);
        }
        self.notify.notify_one();
    }

    /// Seal the queue, optionally appending a final event first
    fn finish(&self, last: Option<SessionEvent>) {
        {
            let mut state = self.state.lock();
            if state.finished {
                return;
            }
            if let Some(event) = last {
                self.push_locked(&mut state, event);
            }
            state.finished = true;
        }
        self.notify.notify_one();
    }
}

/// Events whose content a later event of the same kind fully restates
fn is_superseded_by_later(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::Rep { .. })
}

// =============================================================================
// Broadcaster
// =============================================================================

#[derive(Debug, Default)]
struct BroadcastState {
    next_id: SubscriberId,
    subscribers: HashMap<SubscriberId, Arc<SubscriberQueue>>,
    /// Set once by `close`; late subscribers receive only this
    terminal: Option<SessionEvent>,
}

#[derive(Debug)]
struct BroadcastShared {
    capacity: usize,
    state: Mutex<BroadcastState>,
}

impl BroadcastShared {
    fn remove(&self, id: SubscriberId) -> bool {
        let removed = self.state.lock().subscribers.remove(&id);
        match removed {
            Some(queue) => {
                queue.finish(None);
                true
            }
            None => false,
        }
    }
}

/// Delivers one session's events to all of its subscribers.
#[derive(Debug)]
pub struct SessionBroadcaster {
    shared: Arc<BroadcastShared>,
}

impl SessionBroadcaster {
    /// `capacity` is the per-subscriber queue bound (at least 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(BroadcastShared {
                capacity: capacity.max(1),
                state: Mutex::new(BroadcastState::default()),
            }),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let queue = Arc::new(SubscriberQueue::new(self.shared.capacity));
        let mut state = self.shared.state.lock();
        let id = state.next_id;
        state.next_id += 1;

        match &state.terminal {
            Some(terminal) => queue.finish(Some(terminal.clone())),
            None => {
                state.subscribers.insert(id, Arc::clone(&queue));
            }
        }
        debug!("Subscriber {} attached ({} active)", id, state.subscribers.len());

        Subscription {
            id,
            queue,
            broadcaster: Arc::downgrade(&self.shared),
        }
    }

    /// Detach a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.shared.remove(id);
        if removed {
            debug!("Subscriber {} detached", id);
        }
        removed
    }

    /// Deliver `event` to every current subscriber.
    ///
    /// Returns false (and delivers nothing) once the broadcaster is closed.
    pub fn publish(&self, event: SessionEvent) -> bool {
        let state = self.shared.state.lock();
        if state.terminal.is_some() {
            return false;
        }
        for queue in state.subscribers.values() {
            queue.push(event.clone());
        }
        true
    }

    /// Deliver the terminal event to everyone and drop all subscribers.
    ///
    /// Only the first call has any effect.
    pub fn close(&self, terminal: SessionEvent) -> bool {
        let mut state = self.shared.state.lock();
        if state.terminal.is_some() {
            return false;
        }
        for (_, queue) in state.subscribers.drain() {
            queue.finish(Some(terminal.clone()));
        }
        state.terminal = Some(terminal);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().terminal.is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().subscribers.len()
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Receiving end for one subscriber. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    queue: Arc<SubscriberQueue>,
    broadcaster: Weak<BroadcastShared>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next event in emission order.
    ///
    /// Waits while the queue is empty; returns `None` once the queue has
    /// been sealed and drained.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            {
                let mut state = self.queue.state.lock();
                if let Some(event) = state.buffer.pop_front() {
                    return Some(event);
                }
                if state.finished {
                    return None;
                }
            }
            self.queue.notify.notified().await;
        }
    }

    /// Next buffered event without waiting
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.queue.state.lock().buffer.pop_front()
    }

    /// Events discarded from this subscriber's queue because it was full
    pub fn dropped(&self) -> u64 {
        self.queue.state.lock().dropped
    }

    /// True once no event is buffered and none will arrive
    pub fn is_finished(&self) -> bool {
        let state = self.queue.state.lock();
        state.finished && state.buffer.is_empty()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.broadcaster.upgrade() {
            shared.remove(self.id);
        }
    }
}
