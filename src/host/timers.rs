//! Virtual-clock timer queue.
//!
//! Timer callbacks are the event loop's suspension points. Time only moves
//! when [`advance`] is called, which fires every due timer in (due time,
//! scheduling order) and lets callbacks schedule further timers that fall
//! inside the same window.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// Identifies a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Upper bound on callbacks fired by one `advance` call. Guards against a
/// zero-delay timer that keeps rescheduling itself.
const MAX_FIRES_PER_ADVANCE: usize = 100_000;

type TimerKey = (u64, u64);

struct TimerQueue {
    now: u64,
    next_seq: u64,
    queue: BTreeMap<TimerKey, (TimerId, Box<dyn FnOnce()>)>,
    index: HashMap<TimerId, TimerKey>,
}

impl TimerQueue {
    fn new() -> Self {
        Self {
            now: 0,
            next_seq: 0,
            queue: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    /// Pop the earliest timer due at or before `until`.
    fn pop_due(&mut self, until: u64) -> Option<Box<dyn FnOnce()>> {
        let key = *self.queue.keys().next()?;
        if key.0 > until {
            return None;
        }
        let (id, callback) = self.queue.remove(&key)?;
        self.index.remove(&id);
        self.now = key.0;
        Some(callback)
    }
}

thread_local! {
    static TIMERS: RefCell<TimerQueue> = RefCell::new(TimerQueue::new());
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Schedule `callback` to run `delay_ms` after the current virtual time.
pub fn set_timeout<F>(delay_ms: u64, callback: F) -> TimerId
where
    F: FnOnce() + 'static,
{
    TIMERS.with(|timers| {
        let mut timers = timers.borrow_mut();
        let id = TimerId(timers.next_seq);
        let key = (timers.now + delay_ms, timers.next_seq);
        timers.next_seq += 1;
        timers.queue.insert(key, (id, Box::new(callback)));
        timers.index.insert(id, key);
        id
    })
}

/// Cancel a pending timer. Clearing a fired or unknown timer is a no-op.
pub fn clear_timeout(id: TimerId) {
    // Drop the callback outside the borrow: it may own node handles.
    let removed = TIMERS.with(|timers| {
        let mut timers = timers.borrow_mut();
        let key = timers.index.remove(&id)?;
        timers.queue.remove(&key)
    });
    drop(removed);
}

pub fn is_pending(id: TimerId) -> bool {
    TIMERS.with(|timers| timers.borrow().index.contains_key(&id))
}

/// Current virtual time in milliseconds.
pub fn now() -> u64 {
    TIMERS.with(|timers| timers.borrow().now)
}

pub fn pending_timers() -> usize {
    TIMERS.with(|timers| timers.borrow().queue.len())
}

/// Move the clock forward, firing every timer that comes due.
pub fn advance(ms: u64) {
    let until = now() + ms;
    let mut fired = 0;
    while let Some(callback) = TIMERS.with(|timers| timers.borrow_mut().pop_due(until)) {
        callback();
        fired += 1;
        if fired >= MAX_FIRES_PER_ADVANCE {
            tracing::warn!(fired, "timer queue did not settle; stopping this advance");
            break;
        }
    }
    TIMERS.with(|timers| {
        let mut timers = timers.borrow_mut();
        timers.now = timers.now.max(until);
    });
}

/// Fire timers that are already due without moving the clock.
pub fn run_pending() {
    advance(0);
}

pub(crate) fn reset_timers() {
    let old = TIMERS.with(|timers| std::mem::replace(&mut *timers.borrow_mut(), TimerQueue::new()));
    drop(old);
}
