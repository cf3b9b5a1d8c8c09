use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Milliseconds since the clock's epoch.
pub type Millis = u64;

/// Shared handle to whichever clock the application was assembled with.
pub type SharedClock = Arc<dyn Clock>;

/// Monotonic time source.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_ms(&self) -> Millis;
}

/// Wall clock backed by [`Instant`]; its epoch is the moment it was created.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

/// Clock that only moves when told to. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now: Millis) -> Self {
        let clock = Self::new();
        clock.set(now);
        clock
    }

    pub fn advance(&self, delta: Millis) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }

    /// Moves the clock to `now`. Requests to move backwards are ignored.
    pub fn set(&self, now: Millis) {
        self.now.fetch_max(now, Ordering::SeqCst);
    }

    pub fn shared(&self) -> SharedClock {
        Arc::new(self.clone())
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

/// Identifier returned by [`Scheduler::schedule_at`], used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct ScheduledEvent<E> {
    due: Millis,
    id: TimerId,
    event: E,
}

/// Pending timers ordered by due time. Timers sharing a due time fire in the
/// order they were scheduled. Nothing fires until the owner pops it.
pub struct Scheduler<E> {
    events: Vec<ScheduledEvent<E>>,
    next_id: u64,
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 0,
        }
    }

    pub fn schedule_at(&mut self, due: Millis, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let index = self.events.partition_point(|pending| pending.due <= due);
        self.events.insert(index, ScheduledEvent { due, id, event });
        id
    }

    pub fn schedule_after(&mut self, now: Millis, delay: Millis, event: E) -> TimerId {
        self.schedule_at(now.saturating_add(delay), event)
    }

    /// Removes a pending timer. Returns `false` if it already fired or was
    /// never scheduled here.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.events.iter().position(|pending| pending.id == id) {
            Some(index) => {
                self.events.remove(index);
                true
            }
            None => false,
        }
    }

    /// Pops the earliest timer if it is due at `now`.
    pub fn pop_due(&mut self, now: Millis) -> Option<E> {
        match self.events.first() {
            Some(first) if first.due <= now => Some(self.events.remove(0).event),
            _ => None,
        }
    }

    /// Removes and returns every timer due at `now`, earliest first.
    pub fn drain_due(&mut self, now: Millis) -> Vec<E> {
        let count = self.events.partition_point(|pending| pending.due <= now);
        self.events.drain(..count).map(|pending| pending.event).collect()
    }

    pub fn next_due(&self) -> Option<Millis> {
        self.events.first().map(|pending| pending.due)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.events.iter().any(|pending| pending.id == id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Scheduler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.events.len())
            .field("next_due", &self.next_due())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order_with_stable_ties() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_at(300, "c");
        scheduler.schedule_at(100, "a");
        scheduler.schedule_at(300, "d");
        scheduler.schedule_at(200, "b");

        assert!(scheduler.drain_due(99).is_empty());
        assert_eq!(scheduler.drain_due(200), vec!["a", "b"]);
        assert_eq!(scheduler.drain_due(1_000), vec!["c", "d"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut scheduler = Scheduler::new();
        let keep = scheduler.schedule_after(0, 50, 1);
        let dropped = scheduler.schedule_after(0, 50, 2);

        assert!(scheduler.cancel(dropped));
        assert!(!scheduler.cancel(dropped));
        assert!(scheduler.is_pending(keep));
        assert_eq!(scheduler.drain_due(50), vec![1]);
        assert!(!scheduler.cancel(keep));
    }

    #[test]
    fn pop_due_only_returns_expired_timers() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_at(10, 'x');
        assert_eq!(scheduler.pop_due(9), None);
        assert_eq!(scheduler.next_due(), Some(10));
        assert_eq!(scheduler.pop_due(10), Some('x'));
        assert_eq!(scheduler.pop_due(10), None);
    }

    #[test]
    fn manual_clock_is_shared_and_monotonic() {
        let clock = ManualClock::new();
        let shared = clock.shared();
        clock.advance(250);
        assert_eq!(shared.now_ms(), 250);

        clock.set(100);
        assert_eq!(shared.now_ms(), 250);
        clock.set(400);
        assert_eq!(clock.now_ms(), 400);
    }
}
