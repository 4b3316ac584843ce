use std::collections::{BTreeMap, VecDeque};

/// Identifies one scheduled event. Handles are never reused within a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<E> {
    pub handle: TimerHandle,
    pub payload: E,
    pub recurring: bool,
}

#[derive(Debug, Clone)]
struct ScheduledEvent<E> {
    fire_at_ms: u64,
    period_ms: Option<u64>,
    order: u64,
    payload: E,
}

/// Tick-driven timer queue.
///
/// A pass is opened with [`Scheduler::advance`], which snapshots every event
/// due at the new time ordered by `(fire_at, insertion order)`. Events added
/// while the pass is draining are not part of the snapshot and wait for the
/// next `advance`. Cancelled handles are skipped even if already snapshotted.
#[derive(Debug, Clone)]
pub struct Scheduler<E> {
    now_ms: u64,
    next_handle: u64,
    next_order: u64,
    events: BTreeMap<TimerHandle, ScheduledEvent<E>>,
    due: VecDeque<TimerHandle>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_handle: 1,
            next_order: 0,
            events: BTreeMap::new(),
            due: VecDeque::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn delay(&mut self, ms: u64, payload: E) -> TimerHandle {
        self.insert(ms, None, payload)
    }

    pub fn every(&mut self, ms: u64, payload: E) -> TimerHandle {
        self.insert(ms, Some(ms), payload)
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.events.remove(&handle).is_some()
    }

    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.events.contains_key(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.events.len()
    }

    /// Drops every live event and any partially drained pass.
    pub fn clear(&mut self) -> usize {
        let dropped = self.events.len();
        self.events.clear();
        self.due.clear();
        dropped
    }

    /// Moves the clock forward and snapshots the events due at the new time.
    /// Anything left over from a previous pass that was not drained is discarded
    /// from the snapshot; the events themselves stay scheduled.
    pub fn advance(&mut self, dt_ms: u64) {
        self.now_ms = self.now_ms.saturating_add(dt_ms);
        let now_ms = self.now_ms;
        let mut due: Vec<(u64, u64, TimerHandle)> = self
            .events
            .iter()
            .filter(|(_, event)| event.fire_at_ms <= now_ms)
            .map(|(handle, event)| (event.fire_at_ms, event.order, *handle))
            .collect();
        due.sort_unstable();
        self.due = due.into_iter().map(|(_, _, handle)| handle).collect();
    }

    fn insert(&mut self, ms: u64, period_ms: Option<u64>, payload: E) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        let order = self.take_order();
        self.events.insert(
            handle,
            ScheduledEvent {
                fire_at_ms: self.now_ms.saturating_add(ms),
                period_ms,
                order,
                payload,
            },
        );
        handle
    }

    fn take_order(&mut self) -> u64 {
        let order = self.next_order;
        self.next_order = self.next_order.saturating_add(1);
        order
    }
}

impl<E: Clone> Scheduler<E> {
    /// Pops the next due event of the current pass. One-shot events are
    /// removed; recurring events are re-armed one period later (never earlier
    /// than the next tick) and keep their handle.
    pub fn pop_due(&mut self) -> Option<Fired<E>> {
        while let Some(handle) = self.due.pop_front() {
            let Some(event) = self.events.get(&handle) else {
                continue;
            };
            match event.period_ms {
                None => {
                    let event = self.events.remove(&handle)?;
                    return Some(Fired {
                        handle,
                        payload: event.payload,
                        recurring: false,
                    });
                }
                Some(period_ms) => {
                    let now_ms = self.now_ms;
                    let order = self.take_order();
                    let event = self.events.get_mut(&handle)?;
                    let mut next_fire_at = event.fire_at_ms.saturating_add(period_ms);
                    if next_fire_at <= now_ms {
                        next_fire_at = now_ms.saturating_add(period_ms);
                    }
                    event.fire_at_ms = next_fire_at;
                    event.order = order;
                    return Some(Fired {
                        handle,
                        payload: event.payload.clone(),
                        recurring: true,
                    });
                }
            }
        }
        None
    }

    /// Runs one full pass. `fire` may schedule or cancel through the scheduler
    /// it is handed; new events wait for the next tick.
    pub fn tick(&mut self, dt_ms: u64, mut fire: impl FnMut(&mut Self, Fired<E>)) -> usize {
        self.advance(dt_ms);
        let mut fired = 0;
        while let Some(event) = self.pop_due() {
            fired += 1;
            fire(self, event);
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delay_events_fire_in_insertion_order() {
        let mut scheduler = Scheduler::new();
        scheduler.delay(0, "a");
        scheduler.delay(0, "b");
        let mut order = Vec::new();
        scheduler.tick(16, |_, fired| order.push(fired.payload));
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn earlier_deadline_fires_before_earlier_insertion() {
        let mut scheduler = Scheduler::new();
        scheduler.delay(30, "late");
        scheduler.delay(10, "early");
        let mut order = Vec::new();
        scheduler.tick(50, |_, fired| order.push(fired.payload));
        assert_eq!(order, vec!["early", "late"]);
    }

    #[test]
    fn events_scheduled_during_pass_wait_for_next_tick() {
        let mut scheduler = Scheduler::new();
        scheduler.delay(0, 1);
        let mut seen = Vec::new();
        scheduler.tick(16, |scheduler, fired| {
            seen.push(fired.payload);
            scheduler.delay(0, fired.payload + 1);
        });
        assert_eq!(seen, vec![1]);
        scheduler.tick(16, |_, fired| seen.push(fired.payload));
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn cancelled_event_never_fires_even_when_already_due() {
        let mut scheduler = Scheduler::new();
        scheduler.delay(0, "first");
        let second = scheduler.delay(0, "second");
        let mut seen = Vec::new();
        scheduler.tick(16, |scheduler, fired| {
            seen.push(fired.payload);
            scheduler.cancel(second);
        });
        assert_eq!(seen, vec!["first"]);
        assert!(!scheduler.is_live(second));
    }

    #[test]
    fn one_shot_is_removed_after_firing() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.delay(100, ());
        assert_eq!(scheduler.tick(99, |_, _| {}), 0);
        assert!(scheduler.is_live(handle));
        assert_eq!(scheduler.tick(1, |_, _| {}), 1);
        assert!(!scheduler.is_live(handle));
    }

    #[test]
    fn recurring_event_rearms_and_fires_once_per_tick() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.every(100, ());
        assert_eq!(scheduler.tick(100, |_, _| {}), 1);
        assert!(scheduler.is_live(handle));
        // A long frame does not replay the backlog.
        assert_eq!(scheduler.tick(450, |_, _| {}), 1);
        assert_eq!(scheduler.tick(99, |_, _| {}), 0);
        assert_eq!(scheduler.tick(1, |_, _| {}), 1);
    }

    #[test]
    fn zero_period_recurring_event_fires_every_tick() {
        let mut scheduler = Scheduler::new();
        scheduler.every(0, ());
        for _ in 0..3 {
            assert_eq!(scheduler.tick(16, |_, _| {}), 1);
        }
    }

    #[test]
    fn recurring_event_can_cancel_itself() {
        let mut scheduler = Scheduler::new();
        scheduler.every(10, ());
        scheduler.tick(10, |scheduler, fired| {
            scheduler.cancel(fired.handle);
        });
        assert_eq!(scheduler.live_count(), 0);
        assert_eq!(scheduler.tick(100, |_, _| {}), 0);
    }

    #[test]
    fn clear_drops_live_events_and_pending_pass() {
        let mut scheduler = Scheduler::new();
        scheduler.delay(0, 1);
        scheduler.delay(0, 2);
        scheduler.advance(16);
        assert_eq!(scheduler.clear(), 2);
        assert_eq!(scheduler.pop_due(), None);
    }
}
