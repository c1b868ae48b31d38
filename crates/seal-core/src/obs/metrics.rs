use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for the current thread.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Setup
    pub types_prepared: u64,
    pub accessors_wrapped: u64,
    pub pending_queued: u64,
    pub pending_drained: u64,

    // Access
    pub violations_raised: u64,
    pub violations_warned: u64,
    pub metadata_lookups: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub accessors_wrapped: u64,
    pub violations: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub counters: EventState,
    /// Entities with at least one violation, most violations first.
    pub noisiest: Vec<(String, u64)>,
}

/// Build a report by inspecting in-memory counters only.
#[must_use]
pub(crate) fn report() -> EventReport {
    let counters = with_state(Clone::clone);

    let mut noisiest = counters
        .entities
        .iter()
        .filter(|(_, c)| c.violations > 0)
        .map(|(path, c)| (path.clone(), c.violations))
        .collect::<Vec<_>>();
    noisiest.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    EventReport { counters, noisiest }
}
