//! Metrics sink boundary.
//!
//! Registry and sealing code never touch `obs::metrics` directly; all
//! instrumentation flows through `MetricsEvent` and `MetricsSink`.
use crate::{obs::metrics, seal::ViolationMode};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = const { RefCell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent<'a> {
    TypePrepared {
        entity_path: &'a str,
    },
    AccessorWrapped {
        entity_path: &'a str,
        attribute: &'a str,
    },
    PendingQueued {
        target_path: &'a str,
    },
    PendingDrained {
        target_path: &'a str,
        operations: u64,
    },
    Violation {
        entity_path: &'a str,
        mode: ViolationMode,
    },
    MetadataLookup {
        content_type_id: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default sink writing into the thread-local metrics state.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::TypePrepared { .. } => metrics::with_state_mut(|m| {
                m.ops.types_prepared = m.ops.types_prepared.saturating_add(1);
            }),

            MetricsEvent::AccessorWrapped { entity_path, .. } => metrics::with_state_mut(|m| {
                m.ops.accessors_wrapped = m.ops.accessors_wrapped.saturating_add(1);
                let entry = m.entities.entry(entity_path.to_string()).or_default();
                entry.accessors_wrapped = entry.accessors_wrapped.saturating_add(1);
            }),

            MetricsEvent::PendingQueued { .. } => metrics::with_state_mut(|m| {
                m.ops.pending_queued = m.ops.pending_queued.saturating_add(1);
            }),

            MetricsEvent::PendingDrained { operations, .. } => metrics::with_state_mut(|m| {
                m.ops.pending_drained = m.ops.pending_drained.saturating_add(operations);
            }),

            MetricsEvent::Violation { entity_path, mode } => metrics::with_state_mut(|m| {
                match mode {
                    ViolationMode::Error => {
                        m.ops.violations_raised = m.ops.violations_raised.saturating_add(1);
                    }
                    ViolationMode::Warn => {
                        m.ops.violations_warned = m.ops.violations_warned.saturating_add(1);
                    }
                }
                let entry = m.entities.entry(entity_path.to_string()).or_default();
                entry.violations = entry.violations.saturating_add(1);
            }),

            MetricsEvent::MetadataLookup { .. } => metrics::with_state_mut(|m| {
                m.ops.metadata_lookups = m.ops.metadata_lookups.saturating_add(1);
            }),
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current thread's metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}
