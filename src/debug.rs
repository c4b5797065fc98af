//! Scheduler event log.
//!
//! The audio thread pushes fixed-size `SchedulerEvent`s into a lock-free
//! SPSC ring; a background task drains them and formats through the `log`
//! facade. Nothing here formats or allocates on the push side.

use ringbuf::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::dsp::chain::StageId;
use crate::scheduler::UpdateReport;

pub const EVENT_LOG_CAP: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerEvent {
    /// Block index the report was produced in.
    pub block: u64,
    pub report: UpdateReport,
}

/// Audio-thread half.
pub struct EventLog {
    producer: Producer<SchedulerEvent>,
    dropped: Arc<AtomicU64>,
}

/// Background half. Shared with the task executor, hence the mutex; only the
/// drain side ever takes it.
pub struct EventDrain {
    consumer: Mutex<Consumer<SchedulerEvent>>,
    dropped: Arc<AtomicU64>,
}

pub fn event_channel(capacity: usize) -> (EventLog, EventDrain) {
    let (producer, consumer) = RingBuffer::<SchedulerEvent>::new(capacity.max(1)).split();
    let dropped = Arc::new(AtomicU64::new(0));
    (
        EventLog {
            producer,
            dropped: dropped.clone(),
        },
        EventDrain {
            consumer: Mutex::new(consumer),
            dropped,
        },
    )
}

impl EventLog {
    /// Queue an event. A full ring drops it and bumps the drop counter.
    #[inline]
    pub fn push(&mut self, event: SchedulerEvent) -> bool {
        if self.producer.push(event).is_ok() {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }
}

impl EventDrain {
    /// Pop everything queued so far without logging.
    pub fn drain(&self) -> Vec<SchedulerEvent> {
        let mut out = Vec::new();
        if let Ok(mut consumer) = self.consumer.lock() {
            while let Some(event) = consumer.pop() {
                out.push(event);
            }
        }
        out
    }

    /// Drain queued events into `log::debug!`. Returns how many were logged.
    pub fn drain_to_log(&self) -> usize {
        let events = self.drain();
        for event in &events {
            log::debug!("{}", describe(event));
        }
        let dropped = self.dropped.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            log::debug!("scheduler event log overflowed, {dropped} events dropped");
        }
        events.len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// One line per event, e.g. `block 12: recomputed [Mid, HighCut] toggled []`.
pub fn describe(event: &SchedulerEvent) -> String {
    let names = |pick: &dyn Fn(StageId) -> bool| -> Vec<&'static str> {
        StageId::ALL
            .iter()
            .copied()
            .filter(|&s| pick(s))
            .map(StageId::name)
            .collect()
    };
    let recomputed = names(&|s| event.report.recomputed(s));
    let toggled = names(&|s| event.report.toggled(s));
    format!(
        "block {}: recomputed [{}] toggled [{}]",
        event.block,
        recomputed.join(", "),
        toggled.join(", ")
    )
}
