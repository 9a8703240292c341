//! Process-wide holder for the Metricalp queue, event handler and shared custom props.
//!
//! The holder is created lazily, at most once, and never torn down. The loaded script is expected
//! to swap the `event` handler for one that delivers events and to drain whatever was queued
//! before it arrived.

use std::fmt;
use std::sync::{Arc, LazyLock, Mutex};

use crate::metricalp::event::MetricalpEvent;
use crate::metricalp::shared_props::SharedCustomProps;

/// The `event` entry point of the global state.
pub type EventHandler = Arc<dyn Fn(MetricalpEvent) + Send + Sync + 'static>;

/// FIFO of events waiting for the script. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct EventQueue(Arc<Mutex<Vec<MetricalpEvent>>>);

impl EventQueue {
    pub fn push(&self, event: MetricalpEvent) {
        self.0.lock().unwrap().push(event);
    }

    pub fn snapshot(&self) -> Vec<MetricalpEvent> {
        self.0.lock().unwrap().clone()
    }

    /// Removes and returns every queued event in insertion order.
    pub fn drain(&self) -> Vec<MetricalpEvent> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &EventQueue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventQueue").field(&self.len()).finish()
    }
}

/// Handler that appends every event to `queue`.
pub fn queue_handler(queue: &EventQueue) -> EventHandler {
    let queue = queue.clone();
    Arc::new(move |event: MetricalpEvent| queue.push(event))
}

#[derive(Clone)]
pub struct GlobalState {
    pub tid: Option<String>,
    pub version: Option<String>,
    pub queue: EventQueue,
    pub event: EventHandler,
    pub shared_custom_props: Option<SharedCustomProps>,
}

impl GlobalState {
    /// Empty queue, queue-appending handler, no shared props.
    pub fn new() -> Self {
        let queue = EventQueue::default();
        let event = queue_handler(&queue);
        Self {
            tid: None,
            version: None,
            queue,
            event,
            shared_custom_props: None,
        }
    }
}

impl Default for GlobalState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GlobalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalState")
            .field("tid", &self.tid)
            .field("version", &self.version)
            .field("queue", &self.queue)
            .field("shared_custom_props", &self.shared_custom_props)
            .finish_non_exhaustive()
    }
}

/// Slot holding the (possibly not yet created) global state.
#[derive(Debug, Default)]
pub struct StateCell {
    state: Mutex<Option<GlobalState>>,
}

impl StateCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `init()` when the slot is empty. Returns `true` if this call created the state.
    pub fn get_or_init_with<F>(&self, init: F) -> bool
    where
        F: FnOnce() -> GlobalState,
    {
        let mut slot = self.state.lock().unwrap();
        if slot.is_some() {
            return false;
        }
        *slot = Some(init());
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().unwrap().is_some()
    }

    /// Runs `f` against the state if it exists. `f` runs under the slot lock and must not call
    /// back into this cell.
    pub fn with_state<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut GlobalState) -> R,
    {
        self.state.lock().unwrap().as_mut().map(f)
    }

    /// Currently installed handler, cloned out so it can be invoked without the lock.
    pub fn current_handler(&self) -> Option<EventHandler> {
        self.with_state(|state| Arc::clone(&state.event))
    }

    pub fn snapshot(&self) -> Option<GlobalState> {
        self.state.lock().unwrap().clone()
    }

    /// Drops the state so the next access recreates it.
    #[cfg(test)]
    pub(crate) fn clear(&self) {
        self.state.lock().unwrap().take();
    }
}

/// Handle to the single process-wide [`StateCell`].
#[derive(Clone, Debug)]
pub struct GlobalStateCell(Arc<StateCell>);

impl GlobalStateCell {
    pub fn shared() -> Self {
        static INSTANCE: LazyLock<Arc<StateCell>> = LazyLock::new(|| Arc::new(StateCell::new()));
        Self(INSTANCE.clone())
    }

    pub fn inner(&self) -> &Arc<StateCell> {
        &self.0
    }
}
