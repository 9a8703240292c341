use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use crate::metricalp::event::MetricalpEvent;
use crate::metricalp::logger::LOGGER;
use crate::metricalp::shared_props::{PropertyBag, SharedCustomProps};
use crate::metricalp::state::{EventHandler, GlobalState, GlobalStateCell, StateCell};
use crate::platform::environment::{DetectedSurface, DynRenderingSurface, RenderingSurface};

/// Handle on a Metricalp global state together with the surface check guarding it.
///
/// [`Metricalp::shared`] is the process-wide handle used by the free functions of this module.
/// [`Metricalp::new`] builds an isolated handle, which is what tests and custom hosts inject.
#[derive(Clone)]
pub struct Metricalp {
    inner: Arc<MetricalpInner>,
}

struct MetricalpInner {
    cell: Arc<StateCell>,
    surface: DynRenderingSurface,
    #[cfg_attr(
        not(all(target_arch = "wasm32", feature = "wasm-web")),
        allow(dead_code)
    )]
    bridge_window: bool,
    window_connected: AtomicBool,
}

impl fmt::Debug for Metricalp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metricalp")
            .field("surface_available", &self.surface_available())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Metricalp {
    pub fn new(surface: impl RenderingSurface + 'static) -> Self {
        Self::with_cell(Arc::new(StateCell::new()), Arc::new(surface))
    }

    pub fn with_cell(cell: Arc<StateCell>, surface: DynRenderingSurface) -> Self {
        Self::build(cell, surface, false)
    }

    /// Process-wide handle. In the `wasm-web` build it is tied to `window.metricalp` from its
    /// first initialization on: an object already placed there by an inline snippet is adopted,
    /// and events and shared props reach the window without waiting for a provider mount.
    pub fn shared() -> Self {
        static SHARED: LazyLock<Metricalp> = LazyLock::new(|| {
            Metricalp::build(
                GlobalStateCell::shared().inner().clone(),
                Arc::new(DetectedSurface),
                true,
            )
        });
        SHARED.clone()
    }

    fn build(cell: Arc<StateCell>, surface: DynRenderingSurface, bridge_window: bool) -> Self {
        Self {
            inner: Arc::new(MetricalpInner {
                cell,
                surface,
                bridge_window,
                window_connected: AtomicBool::new(false),
            }),
        }
    }

    pub fn surface_available(&self) -> bool {
        self.inner.surface.is_available()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.cell.is_initialized()
    }

    /// Tenant id recorded by a bootstrap snippet, if any.
    pub fn tid(&self) -> Option<String> {
        self.inner.cell.with_state(|state| state.tid.clone()).flatten()
    }

    pub fn version(&self) -> Option<String> {
        self.inner
            .cell
            .with_state(|state| state.version.clone())
            .flatten()
    }

    pub(crate) fn cell(&self) -> &StateCell {
        &self.inner.cell
    }

    /// Flags the handle as mirrored into the browser global. Returns `false` if it already was.
    #[cfg_attr(
        not(all(target_arch = "wasm32", feature = "wasm-web")),
        allow(dead_code)
    )]
    pub(crate) fn mark_window_connected(&self) -> bool {
        !self.inner.window_connected.swap(true, Ordering::SeqCst)
    }

    fn publish_shared_custom_props(&self) {
        if !self.inner.window_connected.load(Ordering::SeqCst) {
            return;
        }
        #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
        {
            if let Some(props) = self.shared_custom_props() {
                if let Err(err) = crate::metricalp::bridge::mirror_shared_custom_props(&props) {
                    LOGGER.warn(format!("Failed to mirror shared custom props: {err}"));
                }
            }
        }
    }

    /// Creates the global state with an empty queue and a queue-appending handler, unless it
    /// already exists. Does nothing without a live surface.
    pub fn ensure_initialized(&self) {
        if !self.surface_available() {
            return;
        }
        if self.inner.cell.get_or_init_with(|| self.initial_state()) {
            LOGGER.debug("initialized global event queue");
        }
        self.connect_window_if_bridged();
    }

    fn initial_state(&self) -> GlobalState {
        #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
        {
            if self.inner.bridge_window {
                let (tid, version) = crate::metricalp::bridge::window_bootstrap_identity();
                return GlobalState {
                    tid,
                    version,
                    ..GlobalState::new()
                };
            }
        }
        GlobalState::new()
    }

    fn connect_window_if_bridged(&self) {
        #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
        {
            if self.inner.bridge_window && !self.inner.window_connected.load(Ordering::SeqCst) {
                crate::metricalp::bridge::connect_window(self);
            }
        }
    }

    /// Pre-creates the global state the way an inline bootstrap snippet would, recording the
    /// tenant id and script version. Has no effect when the state already exists.
    pub fn bootstrap_with(&self, tid: Option<String>, version: Option<String>) {
        if !self.surface_available() {
            return;
        }
        self.inner.cell.get_or_init_with(|| GlobalState {
            tid,
            version,
            ..GlobalState::new()
        });
    }

    /// Forwards `event` to the installed handler, initializing the state first if needed.
    pub fn event(&self, event: MetricalpEvent) {
        if !self.surface_available() {
            return;
        }
        self.ensure_initialized();
        if let Some(handler) = self.inner.cell.current_handler() {
            handler(event);
        }
    }

    /// Replaces the `event` entry point. This is what the loaded script does once it can deliver
    /// events itself. Returns the previous handler.
    pub fn install_event_handler(&self, handler: EventHandler) -> Option<EventHandler> {
        self.inner
            .cell
            .with_state(|state| std::mem::replace(&mut state.event, handler))
    }

    /// Takes every queued event in call order.
    pub fn drain_queue(&self) -> Vec<MetricalpEvent> {
        self.inner
            .cell
            .with_state(|state| state.queue.clone())
            .map(|queue| queue.drain())
            .unwrap_or_default()
    }

    pub fn queued_events(&self) -> Vec<MetricalpEvent> {
        self.inner
            .cell
            .with_state(|state| state.queue.clone())
            .map(|queue| queue.snapshot())
            .unwrap_or_default()
    }

    pub fn shared_custom_props(&self) -> Option<SharedCustomProps> {
        self.inner
            .cell
            .with_state(|state| state.shared_custom_props.clone())
            .flatten()
    }

    /// Replaces the shared props bucket for `event_type`. When no store exists yet it starts as
    /// `{ "_global": {} }`. Does nothing without a live surface.
    pub fn update_shared_custom_props_for_type(
        &self,
        event_type: impl Into<String>,
        props: PropertyBag,
    ) {
        if !self.surface_available() {
            return;
        }
        self.ensure_initialized();
        self.inner.cell.with_state(|state| {
            state
                .shared_custom_props
                .get_or_insert_with(SharedCustomProps::with_global)
                .set_for_type(event_type, props);
        });
        self.publish_shared_custom_props();
    }

    /// Replaces the whole shared props store, then makes sure `_global` exists. Does nothing
    /// without a live surface.
    pub fn reset_shared_custom_props(&self, props: SharedCustomProps) {
        if !self.surface_available() {
            return;
        }
        self.ensure_initialized();
        self.inner.cell.with_state(|state| {
            let mut props = props;
            props.ensure_global();
            state.shared_custom_props = Some(props);
        });
        self.publish_shared_custom_props();
    }

    /// Seeds the store from `initial` only if no store is set yet. Returns whether it seeded.
    pub(crate) fn seed_shared_custom_props(&self, initial: &SharedCustomProps) -> bool {
        if !self.surface_available() {
            return false;
        }
        self.inner
            .cell
            .with_state(|state| {
                if state.shared_custom_props.is_some() {
                    return false;
                }
                let mut seeded = initial.clone();
                seeded.ensure_global();
                state.shared_custom_props = Some(seeded);
                true
            })
            .unwrap_or(false)
    }

    /// Emitter bound to this handle.
    pub fn emitter(&self) -> Emitter {
        Emitter {
            metricalp: self.clone(),
        }
    }
}

/// Cloneable event sender bound to one [`Metricalp`] handle.
#[derive(Clone, Debug)]
pub struct Emitter {
    metricalp: Metricalp,
}

impl Emitter {
    pub fn emit(&self, event: MetricalpEvent) {
        self.metricalp.event(event);
    }
}

/// Sends an event through the process-wide state. No-op without a live surface.
pub fn metricalp_event(event: MetricalpEvent) {
    Metricalp::shared().event(event);
}

pub fn update_shared_custom_props_for_type(event_type: impl Into<String>, props: PropertyBag) {
    Metricalp::shared().update_shared_custom_props_for_type(event_type, props);
}

pub fn reset_shared_custom_props(props: SharedCustomProps) {
    Metricalp::shared().reset_shared_custom_props(props);
}

/// Returns the emitter function. The same function pointer is returned on every call, so it is
/// safe to hold on to across renders.
pub fn use_metricalp() -> fn(MetricalpEvent) {
    metricalp_event
}
