mod api;
#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
pub mod bridge;
mod config;
mod constants;
pub mod error;
mod event;
mod loader;
pub mod logger;
mod provider;
mod shared_props;
mod state;

pub use api::{
    metricalp_event, reset_shared_custom_props, update_shared_custom_props_for_type,
    use_metricalp, Emitter, Metricalp,
};
pub use config::MetricalpProviderProps;
pub use constants::{
    ATTR_ALLOW_LOCALHOST, ATTR_CUSTOM_EVENT_ENDPOINT, ATTR_DISABLE_AUTO_ROUTE_CATCH,
    ATTR_DISABLE_CUSTOM_ELM_EVENTS, ATTR_HASH_ROUTING, ATTR_TID, DEFAULT_SCRIPT_URL,
    GLOBAL_PROPS_KEY, METRICALP_SCREEN_VIEW_EV, WINDOW_GLOBAL_NAME,
};
pub use event::{EventValue, MetricalpEvent};
#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
pub use loader::DomScriptLoader;
pub use loader::{
    default_script_loader, DynScriptLoader, RecordingScriptLoader, ScriptLoader, ScriptRequest,
};
pub use provider::{resolve_script_request, MetricalpProvider};
pub use shared_props::{props, PropertyBag, SharedCustomProps};
pub use state::{queue_handler, EventHandler, EventQueue, GlobalState, GlobalStateCell, StateCell};
