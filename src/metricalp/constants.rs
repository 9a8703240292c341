/// Script served by the Metricalp CDN when no override is configured.
pub const DEFAULT_SCRIPT_URL: &str = "https://cdn.metricalp.com/event/metricalp.js";

/// Conventional event type for screen views.
pub const METRICALP_SCREEN_VIEW_EV: &str = "screen_view";

/// Shared custom props bucket applied to every event type.
pub const GLOBAL_PROPS_KEY: &str = "_global";

/// Name of the browser global holding the queue.
pub const WINDOW_GLOBAL_NAME: &str = "metricalp";

pub const ATTR_TID: &str = "data-tid";
pub const ATTR_CUSTOM_EVENT_ENDPOINT: &str = "data-custom-event-endpoint";
pub const ATTR_ALLOW_LOCALHOST: &str = "data-allow-localhost";
pub const ATTR_DISABLE_AUTO_ROUTE_CATCH: &str = "data-disable-auto-route-catch";
pub const ATTR_DISABLE_CUSTOM_ELM_EVENTS: &str = "data-disable-custom-elm-events";
pub const ATTR_HASH_ROUTING: &str = "data-hash-routing";
