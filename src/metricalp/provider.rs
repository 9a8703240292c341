use std::collections::BTreeMap;
use std::fmt;

use crate::metricalp::api::Metricalp;
use crate::metricalp::config::MetricalpProviderProps;
use crate::metricalp::constants::{
    ATTR_ALLOW_LOCALHOST, ATTR_CUSTOM_EVENT_ENDPOINT, ATTR_DISABLE_AUTO_ROUTE_CATCH,
    ATTR_DISABLE_CUSTOM_ELM_EVENTS, ATTR_HASH_ROUTING, ATTR_TID, DEFAULT_SCRIPT_URL,
};
use crate::metricalp::loader::{default_script_loader, DynScriptLoader, ScriptRequest};
use crate::metricalp::logger::LOGGER;

/// Wires an application into Metricalp: seeds the shared custom props and asks the loader to
/// inject the script. Children pass through [`MetricalpProvider::mount`] untouched.
#[derive(Clone)]
pub struct MetricalpProvider {
    props: MetricalpProviderProps,
    metricalp: Metricalp,
    loader: DynScriptLoader,
}

impl fmt::Debug for MetricalpProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricalpProvider")
            .field("props", &self.props)
            .field("metricalp", &self.metricalp)
            .finish_non_exhaustive()
    }
}

impl MetricalpProvider {
    /// Provider bound to the process-wide state and the platform's default loader.
    ///
    /// Off the browser the default loader only records requests. Server renderers that want the
    /// tags should pass their own [`RecordingScriptLoader`](crate::metricalp::RecordingScriptLoader)
    /// through [`MetricalpProvider::with_handle`] and call `render_tags` on it.
    pub fn new(props: MetricalpProviderProps) -> Self {
        Self::with_handle(props, Metricalp::shared(), default_script_loader())
    }

    pub fn with_handle(
        props: MetricalpProviderProps,
        metricalp: Metricalp,
        loader: DynScriptLoader,
    ) -> Self {
        Self {
            props,
            metricalp,
            loader,
        }
    }

    pub fn props(&self) -> &MetricalpProviderProps {
        &self.props
    }

    pub fn metricalp(&self) -> &Metricalp {
        &self.metricalp
    }

    pub fn loader(&self) -> &DynScriptLoader {
        &self.loader
    }

    pub fn script_request(&self) -> ScriptRequest {
        resolve_script_request(&self.props)
    }

    /// Runs one mount/render cycle and hands `children` back unchanged.
    ///
    /// The shared props are seeded from `initial_shared_custom_props` only while no store exists,
    /// so later mounts never overwrite it. Loader failures are logged, not returned.
    pub fn mount<C>(&self, children: C) -> C {
        self.metricalp.ensure_initialized();
        if let Some(initial) = &self.props.initial_shared_custom_props {
            if self.metricalp.seed_shared_custom_props(initial) {
                LOGGER.debug("seeded shared custom props");
            }
        }

        #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
        {
            if self.metricalp.surface_available() {
                crate::metricalp::bridge::connect_window(&self.metricalp);
            }
        }

        let request = self.script_request();
        if let Err(err) = self.loader.load(&request) {
            LOGGER.warn(format!("Failed to load {}: {err}", request.url));
        }
        children
    }
}

/// Translates provider props into the script URL and `data-*` attributes the Metricalp script
/// reads. The endpoint attribute is left out when no endpoint is configured.
pub fn resolve_script_request(props: &MetricalpProviderProps) -> ScriptRequest {
    let url = props
        .custom_script_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .unwrap_or(DEFAULT_SCRIPT_URL)
        .to_string();

    let mut attributes = BTreeMap::new();
    attributes.insert(ATTR_TID.to_string(), props.tid.clone());
    if let Some(endpoint) = props
        .custom_event_endpoint
        .as_deref()
        .filter(|endpoint| !endpoint.is_empty())
    {
        attributes.insert(ATTR_CUSTOM_EVENT_ENDPOINT.to_string(), endpoint.to_string());
    }
    attributes.insert(
        ATTR_ALLOW_LOCALHOST.to_string(),
        flag(props.allow_localhost.unwrap_or(false)),
    );
    attributes.insert(
        ATTR_DISABLE_AUTO_ROUTE_CATCH.to_string(),
        flag(props.disable_auto_route_catch.unwrap_or(false)),
    );
    // The script takes the inverse switch.
    attributes.insert(
        ATTR_DISABLE_CUSTOM_ELM_EVENTS.to_string(),
        flag(!props.allow_custom_elm_events.unwrap_or(false)),
    );
    attributes.insert(
        ATTR_HASH_ROUTING.to_string(),
        flag(props.hash_routing.unwrap_or(false)),
    );

    ScriptRequest {
        url,
        attributes,
        remove_on_unmount: false,
    }
}

fn flag(value: bool) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metricalp::error::{script_load_error, MetricalpResult};
    use crate::metricalp::loader::{RecordingScriptLoader, ScriptLoader};
    use crate::metricalp::shared_props::{props, SharedCustomProps};
    use crate::platform::environment::StaticSurface;
    use serde_json::json;
    use std::sync::Arc;

    fn provider_with(
        props: MetricalpProviderProps,
        metricalp: &Metricalp,
    ) -> (MetricalpProvider, RecordingScriptLoader) {
        let loader = RecordingScriptLoader::new();
        let provider =
            MetricalpProvider::with_handle(props, metricalp.clone(), Arc::new(loader.clone()));
        (provider, loader)
    }

    fn seed(value: serde_json::Value) -> SharedCustomProps {
        SharedCustomProps::from_json_object(props(value))
    }

    #[test]
    fn defaults_resolve_to_cdn_and_false_flags() {
        let request = resolve_script_request(&MetricalpProviderProps::new("mam123"));
        assert_eq!(request.url, DEFAULT_SCRIPT_URL);
        assert!(!request.remove_on_unmount);
        assert_eq!(request.attribute(ATTR_TID), Some("mam123"));
        assert_eq!(request.attribute(ATTR_CUSTOM_EVENT_ENDPOINT), None);
        assert_eq!(request.attribute(ATTR_ALLOW_LOCALHOST), Some("false"));
        assert_eq!(request.attribute(ATTR_DISABLE_AUTO_ROUTE_CATCH), Some("false"));
        assert_eq!(request.attribute(ATTR_DISABLE_CUSTOM_ELM_EVENTS), Some("true"));
        assert_eq!(request.attribute(ATTR_HASH_ROUTING), Some("false"));
    }

    #[test]
    fn custom_elm_events_flag_is_inverted() {
        let allowed = MetricalpProviderProps::new("mam123").with_allow_custom_elm_events(true);
        let denied = MetricalpProviderProps::new("mam123").with_allow_custom_elm_events(false);
        assert_eq!(
            resolve_script_request(&allowed).attribute(ATTR_DISABLE_CUSTOM_ELM_EVENTS),
            Some("false")
        );
        assert_eq!(
            resolve_script_request(&denied).attribute(ATTR_DISABLE_CUSTOM_ELM_EVENTS),
            Some("true")
        );
    }

    #[test]
    fn overrides_pass_through() {
        let props = MetricalpProviderProps::new("mam123")
            .with_custom_script_url("https://self-hosted.example.com/m.js")
            .with_custom_event_endpoint("https://events.example.com/collect")
            .with_allow_localhost(true)
            .with_disable_auto_route_catch(true)
            .with_hash_routing(true);
        let request = resolve_script_request(&props);
        assert_eq!(request.url, "https://self-hosted.example.com/m.js");
        assert_eq!(
            request.attribute(ATTR_CUSTOM_EVENT_ENDPOINT),
            Some("https://events.example.com/collect")
        );
        assert_eq!(request.attribute(ATTR_ALLOW_LOCALHOST), Some("true"));
        assert_eq!(request.attribute(ATTR_DISABLE_AUTO_ROUTE_CATCH), Some("true"));
        assert_eq!(request.attribute(ATTR_HASH_ROUTING), Some("true"));
    }

    #[test]
    fn mount_returns_children_and_loads_script() {
        let metricalp = Metricalp::new(StaticSurface::Browser);
        let (provider, loader) = provider_with(MetricalpProviderProps::new("mam123"), &metricalp);

        let children = vec!["header", "main"];
        assert_eq!(provider.mount(children.clone()), children);
        assert_eq!(loader.requests(), vec![provider.script_request()]);
        assert!(metricalp.is_initialized());
    }

    #[test]
    fn mount_seeds_store_once() {
        let metricalp = Metricalp::new(StaticSurface::Browser);
        let (first, _) = provider_with(
            MetricalpProviderProps::new("mam123")
                .with_initial_shared_custom_props(seed(json!({"foo": 1}))),
            &metricalp,
        );
        first.mount(());
        assert_eq!(
            metricalp.shared_custom_props().unwrap().to_json(),
            json!({"foo": 1, "_global": {}})
        );

        let (second, _) = provider_with(
            MetricalpProviderProps::new("mam123")
                .with_initial_shared_custom_props(seed(json!({"bar": {"b": 2}}))),
            &metricalp,
        );
        second.mount(());
        assert_eq!(
            metricalp.shared_custom_props().unwrap().to_json(),
            json!({"foo": 1, "_global": {}})
        );
    }

    #[test]
    fn mount_on_server_still_requests_script() {
        let metricalp = Metricalp::new(StaticSurface::Server);
        let (provider, loader) = provider_with(
            MetricalpProviderProps::new("mam123")
                .with_initial_shared_custom_props(seed(json!({"foo": {}}))),
            &metricalp,
        );
        assert_eq!(provider.mount(7), 7);
        assert!(!metricalp.is_initialized());
        assert_eq!(loader.requests().len(), 1);
        assert!(loader.render_tags().contains("data-tid=\"mam123\""));
    }

    #[test]
    fn server_renderer_reads_tags_from_its_loader() {
        let metricalp = Metricalp::new(StaticSurface::Server);
        let recorder = RecordingScriptLoader::new();
        let loader: DynScriptLoader = Arc::new(recorder.clone());
        let provider = MetricalpProvider::with_handle(
            MetricalpProviderProps::new("mam-ssr"),
            metricalp,
            Arc::clone(&loader),
        );
        assert!(Arc::ptr_eq(provider.loader(), &loader));

        provider.mount(());
        assert_eq!(
            recorder.render_tags(),
            provider.script_request().to_html_tag()
        );
    }

    struct FailingLoader;

    impl ScriptLoader for FailingLoader {
        fn load(&self, _request: &ScriptRequest) -> MetricalpResult<()> {
            Err(script_load_error("blocked"))
        }
    }

    #[test]
    fn loader_failure_does_not_escape_mount() {
        let metricalp = Metricalp::new(StaticSurface::Browser);
        let provider = MetricalpProvider::with_handle(
            MetricalpProviderProps::new("mam123"),
            metricalp.clone(),
            Arc::new(FailingLoader),
        );
        assert_eq!(provider.mount("children"), "children");
        assert!(metricalp.is_initialized());
    }
}
