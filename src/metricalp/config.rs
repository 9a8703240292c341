use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::metricalp::error::{config_error, MetricalpResult};
use crate::metricalp::shared_props::SharedCustomProps;
use crate::platform::environment::metricalp_defaults;

/// Configuration accepted by [`MetricalpProvider`](crate::metricalp::MetricalpProvider).
///
/// Only `tid` is required. When loaded from JSON the keys are camelCase, e.g.
/// `{"tid": "mam123", "allowLocalhost": true, "customScriptUrl": "https://..."}`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricalpProviderProps {
    pub tid: String,
    #[serde(default)]
    pub custom_event_endpoint: Option<String>,
    #[serde(default)]
    pub custom_script_url: Option<String>,
    #[serde(default)]
    pub allow_localhost: Option<bool>,
    #[serde(default)]
    pub allow_custom_elm_events: Option<bool>,
    #[serde(default)]
    pub disable_auto_route_catch: Option<bool>,
    #[serde(default)]
    pub hash_routing: Option<bool>,
    #[serde(default)]
    pub initial_shared_custom_props: Option<SharedCustomProps>,
}

impl MetricalpProviderProps {
    pub fn new(tid: impl Into<String>) -> Self {
        Self {
            tid: tid.into(),
            ..Default::default()
        }
    }

    pub fn with_custom_event_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.custom_event_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_custom_script_url(mut self, url: impl Into<String>) -> Self {
        self.custom_script_url = Some(url.into());
        self
    }

    pub fn with_allow_localhost(mut self, allow: bool) -> Self {
        self.allow_localhost = Some(allow);
        self
    }

    pub fn with_allow_custom_elm_events(mut self, allow: bool) -> Self {
        self.allow_custom_elm_events = Some(allow);
        self
    }

    pub fn with_disable_auto_route_catch(mut self, disable: bool) -> Self {
        self.disable_auto_route_catch = Some(disable);
        self
    }

    pub fn with_hash_routing(mut self, hash_routing: bool) -> Self {
        self.hash_routing = Some(hash_routing);
        self
    }

    pub fn with_initial_shared_custom_props(mut self, props: SharedCustomProps) -> Self {
        self.initial_shared_custom_props = Some(props);
        self
    }

    /// Parses and validates props from a JSON object.
    pub fn from_json(value: Value) -> MetricalpResult<Self> {
        let props: Self = serde_json::from_value(value)
            .map_err(|err| config_error(format!("Invalid provider configuration: {err}")))?;
        props.validate()?;
        Ok(props)
    }

    /// Loads props from `__METRICALP_DEFAULTS__` / `__METRICALP_DEFAULTS_PATH`, or the browser
    /// global of the same name.
    pub fn from_defaults() -> MetricalpResult<Self> {
        let defaults =
            metricalp_defaults().ok_or_else(|| config_error("No Metricalp defaults found"))?;
        Self::from_json(defaults)
    }

    /// Checks that `tid` is set and that the URL overrides parse.
    pub fn validate(&self) -> MetricalpResult<()> {
        if self.tid.trim().is_empty() {
            return Err(config_error("Provider requires a non-empty tid"));
        }
        if let Some(url) = &self.custom_script_url {
            validate_url("customScriptUrl", url)?;
        }
        if let Some(endpoint) = &self.custom_event_endpoint {
            if !endpoint.is_empty() {
                validate_url("customEventEndpoint", endpoint)?;
            }
        }
        Ok(())
    }
}

fn validate_url(field: &str, raw: &str) -> MetricalpResult<()> {
    let parsed =
        Url::parse(raw).map_err(|err| config_error(format!("Invalid {field} \"{raw}\": {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(config_error(format!(
            "Invalid {field} \"{raw}\": unsupported scheme {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::environment::tests::env_guard;
    use crate::platform::environment::{DEFAULTS_PATH_VAR, DEFAULTS_VAR};
    use serde_json::json;

    #[test]
    fn parses_camel_case_keys() {
        let props = MetricalpProviderProps::from_json(json!({
            "tid": "mam123",
            "customEventEndpoint": "https://events.example.com/collect",
            "allowLocalhost": true,
            "allowCustomElmEvents": false,
            "hashRouting": true,
            "initialSharedCustomProps": {"_global": {"app": "web"}}
        }))
        .unwrap();

        assert_eq!(props.tid, "mam123");
        assert_eq!(
            props.custom_event_endpoint.as_deref(),
            Some("https://events.example.com/collect")
        );
        assert_eq!(props.allow_localhost, Some(true));
        assert_eq!(props.allow_custom_elm_events, Some(false));
        assert_eq!(props.disable_auto_route_catch, None);
        assert_eq!(props.hash_routing, Some(true));
        let seed = props.initial_shared_custom_props.unwrap();
        assert_eq!(seed.global().unwrap()["app"], "web");
    }

    #[test]
    fn scalar_seed_entries_are_accepted() {
        let props = MetricalpProviderProps::from_json(json!({
            "tid": "mam1",
            "initialSharedCustomProps": {"foo": 1}
        }))
        .unwrap();
        let seed = props.initial_shared_custom_props.unwrap();
        assert_eq!(seed.get("foo"), Some(&json!(1)));
    }

    #[test]
    fn missing_or_blank_tid_is_rejected() {
        let err = MetricalpProviderProps::from_json(json!({"allowLocalhost": true})).unwrap_err();
        assert_eq!(err.code_str(), "metricalp/config");

        let err = MetricalpProviderProps::from_json(json!({"tid": "  "})).unwrap_err();
        assert_eq!(err.code_str(), "metricalp/config");
    }

    #[test]
    fn invalid_urls_are_rejected() {
        let err = MetricalpProviderProps::new("mam123")
            .with_custom_script_url("not a url")
            .validate()
            .unwrap_err();
        assert!(err.message().contains("customScriptUrl"));

        let err = MetricalpProviderProps::new("mam123")
            .with_custom_event_endpoint("ftp://events.example.com")
            .validate()
            .unwrap_err();
        assert!(err.message().contains("unsupported scheme"));

        assert!(MetricalpProviderProps::new("mam123")
            .with_custom_event_endpoint("")
            .validate()
            .is_ok());
    }

    #[test]
    fn loads_from_environment_defaults() {
        let _guard = env_guard();
        unsafe { std::env::remove_var(DEFAULTS_PATH_VAR) };
        unsafe { std::env::set_var(DEFAULTS_VAR, "{\"tid\":\"mam-env\",\"hashRouting\":true}") };
        let props = MetricalpProviderProps::from_defaults().unwrap();
        assert_eq!(props.tid, "mam-env");
        assert_eq!(props.hash_routing, Some(true));

        unsafe { std::env::remove_var(DEFAULTS_VAR) };
        let err = MetricalpProviderProps::from_defaults().unwrap_err();
        assert_eq!(err.code_str(), "metricalp/config");
    }
}
