//! Runtime environment detection and configuration defaults.
//!
//! The Metricalp integration only touches its global state when a live rendering surface (a
//! browser window) is present. Detection is exposed through the [`RenderingSurface`] trait so
//! callers and tests can inject their own answer instead of probing the host.

use std::env;
use std::fs;
use std::sync::Arc;

use serde_json::Value;

/// Environment variable forcing the detected surface: `browser` or `server`.
pub const FORCE_ENVIRONMENT_VAR: &str = "METRICALP_FORCE_ENVIRONMENT";
/// Environment variable (or browser global) holding provider defaults as JSON.
pub const DEFAULTS_VAR: &str = "__METRICALP_DEFAULTS__";
/// Environment variable pointing to a JSON file with provider defaults.
pub const DEFAULTS_PATH_VAR: &str = "__METRICALP_DEFAULTS_PATH";

/// Answers whether a live rendering surface is available.
pub trait RenderingSurface: Send + Sync {
    fn is_available(&self) -> bool;
}

pub type DynRenderingSurface = Arc<dyn RenderingSurface>;

/// Surface with a fixed answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StaticSurface {
    Browser,
    Server,
}

impl RenderingSurface for StaticSurface {
    fn is_available(&self) -> bool {
        matches!(self, StaticSurface::Browser)
    }
}

/// Probes the host on every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetectedSurface;

impl RenderingSurface for DetectedSurface {
    fn is_available(&self) -> bool {
        is_browser()
    }
}

fn force_environment() -> Option<String> {
    env::var(FORCE_ENVIRONMENT_VAR)
        .ok()
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
}

/// Returns `true` if the runtime should behave as a browser environment.
pub fn is_browser() -> bool {
    if let Some(forced) = force_environment() {
        return forced == "browser";
    }

    #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
    {
        web_sys::window().is_some()
    }

    #[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
    {
        false
    }
}

/// Returns the raw defaults object, looked up in the environment, then in the file named by
/// [`DEFAULTS_PATH_VAR`], then in the browser global.
pub fn metricalp_defaults() -> Option<Value> {
    defaults_from_env()
        .or_else(defaults_from_path)
        .or_else(defaults_from_global)
}

fn defaults_from_env() -> Option<Value> {
    let raw = env::var(DEFAULTS_VAR).ok()?;
    parse_object(&raw)
}

fn defaults_from_path() -> Option<Value> {
    let path = env::var(DEFAULTS_PATH_VAR).ok()?;
    let content = fs::read_to_string(path.trim()).ok()?;
    parse_object(&content)
}

#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
fn defaults_from_global() -> Option<Value> {
    use wasm_bindgen::JsValue;

    let global = js_sys::global();
    let value = js_sys::Reflect::get(&global, &JsValue::from_str(DEFAULTS_VAR)).ok()?;
    if value.is_null() || value.is_undefined() {
        return None;
    }
    let serialized = js_sys::JSON::stringify(&value).ok()?.as_string()?;
    parse_object(&serialized)
}

#[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
fn defaults_from_global() -> Option<Value> {
    None
}

fn parse_object(raw: &str) -> Option<Value> {
    serde_json::from_str::<Value>(raw)
        .ok()
        .filter(Value::is_object)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex, MutexGuard};

    static ENV_GUARD: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    /// Serializes tests that touch process environment variables.
    pub(crate) fn env_guard() -> MutexGuard<'static, ()> {
        ENV_GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn static_surfaces_report_fixed_answers() {
        assert!(StaticSurface::Browser.is_available());
        assert!(!StaticSurface::Server.is_available());
    }

    #[test]
    fn native_default_is_server() {
        let _guard = env_guard();
        unsafe { env::remove_var(FORCE_ENVIRONMENT_VAR) };
        assert!(!is_browser());
        assert!(!DetectedSurface.is_available());
    }

    #[test]
    fn forced_environment_wins() {
        let _guard = env_guard();
        unsafe { env::set_var(FORCE_ENVIRONMENT_VAR, "Browser") };
        assert!(is_browser());
        unsafe { env::set_var(FORCE_ENVIRONMENT_VAR, "server") };
        assert!(!is_browser());
        unsafe { env::remove_var(FORCE_ENVIRONMENT_VAR) };
    }

    #[test]
    fn defaults_read_from_env_and_path() {
        let _guard = env_guard();
        unsafe { env::set_var(DEFAULTS_VAR, "{\"tid\":\"mam-env\"}") };
        assert_eq!(metricalp_defaults().unwrap()["tid"], "mam-env");

        unsafe { env::set_var(DEFAULTS_VAR, "[1, 2]") };
        assert!(metricalp_defaults().is_none());
        unsafe { env::remove_var(DEFAULTS_VAR) };

        let mut path = env::temp_dir();
        path.push(format!(
            "metricalp_rs_defaults_{}.json",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        fs::write(&path, "{\"tid\":\"mam-file\"}").unwrap();
        unsafe { env::set_var(DEFAULTS_PATH_VAR, path.to_string_lossy().to_string()) };
        assert_eq!(metricalp_defaults().unwrap()["tid"], "mam-file");
        unsafe { env::remove_var(DEFAULTS_PATH_VAR) };
        let _ = fs::remove_file(path);
    }
}
