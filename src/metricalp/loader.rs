//! Script injection collaborators.
//!
//! The provider describes the script it wants as a [`ScriptRequest`] and hands it to a
//! [`ScriptLoader`]. In the browser, [`DomScriptLoader`] appends a `<script>` element. Elsewhere,
//! [`RecordingScriptLoader`] keeps the requests so a server renderer can emit the tags itself.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::metricalp::error::MetricalpResult;

/// Everything needed to inject the Metricalp script once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptRequest {
    pub url: String,
    pub attributes: BTreeMap<String, String>,
    pub remove_on_unmount: bool,
}

impl ScriptRequest {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Renders the request as an HTML tag for server-side output.
    pub fn to_html_tag(&self) -> String {
        let mut tag = format!("<script src=\"{}\"", escape_attribute(&self.url));
        for (name, value) in &self.attributes {
            tag.push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
        }
        tag.push_str("></script>");
        tag
    }
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub trait ScriptLoader: Send + Sync {
    fn load(&self, request: &ScriptRequest) -> MetricalpResult<()>;
}

pub type DynScriptLoader = Arc<dyn ScriptLoader>;

/// Stores requests instead of touching a document. Repeated requests for the same URL are kept
/// once, matching how the DOM loader skips scripts that are already present.
#[derive(Clone, Debug, Default)]
pub struct RecordingScriptLoader {
    requests: Arc<Mutex<Vec<ScriptRequest>>>,
}

impl RecordingScriptLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<ScriptRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// HTML for every recorded script, one tag per line.
    pub fn render_tags(&self) -> String {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(ScriptRequest::to_html_tag)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ScriptLoader for RecordingScriptLoader {
    fn load(&self, request: &ScriptRequest) -> MetricalpResult<()> {
        let mut requests = self.requests.lock().unwrap();
        if requests.iter().any(|existing| existing.url == request.url) {
            log::debug!("script {} already requested", request.url);
        } else {
            requests.push(request.clone());
        }
        Ok(())
    }
}

#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
pub use dom::DomScriptLoader;

#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
mod dom {
    use wasm_bindgen::JsCast;

    use super::{ScriptLoader, ScriptRequest};
    use crate::metricalp::error::{script_load_error, MetricalpResult};

    /// Compares raw `src` attributes, so URLs with characters a CSS selector would reject still
    /// match.
    fn script_present(document: &web_sys::Document, url: &str) -> bool {
        let scripts = document.get_elements_by_tag_name("script");
        (0..scripts.length())
            .filter_map(|index| scripts.item(index))
            .any(|script| script.get_attribute("src").as_deref() == Some(url))
    }

    /// Appends a `<script>` element to `<head>` (or `<body>`). The element is never removed.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct DomScriptLoader;

    impl ScriptLoader for DomScriptLoader {
        fn load(&self, request: &ScriptRequest) -> MetricalpResult<()> {
            let window =
                web_sys::window().ok_or_else(|| script_load_error("Window not available"))?;
            let document = window
                .document()
                .ok_or_else(|| script_load_error("Document not available"))?;

            if script_present(&document, &request.url) {
                return Ok(());
            }

            let script = document
                .create_element("script")
                .map_err(|err| script_load_error(format!("Failed to create script: {err:?}")))?
                .dyn_into::<web_sys::HtmlScriptElement>()
                .map_err(|_| script_load_error("Script element has wrong type"))?;
            script.set_src(&request.url);
            script.set_async(true);
            for (name, value) in &request.attributes {
                script.set_attribute(name, value).map_err(|err| {
                    script_load_error(format!("Failed to set attribute {name}: {err:?}"))
                })?;
            }

            if let Some(head) = document.head() {
                head.append_child(&script).map_err(|err| {
                    script_load_error(format!("Failed to append script to <head>: {err:?}"))
                })?;
            } else if let Some(body) = document.body() {
                body.append_child(&script).map_err(|err| {
                    script_load_error(format!("Failed to append script to <body>: {err:?}"))
                })?;
            } else {
                return Err(script_load_error("No <head> or <body> element found"));
            }
            Ok(())
        }
    }
}

/// Loader used when the caller does not supply one: the DOM loader in the browser build,
/// a recording loader everywhere else.
pub fn default_script_loader() -> DynScriptLoader {
    #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
    {
        Arc::new(DomScriptLoader)
    }

    #[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
    {
        Arc::new(RecordingScriptLoader::new())
    }
}
