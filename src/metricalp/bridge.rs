//! Mirrors the Rust-side state into `window.metricalp`, where the loaded script looks for it.

use std::sync::Arc;

use js_sys::{Array, Function, Object, Reflect};
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};

use crate::metricalp::api::Metricalp;
use crate::metricalp::constants::WINDOW_GLOBAL_NAME;
use crate::metricalp::error::{internal_error, MetricalpResult};
use crate::metricalp::event::MetricalpEvent;
use crate::metricalp::logger::LOGGER;
use crate::metricalp::shared_props::SharedCustomProps;
use crate::metricalp::state::EventHandler;

const QUEUE_KEY: &str = "queue";
const EVENT_KEY: &str = "event";
const SHARED_PROPS_KEY: &str = "sharedCustomProps";
const TID_KEY: &str = "tid";
const VERSION_KEY: &str = "version";

fn js_error(context: &str, err: JsValue) -> crate::metricalp::error::MetricalpError {
    internal_error(format!("{context}: {err:?}"))
}

fn to_js<T: Serialize>(value: &T) -> MetricalpResult<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| internal_error(format!("Failed to convert value for JS: {err}")))
}

/// Returns `window.metricalp`, creating `{ queue: [], event(e) { this.queue.push(e) } }` when
/// it is missing. An existing object is left as is.
pub fn install_window_bootstrap() -> MetricalpResult<Object> {
    let global = js_sys::global();
    let key = JsValue::from_str(WINDOW_GLOBAL_NAME);
    let existing = Reflect::get(&global, &key)
        .map_err(|err| js_error("Failed to read window.metricalp", err))?;
    if existing.is_object() {
        return Ok(existing.unchecked_into());
    }

    let object = Object::new();
    Reflect::set(&object, &JsValue::from_str(QUEUE_KEY), &Array::new())
        .map_err(|err| js_error("Failed to create queue", err))?;
    let event = Function::new_with_args("e", "if (this.queue) { this.queue.push(e); }");
    Reflect::set(&object, &JsValue::from_str(EVENT_KEY), &event)
        .map_err(|err| js_error("Failed to create event()", err))?;
    Reflect::set(&global, &key, &object)
        .map_err(|err| js_error("Failed to install window.metricalp", err))?;
    Ok(object)
}

/// `tid` and `version` of a `window.metricalp` object placed by an inline snippet. Both are
/// `None` when the page has no such object.
pub fn window_bootstrap_identity() -> (Option<String>, Option<String>) {
    let Ok(existing) = Reflect::get(&js_sys::global(), &JsValue::from_str(WINDOW_GLOBAL_NAME))
    else {
        return (None, None);
    };
    if !existing.is_object() {
        return (None, None);
    }
    let read = |key: &str| {
        Reflect::get(&existing, &JsValue::from_str(key))
            .ok()
            .and_then(|value| {
                value
                    .as_string()
                    .or_else(|| value.as_f64().map(|number| number.to_string()))
            })
    };
    (read(TID_KEY), read(VERSION_KEY))
}

fn forward_to_window(event: &MetricalpEvent) -> MetricalpResult<()> {
    let object = install_window_bootstrap()?;
    let handler = Reflect::get(&object, &JsValue::from_str(EVENT_KEY))
        .map_err(|err| js_error("Failed to read event()", err))?
        .dyn_into::<Function>()
        .map_err(|_| internal_error("window.metricalp.event is not a function"))?;
    handler
        .call1(&object, &to_js(event)?)
        .map_err(|err| js_error("window.metricalp.event threw", err))?;
    Ok(())
}

/// Handler calling `window.metricalp.event(record)`, whichever implementation is installed there
/// at call time.
pub fn window_event_handler() -> EventHandler {
    Arc::new(|event: MetricalpEvent| {
        if let Err(err) = forward_to_window(&event) {
            log::debug!("metricalp event forwarding failed: {err}");
        }
    })
}

pub fn mirror_shared_custom_props(props: &SharedCustomProps) -> MetricalpResult<()> {
    let object = install_window_bootstrap()?;
    Reflect::set(&object, &JsValue::from_str(SHARED_PROPS_KEY), &to_js(props)?)
        .map_err(|err| js_error("Failed to set sharedCustomProps", err))?;
    Ok(())
}

/// Connects `metricalp` to the window global: queued events move over in order, later events go
/// straight to `window.metricalp.event`, and shared props are mirrored on every change.
pub fn connect_window(metricalp: &Metricalp) {
    if let Some(props) = metricalp.shared_custom_props() {
        if let Err(err) = mirror_shared_custom_props(&props) {
            LOGGER.warn(format!("Failed to mirror shared custom props: {err}"));
        }
    }
    if !metricalp.mark_window_connected() {
        return;
    }
    if let Err(err) = install_window_bootstrap() {
        LOGGER.warn(format!("Failed to install window.metricalp: {err}"));
        return;
    }

    let handler = window_event_handler();
    metricalp.install_event_handler(Arc::clone(&handler));
    for event in metricalp.drain_queue() {
        handler(event);
    }
}
