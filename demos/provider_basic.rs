//! Mounts the provider during a server-side render, prints the script tag the page should carry,
//! then shows the queue filling up once a browser surface is present.

use std::sync::Arc;

use metricalp_rs::metricalp::{
    props, Metricalp, MetricalpEvent, MetricalpProvider, MetricalpProviderProps,
    RecordingScriptLoader, SharedCustomProps, METRICALP_SCREEN_VIEW_EV,
};
use metricalp_rs::platform::StaticSurface;
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = MetricalpProviderProps::from_json(json!({
        "tid": "mam123",
        "allowLocalhost": true,
        "hashRouting": false
    }))?
    .with_initial_shared_custom_props(SharedCustomProps::from_json_object(props(json!({
        "_global": {"app_version": "1.4.0"}
    }))));

    let loader = RecordingScriptLoader::new();
    let server = MetricalpProvider::with_handle(
        config.clone(),
        Metricalp::new(StaticSurface::Server),
        Arc::new(loader.clone()),
    );
    let page = server.mount("<main>hello</main>");
    println!("{}\n{page}", loader.render_tags());

    let browser = Metricalp::new(StaticSurface::Browser);
    let client = MetricalpProvider::with_handle(config, browser.clone(), Arc::new(loader));
    client.mount(());

    let emit = browser.emitter();
    emit.emit(MetricalpEvent::new(METRICALP_SCREEN_VIEW_EV).with("path", "/"));
    emit.emit(MetricalpEvent::new("click_buy").with("price", 12));
    browser.update_shared_custom_props_for_type("click_buy", props(json!({"plan": "pro"})));

    for event in browser.queued_events() {
        println!("queued: {}", serde_json::to_string(&event)?);
    }
    if let Some(shared) = browser.shared_custom_props() {
        println!("shared custom props: {}", shared.to_json());
    }
    Ok(())
}
