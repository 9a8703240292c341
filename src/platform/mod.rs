pub mod environment;

pub use environment::{
    is_browser, metricalp_defaults, DetectedSurface, DynRenderingSurface, RenderingSurface,
    StaticSurface,
};
