//! Gearview Viewer - browser front end for generated CAD parts
//!
//! Turns a free-text or spoken command into a request to the model generation
//! backend, loads the returned GLB into a Bevy scene, frames it, and offers a
//! parameter panel for re-generating the part.

mod app;
mod camera;
mod config;
mod models;
mod network;
mod scene;
mod speech;
mod ui;

use wasm_bindgen::prelude::*;

use crate::config::ViewerConfig;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    let config = ViewerConfig::from_browser();

    // Initialize logging with filtering to reduce wgpu noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(config.log_level)
            .build()
    );

    app::run(config);
}
