//! Bevy application setup

use bevy::asset::io::memory::{Dir, MemoryAssetReader};
use bevy::asset::io::AssetSource;
use bevy::prelude::*;
use bevy::winit::WinitSettings;
use bevy_egui::EguiPlugin;
use bevy_picking::{prelude::MeshPickingPlugin, DefaultPickingPlugins};
use gearview_core::{CommandDispatcher, LatestRequest, PartCatalog};

use crate::camera::CameraPlugin;
use crate::config::ViewerConfig;
use crate::models::{GeneratedModels, ModelsPlugin, GENERATED_SOURCE};
use crate::network::NetworkPlugin;
use crate::scene::ScenePlugin;
use crate::speech::SpeechPlugin;
use crate::ui::UiPlugin;

/// Part catalog and the keyword dispatcher built from it
#[derive(Resource, Debug, Clone)]
pub struct Catalog {
    pub parts: PartCatalog,
    pub dispatcher: CommandDispatcher,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(PartCatalog::default())
    }
}

impl Catalog {
    pub fn new(parts: PartCatalog) -> Self {
        let dispatcher = CommandDispatcher::from_catalog(&parts);
        Self { parts, dispatcher }
    }
}

/// The single model request that is allowed to reach the scene
#[derive(Resource, Debug, Default)]
pub struct ActiveRequest(pub LatestRequest);

/// Messages waiting to be shown to the user, oldest first
#[derive(Resource, Debug, Default)]
pub struct Alerts {
    pub queue: Vec<String>,
}

impl Alerts {
    pub fn push(&mut self, message: impl Into<String>) {
        self.queue.push(message.into());
    }
}

/// Run the Bevy application
pub fn run(config: ViewerConfig) {
    let generated = GeneratedModels::default();
    let generated_dir: Dir = generated.dir.clone();

    App::new()
        .insert_resource(ClearColor(Color::srgb(0.94, 0.94, 0.94)))
        .insert_resource(WinitSettings::default())
        // In-memory source for GLB payloads received from the backend;
        // must be registered before AssetPlugin is built
        .register_asset_source(
            GENERATED_SOURCE,
            AssetSource::build().with_reader(move || {
                Box::new(MemoryAssetReader {
                    root: generated_dir.clone(),
                })
            }),
        )
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Gearview".to_string(),
                    canvas: Some("#viewer-canvas".to_string()),
                    fit_canvas_to_parent: true,
                    prevent_default_event_handling: false,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                // Static models are served next to the page
                file_path: "".to_string(),
                // Don't look for .meta files - server doesn't have them
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // Picking must be added before EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .insert_resource(config)
        .insert_resource(generated)
        .init_resource::<Catalog>()
        .init_resource::<ActiveRequest>()
        .init_resource::<Alerts>()
        .add_plugins(ScenePlugin)
        .add_plugins(CameraPlugin)
        .add_plugins(ModelsPlugin)
        .add_plugins(NetworkPlugin)
        .add_plugins(SpeechPlugin)
        .add_plugins(UiPlugin)
        .run();
}
