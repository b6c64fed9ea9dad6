//! Model loading pipeline
//!
//! Static models are fetched from their catalog path; generated models are
//! written into an in-memory asset source and loaded from there. Either way the
//! new model only replaces the old one once its GLB has parsed, so a failed load
//! leaves the scene as it was.

use std::path::{Path, PathBuf};

use bevy::asset::io::memory::Dir;
use bevy::asset::{LoadState, RecursiveDependencyLoadState};
use bevy::prelude::*;
use gearview_core::{frame_bounds, BoundingBox, ParamSet, RequestTicket, SceneTag};

use crate::app::{ActiveRequest, Alerts, Catalog};
use crate::camera::{CameraInitialReady, MainCamera, OrbitController};
use crate::scene::{spawn_axes, CadPart, SceneNodes};

/// Asset source name for models received from the backend
pub const GENERATED_SOURCE: &str = "generated";

/// Frames to wait for a spawned model's meshes before giving up on framing
const MAX_FRAMING_WAIT: u32 = 120;

/// Field of view used when the camera is not perspective
const FALLBACK_FOV: f32 = 75.0 * std::f32::consts::PI / 180.0;

pub struct ModelsPlugin;

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingModel>()
            .add_message::<LoadModel>()
            .add_message::<ModelLoadedWithParams>()
            .add_message::<ModelLoadError>()
            .add_systems(Update, (
                start_model_loads,
                poll_model_load,
                finish_model_load,
                frame_new_parts,
            ).chain());
    }
}

/// Where a model's GLB comes from
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Path served next to the viewer (e.g., "models/spur_gear.glb")
    Static(String),
    /// GLB bytes returned by the backend
    Bytes(Vec<u8>),
}

/// Request to replace the current model
#[derive(Message, Debug, Clone)]
pub struct LoadModel {
    pub ticket: RequestTicket,
    pub source: ModelSource,
    pub part_type: Option<String>,
    pub params: Option<ParamSet>,
}

/// A model with a known part type is now in the scene
#[derive(Message, Debug, Clone)]
pub struct ModelLoadedWithParams {
    pub part_type: String,
    pub params: ParamSet,
}

/// A model could not be loaded; the scene was left unchanged
#[derive(Message, Debug, Clone)]
pub struct ModelLoadError {
    pub model_type: String,
    pub error: String,
}

/// In-memory directory backing the `generated://` asset source
#[derive(Resource, Default)]
pub struct GeneratedModels {
    pub dir: Dir,
    next_id: u64,
}

impl GeneratedModels {
    /// Store GLB bytes and return the asset path to load them from
    pub fn store(&mut self, bytes: Vec<u8>) -> (PathBuf, String) {
        self.next_id += 1;
        let path = PathBuf::from(format!("model-{}.glb", self.next_id));
        self.dir.insert_asset(&path, bytes);
        let asset_path = format!("{}://{}", GENERATED_SOURCE, path.display());
        (path, asset_path)
    }

    /// Drop stored bytes once the asset server is done with them
    pub fn release(&mut self, path: &Path) {
        self.dir.remove_asset(path);
    }
}

/// The one model currently being parsed
#[derive(Debug)]
struct InFlightModel {
    ticket: RequestTicket,
    handle: Handle<Gltf>,
    /// Name used in logs and errors
    label: String,
    part_type: Option<String>,
    params: Option<ParamSet>,
    memory_path: Option<PathBuf>,
    /// Set once the GLB has parsed or failed
    outcome: Option<Result<Handle<Scene>, String>>,
}

#[derive(Resource, Default)]
pub struct PendingModel {
    slot: Option<InFlightModel>,
}

/// Spawned model whose camera frame has not been computed yet
#[derive(Component)]
pub struct FramingPending {
    frames_waited: u32,
}

/// Queue a static model by part type
///
/// Unknown part types are logged and ignored.
pub fn load_model_by_type(
    part_type: &str,
    catalog: &Catalog,
    active: &mut ActiveRequest,
    load_events: &mut MessageWriter<LoadModel>,
) {
    let Some(path) = catalog.parts.model_path(part_type) else {
        tracing::warn!("Unknown model type: {}", part_type);
        return;
    };
    let ticket = active.0.issue();
    tracing::info!("Loading static model {} from {}", part_type, path);
    load_events.write(LoadModel {
        ticket,
        source: ModelSource::Static(path.to_string()),
        part_type: Some(part_type.to_string()),
        params: None,
    });
}

fn start_model_loads(
    mut load_events: MessageReader<LoadModel>,
    mut pending: ResMut<PendingModel>,
    mut generated: ResMut<GeneratedModels>,
    active: Res<ActiveRequest>,
    asset_server: Res<AssetServer>,
) {
    for event in load_events.read() {
        if !active.0.is_current(event.ticket) {
            tracing::debug!("Skipping superseded model load {:?}", event.ticket);
            continue;
        }

        let (label, asset_path, memory_path) = match &event.source {
            ModelSource::Static(path) => (path.clone(), path.clone(), None),
            ModelSource::Bytes(bytes) => {
                let (path, asset_path) = generated.store(bytes.clone());
                let label = event
                    .part_type
                    .clone()
                    .unwrap_or_else(|| "generated model".to_string());
                (label, asset_path, Some(path))
            }
        };

        tracing::info!("Starting to load model: {}", asset_path);
        let handle: Handle<Gltf> = asset_server.load(asset_path);

        // Only the newest load is kept
        if let Some(previous) = pending.slot.take() {
            tracing::debug!("Dropping in-flight load of {}", previous.label);
            if let Some(path) = previous.memory_path {
                generated.release(&path);
            }
        }

        pending.slot = Some(InFlightModel {
            ticket: event.ticket,
            handle,
            label,
            part_type: event.part_type.clone(),
            params: event.params.clone(),
            memory_path,
            outcome: None,
        });
    }
}

/// Outcome of polling the in-flight GLB
enum LoadOutcome {
    Waiting,
    Ready(Handle<Scene>),
    Failed(String),
}

fn poll_gltf(
    handle: &Handle<Gltf>,
    asset_server: &AssetServer,
    gltf_assets: &Assets<Gltf>,
) -> LoadOutcome {
    if let Some(LoadState::Failed(err)) = asset_server.get_load_state(handle.id()) {
        return LoadOutcome::Failed(err.to_string());
    }
    if let Some(RecursiveDependencyLoadState::Failed(err)) =
        asset_server.get_recursive_dependency_load_state(handle.id())
    {
        return LoadOutcome::Failed(err.to_string());
    }
    if !asset_server.is_loaded_with_dependencies(handle.id()) {
        return LoadOutcome::Waiting;
    }

    let Some(gltf) = gltf_assets.get(handle) else {
        return LoadOutcome::Waiting;
    };
    // Use first scene if no default
    match gltf.default_scene.clone().or_else(|| gltf.scenes.first().cloned()) {
        Some(scene) => LoadOutcome::Ready(scene),
        None => LoadOutcome::Failed("GLB contains no scene".to_string()),
    }
}

/// Record the outcome of the in-flight GLB once the asset server has one
fn poll_model_load(
    mut pending: ResMut<PendingModel>,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
) {
    let Some(model) = pending.slot.as_mut() else { return };
    if model.outcome.is_some() {
        return;
    }
    match poll_gltf(&model.handle, &asset_server, &gltf_assets) {
        LoadOutcome::Waiting => {}
        LoadOutcome::Ready(scene) => model.outcome = Some(Ok(scene)),
        LoadOutcome::Failed(error) => model.outcome = Some(Err(error)),
    }
}

/// Swap the finished model into the scene, or report why it failed
#[allow(clippy::too_many_arguments)]
fn finish_model_load(
    mut commands: Commands,
    mut pending: ResMut<PendingModel>,
    mut generated: ResMut<GeneratedModels>,
    mut active: ResMut<ActiveRequest>,
    mut nodes: ResMut<SceneNodes>,
    mut alerts: ResMut<Alerts>,
    catalog: Res<Catalog>,
    mut loaded_events: MessageWriter<ModelLoadedWithParams>,
    mut error_events: MessageWriter<ModelLoadError>,
) {
    let Some(mut model) = pending.slot.take_if(|model| model.outcome.is_some()) else {
        return;
    };
    let Some(outcome) = model.outcome.take() else { return };
    if let Some(path) = &model.memory_path {
        generated.release(path);
    }

    if !active.0.complete(model.ticket) {
        tracing::info!("Discarding stale model {} ({:?})", model.label, model.ticket);
        return;
    }

    let scene = match outcome {
        Ok(scene) => scene,
        Err(error) => {
            tracing::error!("Failed to load model {}: {}", model.label, error);
            let model_type = model.part_type.unwrap_or(model.label);
            alerts.push(format!("Failed to load {}: {}", model_type, error));
            error_events.write(ModelLoadError { model_type, error });
            return;
        }
    };

    // Replace the previous model only now that the new one is ready
    nodes.clear(&mut commands);
    nodes.0.begin_generation();
    let entity = commands
        .spawn((
            SceneRoot(scene),
            Transform::default(),
            CadPart {
                part_type: model.part_type.clone(),
            },
            FramingPending { frames_waited: 0 },
        ))
        .id();
    nodes.0.register(entity, SceneTag::CadPart);
    tracing::info!("Model loaded: {}", model.label);

    if let Some(part_type) = model.part_type {
        if let Some(entry) = catalog.parts.get(&part_type) {
            loaded_events.write(ModelLoadedWithParams {
                params: model.params.unwrap_or_else(|| entry.default_params()),
                part_type,
            });
        }
    }
}

/// World-space bounds of every mesh under `entity`
fn collect_bounds(
    entity: Entity,
    children_query: &Query<&Children>,
    mesh_query: &Query<(&Mesh3d, &GlobalTransform)>,
    mesh_assets: &Assets<Mesh>,
    bounds: &mut BoundingBox,
) {
    if let Ok((mesh_handle, global_transform)) = mesh_query.get(entity) {
        let positions = mesh_assets
            .get(&mesh_handle.0)
            .and_then(|mesh| mesh.attribute(Mesh::ATTRIBUTE_POSITION))
            .and_then(|values| values.as_float3());
        if let Some(positions) = positions {
            for &position in positions {
                bounds.include_point(global_transform.transform_point(Vec3::from(position)));
            }
        }
    }

    if let Ok(children) = children_query.get(entity) {
        let children: &[Entity] = children;
        for &child in children {
            collect_bounds(child, children_query, mesh_query, mesh_assets, bounds);
        }
    }
}

/// Frame the camera on a freshly spawned model and draw its axes
#[allow(clippy::too_many_arguments)]
fn frame_new_parts(
    mut commands: Commands,
    mut pending_parts: Query<(Entity, &mut FramingPending), With<CadPart>>,
    children_query: Query<&Children>,
    mesh_query: Query<(&Mesh3d, &GlobalTransform)>,
    projection_query: Query<&Projection, With<MainCamera>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut nodes: ResMut<SceneNodes>,
    mut controller: ResMut<OrbitController>,
    mut ready_events: MessageWriter<CameraInitialReady>,
    mut announced: Local<bool>,
) {
    for (entity, mut framing) in &mut pending_parts {
        let mut bounds = BoundingBox::empty();
        collect_bounds(entity, &children_query, &mesh_query, &meshes, &mut bounds);

        if bounds.is_empty() {
            framing.frames_waited += 1;
            if framing.frames_waited > MAX_FRAMING_WAIT {
                tracing::warn!("Model has no mesh geometry; camera not framed");
                commands.entity(entity).remove::<FramingPending>();
            }
            continue;
        }

        let fov = match projection_query.single() {
            Ok(Projection::Perspective(perspective)) => perspective.fov,
            _ => FALLBACK_FOV,
        };
        let frame = frame_bounds(&bounds, fov);
        tracing::info!(
            "Framing model: size {:?}, camera {:?} -> {:?}",
            bounds.size(),
            frame.position,
            frame.target
        );
        controller.apply_frame(frame);
        spawn_axes(&mut commands, &mut meshes, &mut materials, &mut nodes, bounds.max_dimension());

        if !*announced {
            *announced = true;
            ready_events.write(CameraInitialReady {
                initial_position: frame.position,
                initial_target: frame.target,
            });
        }

        commands.entity(entity).remove::<FramingPending>();
    }
}
