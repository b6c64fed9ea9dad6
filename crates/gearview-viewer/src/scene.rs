//! Scene setup and the lifecycle of model nodes

use bevy::prelude::*;
use gearview_core::{SceneRegistry, SceneTag};

use crate::camera::{MainCamera, MIN_FAR_PLANE};

/// Axis length relative to the model's largest dimension
pub const AXIS_LENGTH_RATIO: f32 = 1.2;

/// Light position relative to the camera
const LIGHT_OFFSET: Vec3 = Vec3::new(1.0, 1.0, 1.0);

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneNodes>()
            .add_systems(Startup, setup_scene)
            .add_systems(PostUpdate, follow_camera_with_light);
    }
}

/// Root of a loaded CAD model
#[derive(Component)]
pub struct CadPart {
    pub part_type: Option<String>,
}

/// One of the six axis segments drawn around the model
#[derive(Component)]
pub struct CoordinateAxis;

/// Directional light that stays at a fixed offset from the camera
#[derive(Component)]
pub struct CameraLight;

/// Entities owned by the current model
#[derive(Resource, Default)]
pub struct SceneNodes(pub SceneRegistry<Entity>);

impl SceneNodes {
    /// Despawn every registered model and axis entity
    ///
    /// Lights, the camera and anything else that was never registered stay.
    pub fn clear(&mut self, commands: &mut Commands) {
        let nodes = self.0.clear();
        if !nodes.is_empty() {
            tracing::debug!("Clearing {} model nodes", nodes.len());
        }
        for entity in nodes {
            // Despawn is recursive, so GLTF children go with their root
            if let Ok(mut entity_commands) = commands.get_entity(entity) {
                entity_commands.despawn();
            }
        }
    }
}

fn setup_scene(mut commands: Commands) {
    // Y is up, matching glTF
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: 75.0_f32.to_radians(),
            near: 0.1,
            far: MIN_FAR_PLANE,
            ..default()
        }),
        Transform::from_xyz(5.0, 5.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
        MainCamera,
    ));

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 400.0,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: 4000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_translation(Vec3::new(5.0, 5.0, 5.0) + LIGHT_OFFSET)
            .looking_at(Vec3::ZERO, Vec3::Y),
        CameraLight,
    ));
}

/// Keep the camera light next to the camera, pointing at the orbit target
fn follow_camera_with_light(
    camera_query: Query<&Transform, (With<MainCamera>, Without<CameraLight>)>,
    mut light_query: Query<&mut Transform, With<CameraLight>>,
    orbit: Res<crate::camera::OrbitController>,
) {
    let Ok(camera) = camera_query.single() else { return };
    for mut transform in &mut light_query {
        *transform = Transform::from_translation(camera.translation + LIGHT_OFFSET)
            .looking_at(orbit.orbit.target, Vec3::Y);
    }
}

/// Segments of the six half axes as (direction, colour)
fn axis_segments() -> [(Vec3, Color); 6] {
    [
        (Vec3::X, Color::srgb_u8(0xff, 0x00, 0x00)),
        (Vec3::NEG_X, Color::srgb_u8(0xff, 0x44, 0x44)),
        (Vec3::Y, Color::srgb_u8(0x00, 0xff, 0x00)),
        (Vec3::NEG_Y, Color::srgb_u8(0x44, 0xff, 0x44)),
        (Vec3::Z, Color::srgb_u8(0x00, 0x00, 0xff)),
        (Vec3::NEG_Z, Color::srgb_u8(0x44, 0x44, 0xff)),
    ]
}

/// Spawn the six axis segments through the origin, each `1.2 * max_dim` long
pub fn spawn_axes(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    nodes: &mut SceneNodes,
    max_dim: f32,
) {
    let length = (max_dim * AXIS_LENGTH_RATIO).max(f32::EPSILON);
    let thickness = (length * 0.004).max(0.01);
    // Cylinder is Y-aligned by default
    let mesh = meshes.add(Cylinder::new(thickness, length));

    for (direction, color) in axis_segments() {
        let material = materials.add(StandardMaterial {
            base_color: color,
            unlit: true,
            ..default()
        });
        let rotation = Quat::from_rotation_arc(Vec3::Y, direction);
        let entity = commands
            .spawn((
                Mesh3d(mesh.clone()),
                MeshMaterial3d(material),
                Transform::from_translation(direction * length / 2.0).with_rotation(rotation),
                CoordinateAxis,
            ))
            .id();
        nodes.0.register(entity, SceneTag::CoordinateAxis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_segments_cover_both_directions() {
        let segments = axis_segments();
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            assert!(segments.iter().any(|(d, _)| *d == axis));
            assert!(segments.iter().any(|(d, _)| *d == -axis));
        }
    }

    #[test]
    fn test_clear_despawns_only_registered() {
        let mut app = App::new();
        app.init_resource::<SceneNodes>();

        let light = app.world_mut().spawn(CameraLight).id();
        let part = app.world_mut().spawn(CadPart { part_type: None }).id();
        let child = app.world_mut().spawn_empty().id();
        app.world_mut().entity_mut(part).add_child(child);
        let axis = app.world_mut().spawn(CoordinateAxis).id();
        {
            let mut nodes = app.world_mut().resource_mut::<SceneNodes>();
            nodes.0.begin_generation();
            nodes.0.register(part, SceneTag::CadPart);
            nodes.0.register(axis, SceneTag::CoordinateAxis);
        }

        app.add_systems(Update, |mut commands: Commands, mut nodes: ResMut<SceneNodes>| {
            nodes.clear(&mut commands);
        });
        app.update();

        let world = app.world();
        assert!(world.get_entity(light).is_ok());
        assert!(world.get_entity(part).is_err());
        assert!(world.get_entity(child).is_err());
        assert!(world.get_entity(axis).is_err());
        assert!(world.resource::<SceneNodes>().0.is_empty());
    }
}
