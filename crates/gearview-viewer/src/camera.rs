//! Orbit camera, auto-framing and view reset

use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use gearview_core::{CameraFrame, CameraHome, Orbit};

/// Closest the orbit camera gets to its target
pub const MIN_DISTANCE: f32 = 0.5;

/// Zoom-out limit before any model has been framed
pub const MAX_DISTANCE: f32 = 900.0;

/// How far past a framed view the user may zoom out
const ZOOM_OUT_RATIO: f32 = 2.0;

/// Far clip plane never drops below this
pub const MIN_FAR_PLANE: f32 = 1000.0;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OrbitController>()
            .init_resource::<HomeView>()
            .add_message::<CameraInitialReady>()
            .add_message::<ResetCamera>()
            .add_systems(Update, (
                record_initial_frame,
                reset_camera,
                update_camera,
            ).chain());
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Sent once, when the first model load has framed the camera
#[derive(Message, Debug, Clone)]
pub struct CameraInitialReady {
    pub initial_position: Vec3,
    pub initial_target: Vec3,
}

/// Request to return to the first framed view
#[derive(Message, Debug, Clone, Default)]
pub struct ResetCamera;

/// Orbit controller state
#[derive(Debug, Clone, Resource)]
pub struct OrbitController {
    /// Orbit currently rendered
    pub orbit: Orbit,
    /// Orbit being approached (zoom and pan are damped)
    pub goal: Orbit,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub damping: f32,
    /// Zoom-out limit, follows the size of the framed model
    pub max_distance: f32,
}

impl Default for OrbitController {
    fn default() -> Self {
        let orbit = Orbit {
            distance: 8.66,
            ..default()
        };
        Self {
            orbit,
            goal: orbit,
            sensitivity: 0.005,
            zoom_speed: 0.1,
            damping: 0.05,
            max_distance: MAX_DISTANCE,
        }
    }
}

impl OrbitController {
    /// Jump to a computed frame without damping
    ///
    /// The frame's distance is kept as computed; only degenerate frames are
    /// pushed out to [`MIN_DISTANCE`].
    pub fn apply_frame(&mut self, frame: CameraFrame) {
        let mut orbit = Orbit::from_frame(frame, &self.orbit);
        orbit.distance = orbit.distance.max(MIN_DISTANCE);
        self.max_distance = MAX_DISTANCE.max(orbit.distance * ZOOM_OUT_RATIO);
        self.orbit = orbit;
        self.goal = orbit;
    }

    /// Far clip plane that keeps the model visible at any allowed zoom
    pub fn far_plane(&self) -> f32 {
        MIN_FAR_PLANE.max(self.max_distance * 2.0)
    }

    fn zoom_to(&mut self, distance: f32) {
        self.goal.distance = distance.clamp(MIN_DISTANCE, self.max_distance);
    }
}

/// The frame restored by [`ResetCamera`]
#[derive(Debug, Clone, Resource, Default)]
pub struct HomeView(pub CameraHome);

fn record_initial_frame(
    mut ready_events: MessageReader<CameraInitialReady>,
    mut home: ResMut<HomeView>,
) {
    for event in ready_events.read() {
        let frame = CameraFrame {
            position: event.initial_position,
            target: event.initial_target,
        };
        if home.0.record(frame) {
            tracing::info!(
                "Initial camera frame: position {:?}, target {:?}",
                frame.position,
                frame.target
            );
        }
    }
}

fn reset_camera(
    mut reset_events: MessageReader<ResetCamera>,
    home: Res<HomeView>,
    mut controller: ResMut<OrbitController>,
) {
    if reset_events.read().count() == 0 {
        return;
    }
    match home.0.home() {
        Some(frame) => controller.apply_frame(frame),
        None => tracing::debug!("Reset requested before any model was framed"),
    }
}

/// Orbit with left drag, pan with right drag, zoom with the wheel or a pinch
fn update_camera(
    mut camera_query: Query<(&mut Transform, &mut Projection), With<MainCamera>>,
    mut controller: ResMut<OrbitController>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    time: Res<Time>,
    mut contexts: bevy_egui::EguiContexts,
) {
    // Don't steal input from the UI panels
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);

    let mut total_motion = Vec2::ZERO;
    for motion in mouse_motion.read() {
        total_motion += motion.delta;
    }

    let sensitivity = controller.sensitivity;

    if mouse_button.pressed(MouseButton::Left) && !egui_wants_pointer {
        let goal = &mut controller.goal;
        goal.azimuth += total_motion.x * sensitivity;
        goal.elevation = (goal.elevation + total_motion.y * sensitivity)
            .clamp(-Orbit::MAX_ELEVATION, Orbit::MAX_ELEVATION);
        // Rotation is not damped
        controller.orbit.azimuth = controller.goal.azimuth;
        controller.orbit.elevation = controller.goal.elevation;
    }

    if mouse_button.pressed(MouseButton::Right) && !egui_wants_pointer {
        // Pan in the camera's screen plane
        let azimuth = controller.orbit.azimuth;
        let elevation = controller.orbit.elevation;
        let right = Vec3::new(-azimuth.sin(), 0.0, azimuth.cos());
        let forward = -Vec3::new(
            elevation.cos() * azimuth.cos(),
            elevation.sin(),
            elevation.cos() * azimuth.sin(),
        );
        let up = right.cross(forward).normalize_or_zero();
        let pan_speed = controller.orbit.distance * 0.002;
        controller.goal.target += (-right * total_motion.x + up * total_motion.y) * pan_speed;
    }

    if !egui_wants_pointer {
        for scroll in mouse_wheel.read() {
            let zoom_factor = 1.0 - scroll.y * controller.zoom_speed * 0.3;
            let distance = controller.goal.distance * zoom_factor;
            controller.zoom_to(distance);
        }
    } else {
        // Drain the scroll events even if we're not using them
        for _ in mouse_wheel.read() {}
    }

    if touch_input.iter().count() == 1 && !egui_wants_pointer {
        for touch in touch_input.iter() {
            let delta = touch.delta();
            if delta != Vec2::ZERO {
                controller.goal.azimuth += delta.x * sensitivity;
                controller.goal.elevation = (controller.goal.elevation + delta.y * sensitivity)
                    .clamp(-Orbit::MAX_ELEVATION, Orbit::MAX_ELEVATION);
                controller.orbit.azimuth = controller.goal.azimuth;
                controller.orbit.elevation = controller.goal.elevation;
            }
        }
    }

    // Pinch to zoom
    if touch_input.iter().count() == 2 {
        let touches: Vec<_> = touch_input.iter().collect();
        if let (Some(t1), Some(t2)) = (touches.first(), touches.get(1)) {
            let curr_dist = t1.position().distance(t2.position());
            let prev_dist = (t1.position() - t1.delta()).distance(t2.position() - t2.delta());
            let zoom_factor = prev_dist / curr_dist.max(1.0);
            let distance = controller.goal.distance * zoom_factor;
            controller.zoom_to(distance);
        }
    }

    let lerp_factor = damping_factor(controller.damping, time.delta_secs());
    let goal = controller.goal;
    let orbit = &mut controller.orbit;
    orbit.distance += (goal.distance - orbit.distance) * lerp_factor;
    orbit.target += (goal.target - orbit.target) * lerp_factor;

    let Ok((mut transform, mut projection)) = camera_query.single_mut() else { return };
    transform.translation = controller.orbit.position();
    transform.look_at(controller.orbit.target, Vec3::Y);

    let far = controller.far_plane();
    if matches!(&*projection, Projection::Perspective(p) if p.far != far) {
        if let Projection::Perspective(perspective) = projection.as_mut() {
            perspective.far = far;
        }
    }
}

/// Frame-rate independent interpolation factor for a per-frame damping at 60 fps
fn damping_factor(damping: f32, dt: f32) -> f32 {
    1.0 - (-damping * 60.0 * dt).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gearview_core::{frame_bounds, BoundingBox};

    #[test]
    fn test_apply_frame_snaps_and_clamps() {
        let mut controller = OrbitController::default();
        controller.apply_frame(CameraFrame {
            position: Vec3::new(30.0, 7.5, 30.0),
            target: Vec3::ZERO,
        });
        assert_eq!(controller.orbit, controller.goal);
        assert!(controller.orbit.position().distance(Vec3::new(30.0, 7.5, 30.0)) < 1e-3);

        // A zero-size model still yields a usable distance
        controller.apply_frame(CameraFrame {
            position: Vec3::ONE,
            target: Vec3::ONE,
        });
        assert_eq!(controller.orbit.distance, MIN_DISTANCE);
    }

    #[test]
    fn test_large_part_keeps_computed_frame() {
        // 200 teeth at module 3: about 606 x 606 x 5
        let bounds = BoundingBox::new(Vec3::new(-303.0, -303.0, -2.5), Vec3::new(303.0, 303.0, 2.5));
        let frame = frame_bounds(&bounds, 75.0_f32.to_radians());
        assert!(frame.distance() > MAX_DISTANCE);

        let mut controller = OrbitController::default();
        controller.apply_frame(frame);
        assert!(controller.orbit.position().distance(frame.position) < 1e-2 * frame.distance());
        assert!(controller.max_distance >= controller.orbit.distance);

        // Whole part inside the far plane, even zoomed all the way out
        let radius = bounds.size().length() / 2.0;
        assert!(controller.far_plane() >= controller.max_distance + radius);

        // Zooming cannot push past the new limit
        controller.zoom_to(f32::MAX);
        assert_eq!(controller.goal.distance, controller.max_distance);
    }

    #[test]
    fn test_reset_restores_large_frame() {
        let bounds = BoundingBox::new(Vec3::splat(-400.0), Vec3::splat(400.0));
        let frame = frame_bounds(&bounds, 75.0_f32.to_radians());

        let mut home = HomeView::default();
        home.0.record(frame);
        let mut controller = OrbitController::default();
        controller.apply_frame(CameraFrame {
            position: Vec3::new(3.0, 1.0, 3.0),
            target: Vec3::ZERO,
        });
        if let Some(home_frame) = home.0.home() {
            controller.apply_frame(home_frame);
        }
        assert!(controller.orbit.position().distance(frame.position) < 1e-2 * frame.distance());
    }

    #[test]
    fn test_damping_factor_bounds() {
        assert_eq!(damping_factor(0.05, 0.0), 0.0);
        let one_frame = damping_factor(0.05, 1.0 / 60.0);
        assert!(one_frame > 0.0 && one_frame < 0.1);
        assert!(damping_factor(0.05, 10.0) > 0.99);
    }

    #[test]
    fn test_reset_restores_first_frame() {
        let mut app = App::new();
        app.init_resource::<OrbitController>()
            .init_resource::<HomeView>()
            .add_message::<CameraInitialReady>()
            .add_message::<ResetCamera>()
            .add_systems(Update, (record_initial_frame, reset_camera).chain());

        let first = CameraFrame {
            position: Vec3::new(20.0, 5.0, 20.0),
            target: Vec3::ZERO,
        };
        app.world_mut().write_message(CameraInitialReady {
            initial_position: first.position,
            initial_target: first.target,
        });
        app.update();

        // Later loads move the camera elsewhere
        for i in 1..4 {
            let frame = CameraFrame {
                position: Vec3::splat(100.0 * i as f32),
                target: Vec3::splat(i as f32),
            };
            app.world_mut().resource_mut::<OrbitController>().apply_frame(frame);
            app.world_mut().write_message(CameraInitialReady {
                initial_position: frame.position,
                initial_target: frame.target,
            });
            app.update();
        }

        app.world_mut().write_message(ResetCamera);
        app.update();
        let after_first_reset = app.world().resource::<OrbitController>().orbit;
        assert_eq!(after_first_reset.target, first.target);
        assert!(after_first_reset.position().distance(first.position) < 1e-3);

        app.world_mut().write_message(ResetCamera);
        app.update();
        assert_eq!(app.world().resource::<OrbitController>().orbit, after_first_reset);
    }
}
