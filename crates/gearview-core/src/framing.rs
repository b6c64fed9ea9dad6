//! Camera auto-framing
//!
//! Computes where the camera should sit so a freshly loaded part fits in view,
//! and remembers the first frame computed so the view can be reset later.

use glam::Vec3;

/// Margin applied on top of the exact fit distance
pub const FRAMING_MARGIN: f32 = 1.5;

/// Vertical offset of the camera, as a fraction of the framing distance
pub const ELEVATION_RATIO: f32 = 0.25;

/// Smallest field of view accepted by the framer (1 degree)
pub const MIN_FOV: f32 = std::f32::consts::PI / 180.0;

/// Largest field of view accepted by the framer (179 degrees)
pub const MAX_FOV: f32 = std::f32::consts::PI - MIN_FOV;

/// Axis-aligned bounding box in world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Create a box from two corners (order of the corners does not matter)
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// An empty box that any included point replaces
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    /// True until at least one point has been included
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to contain `point`
    pub fn include_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow the box to contain `other`
    pub fn include_box(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.include_point(other.min);
        self.include_point(other.max);
    }

    /// Build a box from a set of points; `None` when there are no points
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut bounds = Self::empty();
        for point in points {
            bounds.include_point(point);
        }
        (!bounds.is_empty()).then_some(bounds)
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        (self.min + self.max) * 0.5
    }

    /// Largest extent along any axis
    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    /// The eight corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }
}

/// Camera position and the point it looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub position: Vec3,
    pub target: Vec3,
}

impl CameraFrame {
    /// Distance between the camera and its target
    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }
}

/// Clamp a vertical field of view (radians) into the range the framer accepts
pub fn clamp_fov(fov: f32) -> f32 {
    if fov.is_nan() {
        return MIN_FOV;
    }
    fov.clamp(MIN_FOV, MAX_FOV)
}

/// Distance needed to fit an object of size `max_dim` in a vertical field of view `fov`
///
/// `distance = (max_dim / sin(fov / 2)) / 2 * 1.5`
pub fn framing_distance(max_dim: f32, fov: f32) -> f32 {
    let half_fov = clamp_fov(fov) / 2.0;
    (max_dim.abs() / half_fov.sin()) / 2.0 * FRAMING_MARGIN
}

/// Compute the camera frame for a bounding box
///
/// The camera is offset from the box center by `(d, d/4, d)` and looks at the center.
pub fn frame_bounds(bounds: &BoundingBox, fov: f32) -> CameraFrame {
    let center = bounds.center();
    let distance = framing_distance(bounds.max_dimension(), fov);
    CameraFrame {
        position: center + Vec3::new(distance, distance * ELEVATION_RATIO, distance),
        target: center,
    }
}

/// The first frame computed for the session, used by the reset action
#[derive(Debug, Clone, Default)]
pub struct CameraHome {
    initial: Option<CameraFrame>,
}

impl CameraHome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a computed frame
    ///
    /// Returns `true` only for the first frame, which becomes the home frame.
    /// Later frames are ignored.
    pub fn record(&mut self, frame: CameraFrame) -> bool {
        if self.initial.is_some() {
            return false;
        }
        self.initial = Some(frame);
        true
    }

    /// Frame to restore on reset, if any load has succeeded yet
    pub fn home(&self) -> Option<CameraFrame> {
        self.initial
    }

    pub fn is_ready(&self) -> bool {
        self.initial.is_some()
    }
}

/// Spherical camera state around a target, Y up
///
/// Angles are in radians. Azimuth is measured in the XZ plane from +X towards +Z,
/// elevation from the XZ plane towards +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbit {
    pub target: Vec3,
    pub distance: f32,
    pub azimuth: f32,
    pub elevation: f32,
}

impl Orbit {
    /// Elevation stays just short of the poles so the up vector stays defined
    pub const MAX_ELEVATION: f32 = 1.55;

    /// Orbit that places the camera at `frame.position` looking at `frame.target`
    ///
    /// A zero-length frame keeps the angles of `fallback`.
    pub fn from_frame(frame: CameraFrame, fallback: &Orbit) -> Self {
        let offset = frame.position - frame.target;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return Self {
                target: frame.target,
                distance: 0.0,
                azimuth: fallback.azimuth,
                elevation: fallback.elevation,
            };
        }

        Self {
            target: frame.target,
            distance,
            azimuth: offset.z.atan2(offset.x),
            elevation: (offset.y / distance)
                .clamp(-1.0, 1.0)
                .asin()
                .clamp(-Self::MAX_ELEVATION, Self::MAX_ELEVATION),
        }
    }

    /// Camera position for this orbit
    pub fn position(&self) -> Vec3 {
        let horizontal = self.distance * self.elevation.cos();
        self.target
            + Vec3::new(
                horizontal * self.azimuth.cos(),
                self.distance * self.elevation.sin(),
                horizontal * self.azimuth.sin(),
            )
    }
}

impl Default for Orbit {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 5.0,
            azimuth: std::f32::consts::FRAC_PI_4,
            elevation: 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOV_75: f32 = 75.0 * std::f32::consts::PI / 180.0;

    #[test]
    fn test_distance_positive_and_monotonic() {
        let mut previous = 0.0;
        for i in 1..200 {
            let max_dim = i as f32 * 0.37;
            let distance = framing_distance(max_dim, FOV_75);
            assert!(distance > 0.0);
            assert!(distance > previous, "distance must grow with max_dim");
            previous = distance;
        }
    }

    #[test]
    fn test_distance_formula() {
        let distance = framing_distance(10.0, FOV_75);
        let expected = (10.0 / (FOV_75 / 2.0).sin()) / 2.0 * 1.5;
        assert!((distance - expected).abs() < 1e-4);
    }

    #[test]
    fn test_frame_offsets() {
        let bounds = BoundingBox::new(Vec3::new(-1.0, 2.0, -3.0), Vec3::new(3.0, 4.0, 1.0));
        let frame = frame_bounds(&bounds, FOV_75);
        let d = framing_distance(4.0, FOV_75);

        assert_eq!(frame.target, Vec3::new(1.0, 3.0, -1.0));
        let offset = frame.position - frame.target;
        assert!((offset.x - d).abs() < 1e-4);
        assert!((offset.y - d / 4.0).abs() < 1e-4);
        assert!((offset.z - d).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_bounds() {
        let point = Vec3::new(2.0, 2.0, 2.0);
        let bounds = BoundingBox::new(point, point);
        let frame = frame_bounds(&bounds, FOV_75);
        assert_eq!(frame.target, point);
        assert_eq!(frame.position, point);
        assert!(frame.distance().is_finite());
    }

    #[test]
    fn test_fov_is_guarded() {
        for fov in [0.0, -1.0, f32::NAN, std::f32::consts::PI, 10.0] {
            let distance = framing_distance(1.0, fov);
            assert!(distance.is_finite(), "fov {fov} gave {distance}");
            assert!(distance > 0.0);
        }
    }

    #[test]
    fn test_bounding_box_from_points() {
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());

        let bounds = BoundingBox::from_points([
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-1.0, 4.0, 0.0),
        ])
        .unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 4.0, 0.5));
        assert_eq!(bounds.max_dimension(), 6.0);
        assert_eq!(bounds.corners().len(), 8);
    }

    #[test]
    fn test_home_keeps_first_frame() {
        let mut home = CameraHome::new();
        assert!(home.home().is_none());

        let first = CameraFrame {
            position: Vec3::new(5.0, 1.25, 5.0),
            target: Vec3::ZERO,
        };
        assert!(home.record(first));

        for i in 1..10 {
            let later = CameraFrame {
                position: Vec3::splat(i as f32 * 3.0),
                target: Vec3::splat(i as f32),
            };
            assert!(!home.record(later));
        }

        assert_eq!(home.home(), Some(first));
    }

    #[test]
    fn test_orbit_reproduces_frame() {
        let bounds = BoundingBox::new(Vec3::new(-10.0, -2.5, -10.0), Vec3::new(10.0, 2.5, 10.0));
        let frame = frame_bounds(&bounds, FOV_75);
        let orbit = Orbit::from_frame(frame, &Orbit::default());

        assert!((orbit.distance - frame.distance()).abs() < 1e-3);
        assert!(orbit.position().distance(frame.position) < 1e-3);
        assert_eq!(orbit.target, frame.target);
    }

    #[test]
    fn test_orbit_zero_length_frame_keeps_angles() {
        let fallback = Orbit::default();
        let frame = CameraFrame {
            position: Vec3::ONE,
            target: Vec3::ONE,
        };
        let orbit = Orbit::from_frame(frame, &fallback);
        assert_eq!(orbit.distance, 0.0);
        assert_eq!(orbit.azimuth, fallback.azimuth);
        assert_eq!(orbit.position(), Vec3::ONE);
    }
}
