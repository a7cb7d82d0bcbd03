//! Orbit camera around the tree.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3};

/// Vertical field of view in degrees.
pub const FOV_Y_DEGREES: f32 = 75.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 1000.0;

/// Closest and farthest orbit distance.
pub const ZOOM_RANGE: (f32, f32) = (3.0, 20.0);

/// Largest angle between the view direction and straight down from above.
pub const MAX_POLAR_ANGLE: f32 = std::f32::consts::PI / 1.5;

/// Fraction of orbit velocity lost per update.
const DAMPING: f32 = 0.05;

/// Orbit camera with damped rotation.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Elevation above the target's horizontal plane in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
    yaw_velocity: f32,
    pitch_velocity: f32,
}

impl Camera {
    /// Camera at `eye` looking at `target`.
    pub fn looking_at(eye: Vec3, target: Vec3) -> Self {
        let offset = eye - target;
        let distance = offset.length().max(f32::EPSILON);
        let mut camera = Self {
            yaw: offset.x.atan2(offset.z),
            pitch: (offset.y / distance).clamp(-1.0, 1.0).asin(),
            distance,
            target,
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
        };
        camera.clamp();
        camera
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Calculate the view matrix for rendering.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect, Z_NEAR, Z_FAR)
    }

    /// Queue a drag. The motion plays out over the next updates.
    pub fn orbit(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw_velocity += d_yaw;
        self.pitch_velocity += d_pitch;
    }

    /// Move closer (positive) or farther (negative).
    pub fn zoom(&mut self, amount: f32) {
        self.distance -= amount;
        self.clamp();
    }

    /// Apply and decay queued rotation.
    pub fn update(&mut self) {
        self.yaw += self.yaw_velocity * DAMPING;
        self.pitch += self.pitch_velocity * DAMPING;
        self.yaw_velocity *= 1.0 - DAMPING;
        self.pitch_velocity *= 1.0 - DAMPING;
        self.clamp();
    }

    /// Angle from straight above the target to the camera.
    pub fn polar_angle(&self) -> f32 {
        FRAC_PI_2 - self.pitch
    }

    fn clamp(&mut self) {
        let min_pitch = FRAC_PI_2 - MAX_POLAR_ANGLE;
        let max_pitch = FRAC_PI_2 - 1e-3;
        self.pitch = self.pitch.clamp(min_pitch, max_pitch);
        self.distance = self.distance.clamp(ZOOM_RANGE.0, ZOOM_RANGE.1);
    }
}

impl Default for Camera {
    /// Looking at the middle of the tree from the front right.
    fn default() -> Self {
        Self::looking_at(Vec3::new(4.0, 3.0, 3.0), Vec3::new(0.0, 2.5, 0.0))
    }
}
