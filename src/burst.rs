//! Burst field: a fixed cloud of sparks around the emblem.
//!
//! Particles start inside a small sphere at the emblem and carry an outward
//! velocity plus a random lifetime phase. The shader loops each particle
//! outward and back using that phase, so nothing here is ever spawned or
//! removed after construction; the field only needs its clock, color and
//! group rotation refreshed each frame.
//!
//! The field cannot exist without the emblem. [`BurstField::spawn`] returns
//! [`BurstStatus::Deferred`] until one is available.

use glam::Vec3;

use crate::buffer::ParticleBuffer;
use crate::emblem::Emblem;
use crate::graph::{NodeAllocator, NodeHandle, NodeKind, SceneGraph};
use crate::material::PointMaterial;
use crate::random::RandomSource;

/// Particles in the field.
pub const BURST_PARTICLE_COUNT: usize = 200;

/// Largest initial distance from the anchor.
pub const BURST_RADIUS: f32 = 0.1;

/// Outward speed range.
const SPEED_RANGE: (f32, f32) = (0.1, 0.4);

/// Result of trying to build the field.
#[derive(Debug)]
pub enum BurstStatus {
    /// Built and attached.
    Attached(BurstField),
    /// No emblem yet; try again once it loads.
    Deferred,
}

impl BurstStatus {
    pub fn is_deferred(&self) -> bool {
        matches!(self, BurstStatus::Deferred)
    }

    /// The attached field, or `None` while deferred.
    pub fn into_field(self) -> Option<BurstField> {
        match self {
            BurstStatus::Attached(field) => Some(field),
            BurstStatus::Deferred => None,
        }
    }
}

/// Sample the field's particles relative to its anchor.
pub fn generate_burst(count: usize, color: Vec3, rng: &mut dyn RandomSource) -> ParticleBuffer {
    let mut buffer = ParticleBuffer::with_motion(count);
    for _ in 0..count {
        let radius = rng.range(0.0, BURST_RADIUS);
        let direction = rng.unit_vector();
        let position = direction * radius;

        let speed = rng.range(SPEED_RANGE.0, SPEED_RANGE.1);
        let velocity = direction * speed;

        let phase = rng.next_f32();
        let scale = rng.range(0.7, 1.5);
        buffer.push_moving(position, scale, color, phase, velocity);
    }
    buffer
}

/// Sparks orbiting the emblem.
#[derive(Debug)]
pub struct BurstField {
    handle: NodeHandle,
    anchor: Vec3,
    buffer: ParticleBuffer,
    material: PointMaterial,
    rotation_y: f32,
}

impl BurstField {
    /// Build and attach the field around `emblem`, or defer if there is none.
    pub fn spawn(
        emblem: Option<&Emblem>,
        nodes: &mut NodeAllocator,
        rng: &mut dyn RandomSource,
        graph: &mut dyn SceneGraph,
    ) -> BurstStatus {
        let Some(emblem) = emblem else {
            return BurstStatus::Deferred;
        };

        let color = emblem.material().color;
        let buffer = generate_burst(BURST_PARTICLE_COUNT, color, rng);
        let handle = nodes.allocate();
        graph.attach(handle, NodeKind::BurstParticles);
        log::debug!("burst field {handle} anchored at {}", emblem.position());

        BurstStatus::Attached(Self {
            handle,
            anchor: emblem.position(),
            buffer,
            material: PointMaterial::glowing(0.04, color, 1.0, 0.7),
            rotation_y: 0.0,
        })
    }

    /// Per-frame update. The field counter-rotates at half the tree's rate.
    pub fn advance(&mut self, now: f32, color: Vec3, rotation_speed: f32) {
        self.material.time = now;
        self.material.color = color;
        self.rotation_y -= rotation_speed * 0.5;
    }

    pub fn detach(&self, graph: &mut dyn SceneGraph) {
        graph.detach(self.handle);
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    /// World position the field is centred on.
    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    /// Particle data relative to [`anchor`](Self::anchor).
    pub fn buffer(&self) -> &ParticleBuffer {
        &self.buffer
    }

    pub fn material(&self) -> &PointMaterial {
        &self.material
    }

    pub fn rotation(&self) -> f32 {
        self.rotation_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;

    #[test]
    fn test_positions_inside_small_sphere() {
        let buf = generate_burst(BURST_PARTICLE_COUNT, Vec3::ONE, &mut SeededRandom::new(1));
        assert_eq!(buf.len(), BURST_PARTICLE_COUNT);
        assert!(buf.is_consistent());
        for p in buf.positions() {
            assert!(p.length() <= BURST_RADIUS + 1e-6);
        }
    }

    #[test]
    fn test_velocity_points_outward() {
        let buf = generate_burst(500, Vec3::ONE, &mut SeededRandom::new(2));
        let velocities = buf.velocities().unwrap();
        for (p, v) in buf.positions().iter().zip(velocities) {
            let speed = v.length();
            assert!((0.1..0.4 + 1e-5).contains(&speed), "speed {speed}");
            if p.length() > 1e-4 {
                assert!(p.normalize().dot(v.normalize()) > 0.999);
            }
        }
    }

    #[test]
    fn test_lifetime_phase_in_unit_interval() {
        let buf = generate_burst(1000, Vec3::ONE, &mut SeededRandom::new(3));
        for l in buf.lifetimes().unwrap() {
            assert!((0.0..1.0).contains(l));
        }
    }

    #[test]
    fn test_polar_angle_is_uniform_on_sphere() {
        // cos(phi) of a uniform sphere sample is uniform on [-1, 1].
        const SAMPLES: usize = 10_000;
        const BINS: usize = 10;
        let buf = generate_burst(SAMPLES, Vec3::ONE, &mut SeededRandom::new(4));

        let mut counts = [0usize; BINS];
        for v in buf.velocities().unwrap() {
            let cos_phi = v.normalize().z.clamp(-1.0, 1.0 - f32::EPSILON);
            let bin = (((cos_phi + 1.0) * 0.5) * BINS as f32) as usize;
            counts[bin.min(BINS - 1)] += 1;
        }

        let expected = SAMPLES as f32 / BINS as f32;
        let chi2: f32 = counts
            .iter()
            .map(|&c| (c as f32 - expected).powi(2) / expected)
            .sum();
        // 9 degrees of freedom, p = 0.001 critical value.
        assert!(chi2 < 27.88, "chi2 = {chi2}, counts = {counts:?}");
    }

    #[test]
    fn test_spawn_defers_without_emblem() {
        let mut graph = crate::graph::SceneNodes::new();
        let status = BurstField::spawn(
            None,
            &mut NodeAllocator::new(),
            &mut SeededRandom::new(1),
            &mut graph,
        );
        assert!(status.is_deferred());
        assert!(status.into_field().is_none());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_counter_rotates_at_half_rate() {
        let mut field = BurstField {
            handle: NodeAllocator::new().allocate(),
            anchor: Vec3::ZERO,
            buffer: generate_burst(4, Vec3::ONE, &mut SeededRandom::new(1)),
            material: PointMaterial::glowing(0.04, Vec3::ONE, 1.0, 0.7),
            rotation_y: 0.0,
        };
        field.advance(0.5, Vec3::X, 0.01);
        field.advance(0.6, Vec3::X, 0.01);
        assert!((field.rotation() + 0.01).abs() < 1e-6);
        assert_eq!(field.material().time, 0.6);
        assert_eq!(field.material().color, Vec3::X);
    }
}
