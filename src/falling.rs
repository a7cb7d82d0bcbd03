//! Falling stars: short-lived single-particle emitters.
//!
//! The pool spawns one star every [`SPAWN_INTERVAL`] simulated seconds high
//! above the tree. Each star falls at constant velocity; the host never
//! integrates positions, it only writes the star's age into the lifetime
//! channel and lets the shader compute `position + velocity * age`. A star
//! whose age exceeds [`EXPIRY_AGE`] is detached and dropped by the next
//! [`FallingStarPool::sweep`], the only way a star is ever destroyed.
//!
//! At steady state roughly `EXPIRY_AGE / SPAWN_INTERVAL` stars are alive.

use glam::Vec3;

use crate::buffer::ParticleBuffer;
use crate::graph::{NodeAllocator, NodeHandle, NodeKind, SceneGraph};
use crate::material::PointMaterial;
use crate::random::RandomSource;

/// Simulated seconds between spawns.
pub const SPAWN_INTERVAL: f32 = 0.1;

/// Age past which a star is removed.
pub const EXPIRY_AGE: f32 = 6.0;

/// Half-extent of the horizontal spawn square.
const SPAWN_HALF_EXTENT: f32 = 7.5;

/// Spawn height band `[min, min + span)`.
const SPAWN_HEIGHT: (f32, f32) = (8.0, 2.0);

/// Tint of every star (`#ffffaa`).
pub const STAR_COLOR: Vec3 = Vec3::new(1.0, 1.0, 170.0 / 255.0);

/// One falling star.
#[derive(Debug)]
pub struct FallingStar {
    handle: NodeHandle,
    spawn_time: f32,
    buffer: ParticleBuffer,
}

impl FallingStar {
    fn sample(rng: &mut dyn RandomSource) -> ParticleBuffer {
        let position = Vec3::new(
            rng.range(-SPAWN_HALF_EXTENT, SPAWN_HALF_EXTENT),
            SPAWN_HEIGHT.0 + rng.next_f32() * SPAWN_HEIGHT.1,
            rng.range(-SPAWN_HALF_EXTENT, SPAWN_HALF_EXTENT),
        );
        let scale = rng.range(0.6, 1.4);
        let velocity = Vec3::new(
            rng.range(-0.15, 0.15),
            -1.0 - rng.next_f32() * 0.8,
            rng.range(-0.15, 0.15),
        );

        let mut buffer = ParticleBuffer::with_motion(1);
        buffer.push_moving(position, scale, Vec3::ONE, 0.0, velocity);
        buffer
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    /// Simulated time the star was created.
    pub fn spawn_time(&self) -> f32 {
        self.spawn_time
    }

    /// Age written by the last sweep.
    pub fn age(&self) -> f32 {
        self.buffer.lifetimes().and_then(|l| l.first().copied()).unwrap_or(0.0)
    }

    /// Where the star starts.
    pub fn origin(&self) -> Vec3 {
        self.buffer.positions()[0]
    }

    pub fn velocity(&self) -> Vec3 {
        self.buffer.velocities().map_or(Vec3::ZERO, |v| v[0])
    }

    pub fn buffer(&self) -> &ParticleBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut ParticleBuffer {
        &mut self.buffer
    }
}

/// Spawn and expiry bookkeeping for all falling stars.
#[derive(Debug)]
pub struct FallingStarPool {
    active: Vec<FallingStar>,
    last_spawn: f32,
    material: PointMaterial,
    spawned_total: u64,
    expired_total: u64,
}

impl Default for FallingStarPool {
    fn default() -> Self {
        Self::new()
    }
}

impl FallingStarPool {
    /// Empty pool. The first star is due on the first frame.
    pub fn new() -> Self {
        Self {
            active: Vec::new(),
            last_spawn: -SPAWN_INTERVAL,
            material: PointMaterial::glowing(0.35, STAR_COLOR, 1.0, 0.5),
            spawned_total: 0,
            expired_total: 0,
        }
    }

    /// Whether more than [`SPAWN_INTERVAL`] has passed since the last spawn.
    pub fn should_spawn(&self, now: f32) -> bool {
        now - self.last_spawn > SPAWN_INTERVAL
    }

    /// Create a star at `now` and attach it.
    pub fn spawn(
        &mut self,
        now: f32,
        nodes: &mut NodeAllocator,
        rng: &mut dyn RandomSource,
        graph: &mut dyn SceneGraph,
    ) -> NodeHandle {
        let handle = nodes.allocate();
        let buffer = FallingStar::sample(rng);
        graph.attach(handle, NodeKind::FallingStar);
        log::trace!("falling star {handle} spawned at t={now:.3}");

        self.active.push(FallingStar {
            handle,
            spawn_time: now,
            buffer,
        });
        self.last_spawn = now;
        self.spawned_total += 1;
        handle
    }

    /// Age every star and remove the expired ones. Returns how many expired.
    ///
    /// After this returns no active star is older than [`EXPIRY_AGE`].
    pub fn sweep(&mut self, now: f32, graph: &mut dyn SceneGraph) -> usize {
        self.material.time = now;
        let before = self.active.len();

        self.active.retain_mut(|star| {
            let age = now - star.spawn_time;
            star.buffer.set_lifetime(0, age);
            if age > EXPIRY_AGE {
                graph.detach(star.handle);
                false
            } else {
                true
            }
        });

        let expired = before - self.active.len();
        self.expired_total += expired as u64;
        if expired > 0 {
            log::trace!("{expired} falling star(s) expired at t={now:.3}");
        }
        expired
    }

    /// Detach and drop every star.
    pub fn clear(&mut self, graph: &mut dyn SceneGraph) {
        for star in self.active.drain(..) {
            graph.detach(star.handle);
        }
    }

    pub fn active(&self) -> &[FallingStar] {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut [FallingStar] {
        &mut self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Shared uniforms of every star.
    pub fn material(&self) -> &PointMaterial {
        &self.material
    }

    /// Simulated time of the most recent spawn.
    pub fn last_spawn(&self) -> f32 {
        self.last_spawn
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawned_total
    }

    pub fn expired_total(&self) -> u64 {
        self.expired_total
    }
}
