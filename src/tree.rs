//! Tree particle distribution.
//!
//! The tree is one particle population made of two parts laid out back to
//! back in a single [`ParticleBuffer`]:
//!
//! | Part | Share | Layout |
//! |------|-------|--------|
//! | Spiral | `floor(0.7 N)`, first | Helix winding ten turns up the tree, radius tapering to zero at the top |
//! | Cone | the rest | Filled disc slices of a narrower cone, radius tapering with height |
//!
//! Colors are drawn from [`PALETTE`] and scaled by height. The spiral is dim
//! at the base and brightens towards the top; the inner cone starts at half
//! brightness and stays bright.
//!
//! Geometry is generated once per [`TreeShape`]. Rotation is a group
//! transform applied by the renderer, never baked into positions.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec3;

use crate::buffer::ParticleBuffer;
use crate::config::SceneParams;
use crate::graph::{NodeAllocator, NodeHandle, NodeKind, SceneGraph};
use crate::material::PointMaterial;
use crate::random::RandomSource;

/// Base hues: red, green, blue, yellow, magenta, cyan.
pub const PALETTE: [Vec3; 6] = [
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(0.0, 1.0, 0.0),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(1.0, 0.0, 1.0),
    Vec3::new(0.0, 1.0, 1.0),
];

/// Spiral winding: total angle swept from base to top.
const SPIRAL_SWEEP: f32 = 20.0 * PI;

/// Cone base radius relative to the tree radius.
const CONE_RADIUS_RATIO: f32 = 0.6;

/// Largest spiral radius relative to the tree radius (1.2 jitter + 0.3 offset).
pub const SPIRAL_MAX_RADIUS_RATIO: f32 = 1.5;

/// Largest cone radius relative to the tree radius (0.6 * 1.2 jitter).
pub const CONE_MAX_RADIUS_RATIO: f32 = CONE_RADIUS_RATIO * 1.2;

/// Size and particle budget of the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeShape {
    /// Total particles, spiral and cone together.
    pub particle_count: u32,
    /// Height of the top particle layer.
    pub height: f32,
    /// Spiral base radius.
    pub radius: f32,
}

impl TreeShape {
    pub fn from_params(params: &SceneParams) -> Self {
        Self {
            particle_count: params.particle_count,
            height: params.tree_height,
            radius: params.tree_width,
        }
    }

    /// `floor(0.7 * particle_count)`, computed exactly.
    pub fn spiral_count(&self) -> usize {
        (self.particle_count as u64 * 7 / 10) as usize
    }

    pub fn cone_count(&self) -> usize {
        self.particle_count as usize - self.spiral_count()
    }
}

impl Default for TreeShape {
    fn default() -> Self {
        Self::from_params(&SceneParams::default())
    }
}

/// Generated tree geometry.
#[derive(Debug, Clone)]
pub struct TreeDistribution {
    /// Spiral particles at `0..spiral_count`, cone particles after.
    pub buffer: ParticleBuffer,
    pub spiral_count: usize,
}

impl TreeDistribution {
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn cone_count(&self) -> usize {
        self.buffer.len() - self.spiral_count
    }

    pub fn spiral_positions(&self) -> &[Vec3] {
        &self.buffer.positions()[..self.spiral_count]
    }

    pub fn cone_positions(&self) -> &[Vec3] {
        &self.buffer.positions()[self.spiral_count..]
    }
}

/// Pick a palette hue and scale it by `brightness`.
fn tinted(rng: &mut dyn RandomSource, brightness: f32) -> Vec3 {
    PALETTE[rng.index(PALETTE.len())] * brightness
}

/// Generate the spiral and cone particles of `shape`.
pub fn generate_tree(shape: &TreeShape, rng: &mut dyn RandomSource) -> TreeDistribution {
    let spiral = shape.spiral_count();
    let cone = shape.cone_count();
    let mut buffer = ParticleBuffer::with_capacity(spiral + cone);

    for i in 0..spiral {
        let height_ratio = i as f32 / spiral as f32;
        let height = height_ratio * shape.height;

        let angle = height_ratio * SPIRAL_SWEEP + rng.range(0.0, FRAC_PI_2);
        let base_radius = (1.0 - height_ratio) * shape.radius;
        let offset = rng.range(0.0, base_radius * 0.3);
        let radius = base_radius * rng.range(0.8, 1.2) + offset;

        let position = Vec3::new(radius * angle.cos(), height, radius * angle.sin());
        let scale = rng.next_f32();
        let brightness = height_ratio * 0.8 + rng.range(0.0, 0.2);
        buffer.push(position, scale, tinted(rng, brightness));
    }

    let max_radius = shape.radius * CONE_RADIUS_RATIO;
    for i in 0..cone {
        let height_ratio = i as f32 / cone as f32;
        let height = height_ratio * shape.height;

        let radius = (1.0 - height_ratio) * max_radius * rng.range(0.8, 1.2);
        let angle = rng.range(0.0, TAU);

        let position = Vec3::new(radius * angle.cos(), height, radius * angle.sin());
        let scale = rng.next_f32();
        let brightness = height_ratio * 0.5 + 0.5 + rng.range(0.0, 0.2);
        buffer.push(position, scale, tinted(rng, brightness));
    }

    TreeDistribution {
        buffer,
        spiral_count: spiral,
    }
}

/// The tree population as it lives in the scene.
#[derive(Debug)]
pub struct TreePopulation {
    handle: NodeHandle,
    shape: TreeShape,
    distribution: TreeDistribution,
    material: PointMaterial,
    rotation_y: f32,
}

fn tree_material(params: &SceneParams) -> PointMaterial {
    PointMaterial::glowing(params.particle_size, Vec3::ONE, params.opacity, params.glow_size)
}

impl TreePopulation {
    /// Generate the tree and attach it.
    pub fn build(
        params: &SceneParams,
        nodes: &mut NodeAllocator,
        rng: &mut dyn RandomSource,
        graph: &mut dyn SceneGraph,
    ) -> Self {
        let shape = TreeShape::from_params(params);
        let distribution = generate_tree(&shape, rng);
        let handle = nodes.allocate();
        graph.attach(handle, NodeKind::TreeParticles);
        log::debug!(
            "tree {handle}: {} spiral + {} cone particles",
            distribution.spiral_count,
            distribution.cone_count()
        );

        Self {
            handle,
            shape,
            distribution,
            material: tree_material(params),
            rotation_y: 0.0,
        }
    }

    /// Replace the geometry with a fresh one for `params`.
    ///
    /// The old node is detached before the new one is attached, so the graph
    /// never holds two trees. Accumulated rotation and the clock carry over.
    pub fn rebuild(
        &mut self,
        params: &SceneParams,
        nodes: &mut NodeAllocator,
        rng: &mut dyn RandomSource,
        graph: &mut dyn SceneGraph,
    ) {
        graph.detach(self.handle);
        let time = self.material.time;
        let rotation_y = self.rotation_y;

        *self = Self::build(params, nodes, rng, graph);
        self.material.time = time;
        self.rotation_y = rotation_y;
    }

    /// Update size, opacity and glow in place.
    pub fn set_material(&mut self, params: &SceneParams) {
        let time = self.material.time;
        self.material = tree_material(params);
        self.material.time = time;
    }

    /// Per-frame update: clock into the material, spin the group.
    pub fn advance(&mut self, now: f32, rotation_speed: f32) {
        self.material.time = now;
        self.rotation_y += rotation_speed;
    }

    pub fn detach(&self, graph: &mut dyn SceneGraph) {
        graph.detach(self.handle);
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    pub fn shape(&self) -> &TreeShape {
        &self.shape
    }

    pub fn distribution(&self) -> &TreeDistribution {
        &self.distribution
    }

    pub fn buffer(&self) -> &ParticleBuffer {
        &self.distribution.buffer
    }

    pub fn material(&self) -> &PointMaterial {
        &self.material
    }

    /// Group rotation about Y, radians.
    pub fn rotation(&self) -> f32 {
        self.rotation_y
    }
}
