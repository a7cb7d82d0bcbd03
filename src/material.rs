//! Shader-facing material state of the point populations.
//!
//! A [`PointMaterial`] holds the uniforms one population's shader reads.
//! The simulation writes them (the clock every frame, colors and sizes when
//! parameters change); the renderer copies them into uniform buffers.

use glam::Vec3;

/// Blend mode for particle rendering.
///
/// Controls how particle colors combine with the background and each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Standard alpha blending.
    Alpha,
    /// Colors add up; overlapping particles get brighter.
    #[default]
    Additive,
}

/// Uniforms of a point population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMaterial {
    /// Simulation clock, seconds.
    pub time: f32,
    /// Base point size in world units.
    pub size: f32,
    /// Tint multiplied with per-particle color.
    pub color: Vec3,
    /// Overall opacity.
    pub opacity: f32,
    /// Glow falloff of the sprite (larger = softer halo).
    pub glow_size: f32,
    pub blend: BlendMode,
    /// Whether fragments write depth. Glowing points never do.
    pub depth_write: bool,
}

impl PointMaterial {
    /// Additive, depth-write-off material with the given uniforms.
    pub fn glowing(size: f32, color: Vec3, opacity: f32, glow_size: f32) -> Self {
        Self {
            time: 0.0,
            size,
            color,
            opacity,
            glow_size,
            blend: BlendMode::Additive,
            depth_write: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glowing_defaults() {
        let m = PointMaterial::glowing(0.04, Vec3::ONE, 1.0, 0.7);
        assert_eq!(m.blend, BlendMode::Additive);
        assert!(!m.depth_write);
        assert_eq!(m.time, 0.0);
    }
}
