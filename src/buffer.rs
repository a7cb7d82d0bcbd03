//! Structure-of-arrays particle storage.
//!
//! A [`ParticleBuffer`] keeps one `Vec` per attribute. Index `i` refers to
//! the same particle in every channel, and all channels always have the same
//! length. Channels are fixed in size once the buffer is built; only their
//! contents change.
//!
//! The renderer interleaves the channels into [`ParticleInstance`] records
//! when it uploads them.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Interleaved per-particle record uploaded as an instance vertex buffer.
///
/// 48 bytes, matching the instance layout declared in the point shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 3],
    pub scale: f32,
    pub color: [f32; 3],
    pub lifetime: f32,
    pub velocity: [f32; 3],
    pub _pad: f32,
}

/// Fixed-length particle attribute channels.
#[derive(Debug, Clone, Default)]
pub struct ParticleBuffer {
    positions: Vec<Vec3>,
    scales: Vec<f32>,
    colors: Vec<Vec3>,
    lifetimes: Option<Vec<f32>>,
    velocities: Option<Vec<Vec3>>,
    needs_upload: bool,
}

impl ParticleBuffer {
    /// Buffer with only position, scale and color channels.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            scales: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
            lifetimes: None,
            velocities: None,
            needs_upload: true,
        }
    }

    /// Buffer that also carries lifetime and velocity channels.
    pub fn with_motion(capacity: usize) -> Self {
        Self {
            lifetimes: Some(Vec::with_capacity(capacity)),
            velocities: Some(Vec::with_capacity(capacity)),
            ..Self::with_capacity(capacity)
        }
    }

    /// Append a particle without motion channels.
    ///
    /// # Panics
    ///
    /// Panics if the buffer was built [`with_motion`](Self::with_motion).
    pub fn push(&mut self, position: Vec3, scale: f32, color: Vec3) {
        assert!(
            self.lifetimes.is_none(),
            "buffer has motion channels; use push_moving"
        );
        self.positions.push(position);
        self.scales.push(scale);
        self.colors.push(color);
    }

    /// Append a particle with lifetime and velocity.
    ///
    /// # Panics
    ///
    /// Panics if the buffer was built without motion channels.
    pub fn push_moving(&mut self, position: Vec3, scale: f32, color: Vec3, lifetime: f32, velocity: Vec3) {
        let (Some(lifetimes), Some(velocities)) = (self.lifetimes.as_mut(), self.velocities.as_mut()) else {
            panic!("buffer has no motion channels; build it with ParticleBuffer::with_motion");
        };
        lifetimes.push(lifetime);
        velocities.push(velocity);
        self.positions.push(position);
        self.scales.push(scale);
        self.colors.push(color);
    }

    /// Number of particles.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the buffer holds no particles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether lifetime and velocity channels are present.
    #[inline]
    pub fn has_motion(&self) -> bool {
        self.lifetimes.is_some()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn scales(&self) -> &[f32] {
        &self.scales
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    pub fn lifetimes(&self) -> Option<&[f32]> {
        self.lifetimes.as_deref()
    }

    pub fn velocities(&self) -> Option<&[Vec3]> {
        self.velocities.as_deref()
    }

    /// Overwrite one particle's lifetime and flag the buffer for upload.
    ///
    /// Does nothing if the buffer has no lifetime channel or `index` is out
    /// of range.
    pub fn set_lifetime(&mut self, index: usize, value: f32) {
        if let Some(slot) = self.lifetimes.as_mut().and_then(|l| l.get_mut(index)) {
            *slot = value;
            self.needs_upload = true;
        }
    }

    /// Whether channel data changed since the last [`take_upload`](Self::take_upload).
    #[inline]
    pub fn needs_upload(&self) -> bool {
        self.needs_upload
    }

    /// Clear the upload flag, returning whether it was set.
    pub fn take_upload(&mut self) -> bool {
        std::mem::take(&mut self.needs_upload)
    }

    /// Whether every present channel has the same length.
    pub fn is_consistent(&self) -> bool {
        let n = self.positions.len();
        self.scales.len() == n
            && self.colors.len() == n
            && self.lifetimes.as_ref().map_or(true, |l| l.len() == n)
            && self.velocities.as_ref().map_or(true, |v| v.len() == n)
    }

    /// Interleave the channels for upload. Missing channels are zero.
    pub fn instances(&self) -> Vec<ParticleInstance> {
        let mut out = Vec::with_capacity(self.len());
        self.write_instances(&mut out);
        out
    }

    /// Append interleaved records to `out`.
    pub fn write_instances(&self, out: &mut Vec<ParticleInstance>) {
        for i in 0..self.len() {
            out.push(ParticleInstance {
                position: self.positions[i].to_array(),
                scale: self.scales[i],
                color: self.colors[i].to_array(),
                lifetime: self.lifetimes.as_ref().map_or(0.0, |l| l[i]),
                velocity: self.velocities.as_ref().map_or([0.0; 3], |v| v[i].to_array()),
                _pad: 0.0,
            });
        }
    }
}
