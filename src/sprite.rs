//! Procedural point sprite.
//!
//! Every particle population samples the same soft white disc: full alpha
//! at the centre, half at mid-radius, zero at the rim and beyond. The disc
//! radius is a third of the texture size, leaving a transparent margin for
//! the glow falloff computed in the shaders.

use image::{Rgba, RgbaImage};

/// Side length of the default sprite in pixels.
pub const SPRITE_SIZE: u32 = 64;

/// Alpha stops of the radial gradient, as `(offset, alpha)`.
const STOPS: [(f32, f32); 3] = [(0.0, 1.0), (0.5, 0.5), (1.0, 0.0)];

fn gradient_alpha(t: f32) -> f32 {
    if t >= 1.0 {
        return 0.0;
    }
    STOPS
        .windows(2)
        .find(|w| t <= w[1].0)
        .map(|w| {
            let (t0, a0) = w[0];
            let (t1, a1) = w[1];
            a0 + (a1 - a0) * ((t - t0) / (t1 - t0))
        })
        .unwrap_or(0.0)
}

/// Render the circle sprite at `size` x `size`.
pub fn circle_sprite(size: u32) -> RgbaImage {
    let centre = size as f32 / 2.0;
    let radius = size as f32 / 3.0;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - centre;
        let dy = y as f32 + 0.5 - centre;
        let t = (dx * dx + dy * dy).sqrt() / radius;
        let alpha = (gradient_alpha(t) * 255.0).round() as u8;
        Rgba([255, 255, 255, alpha])
    })
}
