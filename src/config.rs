//! Scene parameters.
//!
//! [`SceneParams`] is the single configuration object the scene is built
//! from. Every field can be changed later through
//! [`Scene::update_params`](crate::Scene::update_params); [`SceneParams::diff`]
//! tells the scene how much work a change needs.
//!
//! Parameters are validated at this boundary. Anything that reaches the
//! particle generators is known to be in range.
//!
//! # Example
//!
//! ```ignore
//! let params = SceneParams::from_json_str(r#"{ "particle_count": 8000 }"#)?;
//! assert_eq!(params.tree_height, 5.0);
//! ```

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ParamError};

/// Accepted range for [`SceneParams::particle_count`].
pub const PARTICLE_COUNT_RANGE: (u32, u32) = (1000, 10_000);

/// Post-processing settings. Consumed by the renderer only.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PostProcessParams {
    /// Bloom intensity, 0-3.
    pub bloom_strength: f32,
    /// Bloom spread, 0-1.
    pub bloom_radius: f32,
    /// Luminance above which pixels bloom, 0-1.
    pub bloom_threshold: f32,
    /// Tone mapping exposure, 0-2.
    pub exposure: f32,
}

impl Default for PostProcessParams {
    fn default() -> Self {
        Self {
            bloom_strength: 1.5,
            bloom_radius: 0.4,
            bloom_threshold: 0.1,
            exposure: 1.0,
        }
    }
}

/// Complete scene configuration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneParams {
    /// Total tree particles, 1000-10000.
    pub particle_count: u32,
    /// Base point size of tree particles, 0.01-0.2.
    pub particle_size: f32,
    /// Tree height in world units, 2-10.
    pub tree_height: f32,
    /// Tree base radius in world units, 1-5.
    pub tree_width: f32,
    /// Tree and emblem rotation in radians per frame, 0-0.01.
    pub rotation_speed: f32,
    /// Tree particle opacity, 0-1.
    pub opacity: f32,
    /// Glow falloff of tree particles, 0.1-1.
    pub glow_size: f32,
    /// Emblem base and emissive color (linear RGB, 0-1).
    pub emblem_color: Vec3,
    /// Uniform scale of the emblem model, 0.1-1.
    pub emblem_scale: f32,
    /// Bloom and exposure.
    pub post_processing: PostProcessParams,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            particle_count: 5000,
            particle_size: 0.05,
            tree_height: 5.0,
            tree_width: 2.0,
            rotation_speed: 0.002,
            opacity: 0.8,
            glow_size: 0.5,
            emblem_color: Vec3::new(1.0, 0.843, 0.0),
            emblem_scale: 0.3,
            post_processing: PostProcessParams::default(),
        }
    }
}

fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<(), ParamError> {
    if !value.is_finite() {
        return Err(ParamError::NotFinite { name, value });
    }
    if value < min || value > max {
        return Err(ParamError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl SceneParams {
    /// Check every field against its accepted range.
    pub fn validate(&self) -> Result<(), ParamError> {
        let (min, max) = PARTICLE_COUNT_RANGE;
        if self.particle_count < min || self.particle_count > max {
            return Err(ParamError::CountOutOfRange {
                name: "particle_count",
                value: self.particle_count,
                min,
                max,
            });
        }
        check_range("particle_size", self.particle_size, 0.01, 0.2)?;
        check_range("tree_height", self.tree_height, 2.0, 10.0)?;
        check_range("tree_width", self.tree_width, 1.0, 5.0)?;
        check_range("rotation_speed", self.rotation_speed, 0.0, 0.01)?;
        check_range("opacity", self.opacity, 0.0, 1.0)?;
        check_range("glow_size", self.glow_size, 0.1, 1.0)?;
        check_range("emblem_color.r", self.emblem_color.x, 0.0, 1.0)?;
        check_range("emblem_color.g", self.emblem_color.y, 0.0, 1.0)?;
        check_range("emblem_color.b", self.emblem_color.z, 0.0, 1.0)?;
        check_range("emblem_scale", self.emblem_scale, 0.1, 1.0)?;

        let post = &self.post_processing;
        check_range("bloom_strength", post.bloom_strength, 0.0, 3.0)?;
        check_range("bloom_radius", post.bloom_radius, 0.0, 1.0)?;
        check_range("bloom_threshold", post.bloom_threshold, 0.0, 1.0)?;
        check_range("exposure", post.exposure, 0.0, 2.0)?;
        Ok(())
    }

    /// Parse and validate parameters from JSON. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let params: SceneParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Read, parse and validate a JSON parameter file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> String {
        // Plain floats and structs always serialize.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Compare with `other` to find what a switch to `other` requires.
    pub fn diff(&self, other: &SceneParams) -> ParamsDiff {
        let geometry_changed = self.particle_count != other.particle_count
            || self.tree_height != other.tree_height
            || self.tree_width != other.tree_width;

        let reanchor_emblem = self.tree_height != other.tree_height
            || self.emblem_scale != other.emblem_scale;

        let material_changed = self.particle_size != other.particle_size
            || self.opacity != other.opacity
            || self.glow_size != other.glow_size;

        ParamsDiff {
            rebuild_tree: geometry_changed,
            reanchor_emblem,
            material_changed,
        }
    }
}

/// Result of comparing two [`SceneParams`].
///
/// Rotation speed, emblem color and post-processing are read every frame,
/// so they never show up here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamsDiff {
    /// Tree particles must be regenerated.
    pub rebuild_tree: bool,
    /// The emblem moves or rescales, and its burst field is rebuilt.
    pub reanchor_emblem: bool,
    /// Tree material uniforms change in place.
    pub material_changed: bool,
}

impl ParamsDiff {
    /// Returns true if no changes are needed.
    pub fn is_empty(&self) -> bool {
        !self.rebuild_tree && !self.reanchor_emblem && !self.material_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(SceneParams::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_out_of_range_count() {
        let params = SceneParams {
            particle_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ParamError::CountOutOfRange { name: "particle_count", .. })
        ));

        let params = SceneParams {
            particle_count: 10_001,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_rejects_each_float_field() {
        let cases: Vec<(&str, SceneParams)> = vec![
            ("particle_size", SceneParams { particle_size: 0.5, ..Default::default() }),
            ("tree_height", SceneParams { tree_height: 1.0, ..Default::default() }),
            ("tree_width", SceneParams { tree_width: 6.0, ..Default::default() }),
            ("rotation_speed", SceneParams { rotation_speed: -0.001, ..Default::default() }),
            ("opacity", SceneParams { opacity: 1.5, ..Default::default() }),
            ("glow_size", SceneParams { glow_size: 0.0, ..Default::default() }),
            ("emblem_color.g", SceneParams { emblem_color: Vec3::new(0.5, 2.0, 0.5), ..Default::default() }),
            ("emblem_scale", SceneParams { emblem_scale: 3.0, ..Default::default() }),
        ];

        for (field, params) in cases {
            match params.validate() {
                Err(ParamError::OutOfRange { name, .. }) => assert_eq!(name, field),
                other => panic!("{field}: expected OutOfRange, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_rejects_nan() {
        let params = SceneParams {
            opacity: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ParamError::NotFinite { name: "opacity", .. })
        ));
    }

    #[test]
    fn test_rejects_bad_post_processing() {
        let mut params = SceneParams::default();
        params.post_processing.exposure = 5.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let params = SceneParams::from_json_str(r#"{ "particle_count": 8000 }"#).unwrap();
        assert_eq!(params.particle_count, 8000);
        assert_eq!(params.tree_height, 5.0);
        assert_eq!(params.post_processing, PostProcessParams::default());
    }

    #[test]
    fn test_json_round_trip() {
        let params = SceneParams {
            tree_width: 3.0,
            emblem_color: Vec3::new(0.2, 0.4, 0.6),
            ..Default::default()
        };
        let parsed = SceneParams::from_json_str(&params.to_json()).unwrap();
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_json_invalid_values_rejected() {
        let err = SceneParams::from_json_str(r#"{ "tree_height": 50.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SceneParams::from_json_str("not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SceneParams::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn test_diff() {
        let base = SceneParams::default();
        assert!(base.diff(&base).is_empty());

        let taller = SceneParams { tree_height: 7.0, ..base };
        let diff = base.diff(&taller);
        assert!(diff.rebuild_tree);
        assert!(diff.reanchor_emblem);
        assert!(!diff.material_changed);

        let brighter = SceneParams { opacity: 1.0, ..base };
        let diff = base.diff(&brighter);
        assert!(!diff.rebuild_tree);
        assert!(diff.material_changed);

        let recolored = SceneParams { emblem_color: Vec3::ONE, rotation_speed: 0.005, ..base };
        assert!(base.diff(&recolored).is_empty());
    }
}
