//! WGSL sources.
//!
//! The three point populations share one prelude (uniform layout, instance
//! attributes, billboarding and the sprite fragment stage) and differ only
//! in their vertex stage.

/// Shared declarations and fragment stage of every point shader.
pub const POINTS_COMMON: &str = include_str!("shaders/points_common.wgsl");
const TREE_VERTEX: &str = include_str!("shaders/tree.wgsl");
const BURST_VERTEX: &str = include_str!("shaders/burst.wgsl");
const FALLING_STAR_VERTEX: &str = include_str!("shaders/falling_star.wgsl");

/// Lit solid shader for the emblem and the ground.
pub const MESH: &str = include_str!("shaders/mesh.wgsl");
/// Bright-pass and gaussian blur stages of the bloom chain.
pub const BLOOM: &str = include_str!("shaders/bloom.wgsl");
/// Final bloom add, exposure and ACES tone mapping.
pub const COMPOSITE: &str = include_str!("shaders/composite.wgsl");

/// Which point population a shader draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointShader {
    /// Twinkling tree particles.
    Tree,
    /// Looping sparks around the emblem.
    Burst,
    /// Falling stars moved by their age.
    FallingStar,
}

impl PointShader {
    pub const ALL: [PointShader; 3] = [PointShader::Tree, PointShader::Burst, PointShader::FallingStar];

    /// Full module source for this population.
    pub fn source(self) -> String {
        let vertex = match self {
            PointShader::Tree => TREE_VERTEX,
            PointShader::Burst => BURST_VERTEX,
            PointShader::FallingStar => FALLING_STAR_VERTEX,
        };
        format!("{POINTS_COMMON}\n{vertex}")
    }

    pub fn label(self) -> &'static str {
        match self {
            PointShader::Tree => "Tree Shader",
            PointShader::Burst => "Burst Shader",
            PointShader::FallingStar => "Falling Star Shader",
        }
    }
}

/// Every module the renderer compiles, by label.
pub fn all_modules() -> Vec<(&'static str, String)> {
    let mut modules: Vec<(&'static str, String)> = PointShader::ALL
        .iter()
        .map(|kind| (kind.label(), kind.source()))
        .collect();
    modules.push(("Mesh Shader", MESH.to_string()));
    modules.push(("Bloom Shader", BLOOM.to_string()));
    modules.push(("Composite Shader", COMPOSITE.to_string()));
    modules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_sources_define_both_stages() {
        for kind in PointShader::ALL {
            let src = kind.source();
            assert!(src.contains("fn vs_main"), "{kind:?}");
            assert!(src.contains("fn fs_main"), "{kind:?}");
        }
    }

    #[test]
    fn test_all_modules_are_distinct() {
        let modules = all_modules();
        assert_eq!(modules.len(), 6);
        let mut labels: Vec<_> = modules.iter().map(|(l, _)| *l).collect();
        labels.dedup();
        assert_eq!(labels.len(), 6);
    }
}
