//! # glowtree
//!
//! An animated particle tree: a spiral and a cone of glowing points, an
//! emblem model on top with a burst of sparks around it, and stars that keep
//! falling through the scene.
//!
//! The simulation core is headless. [`Scene`] owns every component and a
//! fixed-step clock, and talks to whatever draws it through the
//! [`SceneGraph`] trait. The [`gpu::Renderer`] is one implementation;
//! [`SceneNodes`] is an in-memory one for tests and batch runs.
//!
//! ## Quick Start
//!
//! ```ignore
//! use glowtree::prelude::*;
//!
//! fn main() -> Result<(), ViewerError> {
//!     glowtree::viewer::run(ViewerOptions {
//!         params: SceneParams {
//!             particle_count: 8000,
//!             tree_height: 6.0,
//!             ..SceneParams::default()
//!         },
//!         ..ViewerOptions::default()
//!     })
//! }
//! ```
//!
//! ## Headless
//!
//! ```ignore
//! use glowtree::prelude::*;
//!
//! let mut graph = SceneNodes::new();
//! let loader = EmblemLoader::spawn(DEFAULT_EMBLEM_PATH);
//! let mut scene = Scene::new(SceneParams::default(), Box::new(SeededRandom::new(1)), loader, &mut graph)?;
//! for _ in 0..600 {
//!     scene.advance(&mut graph);
//! }
//! assert_eq!(graph.count(NodeKind::TreeParticles), 1);
//! ```
//!
//! ## Components
//!
//! - [`tree`]: spiral + cone distribution, rebuilt when its geometry changes
//! - [`emblem`]: glTF model loaded on a background thread
//! - [`burst`]: sparks around the emblem, deferred until it exists
//! - [`falling`]: a pool of short-lived falling stars

pub mod buffer;
pub mod burst;
pub mod clock;
pub mod config;
pub mod emblem;
pub mod error;
pub mod falling;
pub mod gpu;
pub mod graph;
pub mod material;
pub mod random;
pub mod scene;
pub mod sprite;
pub mod tree;
pub mod viewer;

pub use glam::Vec3;

pub use config::{PostProcessParams, SceneParams};
pub use error::{AssetError, ConfigError, GpuError, ParamError, ViewerError};
pub use graph::{NodeHandle, NodeKind, SceneGraph, SceneNodes};
pub use scene::{FrameReport, Scene};

/// Everything needed to build and drive a scene.
pub mod prelude {
    pub use crate::buffer::ParticleBuffer;
    pub use crate::burst::{BurstField, BurstStatus};
    pub use crate::clock::{SimClock, FRAME_DELTA};
    pub use crate::config::{ParamsDiff, PostProcessParams, SceneParams};
    pub use crate::emblem::{AssetState, Emblem, EmblemLoader, EmblemMesh, DEFAULT_EMBLEM_PATH};
    pub use crate::error::{AssetError, ConfigError, ParamError, ViewerError};
    pub use crate::falling::FallingStarPool;
    pub use crate::graph::{NodeHandle, NodeKind, SceneGraph, SceneNodes};
    pub use crate::random::{RandomSource, SeededRandom};
    pub use crate::scene::{FrameReport, Scene};
    pub use crate::tree::{generate_tree, TreePopulation, TreeShape};
    pub use crate::viewer::ViewerOptions;
    pub use crate::Vec3;
}
