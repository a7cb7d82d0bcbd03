//! The animation driver.
//!
//! [`Scene`] owns the clock and every component: tree, emblem, burst field
//! and falling stars. The host calls [`Scene::advance`] once per rendered
//! frame and hands in whatever implements [`SceneGraph`]; the scene attaches
//! and detaches nodes through it and otherwise keeps all state to itself.
//!
//! # Example
//!
//! ```ignore
//! use glowtree::prelude::*;
//!
//! let mut graph = SceneNodes::new();
//! let loader = EmblemLoader::spawn(DEFAULT_EMBLEM_PATH);
//! let mut scene = Scene::new(
//!     SceneParams::default(),
//!     Box::new(SeededRandom::new(7)),
//!     loader,
//!     &mut graph,
//! )?;
//!
//! loop {
//!     let report = scene.advance(&mut graph);
//!     log::trace!("{report:?}");
//! }
//! ```

use crate::burst::BurstField;
use crate::clock::SimClock;
use crate::config::{ParamsDiff, SceneParams};
use crate::emblem::{AssetState, Emblem, EmblemLoader};
use crate::error::{AssetError, ParamError};
use crate::falling::FallingStarPool;
use crate::graph::{NodeAllocator, NodeHandle, SceneGraph};
use crate::random::RandomSource;
use crate::tree::TreePopulation;

/// What one call to [`Scene::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Simulated time after the frame.
    pub time: f32,
    /// Frames advanced so far.
    pub frame: u64,
    /// Star spawned this frame, if any.
    pub spawned: Option<NodeHandle>,
    /// Stars removed by this frame's sweep.
    pub expired: usize,
    /// Stars alive after the sweep.
    pub active_stars: usize,
    /// Whether the burst field is still waiting for the emblem.
    pub burst_deferred: bool,
}

/// The whole animated scene.
pub struct Scene {
    params: SceneParams,
    clock: SimClock,
    nodes: NodeAllocator,
    rng: Box<dyn RandomSource>,
    tree: TreePopulation,
    loader: Option<EmblemLoader>,
    emblem: AssetState<Emblem>,
    burst: Option<BurstField>,
    stars: FallingStarPool,
}

impl Scene {
    /// Validate `params`, build the tree and attach it.
    ///
    /// The emblem arrives later through `loader`.
    pub fn new(
        params: SceneParams,
        mut rng: Box<dyn RandomSource>,
        loader: EmblemLoader,
        graph: &mut dyn SceneGraph,
    ) -> Result<Self, ParamError> {
        params.validate()?;

        let mut nodes = NodeAllocator::new();
        let tree = TreePopulation::build(&params, &mut nodes, rng.as_mut(), graph);
        log::info!(
            "scene created: {} tree particles, height {}, width {}",
            params.particle_count,
            params.tree_height,
            params.tree_width
        );

        Ok(Self {
            params,
            clock: SimClock::new(),
            nodes,
            rng,
            tree,
            loader: Some(loader),
            emblem: AssetState::Pending,
            burst: None,
            stars: FallingStarPool::new(),
        })
    }

    /// Advance one frame.
    ///
    /// Does nothing but report while the clock is paused.
    pub fn advance(&mut self, graph: &mut dyn SceneGraph) -> FrameReport {
        if self.clock.is_paused() {
            return self.report(None, 0);
        }

        let now = self.clock.tick();
        self.poll_emblem(graph);
        self.ensure_burst(graph);

        let speed = self.params.rotation_speed;
        let color = self.params.emblem_color;
        self.tree.advance(now, speed);
        if let Some(emblem) = self.emblem.ready_mut() {
            emblem.advance(speed);
            emblem.refresh_color(color);
        }
        if let Some(burst) = self.burst.as_mut() {
            burst.advance(now, color, speed);
        }

        let spawned = if self.stars.should_spawn(now) {
            Some(self.stars.spawn(now, &mut self.nodes, self.rng.as_mut(), graph))
        } else {
            None
        };
        let expired = self.stars.sweep(now, graph);

        self.report(spawned, expired)
    }

    fn report(&self, spawned: Option<NodeHandle>, expired: usize) -> FrameReport {
        FrameReport {
            time: self.clock.elapsed(),
            frame: self.clock.frame(),
            spawned,
            expired,
            active_stars: self.stars.len(),
            burst_deferred: self.burst.is_none(),
        }
    }

    fn poll_emblem(&mut self, graph: &mut dyn SceneGraph) {
        let Some(result) = self.loader.as_mut().and_then(EmblemLoader::poll) else {
            return;
        };
        self.loader = None;

        self.emblem = match result {
            Ok(mesh) => AssetState::Ready(Emblem::place(mesh, &self.params, &mut self.nodes, graph)),
            Err(err) => {
                log::warn!("emblem unavailable: {err}");
                AssetState::Failed(err)
            }
        };
    }

    fn ensure_burst(&mut self, graph: &mut dyn SceneGraph) {
        if self.burst.is_some() {
            return;
        }
        self.burst = BurstField::spawn(self.emblem.ready(), &mut self.nodes, self.rng.as_mut(), graph).into_field();
    }

    /// Switch to `params`, changing only what the difference requires.
    ///
    /// Invalid parameters are rejected and the scene is left untouched.
    pub fn update_params(
        &mut self,
        params: SceneParams,
        graph: &mut dyn SceneGraph,
    ) -> Result<ParamsDiff, ParamError> {
        params.validate()?;
        let diff = self.params.diff(&params);
        self.params = params;

        if diff.rebuild_tree {
            self.tree
                .rebuild(&self.params, &mut self.nodes, self.rng.as_mut(), graph);
        } else if diff.material_changed {
            self.tree.set_material(&self.params);
        }

        if diff.reanchor_emblem {
            if let Some(emblem) = self.emblem.ready_mut() {
                emblem.reanchor(&self.params);
            }
            if let Some(burst) = self.burst.take() {
                burst.detach(graph);
            }
            self.ensure_burst(graph);
        }

        if !diff.is_empty() {
            log::debug!("parameters updated: {diff:?}");
        }
        Ok(diff)
    }

    /// Regenerate the tree with the current parameters and fresh randomness.
    pub fn regenerate_tree(&mut self, graph: &mut dyn SceneGraph) {
        self.tree
            .rebuild(&self.params, &mut self.nodes, self.rng.as_mut(), graph);
    }

    /// Detach everything and stop waiting for the emblem.
    pub fn teardown(mut self, graph: &mut dyn SceneGraph) {
        self.tree.detach(graph);
        if let Some(emblem) = self.emblem.ready() {
            emblem.detach(graph);
        }
        if let Some(burst) = self.burst.take() {
            burst.detach(graph);
        }
        self.stars.clear(graph);
        if let Some(mut loader) = self.loader.take() {
            loader.cancel();
            self.emblem = AssetState::Failed(AssetError::Cancelled);
        }
        log::info!("scene torn down after {} frames", self.clock.frame());
    }

    pub fn params(&self) -> &SceneParams {
        &self.params
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Simulated seconds so far.
    pub fn time(&self) -> f32 {
        self.clock.elapsed()
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    pub fn toggle_pause(&mut self) {
        self.clock.toggle_pause();
    }

    pub fn tree(&self) -> &TreePopulation {
        &self.tree
    }

    pub fn emblem_state(&self) -> &AssetState<Emblem> {
        &self.emblem
    }

    pub fn emblem(&self) -> Option<&Emblem> {
        self.emblem.ready()
    }

    pub fn burst(&self) -> Option<&BurstField> {
        self.burst.as_ref()
    }

    pub fn stars(&self) -> &FallingStarPool {
        &self.stars
    }

    /// Mutable star access, for clearing upload flags after drawing.
    pub fn stars_mut(&mut self) -> &mut FallingStarPool {
        &mut self.stars
    }
}
