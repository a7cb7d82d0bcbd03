//! The emblem on top of the tree and its background loader.
//!
//! The emblem model is a glTF binary read on a worker thread. The scene
//! polls an [`EmblemLoader`] once per frame; until the load resolves every
//! emblem-dependent step (the emblem itself, the burst field) is skipped.
//!
//! Meshes are flattened into one indexed triangle list with node transforms
//! baked in, which is all the renderer needs to draw a lit solid.

use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use glam::{Mat3, Mat4, Quat, Vec3};

use crate::config::SceneParams;
use crate::error::AssetError;
use crate::graph::{NodeAllocator, NodeHandle, NodeKind, SceneGraph};

/// Where the viewer looks for the model by default.
pub const DEFAULT_EMBLEM_PATH: &str = "assets/star.glb";

/// Gap between the tree tip and the emblem.
pub const EMBLEM_LIFT: f32 = 0.2;

/// State of an asynchronous asset.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetState<T> {
    /// Still loading.
    Pending,
    /// Loaded.
    Ready(T),
    /// Gave up; the reason is kept for logging.
    Failed(AssetError),
}

impl<T> AssetState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, AssetState::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, AssetState::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AssetState::Failed(_))
    }

    /// The loaded value, if any.
    pub fn ready(&self) -> Option<&T> {
        match self {
            AssetState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            AssetState::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&AssetError> {
        match self {
            AssetState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Indexed triangle mesh in model space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmblemMesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<u32>,
}

impl EmblemMesh {
    /// Build a mesh from raw channels.
    ///
    /// Fails with [`AssetError::NoGeometry`] if there is no complete
    /// triangle, and with [`AssetError::Import`] if the channels disagree or
    /// an index points past the vertex list.
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>, indices: Vec<u32>) -> Result<Self, AssetError> {
        if positions.is_empty() || indices.len() < 3 {
            return Err(AssetError::NoGeometry);
        }
        if normals.len() != positions.len() {
            return Err(AssetError::Import(format!(
                "{} normals for {} positions",
                normals.len(),
                positions.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(AssetError::Import(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(AssetError::Import(format!(
                "index {bad} out of range for {} vertices",
                positions.len()
            )));
        }
        Ok(Self {
            positions,
            normals,
            indices,
        })
    }

    /// Parse a `.glb` (or self-contained `.gltf`) file held in memory.
    pub fn from_gltf_slice(bytes: &[u8]) -> Result<Self, AssetError> {
        let (document, buffers, _images) =
            gltf::import_slice(bytes).map_err(|e| AssetError::Import(e.to_string()))?;

        let mut builder = MeshBuilder::default();
        match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => {
                for node in scene.nodes() {
                    builder.visit_node(&node, Mat4::IDENTITY, &buffers)?;
                }
            }
            None => {
                for mesh in document.meshes() {
                    builder.append_mesh(&mesh, Mat4::IDENTITY, &buffers)?;
                }
            }
        }
        builder.finish()
    }

    /// Read and parse a model file.
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let bytes = std::fs::read(path).map_err(|e| AssetError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_gltf_slice(&bytes)
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.positions.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(lo, hi), p| (lo.min(*p), hi.max(*p)),
        )
    }
}

/// Accumulates primitives from a glTF scene.
#[derive(Default)]
struct MeshBuilder {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<u32>,
}

impl MeshBuilder {
    fn visit_node(
        &mut self,
        node: &gltf::Node<'_>,
        parent: Mat4,
        buffers: &[gltf::buffer::Data],
    ) -> Result<(), AssetError> {
        let local = Mat4::from_cols_array_2d(&node.transform().matrix());
        let world = parent * local;
        if let Some(mesh) = node.mesh() {
            self.append_mesh(&mesh, world, buffers)?;
        }
        for child in node.children() {
            self.visit_node(&child, world, buffers)?;
        }
        Ok(())
    }

    fn append_mesh(
        &mut self,
        mesh: &gltf::Mesh<'_>,
        transform: Mat4,
        buffers: &[gltf::buffer::Data],
    ) -> Result<(), AssetError> {
        let normal_matrix = normal_matrix(transform);

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!("skipping non-triangle primitive in mesh {}", mesh.index());
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<Vec3> = positions.map(Vec3::from).collect();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };
            let normals: Vec<Vec3> = match reader.read_normals() {
                Some(normals) => normals.map(Vec3::from).collect(),
                None => smooth_normals(&positions, &indices),
            };
            if normals.len() != positions.len() {
                return Err(AssetError::Import(format!(
                    "primitive {} has {} normals for {} positions",
                    primitive.index(),
                    normals.len(),
                    positions.len()
                )));
            }

            let base = self.positions.len() as u32;
            self.positions
                .extend(positions.iter().map(|p| transform.transform_point3(*p)));
            self.normals
                .extend(normals.iter().map(|n| (normal_matrix * *n).normalize_or_zero()));
            self.indices.extend(indices.iter().map(|i| base + i));
        }
        Ok(())
    }

    fn finish(self) -> Result<EmblemMesh, AssetError> {
        EmblemMesh::new(self.positions, self.normals, self.indices)
    }
}

fn normal_matrix(transform: Mat4) -> Mat3 {
    let linear = Mat3::from_mat4(transform);
    if linear.determinant().abs() <= f32::EPSILON {
        linear
    } else {
        linear.inverse().transpose()
    }
}

/// Area-weighted vertex normals for meshes that ship without them.
fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals.iter().map(|n| n.normalize_or(Vec3::Y)).collect()
}

/// What a load delivers.
pub type LoadResult = Result<EmblemMesh, AssetError>;

/// Loads the emblem model off the render thread.
///
/// The result is delivered exactly once through [`poll`](Self::poll).
#[derive(Debug)]
pub struct EmblemLoader {
    path: PathBuf,
    receiver: Option<Receiver<LoadResult>>,
    cancelled: bool,
}

impl EmblemLoader {
    /// Loader fed by hand through the returned sender.
    pub fn channel(path: impl Into<PathBuf>) -> (Sender<LoadResult>, Self) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let loader = Self {
            path: path.into(),
            receiver: Some(rx),
            cancelled: false,
        };
        (tx, loader)
    }

    /// Start loading `path` on a worker thread.
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, loader) = Self::channel(path.clone());
        let worker_path = path.clone();

        let spawned = std::thread::Builder::new()
            .name("emblem-loader".into())
            .spawn(move || {
                let result = EmblemMesh::load(&worker_path);
                // The receiver is gone if the load was cancelled.
                let _ = tx.send(result);
            });

        match spawned {
            Ok(_) => {
                log::info!("loading emblem from {}", path.display());
                loader
            }
            Err(e) => {
                let err = AssetError::Io {
                    path: path.clone(),
                    message: format!("could not start loader thread: {e}"),
                };
                Self::resolved(path, Err(err))
            }
        }
    }

    /// Loader that has already finished with `result`.
    pub fn resolved(path: impl Into<PathBuf>, result: LoadResult) -> Self {
        let (tx, loader) = Self::channel(path);
        let _ = tx.send(result);
        loader
    }

    /// Check for a result without blocking.
    ///
    /// Returns `Some` exactly once, when the load finishes. A worker that dies
    /// without reporting yields [`AssetError::Disconnected`].
    pub fn poll(&mut self) -> Option<LoadResult> {
        let receiver = self.receiver.as_ref()?;
        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(AssetError::Disconnected),
        };
        self.receiver = None;
        Some(result)
    }

    /// Stop waiting. A result that arrives later is discarded.
    pub fn cancel(&mut self) {
        if self.receiver.take().is_some() {
            log::debug!("emblem load of {} cancelled", self.path.display());
            self.cancelled = true;
        }
    }

    /// Whether a result may still arrive.
    pub fn is_waiting(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Surface parameters of the emblem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmblemMaterial {
    pub color: Vec3,
    pub emissive: Vec3,
    pub emissive_intensity: f32,
    pub metalness: f32,
    pub roughness: f32,
}

impl EmblemMaterial {
    /// Glowing metal in `color`.
    pub fn glowing(color: Vec3) -> Self {
        Self {
            color,
            emissive: color,
            emissive_intensity: 1.0,
            metalness: 0.8,
            roughness: 0.2,
        }
    }
}

/// The loaded emblem placed above the tree.
#[derive(Debug)]
pub struct Emblem {
    handle: NodeHandle,
    mesh: EmblemMesh,
    position: Vec3,
    scale: f32,
    rotation_y: f32,
    material: EmblemMaterial,
}

/// Anchor point just above the tip of a tree of `height`.
pub fn emblem_anchor(height: f32) -> Vec3 {
    Vec3::new(0.0, height + EMBLEM_LIFT, 0.0)
}

impl Emblem {
    /// Place `mesh` above the tree and attach it.
    pub fn place(
        mesh: EmblemMesh,
        params: &SceneParams,
        nodes: &mut NodeAllocator,
        graph: &mut dyn SceneGraph,
    ) -> Self {
        let handle = nodes.allocate();
        graph.attach(handle, NodeKind::Emblem);
        log::info!(
            "emblem {handle} placed: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        Self {
            handle,
            mesh,
            position: emblem_anchor(params.tree_height),
            scale: params.emblem_scale,
            rotation_y: 0.0,
            material: EmblemMaterial::glowing(params.emblem_color),
        }
    }

    /// Follow a new tree height or emblem scale.
    pub fn reanchor(&mut self, params: &SceneParams) {
        self.position = emblem_anchor(params.tree_height);
        self.scale = params.emblem_scale;
    }

    /// Spin by `rotation_speed` radians.
    pub fn advance(&mut self, rotation_speed: f32) {
        self.rotation_y += rotation_speed;
    }

    /// Re-derive base and emissive color. Safe to call every frame.
    pub fn refresh_color(&mut self, color: Vec3) {
        self.material.color = color;
        self.material.emissive = color;
    }

    pub fn detach(&self, graph: &mut dyn SceneGraph) {
        graph.detach(self.handle);
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    pub fn mesh(&self) -> &EmblemMesh {
        &self.mesh
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn rotation(&self) -> f32 {
        self.rotation_y
    }

    pub fn material(&self) -> &EmblemMaterial {
        &self.material
    }

    /// Model-to-world transform.
    pub fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.rotation_y),
            self.position,
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::graph::SceneNodes;

    /// A single triangle with no normals, lifted by a node translation.
    pub(crate) fn triangle_glb() -> Vec<u8> {
        let json = r#"{
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"nodes": [0]}],
            "nodes": [{"mesh": 0, "translation": [0.0, 1.0, 0.0]}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
            "buffers": [{"byteLength": 42}],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": 36},
                {"buffer": 0, "byteOffset": 36, "byteLength": 6}
            ],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                 "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
                {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
            ]
        }"#;

        let mut bin = Vec::new();
        for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bin.extend_from_slice(&v.to_le_bytes());
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(&bin);
        glb
    }

    pub(crate) fn triangle_mesh() -> EmblemMesh {
        EmblemMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![Vec3::Z; 3],
            vec![0, 1, 2],
        )
        .unwrap()
    }

    #[test]
    fn test_glb_triangle_is_flattened_with_node_transform() {
        let mesh = EmblemMesh::from_gltf_slice(&triangle_glb()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.positions()[0], Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(mesh.positions()[1], Vec3::new(1.0, 1.0, 0.0));
        for n in mesh.normals() {
            assert!((*n - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn test_garbage_bytes_fail_import() {
        let err = EmblemMesh::from_gltf_slice(b"not a model").unwrap_err();
        assert!(matches!(err, AssetError::Import(_)));
    }

    #[test]
    fn test_model_without_meshes_has_no_geometry() {
        let json = br#"{"asset": {"version": "2.0"}, "scenes": [{"nodes": []}]}"#;
        assert_eq!(EmblemMesh::from_gltf_slice(json), Err(AssetError::NoGeometry));
    }

    #[test]
    fn test_mesh_rejects_bad_indices() {
        let err = EmblemMesh::new(vec![Vec3::ZERO; 3], vec![Vec3::Y; 3], vec![0, 1, 5]).unwrap_err();
        assert!(matches!(err, AssetError::Import(_)));
    }

    #[test]
    fn test_missing_file_fails_with_io() {
        let mut loader = EmblemLoader::spawn("definitely/not/here.glb");
        let result = loop {
            if let Some(result) = loader.poll() {
                break result;
            }
            std::thread::yield_now();
        };
        assert!(matches!(result, Err(AssetError::Io { .. })));
        assert!(!loader.is_waiting());
        assert!(loader.poll().is_none());
    }

    #[test]
    fn test_resolved_loader_delivers_once() {
        let mut loader = EmblemLoader::resolved("star.glb", Ok(triangle_mesh()));
        assert!(loader.is_waiting());
        assert_eq!(loader.poll(), Some(Ok(triangle_mesh())));
        assert_eq!(loader.poll(), None);
    }

    #[test]
    fn test_channel_loader_stays_pending_until_sent() {
        let (tx, mut loader) = EmblemLoader::channel("star.glb");
        assert!(loader.poll().is_none());
        assert!(loader.is_waiting());
        tx.send(Err(AssetError::NoGeometry)).unwrap();
        assert_eq!(loader.poll(), Some(Err(AssetError::NoGeometry)));
    }

    #[test]
    fn test_dropped_sender_reports_disconnect() {
        let (tx, mut loader) = EmblemLoader::channel("star.glb");
        drop(tx);
        assert_eq!(loader.poll(), Some(Err(AssetError::Disconnected)));
    }

    #[test]
    fn test_cancel_discards_result() {
        let mut loader = EmblemLoader::resolved("star.glb", Ok(triangle_mesh()));
        loader.cancel();
        assert!(loader.is_cancelled());
        assert!(loader.poll().is_none());
    }

    #[test]
    fn test_emblem_sits_above_tree_and_follows_params() {
        let mut graph = SceneNodes::new();
        let mut params = SceneParams::default();
        let mut emblem = Emblem::place(triangle_mesh(), &params, &mut NodeAllocator::new(), &mut graph);
        assert!((emblem.position() - Vec3::new(0.0, 5.2, 0.0)).length() < 1e-6);
        assert_eq!(graph.count(NodeKind::Emblem), 1);

        params.tree_height = 8.0;
        params.emblem_scale = 0.5;
        emblem.reanchor(&params);
        assert!((emblem.position().y - 8.2).abs() < 1e-6);
        assert_eq!(emblem.scale(), 0.5);
    }

    #[test]
    fn test_refresh_color_sets_base_and_emissive() {
        let mut emblem = Emblem::place(
            triangle_mesh(),
            &SceneParams::default(),
            &mut NodeAllocator::new(),
            &mut SceneNodes::new(),
        );
        emblem.refresh_color(Vec3::X);
        emblem.refresh_color(Vec3::X);
        assert_eq!(emblem.material().color, Vec3::X);
        assert_eq!(emblem.material().emissive, Vec3::X);
        assert_eq!(emblem.material().metalness, 0.8);
    }
}
