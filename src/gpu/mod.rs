//! wgpu renderer for the scene.
//!
//! [`Renderer`] implements [`SceneGraph`]: attaching a node only records it,
//! and the GPU buffers for it are created on the next [`Renderer::render`]
//! from the component data the scene holds. Detaching drops them.

pub mod camera;
pub mod mesh;
pub mod points;
pub mod post_process;
pub mod shaders;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::buffer::ParticleBuffer;
use crate::error::GpuError;
use crate::graph::{NodeHandle, NodeKind, SceneGraph};
use crate::material::PointMaterial;
use crate::scene::Scene;
use crate::sprite::{circle_sprite, SPRITE_SIZE};
use camera::Camera;
use mesh::{emblem_vertices, ground_quad, MeshDraw, MeshPipeline, SurfaceUniforms};
use points::{PointDraw, PointPipelines, PointUniforms};
use post_process::PostProcessState;
use shaders::PointShader;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub(crate) const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Mirrors `Frame` in the WGSL sources.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub time: f32,
    pub viewport: [f32; 2],
    pub _pad: [f32; 2],
}

impl FrameUniforms {
    pub fn new(camera: &Camera, time: f32, width: u32, height: u32) -> Self {
        let aspect = width as f32 / height.max(1) as f32;
        Self {
            view: camera.view_matrix().to_cols_array_2d(),
            proj: camera.projection_matrix(aspect).to_cols_array_2d(),
            camera_pos: camera.position().to_array(),
            time,
            viewport: [width as f32, height as f32],
            _pad: [0.0; 2],
        }
    }
}

/// Shader that draws a point node of `kind`.
fn point_shader(kind: NodeKind) -> Option<PointShader> {
    match kind {
        NodeKind::TreeParticles => Some(PointShader::Tree),
        NodeKind::BurstParticles => Some(PointShader::Burst),
        NodeKind::FallingStar => Some(PointShader::FallingStar),
        NodeKind::Emblem => None,
    }
}

/// One point node queued for this frame's pass.
struct QueuedPoints {
    node: NodeHandle,
    shader: PointShader,
    material: PointMaterial,
}

pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: Camera,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    points: PointPipelines,
    mesh: MeshPipeline,
    post: PostProcessState,
    ground: MeshDraw,
    attached: HashMap<NodeHandle, NodeKind>,
    point_draws: HashMap<NodeHandle, PointDraw>,
    mesh_draws: HashMap<NodeHandle, MeshDraw>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoAdapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let camera = Camera::default();
        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniform Buffer"),
            contents: bytemuck::bytes_of(&FrameUniforms::new(&camera, 0.0, config.width, config.height)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let points = PointPipelines::new(&device, &queue, &frame_layout, &circle_sprite(SPRITE_SIZE));
        let mesh = MeshPipeline::new(&device, &frame_layout);
        let post = PostProcessState::new(&device, config.width, config.height, surface_format);

        let (ground_vertices, ground_indices) = ground_quad();
        let ground = mesh.create_draw(&device, "Ground", &ground_vertices, &ground_indices);
        ground.write_uniforms(&queue, &SurfaceUniforms::ground());

        Ok(Self {
            surface,
            device,
            queue,
            config,
            camera,
            frame_buffer,
            frame_bind_group,
            points,
            mesh,
            post,
            ground,
            attached: HashMap::new(),
            point_draws: HashMap::new(),
            mesh_draws: HashMap::new(),
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.post.resize(&self.device, new_size.width, new_size.height);
        }
    }

    /// Reconfigure the surface at its current size, after it was lost.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Number of nodes the renderer currently draws.
    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    /// Make sure an attached point node has a draw and current uniforms,
    /// and queue it for this frame. `dirty` re-uploads the particles.
    fn prepare_points(
        &mut self,
        node: NodeHandle,
        material: &PointMaterial,
        model: Mat4,
        particles: &ParticleBuffer,
        dirty: bool,
        queued: &mut Vec<QueuedPoints>,
    ) {
        let Some(shader) = self.attached.get(&node).copied().and_then(point_shader) else {
            return;
        };
        self.points.prepare(&self.device, shader, material);

        let draw = match self.point_draws.entry(node) {
            Entry::Occupied(entry) => {
                let draw = entry.into_mut();
                if dirty {
                    draw.write_instances(&self.queue, particles);
                }
                draw
            }
            Entry::Vacant(entry) => {
                entry.insert(self.points.create_draw(&self.device, shader.label(), particles))
            }
        };
        draw.write_uniforms(&self.queue, &PointUniforms::new(material, model));
        queued.push(QueuedPoints {
            node,
            shader,
            material: *material,
        });
    }

    /// Upload what changed in `scene` and draw one frame.
    pub fn render(&mut self, scene: &mut Scene) -> Result<(), wgpu::SurfaceError> {
        self.camera.update();
        let frame = FrameUniforms::new(&self.camera, scene.time(), self.config.width, self.config.height);
        self.queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));
        self.post.update(&self.queue, &scene.params().post_processing);

        let mut queued = Vec::new();

        // Tree and burst particles never change after creation; a rebuild
        // arrives as a new node.
        let tree = scene.tree();
        let model = Mat4::from_rotation_y(tree.rotation());
        self.prepare_points(tree.handle(), tree.material(), model, tree.buffer(), false, &mut queued);

        if let Some(burst) = scene.burst() {
            let model = Mat4::from_rotation_translation(Quat::from_rotation_y(burst.rotation()), burst.anchor());
            self.prepare_points(burst.handle(), burst.material(), model, burst.buffer(), false, &mut queued);
        }

        let star_material = *scene.stars().material();
        for star in scene.stars_mut().active_mut() {
            let dirty = star.buffer_mut().take_upload();
            self.prepare_points(star.handle(), &star_material, Mat4::IDENTITY, star.buffer(), dirty, &mut queued);
        }

        let mut emblem_node = None;
        if let Some(emblem) = scene.emblem() {
            let handle = emblem.handle();
            if self.attached.contains_key(&handle) {
                if !self.mesh_draws.contains_key(&handle) {
                    let vertices = emblem_vertices(emblem.mesh());
                    let draw = self.mesh.create_draw(&self.device, "Emblem", &vertices, emblem.mesh().indices());
                    self.mesh_draws.insert(handle, draw);
                }
                if let Some(draw) = self.mesh_draws.get(&handle) {
                    draw.write_uniforms(&self.queue, &SurfaceUniforms::for_emblem(emblem));
                    emblem_node = Some(handle);
                }
            }
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.post.scene_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.post.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_bind_group(0, &self.frame_bind_group, &[]);

            // Opaque first, then the translucent ground, then glowing points.
            if let Some(draw) = emblem_node.and_then(|node| self.mesh_draws.get(&node)) {
                draw.draw(&mut pass, self.mesh.opaque());
            }
            self.ground.draw(&mut pass, self.mesh.translucent());

            for item in &queued {
                let (Some(draw), Some(pipeline)) = (
                    self.point_draws.get(&item.node),
                    self.points.get(item.shader, &item.material),
                ) else {
                    continue;
                };
                draw.draw(&mut pass, pipeline);
            }
        }

        self.post.run(&mut encoder, &view);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

impl SceneGraph for Renderer {
    fn attach(&mut self, node: NodeHandle, kind: NodeKind) {
        log::trace!("attach {} {node}", kind.label());
        self.attached.insert(node, kind);
    }

    fn detach(&mut self, node: NodeHandle) {
        if let Some(kind) = self.attached.remove(&node) {
            log::trace!("detach {} {node}", kind.label());
        }
        self.point_draws.remove(&node);
        self.mesh_draws.remove(&node);
    }

    fn is_attached(&self, node: NodeHandle) -> bool {
        self.attached.contains_key(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_frame_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 160);
    }

    #[test]
    fn test_every_point_kind_has_a_shader() {
        assert_eq!(point_shader(NodeKind::TreeParticles), Some(PointShader::Tree));
        assert_eq!(point_shader(NodeKind::BurstParticles), Some(PointShader::Burst));
        assert_eq!(point_shader(NodeKind::FallingStar), Some(PointShader::FallingStar));
        assert_eq!(point_shader(NodeKind::Emblem), None);
    }

    #[test]
    fn test_frame_uniforms_carry_camera() {
        let camera = Camera::default();
        let frame = FrameUniforms::new(&camera, 1.5, 800, 600);
        assert_eq!(frame.time, 1.5);
        assert_eq!(frame.viewport, [800.0, 600.0]);
        assert!((Vec3::from_array(frame.camera_pos) - camera.position()).length() < 1e-5);
    }
}
