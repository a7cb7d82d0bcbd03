//! Lit solid geometry: the emblem and the ground plane.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use super::shaders::MESH;
use super::{DEPTH_FORMAT, HDR_FORMAT};
use crate::emblem::{Emblem, EmblemMesh};

/// Side length of the square ground plane.
pub const GROUND_SIZE: f32 = 20.0;
/// Height of the ground, just under the tree base.
pub const GROUND_Y: f32 = -0.1;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Mirrors `Surface` in `mesh.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SurfaceUniforms {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 3],
    pub metalness: f32,
    pub emissive: [f32; 3],
    pub roughness: f32,
    pub emissive_intensity: f32,
    pub opacity: f32,
    pub _pad: [f32; 2],
}

impl SurfaceUniforms {
    pub fn for_emblem(emblem: &Emblem) -> Self {
        let m = emblem.material();
        Self {
            model: emblem.transform().to_cols_array_2d(),
            color: m.color.to_array(),
            metalness: m.metalness,
            emissive: m.emissive.to_array(),
            roughness: m.roughness,
            emissive_intensity: m.emissive_intensity,
            opacity: 1.0,
            _pad: [0.0; 2],
        }
    }

    /// Dark, glossy, translucent floor.
    pub fn ground() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            color: [0.0056; 3], // #111111, linear
            metalness: 0.8,
            emissive: [0.0; 3],
            roughness: 0.3,
            emissive_intensity: 0.0,
            opacity: 0.7,
            _pad: [0.0; 2],
        }
    }
}

/// Interleave an emblem mesh into vertices.
pub fn emblem_vertices(mesh: &EmblemMesh) -> Vec<MeshVertex> {
    mesh.positions()
        .iter()
        .zip(mesh.normals())
        .map(|(p, n)| MeshVertex {
            position: p.to_array(),
            normal: n.to_array(),
        })
        .collect()
}

/// Two triangles facing up, centred on the origin.
pub fn ground_quad() -> (Vec<MeshVertex>, Vec<u32>) {
    let h = GROUND_SIZE / 2.0;
    let up = Vec3::Y.to_array();
    let vertices = [(-h, -h), (h, -h), (h, h), (-h, h)]
        .iter()
        .map(|&(x, z)| MeshVertex {
            position: [x, GROUND_Y, z],
            normal: up,
        })
        .collect();
    // Counter-clockwise seen from above.
    (vertices, vec![0, 3, 2, 0, 2, 1])
}

/// Pipelines for opaque and translucent surfaces.
pub struct MeshPipeline {
    surface_layout: wgpu::BindGroupLayout,
    opaque: wgpu::RenderPipeline,
    translucent: wgpu::RenderPipeline,
}

impl MeshPipeline {
    pub fn new(device: &wgpu::Device, frame_layout: &wgpu::BindGroupLayout) -> Self {
        let surface_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Surface Layout"),
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
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[frame_layout, &surface_layout],
            push_constant_ranges: &[],
        });
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(MESH.into()),
        });

        let build = |label: &str, blend: Option<wgpu::BlendState>, depth_write: bool| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: HDR_FORMAT,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    // glTF winding is not guaranteed across exporters.
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: depth_write,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let opaque = build("Opaque Mesh Pipeline", Some(wgpu::BlendState::REPLACE), true);
        let translucent = build(
            "Translucent Mesh Pipeline",
            Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
            false,
        );

        Self {
            surface_layout,
            opaque,
            translucent,
        }
    }

    pub fn create_draw(&self, device: &wgpu::Device, label: &str, vertices: &[MeshVertex], indices: &[u32]) -> MeshDraw {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<SurfaceUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.surface_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        MeshDraw {
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            bind_group,
            index_count: indices.len() as u32,
        }
    }

    pub fn opaque(&self) -> &wgpu::RenderPipeline {
        &self.opaque
    }

    pub fn translucent(&self) -> &wgpu::RenderPipeline {
        &self.translucent
    }
}

/// GPU side of one mesh.
pub struct MeshDraw {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    index_count: u32,
}

impl MeshDraw {
    pub fn write_uniforms(&self, queue: &wgpu::Queue, uniforms: &SurfaceUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, pipeline: &wgpu::RenderPipeline) {
        pass.set_pipeline(pipeline);
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}
