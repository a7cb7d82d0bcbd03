//! Bloom and tone mapping.
//!
//! The scene is rendered into an HDR offscreen texture. Bright areas are
//! extracted into a half-resolution texture, blurred horizontally then
//! vertically, and added back over the scene before exposure and ACES
//! tone mapping write the result to the surface.

use bytemuck::{Pod, Zeroable};

use super::shaders::{BLOOM, COMPOSITE};
use super::{DEPTH_FORMAT, HDR_FORMAT};
use crate::config::PostProcessParams;

/// Mirrors `Bloom` in `bloom.wgsl` and `composite.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct BloomUniforms {
    pub texel: [f32; 2],
    pub direction: [f32; 2],
    pub threshold: f32,
    pub radius: f32,
    pub strength: f32,
    pub exposure: f32,
}

/// Size of the blur textures for a `width` x `height` scene.
pub fn half_extent(width: u32, height: u32) -> (u32, u32) {
    ((width / 2).max(1), (height / 2).max(1))
}

/// Uniforms for the bright, horizontal, vertical and composite passes.
pub fn pass_uniforms(params: &PostProcessParams, width: u32, height: u32) -> [BloomUniforms; 4] {
    let (hw, hh) = half_extent(width, height);
    let base = BloomUniforms {
        texel: [1.0 / hw as f32, 1.0 / hh as f32],
        direction: [0.0, 0.0],
        threshold: params.bloom_threshold,
        radius: params.bloom_radius,
        strength: params.bloom_strength,
        exposure: params.exposure,
    };
    [
        base,
        BloomUniforms {
            direction: [1.0, 0.0],
            ..base
        },
        BloomUniforms {
            direction: [0.0, 1.0],
            ..base
        },
        base,
    ]
}

fn color_target(device: &wgpu::Device, label: &str, width: u32, height: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HDR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

/// Size-dependent textures and the bind groups reading them.
struct Targets {
    width: u32,
    height: u32,
    scene: wgpu::TextureView,
    depth: wgpu::TextureView,
    ping: wgpu::TextureView,
    pong: wgpu::TextureView,
    bright_group: wgpu::BindGroup,
    blur_h_group: wgpu::BindGroup,
    blur_v_group: wgpu::BindGroup,
    composite_group: wgpu::BindGroup,
}

/// GPU resources for the bloom chain.
pub struct PostProcessState {
    bloom_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniforms: [wgpu::Buffer; 4],
    bright: wgpu::RenderPipeline,
    blur: wgpu::RenderPipeline,
    composite: wgpu::RenderPipeline,
    targets: Targets,
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    module: &wgpu::ShaderModule,
    fragment_entry: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

impl PostProcessState {
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let bloom_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Bind Group Layout"),
            entries: &[texture_entry(0), sampler_entry(1), uniform_entry(2)],
        });
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Bind Group Layout"),
            entries: &[texture_entry(0), texture_entry(1), sampler_entry(2), uniform_entry(3)],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Post-Process Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniforms = ["Bright", "Blur H", "Blur V", "Composite"].map(|name| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(name),
                size: std::mem::size_of::<BloomUniforms>() as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let bloom_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bloom Shader"),
            source: wgpu::ShaderSource::Wgsl(BLOOM.into()),
        });
        let composite_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Composite Shader"),
            source: wgpu::ShaderSource::Wgsl(COMPOSITE.into()),
        });

        let bright = fullscreen_pipeline(device, "Bright Pipeline", &bloom_layout, &bloom_module, "fs_bright", HDR_FORMAT);
        let blur = fullscreen_pipeline(device, "Blur Pipeline", &bloom_layout, &bloom_module, "fs_blur", HDR_FORMAT);
        let composite = fullscreen_pipeline(
            device,
            "Composite Pipeline",
            &composite_layout,
            &composite_module,
            "fs_main",
            surface_format,
        );

        let targets = Self::create_targets(
            device,
            &bloom_layout,
            &composite_layout,
            &sampler,
            &uniforms,
            width,
            height,
        );

        Self {
            bloom_layout,
            composite_layout,
            sampler,
            uniforms,
            bright,
            blur,
            composite,
            targets,
        }
    }

    fn create_targets(
        device: &wgpu::Device,
        bloom_layout: &wgpu::BindGroupLayout,
        composite_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        uniforms: &[wgpu::Buffer; 4],
        width: u32,
        height: u32,
    ) -> Targets {
        let (hw, hh) = half_extent(width, height);
        let scene = color_target(device, "HDR Scene Texture", width, height);
        let ping = color_target(device, "Bloom Ping Texture", hw, hh);
        let pong = color_target(device, "Bloom Pong Texture", hw, hh);
        let depth = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Offscreen Depth Texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        let bloom_group = |label: &str, source: &wgpu::TextureView, uniform: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: bloom_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniform.as_entire_binding(),
                    },
                ],
            })
        };

        let bright_group = bloom_group("Bright Bind Group", &scene, &uniforms[0]);
        let blur_h_group = bloom_group("Blur H Bind Group", &ping, &uniforms[1]);
        let blur_v_group = bloom_group("Blur V Bind Group", &pong, &uniforms[2]);
        let composite_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Bind Group"),
            layout: composite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&scene),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&ping),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: uniforms[3].as_entire_binding(),
                },
            ],
        });

        Targets {
            width,
            height,
            scene,
            depth,
            ping,
            pong,
            bright_group,
            blur_h_group,
            blur_v_group,
            composite_group,
        }
    }

    /// Recreate textures and bind groups after window resize.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.targets = Self::create_targets(
            device,
            &self.bloom_layout,
            &self.composite_layout,
            &self.sampler,
            &self.uniforms,
            width,
            height,
        );
    }

    /// Upload bloom settings for the current size.
    pub fn update(&self, queue: &wgpu::Queue, params: &PostProcessParams) {
        let passes = pass_uniforms(params, self.targets.width, self.targets.height);
        for (buffer, uniforms) in self.uniforms.iter().zip(passes.iter()) {
            queue.write_buffer(buffer, 0, bytemuck::bytes_of(uniforms));
        }
    }

    /// HDR color target the scene is drawn into.
    pub fn scene_view(&self) -> &wgpu::TextureView {
        &self.targets.scene
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.targets.depth
    }

    /// Extract, blur and composite onto `target`.
    pub fn run(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let t = &self.targets;
        fullscreen_pass(encoder, "Bright Pass", &self.bright, &t.bright_group, &t.ping);
        fullscreen_pass(encoder, "Blur H Pass", &self.blur, &t.blur_h_group, &t.pong);
        fullscreen_pass(encoder, "Blur V Pass", &self.blur, &t.blur_v_group, &t.ping);
        fullscreen_pass(encoder, "Composite Pass", &self.composite, &t.composite_group, target);
    }
}

fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
    target: &wgpu::TextureView,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<BloomUniforms>(), 32);
    }

    #[test]
    fn test_half_extent_never_zero() {
        assert_eq!(half_extent(1280, 720), (640, 360));
        assert_eq!(half_extent(1, 1), (1, 1));
    }

    #[test]
    fn test_pass_uniforms_set_blur_directions() {
        let params = PostProcessParams::default();
        let [bright, h, v, composite] = pass_uniforms(&params, 800, 600);
        assert_eq!(bright.direction, [0.0, 0.0]);
        assert_eq!(h.direction, [1.0, 0.0]);
        assert_eq!(v.direction, [0.0, 1.0]);
        assert_eq!(composite.strength, params.bloom_strength);
        assert_eq!(h.texel, [1.0 / 400.0, 1.0 / 300.0]);
        assert_eq!(bright.threshold, params.bloom_threshold);
    }
}
