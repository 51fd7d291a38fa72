//! Blur and composite passes.
//!
//! The circle layer is rendered into a full-resolution offscreen texture,
//! blurred with a separable gaussian on a downscaled ping-pong pair, and
//! composited over the solid background color. Running the blur at reduced
//! resolution keeps the kernel small even for a large blur radius.

use winit::dpi::PhysicalSize;

/// Blur targets are this many times smaller than the surface.
const BLUR_DOWNSCALE: u32 = 8;
/// Kernel half-width, in sigmas. Three sigmas cover 99.7% of the weight.
const SUPPORT_SIGMAS: f32 = 3.0;

/// Matches `BlurParams` in postfx.wgsl.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurParams {
    texel: [f32; 2],
    sigma: f32,
    support: f32,
}

impl BlurParams {
    /// `axis` is a unit step along the blur direction; `extent` the blur
    /// target's dimension along that axis.
    fn new(blur_radius: f32, axis: [f32; 2], extent: u32) -> Self {
        let sigma = (blur_radius * 0.5 / BLUR_DOWNSCALE as f32).max(1.0);
        Self {
            texel: [axis[0] / extent as f32, axis[1] / extent as f32],
            sigma,
            support: (sigma * SUPPORT_SIGMAS).ceil(),
        }
    }
}

/// Size-dependent resources, rebuilt on every resize.
struct FxTargets {
    scene_view: wgpu::TextureView,
    blur_a_view: wgpu::TextureView,
    blur_b_view: wgpu::TextureView,
    /// scene -> blur_a, horizontal axis.
    blur_h_group: wgpu::BindGroup,
    /// blur_a -> blur_b, vertical axis.
    blur_v_group: wgpu::BindGroup,
    /// blur_b -> surface.
    composite_group: wgpu::BindGroup,
}

pub struct PostFx {
    blur_radius: f32,
    format: wgpu::TextureFormat,
    sampler: wgpu::Sampler,
    blur_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    blur_h_params: wgpu::Buffer,
    blur_v_params: wgpu::Buffer,
    targets: FxTargets,
}

impl PostFx {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        blur_radius: f32,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("PostFx Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("postfx.wgsl").into()),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("PostFx Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let texture_entry = wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };

        let blur_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                texture_entry,
                sampler_entry,
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
            label: Some("blur bind group layout"),
        });

        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[texture_entry, sampler_entry],
            label: Some("composite bind group layout"),
        });

        let blur_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Blur Pipeline Layout"),
                bind_group_layouts: &[&blur_layout],
                push_constant_ranges: &[],
            });
        let blur_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blur Pipeline"),
            layout: Some(&blur_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_fullscreen",
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_blur",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let composite_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Composite Pipeline Layout"),
                bind_group_layouts: &[&composite_layout],
                push_constant_ranges: &[],
            });
        let composite_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Composite Pipeline"),
            layout: Some(&composite_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_fullscreen",
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_composite",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let blur_h_params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Blur H Params"),
            size: std::mem::size_of::<BlurParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let blur_v_params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Blur V Params"),
            size: std::mem::size_of::<BlurParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let targets = Self::create_targets(
            device,
            queue,
            format,
            size,
            blur_radius,
            &sampler,
            &blur_layout,
            &composite_layout,
            &blur_h_params,
            &blur_v_params,
        );

        Self {
            blur_radius,
            format,
            sampler,
            blur_layout,
            composite_layout,
            blur_pipeline,
            composite_pipeline,
            blur_h_params,
            blur_v_params,
            targets,
        }
    }

    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: PhysicalSize<u32>,
    ) {
        self.targets = Self::create_targets(
            device,
            queue,
            self.format,
            size,
            self.blur_radius,
            &self.sampler,
            &self.blur_layout,
            &self.composite_layout,
            &self.blur_h_params,
            &self.blur_v_params,
        );
    }

    /// Render target for the circle layer.
    pub fn scene_view(&self) -> &wgpu::TextureView {
        &self.targets.scene_view
    }

    #[allow(clippy::too_many_arguments)]
    fn create_targets(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        blur_radius: f32,
        sampler: &wgpu::Sampler,
        blur_layout: &wgpu::BindGroupLayout,
        composite_layout: &wgpu::BindGroupLayout,
        blur_h_params: &wgpu::Buffer,
        blur_v_params: &wgpu::Buffer,
    ) -> FxTargets {
        let width = size.width.max(1);
        let height = size.height.max(1);
        let blur_width = (width / BLUR_DOWNSCALE).max(1);
        let blur_height = (height / BLUR_DOWNSCALE).max(1);

        let scene_view = color_target(device, format, width, height, "Scene Texture");
        let blur_a_view = color_target(device, format, blur_width, blur_height, "Blur A Texture");
        let blur_b_view = color_target(device, format, blur_width, blur_height, "Blur B Texture");

        queue.write_buffer(
            blur_h_params,
            0,
            bytemuck::bytes_of(&BlurParams::new(blur_radius, [1.0, 0.0], blur_width)),
        );
        queue.write_buffer(
            blur_v_params,
            0,
            bytemuck::bytes_of(&BlurParams::new(blur_radius, [0.0, 1.0], blur_height)),
        );

        let blur_h_group = blur_group(
            device,
            blur_layout,
            sampler,
            &scene_view,
            blur_h_params,
            "blur h bind group",
        );
        let blur_v_group = blur_group(
            device,
            blur_layout,
            sampler,
            &blur_a_view,
            blur_v_params,
            "blur v bind group",
        );

        let composite_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: composite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&blur_b_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some("composite bind group"),
        });

        FxTargets {
            scene_view,
            blur_a_view,
            blur_b_view,
            blur_h_group,
            blur_v_group,
            composite_group,
        }
    }

    /// Blurs the scene texture and composites it over `background` into the
    /// surface view.
    pub fn blur_and_composite(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        background: wgpu::Color,
    ) {
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blur Horizontal Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.blur_a_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            pass.set_pipeline(&self.blur_pipeline);
            pass.set_bind_group(0, &self.targets.blur_h_group, &[]);
            pass.draw(0..3, 0..1);
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blur Vertical Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.blur_b_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            pass.set_pipeline(&self.blur_pipeline);
            pass.set_bind_group(0, &self.targets.blur_v_group, &[]);
            pass.draw(0..3, 0..1);
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Composite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(background),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            pass.set_pipeline(&self.composite_pipeline);
            pass.set_bind_group(0, &self.targets.composite_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }
}

fn blur_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    src: &wgpu::TextureView,
    params: &wgpu::Buffer,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(src),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: params.as_entire_binding(),
            },
        ],
        label: Some(label),
    })
}

fn color_target(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    label: &str,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
