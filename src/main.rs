//! Animated lava-lamp background: a handful of oversized colored circles
//! drift to new random positions every few seconds, heavily blurred and
//! composited over a solid backdrop.

mod animator;
mod blur;
mod driver;
mod instance;
mod transition;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Context;
use wgpu::util::DeviceExt;
use winit::{
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::Window,
    window::WindowBuilder,
};

use animator::{Animator, Color};
use blur::PostFx;
use driver::TickDriver;
use instance::{srgb_to_linear, CircleInstance};
use transition::TransitionTable;

/// How long each drift takes, ease-in-out.
const ANIMATION_DURATION: Duration = Duration::from_secs(4);
/// How often new target positions are drawn.
const TICK_INTERVAL: Duration = Duration::from_secs(3);
/// Gaussian blur radius over the composed circle layer, in pixels.
const BLUR_RADIUS: f32 = 130.0;

/// One circle per entry, sRGB with alpha.
const PALETTE: [Color; 5] = [
    [0.251, 0.878, 0.816, 0.6], // Turquoise
    [0.282, 0.239, 0.545, 1.0], // DarkSlateBlue
    [0.529, 0.808, 0.922, 0.7], // SkyBlue
    [1.0, 0.714, 0.757, 1.0],   // LightPink
    [0.678, 0.847, 0.902, 1.0], // LightBlue
];

/// MidnightBlue, painted behind the blurred circles.
const BACKGROUND: Color = [0.098, 0.098, 0.439, 1.0];

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pub position: [f32; 2],
}

const SQUARE_SHAPE: &[Vertex] = &[
    Vertex { position: [-1.0, -1.0] },
    Vertex { position: [ 1.0, -1.0] },
    Vertex { position: [ 1.0,  1.0] },
    Vertex { position: [ 1.0,  1.0] },
    Vertex { position: [-1.0,  1.0] },
    Vertex { position: [-1.0, -1.0] },
];

struct State {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    window: Window,
    scene_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    params_bind_group: wgpu::BindGroup,
    circle_buffer: wgpu::Buffer,
    circle_bind_group: wgpu::BindGroup,
    postfx: PostFx,

    animator: Animator,
    transitions: Rc<RefCell<TransitionTable>>,
    driver: TickDriver,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("wgpu_core", log::LevelFilter::Warn)
        .filter_module("wgpu_hal", log::LevelFilter::Warn)
        .filter_module("naga", log::LevelFilter::Warn)
        .init();

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("lavalamp")
        .build(&event_loop)
        .context("failed to create window")?;
    let mut state = pollster::block_on(State::new(window))?;

    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == state.window().id() => match event {
            WindowEvent::CloseRequested => {
                state.teardown();
                *control_flow = ControlFlow::Exit;
            }
            WindowEvent::KeyboardInput { input, .. } => {
                if let Some(VirtualKeyCode::Escape) = input.virtual_keycode {
                    state.teardown();
                    *control_flow = ControlFlow::Exit;
                }
            }
            WindowEvent::Occluded(occluded) => state.set_visible(!*occluded),
            WindowEvent::Resized(physical_size) => {
                state.resize(*physical_size);
            }
            WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                state.resize(**new_inner_size);
            }
            _ => {}
        },
        Event::RedrawRequested(window_id) if window_id == state.window().id() => {
            state.update();
            match state.render() {
                Ok(_) => {}
                // Reconfigure the surface if lost
                Err(wgpu::SurfaceError::Lost) => state.resize(state.size),
                // The system is out of memory, we should probably quit
                Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                // All other errors (Outdated, Timeout) should be resolved by the next frame
                Err(e) => log::warn!("surface error: {e:?}"),
            }
        }
        Event::MainEventsCleared => {
            state.window().request_redraw();
        }
        _ => {}
    });
}

impl State {
    // Creating some of the wgpu types requires async code
    async fn new(window: Window) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            dx12_shader_compiler: Default::default(),
        });

        // # Safety
        //
        // The surface needs to live as long as the window that created it.
        // State owns the window so this should be safe.
        let surface = unsafe { instance.create_surface(&window) }
            .context("failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter")?;
        log::info!("using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                    label: None,
                },
                None,
            )
            .await
            .context("failed to acquire device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let now = Instant::now();
        let animator = Animator::new(&PALETTE);

        let transitions = Rc::new(RefCell::new(TransitionTable::new(ANIMATION_DURATION)));
        transitions.borrow_mut().seed(animator.circles(), now);

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Params Buffer"),
            contents: bytemuck::cast_slice(&[size.width as f32, size.height as f32, 0.0, 0.0]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // Rewritten every frame with the displayed (interpolated) positions.
        let circle_count = animator.circles().len();
        let circle_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Circle Buffer"),
            size: (circle_count.max(1) * std::mem::size_of::<CircleInstance>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let params_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("params bind group layout"),
            });

        let circle_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("circle bind group layout"),
            });

        let params_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &params_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            }],
            label: Some("params bind group"),
        });

        let circle_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &circle_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: circle_buffer.as_entire_binding(),
            }],
            label: Some("circle bind group"),
        });

        let scene_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Scene Pipeline Layout"),
                bind_group_layouts: &[&params_bind_group_layout, &circle_bind_group_layout],
                push_constant_ranges: &[],
            });

        let scene_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&scene_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[Vertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(SQUARE_SHAPE),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let postfx = PostFx::new(&device, &queue, config.format, size, BLUR_RADIUS);

        let mut state = Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            scene_pipeline,
            vertex_buffer,
            params_buffer,
            params_bind_group,
            circle_buffer,
            circle_bind_group,
            postfx,
            animator,
            transitions,
            driver: TickDriver::new(TICK_INTERVAL),
        };

        // The observer keeps the transition table pointed at the animator's
        // latest targets; the window counts as visible from here on.
        let table = Rc::clone(&state.transitions);
        state.animator.subscribe(move |circles| {
            table.borrow_mut().retarget_all(circles, Instant::now());
        });
        state.driver.start(now);

        Ok(state)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.postfx.resize(&self.device, &self.queue, new_size);
            self.queue.write_buffer(
                &self.params_buffer,
                0,
                bytemuck::cast_slice(&[
                    new_size.width as f32,
                    new_size.height as f32,
                    0.0,
                    0.0,
                ]),
            );
        }
    }

    /// Mirrors view appear/disappear: arms the periodic trigger (with an
    /// immediate first tick) when shown, cancels it when hidden.
    fn set_visible(&mut self, visible: bool) {
        if visible && !self.driver.is_running() {
            log::debug!("window visible, starting animation");
            self.driver.start(Instant::now());
        } else if !visible && self.driver.is_running() {
            log::debug!("window occluded, stopping animation");
            self.driver.stop();
        }
    }

    fn teardown(&mut self) {
        self.driver.stop();
    }

    fn update(&mut self) {
        let now = Instant::now();

        for _ in 0..self.driver.poll(now) {
            self.animator.tick();
        }

        let transitions = self.transitions.borrow();
        let instances: Vec<CircleInstance> = self
            .animator
            .circles()
            .iter()
            .map(|circle| {
                let pos = transitions.sample(circle.id, now).unwrap_or(circle.pos);
                CircleInstance::new(pos, circle.color)
            })
            .collect();

        if !instances.is_empty() {
            self.queue
                .write_buffer(&self.circle_buffer, 0, bytemuck::cast_slice(&instances));
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
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
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.postfx.scene_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            let circle_count = self.animator.circles().len() as u32;
            if circle_count > 0 {
                render_pass.set_pipeline(&self.scene_pipeline);
                render_pass.set_bind_group(0, &self.params_bind_group, &[]);
                render_pass.set_bind_group(1, &self.circle_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                render_pass.draw(0..6, 0..circle_count);
            }
        }

        self.postfx
            .blur_and_composite(&mut encoder, &view, background_clear());

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

/// Background as a linear clear color for the sRGB surface.
fn background_clear() -> wgpu::Color {
    wgpu::Color {
        r: srgb_to_linear(BACKGROUND[0]) as f64,
        g: srgb_to_linear(BACKGROUND[1]) as f64,
        b: srgb_to_linear(BACKGROUND[2]) as f64,
        a: BACKGROUND[3] as f64,
    }
}

impl Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            }],
        }
    }
}
