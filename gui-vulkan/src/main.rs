use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use life::{Button, Canvas, Config, Controller, FrameSink, InputEvent, Pending, TITLE};
use wgpu::StoreOp;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

const CANVAS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

struct State {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    texture_size: wgpu::Extent3d,
}

impl State {
    async fn new(window: Arc<Window>, canvas_size: (u32, u32)) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::VULKAN,
            flags: wgpu::InstanceFlags::from_env_or_default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let surface = instance.create_surface(window.clone()).context("create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("request adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::default(),
            })
            .await
            .context("request device")?;

        let capabilities = surface.get_capabilities(&adapter);
        let surface_format = capabilities
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or(capabilities.formats[0]);
        let present_mode = capabilities
            .present_modes
            .iter()
            .copied()
            .find(|mode| matches!(mode, wgpu::PresentMode::Mailbox))
            .unwrap_or(wgpu::PresentMode::Fifo);

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: capabilities.alpha_modes[0],
            desired_maximum_frame_latency: 1,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("canvas_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("canvas_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
            ],
        });

        let (texture, texture_size) = create_canvas_texture(&device, canvas_size);
        let bind_group = create_bind_group(&device, &bind_group_layout, &sampler, &texture);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("canvas_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            instance,
            surface,
            device,
            queue,
            config,
            size,
            pipeline,
            bind_group_layout,
            sampler,
            texture,
            bind_group,
            texture_size,
        })
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Copy RGBA canvas pixels into the texture, recreating it if the canvas changed size.
    fn upload(&mut self, rgba: &[u8], canvas_size: (u32, u32)) {
        if (self.texture_size.width, self.texture_size.height) != canvas_size {
            let (texture, texture_size) = create_canvas_texture(&self.device, canvas_size);
            self.bind_group = create_bind_group(&self.device, &self.bind_group_layout, &self.sampler, &texture);
            self.texture = texture;
            self.texture_size = texture_size;
        }

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.texture_size.width),
                rows_per_image: Some(self.texture_size.height),
            },
            self.texture_size,
        );
    }

    fn render(&mut self) -> std::result::Result<(), wgpu::SurfaceError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err) => {
                match err {
                    wgpu::SurfaceError::Lost => {
                        self.surface.configure(&self.device, &self.config);
                    }
                    wgpu::SurfaceError::OutOfMemory => return Err(err),
                    _ => {}
                }
                self.surface.get_current_texture()?
            }
        };

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("encoder") });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn create_canvas_texture(device: &wgpu::Device, (width, height): (u32, u32)) -> (wgpu::Texture, wgpu::Extent3d) {
    let size = wgpu::Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("canvas_texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: CANVAS_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    (texture, size)
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    texture: &wgpu::Texture,
) -> wgpu::BindGroup {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("canvas_bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&view),
            },
        ],
    })
}

/// Keeps an RGBA copy of the latest canvas and asks the window to redraw.
struct WindowSink {
    window: Arc<Window>,
    rgba: Vec<u8>,
    canvas_size: (u32, u32),
    dirty: bool,
}

impl WindowSink {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            rgba: Vec::new(),
            canvas_size: (0, 0),
            dirty: false,
        }
    }
}

impl FrameSink for WindowSink {
    fn repaint(&mut self, canvas: &Canvas) {
        self.rgba.resize(canvas.pixels().len() * 4, 0);
        canvas.write_rgba(&mut self.rgba);
        self.canvas_size = (canvas.width() as u32, canvas.height() as u32);
        self.dirty = true;
        self.window.request_redraw();
    }
}

fn key_matches(event: &KeyEvent, target: &str) -> bool {
    match &event.logical_key {
        Key::Named(NamedKey::Space) => target.eq_ignore_ascii_case("SPACE"),
        Key::Character(text) => text.eq_ignore_ascii_case(target),
        _ => false,
    }
}

fn to_button(button: MouseButton) -> Option<Button> {
    match button {
        MouseButton::Left => Some(Button::Primary),
        MouseButton::Right => Some(Button::Secondary),
        MouseButton::Middle => Some(Button::Middle),
        _ => None,
    }
}

fn scroll_steps(delta: MouseScrollDelta) -> i32 {
    let y = match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => position.y as f32,
    };
    if y == 0.0 {
        0
    } else {
        y.signum() as i32 * (y.abs().round() as i32).max(1)
    }
}

struct VulkanApp {
    life_config: Config,
    window_attrs: WindowAttributes,
    window: Option<Arc<Window>>,
    window_id: Option<WindowId>,
    state: Option<State>,
    controller: Option<Controller<WindowSink>>,
    /// Stepped generation waiting for its redraw, and when the wait started.
    pending: Option<(Pending, Instant)>,
    last_cursor: [f32; 2],
}

impl VulkanApp {
    fn new(life_config: Config) -> Self {
        let attrs = Window::default_attributes()
            .with_title(format!("{TITLE} - Vulkan"))
            .with_inner_size(PhysicalSize::new(
                (life_config.width * life_config.scale) as u32,
                (life_config.height * life_config.scale) as u32,
            ));
        Self {
            life_config,
            window_attrs: attrs,
            window: None,
            window_id: None,
            state: None,
            controller: None,
            pending: None,
            last_cursor: [0.0, 0.0],
        }
    }

    /// Window pixels to canvas pixels; the canvas is stretched over the whole window.
    fn canvas_position(&self, position: [f32; 2]) -> [f32; 2] {
        let (Some(state), Some(controller)) = (self.state.as_ref(), self.controller.as_ref()) else {
            return position;
        };
        let canvas = controller.canvas();
        [
            position[0] * canvas.width() as f32 / state.size.width.max(1) as f32,
            position[1] * canvas.height() as f32 / state.size.height.max(1) as f32,
        ]
    }

    fn set_title(&self, label: &str) {
        if let Some(window) = &self.window {
            window.set_title(label);
        }
    }

    fn dispatch(&mut self, event: InputEvent) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        if let Some(label) = controller.handle(event) {
            self.set_title(&label);
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = Arc::new(event_loop.create_window(self.window_attrs.clone()).context("create window")?);
        let canvas_size = (
            (self.life_config.width * self.life_config.scale) as u32,
            (self.life_config.height * self.life_config.scale) as u32,
        );
        let state = pollster::block_on(State::new(window.clone(), canvas_size))?;
        let controller = Controller::new(&self.life_config, WindowSink::new(window.clone()))?;
        window.set_title(&controller.status_label());

        self.window_id = Some(window.id());
        self.window = Some(window);
        self.state = Some(state);
        self.controller = Some(controller);
        Ok(())
    }
}

impl ApplicationHandler<()> for VulkanApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            log::error!("failed to start: {err:#}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if Some(window_id) != self.window_id {
            return;
        }
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(state) = self.state.as_mut() {
                    state.resize(size);
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.last_cursor = [position.x as f32, position.y as f32];
                let at = self.canvas_position(self.last_cursor);
                self.dispatch(InputEvent::Moved { at });
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = to_button(button) {
                    let at = self.canvas_position(self.last_cursor);
                    self.dispatch(match state {
                        ElementState::Pressed => InputEvent::Pressed { button, at },
                        ElementState::Released => InputEvent::Released { button, at },
                    });
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = scroll_steps(delta);
                if steps != 0 {
                    self.dispatch(InputEvent::Scrolled { steps });
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let Some(controller) = self.controller.as_mut() else {
                    return;
                };
                if event.state != ElementState::Pressed {
                    return;
                }
                let label = if key_matches(&event, "SPACE") {
                    controller.toggle_pause()
                } else if key_matches(&event, "R") {
                    controller.reseed(false);
                    controller.status_label()
                } else {
                    return;
                };
                self.set_title(&label);
            }
            WindowEvent::RedrawRequested => {
                if let (Some(state), Some(controller)) = (self.state.as_mut(), self.controller.as_mut()) {
                    let sink = controller.sink_mut();
                    if sink.dirty {
                        state.upload(&sink.rgba, sink.canvas_size);
                        sink.dirty = false;
                    }
                    if let Err(err) = state.render() {
                        match err {
                            wgpu::SurfaceError::Lost => state.resize(state.size),
                            wgpu::SurfaceError::OutOfMemory => event_loop.exit(),
                            _ => log::warn!("render failed: {err}"),
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Runs the simulation loop without blocking: a stepped generation is
    /// parked in `pending` and the loop sleeps with `WaitUntil`, so window
    /// events keep flowing while the interval passes.
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let now = Instant::now();

        if let Some((pending, started)) = self.pending.take() {
            // The delay is re-read so scrolling during the wait applies at once.
            let due = started + controller.delay(pending);
            if now < due {
                self.pending = Some((pending, started));
                event_loop.set_control_flow(ControlFlow::WaitUntil(due));
                return;
            }
            if controller.finish_tick(pending).fps_refreshed {
                log::info!("fps: {}", controller.fps().unwrap_or_default());
                let label = controller.status_label();
                self.set_title(&label);
            }
        }

        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let pending = controller.begin_tick();
        let due = now + controller.delay(pending);
        self.pending = Some((pending, now));
        event_loop.set_control_flow(ControlFlow::WaitUntil(due));
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let event_loop = EventLoop::new()?;
    let mut app = VulkanApp::new(Config::from_env());
    event_loop.run_app(&mut app)?;
    Ok(())
}
