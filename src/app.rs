use anyhow::Result;
use glam::{Mat4, Vec3};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::render::camera::Camera;
use crate::render::gpu::GpuContext;
use crate::render::mesh::MeshVertex;
use crate::render::pipeline::{create_depth_view, SpherePipeline, SphereUniforms};
use crate::session::VisualizerSession;

const TITLE_REFRESH: Duration = Duration::from_secs(1);

struct Gfx {
    gpu: GpuContext,
    pipeline: SpherePipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    camera: Camera,
}

pub struct VizApp {
    session: VisualizerSession,
    initial_size: PhysicalSize<u32>,
    window: Option<Arc<Window>>,
    window_id: Option<WindowId>,
    gfx: Option<Gfx>,
    title_refreshed: Instant,
}

impl VizApp {
    pub fn new(session: VisualizerSession, width: u32, height: u32) -> Self {
        Self {
            session,
            initial_size: PhysicalSize::new(width, height),
            window: None,
            window_id: None,
            gfx: None,
            title_refreshed: Instant::now(),
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.run_app(&mut self)?;
        Ok(())
    }

    fn init_gfx(&self, window: Arc<Window>) -> Result<Gfx> {
        let gpu = GpuContext::new(window)?;
        let pipeline = SpherePipeline::new(&gpu.device, gpu.config.format)?;

        let vertices = self.session.mesh.vertex_data();
        let vertex_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sphere_vertex_buffer"),
            size: (self.session.mesh.vertex_count() * std::mem::size_of::<MeshVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        gpu.queue
            .write_buffer(&vertex_buffer, 0, bytemuck::cast_slice(&vertices));

        let indices = self.session.mesh.indices();
        let index_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sphere_index_buffer"),
            size: (indices.len() * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        gpu.queue
            .write_buffer(&index_buffer, 0, bytemuck::cast_slice(indices));

        let uniform_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sphere_uniform_buffer"),
            size: std::mem::size_of::<SphereUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sphere_bind_group"),
            layout: &pipeline.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let depth_view = create_depth_view(&gpu.device, gpu.config.width, gpu.config.height);
        let camera = Camera::new(gpu.config.width, gpu.config.height);

        Ok(Gfx {
            gpu,
            pipeline,
            vertex_buffer,
            index_buffer,
            index_count: self.session.mesh.index_count() as u32,
            uniform_buffer,
            bind_group,
            depth_view,
            camera,
        })
    }

    fn refresh_title(&mut self) {
        if let Some(window) = &self.window {
            window.set_title(&format!("sphera - {}", self.session.status_line()));
        }
        self.title_refreshed = Instant::now();
    }

    fn redraw(&mut self) -> Result<(), wgpu::SurfaceError> {
        if self.session.poll_decode() {
            self.refresh_title();
        }

        self.session.advance_frame();

        let Some(gfx) = self.gfx.as_mut() else {
            return Ok(());
        };

        if self.session.mesh.take_dirty() {
            let vertices = self.session.mesh.vertex_data();
            gfx.gpu
                .queue
                .write_buffer(&gfx.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        }

        let (rx, ry) = self.session.rotation();
        let model = Mat4::from_rotation_x(rx)
            * Mat4::from_rotation_y(ry)
            * Mat4::from_scale(Vec3::splat(self.session.settings.radius));
        let uniforms = SphereUniforms {
            view_proj: gfx.camera.view_proj().to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            time: self.session.shader_time(),
            color_intensity: self.session.settings.color_intensity,
            _padding: [0.0; 2],
        };
        gfx.gpu
            .queue
            .write_buffer(&gfx.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let frame = gfx.gpu.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gfx
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sphere_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gfx.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&gfx.pipeline.pipeline);
            render_pass.set_bind_group(0, &gfx.bind_group, &[]);
            render_pass.set_vertex_buffer(0, gfx.vertex_buffer.slice(..));
            render_pass.set_index_buffer(gfx.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..gfx.index_count, 0, 0..1);
        }

        gfx.gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        if self.title_refreshed.elapsed() >= TITLE_REFRESH {
            self.refresh_title();
        }

        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode, repeat: bool) {
        if code == KeyCode::Space {
            if !repeat {
                match self.session.toggle() {
                    Ok(()) => log::info!("{}", self.session.status_line()),
                    Err(err) => log::warn!("Cannot toggle playback: {}", err),
                }
                self.refresh_title();
            }
            return;
        }

        let settings = &mut self.session.settings;
        match code {
            KeyCode::ArrowUp => settings.sensitivity += 5.0,
            KeyCode::ArrowDown => settings.sensitivity -= 5.0,
            KeyCode::ArrowRight => settings.color_intensity += 0.5,
            KeyCode::ArrowLeft => settings.color_intensity -= 0.5,
            KeyCode::KeyQ => settings.rotation_speed_x += 0.002,
            KeyCode::KeyA => settings.rotation_speed_x -= 0.002,
            KeyCode::KeyW => settings.rotation_speed_y += 0.002,
            KeyCode::KeyS => settings.rotation_speed_y -= 0.002,
            KeyCode::KeyE => settings.radius += 0.1,
            KeyCode::KeyD => settings.radius -= 0.1,
            _ => return,
        }
        self.session.settings = self.session.settings.clamped();

        let s = &self.session.settings;
        log::info!(
            "settings: radius={:.1} rot=({:.3}, {:.3}) color={:.1} sensitivity={:.0}",
            s.radius,
            s.rotation_speed_x,
            s.rotation_speed_y,
            s.color_intensity,
            s.sensitivity
        );
    }
}

impl ApplicationHandler for VizApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs: WindowAttributes = Window::default_attributes()
            .with_title("sphera - drop an audio file")
            .with_inner_size(self.initial_size);

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };

        match self.init_gfx(Arc::clone(&window)) {
            Ok(gfx) => {
                self.window_id = Some(window.id());
                self.window = Some(window);
                self.gfx = Some(gfx);
                self.refresh_title();
            }
            Err(err) => {
                log::error!("Failed to initialize GPU: {:#}", err);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if Some(window_id) != self.window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gfx) = self.gfx.as_mut() {
                    gfx.gpu.resize(size.width, size.height);
                    gfx.depth_view =
                        create_depth_view(&gfx.gpu.device, gfx.gpu.config.width, gfx.gpu.config.height);
                    gfx.camera.set_viewport(size.width, size.height);
                }
            }
            WindowEvent::DroppedFile(path) => {
                self.session.request_load(path);
                self.refresh_title();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat,
                        ..
                    },
                ..
            } => self.handle_key(code, repeat),
            WindowEvent::RedrawRequested => match self.redraw() {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                    if let Some(gfx) = self.gfx.as_mut() {
                        let (w, h) = (gfx.gpu.config.width, gfx.gpu.config.height);
                        gfx.gpu.resize(w, h);
                    }
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("GPU out of memory");
                    event_loop.exit();
                }
                Err(err) => log::warn!("Dropped frame: {}", err),
            },
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
