//! The wgpu rendering context.
//!
//! [`Context`] owns the surface, device and queue plus every GPU resource the
//! engine created through it. Geometries, materials and lights live in
//! generational tables keyed by the handles handed out to the engine, so a
//! stale handle can never reach a destroyed buffer.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::Context as _;
use slotmap::SlotMap;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraUniform},
    data_structures::{
        geometry::MeshData,
        instance::InstanceRaw,
        scene_graph::Scene,
        texture::DepthTexture,
    },
    pipelines::{Pipelines, light::{LightResources, LightUniform}},
    render::{
        DrawError, FrameBatches, GeometryId, Light, LightId, Material, MaterialId, RenderBackend,
    },
};

/// Room for the whole board plus a token before the instance buffer has to grow.
const INITIAL_INSTANCE_CAPACITY: usize = 256;

#[derive(Debug)]
struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

pub struct Context {
    surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    is_surface_configured: bool,
    depth_texture: DepthTexture,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    light: LightResources,
    pipelines: Pipelines,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    geometries: SlotMap<GeometryId, GpuGeometry>,
    materials: SlotMap<MaterialId, Material>,
    lights: SlotMap<LightId, Light>,
    clear_colour: wgpu::Color,
    device_lost: Arc<AtomicBool>,
    disposed: bool,
}

impl Context {
    pub async fn new(window: Arc<Window>, clear_colour: [f64; 4]) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("wgpu setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("creating the window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible graphics adapter")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("step-ngin device"),
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                ..Default::default()
            })
            .await
            .context("requesting the graphics device")?;

        let device_lost = Arc::new(AtomicBool::new(false));
        let lost_flag = Arc::clone(&device_lost);
        device.set_device_lost_callback(move |reason, message| {
            if !matches!(reason, wgpu::DeviceLostReason::Destroyed) {
                log::error!("graphics device lost: {}", message);
                lost_flag.store(true, Ordering::Release);
            }
        });

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        // on the web the canvas may still be 0x0; the first resize configures it
        let is_surface_configured = size.width > 0 && size.height > 0;
        if is_surface_configured {
            surface.configure(&device, &config);
        }

        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let light = LightResources::new(&device);
        let pipelines = Pipelines::new(
            &device,
            &config,
            &camera_bind_group_layout,
            &light.bind_group_layout,
        );
        let depth_texture = DepthTexture::new(&device, [config.width, config.height], "depth_texture");
        let instance_buffer = mk_instance_buffer(&device, INITIAL_INSTANCE_CAPACITY);

        let [r, g, b, a] = clear_colour;
        Ok(Self {
            surface,
            device,
            queue,
            config,
            is_surface_configured,
            depth_texture,
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            light,
            pipelines,
            instance_buffer,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
            geometries: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            lights: SlotMap::with_key(),
            clear_colour: wgpu::Color { r, g, b, a },
            device_lost,
            disposed: false,
        })
    }

    fn reserve_instances(&mut self, count: usize) {
        if count <= self.instance_capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        log::debug!("growing instance buffer to {} instances", capacity);
        self.instance_buffer.destroy();
        self.instance_buffer = mk_instance_buffer(&self.device, capacity);
        self.instance_capacity = capacity;
    }
}

fn mk_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl RenderBackend for Context {
    fn create_geometry(&mut self, label: &str, mesh: &MeshData) -> GeometryId {
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", label)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.geometries.insert(GpuGeometry {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        })
    }

    fn create_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    fn create_light(&mut self, light: Light) -> LightId {
        self.lights.insert(light)
    }

    fn dispose_geometry(&mut self, id: GeometryId) {
        match self.geometries.remove(id) {
            Some(geometry) => {
                geometry.vertex_buffer.destroy();
                geometry.index_buffer.destroy();
            }
            None => log::warn!("geometry {:?} was already disposed", id),
        }
    }

    fn dispose_material(&mut self, id: MaterialId) {
        if self.materials.remove(id).is_none() {
            log::warn!("material {:?} was already disposed", id);
        }
    }

    fn dispose_light(&mut self, id: LightId) {
        if self.lights.remove(id).is_none() {
            log::warn!("light {:?} was already disposed", id);
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || self.disposed {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.is_surface_configured = true;
        self.depth_texture.destroy();
        self.depth_texture = DepthTexture::new(&self.device, [width, height], "depth_texture");
    }

    fn draw(&mut self, scene: &Scene, camera: &Camera) -> Result<(), DrawError> {
        if self.device_lost.load(Ordering::Acquire) {
            return Err(DrawError::ContextLost);
        }
        if self.disposed || !self.is_surface_configured {
            return Ok(());
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost) => return Err(DrawError::ContextLost),
            Err(wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timed out, skipping frame");
                return Ok(());
            }
            Err(err) => return Err(DrawError::Other(err.to_string())),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.camera_uniform.update_view_proj(camera);
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
        self.light.uniform =
            LightUniform::from_lights(scene.lights().iter().filter_map(|id| self.lights.get(*id)));
        self.queue.write_buffer(
            &self.light.buffer,
            0,
            bytemuck::cast_slice(&[self.light.uniform]),
        );

        let frame = FrameBatches::collect(scene, |id| self.materials.get(id).copied());
        self.reserve_instances(frame.instance_count());
        if !frame.instances.is_empty() {
            self.queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&frame.instances),
            );
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Board Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_bind_group(1, &self.light.bind_group, &[]);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

            let mut current_surface = None;
            for batch in &frame.batches {
                let Some(geometry) = self.geometries.get(batch.geometry) else {
                    log::warn!("skipping batch with disposed geometry {:?}", batch.geometry);
                    continue;
                };
                if geometry.index_count == 0 {
                    continue;
                }
                if current_surface != Some(batch.surface) {
                    render_pass.set_pipeline(self.pipelines.for_surface(batch.surface));
                    current_surface = Some(batch.surface);
                }
                render_pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
                render_pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..geometry.index_count, 0, batch.instances.clone());
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let leaked = self.geometries.len() + self.materials.len() + self.lights.len();
        if leaked > 0 {
            log::warn!("disposing context with {} resources still alive", leaked);
        }
        for (_, geometry) in self.geometries.drain() {
            geometry.vertex_buffer.destroy();
            geometry.index_buffer.destroy();
        }
        self.materials.clear();
        self.lights.clear();
        self.instance_buffer.destroy();
        self.camera_buffer.destroy();
        self.light.buffer.destroy();
        self.depth_texture.destroy();
        self.disposed = true;
        log::info!("rendering context disposed");
    }
}
