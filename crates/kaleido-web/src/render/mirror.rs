use super::helpers;
use crate::constants::{CLEAR_COLOR, MIRROR_TEXTURE_FORMAT};
use crate::media::Media;
use kaleido_core::{MirrorView, HEX_MIRROR_WGSL};
use web_sys as web;

struct SourceTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
    uploaded: bool,
}

/// WebGPU lattice mirror over a live image, video or camera frame.
///
/// Owns every GPU handle it uses; [`MirrorRenderer::teardown`] releases them.
pub struct MirrorRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    bgl: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    source: Option<SourceTexture>,
}

impl MirrorRenderer {
    pub async fn new(canvas: web::HtmlCanvasElement) -> anyhow::Result<Self> {
        let width = canvas.width().max(1);
        let height = canvas.height().max(1);

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No WebGPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: Some("mirror_device"),
                },
                None,
            )
            .await
            .map_err(|e| anyhow::anyhow!(format!("request_device error: {:?}", e)))?;
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("surface reports no formats"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("hex_mirror"),
            source: wgpu::ShaderSource::Wgsl(HEX_MIRROR_WGSL.into()),
        });
        let bgl = helpers::texture_bind_group_layout(&device, "mirror_bgl", Some(0), 1);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mirror_pl"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });
        let pipeline = helpers::make_fullscreen_pipeline(
            &device,
            "mirror_pipeline",
            &pipeline_layout,
            &shader,
            "fs_mirror",
            format,
            Some(wgpu::BlendState::REPLACE),
        );
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mirror_uniforms"),
            size: std::mem::size_of::<kaleido_core::HexMirrorUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sampler = helpers::linear_clamp_sampler(&device, "mirror_sampler");
        log::info!("[gpu] mirror renderer ready ({:?}, {}x{})", format, width, height);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            bgl,
            uniform_buffer,
            sampler,
            source: None,
        })
    }

    pub fn resize_if_needed(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width != self.config.width || height != self.config.height {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Drop the uploaded frame so the next media starts from scratch.
    pub fn forget_source(&mut self) {
        if let Some(old) = self.source.take() {
            old.texture.destroy();
        }
    }

    fn ensure_source(&mut self, width: u32, height: u32) {
        if let Some(s) = &self.source {
            if s.width == width && s.height == height {
                return;
            }
        }
        self.forget_source();
        // copy_external_image_to_texture requires RENDER_ATTACHMENT on the destination
        let (texture, view) = helpers::create_color_texture_device(
            &self.device,
            "mirror_source",
            width,
            height,
            MIRROR_TEXTURE_FORMAT,
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mirror_bg"),
            layout: &self.bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        self.source = Some(SourceTexture {
            texture,
            bind_group,
            width,
            height,
            uploaded: false,
        });
    }

    /// Copy the current media frame. Not-ready media is skipped, and a
    /// still image is copied only once.
    pub fn upload(&mut self, media: &Media) {
        if !media.ready() {
            return;
        }
        let (width, height) = media.size();
        if width == 0 || height == 0 {
            return;
        }
        self.ensure_source(width, height);
        let Some(source) = self.source.as_mut() else {
            return;
        };
        if source.uploaded && media.is_static() {
            return;
        }
        self.queue.copy_external_image_to_texture(
            &wgpu::CopyExternalImageSourceInfo {
                source: media.external_source(),
                origin: wgpu::Origin2d::ZERO,
                flip_y: false,
            },
            wgpu::CopyExternalImageDestInfo {
                texture: &source.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
                color_space: wgpu::PredefinedColorSpace::Srgb,
                premultiplied_alpha: false,
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        source.uploaded = true;
    }

    pub fn render(&mut self, view: &MirrorView, time: f32) -> Result<(), wgpu::SurfaceError> {
        let Some(source) = self.source.as_ref().filter(|s| s.uploaded) else {
            return Ok(());
        };
        let uniforms = view.uniforms(
            [self.config.width as f32, self.config.height as f32],
            time,
        );
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let frame = self.surface.get_current_texture()?;
        let target = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("mirror_encoder"),
            });
        helpers::blit(
            &mut encoder,
            "mirror_pass",
            &target,
            CLEAR_COLOR,
            &self.pipeline,
            &source.bind_group,
        );
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Release the source texture, buffers and device. The canvas keeps its
    /// last presented frame until it is hidden or reused.
    pub fn teardown(mut self) {
        self.forget_source();
        self.uniform_buffer.destroy();
        self.device.destroy();
        log::info!("[gpu] mirror renderer torn down");
    }
}
