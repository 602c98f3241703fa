use kaleido_core::{MirrorView, Pixmap, HEX_MIRROR_WGSL, PRESENT_WGSL};
use std::sync::mpsc;

const CLEAR: wgpu::Color = wgpu::Color {
    r: 0.039,
    g: 0.043,
    b: 0.063,
    a: 1.0,
};

struct SizedTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

/// Which pass [`GpuState::render`] draws.
#[derive(Clone, Copy, Debug)]
pub enum Pass<'a> {
    /// Blit the CPU-rendered pattern frame.
    Present,
    /// Lattice-mirror the loaded image.
    Mirror(&'a MirrorView, f32),
}

pub struct GpuState<'w> {
    pub window: &'w winit::window::Window,
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    texel_format: wgpu::TextureFormat,
    sampler: wgpu::Sampler,
    present_pipeline: wgpu::RenderPipeline,
    present_bgl: wgpu::BindGroupLayout,
    frame: Option<SizedTexture>,
    mirror_pipeline: wgpu::RenderPipeline,
    mirror_bgl: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    source: Option<SizedTexture>,
}

impl<'w> GpuState<'w> {
    pub async fn new(window: &'w winit::window::Window) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No GPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("surface reports no formats"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            desired_maximum_frame_latency: 2,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        // CPU frames and images hold sRGB bytes; let the sampler decode them
        // when the surface re-encodes on write.
        let texel_format = if format.is_srgb() {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear_clamp"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let present_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("present"),
            source: wgpu::ShaderSource::Wgsl(PRESENT_WGSL.into()),
        });
        let present_bgl = texture_bgl(&device, "present_bgl", None, 0);
        let present_pipeline = fullscreen_pipeline(
            &device,
            "present_pipeline",
            &present_bgl,
            &present_shader,
            "fs_present",
            format,
        );

        let mirror_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("hex_mirror"),
            source: wgpu::ShaderSource::Wgsl(HEX_MIRROR_WGSL.into()),
        });
        let mirror_bgl = texture_bgl(&device, "mirror_bgl", Some(0), 1);
        let mirror_pipeline = fullscreen_pipeline(
            &device,
            "mirror_pipeline",
            &mirror_bgl,
            &mirror_shader,
            "fs_mirror",
            format,
        );
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mirror_uniforms"),
            size: std::mem::size_of::<kaleido_core::HexMirrorUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        log::info!(
            "[gpu] {:?} surface {}x{}",
            format,
            config.width,
            config.height
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            texel_format,
            sampler,
            present_pipeline,
            present_bgl,
            frame: None,
            mirror_pipeline,
            mirror_bgl,
            uniform_buffer,
            source: None,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    fn sized_texture(
        &self,
        label: &str,
        width: u32,
        height: u32,
        layout: &wgpu::BindGroupLayout,
        uniforms: Option<&wgpu::Buffer>,
    ) -> SizedTexture {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.texel_format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let base = u32::from(uniforms.is_some());
        let mut entries = Vec::with_capacity(3);
        if let Some(buffer) = uniforms {
            entries.push(wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: base,
            resource: wgpu::BindingResource::TextureView(&view),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: base + 1,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &entries,
        });
        SizedTexture {
            texture,
            bind_group,
            width,
            height,
        }
    }

    fn write_rgba8(&self, target: &SizedTexture, bytes: &[u8]) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * target.width),
                rows_per_image: Some(target.height),
            },
            wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Upload the CPU-rendered frame for the present pass.
    pub fn upload_frame(&mut self, pixmap: &Pixmap, scratch: &mut Vec<u8>) {
        let (w, h) = (pixmap.width(), pixmap.height());
        if !self
            .frame
            .as_ref()
            .is_some_and(|f| f.width == w && f.height == h)
        {
            if let Some(old) = self.frame.take() {
                old.texture.destroy();
            }
            self.frame = Some(self.sized_texture("frame", w, h, &self.present_bgl, None));
        }
        pixmap.write_rgba8(scratch);
        if let Some(frame) = &self.frame {
            self.write_rgba8(frame, scratch);
        }
    }

    /// Replace the mirror source with a decoded image.
    pub fn set_source(&mut self, image: &image::RgbaImage) {
        self.clear_source();
        let source = self.sized_texture(
            "mirror_source",
            image.width(),
            image.height(),
            &self.mirror_bgl,
            Some(&self.uniform_buffer),
        );
        self.write_rgba8(&source, image.as_raw());
        self.source = Some(source);
    }

    pub fn clear_source(&mut self) {
        if let Some(old) = self.source.take() {
            old.texture.destroy();
        }
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    fn encode(
        &self,
        pass: Pass<'_>,
        target: &wgpu::TextureView,
        width: u32,
        height: u32,
    ) -> Option<wgpu::CommandBuffer> {
        let (pipeline, bind_group) = match pass {
            Pass::Present => (&self.present_pipeline, &self.frame.as_ref()?.bind_group),
            Pass::Mirror(view, time) => {
                let uniforms = view.uniforms([width as f32, height as f32], time);
                self.queue
                    .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
                (&self.mirror_pipeline, &self.source.as_ref()?.bind_group)
            }
        };
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("rpass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, bind_group, &[]);
            rpass.draw(0..3, 0..1);
        }
        Some(encoder.finish())
    }

    pub fn render(&mut self, pass: Pass<'_>) -> Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        if let Some(commands) = self.encode(pass, &view, self.config.width, self.config.height) {
            self.queue.submit(Some(commands));
        }
        frame.present();
        Ok(())
    }

    /// Render `pass` offscreen at the surface size and read it back.
    pub fn capture(&self, pass: Pass<'_>) -> anyhow::Result<image::RgbaImage> {
        let (width, height) = self.size();
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("capture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let commands = self
            .encode(pass, &view, width, height)
            .ok_or_else(|| anyhow::anyhow!("nothing to capture"))?;

        let unpadded = 4 * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("capture_readback"),
            size: (padded * height) as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("capture_copy"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit([commands, encoder.finish()]);

        let slice = buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        rx.recv()??;

        let bgra = matches!(
            self.config.format,
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        );
        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();
        texture.destroy();
        if bgra {
            for px in pixels.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }
        image::RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow::anyhow!("readback size mismatch"))
    }
}

/// Sampled texture at `texture_binding`, its sampler right after, and an
/// optional uniform block.
fn texture_bgl(
    device: &wgpu::Device,
    label: &str,
    uniform_binding: Option<u32>,
    texture_binding: u32,
) -> wgpu::BindGroupLayout {
    let mut entries = Vec::with_capacity(3);
    if let Some(binding) = uniform_binding {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
    }
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: texture_binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    });
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: texture_binding + 1,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    });
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    bgl: &wgpu::BindGroupLayout,
    shader: &wgpu::ShaderModule,
    frag_entry: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(frag_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        cache: None,
        multiview: None,
    })
}
