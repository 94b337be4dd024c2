//! Headless `wgpu` implementation of the shared compositor surface.
//!
//! Frames are composited into an offscreen RGBA texture by one fullscreen
//! pass. Reveal regions are tessellated with lyon and drawn into an R8 mask
//! first; the composite pass then picks old or new per pixel from the mask.

use std::sync::mpsc;

use anyhow::{Context, ensure};
use bytemuck::{Pod, Zeroable};
use image::RgbaImage;
use lyon::math::point;
use lyon::path::Path;
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
};
use tracing::{debug, info};
use wgpu::util::DeviceExt;

use super::compositor::CompositorSurface;
use super::{Capability, ShaderEffect};
use crate::error::{Result, TransitionError};
use crate::geometry::stagger::Edge;
use crate::geometry::{RevealRegion, Size};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const CIRCLE_SEGMENTS: usize = 64;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct CompositeUniforms {
    screen: [f32; 2],
    old_offset: [f32; 2],
    new_offset: [f32; 2],
    mode: u32,
    progress: f32,
    glow: [f32; 4],
    dir: [f32; 2],
    seed: f32,
    detail: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct MaskUniforms {
    scale: [f32; 2],
    _pad: [f32; 2],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    New,
    Crossfade,
    Slide,
    Mask,
    Crumble,
    Particle,
    Burn,
}

impl Mode {
    fn as_u32(self) -> u32 {
        match self {
            Self::New => 0,
            Self::Crossfade => 1,
            Self::Slide => 2,
            Self::Mask => 3,
            Self::Crumble => 4,
            Self::Particle => 5,
            Self::Burn => 6,
        }
    }
}

struct ImagePair {
    _old: wgpu::Texture,
    _new: wgpu::Texture,
    bind: wgpu::BindGroup,
}

struct Warmed {
    key: (usize, u32, u32),
    texture: wgpu::Texture,
}

pub struct GpuCompositor {
    device: wgpu::Device,
    queue: wgpu::Queue,
    size: Size,
    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    mask: wgpu::Texture,
    mask_view: wgpu::TextureView,
    mask_pipeline: wgpu::RenderPipeline,
    mask_uniform_bind: wgpu::BindGroup,
    composite_pipeline: wgpu::RenderPipeline,
    composite_uniform_buf: wgpu::Buffer,
    composite_uniform_bind: wgpu::BindGroup,
    image_bind_layout: wgpu::BindGroupLayout,
    images: Option<ImagePair>,
    warmed: Vec<Warmed>,
    uniforms: CompositeUniforms,
}

impl GpuCompositor {
    /// Creates a headless device and an offscreen surface of `size`.
    pub fn probe(size: Size) -> anyhow::Result<Self> {
        ensure!(!size.is_empty(), "compositor surface needs a non-zero size");
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("request wgpu adapter")?;
        let limits = adapter.limits();
        ensure!(
            size.width <= limits.max_texture_dimension_2d
                && size.height <= limits.max_texture_dimension_2d,
            "surface {}x{} exceeds the adapter texture limit {}",
            size.width,
            size.height,
            limits.max_texture_dimension_2d
        );
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("transition-compositor-device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .context("request wgpu device")?;
        let info = adapter.get_info();
        info!(
            adapter = %info.name,
            backend = ?info.backend,
            width = size.width,
            height = size.height,
            "compositor_ready"
        );

        let composite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("transition-composite-shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(include_str!(
                "shaders/composite.wgsl"
            ))),
        });
        let mask_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("transition-mask-shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(include_str!(
                "shaders/mask.wgsl"
            ))),
        });

        let extent = wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        };
        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("transition-target"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let mask = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("transition-mask"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let mask_view = mask.create_view(&wgpu::TextureViewDescriptor::default());

        let uniform_layout = |label: &'static str, visibility: wgpu::ShaderStages| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            })
        };

        let mask_uniforms = MaskUniforms {
            scale: [2.0 / size.width as f32, 2.0 / size.height as f32],
            _pad: [0.0; 2],
        };
        let mask_uniform_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("transition-mask-uniforms"),
            contents: bytemuck::bytes_of(&mask_uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let mask_uniform_layout =
            uniform_layout("transition-mask-uniform-layout", wgpu::ShaderStages::VERTEX);
        let mask_uniform_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("transition-mask-uniform-bind"),
            layout: &mask_uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: mask_uniform_buf.as_entire_binding(),
            }],
        });

        let composite_uniform_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("transition-composite-uniforms"),
            size: std::mem::size_of::<CompositeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let composite_uniform_layout = uniform_layout(
            "transition-composite-uniform-layout",
            wgpu::ShaderStages::FRAGMENT,
        );
        let composite_uniform_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("transition-composite-uniform-bind"),
            layout: &composite_uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: composite_uniform_buf.as_entire_binding(),
            }],
        });

        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let image_bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("transition-image-layout"),
            entries: &[texture_entry(0), texture_entry(1), texture_entry(2)],
        });

        let mask_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("transition-mask-pipeline-layout"),
            bind_group_layouts: &[&mask_uniform_layout],
            push_constant_ranges: &[],
        });
        let mask_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("transition-mask-pipeline"),
            layout: Some(&mask_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &mask_shader,
                entry_point: Some("vs_mask"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &mask_shader,
                entry_point: Some("fs_mask"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: wgpu::TextureFormat::R8Unorm,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let composite_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("transition-composite-pipeline-layout"),
                bind_group_layouts: &[&composite_uniform_layout, &image_bind_layout],
                push_constant_ranges: &[],
            });
        let composite_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("transition-composite-pipeline"),
            layout: Some(&composite_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &composite_shader,
                entry_point: Some("vs_fullscreen"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &composite_shader,
                entry_point: Some("fs_composite"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            device,
            queue,
            size,
            target,
            target_view,
            mask,
            mask_view,
            mask_pipeline,
            mask_uniform_bind,
            composite_pipeline,
            composite_uniform_buf,
            composite_uniform_bind,
            image_bind_layout,
            images: None,
            warmed: Vec::new(),
            uniforms: CompositeUniforms {
                screen: [size.width as f32, size.height as f32],
                ..Zeroable::zeroed()
            },
        })
    }

    /// Copies the last composited frame back to the CPU.
    pub fn read_frame(&self) -> anyhow::Result<RgbaImage> {
        let Size { width, height } = self.size;
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("transition-readback"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("transition-readback-encoder"),
            });
        encoder.copy_texture_to_buffer(
            self.target.as_image_copy(),
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
        self.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = sender.send(res);
        });
        let _ = self.device.poll(wgpu::PollType::Wait);
        receiver
            .recv()
            .context("receive map result")?
            .context("map readback buffer")?;
        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        for row in data.chunks(padded as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(data);
        buffer.unmap();
        RgbaImage::from_raw(width, height, pixels).context("readback size mismatch")
    }

    fn upload(&self, image: &RgbaImage, label: &str) -> wgpu::Texture {
        let (w, h) = image.dimensions();
        let tex = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            tex.as_image_copy(),
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * w),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
        );
        tex
    }

    fn warm_key(image: &RgbaImage) -> (usize, u32, u32) {
        (image.as_raw().as_ptr() as usize, image.width(), image.height())
    }

    fn texture_for(&mut self, image: &RgbaImage, label: &str) -> wgpu::Texture {
        let key = Self::warm_key(image);
        match self.warmed.iter().position(|w| w.key == key) {
            Some(pos) => self.warmed.swap_remove(pos).texture,
            None => self.upload(image, label),
        }
    }

    fn bind_images(&mut self, old: &RgbaImage, new: &RgbaImage) -> Result<()> {
        for image in [old, new] {
            if image.dimensions() != (self.size.width, self.size.height) {
                return Err(TransitionError::Backend(format!(
                    "image is {}x{}, compositor is {}x{}",
                    image.width(),
                    image.height(),
                    self.size.width,
                    self.size.height
                )));
            }
        }
        let old_tex = self.texture_for(old, "transition-old");
        let new_tex = self.texture_for(new, "transition-new");
        let old_view = old_tex.create_view(&wgpu::TextureViewDescriptor::default());
        let new_view = new_tex.create_view(&wgpu::TextureViewDescriptor::default());
        let bind = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("transition-image-bind"),
            layout: &self.image_bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&old_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&new_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&self.mask_view),
                },
            ],
        });
        self.images = Some(ImagePair {
            _old: old_tex,
            _new: new_tex,
            bind,
        });
        Ok(())
    }

    fn set_mode(&mut self, mode: Mode) {
        self.uniforms.mode = mode.as_u32();
        self.uniforms.progress = 0.0;
        self.uniforms.old_offset = [0.0; 2];
        self.uniforms.new_offset = [0.0; 2];
    }

    fn render(&mut self, mask: Option<&RevealRegion>) -> Result<()> {
        let Some(images) = self.images.as_ref() else {
            return Err(TransitionError::Backend("compositor has no images loaded".into()));
        };
        self.queue.write_buffer(
            &self.composite_uniform_buf,
            0,
            bytemuck::bytes_of(&self.uniforms),
        );
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("transition-frame-encoder"),
            });

        if let Some(region) = mask {
            let mesh = tessellate_region(region)?;
            let buffers = (!mesh.indices.is_empty()).then(|| {
                let vertex = self
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("transition-mask-vertices"),
                        contents: bytemuck::cast_slice(&mesh.vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    });
                let index = self
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("transition-mask-indices"),
                        contents: bytemuck::cast_slice(&mesh.indices),
                        usage: wgpu::BufferUsages::INDEX,
                    });
                (vertex, index, mesh.indices.len() as u32)
            });
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("transition-mask-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.mask_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if let Some((vertex, index, count)) = buffers.as_ref() {
                rpass.set_pipeline(&self.mask_pipeline);
                rpass.set_bind_group(0, &self.mask_uniform_bind, &[]);
                rpass.set_vertex_buffer(0, vertex.slice(..));
                rpass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..*count, 0, 0..1);
            }
        }

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("transition-composite-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            rpass.set_pipeline(&self.composite_pipeline);
            rpass.set_bind_group(0, &self.composite_uniform_bind, &[]);
            rpass.set_bind_group(1, &images.bind, &[]);
            rpass.draw(0..3, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }
}

/// Triangulates every shape of `region` into one mesh in pixel space.
///
/// Shapes are filled one by one so overlapping shapes add up instead of
/// cancelling out.
fn tessellate_region(region: &RevealRegion) -> Result<VertexBuffers<[f32; 2], u32>> {
    let mut mesh: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    let mut tessellator = FillTessellator::new();
    let options = FillOptions::tolerance(0.25).with_fill_rule(FillRule::NonZero);
    for shape in &region.shapes {
        let polygon = shape.to_polygon(CIRCLE_SEGMENTS);
        if polygon.is_degenerate() {
            continue;
        }
        let mut builder = Path::builder();
        let mut points = polygon.points.iter();
        let Some(first) = points.next() else {
            continue;
        };
        builder.begin(point(first.x, first.y));
        for p in points {
            builder.line_to(point(p.x, p.y));
        }
        builder.end(true);
        let path = builder.build();
        tessellator
            .tessellate_path(
                &path,
                &options,
                &mut BuffersBuilder::new(&mut mesh, |v: FillVertex| v.position().to_array()),
            )
            .map_err(|err| TransitionError::Backend(format!("mask tessellation failed: {err:?}")))?;
    }
    Ok(mesh)
}

fn edge_dir(edge: Edge) -> [f32; 2] {
    match edge {
        Edge::Left => [1.0, 0.0],
        Edge::Right => [-1.0, 0.0],
        Edge::Top => [0.0, 1.0],
        Edge::Bottom => [0.0, -1.0],
    }
}

fn unit_seed(seed: u32) -> f32 {
    (seed & 0xffff) as f32 / 65535.0
}

impl CompositorSurface for GpuCompositor {
    fn capability(&self) -> Capability {
        Capability::Available
    }

    fn size(&self) -> Size {
        self.size
    }

    fn warm_textures(&mut self, images: &[&RgbaImage]) {
        for image in images {
            let key = Self::warm_key(image);
            if self.warmed.iter().any(|w| w.key == key) {
                continue;
            }
            let texture = self.upload(image, "transition-warm");
            self.warmed.push(Warmed { key, texture });
        }
        debug!(warmed = self.warmed.len(), "compositor_warm_textures");
    }

    fn load_images(&mut self, old: &RgbaImage, new: &RgbaImage) -> Result<()> {
        self.bind_images(old, new)
    }

    fn start_crossfade(&mut self) -> Result<()> {
        self.set_mode(Mode::Crossfade);
        self.render(None)
    }

    fn start_slide(&mut self) -> Result<()> {
        self.set_mode(Mode::Slide);
        self.render(None)
    }

    fn start_reveal(&mut self) -> Result<()> {
        self.set_mode(Mode::Mask);
        self.render(Some(&RevealRegion::empty()))
    }

    fn start_shader(&mut self, effect: &ShaderEffect) -> Result<()> {
        match effect {
            ShaderEffect::Crumble { pieces, seed } => {
                self.set_mode(Mode::Crumble);
                self.uniforms.detail = *pieces as f32;
                self.uniforms.seed = unit_seed(*seed);
            }
            ShaderEffect::Particle { radius, edge, seed } => {
                self.set_mode(Mode::Particle);
                self.uniforms.detail = *radius;
                self.uniforms.dir = edge_dir(*edge);
                self.uniforms.seed = unit_seed(*seed);
            }
            ShaderEffect::Burn {
                edge,
                glow,
                jaggedness,
                seed,
            } => {
                self.set_mode(Mode::Burn);
                self.uniforms.detail = *jaggedness;
                self.uniforms.dir = edge_dir(*edge);
                self.uniforms.glow = [
                    glow[0] as f32 / 255.0,
                    glow[1] as f32 / 255.0,
                    glow[2] as f32 / 255.0,
                    1.0,
                ];
                self.uniforms.seed = unit_seed(*seed);
            }
        }
        debug!(effect = effect.name(), "compositor_shader_start");
        self.render(None)
    }

    fn set_crossfade(&mut self, mix: f32) -> Result<()> {
        self.uniforms.progress = mix.clamp(0.0, 1.0);
        self.render(None)
    }

    fn set_slide_offsets(&mut self, old: [f32; 2], new: [f32; 2]) -> Result<()> {
        self.uniforms.old_offset = old;
        self.uniforms.new_offset = new;
        self.render(None)
    }

    fn set_reveal_region(&mut self, region: &RevealRegion) -> Result<()> {
        self.render(Some(region))
    }

    fn set_shader_progress(&mut self, progress: f32) -> Result<()> {
        self.uniforms.progress = progress.clamp(0.0, 1.0);
        self.render(None)
    }

    fn show_image(&mut self, image: &RgbaImage) -> Result<()> {
        self.bind_images(image, image)?;
        self.set_mode(Mode::New);
        self.render(None)
    }

    fn release(&mut self) {
        if self.images.take().is_some() || !self.warmed.is_empty() {
            debug!("compositor_release");
        }
        self.warmed.clear();
    }
}
