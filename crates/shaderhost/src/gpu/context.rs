use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::compile::{
    compile_stage, TranslatedShader, VertexAttribute, FRAGMENT_BLOCK_BINDING, VERTEX_BLOCK_BINDING,
    VIEWPORT_UNIFORM,
};
use super::uniforms::{UniformBlock, UniformKind, UniformStaging};
use crate::error::ContextLost;
use crate::surface::RenderContext;
use crate::types::{ShaderStage, SurfaceSize};

/// `wgpu` device and swapchain bound to one window.
pub struct WgpuContext {
    _instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: SurfaceSize,
    max_dimension: u32,
    lost: Arc<AtomicBool>,
}

pub struct GpuShader {
    stage: ShaderStage,
    module: wgpu::ShaderModule,
    translated: TranslatedShader,
}

pub struct GpuProgram {
    linked: Option<LinkedProgram>,
}

struct LinkedProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    vertex: Option<StageUniforms>,
    fragment: StageUniforms,
    attributes: Vec<VertexAttribute>,
}

struct StageUniforms {
    block: UniformBlock,
    staging: UniformStaging,
    buffer: wgpu::Buffer,
}

impl StageUniforms {
    fn new(device: &wgpu::Device, block: UniformBlock, label: &str) -> Self {
        let staging = UniformStaging::new(&block);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: staging.as_bytes(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            block,
            staging,
            buffer,
        }
    }

    fn slot(&self, name: &str) -> Option<(u32, UniformKind)> {
        self.block
            .member(name)
            .map(|member| (member.offset, member.kind))
    }
}

pub struct GpuBuffer {
    buffer: wgpu::Buffer,
}

/// Resolved attribute slot or uniform block offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuLocation(Slot);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Attribute(u32),
    Uniform {
        vertex: Option<(u32, UniformKind)>,
        fragment: Option<(u32, UniformKind)>,
    },
}

const VERTEX_STRIDE: u64 = 16;

impl WgpuContext {
    pub fn new(window: Arc<Window>, initial_size: SurfaceSize) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "selected GPU adapter"
        );

        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("portfolio device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        let lost = Arc::new(AtomicBool::new(false));
        let lost_flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            tracing::warn!(?reason, %message, "GPU device lost");
            lost_flag.store(true, Ordering::SeqCst);
        });
        device.on_uncaptured_error(Box::new(|err| {
            tracing::error!(error = %err, "uncaptured GPU error");
        }));

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no supported formats")?;
        let present_mode = caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .or_else(|| caps.present_modes.first().copied())
            .unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        tracing::debug!(?format, ?present_mode, "configuring surface");

        let max_dimension = limits.max_texture_dimension_2d;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: initial_size.width.clamp(1, max_dimension),
            height: initial_size.height.clamp(1, max_dimension),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        if !initial_size.is_empty() {
            surface.configure(&device, &config);
        }

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            size: initial_size,
            max_dimension,
            lost,
        })
    }

    fn upload_uniforms(&self, program: &LinkedProgram) {
        if let Some(vertex) = &program.vertex {
            self.queue
                .write_buffer(&vertex.buffer, 0, vertex.staging.as_bytes());
        }
        let fragment = &program.fragment;
        self.queue
            .write_buffer(&fragment.buffer, 0, fragment.staging.as_bytes());
        if let Some((offset, _)) = fragment.slot(VIEWPORT_UNIFORM) {
            let viewport = [self.config.width as f32, self.config.height as f32];
            self.queue.write_buffer(
                &fragment.buffer,
                u64::from(offset),
                bytemuck::cast_slice(&viewport),
            );
        }
    }

    fn link(
        &self,
        vertex: &GpuShader,
        fragment: &GpuShader,
    ) -> std::result::Result<LinkedProgram, String> {
        if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
            return Err("program needs one vertex and one fragment shader".to_string());
        }
        let attributes = vertex.translated.attributes.clone();
        if attributes.len() > 1 {
            return Err(format!(
                "{} vertex attributes declared; only a single position attribute is supported",
                attributes.len()
            ));
        }

        let vertex_uniforms = (!vertex.translated.block.is_empty()).then(|| {
            StageUniforms::new(
                &self.device,
                vertex.translated.block.clone(),
                "portfolio vertex uniforms",
            )
        });
        let fragment_uniforms = StageUniforms::new(
            &self.device,
            fragment.translated.block.clone(),
            "portfolio fragment uniforms",
        );

        let mut layout_entries = Vec::with_capacity(2);
        let mut group_entries = Vec::with_capacity(2);
        if let Some(uniforms) = &vertex_uniforms {
            layout_entries.push(uniform_layout_entry(
                VERTEX_BLOCK_BINDING,
                wgpu::ShaderStages::VERTEX,
            ));
            group_entries.push(wgpu::BindGroupEntry {
                binding: VERTEX_BLOCK_BINDING,
                resource: uniforms.buffer.as_entire_binding(),
            });
        }
        layout_entries.push(uniform_layout_entry(
            FRAGMENT_BLOCK_BINDING,
            wgpu::ShaderStages::FRAGMENT,
        ));
        group_entries.push(wgpu::BindGroupEntry {
            binding: FRAGMENT_BLOCK_BINDING,
            resource: fragment_uniforms.buffer.as_entire_binding(),
        });

        self.device
            .push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("portfolio uniform layout"),
                entries: &layout_entries,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("portfolio uniform bind group"),
            layout: &bind_group_layout,
            entries: &group_entries,
        });
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("portfolio pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let vertex_attributes: Vec<wgpu::VertexAttribute> = attributes
            .iter()
            .map(|attribute| wgpu::VertexAttribute {
                format: vertex_format(attribute.components),
                offset: 0,
                shader_location: attribute.location,
            })
            .collect();
        let buffers = if vertex_attributes.is_empty() {
            Vec::new()
        } else {
            vec![wgpu::VertexBufferLayout {
                array_stride: VERTEX_STRIDE,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &vertex_attributes,
            }]
        };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("portfolio pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some("main"),
                    buffers: &buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &fragment.module,
                    entry_point: Some("main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(err.to_string());
        }

        Ok(LinkedProgram {
            pipeline,
            bind_group,
            vertex: vertex_uniforms,
            fragment: fragment_uniforms,
            attributes,
        })
    }
}

fn uniform_layout_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn vertex_format(components: usize) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

/// Expands `(x, y)` pairs to `(x, y, 0, 1)` so both `vec2` and `vec4` inputs read them.
fn expand_vertices(data: &[f32]) -> Vec<[f32; 4]> {
    data.chunks_exact(2)
        .map(|pair| [pair[0], pair[1], 0.0, 1.0])
        .collect()
}

fn write_slot(program: &mut GpuProgram, location: &GpuLocation, values: &[f32]) {
    let (Some(linked), GpuLocation(Slot::Uniform { vertex, fragment })) =
        (program.linked.as_mut(), location)
    else {
        return;
    };
    if let (Some((offset, kind)), Some(uniforms)) = (vertex, linked.vertex.as_mut()) {
        uniforms.staging.write(*offset, *kind, values);
    }
    if let Some((offset, kind)) = fragment {
        linked.fragment.staging.write(*offset, *kind, values);
    }
}

impl RenderContext for WgpuContext {
    type Shader = GpuShader;
    type Program = GpuProgram;
    type Buffer = GpuBuffer;
    type Location = GpuLocation;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<GpuShader, String> {
        let (module, translated) = compile_stage(&self.device, stage, source)?;
        Ok(GpuShader {
            stage,
            module,
            translated,
        })
    }

    fn delete_shader(&mut self, shader: GpuShader) {
        tracing::trace!(stage = %shader.stage, "releasing shader module");
        drop(shader);
    }

    fn create_program(&mut self) -> Result<GpuProgram, ContextLost> {
        if self.is_lost() {
            return Err(ContextLost);
        }
        Ok(GpuProgram { linked: None })
    }

    fn link_program(
        &mut self,
        program: &mut GpuProgram,
        vertex: &GpuShader,
        fragment: &GpuShader,
    ) -> Result<(), String> {
        program.linked = Some(self.link(vertex, fragment)?);
        Ok(())
    }

    fn delete_program(&mut self, program: GpuProgram) {
        drop(program);
    }

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<GpuBuffer, ContextLost> {
        if self.is_lost() {
            return Err(ContextLost);
        }
        let vertices = expand_vertices(data);
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("portfolio quad"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        Ok(GpuBuffer { buffer })
    }

    fn delete_buffer(&mut self, buffer: GpuBuffer) {
        buffer.buffer.destroy();
    }

    fn attribute_location(&self, program: &GpuProgram, name: &str) -> Option<GpuLocation> {
        program
            .linked
            .as_ref()?
            .attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| GpuLocation(Slot::Attribute(attribute.location)))
    }

    fn uniform_location(&self, program: &GpuProgram, name: &str) -> Option<GpuLocation> {
        let linked = program.linked.as_ref()?;
        let vertex = linked.vertex.as_ref().and_then(|uniforms| uniforms.slot(name));
        let fragment = linked.fragment.slot(name);
        if vertex.is_none() && fragment.is_none() {
            return None;
        }
        Some(GpuLocation(Slot::Uniform { vertex, fragment }))
    }

    fn resize(&mut self, size: SurfaceSize) -> SurfaceSize {
        self.size = size;
        if size.is_empty() {
            return size;
        }
        let width = size.width.min(self.max_dimension);
        let height = size.height.min(self.max_dimension);
        if width != size.width || height != size.height {
            tracing::warn!(
                requested_width = size.width,
                requested_height = size.height,
                max = self.max_dimension,
                "surface clamped to GPU texture limit"
            );
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        SurfaceSize::new(width, height)
    }

    fn set_uniform_f32(&mut self, program: &mut GpuProgram, location: &GpuLocation, value: f32) {
        write_slot(program, location, &[value]);
    }

    fn set_uniform_vec2(
        &mut self,
        program: &mut GpuProgram,
        location: &GpuLocation,
        value: [f32; 2],
    ) {
        write_slot(program, location, &value);
    }

    fn draw_quad(
        &mut self,
        program: &GpuProgram,
        buffer: &GpuBuffer,
        _position: Option<&GpuLocation>,
        vertex_count: u32,
    ) -> Result<(), ContextLost> {
        if self.is_lost() {
            return Err(ContextLost);
        }
        let Some(linked) = program.linked.as_ref() else {
            tracing::warn!("draw requested for an unlinked program");
            return Ok(());
        };
        if self.size.is_empty() {
            tracing::trace!("surface has no area; skipping draw");
            return Ok(());
        }

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("surface out of memory");
                self.lost.store(true, Ordering::SeqCst);
                return Err(ContextLost);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::debug!("surface timeout; skipping frame");
                return Ok(());
            }
            Err(other) => {
                tracing::warn!(error = ?other, "surface error; skipping frame");
                return Ok(());
            }
        };

        self.upload_uniforms(linked);

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("portfolio frame"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("portfolio pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&linked.pipeline);
            render_pass.set_bind_group(0, &linked.bind_group, &[]);
            if !linked.attributes.is_empty() {
                render_pass.set_vertex_buffer(0, buffer.buffer.slice(..));
            }
            render_pass.draw(0..vertex_count, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_vertices_expand_to_homogeneous_positions() {
        let expanded = expand_vertices(&crate::host::QUAD_VERTICES);
        assert_eq!(expanded.len(), 4);
        assert_eq!(expanded[0], [-1.0, -1.0, 0.0, 1.0]);
        assert_eq!(expanded[3], [1.0, 1.0, 0.0, 1.0]);
        assert_eq!(
            std::mem::size_of::<[f32; 4]>() as u64,
            VERTEX_STRIDE,
            "stride matches one expanded vertex"
        );
    }

    #[test]
    fn attribute_formats_follow_component_count() {
        assert_eq!(vertex_format(2), wgpu::VertexFormat::Float32x2);
        assert_eq!(vertex_format(4), wgpu::VertexFormat::Float32x4);
    }
}
