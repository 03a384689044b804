//! `wgpu` implementation of [`GpuBackend`].
//!
//! Draws are queued by [`GpuBackend::draw`] and replayed into a caller-owned
//! color attachment by [`WgpuBackend::render`]. The attachment is loaded, not
//! cleared, so contours land on top of whatever the host plot already drew.

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use super::{
    BufferId, BufferRole, DrawCommand, GpuBackend, Primitive, ProgramId, ProgramSource,
};
use crate::error::{ContourError, Result};
use crate::view::ContourUniforms;

const POSITION_TANGENT_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
const COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Unorm8x4];

/// Corners of the quad drawn for each cap instance.
const CAP_QUAD_VERTICES: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WgpuBackendConfig {
    pub format: wgpu::TextureFormat,
    pub msaa_samples: u32,
}

impl Default for WgpuBackendConfig {
    fn default() -> Self {
        Self {
            format: wgpu::TextureFormat::Bgra8UnormSrgb,
            msaa_samples: 1,
        }
    }
}

impl WgpuBackendConfig {
    /// Sample count actually used for pipelines.
    pub fn sample_count(&self) -> u32 {
        match self.msaa_samples {
            0 | 1 => 1,
            2 => 2,
            4 => 4,
            8 | 16 => 8,
            _ => 4,
        }
    }
}

struct ProgramSlot {
    source: ProgramSource,
    module: wgpu::ShaderModule,
}

/// Uniform storage for one queued draw, reused across frames.
struct UniformSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct BufferSlot {
    role: BufferRole,
    buffer: wgpu::Buffer,
    len: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    primitive: Primitive,
    position_stride: u64,
    color_stride: u64,
}

impl PipelineKey {
    fn of(command: &DrawCommand) -> Self {
        Self {
            program: command.program,
            primitive: command.primitive,
            position_stride: command.position_tangent.stride,
            color_stride: command.color.stride,
        }
    }
}

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: WgpuBackendConfig,
    uniform_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    programs: Vec<Option<ProgramSlot>>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    buffers: HashMap<BufferId, BufferSlot>,
    next_buffer: u32,
    pending: Vec<DrawCommand>,
    uniform_slots: Vec<UniformSlot>,
}

impl WgpuBackend {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        config: WgpuBackendConfig,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("contour2d-uniform-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(
                        std::mem::size_of::<ContourUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("contour2d-pipeline-layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });
        Self {
            device,
            queue,
            config,
            uniform_layout,
            pipeline_layout,
            programs: Vec::new(),
            pipelines: HashMap::new(),
            buffers: HashMap::new(),
            next_buffer: 0,
            pending: Vec::new(),
            uniform_slots: Vec::new(),
        }
    }

    pub fn config(&self) -> WgpuBackendConfig {
        self.config
    }

    /// Change the MSAA sample count. Cached pipelines are dropped when the
    /// effective count changes.
    pub fn set_msaa_samples(&mut self, requested: u32) {
        let before = self.config.sample_count();
        self.config.msaa_samples = requested;
        if self.config.sample_count() != before {
            self.pipelines.clear();
        }
    }

    pub fn pending_draws(&self) -> &[DrawCommand] {
        &self.pending
    }

    /// Uniform buffers allocated so far; grows to the largest frame seen.
    pub fn uniform_slot_count(&self) -> usize {
        self.uniform_slots.len()
    }

    /// Encode and submit every queued draw into `target`.
    ///
    /// With MSAA enabled, `target` must be the multisampled view and
    /// `resolve_target` the single-sample view it resolves into.
    pub fn render(
        &mut self,
        target: &wgpu::TextureView,
        resolve_target: Option<&wgpu::TextureView>,
    ) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(());
        }

        let mut prepared = Vec::with_capacity(pending.len());
        for command in &pending {
            if command.count == 0 {
                continue;
            }
            let key = PipelineKey::of(command);
            if !self.pipelines.contains_key(&key) {
                log::warn!(target: "contour2d", "no pipeline for {:?}; draw skipped", key);
                continue;
            }
            let (Some(positions), Some(colors)) = (
                self.buffers.get(&command.position_tangent.buffer),
                self.buffers.get(&command.color.buffer),
            ) else {
                log::warn!(
                    target: "contour2d",
                    "draw references a released buffer; skipped"
                );
                continue;
            };
            if command.position_tangent.offset >= positions.len.max(1)
                || command.color.offset >= colors.len.max(1)
            {
                log::warn!(target: "contour2d", "draw offset past buffer end; skipped");
                continue;
            }
            let slot = prepared.len();
            if slot == self.uniform_slots.len() {
                let uniform_slot = self.create_uniform_slot();
                self.uniform_slots.push(uniform_slot);
            }
            self.queue.write_buffer(
                &self.uniform_slots[slot].buffer,
                0,
                bytemuck::bytes_of(&command.uniforms),
            );
            prepared.push((key, *command, slot));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("contour2d-encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("contour2d-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            for (key, command, slot) in &prepared {
                let (Some(pipeline), Some(positions), Some(colors)) = (
                    self.pipelines.get(key),
                    self.buffers.get(&command.position_tangent.buffer),
                    self.buffers.get(&command.color.buffer),
                ) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.uniform_slots[*slot].bind_group, &[]);
                pass.set_vertex_buffer(
                    0,
                    positions.buffer.slice(command.position_tangent.offset..),
                );
                pass.set_vertex_buffer(1, colors.buffer.slice(command.color.offset..));
                match command.primitive {
                    Primitive::Triangles => pass.draw(0..command.count, 0..1),
                    Primitive::Points => pass.draw(0..CAP_QUAD_VERTICES, 0..command.count),
                }
            }
        }
        self.queue.submit(Some(encoder.finish()));
        log::trace!(target: "contour2d", "submitted {} contour draw(s)", prepared.len());
        Ok(())
    }

    fn create_uniform_slot(&self) -> UniformSlot {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("contour2d-uniforms"),
            size: std::mem::size_of::<ContourUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("contour2d-uniform-bind-group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        log::trace!(
            target: "contour2d",
            "allocated uniform slot {}",
            self.uniform_slots.len()
        );
        UniformSlot { buffer, bind_group }
    }

    fn program(&self, id: ProgramId) -> Result<&ProgramSlot> {
        self.programs
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(ContourError::UnknownHandle(id.0))
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) -> Result<()> {
        if self.pipelines.contains_key(&key) {
            return Ok(());
        }
        let slot = self.program(key.program)?;
        let (entry_point, step_mode) = match key.primitive {
            Primitive::Triangles => (slot.source.vertex_entry, wgpu::VertexStepMode::Vertex),
            Primitive::Points => (slot.source.point_entry, wgpu::VertexStepMode::Instance),
        };
        let buffers = [
            wgpu::VertexBufferLayout {
                array_stride: key.position_stride,
                step_mode,
                attributes: &POSITION_TANGENT_ATTRIBUTES,
            },
            wgpu::VertexBufferLayout {
                array_stride: key.color_stride,
                step_mode,
                attributes: &COLOR_ATTRIBUTES,
            },
        ];

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(slot.source.label),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &slot.module,
                    entry_point,
                    buffers: &buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &slot.module,
                    entry_point: slot.source.fragment_entry,
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
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
                    count: self.config.sample_count(),
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ContourError::Shader {
                label: slot.source.label.to_string(),
                message: err.to_string(),
            });
        }
        log::trace!(
            target: "contour2d",
            "created {:?} pipeline for `{}` (strides {}/{})",
            key.primitive,
            slot.source.label,
            key.position_stride,
            key.color_stride
        );
        self.pipelines.insert(key, pipeline);
        Ok(())
    }
}

impl GpuBackend for WgpuBackend {
    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramId> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(source.label),
                source: wgpu::ShaderSource::Wgsl(source.wgsl.into()),
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ContourError::Shader {
                label: source.label.to_string(),
                message: err.to_string(),
            });
        }
        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(Some(ProgramSlot {
            source: *source,
            module,
        }));
        log::debug!(target: "contour2d", "compiled program `{}` as {:?}", source.label, id);
        Ok(id)
    }

    fn release_program(&mut self, program: ProgramId) {
        if let Some(slot) = self.programs.get_mut(program.0 as usize) {
            *slot = None;
        }
        self.pipelines.retain(|key, _| key.program != program);
    }

    fn create_buffer(&mut self, role: BufferRole) -> Result<BufferId> {
        let id = BufferId(self.next_buffer);
        self.next_buffer = self
            .next_buffer
            .checked_add(1)
            .ok_or_else(|| ContourError::Buffer("buffer handles exhausted".to_string()))?;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(role.label()),
            size: wgpu::COPY_BUFFER_ALIGNMENT,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.buffers.insert(id, BufferSlot { role, buffer, len: 0 });
        Ok(id)
    }

    fn update_buffer(&mut self, buffer: BufferId, data: &[u8]) -> Result<()> {
        let slot = self
            .buffers
            .get_mut(&buffer)
            .ok_or(ContourError::UnknownHandle(buffer.0))?;
        let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
        let padded_len = data.len().div_ceil(align) * align;
        if padded_len as u64 > slot.buffer.size() {
            log::trace!(
                target: "contour2d",
                "growing {} buffer to {} bytes",
                slot.role.label(),
                padded_len
            );
            slot.buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(slot.role.label()),
                size: padded_len as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        }
        if padded_len == data.len() {
            self.queue.write_buffer(&slot.buffer, 0, data);
        } else if !data.is_empty() {
            let mut padded = Vec::with_capacity(padded_len);
            padded.extend_from_slice(data);
            padded.resize(padded_len, 0);
            self.queue.write_buffer(&slot.buffer, 0, &padded);
        }
        slot.len = data.len() as u64;
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        if let Some(slot) = self.buffers.remove(&buffer) {
            slot.buffer.destroy();
        }
    }

    fn draw(&mut self, command: &DrawCommand) -> Result<()> {
        for binding in [command.position_tangent, command.color] {
            if !self.buffers.contains_key(&binding.buffer) {
                return Err(ContourError::UnknownHandle(binding.buffer.0));
            }
        }
        self.ensure_pipeline(PipelineKey::of(command))?;
        self.pending.push(*command);
        Ok(())
    }
}
