//! GPU collaborator interface.
//!
//! Contour objects never touch a device directly. They compile programs,
//! create and fill buffers, and submit draws through [`GpuBackend`], which
//! hands out opaque handles. [`WgpuBackend`] drives a real `wgpu` device;
//! [`RecordingBackend`] keeps everything in memory for headless hosts.

pub mod recording;
pub mod shaders;
pub mod wgpu_backend;

pub use recording::{BackendCall, RecordingBackend};
pub use wgpu_backend::{WgpuBackend, WgpuBackendConfig};

use crate::error::Result;
use crate::view::ContourUniforms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// WGSL source plus the entry points a contour program exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramSource {
    pub label: &'static str,
    pub wgsl: &'static str,
    /// Per-vertex entry used for triangle draws.
    pub vertex_entry: &'static str,
    /// Per-instance entry used for point draws.
    pub point_entry: &'static str,
    pub fragment_entry: &'static str,
}

/// What a buffer holds; backends use it for labels and usage flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferRole {
    PositionTangent,
    Color,
    PickId,
}

impl BufferRole {
    pub fn label(self) -> &'static str {
        match self {
            BufferRole::PositionTangent => "contour-position-tangent",
            BufferRole::Color => "contour-color",
            BufferRole::PickId => "contour-pick-id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Triangles,
    /// Screen-aligned square sprites, `point_size` pixels across.
    Points,
}

/// A buffer read with a fixed stride starting at `offset` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamBinding {
    pub buffer: BufferId,
    pub stride: u64,
    pub offset: u64,
}

/// One draw submission. `count` is vertices for triangles and points for
/// point draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub program: ProgramId,
    pub primitive: Primitive,
    pub position_tangent: StreamBinding,
    pub color: StreamBinding,
    pub count: u32,
    pub uniforms: ContourUniforms,
}

/// Shader compilation, buffer storage and draw submission.
pub trait GpuBackend {
    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramId>;

    fn release_program(&mut self, program: ProgramId);

    fn create_buffer(&mut self, role: BufferRole) -> Result<BufferId>;

    /// Replace the entire contents of `buffer`.
    fn update_buffer(&mut self, buffer: BufferId, data: &[u8]) -> Result<()>;

    fn release_buffer(&mut self, buffer: BufferId);

    fn draw(&mut self, command: &DrawCommand) -> Result<()>;
}
