//! The contour overlay object: owns the derived mesh and the GPU resources it
//! is uploaded to, and turns host view state into two draw submissions.

use std::any::Any;

use crate::bounds::Bounds;
use crate::error::Result;
use crate::extract::{MarchingSquares, SegmentExtractor};
use crate::field::Field;
use crate::gpu::shaders::{CONTOUR_PROGRAM, PICK_PROGRAM};
use crate::gpu::{
    BufferId, BufferRole, DrawCommand, GpuBackend, Primitive, ProgramId, StreamBinding,
};
use crate::mesh::{tessellate, ContourMesh, Level, StreamLayout};
use crate::options::{line_width_or_default, ContourOptions};
use crate::pick::{NoPickResolver, PickContext, PickQuery, PickResolver, PickResult};
use crate::plot::{ObjectId, Plot2d, PlotObject};
use crate::view::{ContourUniforms, DrawScratch, PlotView};

const BUFFER_ROLES: [BufferRole; 3] = [
    BufferRole::PositionTangent,
    BufferRole::Color,
    BufferRole::PickId,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourPrograms {
    pub main: ProgramId,
    /// Compiled up front; the id pass does not use it yet.
    pub pick: ProgramId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourBuffers {
    pub position_tangent: BufferId,
    pub color: BufferId,
    pub pick_id: BufferId,
}

/// Everything a contour object holds on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GpuResources {
    programs: ContourPrograms,
    buffers: ContourBuffers,
}

impl GpuResources {
    /// Compile both programs and allocate the three streams. Whatever was
    /// created before a failure is released again.
    fn create(backend: &mut dyn GpuBackend) -> Result<Self> {
        let main = backend.compile_program(&CONTOUR_PROGRAM)?;
        let pick = match backend.compile_program(&PICK_PROGRAM) {
            Ok(pick) => pick,
            Err(err) => {
                backend.release_program(main);
                return Err(err);
            }
        };
        let programs = ContourPrograms { main, pick };

        let mut created = Vec::with_capacity(BUFFER_ROLES.len());
        for role in BUFFER_ROLES {
            match backend.create_buffer(role) {
                Ok(id) => created.push(id),
                Err(err) => {
                    for id in created {
                        backend.release_buffer(id);
                    }
                    backend.release_program(programs.main);
                    backend.release_program(programs.pick);
                    return Err(err);
                }
            }
        }
        Ok(Self {
            programs,
            buffers: ContourBuffers {
                position_tangent: created[0],
                color: created[1],
                pick_id: created[2],
            },
        })
    }

    fn upload(&self, backend: &mut dyn GpuBackend, mesh: &ContourMesh) -> Result<()> {
        backend.update_buffer(self.buffers.position_tangent, mesh.vertex_bytes())?;
        backend.update_buffer(self.buffers.color, mesh.color_bytes())?;
        backend.update_buffer(self.buffers.pick_id, mesh.pick_id_bytes())
    }

    fn release(self, backend: &mut dyn GpuBackend) {
        backend.release_buffer(self.buffers.position_tangent);
        backend.release_buffer(self.buffers.color);
        backend.release_buffer(self.buffers.pick_id);
        backend.release_program(self.programs.main);
        backend.release_program(self.programs.pick);
    }
}

/// Isolines of a gridded scalar field, drawn as constant-width ribbons with
/// round caps.
///
/// Only derived state is kept between updates: the mesh mirrored on the GPU,
/// the data bounds, the line width and the last pick offset.
pub struct Contour2d {
    gpu: Option<GpuResources>,
    bounds: Bounds,
    mesh: ContourMesh,
    line_width: f32,
    pick_offset: u32,
    extractor: Box<dyn SegmentExtractor>,
    resolver: Box<dyn PickResolver>,
}

impl Contour2d {
    /// Compile both programs and allocate the three vertex streams.
    pub fn new(backend: &mut dyn GpuBackend) -> Result<Self> {
        Self::with_extractor(backend, Box::new(MarchingSquares))
    }

    pub fn with_extractor(
        backend: &mut dyn GpuBackend,
        extractor: Box<dyn SegmentExtractor>,
    ) -> Result<Self> {
        let gpu = GpuResources::create(backend)?;
        Ok(Self {
            gpu: Some(gpu),
            bounds: Bounds::default(),
            mesh: ContourMesh::default(),
            line_width: 1.0,
            pick_offset: 0,
            extractor,
            resolver: Box::new(NoPickResolver),
        })
    }

    pub fn set_pick_resolver(&mut self, resolver: Box<dyn PickResolver>) {
        self.resolver = resolver;
    }

    /// Rebuild the mesh from `options` and re-upload every buffer.
    ///
    /// Invalid options leave the object untouched. If an upload fails partway
    /// the GPU streams no longer match any mesh, so the object is cleared and
    /// draws nothing until the next successful update.
    pub fn update(&mut self, backend: &mut dyn GpuBackend, options: &ContourOptions) -> Result<()> {
        let field = Field::from_options(options)?;
        let bounds = Bounds::from_axes(field.x(), field.y())?;
        let levels = Level::zip(&options.levels, &options.level_colors);
        let mesh = tessellate(&field, &bounds, &levels, self.extractor.as_ref());

        let gpu = match self.gpu {
            Some(gpu) => gpu,
            None => {
                let gpu = GpuResources::create(backend)?;
                self.gpu = Some(gpu);
                gpu
            }
        };
        if let Err(err) = gpu.upload(backend, &mesh) {
            log::warn!(
                target: "contour2d",
                "contour upload failed, clearing mesh: {err}"
            );
            self.mesh = ContourMesh::default();
            return Err(err);
        }

        log::debug!(
            target: "contour2d",
            "contour update: {}x{} grid, {} level(s), {} segment(s), {} vertices",
            field.width(),
            field.height(),
            levels.len(),
            mesh.segment_count(),
            mesh.vertex_count()
        );

        self.bounds = bounds;
        self.mesh = mesh;
        self.line_width = options.effective_line_width();
        Ok(())
    }

    /// Change the line width without touching the mesh.
    pub fn set_line_width(&mut self, width: f64) {
        self.line_width = line_width_or_default(Some(width));
    }

    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    pub fn mesh(&self) -> &ContourMesh {
        &self.mesh
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// `None` once disposed.
    pub fn programs(&self) -> Option<ContourPrograms> {
        self.gpu.map(|gpu| gpu.programs)
    }

    /// `None` once disposed.
    pub fn buffers(&self) -> Option<ContourBuffers> {
        self.gpu.map(|gpu| gpu.buffers)
    }

    pub fn pick_offset(&self) -> u32 {
        self.pick_offset
    }

    /// Submit the ribbon pass and the cap pass.
    pub fn draw(&mut self, backend: &mut dyn GpuBackend, view: &PlotView) -> Result<()> {
        let Some(gpu) = self.gpu else {
            return Ok(());
        };
        if self.mesh.is_empty() {
            return Ok(());
        }
        let Some(scratch) = DrawScratch::new(&self.bounds, view, self.line_width) else {
            log::warn!(
                target: "contour2d",
                "data box {:?} has zero extent; contour draw skipped",
                view.data_box
            );
            return Ok(());
        };

        let body = self.mesh.body().layout();
        let caps = self.mesh.caps().layout();
        log::trace!(
            target: "contour2d",
            "contour draw: transform {:?}, {} body vertices, {} caps, {}px",
            scratch.transform.to_cols_array(),
            body.element_count,
            caps.element_count,
            scratch.line_width_px
        );

        backend.draw(&command(
            gpu,
            Primitive::Triangles,
            body,
            scratch.body_uniforms(),
        ))?;
        backend.draw(&command(gpu, Primitive::Points, caps, scratch.cap_uniforms()))?;
        Ok(())
    }

    /// Record the id-pass offset. No ids are reserved, so the offset comes
    /// back unchanged.
    pub fn draw_pick(&mut self, pick_offset: u32) -> u32 {
        self.pick_offset = pick_offset;
        pick_offset
    }

    pub fn pick(&self, query: &PickQuery) -> Option<PickResult> {
        let context = PickContext {
            bounds: &self.bounds,
            mesh: &self.mesh,
            pick_offset: self.pick_offset,
        };
        self.resolver.resolve(&context, query)
    }

    /// Release programs and vertex streams. Detaching from a host is the
    /// host's job; see [`Plot2d::dispose_object`].
    pub fn dispose(&mut self, backend: &mut dyn GpuBackend) {
        if let Some(gpu) = self.gpu.take() {
            gpu.release(backend);
            log::debug!(target: "contour2d", "contour resources released");
        }
    }
}

fn command(
    gpu: GpuResources,
    primitive: Primitive,
    layout: StreamLayout,
    uniforms: ContourUniforms,
) -> DrawCommand {
    DrawCommand {
        program: gpu.programs.main,
        primitive,
        position_tangent: StreamBinding {
            buffer: gpu.buffers.position_tangent,
            stride: layout.vertex_stride,
            offset: 0,
        },
        color: StreamBinding {
            buffer: gpu.buffers.color,
            stride: layout.color_stride,
            offset: 0,
        },
        count: layout.element_count,
        uniforms,
    }
}

impl PlotObject for Contour2d {
    fn draw(&mut self, backend: &mut dyn GpuBackend, view: &PlotView) -> Result<()> {
        Contour2d::draw(self, backend, view)
    }

    fn draw_pick(&mut self, pick_offset: u32) -> u32 {
        Contour2d::draw_pick(self, pick_offset)
    }

    fn pick(&self, query: &PickQuery) -> Option<PickResult> {
        Contour2d::pick(self, query)
    }

    fn dispose(&mut self, backend: &mut dyn GpuBackend) {
        Contour2d::dispose(self, backend)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Build a contour object, run its first update and register it with `plot`.
pub fn create_contour2d<B: GpuBackend>(
    plot: &mut Plot2d<B>,
    options: &ContourOptions,
) -> Result<ObjectId> {
    let backend: &mut dyn GpuBackend = plot.backend_mut();
    let mut contour = Contour2d::new(backend)?;
    if let Err(err) = contour.update(backend, options) {
        contour.dispose(backend);
        return Err(err);
    }
    Ok(plot.add_object(Box::new(contour)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContourError;
    use crate::gpu::{BackendCall, ProgramSource, RecordingBackend};
    use crate::view::Rect;

    /// Recording backend that fails the n-th (0-based) call of a kind.
    #[derive(Default)]
    struct FlakyBackend {
        inner: RecordingBackend,
        compiles: usize,
        creates: usize,
        uploads: usize,
        fail_compile: Option<usize>,
        fail_create: Option<usize>,
        fail_upload: Option<usize>,
    }

    fn injected(what: &str) -> ContourError {
        ContourError::Buffer(format!("injected {what} failure"))
    }

    impl GpuBackend for FlakyBackend {
        fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramId> {
            self.compiles += 1;
            if self.fail_compile == Some(self.compiles - 1) {
                return Err(ContourError::Shader {
                    label: source.label.to_string(),
                    message: "injected".to_string(),
                });
            }
            self.inner.compile_program(source)
        }

        fn release_program(&mut self, program: ProgramId) {
            self.inner.release_program(program)
        }

        fn create_buffer(&mut self, role: BufferRole) -> Result<BufferId> {
            self.creates += 1;
            if self.fail_create == Some(self.creates - 1) {
                return Err(injected("create"));
            }
            self.inner.create_buffer(role)
        }

        fn update_buffer(&mut self, buffer: BufferId, data: &[u8]) -> Result<()> {
            self.uploads += 1;
            if self.fail_upload == Some(self.uploads - 1) {
                return Err(injected("upload"));
            }
            self.inner.update_buffer(buffer, data)
        }

        fn release_buffer(&mut self, buffer: BufferId) {
            self.inner.release_buffer(buffer)
        }

        fn draw(&mut self, command: &DrawCommand) -> Result<()> {
            self.inner.draw(command)
        }
    }

    fn ramp() -> ContourOptions {
        ContourOptions::new([3, 3])
            .with_values(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0])
            .with_level(0.5, [0.0, 0.0, 1.0, 1.0])
            .with_level(1.5, [0.0, 1.0, 0.0, 1.0])
    }

    fn view() -> PlotView {
        PlotView {
            view_box: Rect::new(0.0, 0.0, 200.0, 100.0),
            data_box: Rect::new(0.0, 0.0, 2.0, 2.0),
            pixel_ratio: 1.0,
        }
    }

    #[test]
    fn new_compiles_two_programs_and_three_buffers() {
        let mut backend = RecordingBackend::new();
        let contour = Contour2d::new(&mut backend).unwrap();
        let programs = contour.programs().unwrap();
        assert_ne!(programs.main, programs.pick);
        assert_eq!(backend.live_programs(), 2);
        assert_eq!(backend.live_buffers(), 3);
        let buffers = contour.buffers().unwrap();
        assert_eq!(backend.buffer_role(buffers.pick_id), Some(BufferRole::PickId));
    }

    #[test]
    fn update_uploads_all_streams() {
        let mut backend = RecordingBackend::new();
        let mut contour = Contour2d::new(&mut backend).unwrap();
        contour.update(&mut backend, &ramp()).unwrap();
        // two levels, each crossing two cells
        assert_eq!(contour.mesh().segment_count(), 4);
        let buffers = contour.buffers().unwrap();
        assert_eq!(
            backend.buffer_contents(buffers.position_tangent).map(<[u8]>::len),
            Some(24 * 16)
        );
        assert_eq!(
            backend.buffer_contents(buffers.color).map(<[u8]>::len),
            Some(24 * 4)
        );
        assert_eq!(
            backend.buffer_contents(buffers.pick_id).map(<[u8]>::len),
            Some(24 * 4)
        );
    }

    #[test]
    fn failed_update_keeps_previous_state() {
        let mut backend = RecordingBackend::new();
        let mut contour = Contour2d::new(&mut backend).unwrap();
        contour.update(&mut backend, &ramp()).unwrap();
        let before = contour.mesh().clone();
        let bad = ContourOptions::new([3, 3]).with_values(vec![0.0; 8]);
        assert!(matches!(
            contour.update(&mut backend, &bad),
            Err(ContourError::InvalidArgument(_))
        ));
        assert_eq!(contour.mesh(), &before);
    }

    #[test]
    fn partial_upload_failure_clears_the_mesh() {
        let mut backend = FlakyBackend::default();
        let mut contour = Contour2d::new(&mut backend).unwrap();
        contour.update(&mut backend, &ramp()).unwrap();
        assert!(!contour.mesh().is_empty());

        // the next update fails on its second (color) upload, after the
        // position stream has already been replaced
        backend.fail_upload = Some(backend.uploads + 1);
        let one_level = ContourOptions::new([3, 3])
            .with_values(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0])
            .with_level(0.5, [0.0, 0.0, 1.0, 1.0]);
        assert!(matches!(
            contour.update(&mut backend, &one_level),
            Err(ContourError::Buffer(_))
        ));
        let buffers = contour.buffers().unwrap();
        assert_eq!(
            backend.inner.buffer_contents(buffers.position_tangent).map(<[u8]>::len),
            Some(12 * 16)
        );
        assert!(contour.mesh().is_empty());

        backend.inner.clear_calls();
        contour.draw(&mut backend, &view()).unwrap();
        assert!(backend.inner.draws().is_empty());

        backend.fail_upload = None;
        contour.update(&mut backend, &ramp()).unwrap();
        contour.draw(&mut backend, &view()).unwrap();
        assert_eq!(backend.inner.draws()[0].count, 24);
    }

    #[test]
    fn construction_failure_releases_what_was_created() {
        let mut backend = FlakyBackend {
            fail_compile: Some(1),
            ..FlakyBackend::default()
        };
        assert!(matches!(
            Contour2d::new(&mut backend),
            Err(ContourError::Shader { .. })
        ));
        assert_eq!(backend.inner.live_programs(), 0);

        let mut backend = FlakyBackend {
            fail_create: Some(2),
            ..FlakyBackend::default()
        };
        assert!(matches!(
            Contour2d::new(&mut backend),
            Err(ContourError::Buffer(_))
        ));
        assert_eq!(backend.inner.live_programs(), 0);
        assert_eq!(backend.inner.live_buffers(), 0);
    }

    #[test]
    fn draw_submits_body_then_caps() {
        let mut backend = RecordingBackend::new();
        let mut contour = Contour2d::new(&mut backend).unwrap();
        contour.update(&mut backend, &ramp().with_line_width(2.0)).unwrap();
        backend.clear_calls();
        let view = PlotView {
            pixel_ratio: 1.5,
            ..view()
        };
        contour.draw(&mut backend, &view).unwrap();
        let draws = backend.draws();
        assert_eq!(draws.len(), 2);
        let (body, caps) = (draws[0], draws[1]);
        assert_eq!(body.primitive, Primitive::Triangles);
        assert_eq!(body.count, 24);
        assert_eq!(body.uniforms.line_width, 3.0);
        assert_eq!(caps.primitive, Primitive::Points);
        assert_eq!(caps.count, 8);
        assert_eq!(caps.uniforms.point_size, 3.0);
        assert_eq!(caps.uniforms.line_width, 0.0);
        assert_eq!(Some(body.program), contour.programs().map(|p| p.main));
    }

    #[test]
    fn degenerate_data_box_skips_drawing() {
        let mut backend = RecordingBackend::new();
        let mut contour = Contour2d::new(&mut backend).unwrap();
        contour.update(&mut backend, &ramp()).unwrap();
        let view = PlotView {
            data_box: Rect::new(1.0, 0.0, 1.0, 2.0),
            ..view()
        };
        contour.draw(&mut backend, &view).unwrap();
        assert!(backend.draws().is_empty());
    }

    #[test]
    fn dispose_releases_resources_and_silences_draws() {
        let mut backend = RecordingBackend::new();
        let mut contour = Contour2d::new(&mut backend).unwrap();
        contour.update(&mut backend, &ramp()).unwrap();
        contour.dispose(&mut backend);
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(backend.live_programs(), 0);
        let released = backend
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::ReleaseBuffer(_)))
            .count();
        assert_eq!(released, 3);
        contour.draw(&mut backend, &view()).unwrap();
        assert!(backend.draws().is_empty());
        // a second dispose is a no-op
        let calls = backend.calls().len();
        contour.dispose(&mut backend);
        assert_eq!(backend.calls().len(), calls);
    }

    #[test]
    fn shader_failure_surfaces_from_new() {
        let mut backend = RecordingBackend::failing_compilation();
        assert!(matches!(
            Contour2d::new(&mut backend),
            Err(ContourError::Shader { .. })
        ));
    }
}
