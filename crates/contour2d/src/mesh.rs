//! Line-mesh tessellation.
//!
//! Every contour segment becomes six vertices: two triangles forming a thin
//! quad whose corners carry a signed copy of the segment chord as their
//! tangent. The vertex stage pushes each corner sideways along the tangent's
//! perpendicular by a fixed number of pixels, so the ribbon keeps a constant
//! screen width at any zoom. The same storage read at three times the stride
//! yields one point per third vertex, which the cap pass draws as round dots.

use bytemuck::{Pod, Zeroable};
use glam::DVec2;

use crate::bounds::Bounds;
use crate::extract::{Segment, SegmentExtractor};
use crate::field::Field;

/// `(weight along the segment, weight across it)` for the six corners.
pub const SEGMENT_WEIGHTS: [(f64, f64); 6] = [
    (1.0, 0.0),
    (0.0, 0.0),
    (0.0, 1.0),
    (1.0, 0.0),
    (1.0, 1.0),
    (0.0, 1.0),
];

pub const VERTICES_PER_SEGMENT: usize = SEGMENT_WEIGHTS.len();

/// Every `CAP_STEP`-th body vertex is a cap point.
pub const CAP_STEP: usize = 3;

/// Position and tangent, interleaved. Positions live in the unit box.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ContourVertex {
    pub position: [f32; 2],
    pub tangent: [f32; 2],
}

impl ContourVertex {
    pub const SIZE: usize = std::mem::size_of::<ContourVertex>();
    pub const TANGENT_OFFSET: usize = std::mem::size_of::<[f32; 2]>();
}

/// 8-bit RGBA color as uploaded to the color buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba8(pub [u8; 4]);

impl Rgba8 {
    pub const SIZE: usize = std::mem::size_of::<Rgba8>();

    /// Quantize unit-interval channels, truncating like an integer cast.
    pub fn from_unit(rgba: [f64; 4]) -> Self {
        Rgba8(rgba.map(|c| (255.0 * c) as u8))
    }
}

/// A contour threshold and the color its lines are drawn with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    pub value: f64,
    pub color: Rgba8,
}

impl Level {
    /// Pair level values with flat RGBA colors. Levels without a complete
    /// color quadruple are dropped.
    pub fn zip(levels: &[f64], level_colors: &[f64]) -> Vec<Level> {
        let complete = level_colors.len() / 4;
        if complete < levels.len() {
            log::warn!(
                target: "contour2d",
                "{} level(s) have no color and will not be drawn",
                levels.len() - complete
            );
        }
        levels
            .iter()
            .zip(level_colors.chunks_exact(4))
            .map(|(&value, rgba)| Level {
                value,
                color: Rgba8::from_unit([rgba[0], rgba[1], rgba[2], rgba[3]]),
            })
            .collect()
    }
}

/// Three parallel vertex streams, six entries per segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContourMesh {
    vertices: Vec<ContourVertex>,
    colors: Vec<Rgba8>,
    ids: Vec<u32>,
}

impl ContourMesh {
    pub fn with_capacity(segments: usize) -> Self {
        let n = segments * VERTICES_PER_SEGMENT;
        Self {
            vertices: Vec::with_capacity(n),
            colors: Vec::with_capacity(n),
            ids: Vec::with_capacity(n),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn segment_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_SEGMENT
    }

    pub fn vertices(&self) -> &[ContourVertex] {
        &self.vertices
    }

    pub fn colors(&self) -> &[Rgba8] {
        &self.colors
    }

    pub fn pick_ids(&self) -> &[u32] {
        &self.ids
    }

    /// Triangle-list view used by the ribbon pass.
    pub fn body(&self) -> BodyView<'_> {
        BodyView {
            vertices: &self.vertices,
            colors: &self.colors,
        }
    }

    /// Point view used by the cap pass: every third body vertex.
    pub fn caps(&self) -> CapView<'_> {
        CapView {
            vertices: &self.vertices,
            colors: &self.colors,
        }
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn pick_id_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.ids)
    }

    /// Append the six corners of one normalized segment `a -> b`.
    pub fn push_segment(&mut self, a: DVec2, b: DVec2, color: Rgba8, pick_id: u32) {
        let d = a - b;
        for (along, across) in SEGMENT_WEIGHTS {
            let position = a * (1.0 - along) + b * along;
            let tangent = d * (2.0 * across - 1.0);
            self.vertices.push(ContourVertex {
                position: position.as_vec2().to_array(),
                tangent: tangent.as_vec2().to_array(),
            });
            self.colors.push(color);
            self.ids.push(pick_id);
        }
    }
}

/// Byte layout shared by both views of the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamLayout {
    pub vertex_stride: u64,
    pub color_stride: u64,
    pub element_count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct BodyView<'a> {
    vertices: &'a [ContourVertex],
    colors: &'a [Rgba8],
}

impl<'a> BodyView<'a> {
    pub const VERTEX_STRIDE: u64 = ContourVertex::SIZE as u64;
    pub const COLOR_STRIDE: u64 = Rgba8::SIZE as u64;

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a ContourVertex, &'a Rgba8)> + 'a {
        self.vertices.iter().zip(self.colors.iter())
    }

    pub fn layout(&self) -> StreamLayout {
        StreamLayout {
            vertex_stride: Self::VERTEX_STRIDE,
            color_stride: Self::COLOR_STRIDE,
            element_count: self.len() as u32,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CapView<'a> {
    vertices: &'a [ContourVertex],
    colors: &'a [Rgba8],
}

impl<'a> CapView<'a> {
    pub const VERTEX_STRIDE: u64 = (ContourVertex::SIZE * CAP_STEP) as u64;
    pub const COLOR_STRIDE: u64 = (Rgba8::SIZE * CAP_STEP) as u64;

    pub fn len(&self) -> usize {
        self.vertices.len() / CAP_STEP
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<(&'a ContourVertex, &'a Rgba8)> {
        if index >= self.len() {
            return None;
        }
        let at = index * CAP_STEP;
        Some((&self.vertices[at], &self.colors[at]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a ContourVertex, &'a Rgba8)> + 'a {
        let len = self.len() * CAP_STEP;
        self.vertices[..len]
            .iter()
            .step_by(CAP_STEP)
            .zip(self.colors[..len].iter().step_by(CAP_STEP))
    }

    pub fn layout(&self) -> StreamLayout {
        StreamLayout {
            vertex_stride: Self::VERTEX_STRIDE,
            color_stride: Self::COLOR_STRIDE,
            element_count: self.len() as u32,
        }
    }
}

/// Pick id of a segment: the grid sample nearest its first endpoint.
pub fn segment_pick_id(segment: &Segment, width: usize) -> u32 {
    let col = segment.a.x.round().max(0.0) as u64;
    let row = segment.a.y.round().max(0.0) as u64;
    (col + width as u64 * row) as u32
}

/// Run extraction for every level and tessellate the result.
pub fn tessellate(
    field: &Field,
    bounds: &Bounds,
    levels: &[Level],
    extractor: &dyn SegmentExtractor,
) -> ContourMesh {
    let extractions: Vec<_> = levels
        .iter()
        .map(|level| extractor.extract(field, level.value))
        .collect();
    let total: usize = extractions.iter().map(|e| e.segments.len()).sum();
    let mut mesh = ContourMesh::with_capacity(total);

    for (level, extraction) in levels.iter().zip(&extractions) {
        for segment in &extraction.segments {
            let pick_id = segment_pick_id(segment, field.width());
            let (ax, ay) = field.to_real(segment.a.x, segment.a.y);
            let (bx, by) = field.to_real(segment.b.x, segment.b.y);
            let a = bounds.normalize(DVec2::new(ax, ay));
            let b = bounds.normalize(DVec2::new(bx, by));
            mesh.push_segment(a, b, level.color, pick_id);
        }
    }
    mesh
}
