//! Segment extraction: the collaborator that turns a field and one level
//! value into straight line pieces in fractional grid-index space.

use glam::DVec2;

use crate::field::Field;

/// One straight contour piece. Endpoints are `(col, row)` grid indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: DVec2,
    pub b: DVec2,
}

impl Segment {
    pub fn new(a: DVec2, b: DVec2) -> Self {
        Self { a, b }
    }
}

/// Output of one extraction pass.
///
/// `corner_indices[i]` is the flat sample index (`col + width * row`) of the
/// lower-left corner of the cell that produced `segments[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub segments: Vec<Segment>,
    pub corner_indices: Vec<usize>,
}

impl Extraction {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Produces contour segments for a single level.
pub trait SegmentExtractor {
    fn extract(&self, field: &Field, level: f64) -> Extraction;
}

impl<F> SegmentExtractor for F
where
    F: Fn(&Field, f64) -> Extraction,
{
    fn extract(&self, field: &Field, level: f64) -> Extraction {
        self(field, level)
    }
}

/// Cell-by-cell marching squares over the sample grid.
///
/// A corner counts as inside when its sample is strictly greater than the
/// level, so a field equal to the level everywhere yields no segments.
/// Saddle cells are resolved with the average of their four corners.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarchingSquares;

impl SegmentExtractor for MarchingSquares {
    fn extract(&self, field: &Field, level: f64) -> Extraction {
        let mut out = Extraction::default();
        let (width, height) = (field.width(), field.height());
        if width < 2 || height < 2 {
            return out;
        }
        for row in 0..height - 1 {
            for col in 0..width - 1 {
                march_cell(field, col, row, level, &mut out);
            }
        }
        out
    }
}

// Corner order: 0 = (c, r), 1 = (c+1, r), 2 = (c+1, r+1), 3 = (c, r+1).
// Edge k joins corner k and corner (k + 1) % 4.
fn march_cell(field: &Field, col: usize, row: usize, level: f64, out: &mut Extraction) {
    let values = [
        field.value(col, row),
        field.value(col + 1, row),
        field.value(col + 1, row + 1),
        field.value(col, row + 1),
    ];
    if values.iter().any(|v| v.is_nan()) {
        return;
    }
    let case_index = (values[0] > level) as u8
        | ((values[1] > level) as u8) << 1
        | ((values[2] > level) as u8) << 2
        | ((values[3] > level) as u8) << 3;

    let mut pairs: [(usize, usize); 2] = [(0, 0); 2];
    let count = match case_index {
        0 | 15 => 0,
        1 | 14 => {
            pairs[0] = (3, 0);
            1
        }
        2 | 13 => {
            pairs[0] = (0, 1);
            1
        }
        3 | 12 => {
            pairs[0] = (3, 1);
            1
        }
        4 | 11 => {
            pairs[0] = (1, 2);
            1
        }
        6 | 9 => {
            pairs[0] = (0, 2);
            1
        }
        7 | 8 => {
            pairs[0] = (3, 2);
            1
        }
        5 | 10 => {
            let center_inside = values.iter().sum::<f64>() * 0.25 > level;
            // true: cut off corners 1 and 3, false: cut off corners 0 and 2.
            let join_even = (case_index == 5) == center_inside;
            if join_even {
                pairs = [(0, 1), (2, 3)];
            } else {
                pairs = [(3, 0), (1, 2)];
            }
            2
        }
        _ => 0,
    };

    let origin = DVec2::new(col as f64, row as f64);
    let corner_index = col + field.width() * row;
    for &(edge_a, edge_b) in &pairs[..count] {
        let a = origin + edge_crossing(edge_a, &values, level);
        let b = origin + edge_crossing(edge_b, &values, level);
        out.segments.push(Segment::new(a, b));
        out.corner_indices.push(corner_index);
    }
}

const CORNER_OFFSETS: [DVec2; 4] = [
    DVec2::new(0.0, 0.0),
    DVec2::new(1.0, 0.0),
    DVec2::new(1.0, 1.0),
    DVec2::new(0.0, 1.0),
];

fn edge_crossing(edge: usize, values: &[f64; 4], level: f64) -> DVec2 {
    let (ia, ib) = (edge, (edge + 1) % 4);
    let (va, vb) = (values[ia], values[ib]);
    let denom = vb - va;
    let t = if denom.abs() < f64::EPSILON {
        0.5
    } else {
        ((level - va) / denom).clamp(0.0, 1.0)
    };
    CORNER_OFFSETS[ia].lerp(CORNER_OFFSETS[ib], t)
}
