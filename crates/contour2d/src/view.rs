//! Draw-time view state: the host's screen rectangle, visible data window and
//! pixel ratio, and the transform that places the unit-box mesh inside them.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Vec2, Vec3};

use crate::bounds::Bounds;

/// Point size used during the ribbon pass; triangle rasterization ignores it.
pub const BODY_POINT_SIZE: f32 = 1000.0;

/// Axis-aligned rectangle `[x_min, y_min, x_max, y_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Rect {
    pub const fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

impl From<[f64; 4]> for Rect {
    fn from(r: [f64; 4]) -> Self {
        Rect::new(r[0], r[1], r[2], r[3])
    }
}

/// What the host plot supplies to every draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotView {
    /// Screen rectangle in device pixels.
    pub view_box: Rect,
    /// Currently visible data window.
    pub data_box: Rect,
    pub pixel_ratio: f64,
}

impl Default for PlotView {
    fn default() -> Self {
        Self {
            view_box: Rect::new(0.0, 0.0, 1.0, 1.0),
            data_box: Rect::new(0.0, 0.0, 1.0, 1.0),
            pixel_ratio: 1.0,
        }
    }
}

impl PlotView {
    pub fn screen_shape(&self) -> Vec2 {
        Vec2::new(self.view_box.width() as f32, self.view_box.height() as f32)
    }
}

/// Affine map from the unit box of `bounds` into clip space for `data_box`.
///
/// Returns `None` when the data window has zero (or non-finite) extent.
pub fn view_transform(bounds: &Bounds, data_box: &Rect) -> Option<Mat3> {
    let data_x = data_box.width();
    let data_y = data_box.height();
    if data_x == 0.0 || data_y == 0.0 || !data_x.is_finite() || !data_y.is_finite() {
        return None;
    }
    let extent = bounds.extent();
    let sx = 2.0 * extent.x / data_x;
    let sy = 2.0 * extent.y / data_y;
    let tx = 2.0 * (bounds.lo.x - data_box.x_min) / data_x - 1.0;
    let ty = 2.0 * (bounds.lo.y - data_box.y_min) / data_y - 1.0;
    let m = Mat3::from_cols_array(&[
        sx as f32, 0.0, 0.0, //
        0.0, sy as f32, 0.0, //
        tx as f32, ty as f32, 1.0,
    ]);
    m.is_finite().then_some(m)
}

/// Uniform block shared by the ribbon and cap passes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ContourUniforms {
    /// Columns of the 3x3 view transform, padded to 16 bytes each.
    pub view_transform: [[f32; 4]; 3],
    pub screen_shape: [f32; 2],
    pub line_width: f32,
    pub point_size: f32,
}

impl ContourUniforms {
    pub fn new(transform: Mat3, screen_shape: Vec2, line_width: f32, point_size: f32) -> Self {
        let col = |v: Vec3| [v.x, v.y, v.z, 0.0];
        Self {
            view_transform: [
                col(transform.x_axis),
                col(transform.y_axis),
                col(transform.z_axis),
            ],
            screen_shape: screen_shape.to_array(),
            line_width,
            point_size,
        }
    }

    pub fn transform(&self) -> Mat3 {
        let c = |i: usize| {
            Vec3::new(
                self.view_transform[i][0],
                self.view_transform[i][1],
                self.view_transform[i][2],
            )
        };
        Mat3::from_cols(c(0), c(1), c(2))
    }
}

/// Per-draw scratch state, rebuilt on every call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DrawScratch {
    pub transform: Mat3,
    pub screen_shape: Vec2,
    pub line_width_px: f32,
}

impl DrawScratch {
    pub fn new(bounds: &Bounds, view: &PlotView, line_width: f32) -> Option<Self> {
        let transform = view_transform(bounds, &view.data_box)?;
        Some(Self {
            transform,
            screen_shape: view.screen_shape(),
            line_width_px: line_width * view.pixel_ratio as f32,
        })
    }

    pub fn body_uniforms(&self) -> ContourUniforms {
        ContourUniforms::new(
            self.transform,
            self.screen_shape,
            self.line_width_px,
            BODY_POINT_SIZE,
        )
    }

    pub fn cap_uniforms(&self) -> ContourUniforms {
        ContourUniforms::new(self.transform, self.screen_shape, 0.0, self.line_width_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_bounds(lo: [f64; 2], hi: [f64; 2]) -> Bounds {
        Bounds::from_axes(&[lo[0], hi[0]], &[lo[1], hi[1]]).unwrap()
    }

    #[test]
    fn matching_windows_map_to_full_clip_space() {
        let bounds = unit_bounds([0.0, 0.0], [4.0, 2.0]);
        let m = view_transform(&bounds, &Rect::new(0.0, 0.0, 4.0, 2.0)).unwrap();
        let lo = m * Vec3::new(0.0, 0.0, 1.0);
        let hi = m * Vec3::new(1.0, 1.0, 1.0);
        assert!((lo - Vec3::new(-1.0, -1.0, 1.0)).length() < 1e-6);
        assert!((hi - Vec3::new(1.0, 1.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn zooming_in_scales_the_unit_box() {
        let bounds = unit_bounds([0.0, 0.0], [4.0, 4.0]);
        // show only the upper-right quarter
        let m = view_transform(&bounds, &Rect::new(2.0, 2.0, 4.0, 4.0)).unwrap();
        let center = m * Vec3::new(0.5, 0.5, 1.0);
        let corner = m * Vec3::new(1.0, 1.0, 1.0);
        assert!((center.x + 1.0).abs() < 1e-6 && (center.y + 1.0).abs() < 1e-6);
        assert!((corner.x - 1.0).abs() < 1e-6 && (corner.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_data_box_has_no_transform() {
        let bounds = unit_bounds([0.0, 0.0], [1.0, 1.0]);
        assert!(view_transform(&bounds, &Rect::new(0.0, 0.0, 0.0, 1.0)).is_none());
        assert!(view_transform(&bounds, &Rect::new(0.0, 3.0, 1.0, 3.0)).is_none());
    }

    #[test]
    fn uniforms_are_sixty_four_bytes_and_round_trip() {
        assert_eq!(std::mem::size_of::<ContourUniforms>(), 64);
        let m = Mat3::from_cols_array(&[2.0, 0.0, 0.0, 0.0, 3.0, 0.0, -1.0, 0.5, 1.0]);
        let u = ContourUniforms::new(m, Vec2::new(800.0, 600.0), 2.0, 1000.0);
        assert_eq!(u.transform(), m);
        assert_eq!(u.view_transform[2], [-1.0, 0.5, 1.0, 0.0]);
    }

    #[test]
    fn scratch_scales_line_width_by_pixel_ratio() {
        let bounds = unit_bounds([0.0, 0.0], [1.0, 1.0]);
        let view = PlotView {
            view_box: Rect::new(0.0, 0.0, 640.0, 480.0),
            data_box: Rect::new(0.0, 0.0, 1.0, 1.0),
            pixel_ratio: 2.0,
        };
        let scratch = DrawScratch::new(&bounds, &view, 1.5).unwrap();
        let body = scratch.body_uniforms();
        let caps = scratch.cap_uniforms();
        assert_eq!(body.line_width, 3.0);
        assert_eq!(body.point_size, BODY_POINT_SIZE);
        assert_eq!(caps.line_width, 0.0);
        assert_eq!(caps.point_size, 3.0);
        assert_eq!(body.screen_shape, [640.0, 480.0]);
    }
}
