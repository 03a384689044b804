//! Scalar field sampled on a rectangular grid, plus the axis interpolation
//! used to turn fractional grid indices into real coordinates.

use crate::error::{invalid_argument, Result};
use crate::options::ContourOptions;

/// Immutable grid samples for one update.
///
/// `z` is stored row-major with index `col + width * row`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Field {
    width: usize,
    height: usize,
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl Field {
    /// Build a field, checking that every array matches `shape`.
    pub fn new(shape: [usize; 2], x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Result<Self> {
        let [width, height] = shape;
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| invalid_argument(format!("grid shape {width}x{height} overflows")))?;
        if z.len() != expected {
            return Err(invalid_argument(format!(
                "z must contain {expected} samples for a {width}x{height} grid, got {}",
                z.len()
            )));
        }
        if x.len() != width {
            return Err(invalid_argument(format!(
                "x axis must contain {width} values, got {}",
                x.len()
            )));
        }
        if y.len() != height {
            return Err(invalid_argument(format!(
                "y axis must contain {height} values, got {}",
                y.len()
            )));
        }
        Ok(Self {
            width,
            height,
            x,
            y,
            z,
        })
    }

    /// Build a field from update options, filling in the default axes
    /// (`0..width`, `0..height`) and an all-zero sample array.
    pub fn from_options(options: &ContourOptions) -> Result<Self> {
        let [width, height] = options.shape;
        let count = width
            .checked_mul(height)
            .ok_or_else(|| invalid_argument(format!("grid shape {width}x{height} overflows")))?;
        if options.z.as_ref().is_some_and(|z| z.len() != count) {
            return Err(invalid_argument(format!(
                "z must contain {count} samples for a {width}x{height} grid, got {}",
                options.z.as_ref().map_or(0, Vec::len)
            )));
        }
        let x = options.x.clone().unwrap_or_else(|| implicit_axis(width));
        let y = options.y.clone().unwrap_or_else(|| implicit_axis(height));
        let z = options.z.clone().unwrap_or_else(|| vec![0.0; count]);
        Self::new(options.shape, x, y, z)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.width, self.height]
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn values(&self) -> &[f64] {
        &self.z
    }

    /// Sample at integer grid position `(col, row)`.
    pub fn value(&self, col: usize, row: usize) -> f64 {
        self.z[col + self.width * row]
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    /// Map a fractional `(col, row)` grid position to real axis coordinates.
    pub fn to_real(&self, col: f64, row: f64) -> (f64, f64) {
        (interpolate(&self.x, col), interpolate(&self.y, row))
    }
}

/// Linear interpolation into an axis array at a fractional index.
///
/// Indices below zero clamp to the first entry and indices at or past the
/// last entry clamp to the last one. Integer indices return the stored value
/// exactly.
pub fn interpolate(axis: &[f64], index: f64) -> f64 {
    let Some(last) = axis.last().copied() else {
        return 0.0;
    };
    let floor = index.floor();
    if floor < 0.0 {
        return axis[0];
    }
    if floor >= (axis.len() - 1) as f64 {
        return last;
    }
    let idx = floor as usize;
    let t = index - floor;
    if t == 0.0 {
        return axis[idx];
    }
    (1.0 - t) * axis[idx] + t * axis[idx + 1]
}

fn implicit_axis(len: usize) -> Vec<f64> {
    (0..len).map(|idx| idx as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolate_is_exact_at_integer_indices() {
        let axis = [0.1, 0.7, 3.3, 10.0];
        for (k, expected) in axis.iter().enumerate() {
            assert_eq!(interpolate(&axis, k as f64), *expected);
        }
    }

    #[test]
    fn interpolate_clamps_both_ends() {
        let axis = [2.0, 4.0, 8.0];
        assert_eq!(interpolate(&axis, -5.0), 2.0);
        assert_eq!(interpolate(&axis, -0.25), 2.0);
        assert_eq!(interpolate(&axis, 3.0 + 5.0), 8.0);
        assert_eq!(interpolate(&axis, 2.5), 8.0);
    }

    #[test]
    fn interpolate_blends_between_neighbours() {
        let axis = [0.0, 10.0, 30.0];
        assert!((interpolate(&axis, 0.5) - 5.0).abs() < 1e-12);
        assert!((interpolate(&axis, 1.25) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn interpolate_on_empty_axis_is_zero() {
        assert_eq!(interpolate(&[], 1.5), 0.0);
    }

    #[test]
    fn mismatched_sample_count_is_rejected() {
        let err = Field::new([2, 2], vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0; 3]).unwrap_err();
        assert!(err.to_string().contains("4 samples"));
    }

    #[test]
    fn default_axes_follow_the_shape() {
        let options = ContourOptions {
            shape: [3, 2],
            ..Default::default()
        };
        let field = Field::from_options(&options).unwrap();
        assert_eq!(field.x(), &[0.0, 1.0, 2.0]);
        assert_eq!(field.y(), &[0.0, 1.0]);
        assert_eq!(field.values(), &[0.0; 6]);
    }

    #[test]
    fn shape_only_json_builds_a_zero_field() {
        let options: ContourOptions = serde_json::from_str(r#"{ "shape": [3, 2] }"#).unwrap();
        let field = Field::from_options(&options).unwrap();
        assert_eq!(field.x(), &[0.0, 1.0, 2.0]);
        assert_eq!(field.y(), &[0.0, 1.0]);
        assert!(field.values().iter().all(|&v| v == 0.0));
    }
}
