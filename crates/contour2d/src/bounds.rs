//! Real-coordinate bounds of a field and the unit-box normalization applied
//! to every mesh vertex.

use glam::DVec2;

use crate::error::{invalid_argument, Result};

/// Axis-aligned box `(lo, hi)` in real coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lo: DVec2,
    pub hi: DVec2,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds {
    /// Bounds before any field has been seen.
    pub const EMPTY: Bounds = Bounds {
        lo: DVec2::new(f64::INFINITY, f64::INFINITY),
        hi: DVec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
    };

    /// Bounds spanned by the first and last entries of each axis.
    ///
    /// A zero-width axis is inflated to `[lo, lo + 1]` so the normalization
    /// denominator is never zero. An empty axis behaves like `[0]`.
    pub fn from_axes(x: &[f64], y: &[f64]) -> Result<Self> {
        let (lo_x, hi_x) = axis_span("x", x)?;
        let (lo_y, hi_y) = axis_span("y", y)?;
        Ok(Self {
            lo: DVec2::new(lo_x, lo_y),
            hi: DVec2::new(hi_x, hi_y),
        })
    }

    pub fn is_empty(&self) -> bool {
        !(self.lo.x < self.hi.x && self.lo.y < self.hi.y)
    }

    /// `hi - lo` per axis.
    pub fn extent(&self) -> DVec2 {
        self.hi - self.lo
    }

    /// Map a real-coordinate point into the unit box.
    pub fn normalize(&self, point: DVec2) -> DVec2 {
        (point - self.lo) / self.extent()
    }

    /// Inverse of [`Bounds::normalize`].
    pub fn denormalize(&self, unit: DVec2) -> DVec2 {
        self.lo + self.extent() * unit
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.lo.x, self.lo.y, self.hi.x, self.hi.y]
    }
}

fn axis_span(name: &str, axis: &[f64]) -> Result<(f64, f64)> {
    let lo = axis.first().copied().unwrap_or(0.0);
    let hi = axis.last().copied().unwrap_or(lo);
    if !lo.is_finite() || !hi.is_finite() {
        return Err(invalid_argument(format!(
            "{name} axis endpoints must be finite, got [{lo}, {hi}]"
        )));
    }
    if lo == hi {
        Ok((lo, lo + 1.0))
    } else {
        Ok((lo, hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_axis_is_inflated() {
        let bounds = Bounds::from_axes(&[3.0, 3.0, 3.0], &[-1.0, 2.0]).unwrap();
        assert_eq!(bounds.lo.x, 3.0);
        assert_eq!(bounds.hi.x, 4.0);
        assert_eq!(bounds.to_array(), [3.0, -1.0, 4.0, 2.0]);
    }

    #[test]
    fn single_sample_axis_is_inflated() {
        let bounds = Bounds::from_axes(&[5.0], &[7.0]).unwrap();
        assert_eq!(bounds.extent(), DVec2::ONE);
    }

    #[test]
    fn normalize_round_trips() {
        let bounds = Bounds::from_axes(&[-2.0, 0.0, 6.0], &[10.0, 12.5]).unwrap();
        for &(vx, vy) in &[(-2.0, 10.0), (0.3, 11.1), (6.0, 12.5), (1.75, 12.0)] {
            let p = DVec2::new(vx, vy);
            let unit = bounds.normalize(p);
            assert!((0.0..=1.0).contains(&unit.x));
            assert!((0.0..=1.0).contains(&unit.y));
            let back = bounds.denormalize(unit);
            assert!((back - p).length() < 1e-12);
        }
    }

    #[test]
    fn non_finite_axis_is_rejected() {
        assert!(Bounds::from_axes(&[0.0, f64::NAN], &[0.0, 1.0]).is_err());
    }

    #[test]
    fn empty_bounds_report_empty() {
        assert!(Bounds::default().is_empty());
        assert!(!Bounds::from_axes(&[0.0, 1.0], &[0.0, 1.0]).unwrap().is_empty());
    }
}
