use serde::Deserialize;

/// Options accepted by [`crate::Contour2d::update`].
///
/// Every field is optional; missing axes default to `0..n`, missing samples
/// to zeros, and a missing or non-positive line width to one logical pixel.
/// Keys deserialize in camelCase (`levelColors`, `lineWidth`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContourOptions {
    pub shape: [usize; 2],
    pub x: Option<Vec<f64>>,
    pub y: Option<Vec<f64>>,
    pub z: Option<Vec<f64>>,
    pub levels: Vec<f64>,
    /// Flat RGBA, four unit-interval channels per level.
    pub level_colors: Vec<f64>,
    pub line_width: Option<f64>,
}

impl ContourOptions {
    pub fn new(shape: [usize; 2]) -> Self {
        Self {
            shape,
            ..Default::default()
        }
    }

    pub fn with_axes(mut self, x: Vec<f64>, y: Vec<f64>) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_values(mut self, z: Vec<f64>) -> Self {
        self.z = Some(z);
        self
    }

    pub fn with_level(mut self, value: f64, rgba: [f64; 4]) -> Self {
        self.levels.push(value);
        self.level_colors.extend_from_slice(&rgba);
        self
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = Some(width);
        self
    }

    /// Line width in logical pixels after applying the fallback.
    pub fn effective_line_width(&self) -> f32 {
        line_width_or_default(self.line_width)
    }
}

pub(crate) fn line_width_or_default(width: Option<f64>) -> f32 {
    match width {
        Some(width) if width.is_finite() && width > 0.0 => width as f32,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_levels_and_colors() {
        let options = ContourOptions::new([2, 2])
            .with_level(0.25, [1.0, 0.0, 0.0, 1.0])
            .with_level(0.75, [0.0, 0.0, 1.0, 0.5]);
        assert_eq!(options.levels, vec![0.25, 0.75]);
        assert_eq!(options.level_colors.len(), 8);
    }

    #[test]
    fn line_width_falls_back_to_one() {
        assert_eq!(ContourOptions::default().effective_line_width(), 1.0);
        assert_eq!(
            ContourOptions::default()
                .with_line_width(0.0)
                .effective_line_width(),
            1.0
        );
        assert_eq!(
            ContourOptions::default()
                .with_line_width(f64::NAN)
                .effective_line_width(),
            1.0
        );
        assert_eq!(
            ContourOptions::default()
                .with_line_width(2.5)
                .effective_line_width(),
            2.5
        );
    }
}
