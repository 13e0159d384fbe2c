//! Element geometry

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in screen points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle with no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Overlap test. Empty rectangles never intersect anything.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.max_x()
            && other.x < self.max_x()
            && self.y < other.max_y()
            && other.y < self.max_y()
    }

    /// Smallest integral rectangle containing `self`.
    pub fn integral(&self) -> Rect {
        let x = self.x.floor();
        let y = self.y.floor();
        Rect {
            x,
            y,
            width: self.max_x().ceil() - x,
            height: self.max_y().ceil() - y,
        }
    }

    /// Size of `self` anchored at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Frame string in the `{{x, y}, {w, h}}` form used by page sources.
    pub fn frame_string(&self) -> String {
        format!(
            "{{{{{}, {}}}, {{{}, {}}}}}",
            format_scalar(self.x),
            format_scalar(self.y),
            format_scalar(self.width),
            format_scalar(self.height)
        )
    }
}

/// Integers print without a fractional part.
pub(crate) fn format_scalar(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection_rules() {
        let screen = Rect::new(0.0, 0.0, 375.0, 812.0);
        assert!(Rect::new(10.0, 10.0, 20.0, 20.0).intersects(&screen));
        assert!(!Rect::new(400.0, 10.0, 20.0, 20.0).intersects(&screen));
        assert!(!Rect::new(10.0, 10.0, 0.0, 20.0).intersects(&screen));
        // edges touching only
        assert!(!Rect::new(375.0, 0.0, 10.0, 10.0).intersects(&screen));
    }

    #[test]
    fn test_frame_string() {
        assert_eq!(
            Rect::new(0.0, 20.5, 375.0, 44.0).frame_string(),
            "{{0, 20.5}, {375, 44}}"
        );
    }

    #[test]
    fn test_integral_expands_outward() {
        let rect = Rect::new(0.5, 1.2, 10.0, 10.0).integral();
        assert_eq!(rect, Rect::new(0.0, 1.0, 11.0, 11.0));
    }
}
