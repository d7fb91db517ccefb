use serde::{Deserialize, Serialize};

use crate::util::format_number;

/// Pan and zoom applied to every logical coordinate: `screen = pan + logical * zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-export", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts-export", ts(export))]
pub struct Viewport {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(pan_x: f64, pan_y: f64, zoom: f64) -> Self {
        Self { pan_x, pan_y, zoom }
    }

    /// Origin at the centre of a canvas of the given size, truncated to whole pixels.
    pub fn centered(width: u32, height: u32) -> Self {
        Self {
            pan_x: f64::from(width / 2),
            pan_y: f64::from(height / 2),
            zoom: 1.0,
        }
    }

    pub fn to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        (self.pan_x + x * self.zoom, self.pan_y + y * self.zoom)
    }

    pub fn scale(&self, length: f64) -> f64 {
        length * self.zoom
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Apply a wheel delta. Pinch gestures arrive with the opposite sign.
    /// Zoom never goes negative, which would mirror the sketch.
    pub fn zoom_by(&mut self, delta_y: f64, pinch: bool) {
        let step = delta_y / 100.0;
        self.zoom += if pinch { -step } else { step };
        if self.zoom < 0.0 {
            self.zoom = 0.0;
        }
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = 1.0;
    }

    /// Status-bar zoom text, e.g. `"150 %"`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn zoom_label(&self) -> String {
        format!("{} %", (self.zoom * 100.0).trunc() as i64)
    }

    /// Logical coordinates under a pointer at canvas offset `(x, y)`.
    pub fn pointer_label(&self, offset_x: f64, offset_y: f64) -> String {
        format!(
            "{}×{}",
            format_number(offset_x - self.pan_x),
            format_number(offset_y - self.pan_y)
        )
    }
}
