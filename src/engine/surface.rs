use serde::Serialize;

use crate::reference::ReferenceImage;

/// The 2D vector canvas a pass draws on. Coordinates are screen coordinates:
/// the interpreter has already applied pan and zoom.
pub trait DrawingSurface {
    fn clear(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn quadratic_curve_to(&mut self, cx: f64, cy: f64, x: f64, y: f64);
    fn draw_image(&mut self, image: &ReferenceImage, x: f64, y: f64, width: f64, height: f64);
    fn stroke(&mut self);

    /// Label a point on the canvas. Surfaces without text support ignore it.
    fn fill_text(&mut self, _text: &str, _x: f64, _y: f64) {}
}

/// One recorded surface call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts-export", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts-export", ts(export))]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Clear,
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    QuadraticCurveTo { cx: f64, cy: f64, x: f64, y: f64 },
    DrawImage {
        source: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    FillText { text: String, x: f64, y: f64 },
    Stroke,
}

/// A surface that records every call. Used by the CLI for JSON output and by tests.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    ops: Vec<DrawOp>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Ops since the most recent `clear`, i.e. what is currently on the canvas.
    pub fn current_frame(&self) -> &[DrawOp] {
        let start = self
            .ops
            .iter()
            .rposition(|op| matches!(op, DrawOp::Clear))
            .unwrap_or(0);
        self.ops.get(start..).unwrap_or_default()
    }

    pub fn take(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }
}

impl DrawingSurface for Recorder {
    fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.ops.push(DrawOp::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ops.push(DrawOp::LineTo { x, y });
    }

    fn quadratic_curve_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        self.ops.push(DrawOp::QuadraticCurveTo { cx, cy, x, y });
    }

    fn draw_image(&mut self, image: &ReferenceImage, x: f64, y: f64, width: f64, height: f64) {
        self.ops.push(DrawOp::DrawImage {
            source: image.source.clone(),
            x,
            y,
            width,
            height,
        });
    }

    fn stroke(&mut self) {
        self.ops.push(DrawOp::Stroke);
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.ops.push(DrawOp::FillText {
            text: text.to_string(),
            x,
            y,
        });
    }
}
