//! Path commands: each one moves the cursor and extends the current path.

use crate::registry::params::ArgValues;
use crate::registry::LineContext;
use crate::util::sign;

use super::require_number;

/// Label drawn at the control point of every arc.
pub const CONTROL_LABEL: &str = ". control";

pub fn horizontal_line(args: &ArgValues, ctx: &mut LineContext<'_>) -> Result<String, String> {
    let x = require_number(args, "x")?;
    ctx.cursor.x += x;
    Ok(line_to_cursor(ctx))
}

pub fn vertical_line(args: &ArgValues, ctx: &mut LineContext<'_>) -> Result<String, String> {
    let y = require_number(args, "y")?;
    ctx.cursor.y += y;
    Ok(line_to_cursor(ctx))
}

pub fn line(args: &ArgValues, ctx: &mut LineContext<'_>) -> Result<String, String> {
    let x = require_number(args, "x")?;
    let y = require_number(args, "y")?;
    ctx.cursor.x += x;
    ctx.cursor.y += y;
    Ok(line_to_cursor(ctx))
}

/// Quadratic stand-in for a circular arc. The control point sits at the chord
/// midpoint, pushed out by `radius` on each axis; `flip` picks the side.
pub fn arc(args: &ArgValues, ctx: &mut LineContext<'_>) -> Result<String, String> {
    let x = require_number(args, "x")?;
    let y = require_number(args, "y")?;
    let radius = require_number(args, "radius")?;
    let direction = if args.bool_or("flip", false) { 1.0 } else { -1.0 };

    let shift_x = radius * sign(x * direction);
    let shift_y = radius * sign(y * direction);
    let (control_x, control_y) = ctx.viewport.to_screen(
        ctx.cursor.x + x / 2.0 + shift_x,
        ctx.cursor.y + y / 2.0 - shift_y,
    );
    ctx.surface.fill_text(CONTROL_LABEL, control_x, control_y);

    ctx.cursor.x += x;
    ctx.cursor.y += y;
    let (end_x, end_y) = ctx.viewport.to_screen(ctx.cursor.x, ctx.cursor.y);
    ctx.surface
        .quadratic_curve_to(control_x, control_y, end_x, end_y);
    Ok(ctx.cursor.hint())
}

fn line_to_cursor(ctx: &mut LineContext<'_>) -> String {
    let (x, y) = ctx.viewport.to_screen(ctx.cursor.x, ctx.cursor.y);
    ctx.surface.line_to(x, y);
    ctx.cursor.hint()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use crate::engine::surface::{DrawOp, Recorder};
    use crate::engine::viewport::Viewport;
    use crate::engine::Cursor;
    use crate::reference::{ArrivalNotifier, ReferenceCache};
    use crate::reference::tests::FakeResolver;
    use crate::registry::params::ArgValue;

    use super::*;

    fn args(pairs: &[(&str, ArgValue)]) -> ArgValues {
        let mut values = ArgValues::new();
        for (name, value) in pairs {
            values.insert(*name, value.clone());
        }
        values
    }

    fn run<F>(handler: F, values: &ArgValues, cursor: &mut Cursor, viewport: Viewport) -> (Result<String, String>, Vec<DrawOp>)
    where
        F: Fn(&ArgValues, &mut LineContext<'_>) -> Result<String, String>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let cache = ReferenceCache::new(std::sync::Arc::new(FakeResolver::default()), runtime.handle().clone());
        let notifier = ArrivalNotifier::detached();
        let mut recorder = Recorder::new();
        let result = {
            let mut ctx = LineContext {
                cursor,
                surface: &mut recorder,
                viewport,
                references: &cache,
                notifier: &notifier,
            };
            handler(values, &mut ctx)
        };
        (result, recorder.take())
    }

    #[test]
    fn horizontal_then_vertical_accumulate() {
        let mut cursor = Cursor::default();
        let (hint, ops) = run(horizontal_line, &args(&[("x", ArgValue::Number(5.0))]), &mut cursor, Viewport::default());
        assert_eq!(hint.unwrap(), "5×0");
        assert_eq!(ops, vec![DrawOp::LineTo { x: 5.0, y: 0.0 }]);

        let (hint, _) = run(vertical_line, &args(&[("y", ArgValue::Number(-2.5))]), &mut cursor, Viewport::default());
        assert_eq!(hint.unwrap(), "5×-2.5");
    }

    #[test]
    fn line_applies_pan_and_zoom() {
        let mut cursor = Cursor::default();
        let viewport = Viewport::new(100.0, 50.0, 2.0);
        let values = args(&[("x", ArgValue::Number(10.0)), ("y", ArgValue::Number(20.0))]);
        let (hint, ops) = run(line, &values, &mut cursor, viewport);
        assert_eq!(hint.unwrap(), "10×20");
        assert_eq!(ops, vec![DrawOp::LineTo { x: 120.0, y: 90.0 }]);
    }

    #[test]
    fn arc_places_control_point_by_flip() {
        let values = args(&[
            ("x", ArgValue::Number(10.0)),
            ("y", ArgValue::Number(10.0)),
            ("radius", ArgValue::Number(4.0)),
            ("flip", ArgValue::Bool(false)),
        ]);
        let mut cursor = Cursor::default();
        let (hint, ops) = run(arc, &values, &mut cursor, Viewport::default());
        assert_eq!(hint.unwrap(), "10×10");
        assert_eq!(
            ops,
            vec![
                DrawOp::FillText { text: CONTROL_LABEL.into(), x: 1.0, y: 9.0 },
                DrawOp::QuadraticCurveTo { cx: 1.0, cy: 9.0, x: 10.0, y: 10.0 },
            ]
        );

        let flipped = args(&[
            ("x", ArgValue::Number(10.0)),
            ("y", ArgValue::Number(10.0)),
            ("radius", ArgValue::Number(4.0)),
            ("flip", ArgValue::Bool(true)),
        ]);
        let mut cursor = Cursor::default();
        let (_, ops) = run(arc, &flipped, &mut cursor, Viewport::default());
        assert_eq!(ops[1], DrawOp::QuadraticCurveTo { cx: 9.0, cy: 1.0, x: 10.0, y: 10.0 });
    }

    #[test]
    fn arc_along_axis_has_no_shift_on_zero_component() {
        let values = args(&[
            ("x", ArgValue::Number(10.0)),
            ("y", ArgValue::Number(0.0)),
            ("radius", ArgValue::Number(3.0)),
        ]);
        let mut cursor = Cursor::default();
        let (_, ops) = run(arc, &values, &mut cursor, Viewport::default());
        assert_eq!(ops[1], DrawOp::QuadraticCurveTo { cx: 2.0, cy: 0.0, x: 10.0, y: 0.0 });
    }

    #[test]
    fn missing_value_is_reported_not_panicked() {
        let mut cursor = Cursor::default();
        let (hint, ops) = run(line, &args(&[("x", ArgValue::Number(1.0))]), &mut cursor, Viewport::default());
        assert_eq!(hint.unwrap_err(), "argument missing: y");
        assert!(ops.is_empty());
    }
}
