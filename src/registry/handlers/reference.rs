use crate::reference::DOWNLOADING_HINT;
use crate::registry::params::ArgValues;
use crate::registry::LineContext;

/// Draw a reference image at `(x, y)` in logical units, scaled with the zoom.
///
/// A cache miss starts the download and reports it without halting; the image
/// appears on the re-run that follows its arrival.
pub fn reference(args: &ArgValues, ctx: &mut LineContext<'_>) -> Result<String, String> {
    let url = args
        .text("url")
        .ok_or_else(|| "argument missing: url".to_string())?;

    let Some(entry) = ctx.references.get(url) else {
        ctx.references.request(url, url, ctx.notifier);
        return Ok(DOWNLOADING_HINT.to_string());
    };

    if let Some(image) = entry.image() {
        let (x, y) = ctx
            .viewport
            .to_screen(args.number_or("x", 0.0), args.number_or("y", 0.0));
        ctx.surface.draw_image(
            image,
            x,
            y,
            ctx.viewport.scale(f64::from(image.width)),
            ctx.viewport.scale(f64::from(image.height)),
        );
    }

    Ok(entry.status())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use crate::engine::surface::{DrawOp, Recorder};
    use crate::engine::viewport::Viewport;
    use crate::engine::Cursor;
    use crate::reference::tests::FakeResolver;
    use crate::reference::{ArrivalNotifier, ReferenceCache, FAILED_HINT};
    use crate::registry::params::ArgValue;

    use super::*;

    fn ref_args(url: &str, x: f64, y: f64) -> ArgValues {
        let mut values = ArgValues::new();
        values.insert("url", ArgValue::Text(url.to_string()));
        values.insert("x", ArgValue::Number(x));
        values.insert("y", ArgValue::Number(y));
        values
    }

    fn draw(cache: &ReferenceCache, notifier: &ArrivalNotifier, args: &ArgValues, viewport: Viewport) -> (String, Vec<DrawOp>) {
        let mut cursor = Cursor::default();
        let mut recorder = Recorder::new();
        let hint = {
            let mut ctx = LineContext {
                cursor: &mut cursor,
                surface: &mut recorder,
                viewport,
                references: cache,
                notifier,
            };
            reference(args, &mut ctx).unwrap()
        };
        (hint, recorder.take())
    }

    #[tokio::test]
    async fn miss_requests_then_hit_draws_scaled() {
        let cache = ReferenceCache::on_current_runtime(Arc::new(FakeResolver::default())).unwrap();
        let (notifier, mut arrivals) = ArrivalNotifier::channel();
        let args = ref_args("pic.png", 5.0, 10.0);

        let (hint, ops) = draw(&cache, &notifier, &args, Viewport::default());
        assert_eq!(hint, DOWNLOADING_HINT);
        assert!(ops.is_empty());
        assert!(cache.is_pending("pic.png"));

        let arrival = arrivals.recv().await.expect("arrival");
        let viewport = Viewport::new(100.0, 0.0, 2.0);
        let (hint, ops) = draw(&cache, &notifier, &args, viewport);
        assert_eq!(hint, "downloaded, 40×30");
        assert_eq!(
            ops,
            vec![DrawOp::DrawImage {
                source: "pic.png".into(),
                x: 110.0,
                y: 20.0,
                width: 80.0,
                height: 60.0,
            }]
        );
        arrival.acknowledge();
    }

    #[tokio::test]
    async fn failed_entry_reports_without_drawing() {
        let cache = ReferenceCache::on_current_runtime(Arc::new(FakeResolver::default())).unwrap();
        let (notifier, mut arrivals) = ArrivalNotifier::channel();
        let args = ref_args("missing.png", 0.0, 0.0);

        draw(&cache, &notifier, &args, Viewport::default());
        arrivals.recv().await.expect("arrival").acknowledge();

        let (hint, ops) = draw(&cache, &notifier, &args, Viewport::default());
        assert_eq!(hint, FAILED_HINT);
        assert!(ops.is_empty());
    }
}
