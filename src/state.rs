//! Session state: the script being edited, the viewport, and the arrival channel
//! that turns finished downloads into re-runs.

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::document::{prepend_reference, ScriptStore};
use crate::engine::surface::DrawingSurface;
use crate::engine::viewport::Viewport;
use crate::engine::{Interpreter, PassReport, PassState};
use crate::error::SketchError;
use crate::overlay::HintSink;
use crate::reference::{ArrivalNotifier, ReferenceArrival};

pub struct SketchSession<S: DrawingSurface> {
    interpreter: Interpreter,
    script: String,
    viewport: Viewport,
    canvas: (u32, u32),
    surface: S,
    sink: Box<dyn HintSink>,
    store: Option<ScriptStore>,
    notifier: ArrivalNotifier,
    arrivals: mpsc::UnboundedReceiver<ReferenceArrival>,
    last_report: Option<PassReport>,
}

impl<S: DrawingSurface> SketchSession<S> {
    pub fn new(interpreter: Interpreter, surface: S, sink: impl HintSink + 'static) -> Self {
        let (notifier, arrivals) = ArrivalNotifier::channel();
        Self {
            interpreter,
            script: String::new(),
            viewport: Viewport::default(),
            canvas: (0, 0),
            surface,
            sink: Box::new(sink),
            store: None,
            notifier,
            arrivals,
            last_report: None,
        }
    }

    /// Persist every script edit to `store`.
    pub fn with_store(mut self, store: ScriptStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the canvas size and put the origin at its centre.
    pub fn with_canvas(mut self, width: u32, height: u32) -> Self {
        self.canvas = (width, height);
        self.viewport = Viewport::centered(width, height);
        self
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn last_report(&self) -> Option<&PassReport> {
        self.last_report.as_ref()
    }

    /// State of the latest pass, `Idle` until the first one runs.
    pub fn pass_state(&self) -> PassState {
        self.last_report
            .as_ref()
            .map_or(PassState::Idle, |report| report.state)
    }

    // ── Script edits ────────────────────────────────────────────

    /// Replace the script, persist it, re-run and show the new hints.
    pub fn set_script(&mut self, text: impl Into<String>) -> PassReport {
        self.script = text.into();
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.script) {
                tracing::warn!(path = %store.path().display(), error = %e, "failed to persist script");
            }
        }
        self.rerun(true)
    }

    /// Load the persisted script, if any, and run it as an edit.
    pub fn restore(&mut self) -> Result<Option<PassReport>, SketchError> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        match store.load()? {
            Some(text) => Ok(Some(self.set_script(text))),
            None => Ok(None),
        }
    }

    /// Start loading a local image under `name` without touching the script.
    pub fn load_reference(&self, name: &str, path: &Path) -> bool {
        self.interpreter
            .references()
            .import(name, path, &self.notifier)
    }

    /// Load a local image under `name` and put a `reference` line for it on top.
    pub fn import_reference(&mut self, name: &str, path: &Path) -> PassReport {
        self.load_reference(name, path);
        let script = prepend_reference(&self.script, name);
        self.set_script(script)
    }

    // ── Viewport changes (source unchanged, hints not re-shown) ─

    pub fn pan_by(&mut self, dx: f64, dy: f64) -> PassReport {
        self.viewport.pan_by(dx, dy);
        self.rerun(false)
    }

    pub fn zoom_by(&mut self, delta_y: f64, pinch: bool) -> PassReport {
        self.viewport.zoom_by(delta_y, pinch);
        self.rerun(false)
    }

    pub fn reset_zoom(&mut self) -> PassReport {
        self.viewport.reset_zoom();
        self.rerun(false)
    }

    /// Move the origin back to the canvas centre, keeping the zoom.
    pub fn recenter(&mut self) -> PassReport {
        let centered = Viewport::centered(self.canvas.0, self.canvas.1);
        self.viewport.pan_x = centered.pan_x;
        self.viewport.pan_y = centered.pan_y;
        self.rerun(false)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> PassReport {
        self.viewport = viewport;
        self.rerun(false)
    }

    // ── Reference arrivals ──────────────────────────────────────

    /// Re-run the current script for a finished download, then release the fetch
    /// task so it can mark the image as cached.
    pub fn handle_arrival(&mut self, arrival: ReferenceArrival) -> PassReport {
        tracing::debug!(key = %arrival.key, "re-running for reference arrival");
        let report = self.rerun(true);
        arrival.acknowledge();
        report
    }

    /// Handle every arrival already queued. Returns how many were handled.
    pub fn process_arrivals(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(arrival) = self.arrivals.try_recv() {
            self.handle_arrival(arrival);
            handled += 1;
        }
        handled
    }

    /// Handle arrivals until no download is in flight or `timeout` passes.
    pub async fn settle(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut handled = 0;
        loop {
            // Arrivals are queued before their key leaves the in-flight set, so an
            // idle cache seen here means the drain below catches every arrival.
            let idle = self.interpreter.references().pending_count() == 0;
            handled += self.process_arrivals();
            if idle {
                break;
            }
            match tokio::time::timeout_at(deadline, self.arrivals.recv()).await {
                Ok(Some(arrival)) => {
                    self.handle_arrival(arrival);
                    handled += 1;
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        pending = self.interpreter.references().pending_count(),
                        "gave up waiting for references"
                    );
                    break;
                }
            }
        }
        handled
    }

    fn rerun(&mut self, show_hints: bool) -> PassReport {
        let report = self
            .interpreter
            .run(&self.script, self.viewport, &mut self.surface, &self.notifier);
        if show_hints {
            self.sink.show(&report.hints);
        }
        self.last_report = Some(report.clone());
        report
    }
}
