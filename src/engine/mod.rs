//! Script interpreter: one pass turns script text into surface calls and hints.

pub mod surface;
pub mod viewport;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::Diagnostic;
use crate::reference::{ArrivalNotifier, ReferenceCache};
use crate::registry::{LineContext, Registry};
use crate::util::format_number;

use surface::DrawingSurface;
use viewport::Viewport;

/// Prefix of a comment line.
pub const COMMENT_PREFIX: &str = "//";

/// Separator between a command and its arguments.
pub const TOKEN_SEPARATOR: char = ' ';

/// Running logical position within a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "ts-export", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts-export", ts(export))]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
}

impl Cursor {
    /// Coordinate echo used as the success hint, e.g. `"10×20"`.
    pub fn hint(&self) -> String {
        format!("{}×{}", format_number(self.x), format_number(self.y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts-export", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts-export", ts(export))]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PassState {
    /// No pass has run yet.
    Idle,
    Running,
    /// Stopped at `line` (1-based); no hints follow it.
    Halted { line: usize },
    Completed,
}

/// Result of one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts-export", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts-export", ts(export))]
pub struct PassReport {
    /// One entry per processed line; shorter than `lines` after a halt.
    pub hints: Vec<String>,
    pub state: PassState,
    pub cursor: Cursor,
    /// Number of source lines.
    pub lines: usize,
    pub generation: u64,
}

impl PassReport {
    pub fn halted(&self) -> bool {
        matches!(self.state, PassState::Halted { .. })
    }
}

pub struct Interpreter {
    registry: Arc<Registry>,
    references: ReferenceCache,
    generation: AtomicU64,
}

impl Interpreter {
    pub fn new(registry: Arc<Registry>, references: ReferenceCache) -> Self {
        Self {
            registry,
            references,
            generation: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn references(&self) -> &ReferenceCache {
        &self.references
    }

    /// Number of passes run so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Run one full pass. The surface is cleared first and stroked last, also when
    /// the pass halts, so the path up to the failing line stays visible.
    pub fn run(
        &self,
        script: &str,
        viewport: Viewport,
        surface: &mut dyn DrawingSurface,
        notifier: &ArrivalNotifier,
    ) -> PassReport {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut cursor = Cursor::default();
        let mut hints = Vec::new();
        let mut state = PassState::Running;

        surface.clear();
        surface.move_to(viewport.pan_x, viewport.pan_y);

        let lines: Vec<&str> = script.split('\n').map(str::trim).collect();
        for (index, line) in lines.iter().enumerate() {
            if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
                hints.push(String::new());
                continue;
            }

            // Tokens are separated by single spaces; a doubled space yields an empty token.
            let mut tokens = line.split(TOKEN_SEPARATOR).map(str::trim);
            let name = tokens.next().unwrap_or_default();
            let args: Vec<&str> = tokens.collect();

            let outcome = match self.registry.lookup(name) {
                Some(command) => {
                    let mut ctx = LineContext {
                        cursor: &mut cursor,
                        surface: &mut *surface,
                        viewport,
                        references: &self.references,
                        notifier,
                    };
                    command.invoke(&args, &mut ctx)
                }
                None => Err(Diagnostic::UnknownCommand {
                    name: name.to_string(),
                }
                .to_string()),
            };

            match outcome {
                Ok(hint) => hints.push(hint),
                Err(hint) => {
                    hints.push(hint);
                    state = PassState::Halted { line: index + 1 };
                    break;
                }
            }
        }

        surface.stroke();
        if state == PassState::Running {
            state = PassState::Completed;
        }
        debug!(generation, lines = lines.len(), ?state, "pass finished");

        PassReport {
            hints,
            state,
            cursor,
            lines: lines.len(),
            generation,
        }
    }
}
