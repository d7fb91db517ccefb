// CLI binary: exiting on unrecoverable errors is standard for CLI tools.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sketchline::document::{atomic_write, document_name, save_file_name, ScriptStore};
use sketchline::engine::surface::Recorder;
use sketchline::engine::viewport::Viewport;
use sketchline::engine::{Interpreter, PassReport};
use sketchline::overlay::annotate;
use sketchline::paths::{self, DOCUMENT_EXTENSION};
use sketchline::reference::{DefaultResolver, ReferenceCache};
use sketchline::registry::{self, catalog};
use sketchline::settings::{self, SketchSettings};
use sketchline::state::SketchSession;

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "sketchline", about = "Headless sketch script interpreter", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config directory override
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(clap::Args)]
struct ViewArgs {
    /// Horizontal pan in pixels (default: canvas centre)
    #[arg(long, allow_hyphen_values = true)]
    pan_x: Option<f64>,
    /// Vertical pan in pixels (default: canvas centre)
    #[arg(long, allow_hyphen_values = true)]
    pan_y: Option<f64>,
    /// Zoom factor
    #[arg(long)]
    zoom: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script, wait for its references, and print the hints
    Run {
        /// Script file, `-` for stdin (default: the stored script)
        file: Option<PathBuf>,
        #[command(flatten)]
        view: ViewArgs,
        /// Preload a local image as NAME=PATH (repeatable)
        #[arg(long = "reference", value_name = "NAME=PATH")]
        references: Vec<String>,
        /// Also print the recorded drawing operations
        #[arg(long)]
        ops: bool,
        /// Seconds to wait for references (default from settings)
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Run a script once without waiting for references; exits 1 if it halts
    Check {
        /// Script file, `-` for stdin (default: the stored script)
        file: Option<PathBuf>,
    },
    /// List drawing commands, or describe one
    Commands { topic: Option<String> },
    /// Open a document as the stored script
    Open { file: PathBuf },
    /// Save the stored script as a document
    Save {
        /// Document name (default: a timestamp)
        #[arg(long, default_value = "")]
        name: String,
        /// Target directory (default: current directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print the current settings
    Settings {
        /// Print the JSON Schema of the settings file instead
        #[arg(long)]
        schema: bool,
    },
}

// ── Helpers ──────────────────────────────────────────────────────

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {message}");
    process::exit(1);
}

/// Script text plus the directory relative references resolve against.
fn read_script(file: Option<&Path>, store: &ScriptStore) -> (String, PathBuf) {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match file {
        Some(path) if path.as_os_str() == "-" => {
            let mut text = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut text) {
                fail(format!("reading stdin: {e}"));
            }
            (text, cwd)
        }
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .unwrap_or_else(|e| fail(format!("{}: {e}", path.display())));
            let base = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or(cwd, Path::to_path_buf);
            (text, base)
        }
        None => match store.load() {
            Ok(text) => (text.unwrap_or_default(), cwd),
            Err(e) => fail(e),
        },
    }
}

fn build_session(settings: &SketchSettings, base_dir: PathBuf) -> SketchSession<Recorder> {
    let resolver = DefaultResolver::from_settings(settings, base_dir).unwrap_or_else(|e| fail(e));
    let cache = ReferenceCache::on_current_runtime(Arc::new(resolver)).unwrap_or_else(|e| fail(e));
    let registry = registry::builtin().unwrap_or_else(|e| fail(e));
    let interpreter = Interpreter::new(Arc::new(registry), cache);
    SketchSession::new(interpreter, Recorder::new(), |_: &[String]| {})
        .with_canvas(settings.canvas_width, settings.canvas_height)
}

fn apply_view(session: &mut SketchSession<Recorder>, view: &ViewArgs) {
    let current = session.viewport();
    let viewport = Viewport::new(
        view.pan_x.unwrap_or(current.pan_x),
        view.pan_y.unwrap_or(current.pan_y),
        view.zoom.unwrap_or(current.zoom),
    );
    session.set_viewport(viewport);
}

fn print_report(script: &str, report: &PassReport, session: &SketchSession<Recorder>, ops: bool, raw: bool) {
    if raw {
        let mut value = serde_json::to_value(report).unwrap_or_default();
        if ops {
            value["ops"] = serde_json::to_value(session.surface().current_frame()).unwrap_or_default();
        }
        println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        return;
    }

    print!("{}", annotate(script, &report.hints));
    if ops {
        println!();
        for op in session.surface().current_frame() {
            println!("{}", serde_json::to_string(op).unwrap_or_default());
        }
    }
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = cli.config_dir.clone().unwrap_or_else(paths::app_config_dir);
    let settings = settings::load_or_default(&config_dir);
    let store = ScriptStore::in_config_dir(&config_dir);
    let raw = cli.json;

    match cli.command {
        Commands::Run {
            file,
            view,
            references,
            ops,
            timeout,
        } => {
            let (script, base_dir) = read_script(file.as_deref(), &store);
            let mut session = build_session(&settings, base_dir);
            apply_view(&mut session, &view);
            for entry in &references {
                let Some((name, path)) = entry.split_once('=') else {
                    fail(format!("--reference expects NAME=PATH, got '{entry}'"));
                };
                session.load_reference(name, Path::new(path));
            }

            let first = session.set_script(script.clone());
            let wait = Duration::from_secs(timeout.unwrap_or(settings.settle_timeout_secs));
            session.settle(wait).await;

            let report = session.last_report().cloned().unwrap_or(first);
            print_report(&script, &report, &session, ops, raw);
        }
        Commands::Check { file } => {
            let (script, base_dir) = read_script(file.as_deref(), &store);
            let mut session = build_session(&settings, base_dir);
            let report = session.set_script(script.clone());
            print_report(&script, &report, &session, false, raw);
            if report.halted() {
                process::exit(1);
            }
        }
        Commands::Commands { topic } => {
            let registry = registry::builtin().unwrap_or_else(|e| fail(e));
            if raw {
                let value = catalog::to_json(&registry);
                println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
            } else {
                println!("{}", catalog::help_text(&registry, topic.as_deref()));
            }
        }
        Commands::Open { file } => {
            let text = std::fs::read_to_string(&file)
                .unwrap_or_else(|e| fail(format!("{}: {e}", file.display())));
            store.save(&text).unwrap_or_else(|e| fail(e));

            let mut updated = settings.clone();
            updated.last_document = Some(file.clone());
            if let Err(e) = settings::save_settings(&config_dir, &updated) {
                tracing::warn!(error = %e, "failed to remember last document");
            }

            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            println!("Opened {}", document_name(&file_name));
        }
        Commands::Save { name, dir } => {
            let text = store.load().unwrap_or_else(|e| fail(e)).unwrap_or_default();
            let file_name = save_file_name(&name, DOCUMENT_EXTENSION, chrono::Utc::now());
            let dir = dir.unwrap_or_else(|| PathBuf::from("."));
            let target = dir.join(file_name);
            atomic_write(&target, text.as_bytes()).unwrap_or_else(|e| fail(e));

            let mut updated = settings.clone();
            updated.last_document = Some(target.clone());
            if let Err(e) = settings::save_settings(&config_dir, &updated) {
                tracing::warn!(error = %e, "failed to remember last document");
            }
            println!("Saved {}", target.display());
        }
        Commands::Settings { schema } => {
            let value = if schema {
                settings::settings_schema()
            } else {
                serde_json::to_value(&settings).unwrap_or_default()
            };
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        }
    }
}
