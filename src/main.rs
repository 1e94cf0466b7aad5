#![forbid(unsafe_code)]

mod config;
mod constants;
mod context;
mod dom;
mod engine;
mod error;
mod event_handler;
mod guard;
mod locator;
mod primitives;
mod registry;
mod scheduler;
mod stylesheet;
mod transform;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{error, info, info_span};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::filter::LevelFilter;

use config::{JsonFileStore, Mode, Settings, SettingsStore, Theme, get_or_default};
use constants::ids;
use context::EngineLimits;
use dom::{Document, MemoryTree, markup};
use engine::Engine;
use event_handler::{handle_event, load_script};

#[derive(Parser)]
#[command(name = "retrofit")]
#[command(version = constants::VERSION)]
#[command(about = "Restyle a host page by converging its tree towards a profile")]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the active profile to a page and replay host events against it
    Run {
        /// Page markup
        page: PathBuf,
        /// JSON array of host events
        #[arg(long)]
        script: Option<PathBuf>,
        /// Override the stored mode
        #[arg(long)]
        mode: Option<Mode>,
        /// Override the stored theme
        #[arg(long)]
        theme: Option<Theme>,
    },
    /// Validate the settings document
    Check,
    /// Print the default settings document
    Defaults,
    /// Write one settings key (value parsed as JSON, else taken as a string)
    Set { key: String, value: String },
}

fn log_level(configured: &str) -> LevelFilter {
    // LOG_LEVEL wins over the stored level
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| configured.to_string());
    match level.to_lowercase().as_str() {
        "silent" => LevelFilter::OFF,
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Defaults = cli.command {
        println!("{}", serde_json::to_string_pretty(&config::defaults::document())?);
        return Ok(());
    }

    let path = cli.settings.unwrap_or_else(JsonFileStore::default_path);
    let mut store = JsonFileStore::load(&path)?;

    let configured: String = get_or_default(&store, "global.log_level", "info".to_string());
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(&configured))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let span = info_span!("retrofit", version = constants::VERSION);
    let _enter = span.enter();

    match cli.command {
        Commands::Run {
            page,
            script,
            mode,
            theme,
        } => run(&store, page, script, mode, theme)?,
        Commands::Check => {
            let settings = Settings::from_store(&store)?;
            info!(path = %store.path().display(), "Settings are consistent");
            println!("ok: mode={} theme={}", settings.mode, settings.theme);
        }
        Commands::Set { key, value } => {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            store.set(&key, value).map_err(|e| e.into_engine_error(&key))?;
            // Reject writes that would break profile parity before persisting
            Settings::from_store(&store)?;
            store.save().map_err(|e| e.into_engine_error(&key))?;
            info!(key = %key, path = %store.path().display(), "Setting saved");
        }
        Commands::Defaults => {}
    }
    Ok(())
}

fn run(
    store: &JsonFileStore,
    page: PathBuf,
    script: Option<PathBuf>,
    mode: Option<Mode>,
    theme: Option<Theme>,
) -> Result<()> {
    let settings = Settings::from_store(store)?;
    let profile = settings.profile(mode.unwrap_or(settings.mode), theme.unwrap_or(settings.theme));

    let source = std::fs::read_to_string(&page)
        .with_context(|| format!("Failed to read page {}", page.display()))?;
    let mut tree = MemoryTree::from_markup(&source)
        .with_context(|| format!("Failed to parse page {}", page.display()))?;
    let events = match &script {
        Some(path) => load_script(path)?,
        None => Vec::new(),
    };

    let mut engine = Engine::new(profile, EngineLimits::from(&settings.global))?;
    let outcome = engine.start(&mut tree);
    info!(outcome = ?outcome, "Initial pass");

    for event in events {
        let outcomes = handle_event(&mut engine, &mut tree, &settings, event)
            .inspect_err(|err| error!("encountered error in 'handle_event': err={err:#}"));
        if let Ok(outcomes) = outcomes
            && !outcomes.is_empty()
        {
            info!(outcomes = ?outcomes, "Event delivered");
        }
    }

    print!("{}", markup::render(&tree, tree.root()));
    if let Some(css) = tree.stylesheet(ids::STYLE_SLOT) {
        println!("\n/* {} */\n{css}", ids::STYLE_SLOT);
    }

    let report = engine.report();
    let ctx = engine.context();
    println!("profile:  {}", engine.profile().name());
    println!("state:    {:?}", engine.state());
    println!("applied:  {}", report.applied.join(", "));
    if report.is_clean() {
        println!("skipped:  none");
    }
    for (region, err) in &report.skipped {
        println!("skipped:  {region}: {err}");
    }
    if !report.deferred.is_empty() {
        println!("deferred: {}", report.deferred.join(", "));
    }
    if ctx.queue.pending_count() > 0 {
        println!("waiting:  {} retries", ctx.queue.pending_count());
    }
    if !ctx.registry.is_empty() {
        println!(
            "created:  {} nodes, {} host attributes rewritten",
            ctx.registry.len(),
            ctx.registry.edited_attributes()
        );
    }
    if !ctx.sheet.is_empty() {
        println!("rules:    {}", ctx.sheet.len());
    }
    println!("tree:     {} nodes, {} mutations", tree.attached_count(), tree.mutation_count());
    for diagnostic in engine.diagnostics() {
        println!("halted:   {diagnostic}");
    }
    Ok(())
}
