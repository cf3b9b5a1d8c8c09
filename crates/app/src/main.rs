use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use reel_portfolio_core::catalog::ALL_CATEGORIES;
use reel_portfolio_core::{
    AppConfig, Clock, JsonFileStore, Key, KeyValueStore, ManualClock, MemoryStore, Millis,
    PortfolioShell, ProjectCatalog, Result, ShellEvent, SilentBackend, UiEvent,
};
use tracing_subscriber::EnvFilter;

/// Resolution of the simulated clock.
const STEP_MS: Millis = 100;

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Intro { skip_at } => run_intro(&config, &cli.store, skip_at),
        Commands::Keys { codes } => run_keys(&config, &cli.store, &codes),
        Commands::Mute => run_mute(&config, &cli.store),
        Commands::Catalog { category, file } => run_catalog(file.as_deref(), &category),
        Commands::Open { id, file } => run_open(&config, &cli.store, file.as_deref(), id),
    }
}

fn run_intro(config: &AppConfig, store: &Path, skip_at: Option<Millis>) -> Result<()> {
    let clock = ManualClock::new();
    let mut shell = build_shell(config, &clock, store, None)?;
    tracing::info!(skip_at, "running intro");

    let deadline = config
        .intro
        .timetable
        .completes_at()
        .unwrap_or_default()
        .saturating_add(config.intro.grace_ms)
        .saturating_add(STEP_MS);
    while shell.gate().is_visible() && clock.now_ms() < deadline {
        clock.advance(STEP_MS);
        let now = clock.now_ms();
        let events = match skip_at {
            Some(at) if now >= at && shell.intro().is_some_and(|intro| !intro.is_complete()) => {
                shell.handle(UiEvent::SkipIntro)?
            }
            _ => shell.tick(),
        };
        report(now, &events);
        if let Some(intro) = shell.intro() {
            tracing::debug!(
                at_ms = now,
                beam = intro.shows_projector_beam(),
                name = intro.shows_name(),
                tagline = intro.shows_tagline(),
                fading = intro.is_fading(),
                "intro frame"
            );
        }
    }
    Ok(())
}

fn run_keys(config: &AppConfig, store: &Path, codes: &[String]) -> Result<()> {
    let clock = ManualClock::new();
    let mut shell = build_shell(config, &clock, store, None)?;
    shell.handle(UiEvent::SkipIntro)?;

    for code in codes {
        clock.advance(STEP_MS);
        let events = shell.handle(UiEvent::Key(Key::from_code(code)))?;
        report(clock.now_ms(), &events);
    }

    let quiet_until = clock.now_ms().saturating_add(config.gestures.director_mode_ms);
    while clock.now_ms() < quiet_until {
        clock.advance(STEP_MS);
        report(clock.now_ms(), &shell.tick());
    }
    Ok(())
}

fn run_mute(config: &AppConfig, store: &Path) -> Result<()> {
    let clock = ManualClock::new();
    let mut shell = build_shell(config, &clock, store, None)?;
    shell.handle(UiEvent::ToggleMute)?;

    let muted = shell.audio().is_muted();
    tracing::info!(muted, store = %store.display(), "mute preference saved");
    println!("{}", if muted { "muted" } else { "unmuted" });
    Ok(())
}

fn run_catalog(file: Option<&Path>, category: &str) -> Result<()> {
    let catalog = load_catalog(file)?;
    tracing::info!(categories = ?catalog.categories(), "catalog loaded");

    for entry in catalog.filter(category) {
        println!(
            "{:>3}  {:<20} {:<12} {}  {} ({})",
            entry.id, entry.title, entry.category, entry.year, entry.role, entry.duration
        );
    }
    Ok(())
}

fn run_open(config: &AppConfig, store: &Path, file: Option<&Path>, id: u32) -> Result<()> {
    let clock = ManualClock::new();
    let catalog = load_catalog(file)?;
    let mut shell = build_shell(config, &clock, store, Some(catalog))?;
    shell.handle(UiEvent::SkipIntro)?;

    report(clock.now_ms(), &shell.handle(UiEvent::SelectProject(Some(id)))?);
    let close_at = clock.now_ms().saturating_add(config.modal.loading_ms).saturating_add(1_000);
    let mut closed = false;
    while shell.viewer().is_mounted() {
        clock.advance(STEP_MS);
        let events = if !closed && clock.now_ms() >= close_at {
            closed = true;
            shell.handle(UiEvent::CloseProject)?
        } else {
            shell.tick()
        };
        report(clock.now_ms(), &events);
    }
    Ok(())
}

fn build_shell(
    config: &AppConfig,
    clock: &ManualClock,
    store: &Path,
    catalog: Option<ProjectCatalog>,
) -> Result<PortfolioShell> {
    let catalog = match catalog {
        Some(catalog) => catalog,
        None => ProjectCatalog::builtin()?,
    };
    let durable: Box<dyn KeyValueStore> = Box::new(JsonFileStore::open(store));
    Ok(PortfolioShell::new(
        config,
        catalog,
        clock.shared(),
        Box::new(SilentBackend),
        durable,
        Box::new(MemoryStore::new()),
    ))
}

fn load_catalog(file: Option<&Path>) -> Result<ProjectCatalog> {
    match file {
        Some(path) => ProjectCatalog::load(path),
        None => ProjectCatalog::builtin(),
    }
}

fn report(now: Millis, events: &[ShellEvent]) {
    for event in events {
        tracing::info!(at_ms = now, ?event);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulator for the Reel Portfolio site core", long_about = None)]
struct Cli {
    /// Optional JSON config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Durable preference store.
    #[arg(short, long, global = true, default_value = "reel-portfolio.json")]
    store: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play the intro sequence on a simulated clock.
    Intro {
        /// Skip the intro once this many milliseconds have elapsed.
        #[arg(long)]
        skip_at: Option<Millis>,
    },
    /// Feed DOM key codes (e.g. ArrowUp, KeyB) to the easter eggs.
    Keys {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Toggle the persisted mute preference.
    Mute,
    /// List catalog entries.
    Catalog {
        #[arg(long, default_value = ALL_CATEGORIES)]
        category: String,
        /// Catalog JSON file; the built-in sample is used otherwise.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Open a project in the viewer, then close it.
    Open {
        id: u32,
        #[arg(long)]
        file: Option<PathBuf>,
    },
}
