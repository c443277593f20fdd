//! Sovereign CLI - island economy tick engine.
//!
//! Single binary that provides:
//! - `sovereign run` - run the tick engine until Ctrl-C
//! - `sovereign tick` - run a fixed number of ticks against a demo world
//! - `sovereign catalog` - print building types and production
//! - `sovereign status` - recent engine journal entries
//! - `sovereign init` - write a default configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use sovereign_core::config::DEFAULT_CONFIG_YAML;
use sovereign_core::observability::Journal;
use sovereign_core::state::{BuildingStatus, IslandOverview, PlayerId, Port};
use sovereign_core::{Clock, Engine, EngineConfig, IslandService, ManualClock, SystemClock};

/// Player owning the demo island.
const DEMO_PLAYER: PlayerId = PlayerId(1);

#[derive(Parser)]
#[command(name = "sovereign")]
#[command(about = "Island economy tick engine", version)]
struct Cli {
    /// Project root directory
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tick engine until interrupted
    Run {
        /// Found a demo island and schedule a delivery on it
        #[arg(long)]
        demo: bool,
    },

    /// Run ticks back-to-back against a demo world
    Tick {
        /// Number of ticks to run
        #[arg(short, long, default_value = "12")]
        count: u32,
    },

    /// Show building types and production
    Catalog,

    /// Show recent engine events
    Status,

    /// Initialize a new project
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if cli.json {
        fmt().json().with_env_filter(filter).with_target(false).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }

    let project_root = match cli.project {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match cli.command {
        Some(Commands::Run { demo }) => run_engine(&project_root, demo).await,
        Some(Commands::Tick { count }) => run_ticks(&project_root, count).await,
        Some(Commands::Catalog) => show_catalog(&project_root).await,
        Some(Commands::Status) => show_status(&project_root),
        Some(Commands::Init) => init_project(&project_root),
        None => {
            println!("Sovereign - Island Economy Tick Engine");
            println!();
            println!("Usage: sovereign <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run       Run the tick engine");
            println!("  tick      Run ticks against a demo world");
            println!("  catalog   Show building types");
            println!("  status    Show recent engine events");
            println!("  init      Initialize a new project");
            println!();
            println!("Run 'sovereign --help' for more information.");
            Ok(())
        }
    }
}

fn load_config(project_root: &Path) -> Result<EngineConfig> {
    let mut config = EngineConfig::load_from_project(project_root)?;
    config.resolve_paths(project_root);
    config.validate()?;
    Ok(config)
}

async fn run_engine(project_root: &Path, demo: bool) -> Result<()> {
    tracing::info!(project = %project_root.display(), "Starting engine");

    let config = load_config(project_root)?;
    let engine = Engine::in_memory(config, Arc::new(SystemClock));

    if demo {
        let islands = engine.islands();
        let port = seed_demo_island(&islands).await?;
        let due = islands
            .schedule_building(port.id, "trade_office", chrono::Duration::seconds(10))
            .await?;
        tracing::info!(port_id = %port.id, due_at = %due, "Demo delivery scheduled");
    }

    let metrics = engine.metrics();
    let handle = engine.scheduler().start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown requested");

    let summary = handle.stop().await.context("Tick engine task failed")?;
    let snapshot = metrics.snapshot();
    tracing::info!(
        ticks = summary.ticks,
        events = snapshot.events_dispatched,
        credited = snapshot.buildings_credited,
        completed = snapshot.constructions_completed,
        "Engine stopped"
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}

async fn run_ticks(project_root: &Path, count: u32) -> Result<()> {
    let config = load_config(project_root)?;
    let step = config.production_interval();
    let clock = Arc::new(ManualClock::starting_now());
    let engine = Engine::in_memory(config, clock.clone()).with_journal(Journal::disabled());

    let islands = engine.islands();
    let port = seed_demo_island(&islands).await?;
    islands.construct_building(port.id, "dock").await?;
    islands
        .schedule_building(port.id, "lumber_mill", chrono::Duration::seconds(10))
        .await?;

    let scheduler = engine.scheduler();
    for tick in 1..=count {
        clock.advance(step);
        let report = scheduler.run_tick(clock.now()).await;
        println!("tick {:>3}: {}", tick, report.summary());
    }

    println!();
    print_overview(&islands.island_overview(port.id).await?);
    Ok(())
}

async fn seed_demo_island(islands: &IslandService) -> Result<Port> {
    let port = islands
        .found_island(DEMO_PLAYER, "Port Royal")
        .await
        .context("Failed to found demo island")?;
    tracing::info!(port_id = %port.id, resources = %port.resources, "Demo island founded");
    Ok(port)
}

fn print_overview(overview: &IslandOverview) {
    let port = &overview.port;
    println!("{} (#{}) at ({}, {})", port.name, port.id, port.x, port.y);
    println!("  Resources: {}", port.resources);
    println!(
        "  Buildings: {} active, {} under construction",
        overview.active_buildings().count(),
        overview.buildings_under_construction().count()
    );
    for building in &overview.buildings {
        let status = match building.status() {
            BuildingStatus::Active => "active".to_string(),
            BuildingStatus::UnderConstruction { .. } => "under construction".to_string(),
            BuildingStatus::Upgrading { to_level, .. } => format!("upgrading to {}", to_level),
        };
        println!(
            "    #{} {} level {} - {}",
            building.id, building.building_type, building.level, status
        );
    }
}

async fn show_catalog(project_root: &Path) -> Result<()> {
    let config = load_config(project_root)?;
    let engine =
        Engine::in_memory(config, Arc::new(SystemClock)).with_journal(Journal::disabled());
    let islands = engine.islands();

    println!("Building Types");
    println!("==============");
    for building_type in islands.building_types().await? {
        let cost = building_type.base_cost;
        println!(
            "{:<18} wood {:>4}  iron {:>4}  gold {:>4}  {:>4}s  max level {}",
            building_type.name,
            cost.wood,
            cost.iron,
            cost.gold,
            building_type.base_build_time_secs,
            building_type.max_level
        );
        let level_one: Vec<String> = islands
            .building_production(&building_type.name)
            .await?
            .into_iter()
            .filter(|rate| rate.level == 1)
            .map(|rate| format!("{} {}", rate.resource, rate.rate))
            .collect();
        if !level_one.is_empty() {
            println!("{:<18} produces {} per tick at level 1", "", level_one.join(", "));
        }
    }

    Ok(())
}

fn show_status(project_root: &Path) -> Result<()> {
    let config = load_config(project_root)?;
    let journal = Journal::new(config.journal_path.clone());
    let recent = journal.read_recent(10);

    println!("Sovereign Engine Status");
    println!("=======================");
    println!();
    println!("Project: {}", project_root.display());
    println!("Tick interval: {}s", config.tick_interval_secs);
    println!("Event batch limit: {}", config.event_batch_limit);
    if let Some(path) = journal.path() {
        println!("Journal: {}", path.display());
    }
    println!();
    println!("Recent events:");
    if recent.is_empty() {
        println!("  (none)");
    }
    for event in &recent {
        println!(
            "  {} [{}] {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.event_type,
            event.message
        );
    }

    Ok(())
}

fn init_project(project_root: &Path) -> Result<()> {
    let config_path = EngineConfig::project_config_path(project_root);
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }
    std::fs::write(&config_path, DEFAULT_CONFIG_YAML)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Initialized Sovereign project at {}", project_root.display());
    println!();
    println!("Created:");
    println!("  .sovereign/config.yaml - engine configuration");
    println!();
    println!("Next steps:");
    println!("  1. Adjust the catalog in .sovereign/config.yaml");
    println!("  2. Run: sovereign run --demo");

    Ok(())
}
