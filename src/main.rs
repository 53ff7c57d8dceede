use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use aerosim::{
    engine::Engine,
    scenario::{Scenario, ScenarioLoader},
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Airport operations simulator")]
struct Cli {
    /// Path to a scenario YAML file; the balanced preset is used when omitted
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the landing policy (fixed, fuel_priority, dynamic)
    #[arg(long)]
    policy: Option<String>,

    /// Force a weather regime for the whole run
    #[arg(long)]
    weather: Option<String>,

    /// Print the final snapshot as JSON
    #[arg(long)]
    json: bool,

    /// Serve the HTTP API instead of running a batch
    #[arg(long)]
    serve: bool,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8000)]
    port: u16,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut scenario = match &cli.scenario {
        Some(path) => ScenarioLoader::new(".").load(path)?,
        None => Scenario::default(),
    };
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }
    if let Some(policy) = &cli.policy {
        scenario.policy = policy.clone();
    }
    if let Some(weather) = &cli.weather {
        scenario.weather.override_regime = Some(weather.clone());
    }

    init_tracing(&scenario.logging.level);

    if cli.serve {
        let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
        return runtime.block_on(web::run(WebServerConfig {
            scenario: Some(scenario),
            host: cli.host,
            port: cli.port,
        }));
    }

    let ticks = scenario.ticks(cli.ticks);
    let mut engine = Engine::from_scenario(&scenario)
        .with_context(|| format!("scenario '{}' is invalid", scenario.name))?;
    engine.advance(ticks)?;
    let snapshot = engine.snapshot();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let metrics = &snapshot.metrics;
    println!(
        "Scenario '{}' ran {} ticks ({:02}:{:02}, {}).",
        scenario.name, ticks, snapshot.clock.hour, snapshot.clock.minute, snapshot.weather.regime
    );
    println!(
        "  spawned {} | arrivals {} | departures {} | diverted {} | emergencies {} | go-arounds {}",
        metrics.total_spawned,
        metrics.total_arrivals,
        metrics.total_departures,
        metrics.total_diverted,
        metrics.total_emergencies,
        metrics.total_go_arounds
    );
    println!(
        "  throughput {:.2}/h | runway utilization {:.1}% | avg holding {:.1} ticks | fuel efficiency {:.1} | tower efficiency {:.1}",
        metrics.throughput_per_hour,
        metrics.runway_utilization,
        metrics.average_holding_time,
        metrics.fuel_efficiency,
        metrics.scheduler.tower_efficiency
    );
    for airline in &snapshot.airlines {
        println!(
            "  {} {}: {} completed, {} diverted, cost {:.0}, efficiency {:.1}",
            airline.code,
            airline.name,
            airline.performance.completed_flights,
            airline.diversions,
            airline.total_cost,
            airline.performance.efficiency_score
        );
    }
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
