mod tui;

use std::{fs::File, io::BufWriter, path::PathBuf};

use clap::Parser;
use haulsim::config::load_scenario;
use haulsim::logger::{self, LogLevel, LogSettings};
use haulsim::model::kpi::Kpis;
use haulsim::model::mine_simulation::{Simulation, Snapshot};
use serde::Serialize;
use tracing::{error, info};

/// Simulate open-pit haul cycles and report productivity
#[derive(Debug, Parser)]
#[command(name = "haulsim", version)]
struct Cli {
    /// Scenario JSON file
    config: PathBuf,

    /// Simulated hours to run
    #[arg(long, default_value_t = 8.0)]
    hours: f64,

    /// Override the scenario's random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the event log as CSV
    #[arg(long)]
    events_out: Option<PathBuf>,

    /// Write final snapshot and KPIs as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Append log lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Watch the run in the terminal viewer
    #[arg(long)]
    tui: bool,

    /// Simulated hours advanced per viewer tick
    #[arg(long, default_value_t = 0.05)]
    tui_step_hours: f64,
}

#[derive(Serialize)]
struct Summary<'a> {
    generated_at: String,
    kpis: &'a Kpis,
    snapshot: &'a Snapshot,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        error!("Simulation failed: {}", err);
        eprintln!("haulsim: {}", err);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(&LogSettings {
        min_level: cli.log_level,
        file: cli.log_file.as_deref(),
        console_output: !cli.tui,
    })?;

    let (scenario, mut engine) = load_scenario(&cli.config)?;
    if let Some(seed) = cli.seed {
        engine.seed = seed;
    }
    let fuel_price = engine.fuel_price;
    let mut sim = Simulation::new(scenario, engine)?;

    if cli.tui {
        let title = format!("haulsim - {}", cli.config.display());
        tui::run(&mut sim, cli.hours, cli.tui_step_hours, title)?;
    } else {
        sim.run(cli.hours);
    }

    let snapshot = sim.snapshot();
    let kpis = Kpis::compute(sim.log(), &snapshot, fuel_price);
    println!("{}", format_summary(&snapshot, &kpis));

    if let Some(path) = &cli.events_out {
        sim.log().write_csv(BufWriter::new(File::create(path)?))?;
        info!(path = %path.display(), events = sim.log().len(), "event log written");
    }
    if let Some(path) = &cli.summary_json {
        let summary = Summary {
            generated_at: chrono::Local::now().to_rfc3339(),
            kpis: &kpis,
            snapshot: &snapshot,
        };
        serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), &summary)?;
        info!(path = %path.display(), "summary written");
    }
    Ok(())
}

fn format_summary(snapshot: &Snapshot, kpis: &Kpis) -> String {
    let mut out = format!(
        "Haul status at {:.2} h | weather {} | road condition {:.2}\n",
        snapshot.time_hours, snapshot.weather, snapshot.mean_road_condition
    );
    out.push_str("Trucks:\n");
    for truck in &snapshot.trucks {
        out.push_str(&format!(
            "  - {} -> {}: {} | cycles {} | breakdowns {} | queued {:.2} h | {:.0} t hauled\n",
            truck.id,
            truck.assigned_excavator,
            truck.phase.as_str(),
            truck.cycles_completed,
            truck.breakdowns,
            truck.queue_hours,
            truck.tonnes_hauled
        ));
    }
    out.push_str("Excavators:\n");
    for excavator in &snapshot.excavators {
        out.push_str(&format!(
            "  - {}: {} / {} loading | queue {} (peak {}) | {} loads\n",
            excavator.id,
            excavator.in_service,
            excavator.capacity,
            excavator.queue_depth,
            excavator.peak_queue,
            excavator.admissions
        ));
    }
    out.push_str(&format!(
        "Queuing share {:.1}% | fuel {:.2}/km | utilization {:.1}% | {:.0} t in {} cycles",
        kpis.queuing_fraction * 100.0,
        kpis.fuel_cost_per_km,
        kpis.utilization * 100.0,
        kpis.tonnes_hauled,
        kpis.cycles_completed
    ));
    out
}
