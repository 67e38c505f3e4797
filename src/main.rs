use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use traffic_flow::analysis::Analyzer;
use traffic_flow::export::Exporter;
use traffic_flow::simulation::{ScenarioConfig, Simulator};

#[derive(Parser)]
#[command(name = "traffic_flow")]
#[command(about = "Discrete-time microscopic traffic simulation")]
struct Cli {
    /// Scenario document (JSON); a built-in demo network is used when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(long, default_value = "100")]
    steps: u32,

    /// Duration of one tick in minutes
    #[arg(long, default_value = "1.0")]
    dt: f64,

    /// Probability that a new vehicle enters the network each tick
    #[arg(long, default_value = "0.3")]
    arrival_rate: f64,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Directory receiving exported results
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,

    /// Skip writing result files
    #[arg(long)]
    no_export: bool,

    /// Do not log per-tick progress
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn,traffic_flow=info"))
        .init();

    let cli = Cli::parse();

    let mut simulator = match &cli.config {
        Some(path) => Simulator::from_config_file(path, cli.seed)
            .with_context(|| format!("failed to load scenario {}", path.display()))?,
        None => {
            let mut rng = match cli.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let network = ScenarioConfig::demo()
                .build_network("demo", &mut rng)
                .context("failed to build the demo network")?;
            Simulator::with_rng(network, rng)
        }
    };
    simulator.show_progress = !cli.quiet;

    info!("{}", simulator.network);

    simulator
        .run(cli.steps, cli.dt, cli.arrival_rate)
        .context("simulation failed")?;

    let analyzer = Analyzer::new(simulator.history());
    let Some(report) = analyzer.report() else {
        warn!("No statistics recorded, nothing to analyse");
        return Ok(());
    };

    println!(
        "Mean speed {:.1} km/h, mean congestion {:.1}%, efficiency {:.1}/100",
        report.summary.mean_speed, report.congestion.mean_ratio_percent, report.summary.efficiency
    );
    if let Some(best) = report.routes.first() {
        println!("Best route: {} (score {:.1})", best.name, best.score);
    }

    if cli.no_export {
        return Ok(());
    }

    let exporter = Exporter::new(&cli.output_dir)
        .with_context(|| format!("cannot create {}", cli.output_dir.display()))?;
    let history = simulator.history();
    exporter.write_history_json(history)?;
    exporter.write_global_csv(history)?;
    exporter.write_route_csv(history)?;
    exporter.write_text_report(&report)?;
    simulator
        .save_configuration(exporter.output_dir().join("scenario.json"))
        .context("cannot save the scenario")?;

    println!("Results written to {}", exporter.output_dir().display());
    Ok(())
}
