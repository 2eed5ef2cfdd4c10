mod allocator;
mod audience;
mod campaign;
mod channels;
mod charts;
mod datasets;
mod error;
mod logger;
mod logging;
mod merger;
mod report;
mod sales_houses;

#[cfg(test)]
mod test_fixtures;

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use audience::OptimizationGoal;
use campaign::CampaignInput;
use charts::{ChartRenderer, GroupedBarChart, PlottersRenderer};
use datasets::{get_dataset_catalog, load_dataset};
use logger::{ConsoleReceiver, FileReceiver, LogEvent, Logger};

const DEFAULT_DATASET: &str = "sirius_space";

#[derive(Parser, Debug)]
#[command(name = "tvsplit", version, about = "Split a TV campaign budget between channels")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge rate and affinity tables and split the budget
    Run(RunArgs),
    /// List the built-in datasets
    Datasets,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Campaign JSON file
    #[arg(long, value_name = "FILE", conflicts_with = "dataset")]
    input: Option<PathBuf>,

    /// Built-in dataset, see `tvsplit datasets`
    #[arg(long, value_name = "NAME")]
    dataset: Option<String>,

    /// Total budget, overrides the campaign's
    #[arg(long, env = "TVSPLIT_BUDGET")]
    budget: Option<f64>,

    /// Optimization goal label, overrides the campaign's
    #[arg(long, value_enum, env = "TVSPLIT_GOAL")]
    goal: Option<OptimizationGoal>,

    /// Save the split chart (PNG, or SVG for a .svg path)
    #[arg(long, value_name = "PATH")]
    chart: Option<PathBuf>,

    /// Save the channel table as CSV
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Print the allocation as JSON instead of the text report
    #[arg(long)]
    json: bool,

    /// Copy the text report to a file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Only print the campaign totals
    #[arg(long, short)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let quiet = matches!(&cli.command, Command::Run(args) if args.quiet);
    logging::init(quiet);

    let result = match cli.command {
        Command::Run(args) => run(args),
        Command::Datasets => {
            list_datasets();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn list_datasets() {
    for entry in get_dataset_catalog() {
        println!("{:<20} {}", entry.short_name, entry.description);
    }
}

fn load_campaign(args: &RunArgs) -> anyhow::Result<CampaignInput> {
    let campaign = match (&args.input, &args.dataset) {
        (Some(path), _) => CampaignInput::from_path(path)
            .with_context(|| format!("failed to load campaign file {}", path.display()))?,
        (None, Some(name)) => load_dataset(name).with_context(|| {
            let available: Vec<&str> = get_dataset_catalog().iter().map(|e| e.short_name).collect();
            format!("failed to load dataset '{}' (available: {})", name, available.join(", "))
        })?,
        (None, None) => load_dataset(DEFAULT_DATASET)
            .with_context(|| format!("failed to load dataset '{}'", DEFAULT_DATASET))?,
    };

    let campaign = match args.budget {
        Some(budget) => campaign.with_total_budget(budget),
        None => campaign,
    };
    Ok(match args.goal {
        Some(goal) => campaign.with_optimization_goal(goal),
        None => campaign,
    })
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let campaign = load_campaign(&args)?;

    let allocation = campaign.run().context("budget split failed")?;
    info!(
        channels = allocation.channels.len(),
        allocated_budget = allocation.totals.allocated_budget,
        rounding_remainder = allocation.rounding_remainder(),
        outside_corridor = allocation.outside_corridor().count(),
        goal = %allocation.optimization_goal,
        "budget split done"
    );

    // Text report: console unless JSON owns stdout, plus an optional file copy
    let mut logger = Logger::new();
    if !args.json {
        let console_events = if args.quiet {
            vec![LogEvent::Summary]
        } else {
            vec![LogEvent::Merge, LogEvent::Allocation, LogEvent::Summary]
        };
        logger.add_receiver(ConsoleReceiver::new(console_events));
    }
    if let Some(path) = &args.log_file {
        let receiver = FileReceiver::new(path, vec![LogEvent::Merge, LogEvent::Allocation, LogEvent::Summary])
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        logger.add_receiver(receiver);
    }
    report::printout(&allocation, &mut logger).context("failed to write report")?;

    if args.json {
        report::write_json(&allocation, io::stdout().lock()).context("failed to write JSON")?;
    }

    if let Some(path) = &args.csv {
        report::write_csv(&allocation, path).with_context(|| format!("failed to write CSV {}", path.display()))?;
    }

    if let Some(path) = &args.chart {
        PlottersRenderer::new(path)
            .render(&GroupedBarChart::from_allocation(&allocation))
            .with_context(|| format!("failed to save chart {}", path.display()))?;
    }

    Ok(())
}
