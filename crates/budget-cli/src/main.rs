mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::budget::{BudgetArgs, ValuateArgs};

/// Manufacturing master budget with inventory costing
#[derive(Parser)]
#[command(
    name = "mbudget",
    version,
    about = "Manufacturing master budget with LIFO, FIFO and weighted average costing",
    long_about = "A CLI for building a manufacturing master budget with decimal precision. \
                  Derives production, material purchases, labor, overhead, cost of goods \
                  sold and the budgeted income statement from a sales forecast, valuing \
                  raw materials and finished goods under the selected costing policy."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log stage evaluation to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the full master budget
    Budget(BudgetArgs),
    /// Value a single two-lot inventory movement
    Valuate(ValuateArgs),
    /// Build the budget under every costing policy and compare
    Compare(BudgetArgs),
    /// Print the budgeted income statement as plain text
    Summary(BudgetArgs),
    /// Print the reference input data set
    Demo,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "budget_core=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Budget(args) => commands::budget::run_budget(args),
        Commands::Valuate(args) => commands::budget::run_valuate(args),
        Commands::Compare(args) => commands::budget::run_compare(args),
        Commands::Summary(args) => match commands::budget::run_summary(args) {
            Ok(text) => {
                print!("{text}");
                return;
            }
            Err(e) => Err(e),
        },
        Commands::Demo => commands::budget::run_demo(),
        Commands::Version => {
            println!("mbudget {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
