//! Greeks Demo CLI
//!
//! Entry point for sensitivity and scenario runs over the synthetic market.
//!
//! # Commands
//!
//! - `greeks-demo greeks` - Per-tenor deltas (and optionally gammas, hedges)
//! - `greeks-demo scenarios [NAME...]` - Preset stress scenarios
//! - `greeks-demo check` - Print the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use greeks_demo::config::OutputFormat;
use greeks_demo::prelude::*;
use greeks_demo::{report, workflow};
use greeks_engine::config::{BumpType, HedgeTenor, SensitivityMethod};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Bump-and-reprice sensitivity demo
#[derive(Parser)]
#[command(name = "greeks-demo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute sensitivities of the demo book
    Greeks {
        /// Bump grouping (uniform, parallel, by_tenor)
        #[arg(short, long)]
        bump_type: Option<String>,

        /// Curve categories, e.g. "InterestRates | CreditQuotes"
        #[arg(short, long)]
        targets: Option<String>,

        /// Also compute gammas
        #[arg(short, long)]
        gamma: bool,

        /// Hedge tenor rule (all, maturity, matching, or a tenor name)
        #[arg(long)]
        hedge: Option<String>,

        /// Use pricer-supplied ordinate derivatives instead of bumping
        #[arg(long)]
        semi_analytic: bool,
    },

    /// Run preset stress scenarios (all when none are named)
    Scenarios {
        /// Scenario names
        names: Vec<String>,
    },

    /// Print the effective configuration and the preset list
    Check,
}

fn parse_bump_type(name: &str) -> Result<BumpType> {
    match name.to_lowercase().as_str() {
        "uniform" => Ok(BumpType::Uniform),
        "parallel" => Ok(BumpType::Parallel),
        "by_tenor" | "bytenor" => Ok(BumpType::ByTenor),
        other => anyhow::bail!("unknown bump type '{}'", other),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = DemoConfig::load_or_default(cli.config.as_deref())?.with_env_override();
    if let Some(format) = cli.format {
        config.output = format;
    }
    if cli.verbose {
        config.log_level = "debug".to_string();
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .init();

    match cli.command {
        Commands::Greeks {
            bump_type,
            targets,
            gamma,
            hedge,
            semi_analytic,
        } => {
            if let Some(name) = bump_type {
                config.sensitivity.bump_type = parse_bump_type(&name)?;
            }
            if let Some(targets) = targets {
                config.sensitivity.targets = targets
                    .parse()
                    .with_context(|| format!("invalid targets '{}'", targets))?;
            }
            if gamma {
                config.sensitivity.calc_gamma = true;
            }
            if let Some(rule) = hedge {
                config.sensitivity = config.sensitivity.with_hedge(HedgeTenor::from(rule));
            }
            if semi_analytic {
                config.sensitivity.method = SensitivityMethod::SemiAnalytic;
            }
            config.validate()?;

            let market = DemoMarket::build()?;
            info!(
                bump_type = %config.sensitivity.bump_type,
                targets = %config.sensitivity.targets,
                "computing sensitivities"
            );
            let table = workflow::sensitivities(&config, &market)?;
            println!("{}", report::sensitivities(&table, config.output)?);
        }
        Commands::Scenarios { names } => {
            config.validate()?;
            let mut batch = if names.is_empty() {
                all_presets()?
            } else {
                names.iter().map(|n| preset(n)).collect::<greeks_demo::error::Result<Vec<_>>>()?
            };

            let market = DemoMarket::build()?;
            let results = workflow::scenarios(&config, &market, &mut batch)?;
            println!("{}", report::scenarios(&results, config.output)?);
        }
        Commands::Check => {
            config.validate()?;
            println!("{:#?}", config);
            println!("scenarios: {}", PRESETS.join(", "));
            if config.output == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&config.sensitivity)?);
            }
        }
    }

    Ok(())
}
