//! SalesLens - operational sales analytics
//!
//! Command-line front end: loads the configuration and dataset, wires the
//! report service and prints each report as JSON.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use saleslens::analytics::{Dimension, FilterSet, HourRange, ReportService, TimeWindow};
use saleslens::cache::MemoryCache;
use saleslens::clock::SystemClock;
use saleslens::config::{Config, LogFormat};
use saleslens::query::MemoryExecutor;
use saleslens::{LensError, Result};
use serde::Serialize;
use tracing::{debug, info};

/// SalesLens - operational sales analytics
///
/// Revenue, product, delivery and retention reports over a sales dataset.
#[derive(Parser, Debug)]
#[command(name = "saleslens")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error (overrides config file)
    #[arg(
        short = 'l',
        long = "log-level",
        value_name = "LEVEL",
        env = "SALESLENS_LOG_LEVEL",
        global = true
    )]
    loglevel: Option<String>,

    /// Log format: pretty or json (overrides config file)
    #[arg(
        long = "log-format",
        value_name = "FORMAT",
        env = "SALESLENS_LOG_FORMAT",
        global = true
    )]
    log_format: Option<String>,

    /// Dataset JSON file (overrides config file)
    #[arg(
        short = 'd',
        long = "dataset",
        value_name = "FILE",
        env = "SALESLENS_DATASET",
        global = true
    )]
    dataset: Option<PathBuf>,

    /// Print JSON on a single line
    #[arg(long = "compact", action = ArgAction::SetTrue, global = true)]
    compact: bool,
}

/// Report window; both bounds or neither
#[derive(Args, Debug, Clone)]
struct WindowArgs {
    /// First day of the window (YYYY-MM-DD)
    #[arg(long = "start", value_name = "DATE", requires = "end")]
    start: Option<NaiveDate>,

    /// Last day of the window, inclusive (YYYY-MM-DD)
    #[arg(long = "end", value_name = "DATE", requires = "start")]
    end: Option<NaiveDate>,
}

impl WindowArgs {
    fn resolve(&self, service: &ReportService) -> Result<TimeWindow> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => TimeWindow::new(start, end),
            (None, None) => Ok(service.default_window()),
            _ => Err(LensError::validation(
                "--start and --end must be given together",
            )),
        }
    }
}

/// Optional sale filters
#[derive(Args, Debug, Clone)]
struct FilterArgs {
    /// Only sales from this channel
    #[arg(long = "channel", value_name = "ID")]
    channel: Option<i64>,

    /// Only sales from this store
    #[arg(long = "store", value_name = "ID")]
    store: Option<i64>,

    #[command(flatten)]
    time: TimeFilterArgs,
}

impl FilterArgs {
    fn to_filter_set(&self) -> Result<FilterSet> {
        Ok(FilterSet {
            channel_id: self.channel,
            store_id: self.store,
            ..self.time.to_filter_set()?
        })
    }
}

/// Optional time-of-sale filters
#[derive(Args, Debug, Clone)]
struct TimeFilterArgs {
    /// Only sales on this weekday (1 = Monday .. 7 = Sunday)
    #[arg(long = "day-of-week", value_name = "DAY")]
    day_of_week: Option<u8>,

    /// First hour of the day, inclusive (requires --end-hour)
    #[arg(long = "start-hour", value_name = "HOUR")]
    start_hour: Option<u8>,

    /// Last hour of the day, inclusive (requires --start-hour)
    #[arg(long = "end-hour", value_name = "HOUR")]
    end_hour: Option<u8>,
}

impl TimeFilterArgs {
    fn to_filter_set(&self) -> Result<FilterSet> {
        Ok(FilterSet {
            day_of_week: self.day_of_week,
            hour_range: HourRange::from_bounds(self.start_hour, self.end_hour)?,
            ..FilterSet::none()
        })
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Revenue, sale count and average ticket
    Overview {
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Best-selling products by revenue
    TopProducts {
        #[command(flatten)]
        window: WindowArgs,

        /// Number of products (1-100, defaults to config)
        #[arg(short = 'n', long = "limit", value_name = "N")]
        limit: Option<u32>,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Revenue by channel or store
    SalesBreakdown {
        #[command(flatten)]
        window: WindowArgs,

        /// channel or store
        #[arg(long = "dimension", value_name = "DIM", default_value = "channel")]
        dimension: Dimension,
    },

    /// Average and p90 delivery time by store, neighborhood or city
    DeliveryPerformance {
        #[command(flatten)]
        window: WindowArgs,

        /// store, neighborhood or city
        #[arg(long = "dimension", value_name = "DIM", default_value = "store")]
        dimension: Dimension,

        #[command(flatten)]
        filters: TimeFilterArgs,
    },

    /// Daily average ticket
    TicketTrend {
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Revenue share per product category
    TicketComposition {
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Repeat customers who stopped buying
    ChurnRisk {
        /// Minimum completed purchases (defaults to config)
        #[arg(long = "min-purchases", value_name = "N")]
        min_purchases: Option<u32>,

        /// Days since the last purchase (defaults to config)
        #[arg(long = "inactive-days", value_name = "DAYS")]
        inactive_days: Option<u32>,
    },

    /// Month-to-date revenue against last month and the trailing average
    MonthlySummary,

    /// Read or update the average ticket goal
    Goal {
        #[command(subcommand)]
        action: GoalAction,
    },

    /// Channels and stores available as filters
    Filters,

    /// Service and dataset health
    Health,

    /// Initialize a new SalesLens configuration
    Init {
        /// Output path for the configuration file
        #[arg(short = 'o', long = "output", default_value = "saleslens.toml")]
        output: PathBuf,

        /// Overwrite existing configuration file
        #[arg(short = 'f', long = "force", action = ArgAction::SetTrue)]
        force: bool,

        /// Generate minimal configuration (fewer comments)
        #[arg(long = "minimal", action = ArgAction::SetTrue)]
        minimal: bool,
    },
}

#[derive(Subcommand, Debug)]
enum GoalAction {
    /// Print the current goal
    Get,

    /// Replace the goal
    Set {
        /// New average ticket target
        value: f64,
    },
}

impl Cli {
    /// Apply CLI argument overrides to the configuration
    fn apply_to_config(&self, config: &mut Config) -> std::result::Result<(), String> {
        if let Some(ref level) = self.loglevel {
            config.logging.level = level.clone();
        }
        if let Some(ref format) = self.log_format {
            config.logging.format = match format.to_ascii_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                other => return Err(format!("Unknown log format '{}'", other)),
            };
        }
        if let Some(ref dataset) = self.dataset {
            config.dataset.path = dataset.clone();
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile(PathBuf),
    Defaults,
}

impl ConfigSource {
    fn label(&self) -> String {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::DefaultFile(path) => {
                path.display().to_string()
            }
            ConfigSource::Defaults => "built-in defaults".to_string(),
        }
    }
}

fn load_config(cli: &Cli) -> Result<(Config, ConfigSource)> {
    if let Some(path) = &cli.config {
        if !path.exists() {
            return Err(LensError::Config(format!(
                "Configuration file '{}' not found",
                path.display()
            )));
        }
        let config = Config::from_file(path)?;
        return Ok((config, ConfigSource::Explicit(path.clone())));
    }

    let default_path = PathBuf::from("saleslens.toml");
    if default_path.exists() {
        let config = Config::from_file(&default_path)?;
        return Ok((config, ConfigSource::DefaultFile(default_path)));
    }

    Ok((Config::default(), ConfigSource::Defaults))
}

fn init_logging(config: &Config) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    // Reports go to stdout; keep logs on stderr so output stays parseable
    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn generate_config_toml(minimal: bool) -> String {
    if minimal {
        r#"# SalesLens Configuration
# Generated by `saleslens init`

[logging]
level = "info"
format = "pretty"

[analytics]
default_window_days = 30
default_top_limit = 10
default_min_purchases = 3
default_inactive_days = 30

[dataset]
path = "./data/sales.json"
"#
        .to_string()
    } else {
        r##"# SalesLens Configuration
# Generated by `saleslens init`
#
# Every key is optional; omitted keys fall back to the values shown here.
# Command-line flags and SALESLENS_* environment variables override this file.

# ============================================================================
# Logging
# ============================================================================
[logging]
# Log level: trace, debug, info, warn, error.
# RUST_LOG takes precedence when set.
level = "info"

# Log format: "pretty" for humans, "json" for log collectors.
format = "pretty"

# ============================================================================
# Report defaults
# ============================================================================
[analytics]
# Reports without --start/--end cover the last N days up to today.
default_window_days = 30

# Products returned by top-products when --limit is omitted (1-100).
default_top_limit = 10

# Churn risk: minimum completed purchases for a repeat customer.
default_min_purchases = 3

# Churn risk: days since the last purchase before a customer is at risk.
default_inactive_days = 30

# ============================================================================
# Dataset
# ============================================================================
[dataset]
# JSON file with channels, stores, products, customers, sales and goals.
path = "./data/sales.json"
"##
        .to_string()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Init {
        output,
        force,
        minimal,
    } = &cli.command
    {
        return cmd_init(output, *force, *minimal);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_validation() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn cmd_init(output: &Path, force: bool, minimal: bool) -> ExitCode {
    if output.exists() && !force {
        eprintln!(
            "Error: Configuration file '{}' already exists",
            output.display()
        );
        eprintln!("Use --force to overwrite the existing configuration.");
        return ExitCode::FAILURE;
    }

    let config_content = generate_config_toml(minimal);

    match fs::File::create(output) {
        Ok(mut file) => {
            if let Err(e) = file.write_all(config_content.as_bytes()) {
                eprintln!("Error: writing {}: {}", output.display(), e);
                return ExitCode::FAILURE;
            }
        }
        Err(e) => {
            eprintln!("Error: creating {}: {}", output.display(), e);
            return ExitCode::FAILURE;
        }
    }

    println!("Created configuration file: {}", output.display());
    println!();
    println!("To run a report:");
    println!("  saleslens --config {} overview", output.display());

    ExitCode::SUCCESS
}

fn run(cli: &Cli) -> Result<()> {
    let (mut config, source) = load_config(cli)?;
    cli.apply_to_config(&mut config).map_err(LensError::Config)?;
    config.validate()?;

    init_logging(&config);
    debug!(source = %source.label(), "configuration loaded");

    let executor = Arc::new(MemoryExecutor::from_file(&config.dataset.path)?);
    info!(dataset = %config.dataset.path.display(), "dataset loaded");

    let clock = Arc::new(SystemClock);
    let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
    let service = ReportService::new(executor.clone(), executor.clone(), cache, clock)
        .with_defaults(config.analytics.clone());

    let defaults = service.defaults().clone();
    match &cli.command {
        Commands::Overview { window } => {
            print_json(&service.overview(window.resolve(&service)?)?, cli.compact)
        }
        Commands::TopProducts {
            window,
            limit,
            filters,
        } => print_json(
            &service.top_products(
                window.resolve(&service)?,
                limit.unwrap_or(defaults.default_top_limit),
                filters.to_filter_set()?,
            )?,
            cli.compact,
        ),
        Commands::SalesBreakdown { window, dimension } => print_json(
            &service.sales_breakdown(window.resolve(&service)?, *dimension)?,
            cli.compact,
        ),
        Commands::DeliveryPerformance {
            window,
            dimension,
            filters,
        } => print_json(
            &service.delivery_performance(
                window.resolve(&service)?,
                *dimension,
                filters.to_filter_set()?,
            )?,
            cli.compact,
        ),
        Commands::TicketTrend { window } => {
            print_json(&service.ticket_trend(window.resolve(&service)?)?, cli.compact)
        }
        Commands::TicketComposition { window } => print_json(
            &service.ticket_composition(window.resolve(&service)?)?,
            cli.compact,
        ),
        Commands::ChurnRisk {
            min_purchases,
            inactive_days,
        } => print_json(
            &service.churn_risk(
                min_purchases.unwrap_or(defaults.default_min_purchases),
                inactive_days.unwrap_or(defaults.default_inactive_days),
            )?,
            cli.compact,
        ),
        Commands::MonthlySummary => print_json(&service.monthly_summary()?, cli.compact),
        Commands::Goal { action } => match action {
            GoalAction::Get => print_json(&service.average_ticket_goal()?, cli.compact),
            GoalAction::Set { value } => {
                let goal = service.update_average_ticket_goal(*value)?;
                // Goals live in the dataset file; persist the committed value
                executor.snapshot().to_file(&config.dataset.path)?;
                print_json(&goal, cli.compact)
            }
        },
        Commands::Filters => print_json(&service.filter_options()?, cli.compact),
        Commands::Health => print_json(&service.health(), cli.compact),
        // Handled before configuration is loaded
        Commands::Init { .. } => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", text);
    Ok(())
}
