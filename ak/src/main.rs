//! ak - asynckit workload driver
//!
//! CLI entry point for running the orchestration primitives against
//! seeded, simulated jobs.

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use asynckit::cli::{Cli, Command, OutputFormat};
use asynckit::config::Config;
use asynckit::sim::{self, Report};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    // Reports go to stdout, so logs stay on stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    debug!(?level, "Logging initialized");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref());

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    debug!(command = ?cli.command, "main: dispatching command");
    let report = match cli.command {
        Command::Parallel {
            items,
            limit,
            max_delay_ms,
            fail_rate,
        } => {
            let limit = limit.unwrap_or(config.parallel.limit);
            info!(items, limit, "Running parallel workload");
            let jobs = sim::plan_jobs(&mut rng, items, max_delay_ms, fail_rate);
            sim::simulate_parallel(limit, jobs).await
        }
        Command::Retry {
            times,
            delay_ms,
            fail_first,
            bail_on,
        } => {
            let mut retry_config = config.retry.clone();
            if let Some(times) = times {
                retry_config.times = times;
            }
            if delay_ms.is_some() {
                retry_config.delay_ms = delay_ms;
            }
            info!(times = retry_config.times, fail_first, ?bail_on, "Running retry workload");
            sim::simulate_retry(&retry_config.to_options(), fail_first, bail_on).await
        }
        Command::All {
            items,
            max_delay_ms,
            fail_rate,
        } => {
            info!(items, "Running all workload");
            let jobs = sim::plan_jobs(&mut rng, items, max_delay_ms, fail_rate);
            sim::simulate_all(jobs).await
        }
    };

    print_report(&report, cli.format)?;

    if !report.ok {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &Report, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text => {
            for entry in &report.entries {
                match (&entry.value, &entry.error) {
                    (_, Some(err)) => println!("{} #{} {}", "✗".red(), entry.index, err),
                    (Some(value), None) => println!("{} #{} {}", "✓".green(), entry.index, value),
                    (None, None) => println!("{} #{}", "✓".green(), entry.index),
                }
            }

            let status = if report.ok { "ok".green() } else { "failed".red() };
            println!(
                "{} {}: {} succeeded, {} failed in {}ms",
                report.command.as_str().bold(),
                status,
                report.succeeded,
                report.failed,
                report.elapsed_ms
            );
            if let Some(err) = &report.error {
                println!("  {} {}", "error:".red(), err);
            }
        }
    }
    Ok(())
}
