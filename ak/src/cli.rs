//! CLI argument parsing for ak

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// ak - drive asynckit primitives against simulated workloads
#[derive(Parser, Debug)]
#[command(name = "ak")]
#[command(author, version, about = "Drive asynckit primitives against simulated workloads", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Seed for the simulated delays and failures
    #[arg(short, long, global = true)]
    pub seed: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Map simulated jobs with bounded concurrency
    Parallel {
        /// Number of jobs
        #[arg(short = 'n', long, default_value = "8")]
        items: usize,

        /// Max jobs in flight (default: from config)
        #[arg(short = 'L', long)]
        limit: Option<usize>,

        /// Upper bound of each job's random duration
        #[arg(short = 'd', long, default_value = "200")]
        max_delay_ms: u64,

        /// Probability that a job fails
        #[arg(short = 'r', long, default_value = "0.0")]
        fail_rate: f64,
    },

    /// Retry an operation that fails a fixed number of times
    Retry {
        /// Attempt budget (default: from config)
        #[arg(short, long)]
        times: Option<u32>,

        /// Delay between attempts (default: from config)
        #[arg(short = 'd', long)]
        delay_ms: Option<u64>,

        /// Number of leading attempts that fail
        #[arg(long, default_value = "0")]
        fail_first: u32,

        /// Attempt on which the operation bails
        #[arg(long)]
        bail_on: Option<u32>,
    },

    /// Join simulated jobs without a concurrency limit
    All {
        /// Number of jobs
        #[arg(short = 'n', long, default_value = "8")]
        items: usize,

        /// Upper bound of each job's random duration
        #[arg(short = 'd', long, default_value = "200")]
        max_delay_ms: u64,

        /// Probability that a job fails
        #[arg(short = 'r', long, default_value = "0.0")]
        fail_rate: f64,
    },
}

/// Output format for reports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("plain".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_parse_parallel_with_globals() {
        let cli = Cli::try_parse_from(["ak", "parallel", "-n", "5", "--limit", "2", "--seed", "7", "-f", "json"]).unwrap();
        assert_eq!(cli.seed, Some(7));
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Command::Parallel { items, limit, .. } => {
                assert_eq!(items, 5);
                assert_eq!(limit, Some(2));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_retry() {
        let cli = Cli::try_parse_from(["ak", "retry", "--fail-first", "2", "--bail-on", "4"]).unwrap();
        match cli.command {
            Command::Retry {
                times,
                fail_first,
                bail_on,
                ..
            } => {
                assert_eq!(times, None);
                assert_eq!(fail_first, 2);
                assert_eq!(bail_on, Some(4));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
