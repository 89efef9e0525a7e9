//! clustersim: run a simulated compute cluster and report its metrics.
//!
//! # Usage
//!
//! ```text
//! clustersim --policy priority
//! clustersim --config cluster.json --policy sjf --seed 42 --format json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{error, info};

use clustersim_core::{ConfigError, Policy, SimConfig};
use clustersim_orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorError};

mod logging;
mod output;

#[derive(Parser)]
#[command(
    name = "clustersim",
    about = "ClusterSim: simulated compute cluster orchestrator",
    version
)]
struct Cli {
    /// JSON config with `servers` and `requests`. Uses the built-in
    /// three-server scenario when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Request scheduling policy: rr, sjf or priority.
    #[arg(short, long, default_value = "rr")]
    policy: Policy,

    /// Seed for arrival-time synthesis.
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Upper bound in seconds of each random inter-arrival gap.
    #[arg(long, default_value = "1.2")]
    arrival_jitter: f64,

    /// Reserved; accepted and reported but does not affect scheduling.
    #[arg(long, default_value = "0.35")]
    overload_redirect_threshold: f64,

    /// Loop tick in milliseconds.
    #[arg(long, default_value = "20")]
    tick_ms: u64,

    /// Report format.
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    /// Disable coloured log output.
    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.no_color);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "simulation failed");
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => SimConfig::from_file(path)?,
        None => {
            info!("no config given, using the built-in scenario");
            SimConfig::default_scenario()
        }
    };

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let scenario = config.build(&mut rng, cli.arrival_jitter)?;

    let orch_config = OrchestratorConfig {
        policy: cli.policy,
        tick: Duration::from_millis(cli.tick_ms.max(1)),
        overload_redirect_threshold: cli.overload_redirect_threshold,
        ..OrchestratorConfig::default()
    };
    let outcome = Orchestrator::new(orch_config).run(scenario).await?;

    let summary = output::RunSummary::from_outcome(&outcome, cli.seed);
    match cli.format {
        Format::Text => print!("{}", output::format_text(&summary)),
        Format::Json => println!(
            "{}",
            output::format_json(&summary).context("failed to serialize report")?
        ),
    }

    Ok(())
}

/// 2 for invalid configuration, 1 for anything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    let is_config = err.chain().any(|cause| {
        cause.is::<ConfigError>()
            || matches!(
                cause.downcast_ref::<OrchestratorError>(),
                Some(OrchestratorError::Config(_))
            )
    });
    if is_config { 2 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_policy_and_format() {
        let cli = Cli::parse_from(["clustersim", "--policy", "sjf", "--format", "json"]);
        assert_eq!(cli.policy, Policy::Sjf);
        assert_eq!(cli.format, Format::Json);
        assert_eq!(cli.seed, 7);
        assert_eq!(cli.arrival_jitter, 1.2);
        assert!(cli.config.is_none());
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!(Cli::try_parse_from(["clustersim", "--policy", "fifo"]).is_err());
    }

    #[test]
    fn config_errors_exit_with_two() {
        let err = anyhow::Error::new(ConfigError::NoServers);
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::Error::new(OrchestratorError::Config(ConfigError::NoRequests));
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::Error::new(ConfigError::NoServers).context("loading");
        assert_eq!(exit_code(&err), 2);
    }

    #[test]
    fn other_errors_exit_with_one() {
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
    }
}
