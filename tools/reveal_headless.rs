// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Headless campaign runner.
//!
//! Plays a campaign against the simulated renderer, which logs every render call
//! and sleeps for representative durations. Exits on campaign completion or Ctrl-C.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use reveal::config::load_config;
use reveal::headless::{HeadlessRunner, RunOutcome};
use reveal::observability::{debug_flags_help, init_logging, parse_debug_flags};
use reveal::orchestrator::SimulatedRenderer;
use reveal::settings::logging_settings;

/// Reveal headless runner - plays a campaign without a map
#[derive(Parser, Debug)]
#[command(name = "reveal_headless", version, author, long_about = None, after_help = debug_flags_help())]
struct Args {
    /// Configuration file (default: search for reveal_configuration.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override one configuration key, e.g. cooldown_ms=500 (repeatable).
    /// Keys: cooldown_ms, seed, idle_timeout_ms, attract_max_ms, poll_interval_ms,
    /// feed, route_animation, universe_path, views_path, log_level, file_logging
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    overrides: Vec<(String, String)>,

    /// Multiplier for simulated render durations (0 = instant, capped at 1000)
    #[arg(long, default_value_t = 1.0)]
    time_scale: f64,
}

fn parse_override(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in `{raw}`"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Everything except `--debug-*`, which [`parse_debug_flags`] reads on its own
fn cli_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .filter(|arg| !arg.starts_with("--debug-"))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_from(cli_args(std::env::args()));
    let overrides: HashMap<String, String> = args.overrides.into_iter().collect();

    let config = load_config(args.config.as_deref(), Some(&overrides))
        .context("Failed to load reveal configuration")?;
    let _logging = init_logging(&parse_debug_flags(), &logging_settings(&config))?;

    let renderer = Arc::new(SimulatedRenderer::new(args.time_scale));
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "reveal", "Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let outcome = HeadlessRunner::new(config, renderer.clone(), renderer.clone())
        .run(shutdown)
        .await?;

    tracing::info!(target: "reveal", "{} renderer call(s) issued", renderer.call_count());
    match outcome {
        RunOutcome::Completed(_) => Ok(()),
        RunOutcome::Interrupted(status) => {
            tracing::info!(
                target: "reveal",
                "Interrupted with {} of {} record(s) painted",
                status.painted,
                status.universe_size
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(cli_args(args.iter().map(|a| a.to_string())))
    }

    #[test]
    fn test_command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_debug_flags_pass_through() {
        let args = parse(&[
            "reveal_headless",
            "--debug-reveal-orchestrator",
            "--config",
            "campaign.toml",
            "--debug-all",
            "--set",
            "cooldown_ms=500",
            "--set",
            " feed = snapshot ",
            "--time-scale",
            "0.5",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("campaign.toml")));
        assert_eq!(
            args.overrides,
            vec![
                ("cooldown_ms".to_string(), "500".to_string()),
                ("feed".to_string(), "snapshot".to_string()),
            ]
        );
        assert_eq!(args.time_scale, 0.5);
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["reveal_headless"]).unwrap();
        assert_eq!(args.config, None);
        assert!(args.overrides.is_empty());
        assert_eq!(args.time_scale, 1.0);
    }

    #[test]
    fn test_bad_arguments_are_rejected() {
        assert!(parse(&["reveal_headless", "--set", "cooldown_ms"]).is_err());
        assert!(parse(&["reveal_headless", "--set", "=5"]).is_err());
        assert!(parse(&["reveal_headless", "--time-scale", "fast"]).is_err());
        assert!(parse(&["reveal_headless", "--unknown"]).is_err());
    }
}
