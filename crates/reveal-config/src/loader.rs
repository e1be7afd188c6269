// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones winning:
//! 1. TOML file (base values, missing keys fall back to defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, RevealConfig, CONFIG_FILE_NAME};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Find the reveal configuration file
///
/// Search order:
/// 1. `REVEAL_CONFIG_PATH` environment variable
/// 2. Current working directory: `./reveal_configuration.toml`
/// 3. Up to five parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("REVEAL_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by REVEAL_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        search_paths.extend(
            cwd.ancestors()
                .skip(1)
                .take(5)
                .map(|dir| dir.join(CONFIG_FILE_NAME)),
        );
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "reveal configuration file '{}' not found in any of these locations:\n{}\n\nSet REVEAL_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML.
/// Validation is left to [`validate_config`](crate::validate_config).
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<RevealConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: RevealConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `REVEAL_COOLDOWN_MS` -> `queue.cooldown_ms`
/// - `REVEAL_IDLE_TIMEOUT_MS` -> `idle.idle_timeout_ms`
/// - `REVEAL_ATTRACT_MAX_MS` -> `idle.attract_max_ms`
/// - `REVEAL_POLL_INTERVAL_MS` -> `polling.interval_ms`
/// - `REVEAL_ROUTE_ANIMATION` -> `route.enabled`
/// - `REVEAL_UNIVERSE_PATH` -> `data.universe_path`
/// - `REVEAL_LOG_LEVEL` -> `logging.level`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut RevealConfig) {
    if let Some(ms) = env_u64("REVEAL_COOLDOWN_MS") {
        config.queue.cooldown_ms = ms;
    }
    if let Some(ms) = env_u64("REVEAL_IDLE_TIMEOUT_MS") {
        config.idle.idle_timeout_ms = ms;
    }
    if let Some(ms) = env_u64("REVEAL_ATTRACT_MAX_MS") {
        config.idle.attract_max_ms = ms;
    }
    if let Some(ms) = env_u64("REVEAL_POLL_INTERVAL_MS") {
        config.polling.interval_ms = ms;
    }
    if let Ok(value) = env::var("REVEAL_ROUTE_ANIMATION") {
        config.route.enabled = parse_flag(&value);
    }
    if let Ok(value) = env::var("REVEAL_UNIVERSE_PATH") {
        config.data.universe_path = PathBuf::from(value);
    }
    if let Ok(value) = env::var("REVEAL_LOG_LEVEL") {
        config.logging.level = value;
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"cooldown_ms": "500", "route_animation": "true"}`)
pub fn apply_cli_overrides(config: &mut RevealConfig, cli_args: &HashMap<String, String>) {
    let get_u64 = |key: &str| cli_args.get(key).and_then(|v| v.trim().parse::<u64>().ok());

    if let Some(ms) = get_u64("cooldown_ms") {
        config.queue.cooldown_ms = ms;
    }
    if let Some(seed) = get_u64("seed") {
        config.queue.seed = Some(seed);
        config.polling.mock_seed = Some(seed);
    }
    if let Some(ms) = get_u64("idle_timeout_ms") {
        config.idle.idle_timeout_ms = ms;
    }
    if let Some(ms) = get_u64("attract_max_ms") {
        config.idle.attract_max_ms = ms;
    }
    if let Some(ms) = get_u64("poll_interval_ms") {
        config.polling.interval_ms = ms;
    }
    if let Some(feed) = cli_args.get("feed").and_then(|v| v.parse().ok()) {
        config.polling.feed = feed;
    }
    if let Some(value) = cli_args.get("route_animation") {
        config.route.enabled = parse_flag(value);
    }
    if let Some(value) = cli_args.get("universe_path") {
        config.data.universe_path = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("views_path") {
        config.views.snapshot_path = Some(PathBuf::from(value));
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("file_logging") {
        config.logging.file_logging = parse_flag(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeedMode;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const OVERRIDE_VARS: [&str; 7] = [
        "REVEAL_COOLDOWN_MS",
        "REVEAL_IDLE_TIMEOUT_MS",
        "REVEAL_ATTRACT_MAX_MS",
        "REVEAL_POLL_INTERVAL_MS",
        "REVEAL_ROUTE_ANIMATION",
        "REVEAL_UNIVERSE_PATH",
        "REVEAL_LOG_LEVEL",
    ];

    fn clear_overrides() {
        for var in OVERRIDE_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("REVEAL_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("REVEAL_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var("REVEAL_CONFIG_PATH", "/nonexistent/reveal.toml");
        let result = find_config_file();
        env::remove_var("REVEAL_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_overrides();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[queue]").unwrap();
        writeln!(file, "cooldown_ms = 250").unwrap();
        writeln!(file, "[data]").unwrap();
        writeln!(file, "universe_path = \"campaign.json\"").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.queue.cooldown_ms, 250);
        assert_eq!(config.data.universe_path, PathBuf::from("campaign.json"));
        assert_eq!(config.idle.idle_timeout_ms, 50_000);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[queue\ncooldown_ms = ").unwrap();

        assert!(matches!(
            load_config(Some(&config_path), None),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_overrides();
        let mut config = RevealConfig::default();

        env::set_var("REVEAL_COOLDOWN_MS", "900");
        env::set_var("REVEAL_ROUTE_ANIMATION", "yes");
        env::set_var("REVEAL_POLL_INTERVAL_MS", "not-a-number");
        env::set_var("REVEAL_LOG_LEVEL", "debug");

        apply_environment_overrides(&mut config);
        clear_overrides();

        assert_eq!(config.queue.cooldown_ms, 900);
        assert!(config.route.enabled);
        assert_eq!(config.polling.interval_ms, 60_000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = RevealConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("attract_max_ms".to_string(), "5000".to_string());
        cli_args.insert("feed".to_string(), "snapshot".to_string());
        cli_args.insert("seed".to_string(), "42".to_string());

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.idle.attract_max_ms, 5000);
        assert_eq!(config.polling.feed, FeedMode::Snapshot);
        assert_eq!(config.queue.seed, Some(42));
        assert_eq!(config.polling.mock_seed, Some(42));
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_overrides();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[idle]").unwrap();
        writeln!(file, "idle_timeout_ms = 1000").unwrap();
        writeln!(file, "attract_max_ms = 2000").unwrap();

        env::set_var("REVEAL_IDLE_TIMEOUT_MS", "3000");
        env::set_var("REVEAL_ATTRACT_MAX_MS", "4000");

        let mut cli_args = HashMap::new();
        cli_args.insert("idle_timeout_ms".to_string(), "5000".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();
        clear_overrides();

        // CLI wins for the idle timeout, env wins for attract max (no CLI override)
        assert_eq!(config.idle.idle_timeout_ms, 5000);
        assert_eq!(config.idle.attract_max_ms, 4000);
    }
}
