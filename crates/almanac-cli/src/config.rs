//! Configuration loader: defaults, then a TOML file, then `.env` and the
//! environment (highest priority).

use std::path::{Path, PathBuf};

use almanac_engine::AlmanacConfig;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

const DEFAULT_CONFIG_FILE: &str = "almanac.toml";

fn parse_f64(raw: &str, env_name: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("{env_name} must be a number"))
}

fn parse_date(raw: &str, env_name: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("{env_name} must be a YYYY-MM-DD date"))
}

fn read_toml(path: &Path) -> Result<AlmanacConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Apply `ALMANAC_*` overrides from `lookup`.
fn apply_env(config: &mut AlmanacConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(raw) = lookup("ALMANAC_LATITUDE") {
        config.latitude = parse_f64(&raw, "ALMANAC_LATITUDE")?;
    }
    if let Some(raw) = lookup("ALMANAC_LONGITUDE") {
        config.longitude = parse_f64(&raw, "ALMANAC_LONGITUDE")?;
    }
    if let Some(raw) = lookup("ALMANAC_START_DATE") {
        config.start_date = parse_date(&raw, "ALMANAC_START_DATE")?;
    }
    if let Some(raw) = lookup("ALMANAC_DATA_PATH") {
        config.data_path = PathBuf::from(raw.trim());
    }
    if let Some(raw) = lookup("ALMANAC_ARCHIVE_URL") {
        config.archive_url = raw.trim().to_string();
    }
    if let Some(raw) = lookup("ALMANAC_FORECAST_URL") {
        config.forecast_url = raw.trim().to_string();
    }
    Ok(())
}

/// Load configuration. An explicit `path` must exist; otherwise
/// `almanac.toml` in the working directory is used when present.
pub fn load_config(path: Option<&Path>) -> Result<AlmanacConfig> {
    let mut config = match path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file {} does not exist", path.display());
            }
            read_toml(path)?
        }
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            read_toml(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => AlmanacConfig::default(),
    };

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }
    apply_env(&mut config, |name| std::env::var(name).ok())?;

    config.validate()?;
    Ok(config)
}
