//! Exporter config loader (strict parsing + environment overrides).
//!
//! The YAML file is optional. Environment variables win over file values:
//!
//! | Variable | Field |
//! |---|---|
//! | `SNOWFLAKE_DSN` | `snowflake.dsn` |
//! | `SNOWFLAKE_USERNAME` | `snowflake.user` |
//! | `SNOWFLAKE_PASSWORD` | `snowflake.token` |
//! | `SNOWFLAKE_ACCOUNT` | `snowflake.account` |
//! | `SNOWFLAKE_DATABASE` | `snowflake.database` |
//! | `SNOWFLAKE_SCHEMA` | `snowflake.schema` |
//! | `SNOWFLAKE_WAREHOUSE` | `snowflake.warehouse` |
//! | `SNOWFLAKE_ROLE` | `snowflake.role` |
//! | `EXPORTER_PORT` | port of `exporter.listen` (default 9090) |

pub mod schema;

use std::fs;

use snowprom_core::error::{Result, SnowpromError};

pub use schema::{ExporterConfig, ExporterSection, SnowflakeSection};

/// Env var naming the optional config file.
pub const CONFIG_PATH_ENV: &str = "SNOWPROM_CONFIG";

pub fn load_from_file(path: &str) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SnowpromError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| SnowpromError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// File (if any) + environment, validated.
pub fn load<F>(path: Option<&str>, env: F) -> Result<ExporterConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match path {
        Some(p) => load_from_file(p)?,
        None => ExporterConfig::default(),
    };
    apply_env(&mut cfg, env)?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn apply_env<F>(cfg: &mut ExporterConfig, env: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let sf = &mut cfg.snowflake;
    for (key, slot) in [
        ("SNOWFLAKE_DSN", &mut sf.dsn),
        ("SNOWFLAKE_USERNAME", &mut sf.user),
        ("SNOWFLAKE_PASSWORD", &mut sf.token),
        ("SNOWFLAKE_ACCOUNT", &mut sf.account),
        ("SNOWFLAKE_DATABASE", &mut sf.database),
        ("SNOWFLAKE_SCHEMA", &mut sf.schema),
        ("SNOWFLAKE_WAREHOUSE", &mut sf.warehouse),
        ("SNOWFLAKE_ROLE", &mut sf.role),
    ] {
        if let Some(v) = env(key).filter(|v| !v.is_empty()) {
            *slot = Some(v);
        }
    }

    if let Some(port) = env("EXPORTER_PORT").filter(|v| !v.is_empty()) {
        cfg.exporter.set_port(&port)?;
    }
    Ok(())
}
