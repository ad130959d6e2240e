use std::net::SocketAddr;

use serde::Deserialize;
use snowprom_core::error::{Result, SnowpromError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub exporter: ExporterSection,

    #[serde(default)]
    pub snowflake: SnowflakeSection,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            exporter: ExporterSection::default(),
            snowflake: SnowflakeSection::default(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SnowpromError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.exporter.validate()?;
        self.snowflake.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Upper bound for the scrape deadline taken from
    /// `X-Prometheus-Scrape-Timeout-Seconds`; also used when the header is absent.
    #[serde(default = "default_max_scrape_timeout_ms")]
    pub max_scrape_timeout_ms: u64,

    /// Subtracted from the requested scrape timeout so that partial results
    /// are written before the scraper gives up.
    #[serde(default = "default_scrape_timeout_offset_ms")]
    pub scrape_timeout_offset_ms: u64,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_scrape_timeout_ms: default_max_scrape_timeout_ms(),
            scrape_timeout_offset_ms: default_scrape_timeout_offset_ms(),
        }
    }
}

impl ExporterSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !(1000..=600000).contains(&self.max_scrape_timeout_ms) {
            return Err(SnowpromError::Config(
                "exporter.max_scrape_timeout_ms must be between 1000 and 600000".into(),
            ));
        }
        if self.scrape_timeout_offset_ms >= self.max_scrape_timeout_ms {
            return Err(SnowpromError::Config(
                "exporter.scrape_timeout_offset_ms must be below exporter.max_scrape_timeout_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            SnowpromError::Config(format!("exporter.listen must be a valid SocketAddr: {e}"))
        })
    }

    /// Replace the port, keeping the bind address.
    pub fn set_port(&mut self, port: &str) -> Result<()> {
        let port: u16 = port
            .parse()
            .map_err(|_| SnowpromError::Config(format!("invalid port: {port:?}")))?;
        let mut addr = self.listen_addr()?;
        addr.set_port(port);
        self.listen = addr.to_string();
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:9090".into()
}
fn default_max_scrape_timeout_ms() -> u64 {
    30000
}
fn default_scrape_timeout_offset_ms() -> u64 {
    500
}

/// Connection parameters. Either a full `dsn`, or the individual parts.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnowflakeSection {
    #[serde(default)]
    pub dsn: Option<String>,

    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub role: Option<String>,

    /// Statement timeout passed to the SQL API.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl SnowflakeSection {
    pub fn validate(&self) -> Result<()> {
        if let Some(t) = self.timeout_secs {
            if !(1..=604800).contains(&t) {
                return Err(SnowpromError::Config(
                    "snowflake.timeout_secs must be between 1 and 604800".into(),
                ));
            }
        }
        Ok(())
    }

    /// Connection string for the collector. Missing parts are a config error,
    /// as are characters the dsn grammar uses as separators.
    pub fn dsn(&self) -> Result<String> {
        if let Some(dsn) = &self.dsn {
            return Ok(dsn.clone());
        }

        const PATH: &[char] = &['/', '?', '@'];

        let mut dsn = format!(
            "{}:{}@{}/{}/{}/{}",
            part(&self.user, "user", &[':', '?'])?,
            part(&self.token, "token", &['?'])?,
            part(&self.account, "account", PATH)?,
            part(&self.database, "database", PATH)?,
            part(&self.schema, "schema", PATH)?,
            part(&self.warehouse, "warehouse", PATH)?,
        );

        let mut opts = Vec::new();
        if let Some(r) = option(&self.role, "role")? {
            opts.push(format!("role={r}"));
        }
        if let Some(t) = self.timeout_secs {
            opts.push(format!("timeout={t}"));
        }
        if let Some(t) = option(&self.token_type, "token_type")? {
            opts.push(format!("token_type={t}"));
        }
        if let Some(e) = option(&self.endpoint, "endpoint")? {
            opts.push(format!("endpoint={e}"));
        }
        if !opts.is_empty() {
            dsn.push('?');
            dsn.push_str(&opts.join("&"));
        }
        Ok(dsn)
    }
}

fn part<'a>(v: &'a Option<String>, what: &str, reserved: &[char]) -> Result<&'a str> {
    let v = v
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SnowpromError::Config(format!("snowflake.{what} is required")))?;
    unreserved(v, what, reserved)
}

fn option<'a>(v: &'a Option<String>, what: &str) -> Result<Option<&'a str>> {
    v.as_deref()
        .filter(|s| !s.is_empty())
        .map(|v| unreserved(v, what, &['&', '?']))
        .transpose()
}

fn unreserved<'a>(v: &'a str, what: &str, reserved: &[char]) -> Result<&'a str> {
    match v.chars().find(|c| reserved.contains(c)) {
        Some(c) => Err(SnowpromError::Config(format!(
            "snowflake.{what} must not contain {c:?}"
        ))),
        None => Ok(v),
    }
}
