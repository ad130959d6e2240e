//! Connection string parsing.
//!
//! Format: `user:token@account/database/schema/warehouse[?key=value&...]`
//!
//! Recognised options: `role`, `timeout` (statement timeout, seconds),
//! `token_type` (value of `X-Snowflake-Authorization-Token-Type`) and
//! `endpoint` (base URL, defaults to `https://<account>.snowflakecomputing.com`).

use std::fmt;

use snowprom_core::error::{Result, SnowpromError};

pub const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TOKEN_TYPE: &str = "PROGRAMMATIC_ACCESS_TOKEN";

#[derive(Clone, PartialEq, Eq)]
pub struct Dsn {
    pub user: String,
    pub token: String,
    pub account: String,
    pub database: String,
    pub schema: String,
    pub warehouse: String,
    pub role: Option<String>,
    pub timeout_secs: u64,
    pub token_type: String,
    pub endpoint: String,
}

// Keep the token out of logs.
impl fmt::Debug for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dsn")
            .field("user", &self.user)
            .field("token", &"***")
            .field("account", &self.account)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("warehouse", &self.warehouse)
            .field("role", &self.role)
            .field("timeout_secs", &self.timeout_secs)
            .field("token_type", &self.token_type)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

fn bad(msg: impl Into<String>) -> SnowpromError {
    SnowpromError::Connection(format!("malformed dsn: {}", msg.into()))
}

impl Dsn {
    pub fn parse(s: &str) -> Result<Self> {
        let (main, query) = match s.split_once('?') {
            Some((m, q)) => (m, Some(q)),
            None => (s, None),
        };

        // The token may contain '@' or '/', the account never does.
        let (userinfo, location) = main.rsplit_once('@').ok_or_else(|| bad("missing '@'"))?;
        let (user, token) = userinfo
            .split_once(':')
            .ok_or_else(|| bad("expected user:token before '@'"))?;
        if user.is_empty() {
            return Err(bad("empty user"));
        }
        if token.is_empty() {
            return Err(bad("empty token"));
        }

        let parts: Vec<&str> = location.split('/').collect();
        let [account, database, schema, warehouse] = parts.as_slice() else {
            return Err(bad("expected account/database/schema/warehouse"));
        };
        for (what, v) in [
            ("account", account),
            ("database", database),
            ("schema", schema),
            ("warehouse", warehouse),
        ] {
            if v.is_empty() {
                return Err(bad(format!("empty {what}")));
            }
        }
        if !account
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(bad(format!("invalid account identifier: {account}")));
        }

        let mut dsn = Dsn {
            user: user.to_string(),
            token: token.to_string(),
            account: account.to_string(),
            database: database.to_string(),
            schema: schema.to_string(),
            warehouse: warehouse.to_string(),
            role: None,
            timeout_secs: DEFAULT_STATEMENT_TIMEOUT_SECS,
            token_type: DEFAULT_TOKEN_TYPE.to_string(),
            endpoint: format!("https://{account}.snowflakecomputing.com"),
        };

        for pair in query.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
            let (k, v) = pair
                .split_once('=')
                .ok_or_else(|| bad(format!("option without value: {pair}")))?;
            match k {
                "role" => dsn.role = Some(v.to_string()),
                "timeout" => {
                    dsn.timeout_secs = v
                        .parse()
                        .map_err(|_| bad(format!("timeout must be seconds, got {v:?}")))?;
                }
                "token_type" => dsn.token_type = v.to_ascii_uppercase(),
                "endpoint" => {
                    if !(v.starts_with("http://") || v.starts_with("https://")) {
                        return Err(bad(format!("endpoint must be an http(s) url: {v}")));
                    }
                    dsn.endpoint = v.trim_end_matches('/').to_string();
                }
                other => return Err(bad(format!("unknown option: {other}"))),
            }
        }

        Ok(dsn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal() {
        let d = Dsn::parse("alice:s3cr3t@xy12345/ANALYTICS/PUBLIC/COMPUTE_WH").unwrap();
        assert_eq!(d.user, "alice");
        assert_eq!(d.token, "s3cr3t");
        assert_eq!(d.account, "xy12345");
        assert_eq!(d.database, "ANALYTICS");
        assert_eq!(d.schema, "PUBLIC");
        assert_eq!(d.warehouse, "COMPUTE_WH");
        assert_eq!(d.role, None);
        assert_eq!(d.timeout_secs, DEFAULT_STATEMENT_TIMEOUT_SECS);
        assert_eq!(d.endpoint, "https://xy12345.snowflakecomputing.com");
    }

    #[test]
    fn parses_options_and_tricky_token() {
        let d = Dsn::parse(
            "bob:a@b/c@acme-prod/DB/SC/WH?role=MONITOR&timeout=30&token_type=oauth&endpoint=http://127.0.0.1:9000/",
        )
        .unwrap();
        assert_eq!(d.token, "a@b/c");
        assert_eq!(d.account, "acme-prod");
        assert_eq!(d.role.as_deref(), Some("MONITOR"));
        assert_eq!(d.timeout_secs, 30);
        assert_eq!(d.token_type, "OAUTH");
        assert_eq!(d.endpoint, "http://127.0.0.1:9000");
    }

    #[test]
    fn rejects_malformed() {
        for s in [
            "",
            "no-at-sign/DB/SC/WH",
            "user@acct/DB/SC/WH",
            ":tok@acct/DB/SC/WH",
            "u:@acct/DB/SC/WH",
            "u:t@acct/DB/SC",
            "u:t@acct/DB//WH",
            "u:t@acct/DB/SC/WH/extra",
            "u:t@ac ct/DB/SC/WH",
            "u:t@acct/DB/SC/WH?timeout=soon",
            "u:t@acct/DB/SC/WH?bogus=1",
            "u:t@acct/DB/SC/WH?endpoint=ftp://x",
        ] {
            let err = Dsn::parse(s).expect_err(s);
            assert_eq!(err.class().as_str(), "connection", "{s}");
        }
    }

    #[test]
    fn debug_hides_token() {
        let d = Dsn::parse("alice:hunter2@acct/DB/SC/WH").unwrap();
        assert!(!format!("{d:?}").contains("hunter2"));
    }
}
