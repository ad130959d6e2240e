#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;

use snowprom_exporter::config;
use snowprom_exporter::warehouse::Dsn;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |k: &str| map.get(k).cloned()
}

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
exporter:
  listen: "0.0.0.0:9090"
snowflake:
  acount: "xy12345" # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.class().as_str(), "config");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.exporter.listen, "0.0.0.0:9090");
    assert_eq!(cfg.exporter.max_scrape_timeout_ms, 30000);
    assert_eq!(cfg.exporter.scrape_timeout_offset_ms, 500);
}

#[test]
fn rejects_bad_values() {
    for bad in [
        "version: 2\n",
        "version: 1\nexporter:\n  listen: \"nope\"\n",
        "version: 1\nexporter:\n  max_scrape_timeout_ms: 10\n",
        "version: 1\nsnowflake:\n  timeout_secs: 0\n",
        "version: 1\nexporter:\n  max_scrape_timeout_ms: 1000\n  scrape_timeout_offset_ms: 1000\n",
    ] {
        let err = config::load_from_str(bad).expect_err(bad);
        assert_eq!(err.class().as_str(), "config", "{bad}");
    }
}

#[test]
fn dsn_from_parts() {
    let cfg = config::load_from_str(
        r#"
version: 1
snowflake:
  account: "xy12345"
  user: "monitor"
  token: "tok"
  database: "ANALYTICS"
  schema: "PUBLIC"
  warehouse: "COMPUTE_WH"
  role: "MONITOR_ROLE"
  timeout_secs: 45
"#,
    )
    .expect("must parse");
    assert_eq!(
        cfg.snowflake.dsn().unwrap(),
        "monitor:tok@xy12345/ANALYTICS/PUBLIC/COMPUTE_WH?role=MONITOR_ROLE&timeout=45"
    );
}

#[test]
fn dsn_from_parts_keeps_or_rejects_separators() {
    let parts = |token: &str, role: &str| {
        format!(
            "version: 1\nsnowflake:\n  account: acct\n  user: \"me@corp.com\"\n  token: \"{token}\"\n  database: DB\n  schema: SC\n  warehouse: WH\n  role: \"{role}\"\n"
        )
    };

    // '=', '&', '@' and '/' are safe in the token; the dsn parser still recovers it.
    let cfg = config::load_from_str(&parts("k=v&x@y/z==", "MONITOR")).unwrap();
    let dsn = Dsn::parse(&cfg.snowflake.dsn().unwrap()).unwrap();
    assert_eq!(dsn.user, "me@corp.com");
    assert_eq!(dsn.token, "k=v&x@y/z==");
    assert_eq!(dsn.account, "acct");
    assert_eq!(dsn.role.as_deref(), Some("MONITOR"));

    for (token, role, field) in [
        ("a?b", "MONITOR", "snowflake.token"),
        ("tok", "A&B", "snowflake.role"),
        ("tok", "A?B", "snowflake.role"),
    ] {
        let cfg = config::load_from_str(&parts(token, role)).unwrap();
        let err = cfg.snowflake.dsn().expect_err(field);
        assert_eq!(err.class().as_str(), "config");
        assert!(err.to_string().contains(field), "{err}");
    }
}

#[test]
fn missing_connection_parts_fail() {
    let cfg = config::load_from_str("version: 1\nsnowflake:\n  account: a\n").unwrap();
    let err = cfg.snowflake.dsn().expect_err("user missing");
    assert_eq!(err.class().as_str(), "config");
    assert!(err.to_string().contains("snowflake.user"));
}

#[test]
fn env_overrides_file_and_defaults() {
    let cfg = config::load(
        None,
        env(&[
            ("SNOWFLAKE_USERNAME", "u"),
            ("SNOWFLAKE_PASSWORD", "p"),
            ("SNOWFLAKE_ACCOUNT", "acct"),
            ("SNOWFLAKE_DATABASE", "DB"),
            ("SNOWFLAKE_SCHEMA", "SC"),
            ("SNOWFLAKE_WAREHOUSE", "WH"),
            ("EXPORTER_PORT", "9187"),
        ]),
    )
    .expect("env config");
    assert_eq!(cfg.exporter.listen, "0.0.0.0:9187");
    assert_eq!(cfg.snowflake.dsn().unwrap(), "u:p@acct/DB/SC/WH");

    let cfg = config::load(None, env(&[("SNOWFLAKE_DSN", "a:b@c/d/e/f"), ("EXPORTER_PORT", "")]))
        .expect("dsn env");
    assert_eq!(cfg.exporter.listen, "0.0.0.0:9090");
    assert_eq!(cfg.snowflake.dsn().unwrap(), "a:b@c/d/e/f");
}

#[test]
fn bad_port_env_fails() {
    let err = config::load(None, env(&[("EXPORTER_PORT", "http")])).expect_err("bad port");
    assert_eq!(err.class().as_str(), "config");
}
