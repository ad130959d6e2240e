//! Prometheus text exposition format (version 0.0.4).
//!
//! Families are written in the order given. Each family gets a `# HELP`
//! and `# TYPE` line followed by one line per sample.

use std::fmt::Write;

use crate::metric::{MetricFamily, Sample};

/// Content type served alongside [`render`] output.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Escape help text (quotes are legal there).
fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a sample value. Finite values use the shortest round-trip form.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "+Inf".to_string() } else { "-Inf".to_string() }
    } else {
        format!("{v}")
    }
}

/// Write one family into `out`.
pub fn render_family(family: &MetricFamily, out: &mut String) {
    let name = family.desc.name();
    let _ = writeln!(out, "# HELP {} {}", name, escape_help(family.desc.help()));
    let _ = writeln!(out, "# TYPE {} {}", name, family.value_type.as_str());
    for s in &family.samples {
        render_sample(name, family.desc.label_names(), s, out);
    }
}

fn render_sample(name: &str, label_names: &[String], sample: &Sample, out: &mut String) {
    if label_names.is_empty() {
        let _ = writeln!(out, "{} {}", name, format_value(sample.value));
        return;
    }
    let label_str = label_names
        .iter()
        .zip(sample.labels.iter())
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",");
    let _ = writeln!(out, "{}{{{}}} {}", name, label_str, format_value(sample.value));
}

/// Render every family into a single exposition body.
pub fn render(families: &[MetricFamily]) -> String {
    let mut out = String::new();
    for f in families {
        render_family(f, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use super::*;
    use crate::metric::{MetricDesc, ValueType};

    #[test]
    fn value_formatting() {
        assert_eq!(format_value(10.5), "10.5");
        assert_eq!(format_value(1024000.0), "1024000");
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
    }

    #[test]
    fn escapes_label_values_and_help() {
        let desc = Arc::new(MetricDesc::new("m", "line1\nline2 \"q\"", &["l"]).unwrap());
        let mut fam = MetricFamily::new(desc, ValueType::Gauge);
        fam.samples.push(Sample {
            labels: vec!["a\"b\\c\nd".into()],
            value: 1.0,
        });
        let out = render(&[fam]);
        assert!(out.contains("# HELP m line1\\nline2 \"q\"\n"));
        assert!(out.contains("m{l=\"a\\\"b\\\\c\\nd\"} 1\n"));
    }

    #[test]
    fn unlabeled_sample_has_no_braces() {
        let desc = Arc::new(MetricDesc::new("up", "help", &[]).unwrap());
        let mut fam = MetricFamily::new(desc, ValueType::Counter);
        fam.samples.push(Sample { labels: vec![], value: 3.0 });
        assert_eq!(render(&[fam]), "# HELP up help\n# TYPE up counter\nup 3\n");
    }
}
