//! Metric model: descriptors, observations, and families.
//!
//! A [`MetricDesc`] is created once and shared read-only (`Arc`) by every
//! scrape. An [`Observation`] always carries exactly one label value per
//! label name of its descriptor; the constructors enforce it.

use std::sync::Arc;

use crate::error::{Result, SnowpromError};

/// Metric kind as written on the `# TYPE` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Gauge,
    Counter,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Gauge => "gauge",
            ValueType::Counter => "counter",
        }
    }
}

/// Immutable catalog entry: name, help text, ordered label names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    name: String,
    help: String,
    label_names: Vec<String>,
}

impl MetricDesc {
    /// Build a descriptor, validating metric and label names.
    pub fn new(name: impl Into<String>, help: impl Into<String>, label_names: &[&str]) -> Result<Self> {
        let name = name.into();
        if !valid_metric_name(&name) {
            return Err(SnowpromError::Metric(format!("invalid metric name: {name:?}")));
        }

        let mut labels: Vec<String> = Vec::with_capacity(label_names.len());
        for l in label_names {
            if !valid_label_name(l) {
                return Err(SnowpromError::Metric(format!(
                    "invalid label name {l:?} for metric {name}"
                )));
            }
            if labels.iter().any(|x| x == l) {
                return Err(SnowpromError::Metric(format!(
                    "duplicate label name {l:?} for metric {name}"
                )));
            }
            labels.push((*l).to_string());
        }

        Ok(Self {
            name,
            help: help.into(),
            label_names: labels,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }
}

fn valid_metric_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn valid_label_name(s: &str) -> bool {
    if s.starts_with("__") {
        return false; // reserved for internal use
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// One labeled value pushed by a collector during a scrape.
#[derive(Debug, Clone)]
pub struct Observation {
    desc: Arc<MetricDesc>,
    value_type: ValueType,
    labels: Vec<String>,
    value: f64,
}

impl Observation {
    /// Current-value observation. Fails when the label count does not match the descriptor.
    pub fn gauge(desc: Arc<MetricDesc>, value: f64, labels: Vec<String>) -> Result<Self> {
        Self::new(desc, ValueType::Gauge, value, labels)
    }

    pub fn new(desc: Arc<MetricDesc>, value_type: ValueType, value: f64, labels: Vec<String>) -> Result<Self> {
        if labels.len() != desc.label_names.len() {
            return Err(SnowpromError::Metric(format!(
                "{}: expected {} label values, got {}",
                desc.name,
                desc.label_names.len(),
                labels.len()
            )));
        }
        Ok(Self {
            desc,
            value_type,
            labels,
            value,
        })
    }

    pub fn desc(&self) -> &Arc<MetricDesc> {
        &self.desc
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Label names zipped with their values, in descriptor order.
    pub fn label_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.desc
            .label_names
            .iter()
            .map(String::as_str)
            .zip(self.labels.iter().map(String::as_str))
    }
}

/// A single sample within a family.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Vec<String>,
    pub value: f64,
}

/// All samples of one descriptor gathered in one scrape.
#[derive(Debug, Clone)]
pub struct MetricFamily {
    pub desc: Arc<MetricDesc>,
    pub value_type: ValueType,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    pub fn new(desc: Arc<MetricDesc>, value_type: ValueType) -> Self {
        Self {
            desc,
            value_type,
            samples: Vec::new(),
        }
    }

    /// Order samples by label values so output is stable across scrapes.
    pub fn sort_samples(&mut self) {
        self.samples.sort_by(|a, b| a.labels.cmp(&b.labels));
    }
}
