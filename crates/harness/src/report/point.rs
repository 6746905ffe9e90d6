use std::collections::BTreeMap;

use serde::Serialize;

/// One reported measurement. Immutable after creation; the formatter is the
/// only producer.
#[derive(Debug, Clone, Serialize)]
pub struct TimeSeriesPoint {
    /// Metric series name: `measure`, `memory`, `filesize` or `annotation`.
    pub key: String,
    /// Base time with a zero-padded run-sequence suffix, kept as a string
    /// so the suffix never collapses numerically.
    pub timestamp: String,
    pub fields: PointFields,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointFields {
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch: Option<i64>,
    /// Annotation payload; measurement points never carry one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

pub const ANNOTATION_KEY: &str = "annotation";

impl TimeSeriesPoint {
    pub fn new(
        key: impl Into<String>,
        timestamp: impl Into<String>,
        value: f64,
        epoch: Option<i64>,
        tags: BTreeMap<String, String>,
    ) -> Self {
        Self {
            key: key.into(),
            timestamp: timestamp.into(),
            fields: PointFields {
                value,
                epoch,
                text: None,
            },
            tags,
        }
    }

    /// Build-identifier marker reported alongside the first run.
    pub fn annotation(
        timestamp: impl Into<String>,
        text: impl Into<String>,
        tags: BTreeMap<String, String>,
    ) -> Self {
        Self {
            key: ANNOTATION_KEY.to_string(),
            timestamp: timestamp.into(),
            fields: PointFields {
                value: 0.0,
                epoch: None,
                text: Some(text.into()),
            },
            tags,
        }
    }

    pub fn is_annotation(&self) -> bool {
        self.key == ANNOTATION_KEY
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    pub fn metric(&self) -> &str {
        self.tag("metric").unwrap_or_default()
    }

    pub fn context(&self) -> &str {
        self.tag("context").unwrap_or_default()
    }
}
