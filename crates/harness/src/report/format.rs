//! Trial formatting: captured entries for one completed run become tagged
//! time-series points relative to the run's start marker.

use std::collections::BTreeMap;

use tracing::warn;

use super::point::TimeSeriesPoint;
use crate::error::HarnessError;
use crate::parser::{Entry, PerformanceKind};

/// Suite-constant identity every point is tagged with. Computed once at
/// phase startup, never per run.
#[derive(Debug, Clone, Default)]
pub struct ReportMeta {
    /// What is being measured, e.g. the app's short name.
    pub test: String,
    /// Which phase produced the measurement.
    pub phase: String,
    /// Suite base time, epoch milliseconds.
    pub base_time: i64,
    /// Fingerprint of the build revisions under test.
    pub revision_id: String,
    pub gaia_revision: String,
    pub gecko_revision: String,
    /// Device properties carried onto every point.
    pub device_tags: BTreeMap<String, String>,
}

impl ReportMeta {
    /// Timestamp for a run: the base time with a zero-padded run suffix,
    /// distinguishable per run yet groupable per suite.
    pub fn timestamp(&self, run: u32) -> String {
        format!("{}{:06}", self.base_time, run)
    }

    fn tags_for(&self, metric: &str, context: &str) -> BTreeMap<String, String> {
        let mut tags = self.device_tags.clone();
        tags.insert("metric".to_string(), metric.to_string());
        tags.insert("context".to_string(), context.to_string());
        tags.insert("test".to_string(), self.test.clone());
        tags.insert("phase".to_string(), self.phase.clone());
        tags.insert("revisionId".to_string(), self.revision_id.clone());
        tags
    }
}

fn context_tag(context: &str, entry_point: Option<&str>) -> String {
    match entry_point {
        Some(entry_point) => format!("{context}@{entry_point}"),
        None => context.to_string(),
    }
}

/// Convert one run's captured entries into time-series points.
///
/// The start marker is the run's time-zero reference. It must be present
/// and is itself never reported. Marks become elapsed time since the
/// marker; measures, memory, and filesize entries carry their own value.
/// Negative values indicate event-ordering skew and are dropped.
pub fn format_run(
    run: u32,
    entries: &[Entry],
    start_mark: &str,
    meta: &ReportMeta,
) -> Result<Vec<TimeSeriesPoint>, HarnessError> {
    let mut marker_epoch = 0;
    let marker_index = entries
        .iter()
        .position(|entry| match entry {
            Entry::Performance(performance) if performance.name == start_mark => {
                marker_epoch = performance.epoch;
                true
            }
            _ => false,
        })
        .ok_or_else(|| HarnessError::MissingStartMark(start_mark.to_string()))?;

    let timestamp = meta.timestamp(run);
    let mut points = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        if index == marker_index {
            continue;
        }

        let (key, name, context, value, epoch) = match entry {
            Entry::Performance(performance) => {
                let value = match performance.entry_type {
                    PerformanceKind::Mark => (performance.epoch - marker_epoch) as f64,
                    PerformanceKind::Measure => performance.duration,
                };
                (
                    "measure",
                    performance.name.as_str(),
                    context_tag(&performance.context, performance.entry_point.as_deref()),
                    value,
                    Some(performance.epoch),
                )
            }
            Entry::Memory(memory) => (
                "memory",
                memory.name.as_str(),
                context_tag(&memory.context, memory.entry_point.as_deref()),
                memory.value,
                None,
            ),
            Entry::Filesize(filesize) => (
                "filesize",
                filesize.name.as_str(),
                filesize.context.clone(),
                filesize.value,
                None,
            ),
        };

        if value < 0.0 {
            warn!(metric = name, context = %context, value, "discarding negative value");
            continue;
        }

        points.push(TimeSeriesPoint::new(
            key,
            timestamp.clone(),
            value,
            epoch,
            meta.tags_for(name, &context),
        ));
    }

    if run == 1 {
        points.push(annotation_point(meta, 1, "Gaia", &meta.gaia_revision));
        points.push(annotation_point(meta, 2, "Gecko", &meta.gecko_revision));
    }

    Ok(points)
}

fn annotation_point(meta: &ReportMeta, id: u32, title: &str, text: &str) -> TimeSeriesPoint {
    let mut tags = meta.device_tags.clone();
    tags.insert("title".to_string(), title.to_string());
    tags.insert("test".to_string(), meta.test.clone());
    tags.insert("revisionId".to_string(), meta.revision_id.clone());

    TimeSeriesPoint::annotation(meta.timestamp(id), text, tags)
}
