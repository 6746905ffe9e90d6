//! Aggregation pipeline: entry → time-series point → summary statistics,
//! plus the sinks and renderers the results leave through.

pub mod format;
pub mod point;
pub mod sink;
pub mod stats;
pub mod table;

pub use format::{format_run, ReportMeta};
pub use point::TimeSeriesPoint;
pub use sink::{FileSink, ReportSink};
pub use stats::{calculate_stats, Statistic};
