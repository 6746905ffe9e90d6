//! Suite summary output. Console mode renders one markdown table per
//! context; json mode emits the same aggregates machine-readably; quiet
//! suppresses the summary entirely.

use std::collections::BTreeMap;

use super::stats::Statistic;
use crate::conf::OutputMode;

pub fn render_console(stats: &BTreeMap<String, Vec<Statistic>>) -> String {
    let mut out = String::new();

    for (context, statistics) in stats {
        out.push_str(&format!("## {context}\n\n"));
        out.push_str("| Metric | Mean | Median | Min | Max | StdDev | 95% Bound |\n");
        out.push_str("| --- | --- | --- | --- | --- | --- | --- |\n");

        for stat in statistics {
            out.push_str(&format!(
                "| {} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} |\n",
                stat.metric,
                stat.mean,
                stat.median,
                stat.min,
                stat.max,
                stat.std_dev,
                stat.bound_95,
            ));
        }

        out.push('\n');
    }

    out
}

pub fn render_json(stats: &BTreeMap<String, Vec<Statistic>>) -> String {
    // BTreeMap of vectors of plain numbers; serialization cannot fail.
    serde_json::to_string_pretty(stats).unwrap_or_else(|_| "{}".to_string())
}

/// Write the suite summary to stdout according to the configured mode.
pub fn output(stats: &BTreeMap<String, Vec<Statistic>>, mode: OutputMode) {
    match mode {
        OutputMode::Console => print!("{}", render_console(stats)),
        OutputMode::Json => println!("{}", render_json(stats)),
        OutputMode::Quiet => {}
    }
}

/// Suite progress lines share stdout with the summary and follow the same
/// mode: console prints them, json and quiet keep stdout machine-clean.
pub fn progress(message: &str, mode: OutputMode) {
    if let Some(line) = progress_line(message, mode) {
        println!("{line}");
    }
}

fn progress_line(message: &str, mode: OutputMode) -> Option<&str> {
    matches!(mode, OutputMode::Console).then_some(message)
}
