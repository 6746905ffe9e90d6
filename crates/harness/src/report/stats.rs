//! Suite statistics: descriptive aggregates per (context, metric) across
//! every completed run's points.

use std::collections::BTreeMap;

use serde::Serialize;

use super::point::TimeSeriesPoint;

#[derive(Debug, Clone, Serialize)]
pub struct Statistic {
    pub metric: String,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    /// Upper 95% confidence bound: mean + 1.96·stddev/√n.
    pub bound_95: f64,
}

/// Aggregate all runs' points, grouped by context then metric. Memory
/// values are scaled from bytes to megabytes before aggregation so the
/// summary reads in MB like every other size in the output. Annotations
/// are identity markers, not samples, and are excluded.
pub fn calculate_stats(points: &[TimeSeriesPoint]) -> BTreeMap<String, Vec<Statistic>> {
    let mut groups: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();

    for point in points {
        if point.is_annotation() {
            continue;
        }

        let value = if point.key == "memory" {
            point.fields.value / 1024.0 / 1024.0
        } else {
            point.fields.value
        };

        groups
            .entry((point.context().to_string(), point.metric().to_string()))
            .or_default()
            .push(value);
    }

    let mut stats: BTreeMap<String, Vec<Statistic>> = BTreeMap::new();
    for ((context, metric), values) in groups {
        stats
            .entry(context)
            .or_default()
            .push(summarize(metric, values));
    }

    stats
}

fn summarize(metric: String, mut values: Vec<f64>) -> Statistic {
    values.sort_by(|left, right| left.total_cmp(right));

    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / count;
    let std_dev = variance.sqrt();

    let median = if values.len() % 2 == 1 {
        values[values.len() / 2]
    } else {
        let upper = values.len() / 2;
        (values[upper - 1] + values[upper]) / 2.0
    };

    Statistic {
        metric,
        mean,
        median,
        min: values[0],
        max: values[values.len() - 1],
        std_dev,
        bound_95: mean + 1.96 * std_dev / count.sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as TagMap;

    fn point(key: &str, context: &str, metric: &str, value: f64) -> TimeSeriesPoint {
        let tags = TagMap::from([
            ("context".to_string(), context.to_string()),
            ("metric".to_string(), metric.to_string()),
        ]);
        TimeSeriesPoint::new(key, "1400000000000000001", value, None, tags)
    }

    #[test]
    fn groups_by_context_then_metric() {
        let points = vec![
            point("measure", "clock.gaiamobile.org", "fullyLoaded", 400.0),
            point("measure", "clock.gaiamobile.org", "fullyLoaded", 600.0),
            point("measure", "clock.gaiamobile.org", "visuallyLoaded", 300.0),
            point("measure", "system.gaiamobile.org", "fullyLoaded", 900.0),
        ];

        let stats = calculate_stats(&points);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["clock.gaiamobile.org"].len(), 2);
        assert_eq!(stats["system.gaiamobile.org"].len(), 1);
    }

    #[test]
    fn aggregates_are_exact_on_a_known_series() {
        let points: Vec<_> = [400.0, 500.0, 600.0]
            .iter()
            .map(|value| point("measure", "clock.gaiamobile.org", "fullyLoaded", *value))
            .collect();

        let stats = calculate_stats(&points);
        let stat = &stats["clock.gaiamobile.org"][0];
        assert_eq!(stat.mean, 500.0);
        assert_eq!(stat.median, 500.0);
        assert_eq!(stat.min, 400.0);
        assert_eq!(stat.max, 600.0);

        // Population standard deviation of {400, 500, 600}.
        let expected_std = (20_000.0f64 / 3.0).sqrt();
        assert!((stat.std_dev - expected_std).abs() < 1e-9);
        let expected_bound = 500.0 + 1.96 * expected_std / 3.0f64.sqrt();
        assert!((stat.bound_95 - expected_bound).abs() < 1e-9);
    }

    #[test]
    fn even_count_median_averages_the_middle_pair() {
        let points: Vec<_> = [100.0, 200.0, 300.0, 1000.0]
            .iter()
            .map(|value| point("measure", "clock.gaiamobile.org", "fullyLoaded", *value))
            .collect();

        let stats = calculate_stats(&points);
        assert_eq!(stats["clock.gaiamobile.org"][0].median, 250.0);
    }

    #[test]
    fn memory_series_scale_to_megabytes() {
        let points = vec![
            point("memory", "clock.gaiamobile.org", "uss", 10.0 * 1024.0 * 1024.0),
            point("memory", "clock.gaiamobile.org", "uss", 14.0 * 1024.0 * 1024.0),
        ];

        let stats = calculate_stats(&points);
        assert_eq!(stats["clock.gaiamobile.org"][0].mean, 12.0);
    }

    #[test]
    fn annotations_are_excluded() {
        let tags = TagMap::from([
            ("context".to_string(), "device".to_string()),
            ("metric".to_string(), "gaiaRevision".to_string()),
        ]);
        let points = vec![
            TimeSeriesPoint::annotation("1400000000000000001", "gaia-sha", tags),
            point("measure", "clock.gaiamobile.org", "fullyLoaded", 400.0),
        ];

        let stats = calculate_stats(&points);
        assert_eq!(stats.len(), 1);
        assert!(stats.contains_key("clock.gaiamobile.org"));
    }
}
