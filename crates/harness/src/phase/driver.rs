//! The phase driver: owns the run/try loop, per-try timeout and retry
//! policy, hook invocation, and the reporting of completed trials.

use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::try_join_all;
use tracing::{info, warn};

use super::core::PhaseCore;
use super::hooks::TestHooks;
use super::scenario::Scenario;
use super::state::PhaseState;
use crate::error::HarnessError;
use crate::parser::Entry;
use crate::report::{calculate_stats, format_run, table, ReportSink, Statistic, TimeSeriesPoint};

pub struct Phase {
    core: PhaseCore,
    scenario: Box<dyn Scenario>,
    hooks: TestHooks,
    sink: Option<Box<dyn ReportSink>>,
    state: PhaseState,
    torn_down: bool,
    /// Completed runs' captured entries, in run order.
    trials: Vec<Vec<Entry>>,
    formatted: Vec<TimeSeriesPoint>,
}

impl Phase {
    pub fn new(core: PhaseCore, scenario: Box<dyn Scenario>, hooks: TestHooks) -> Self {
        Self {
            core,
            scenario,
            hooks,
            sink: None,
            state: PhaseState::Idle,
            torn_down: false,
            trials: Vec::new(),
            formatted: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    pub fn completed_runs(&self) -> usize {
        self.trials.len()
    }

    /// Drive the whole suite. Any error terminates it; there is no partial
    /// success. Pass or fail, the device still gets torn down.
    pub async fn run(&mut self) -> Result<BTreeMap<String, Vec<Statistic>>, HarnessError> {
        match self.drive().await {
            Ok(stats) => Ok(stats),
            Err(err) => {
                self.state = PhaseState::Failed;
                if let Err(teardown_err) = self.teardown_all().await {
                    warn!(error = %teardown_err, "teardown failed after fatal error");
                }
                Err(err)
            }
        }
    }

    async fn drive(&mut self) -> Result<BTreeMap<String, Vec<Statistic>>, HarnessError> {
        info!(phase = self.scenario.name(), title = %self.scenario.title(), "starting suite");
        table::progress(
            &format!("Starting suite: {}", self.scenario.title()),
            self.core.config.output,
        );

        self.state = PhaseState::Warming;
        if let Some(setup) = &self.hooks.setup {
            setup(&self.core).await.map_err(HarnessError::Hook)?;
        }
        self.scenario.warmup(&mut self.core).await?;

        self.core.run = 1;
        loop {
            self.core.current_try = 1;
            self.attempt_run().await?;
            self.next().await?;

            info!(run = self.core.run, "run complete");
            table::progress(
                &format!(
                    "Finished run {} of {}",
                    self.core.run, self.core.config.runs
                ),
                self.core.config.output,
            );
            if self.core.run < self.core.config.runs {
                self.core.run += 1;
            } else {
                break;
            }
        }

        self.end().await
    }

    /// Execute one run, retrying timed-out tries within the retry budget.
    async fn attempt_run(&mut self) -> Result<(), HarnessError> {
        let budget = Duration::from_millis(self.core.config.timeout_ms);

        loop {
            self.core
                .begin_capture(self.scenario.capture_filter(&self.core));
            self.state = PhaseState::Running {
                run: self.core.run,
                attempt: self.core.current_try,
            };

            match tokio::time::timeout(budget, self.scenario.test_run(&mut self.core)).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(err)) if !err.is_timeout() => return Err(err),
                // A timeout, whether the timer's or the scenario's own.
                Ok(Err(_)) | Err(_) => {}
            }

            if self.core.current_try > self.core.config.retries {
                return Err(HarnessError::Timeout(budget));
            }

            warn!(
                run = self.core.run,
                attempt = self.core.current_try,
                "try timed out, retrying"
            );
            self.state = PhaseState::Retrying {
                run: self.core.run,
                attempt: self.core.current_try,
            };
            self.core.current_try += 1;

            // The timed-out try's outstanding work is abandoned, never
            // awaited; begin_capture at the top of the loop fences its
            // entries out.
            self.core.device.clear_log().await?;
            self.scenario.retry(&mut self.core).await?;
        }
    }

    /// Completed-run handling: per-run hooks, then formatting + reporting.
    async fn next(&mut self) -> Result<(), HarnessError> {
        try_join_all(self.hooks.after_each.iter().map(|hook| hook(&self.core)))
            .await
            .map_err(HarnessError::Hook)?;

        let entries = self.core.captured();
        let points = format_run(
            self.core.run,
            &entries,
            self.scenario.start_mark(),
            &self.core.meta,
        )?;

        if let Some(sink) = &self.sink {
            sink.report(&points).await;
        }

        self.formatted.extend(points);
        self.trials.push(entries);
        Ok(())
    }

    async fn end(&mut self) -> Result<BTreeMap<String, Vec<Statistic>>, HarnessError> {
        self.state = PhaseState::Ending;

        let stats = calculate_stats(&self.formatted);
        table::output(&stats, self.core.config.output);

        self.teardown_all().await?;

        self.state = PhaseState::Ended;
        info!("suite complete");
        Ok(stats)
    }

    /// Runs once, whichever exit path reaches it first.
    async fn teardown_all(&mut self) -> Result<(), HarnessError> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;

        self.core.dispatcher.end();
        self.scenario.teardown(&mut self.core).await?;
        if let Some(teardown) = &self.hooks.teardown {
            teardown(&self.core).await.map_err(HarnessError::Hook)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::{HarnessConfig, OutputMode, PhaseKind};
    use crate::device::mock::MockDevice;
    use crate::device::DeviceControl;
    use crate::parser::Entry;
    use crate::phase::scenario::CaptureFilter;
    use crate::report::sink::VecSink;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    const SYSTEM: &str = "system.gaiamobile.org";

    struct AcceptAll;

    impl CaptureFilter for AcceptAll {
        fn accept(&mut self, _entry: &mut Entry) -> bool {
            true
        }
    }

    /// Scripted trial: hangs for `hang_tries` tries, then injects a marker
    /// and one measurement mark and waits for them like a real scenario.
    struct Scripted {
        device: Arc<MockDevice>,
        hang_tries: u32,
        fail_with: Option<HarnessError>,
        retries_seen: Arc<AtomicU32>,
        teardowns_seen: Arc<AtomicU32>,
    }

    impl Scripted {
        fn new(device: Arc<MockDevice>) -> Self {
            Self {
                device,
                hang_tries: 0,
                fail_with: None,
                retries_seen: Arc::new(AtomicU32::new(0)),
                teardowns_seen: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    #[async_trait]
    impl Scenario for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn title(&self) -> String {
            "Scripted".to_string()
        }

        fn start_mark(&self) -> &'static str {
            "appLaunch"
        }

        async fn warmup(&mut self, _core: &mut PhaseCore) -> Result<(), HarnessError> {
            Ok(())
        }

        fn capture_filter(&self, _core: &PhaseCore) -> Box<dyn CaptureFilter> {
            Box::new(AcceptAll)
        }

        async fn test_run(&mut self, core: &mut PhaseCore) -> Result<(), HarnessError> {
            if let Some(err) = self.fail_with.take() {
                return Err(err);
            }
            if self.hang_tries > 0 {
                self.hang_tries -= 1;
                futures::future::pending::<()>().await;
            }

            let run = i64::from(core.run);
            let wait = core.dispatcher.wait_for_entry("fullyLoaded", SYSTEM);
            let feed = async {
                self.device
                    .inject_line(format!(
                        "I/PerformanceTiming(  10): {SYSTEM}|mark|appLaunch|0|0|{}",
                        1000 * run
                    ))
                    .await;
                self.device
                    .inject_line(format!(
                        "I/PerformanceTiming(  10): {SYSTEM}|mark|fullyLoaded|0|0|{}",
                        1000 * run + 420
                    ))
                    .await;
            };

            let (entry, ()) = tokio::join!(wait, feed);
            entry.map(|_| ())
        }

        async fn retry(&mut self, _core: &mut PhaseCore) -> Result<(), HarnessError> {
            self.retries_seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn teardown(&mut self, _core: &mut PhaseCore) -> Result<(), HarnessError> {
            self.teardowns_seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config(runs: u32, timeout_ms: u64, retries: u32) -> HarnessConfig {
        HarnessConfig {
            phase: PhaseKind::Reboot,
            runs,
            timeout_ms,
            retries,
            output: OutputMode::Quiet,
            time: 1_400_000_000_000,
            ..Default::default()
        }
    }

    struct Counters {
        retries: Arc<AtomicU32>,
        teardowns: Arc<AtomicU32>,
    }

    async fn phase_with(
        config: HarnessConfig,
        build: impl FnOnce(Arc<MockDevice>) -> Scripted,
    ) -> (Phase, Arc<MockDevice>, Counters) {
        let device = Arc::new(MockDevice::new());
        let core = PhaseCore::connect(config, Arc::clone(&device) as Arc<dyn DeviceControl>)
            .await
            .unwrap();
        let scenario = build(Arc::clone(&device));
        let counters = Counters {
            retries: Arc::clone(&scenario.retries_seen),
            teardowns: Arc::clone(&scenario.teardowns_seen),
        };
        let phase = Phase::new(core, Box::new(scenario), TestHooks::new());
        (phase, device, counters)
    }

    #[tokio::test]
    async fn drives_all_runs_and_aggregates() {
        let (mut phase, _device, counters) = phase_with(config(3, 5_000, 0), Scripted::new).await;

        let stats = phase.run().await.unwrap();

        assert_eq!(phase.state(), PhaseState::Ended);
        assert_eq!(phase.completed_runs(), 3);
        assert_eq!(counters.teardowns.load(Ordering::SeqCst), 1);

        let loaded = stats[SYSTEM]
            .iter()
            .find(|stat| stat.metric == "fullyLoaded")
            .unwrap();
        assert_eq!(loaded.mean, 420.0);
        assert_eq!(loaded.min, 420.0);
        assert_eq!(loaded.max, 420.0);
    }

    #[tokio::test]
    async fn reports_points_through_the_sink() {
        let (phase, _device, _counters) = phase_with(config(2, 5_000, 0), Scripted::new).await;
        let sink = Arc::new(VecSink::new());

        struct SharedSink(Arc<VecSink>);

        #[async_trait]
        impl ReportSink for SharedSink {
            async fn report(&self, points: &[TimeSeriesPoint]) {
                self.0.report(points).await;
            }
        }

        let mut phase = phase.with_sink(Box::new(SharedSink(Arc::clone(&sink))));
        phase.run().await.unwrap();

        let points = sink.points.lock().unwrap();
        // Run 1: fullyLoaded + two annotations; run 2: fullyLoaded.
        assert_eq!(points.len(), 4);
        assert_eq!(points.iter().filter(|point| point.is_annotation()).count(), 2);
    }

    #[tokio::test]
    async fn timed_out_try_is_retried_within_budget() {
        let (mut phase, device, counters) = phase_with(config(1, 50, 1), |device| {
            let mut scripted = Scripted::new(device);
            scripted.hang_tries = 1;
            scripted
        })
        .await;

        phase.run().await.unwrap();

        assert_eq!(counters.retries.load(Ordering::SeqCst), 1);
        assert_eq!(phase.completed_runs(), 1);
        assert!(device.calls().contains(&"clear_log".to_string()));
    }

    #[tokio::test]
    async fn exhausted_retries_fail_the_suite() {
        // retries = 1 allows two tries in total; both hang.
        let (mut phase, _device, counters) = phase_with(config(1, 50, 1), |device| {
            let mut scripted = Scripted::new(device);
            scripted.hang_tries = 2;
            scripted
        })
        .await;

        let error = phase.run().await.unwrap_err();
        assert!(error.is_timeout());
        assert_eq!(counters.retries.load(Ordering::SeqCst), 1);
        assert_eq!(phase.state(), PhaseState::Failed);
        assert_eq!(phase.completed_runs(), 0);
    }

    #[tokio::test]
    async fn non_timeout_errors_are_immediately_fatal() {
        let (mut phase, _device, counters) = phase_with(config(1, 5_000, 5), |device| {
            let mut scripted = Scripted::new(device);
            scripted.fail_with = Some(HarnessError::Config("boom".to_string()));
            scripted
        })
        .await;

        let error = phase.run().await.unwrap_err();
        assert!(matches!(error, HarnessError::Config(_)));
        // The retry budget is never consulted for non-timeout errors.
        assert_eq!(counters.retries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn teardown_still_runs_after_a_fatal_error() {
        // The only try hangs and there are no retries left.
        let (phase, _device, counters) = phase_with(config(1, 50, 0), |device| {
            let mut scripted = Scripted::new(device);
            scripted.hang_tries = 1;
            scripted
        })
        .await;

        let hook_runs = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&hook_runs);
        let mut phase = Phase {
            hooks: TestHooks::new().on_teardown(Box::new(move |_core| {
                let seen = Arc::clone(&seen);
                Box::pin(async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })),
            ..phase
        };

        let error = phase.run().await.unwrap_err();
        assert!(error.is_timeout());
        assert_eq!(phase.state(), PhaseState::Failed);
        assert_eq!(counters.teardowns.load(Ordering::SeqCst), 1);
        assert_eq!(hook_runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hooks_run_and_hook_errors_are_fatal() {
        let calls: Arc<Mutex<Vec<&'static str>>> = Arc::default();

        let (phase, _device, _counters) = phase_with(config(1, 5_000, 0), Scripted::new).await;
        let hook_calls = Arc::clone(&calls);
        let teardown_calls = Arc::clone(&calls);
        let hooks = TestHooks::new()
            .after_each(Box::new(move |_core| {
                let calls = Arc::clone(&hook_calls);
                Box::pin(async move {
                    calls.lock().unwrap().push("after_each");
                    Ok(())
                })
            }))
            .on_teardown(Box::new(move |_core| {
                let calls = Arc::clone(&teardown_calls);
                Box::pin(async move {
                    calls.lock().unwrap().push("teardown");
                    Ok(())
                })
            }));
        let mut phase = Phase {
            hooks,
            ..phase
        };

        phase.run().await.unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["after_each", "teardown"]);

        let (failing, _device, _counters) = phase_with(config(1, 5_000, 0), Scripted::new).await;
        let mut failing = Phase {
            hooks: TestHooks::new().after_each(Box::new(|_core| {
                Box::pin(async { Err(anyhow::anyhow!("hook rejected the run")) })
            })),
            ..failing
        };

        let error = failing.run().await.unwrap_err();
        assert!(matches!(error, HarnessError::Hook(_)));
        assert_eq!(failing.state(), PhaseState::Failed);
    }
}
