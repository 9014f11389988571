//! Background timers with stop control.
//!
//! [`run_background`] drives every fixed-interval job of the core from one
//! task:
//!
//! - **Decay**: relax influence toward equilibrium
//! - **Route maintenance**: revalidate, purge, and regenerate routes
//! - **Security refresh**: re-sync connection security with control status
//! - **Siege**: relax idle dominance meters and expire locks
//! - **AI**: run whichever faction AI cadences are due, then execute
//!
//! Every job is idempotent, so a tick with no pending work is harmless.
//! Stopping is cooperative: [`RunnerControl::request_stop`] wakes the loop,
//! which finishes the job in hand and returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::FrontlineConfig;
use crate::service::Frontline;

/// One kind of background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundTask {
    /// Influence decay.
    Decay,
    /// Route cache maintenance.
    RouteMaintenance,
    /// Connection security refresh.
    SecurityRefresh,
    /// Siege meters and lock expiry.
    Siege,
    /// Faction AI cadences.
    Ai,
}

impl BackgroundTask {
    /// Every job, in the order the runner prefers when several are due.
    pub const ALL: [Self; 5] = [
        Self::Decay,
        Self::SecurityRefresh,
        Self::RouteMaintenance,
        Self::Siege,
        Self::Ai,
    ];

    /// Configured interval of the job, in seconds.
    pub const fn interval_secs(self, config: &FrontlineConfig) -> u64 {
        match self {
            Self::Decay => config.influence.decay_interval_secs,
            Self::RouteMaintenance => config.routes.maintenance_interval_secs,
            Self::SecurityRefresh => config.routes.security_refresh_interval_secs,
            Self::Siege => config.siege.tick_interval_secs,
            Self::Ai => config.ai.execution_interval_secs,
        }
    }

    /// Run one pass of the job against the core.
    pub fn run(self, frontline: &Frontline) {
        match self {
            Self::Decay => match frontline.state().decay_tick() {
                Ok(report) => debug!(?report, "decay pass"),
                Err(err) => warn!(error = %err, "decay pass failed"),
            },
            Self::RouteMaintenance => {
                let report = frontline.routes().run_maintenance();
                debug!(?report, "route maintenance pass");
            }
            Self::SecurityRefresh => {
                let resynced = frontline.routes().refresh_connection_security();
                if resynced > 0 {
                    debug!(resynced, "connection security refreshed");
                }
            }
            Self::Siege => {
                let report = frontline.sieges().tick();
                if report.resolved > 0 {
                    debug!(?report, "siege pass");
                }
            }
            Self::Ai => {
                let report = frontline.ai().tick();
                debug!(?report, "faction AI pass");
            }
        }
    }
}

/// Pass counts from one [`run_background`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Decay passes.
    pub decay: u64,
    /// Route maintenance passes.
    pub route_maintenance: u64,
    /// Security refresh passes.
    pub security_refresh: u64,
    /// Siege passes.
    pub siege: u64,
    /// Faction AI passes.
    pub ai: u64,
}

impl RunSummary {
    fn record(&mut self, task: BackgroundTask) {
        let counter = match task {
            BackgroundTask::Decay => &mut self.decay,
            BackgroundTask::RouteMaintenance => &mut self.route_maintenance,
            BackgroundTask::SecurityRefresh => &mut self.security_refresh,
            BackgroundTask::Siege => &mut self.siege,
            BackgroundTask::Ai => &mut self.ai,
        };
        *counter = counter.saturating_add(1);
    }

    /// Passes of one job.
    pub const fn passes(&self, task: BackgroundTask) -> u64 {
        match task {
            BackgroundTask::Decay => self.decay,
            BackgroundTask::RouteMaintenance => self.route_maintenance,
            BackgroundTask::SecurityRefresh => self.security_refresh,
            BackgroundTask::Siege => self.siege,
            BackgroundTask::Ai => self.ai,
        }
    }

    /// Passes of every job.
    pub fn total(&self) -> u64 {
        BackgroundTask::ALL
            .iter()
            .fold(0_u64, |sum, task| sum.saturating_add(self.passes(*task)))
    }
}

/// Shared stop switch for the background runner.
#[derive(Debug, Default)]
pub struct RunnerControl {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wakes the runner when a stop is requested.
    stop_notify: Notify,
}

impl RunnerControl {
    /// A control with no stop requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a clean stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_waiters();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Resolve once a stop has been requested.
    pub async fn stopped(&self) {
        loop {
            let notified = self.stop_notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent request is
            // not missed.
            notified.as_mut().enable();
            if self.is_stop_requested() {
                return;
            }
            notified.await;
        }
    }
}

fn interval_for(task: BackgroundTask, config: &FrontlineConfig) -> Interval {
    let period = Duration::from_secs(task.interval_secs(config).max(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Run every background job on its interval until a stop is requested.
///
/// Each job runs once immediately, then on its configured period.
pub async fn run_background(frontline: Arc<Frontline>, control: Arc<RunnerControl>) -> RunSummary {
    let config = frontline.config();
    let mut decay = interval_for(BackgroundTask::Decay, config);
    let mut refresh = interval_for(BackgroundTask::SecurityRefresh, config);
    let mut maintenance = interval_for(BackgroundTask::RouteMaintenance, config);
    let mut siege = interval_for(BackgroundTask::Siege, config);
    let mut ai = interval_for(BackgroundTask::Ai, config);
    let mut summary = RunSummary::default();

    info!(
        decay_secs = BackgroundTask::Decay.interval_secs(config),
        maintenance_secs = BackgroundTask::RouteMaintenance.interval_secs(config),
        refresh_secs = BackgroundTask::SecurityRefresh.interval_secs(config),
        siege_secs = BackgroundTask::Siege.interval_secs(config),
        ai_secs = BackgroundTask::Ai.interval_secs(config),
        "background runner starting"
    );

    loop {
        let task = tokio::select! {
            biased;
            () = control.stopped() => break,
            _ = decay.tick() => BackgroundTask::Decay,
            _ = refresh.tick() => BackgroundTask::SecurityRefresh,
            _ = maintenance.tick() => BackgroundTask::RouteMaintenance,
            _ = siege.tick() => BackgroundTask::Siege,
            _ = ai.tick() => BackgroundTask::Ai,
        };
        task.run(&frontline);
        summary.record(task);
    }

    info!(
        total = summary.total(),
        decay = summary.decay,
        route_maintenance = summary.route_maintenance,
        siege = summary.siege,
        ai = summary.ai,
        "background runner stopped"
    );
    summary
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use frontline_graph::create_frontier_map;
    use frontline_types::ManualClock;

    use super::*;

    fn frontline() -> Arc<Frontline> {
        Arc::new(Frontline::new(
            FrontlineConfig::default(),
            create_frontier_map().unwrap(),
            Arc::new(ManualClock::at_epoch()),
        ))
    }

    #[test]
    fn intervals_come_from_config() {
        let mut config = FrontlineConfig::default();
        config.influence.decay_interval_secs = 7;
        config.siege.tick_interval_secs = 2;
        assert_eq!(BackgroundTask::Decay.interval_secs(&config), 7);
        assert_eq!(BackgroundTask::Siege.interval_secs(&config), 2);
    }

    #[test]
    fn every_task_is_safe_with_nothing_to_do() {
        let core = frontline();
        for task in BackgroundTask::ALL {
            task.run(&core);
            task.run(&core);
        }
        assert_eq!(core.routes().get_active_routes(None).len(), 0);
        assert_eq!(core.sieges().siege_count(), 0);
    }

    #[tokio::test]
    async fn stop_before_start_runs_nothing() {
        let control = Arc::new(RunnerControl::new());
        control.request_stop();
        let summary = run_background(frontline(), control).await;
        assert_eq!(summary, RunSummary::default());
    }

    #[tokio::test]
    async fn every_job_runs_once_at_startup_then_stops_on_request() {
        let control = Arc::new(RunnerControl::new());
        let handle = tokio::spawn(run_background(frontline(), control.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        control.request_stop();
        let summary = handle.await.unwrap();
        for task in BackgroundTask::ALL {
            assert!(summary.passes(task) >= 1, "{task:?} never ran");
        }
    }
}
