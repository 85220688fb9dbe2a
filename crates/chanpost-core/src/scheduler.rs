//! Time-triggered jobs driven by one polling loop.
//!
//! - daily jobs fire at a fixed local time of day
//! - interval jobs fire every N seconds after startup
//! - due jobs run one after another inside the tick, so a slow publish delays
//!   the next tick instead of overlapping with it

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, TimeZone};
use tokio::{sync::Mutex, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{config::Config, formatting::escape_html, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobAction {
    Publish,
    Report,
    Sweep,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Daily(NaiveTime),
    Every(Duration),
}

impl Trigger {
    /// First firing instant for a scheduler started at `now`.
    pub fn first_after(&self, now: DateTime<Local>) -> DateTime<Local> {
        match *self {
            Trigger::Daily(time) => next_daily(now, time),
            Trigger::Every(interval) => now + to_chrono(interval),
        }
    }

    /// Next firing instant after the one at `previous` fired at `now`.
    ///
    /// Always strictly after `now`; slots missed while the process was stalled
    /// are skipped, not replayed.
    pub fn next_after(&self, now: DateTime<Local>, previous: DateTime<Local>) -> DateTime<Local> {
        match *self {
            Trigger::Daily(time) => next_daily(now, time),
            Trigger::Every(interval) => {
                let step = to_chrono(interval);
                let mut next = previous + step;
                while next <= now {
                    next += step;
                }
                next
            }
        }
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    let d = chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(1));
    d.max(chrono::Duration::seconds(1))
}

fn local_at(date: NaiveDate, time: NaiveTime) -> Option<DateTime<Local>> {
    let naive = date.and_time(time);
    // A time inside a DST gap does not exist locally; use the hour after.
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            Local
                .from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
        })
}

fn next_daily(now: DateTime<Local>, time: NaiveTime) -> DateTime<Local> {
    let mut date = now.date_naive();
    for _ in 0..3 {
        if let Some(candidate) = local_at(date, time) {
            if candidate > now {
                return candidate;
            }
        }
        date = date + Days::new(1);
    }
    now + chrono::Duration::days(1)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledJob {
    pub name: String,
    pub trigger: Trigger,
    pub action: JobAction,
}

impl ScheduledJob {
    pub fn daily(name: impl Into<String>, at: NaiveTime, action: JobAction) -> Self {
        Self {
            name: name.into(),
            trigger: Trigger::Daily(at),
            action,
        }
    }

    pub fn every(name: impl Into<String>, interval: Duration, action: JobAction) -> Self {
        Self {
            name: name.into(),
            trigger: Trigger::Every(interval),
            action,
        }
    }
}

/// The static job set: publish slots, the daily report and the expiry sweep.
pub fn jobs_from_config(cfg: &Config) -> Vec<ScheduledJob> {
    let mut jobs = cfg
        .post_times
        .iter()
        .map(|t| ScheduledJob::daily(format!("publish {}", t.format("%H:%M")), *t, JobAction::Publish))
        .collect::<Vec<_>>();
    jobs.push(ScheduledJob::daily(
        format!("report {}", cfg.report_time.format("%H:%M")),
        cfg.report_time,
        JobAction::Report,
    ));
    jobs.push(ScheduledJob::every(
        format!("sweep every {}s", cfg.sweep_interval.as_secs()),
        cfg.sweep_interval,
        JobAction::Sweep,
    ));
    jobs
}

/// Executes job actions for the scheduler.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, action: JobAction) -> Result<()>;
}

#[derive(Clone, Debug)]
struct JobSlot {
    job: ScheduledJob,
    next_at: DateTime<Local>,
    last_fired: Option<DateTime<Local>>,
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    handler: Arc<dyn JobHandler>,
    poll_interval: Duration,
    slots: Mutex<Vec<JobSlot>>,
}

impl Scheduler {
    pub fn new(jobs: Vec<ScheduledJob>, handler: Arc<dyn JobHandler>, poll_interval: Duration) -> Self {
        Self::new_at(jobs, handler, poll_interval, Local::now())
    }

    pub fn new_at(
        jobs: Vec<ScheduledJob>,
        handler: Arc<dyn JobHandler>,
        poll_interval: Duration,
        now: DateTime<Local>,
    ) -> Self {
        let slots = jobs
            .into_iter()
            .map(|job| JobSlot {
                next_at: job.trigger.first_after(now),
                job,
                last_fired: None,
            })
            .collect();
        Self {
            inner: Arc::new(SchedulerInner {
                handler,
                poll_interval,
                slots: Mutex::new(slots),
            }),
        }
    }

    /// Fire every job due at `now`. Returns the names of the jobs that ran.
    pub async fn tick_at(&self, now: DateTime<Local>) -> Vec<String> {
        let due = {
            let mut slots = self.inner.slots.lock().await;
            let mut due = Vec::new();
            for slot in slots.iter_mut() {
                if slot.next_at > now {
                    continue;
                }
                slot.last_fired = Some(now);
                slot.next_at = slot.job.trigger.next_after(now, slot.next_at);
                due.push((slot.job.name.clone(), slot.job.action));
            }
            due
        };

        for (name, action) in due.iter() {
            info!(job = %name, "running scheduled job");
            match self.inner.handler.run(*action).await {
                Ok(()) => debug!(job = %name, "scheduled job finished"),
                Err(e) => error!(job = %name, error = %e, "scheduled job failed"),
            }
        }

        due.into_iter().map(|(name, _)| name).collect()
    }

    /// Poll until `cancel` fires. A running job is never interrupted.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut tick = tokio::time::interval(self.inner.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let jobs = self.inner.slots.lock().await.len();
        info!(jobs, "scheduler started");
        loop {
            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = tick.tick() => {
                self.tick_at(Local::now()).await;
              }
            }
        }
        info!("scheduler stopped");
    }

    pub fn spawn(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    }

    /// Job names with their next firing instant, soonest first.
    pub async fn upcoming(&self) -> Vec<(String, DateTime<Local>)> {
        let slots = self.inner.slots.lock().await;
        let mut out = slots
            .iter()
            .map(|s| (s.job.name.clone(), s.next_at))
            .collect::<Vec<_>>();
        out.sort_by_key(|(_, at)| *at);
        out
    }

    pub async fn status_html(&self) -> String {
        let upcoming = self.upcoming().await;
        if upcoming.is_empty() {
            return "No scheduled jobs".to_string();
        }

        let mut lines = vec![format!("📅 <b>Scheduled Jobs ({})</b>", upcoming.len())];
        for (name, at) in upcoming {
            lines.push(format!(
                "• {}: next at {}",
                escape_html(&name),
                at.format("%m-%d %H:%M")
            ));
        }
        lines.join("\n")
    }
}
