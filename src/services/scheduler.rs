use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;

/// Something the scheduler can refresh on a timer.
#[async_trait]
pub trait Refreshable: Send + Sync + 'static {
    fn job_name(&self) -> &'static str;

    async fn run_refresh(&self) -> Result<()>;
}

pub struct Scheduler {
    target: Arc<dyn Refreshable>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
    shutdown: Arc<Notify>,
}

impl Scheduler {
    pub fn new(target: Arc<dyn Refreshable>, config: SchedulerConfig) -> Self {
        Self {
            target,
            config,
            running: Arc::new(RwLock::new(false)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Runs until [`Scheduler::stop`] is called.
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        if self.config.refresh_on_startup {
            self.trigger_now().await?;
        }

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let target = Arc::clone(&self.target);
        let running = Arc::clone(&self.running);

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let target = Arc::clone(&target);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                let _ = run_job(target.as_ref()).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", cron_expr);

        self.wait_for_stop().await;

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let hours = self.config.refresh_interval_hours.max(1);
        info!("Scheduler running: refresh every {}h", hours);

        let mut refresh_interval = interval(Duration::from_secs(u64::from(hours) * 60 * 60));
        // The first tick completes immediately; startup refreshes are opt-in.
        refresh_interval.tick().await;

        loop {
            tokio::select! {
                _ = refresh_interval.tick() => {
                    if !*self.running.read().await {
                        break;
                    }
                    let _ = run_job(self.target.as_ref()).await;
                }
                () = self.shutdown.notified() => break,
            }
        }

        Ok(())
    }

    async fn wait_for_stop(&self) {
        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::select! {
                () = self.shutdown.notified() => {}
                () = tokio::time::sleep(Duration::from_secs(1)) => {}
            }
        }
    }

    /// Runs the target once, right away, independent of the timer.
    pub async fn trigger_now(&self) -> Result<()> {
        run_job(self.target.as_ref()).await
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
        self.shutdown.notify_one();
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}

async fn run_job(target: &dyn Refreshable) -> Result<()> {
    let job_name = target.job_name();
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name, "Starting scheduled job");

    let result = target.run_refresh().await;
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match &result {
        Ok(()) => info!(event = "job_finished", job_name, duration_ms, "Scheduled job finished"),
        Err(e) => error!(event = "job_failed", job_name, duration_ms, error = %e, "Scheduled job failed"),
    }

    result
}
