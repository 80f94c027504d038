//! Campaign scheduler: periodic fetch → assemble → submit.
//!
//! State machine is `Idle → Running → Idle`. A trigger that arrives while a
//! cycle is running is skipped, whether it comes from the interval or from
//! [`CampaignScheduler::run_once`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::backend::SubmissionCoordinator;
use crate::campaign::model::{PromptSet, Recipient, SenderCredentials, TopicCatalog};
use crate::campaign::CampaignAssembler;
use crate::directory::RecipientDirectory;
use crate::error::{DirectoryError, Error, Result};

/// Cooperative stop flag shared by the background loops.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<ShutdownInner>,
}

#[derive(Default)]
struct ShutdownInner {
    triggered: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.inner.triggered.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub async fn wait(&self) {
        let notified = self.inner.notify.notified();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Counts for one completed cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub recipients: usize,
    pub assembled: usize,
    pub failed_blueprints: usize,
    /// Blueprints whose five artifacts were all accepted.
    pub submitted: usize,
    pub partially_submitted: usize,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle was already running.
    Skipped,
    Failed(Error),
}

/// Static inputs reused by every cycle.
pub struct CampaignInputs {
    pub topics: TopicCatalog,
    pub prompts: PromptSet,
    pub credentials: SenderCredentials,
}

pub struct CampaignScheduler {
    directory: Arc<dyn RecipientDirectory>,
    assembler: Arc<CampaignAssembler>,
    coordinator: Arc<SubmissionCoordinator>,
    inputs: CampaignInputs,
    clear_directory_after_launch: bool,
    running: AtomicBool,
    shutdown: ShutdownSignal,
}

/// Returns the scheduler to `Idle` when the cycle ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl CampaignScheduler {
    pub fn new(
        directory: Arc<dyn RecipientDirectory>,
        assembler: Arc<CampaignAssembler>,
        coordinator: Arc<SubmissionCoordinator>,
        inputs: CampaignInputs,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            directory,
            assembler,
            coordinator,
            inputs,
            clear_directory_after_launch: false,
            running: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Empty the directory after each launch. Fails if the directory cannot clear.
    pub fn with_clear_directory_after_launch(
        mut self,
        clear: bool,
    ) -> std::result::Result<Self, DirectoryError> {
        if clear && !self.directory.supports_clear() {
            return Err(DirectoryError::Unsupported("clearing recipients after launch"));
        }
        self.clear_directory_after_launch = clear;
        Ok(self)
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::SeqCst) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Run one cycle now unless one is already in flight.
    pub async fn run_once(&self) -> CycleOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Campaign cycle already running, skipping trigger");
            return CycleOutcome::Skipped;
        }
        let _guard = RunningGuard(&self.running);

        match self.run_cycle().await {
            Ok(report) => CycleOutcome::Completed(report),
            Err(e) => {
                error!(error = %e, "Campaign cycle failed");
                CycleOutcome::Failed(e)
            }
        }
    }

    async fn run_cycle(&self) -> Result<CycleReport> {
        let entries = self.directory.fetch_all().await?;
        let recipients = Recipient::enumerate(entries);
        let mut report = CycleReport {
            recipients: recipients.len(),
            ..CycleReport::default()
        };

        if recipients.is_empty() {
            info!("Recipient directory is empty, nothing to launch");
            return Ok(report);
        }

        info!(recipients = recipients.len(), "Campaign cycle started");

        let set = self
            .assembler
            .assemble_until(
                &recipients,
                &self.inputs.topics,
                &self.inputs.prompts,
                &self.inputs.credentials,
                Some(&self.shutdown),
            )
            .await;
        report.assembled = set.len();
        report.failed_blueprints = set.failures.len();

        if self.shutdown.is_triggered() {
            warn!(
                assembled = report.assembled,
                "Stop requested, assembled blueprints will not be submitted"
            );
            return Ok(report);
        }

        let results = self.coordinator.submit(&set).await;
        report.submitted = results.iter().filter(|r| r.is_complete()).count();
        report.partially_submitted = results.len() - report.submitted;

        if self.clear_directory_after_launch {
            if let Err(e) = self.directory.mark_processed().await {
                warn!(error = %e, "Failed to clear recipient directory");
            }
        }

        info!(
            recipients = report.recipients,
            assembled = report.assembled,
            failed_blueprints = report.failed_blueprints,
            submitted = report.submitted,
            partially_submitted = report.partially_submitted,
            "Campaign cycle finished"
        );
        Ok(report)
    }

    /// Spawn the periodic loop. The first cycle runs one `period` after start.
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(period_secs = period.as_secs(), "Campaign scheduler started");

            let mut tick = tokio::time::interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tick.tick() => {}
                    _ = self.shutdown.wait() => {}
                }

                if self.shutdown.is_triggered() {
                    info!("Campaign scheduler shutting down");
                    return;
                }

                // Outcomes are already logged inside run_once.
                let _ = self.run_once().await;
            }
        })
    }
}
