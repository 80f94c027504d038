//! Engagement feedback processor.
//!
//! Each cycle:
//! 1. Pull every campaign summary and its results from the backend
//! 2. Derive one `EngagementRecord` per recipient per campaign
//! 3. Keep recipients who clicked, one per email address
//! 4. Send each of them a follow-up notice
//!
//! No record of who was notified survives the cycle.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use super::engagement::{EngagementRecord, FunnelSummary, derive_records};
use super::notice::NoticeMailer;
use crate::backend::PhishingBackend;
use crate::error::BackendError;
use crate::scheduler::ShutdownSignal;

/// Counts for one feedback cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct FeedbackReport {
    pub funnel: FunnelSummary,
    /// Distinct clicked recipients.
    pub candidates: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct FeedbackProcessor {
    backend: Arc<dyn PhishingBackend>,
    mailer: Arc<dyn NoticeMailer>,
    shutdown: ShutdownSignal,
}

impl FeedbackProcessor {
    pub fn new(
        backend: Arc<dyn PhishingBackend>,
        mailer: Arc<dyn NoticeMailer>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            backend,
            mailer,
            shutdown,
        }
    }

    /// All engagement records across every campaign on the backend.
    ///
    /// A campaign whose results cannot be read is skipped.
    pub async fn collect_records(&self) -> Result<Vec<EngagementRecord>, BackendError> {
        let summaries = self.backend.campaign_summaries().await?;
        let mut records = Vec::new();

        for summary in &summaries {
            match self.backend.campaign_results(summary.id).await {
                Ok(results) => records.extend(derive_records(summary, &results)),
                Err(e) => warn!(
                    campaign_id = summary.id,
                    campaign = %summary.name,
                    error = %e,
                    "Failed to fetch campaign results"
                ),
            }
        }
        Ok(records)
    }

    pub async fn run_cycle(&self) -> Result<FeedbackReport, BackendError> {
        let records = self.collect_records().await?;
        let funnel = FunnelSummary::from_records(&records);
        info!(
            records = funnel.records,
            sent = funnel.sent,
            opened = funnel.opened,
            clicked = funnel.clicked,
            submitted_data = funnel.submitted_data,
            reported = funnel.reported,
            click_rate = funnel.click_rate(),
            "Engagement funnel"
        );

        let candidates = notice_candidates(&records);
        let mut report = FeedbackReport {
            funnel,
            candidates: candidates.len(),
            ..FeedbackReport::default()
        };

        if candidates.is_empty() {
            info!("No recipients clicked, no notices to send");
            return Ok(report);
        }

        for record in candidates {
            if self.shutdown.is_triggered() {
                info!(
                    remaining = report.candidates - report.sent - report.failed,
                    "Stop requested, ending feedback cycle early"
                );
                break;
            }

            match self.mailer.send_notice(record).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    error!(email = %record.email, error = %e, "Failed to send feedback notice");
                    report.failed += 1;
                }
            }
        }

        info!(
            candidates = report.candidates,
            sent = report.sent,
            failed = report.failed,
            "Feedback cycle finished"
        );
        Ok(report)
    }

    /// Spawn the periodic loop. The first cycle runs one `period` after start.
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(period_secs = period.as_secs(), "Feedback processor started");

            let mut tick = tokio::time::interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tick.tick() => {}
                    _ = self.shutdown.wait() => {}
                }

                if self.shutdown.is_triggered() {
                    info!("Feedback processor shutting down");
                    return;
                }

                if let Err(e) = self.run_cycle().await {
                    error!(error = %e, "Feedback cycle failed");
                }
            }
        })
    }
}

/// Clicked records, first occurrence per email.
fn notice_candidates(records: &[EngagementRecord]) -> Vec<&EngagementRecord> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| r.clicked)
        .filter(|r| seen.insert(r.email_key()))
        .collect()
}
