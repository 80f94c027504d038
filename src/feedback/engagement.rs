//! Engagement records derived from backend result timelines.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::backend::{CampaignResults, CampaignSummary, ObjectId, TimelineEvent};

/// Timeline messages the funnel cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementEvent {
    EmailSent,
    EmailOpened,
    ClickedLink,
    SubmittedData,
    EmailReported,
}

impl EngagementEvent {
    pub fn from_message(message: &str) -> Option<Self> {
        match message.trim() {
            "Email Sent" => Some(Self::EmailSent),
            "Email Opened" => Some(Self::EmailOpened),
            "Clicked Link" => Some(Self::ClickedLink),
            "Submitted Data" => Some(Self::SubmittedData),
            "Email Reported" => Some(Self::EmailReported),
            _ => None,
        }
    }
}

/// One recipient's outcome in one campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementRecord {
    pub campaign_id: ObjectId,
    pub campaign_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub sent: bool,
    pub opened: bool,
    pub clicked: bool,
    pub submitted_data: bool,
    pub reported: bool,
}

impl EngagementRecord {
    fn new(summary: &CampaignSummary, email: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            campaign_id: summary.id,
            campaign_name: summary.name.clone(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            sent: false,
            opened: false,
            clicked: false,
            submitted_data: false,
            reported: false,
        }
    }

    fn apply(&mut self, event: EngagementEvent) {
        match event {
            EngagementEvent::EmailSent => self.sent = true,
            EngagementEvent::EmailOpened => self.opened = true,
            EngagementEvent::ClickedLink => self.clicked = true,
            EngagementEvent::SubmittedData => self.submitted_data = true,
            EngagementEvent::EmailReported => self.reported = true,
        }
    }

    /// `submitted_data ⇒ clicked ⇒ opened ⇒ sent`.
    pub fn is_monotonic(&self) -> bool {
        (!self.submitted_data || self.clicked)
            && (!self.clicked || self.opened)
            && (!self.opened || self.sent)
    }

    /// Backfill earlier funnel stages implied by later ones.
    /// Returns whether anything changed.
    pub fn normalize(&mut self) -> bool {
        let before = (self.sent, self.opened, self.clicked);
        self.clicked |= self.submitted_data;
        self.opened |= self.clicked;
        self.sent |= self.opened;
        before != (self.sent, self.opened, self.clicked)
    }

    /// Email normalised for deduplication.
    pub fn email_key(&self) -> String {
        self.email.trim().to_ascii_lowercase()
    }
}

fn event_time(event: &TimelineEvent) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&event.time)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Join a campaign summary with its result rows and timeline.
///
/// Events are replayed in timestamp order; unparseable timestamps sort first
/// and ties keep timeline order. Events for emails with no result row are
/// ignored.
pub fn derive_records(summary: &CampaignSummary, results: &CampaignResults) -> Vec<EngagementRecord> {
    let mut records: Vec<EngagementRecord> = results
        .results
        .iter()
        .map(|row| {
            let mut record = EngagementRecord::new(summary, &row.email, &row.first_name, &row.last_name);
            record.reported = row.reported;
            record
        })
        .collect();

    let index: HashMap<String, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.email_key(), i))
        .collect();

    let mut timeline: Vec<&TimelineEvent> = results.timeline.iter().collect();
    timeline.sort_by_key(|event| event_time(event));

    for event in timeline {
        let Some(kind) = EngagementEvent::from_message(&event.message) else {
            continue;
        };
        let key = event.email.trim().to_ascii_lowercase();
        if let Some(&i) = index.get(&key) {
            records[i].apply(kind);
        }
    }

    for record in &mut records {
        if record.normalize() {
            debug!(
                campaign_id = record.campaign_id,
                email = %record.email,
                "Timeline skipped funnel stages, backfilled"
            );
        }
    }

    records
}

/// Funnel counts across all records of a cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FunnelSummary {
    pub records: usize,
    pub sent: usize,
    pub opened: usize,
    pub clicked: usize,
    pub submitted_data: usize,
    pub reported: usize,
}

impl FunnelSummary {
    pub fn from_records(records: &[EngagementRecord]) -> Self {
        records.iter().fold(Self::default(), |mut acc, r| {
            acc.records += 1;
            acc.sent += usize::from(r.sent);
            acc.opened += usize::from(r.opened);
            acc.clicked += usize::from(r.clicked);
            acc.submitted_data += usize::from(r.submitted_data);
            acc.reported += usize::from(r.reported);
            acc
        })
    }

    /// Clicked over sent, 0.0 when nothing was sent.
    pub fn click_rate(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            self.clicked as f64 / self.sent as f64
        }
    }
}
