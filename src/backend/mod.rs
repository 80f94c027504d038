//! Phishing-simulation backend.
//!
//! The backend owns five resource types (sender profiles, pages, templates,
//! groups, campaigns) plus read-only campaign summaries and result timelines.
//! `PhishingBackend` is the seam; `GophishClient` talks to the real REST API.

pub mod gophish;
pub mod submission;

#[cfg(test)]
pub(crate) mod mock;

pub use gophish::GophishClient;
pub use submission::{PurgeReport, SubmissionCoordinator, SubmissionResult, purge_all};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::campaign::model::{
    CampaignDefinition, EmailTemplate, LandingPage, SenderProfile, TargetGroup,
};
use crate::error::{ArtifactKind, BackendError};

/// Backend-assigned object id.
pub type ObjectId = i64;

/// Minimal view of any backend object, as returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendObject {
    pub id: ObjectId,
    #[serde(default)]
    pub name: String,
}

/// Aggregate per-campaign stats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub sent: u64,
    #[serde(default)]
    pub opened: u64,
    #[serde(default)]
    pub clicked: u64,
    #[serde(default)]
    pub submitted_data: u64,
    #[serde(default)]
    pub email_reported: u64,
    #[serde(default)]
    pub error: u64,
}

/// One entry of the campaigns-summary endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub stats: CampaignStats,
}

/// Per-target result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reported: bool,
}

/// One timeline event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub time: String,
    pub message: String,
    #[serde(default)]
    pub details: String,
}

/// Results endpoint payload for one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignResults {
    pub id: ObjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Vec<ResultRow>,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
}

#[async_trait]
pub trait PhishingBackend: Send + Sync {
    async fn create_sender_profile(&self, profile: &SenderProfile) -> Result<ObjectId, BackendError>;

    async fn create_page(&self, page: &LandingPage) -> Result<ObjectId, BackendError>;

    async fn create_template(&self, template: &EmailTemplate) -> Result<ObjectId, BackendError>;

    /// Rename an existing template in place.
    async fn rename_template(&self, id: ObjectId, name: &str) -> Result<(), BackendError>;

    async fn create_group(&self, group: &TargetGroup) -> Result<ObjectId, BackendError>;

    async fn create_campaign(&self, campaign: &CampaignDefinition) -> Result<ObjectId, BackendError>;

    async fn list(&self, kind: ArtifactKind) -> Result<Vec<BackendObject>, BackendError>;

    async fn delete(&self, kind: ArtifactKind, id: ObjectId) -> Result<(), BackendError>;

    async fn campaign_summaries(&self) -> Result<Vec<CampaignSummary>, BackendError>;

    async fn campaign_results(&self, campaign_id: ObjectId) -> Result<CampaignResults, BackendError>;
}
