//! Submission coordinator: pushes a campaign set to the backend.
//!
//! Artifacts go up in the backend's dependency order. There is no rollback;
//! orphaned objects are left for [`purge_all`].

use std::sync::Arc;

use tracing::{error, info, warn};

use super::{ObjectId, PhishingBackend};
use crate::campaign::model::{CampaignBlueprint, CampaignSet};
use crate::error::{ArtifactKind, BackendError, SubmissionError};

/// Outcome of submitting one blueprint.
#[derive(Debug)]
pub struct SubmissionResult {
    pub recipient_id: usize,
    pub email: String,
    /// Backend ids for the artifacts that were accepted, in submission order.
    pub accepted: Vec<(ArtifactKind, ObjectId)>,
    pub errors: Vec<SubmissionError>,
}

impl SubmissionResult {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn backend_id(&self, kind: ArtifactKind) -> Option<ObjectId> {
        self.accepted
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, id)| *id)
    }
}

pub struct SubmissionCoordinator {
    backend: Arc<dyn PhishingBackend>,
}

impl SubmissionCoordinator {
    pub fn new(backend: Arc<dyn PhishingBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn PhishingBackend> {
        &self.backend
    }

    /// Submit every blueprint in `set`, one recipient at a time.
    pub async fn submit(&self, set: &CampaignSet) -> Vec<SubmissionResult> {
        let mut results = Vec::with_capacity(set.len());
        for blueprint in &set.blueprints {
            results.push(self.submit_blueprint(blueprint).await);
        }

        let complete = results.iter().filter(|r| r.is_complete()).count();
        info!(
            blueprints = results.len(),
            complete,
            partial = results.len() - complete,
            "Campaign set submitted"
        );
        results
    }

    async fn submit_blueprint(&self, blueprint: &CampaignBlueprint) -> SubmissionResult {
        let mut result = SubmissionResult {
            recipient_id: blueprint.id(),
            email: blueprint.recipient.email.clone(),
            accepted: Vec::with_capacity(ArtifactKind::SUBMISSION_ORDER.len()),
            errors: Vec::new(),
        };

        for kind in ArtifactKind::SUBMISSION_ORDER {
            match self.submit_artifact(blueprint, kind).await {
                Ok(id) => result.accepted.push((kind, id)),
                Err(source) => {
                    warn!(
                        recipient_id = blueprint.id(),
                        email = %blueprint.recipient.email,
                        artifact = %kind,
                        error = %source,
                        "Artifact submission failed"
                    );
                    result.errors.push(SubmissionError {
                        recipient_id: blueprint.id(),
                        artifact: kind,
                        source,
                    });
                }
            }
        }

        if result.is_complete() {
            info!(
                recipient_id = blueprint.id(),
                campaign = %blueprint.campaign.name,
                "Campaign launched"
            );
        }
        result
    }

    async fn submit_artifact(
        &self,
        blueprint: &CampaignBlueprint,
        kind: ArtifactKind,
    ) -> Result<ObjectId, BackendError> {
        match kind {
            ArtifactKind::SenderProfile => {
                self.backend
                    .create_sender_profile(&blueprint.sender_profile)
                    .await
            }
            ArtifactKind::LandingPage => self.backend.create_page(&blueprint.landing_page).await,
            ArtifactKind::EmailTemplate => self.backend.create_template(&blueprint.template).await,
            ArtifactKind::TargetGroup => self.backend.create_group(&blueprint.group).await,
            ArtifactKind::Campaign => self.backend.create_campaign(&blueprint.campaign).await,
        }
    }
}

/// Counts from a bulk purge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub deleted: usize,
    pub failed: usize,
}

/// Campaigns go first so nothing left references a deleted object.
const PURGE_ORDER: [ArtifactKind; 5] = [
    ArtifactKind::Campaign,
    ArtifactKind::TargetGroup,
    ArtifactKind::EmailTemplate,
    ArtifactKind::LandingPage,
    ArtifactKind::SenderProfile,
];

/// Delete every object of every artifact kind from the backend.
pub async fn purge_all(backend: &dyn PhishingBackend) -> PurgeReport {
    let mut report = PurgeReport::default();

    for kind in PURGE_ORDER {
        let objects = match backend.list(kind).await {
            Ok(objects) => objects,
            Err(e) => {
                error!(artifact = %kind, error = %e, "Failed to list objects for purge");
                report.failed += 1;
                continue;
            }
        };

        for object in objects {
            match backend.delete(kind, object.id).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    warn!(
                        artifact = %kind,
                        id = object.id,
                        name = %object.name,
                        error = %e,
                        "Failed to delete object"
                    );
                    report.failed += 1;
                }
            }
        }
    }

    info!(
        deleted = report.deleted,
        failed = report.failed,
        "Backend purge finished"
    );
    report
}
