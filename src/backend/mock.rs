//! In-memory backend that records every call, for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BackendObject, CampaignResults, CampaignSummary, ObjectId, PhishingBackend};
use crate::campaign::model::{
    CampaignDefinition, EmailTemplate, LandingPage, SenderProfile, TargetGroup,
};
use crate::error::{ArtifactKind, BackendError};

#[derive(Default)]
pub(crate) struct MockBackend {
    /// `(kind, name)` per create call, in call order.
    pub calls: Mutex<Vec<(ArtifactKind, String)>>,
    pub deleted: Mutex<Vec<(ArtifactKind, ObjectId)>>,
    objects: Mutex<HashMap<ArtifactKind, Vec<BackendObject>>>,
    /// Creates of this kind whose name contains the marker are rejected.
    reject: Mutex<Vec<(ArtifactKind, String)>>,
    next_id: Mutex<ObjectId>,
    pub summaries: Mutex<Vec<CampaignSummary>>,
    pub results: Mutex<HashMap<ObjectId, CampaignResults>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&self, kind: ArtifactKind, name_marker: &str) {
        self.reject
            .lock()
            .unwrap()
            .push((kind, name_marker.to_string()));
    }

    pub fn with_campaign(&self, results: CampaignResults) {
        self.summaries.lock().unwrap().push(CampaignSummary {
            id: results.id,
            name: results.name.clone(),
            status: results.status.clone(),
            stats: Default::default(),
        });
        self.results.lock().unwrap().insert(results.id, results);
    }

    pub fn kinds(&self) -> Vec<ArtifactKind> {
        self.calls.lock().unwrap().iter().map(|(k, _)| *k).collect()
    }

    pub fn stored(&self, kind: ArtifactKind) -> Vec<BackendObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    fn create(&self, kind: ArtifactKind, name: &str) -> Result<ObjectId, BackendError> {
        self.calls.lock().unwrap().push((kind, name.to_string()));

        let rejected = self
            .reject
            .lock()
            .unwrap()
            .iter()
            .any(|(k, marker)| *k == kind && name.contains(marker.as_str()));
        if rejected {
            return Err(BackendError::Status {
                endpoint: format!("mock/{kind}"),
                status: 400,
                body: "rejected".to_string(),
            });
        }

        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            *next
        };
        self.objects
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push(BackendObject {
                id,
                name: name.to_string(),
            });
        Ok(id)
    }
}

#[async_trait]
impl PhishingBackend for MockBackend {
    async fn create_sender_profile(&self, profile: &SenderProfile) -> Result<ObjectId, BackendError> {
        self.create(ArtifactKind::SenderProfile, &profile.name)
    }

    async fn create_page(&self, page: &LandingPage) -> Result<ObjectId, BackendError> {
        self.create(ArtifactKind::LandingPage, &page.name)
    }

    async fn create_template(&self, template: &EmailTemplate) -> Result<ObjectId, BackendError> {
        self.create(ArtifactKind::EmailTemplate, &template.name)
    }

    async fn rename_template(&self, id: ObjectId, name: &str) -> Result<(), BackendError> {
        let mut objects = self.objects.lock().unwrap();
        let template = objects
            .get_mut(&ArtifactKind::EmailTemplate)
            .and_then(|list| list.iter_mut().find(|o| o.id == id));
        match template {
            Some(object) => {
                object.name = name.to_string();
                Ok(())
            }
            None => Err(BackendError::Status {
                endpoint: format!("mock/templates/{id}"),
                status: 404,
                body: "not found".to_string(),
            }),
        }
    }

    async fn create_group(&self, group: &TargetGroup) -> Result<ObjectId, BackendError> {
        self.create(ArtifactKind::TargetGroup, &group.name)
    }

    async fn create_campaign(&self, campaign: &CampaignDefinition) -> Result<ObjectId, BackendError> {
        self.create(ArtifactKind::Campaign, &campaign.name)
    }

    async fn list(&self, kind: ArtifactKind) -> Result<Vec<BackendObject>, BackendError> {
        Ok(self.stored(kind))
    }

    async fn delete(&self, kind: ArtifactKind, id: ObjectId) -> Result<(), BackendError> {
        self.deleted.lock().unwrap().push((kind, id));
        if let Some(list) = self.objects.lock().unwrap().get_mut(&kind) {
            list.retain(|o| o.id != id);
        }
        Ok(())
    }

    async fn campaign_summaries(&self) -> Result<Vec<CampaignSummary>, BackendError> {
        Ok(self.summaries.lock().unwrap().clone())
    }

    async fn campaign_results(&self, campaign_id: ObjectId) -> Result<CampaignResults, BackendError> {
        self.results
            .lock()
            .unwrap()
            .get(&campaign_id)
            .cloned()
            .ok_or_else(|| BackendError::Status {
                endpoint: format!("mock/campaigns/{campaign_id}/results"),
                status: 404,
                body: "not found".to_string(),
            })
    }
}
