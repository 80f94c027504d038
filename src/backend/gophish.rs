//! GoPhish REST client.
//!
//! Campaigns reference their group, template, page and sending profile by
//! name, so those must already exist when the campaign is posted. Local
//! artifact ids are never sent; the server assigns its own.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    BackendObject, CampaignResults, CampaignSummary, ObjectId, PhishingBackend,
};
use crate::campaign::model::{
    CampaignDefinition, EmailTemplate, LandingPage, SenderProfile, TargetGroup,
};
use crate::config::BackendConfig;
use crate::error::{ArtifactKind, BackendError, ConfigError};

pub struct GophishClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl GophishClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "GOPHISH_URL".to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn resource(kind: ArtifactKind) -> &'static str {
        match kind {
            ArtifactKind::SenderProfile => "smtp",
            ArtifactKind::LandingPage => "pages",
            ArtifactKind::EmailTemplate => "templates",
            ArtifactKind::TargetGroup => "groups",
            ArtifactKind::Campaign => "campaigns",
        }
    }

    fn collection_url(&self, kind: ArtifactKind) -> String {
        format!("{}/api/{}/", self.base_url, Self::resource(kind))
    }

    fn item_url(&self, kind: ArtifactKind, id: ObjectId) -> String {
        format!("{}/api/{}/{}", self.base_url, Self::resource(kind), id)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(self.api_key.expose_secret())
    }

    async fn send(&self, builder: RequestBuilder, endpoint: &str) -> Result<Response, BackendError> {
        let response = builder.send().await.map_err(|e| BackendError::Connection {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T, BackendError> {
        response.json().await.map_err(|e| BackendError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BackendError> {
        let response = self.send(self.request(Method::GET, url), url).await?;
        Self::decode(response, url).await
    }

    async fn post_object<P: Serialize + Sync>(
        &self,
        kind: ArtifactKind,
        payload: &P,
    ) -> Result<ObjectId, BackendError> {
        let url = self.collection_url(kind);
        let response = self
            .send(self.request(Method::POST, &url).json(payload), &url)
            .await?;
        let created: BackendObject = Self::decode(response, &url).await?;
        debug!(kind = %kind, id = created.id, name = %created.name, "Backend object created");
        Ok(created.id)
    }
}

#[async_trait]
impl PhishingBackend for GophishClient {
    async fn create_sender_profile(&self, profile: &SenderProfile) -> Result<ObjectId, BackendError> {
        let payload = SmtpPayload {
            name: &profile.name,
            interface_type: "SMTP",
            host: &profile.host,
            username: &profile.username,
            password: profile.password.expose_secret(),
            from_address: &profile.from_address,
            ignore_cert_errors: profile.ignore_cert_errors,
        };
        self.post_object(ArtifactKind::SenderProfile, &payload).await
    }

    async fn create_page(&self, page: &LandingPage) -> Result<ObjectId, BackendError> {
        let payload = PagePayload {
            name: &page.name,
            html: &page.html,
            capture_credentials: page.capture_credentials,
            capture_passwords: page.capture_passwords,
            redirect_url: &page.redirect_url,
        };
        self.post_object(ArtifactKind::LandingPage, &payload).await
    }

    async fn create_template(&self, template: &EmailTemplate) -> Result<ObjectId, BackendError> {
        let payload = TemplatePayload {
            name: &template.name,
            subject: &template.subject,
            html: &template.html,
            envelope_sender: &template.envelope_sender,
        };
        self.post_object(ArtifactKind::EmailTemplate, &payload).await
    }

    async fn rename_template(&self, id: ObjectId, name: &str) -> Result<(), BackendError> {
        let url = self.item_url(ArtifactKind::EmailTemplate, id);
        let mut template: serde_json::Value = self.get_json(&url).await?;
        template["name"] = serde_json::Value::String(name.to_string());
        self.send(self.request(Method::PUT, &url).json(&template), &url)
            .await?;
        Ok(())
    }

    async fn create_group(&self, group: &TargetGroup) -> Result<ObjectId, BackendError> {
        let payload = GroupPayload {
            name: &group.name,
            targets: group
                .targets
                .iter()
                .map(|t| TargetPayload {
                    first_name: &t.first_name,
                    last_name: &t.last_name,
                    email: &t.email,
                    position: &t.position,
                })
                .collect(),
        };
        self.post_object(ArtifactKind::TargetGroup, &payload).await
    }

    async fn create_campaign(&self, campaign: &CampaignDefinition) -> Result<ObjectId, BackendError> {
        let payload = CampaignPayload {
            name: &campaign.name,
            template: NameRef {
                name: &campaign.template_name,
            },
            page: NameRef {
                name: &campaign.page_name,
            },
            smtp: NameRef {
                name: &campaign.sender_profile_name,
            },
            url: &campaign.url,
            groups: vec![NameRef {
                name: &campaign.group_name,
            }],
        };
        self.post_object(ArtifactKind::Campaign, &payload).await
    }

    async fn list(&self, kind: ArtifactKind) -> Result<Vec<BackendObject>, BackendError> {
        self.get_json(&self.collection_url(kind)).await
    }

    async fn delete(&self, kind: ArtifactKind, id: ObjectId) -> Result<(), BackendError> {
        let url = self.item_url(kind, id);
        self.send(self.request(Method::DELETE, &url), &url).await?;
        Ok(())
    }

    async fn campaign_summaries(&self) -> Result<Vec<CampaignSummary>, BackendError> {
        let url = format!("{}/api/campaigns/summary", self.base_url);
        let summaries: SummariesResponse = self.get_json(&url).await?;
        Ok(summaries.campaigns)
    }

    async fn campaign_results(&self, campaign_id: ObjectId) -> Result<CampaignResults, BackendError> {
        let url = format!("{}/api/campaigns/{}/results", self.base_url, campaign_id);
        self.get_json(&url).await
    }
}

// ── Wire payloads ───────────────────────────────────────────────────

#[derive(Serialize)]
struct SmtpPayload<'a> {
    name: &'a str,
    interface_type: &'a str,
    host: &'a str,
    username: &'a str,
    password: &'a str,
    from_address: &'a str,
    ignore_cert_errors: bool,
}

#[derive(Serialize)]
struct PagePayload<'a> {
    name: &'a str,
    html: &'a str,
    capture_credentials: bool,
    capture_passwords: bool,
    redirect_url: &'a str,
}

#[derive(Serialize)]
struct TemplatePayload<'a> {
    name: &'a str,
    subject: &'a str,
    html: &'a str,
    envelope_sender: &'a str,
}

#[derive(Serialize)]
struct TargetPayload<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    position: &'a str,
}

#[derive(Serialize)]
struct GroupPayload<'a> {
    name: &'a str,
    targets: Vec<TargetPayload<'a>>,
}

#[derive(Serialize)]
struct NameRef<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct CampaignPayload<'a> {
    name: &'a str,
    template: NameRef<'a>,
    page: NameRef<'a>,
    smtp: NameRef<'a>,
    url: &'a str,
    groups: Vec<NameRef<'a>>,
}

#[derive(Deserialize)]
struct SummariesResponse {
    #[serde(default)]
    campaigns: Vec<CampaignSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::campaign::model::CampaignBlueprint;

    fn client(server: &MockServer) -> GophishClient {
        GophishClient::new(&BackendConfig {
            base_url: format!("{}/", server.uri()),
            api_key: SecretString::from("gp-key"),
            accept_invalid_certs: true,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn campaign_references_artifacts_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/campaigns/"))
            .and(header("authorization", "Bearer gp-key"))
            .and(body_partial_json(serde_json::json!({
                "name": "Doe_Alice",
                "template": {"name": "Doe_Alice"},
                "page": {"name": "Doe_Alice"},
                "smtp": {"name": "Doe_Alice"},
                "groups": [{"name": "Doe_Alice"}],
                "url": "http://127.0.0.1/"
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 42, "name": "Doe_Alice"})),
            )
            .mount(&server)
            .await;

        let blueprint = CampaignBlueprint::sample(0, "Doe_Alice", "alice@x.com");
        let id = client(&server)
            .create_campaign(&blueprint.campaign)
            .await
            .unwrap();
        assert_eq!(id, 42);
    }

    #[tokio::test]
    async fn sender_profile_payload_carries_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/smtp/"))
            .and(body_partial_json(serde_json::json!({
                "interface_type": "SMTP",
                "username": "u",
                "password": "p",
                "from_address": "s@x.com",
                "ignore_cert_errors": true
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 7})))
            .mount(&server)
            .await;

        let blueprint = CampaignBlueprint::sample(0, "n", "a@x.com");
        let id = client(&server)
            .create_sender_profile(&blueprint.sender_profile)
            .await
            .unwrap();
        assert_eq!(id, 7);
    }

    #[tokio::test]
    async fn rejected_create_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pages/"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Page name already in use"))
            .mount(&server)
            .await;

        let blueprint = CampaignBlueprint::sample(0, "n", "a@x.com");
        let err = client(&server)
            .create_page(&blueprint.landing_page)
            .await
            .unwrap_err();
        match err {
            BackendError::Status { status, body, .. } => {
                assert_eq!(status, 400);
                assert!(body.contains("already in use"));
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rename_puts_back_full_template() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/templates/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 3, "name": "Subject", "subject": "Subject", "html": "<p/>"
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/templates/3"))
            .and(body_partial_json(serde_json::json!({
                "id": 3, "name": "Doe_Alice", "subject": "Subject"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 3})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).rename_template(3, "Doe_Alice").await.unwrap();
    }

    #[tokio::test]
    async fn reads_summaries_and_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/campaigns/summary"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total": 1,
                "campaigns": [{
                    "id": 5, "name": "c", "status": "In progress",
                    "stats": {"total": 1, "sent": 1, "opened": 1, "clicked": 1}
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/campaigns/5/results"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 5, "name": "c", "status": "In progress",
                "results": [{"id": "rid", "email": "bob@x.com", "first_name": "Bob",
                             "last_name": "Roe", "status": "Clicked Link", "reported": false}],
                "timeline": [
                    {"email": "", "time": "2024-01-01T10:00:00Z", "message": "Campaign Created"},
                    {"email": "bob@x.com", "time": "2024-01-01T10:01:00Z", "message": "Email Sent"}
                ]
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let summaries = client.campaign_summaries().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].stats.clicked, 1);

        let results = client.campaign_results(5).await.unwrap();
        assert_eq!(results.results[0].first_name, "Bob");
        assert_eq!(results.timeline.len(), 2);
        assert_eq!(results.timeline[1].message, "Email Sent");
    }

    #[tokio::test]
    async fn list_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/groups/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "name": "a", "targets": []},
                {"id": 2, "name": "b", "targets": []}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/groups/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let groups = client.list(ArtifactKind::TargetGroup).await.unwrap();
        assert_eq!(groups.iter().map(|g| g.id).collect::<Vec<_>>(), vec![1, 2]);
        client.delete(ArtifactKind::TargetGroup, 2).await.unwrap();
    }
}
