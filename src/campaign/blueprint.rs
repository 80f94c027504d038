//! Campaign blueprint builder: one recipient in, five consistent artifacts out.
//!
//! Build order is fixed because later artifacts reference earlier ones:
//! template → group → sender profile → landing page → campaign.

use std::sync::Arc;

use tracing::{debug, info};

use super::model::{
    CampaignBlueprint, CampaignDefinition, EmailTemplate, LandingPage, PromptSet, Recipient,
    SenderCredentials, SenderProfile, Target, TargetGroup, TopicCatalog,
};
use crate::clock::{self, Clock};
use crate::error::BlueprintError;
use crate::llm::ContentGenerator;
use crate::select::Selector;

/// Fixed per-deployment values baked into every blueprint.
#[derive(Debug, Clone)]
pub struct BlueprintDefaults {
    /// SMTP host:port the backend relays lure emails through.
    pub smtp_host: String,
    pub ignore_cert_errors: bool,
    /// Base URL the campaign's tracked links point at.
    pub phish_url: String,
    /// Where the landing page sends people after they submit.
    pub redirect_url: String,
}

impl Default for BlueprintDefaults {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com:465".to_string(),
            ignore_cert_errors: true,
            phish_url: "http://127.0.0.1/".to_string(),
            redirect_url: "https://r.mtdv.me/you-got-phished".to_string(),
        }
    }
}

pub struct BlueprintBuilder {
    generator: Arc<ContentGenerator>,
    topic_selector: Arc<dyn Selector>,
    clock: Arc<dyn Clock>,
    defaults: BlueprintDefaults,
}

impl BlueprintBuilder {
    pub fn new(
        generator: Arc<ContentGenerator>,
        topic_selector: Arc<dyn Selector>,
        clock: Arc<dyn Clock>,
        defaults: BlueprintDefaults,
    ) -> Self {
        Self {
            generator,
            topic_selector,
            clock,
            defaults,
        }
    }

    /// Build the full blueprint for `recipient`.
    ///
    /// Any failure aborts this recipient only; nothing partial is returned.
    pub async fn build(
        &self,
        recipient: &Recipient,
        topics: &TopicCatalog,
        prompts: &PromptSet,
        credentials: &SenderCredentials,
    ) -> Result<CampaignBlueprint, BlueprintError> {
        let id = recipient.id;

        // 1. Topic
        let topic = topics.pick(&recipient.department, self.topic_selector.as_ref())?;

        // 2. Email content
        let content = self
            .generator
            .generate_email(&recipient.department, topic, prompts)
            .await?;

        // 3. Template, then the recipient-specific name
        let mut template = EmailTemplate::create(id, &content);
        template.rename(self.artifact_name(recipient));

        // 4. Group with the single recipient, and a single-use sender profile
        let group = TargetGroup {
            id,
            name: self.artifact_name(recipient),
            targets: vec![Target {
                first_name: recipient.first_name.clone(),
                last_name: recipient.last_name.clone(),
                email: recipient.email.clone(),
                position: recipient.department.clone(),
            }],
        };

        let sender_profile = SenderProfile {
            id,
            name: self.artifact_name(recipient),
            host: self.defaults.smtp_host.clone(),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            from_address: content.sender_email.clone(),
            ignore_cert_errors: self.defaults.ignore_cert_errors,
        };

        // 5. Landing page seeded with the generated email
        let html = self
            .generator
            .generate_landing_page(&content.mail_body, prompts)
            .await?;
        let landing_page = LandingPage {
            id,
            name: self.artifact_name(recipient),
            html,
            capture_credentials: true,
            capture_passwords: true,
            redirect_url: self.defaults.redirect_url.clone(),
        };

        // 6. Campaign
        let campaign = CampaignDefinition {
            id,
            name: self.artifact_name(recipient),
            group_name: group.name.clone(),
            template_name: template.name.clone(),
            page_name: landing_page.name.clone(),
            sender_profile_name: sender_profile.name.clone(),
            url: self.defaults.phish_url.clone(),
        };

        debug!(
            recipient_id = id,
            subject = %template.subject,
            body_len = template.html.len(),
            page_len = landing_page.html.len(),
            "Blueprint content generated"
        );
        info!(
            recipient_id = id,
            email = %recipient.email,
            department = %recipient.department,
            campaign = %campaign.name,
            "Blueprint built"
        );

        Ok(CampaignBlueprint {
            recipient: recipient.clone(),
            sender_profile,
            template,
            landing_page,
            group,
            campaign,
        })
    }

    fn artifact_name(&self, recipient: &Recipient) -> String {
        clock::artifact_name(&recipient.last_name, &recipient.first_name, self.clock.now())
    }
}
