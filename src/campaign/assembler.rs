//! Campaign set assembler: runs the blueprint builder over a recipient list.
//!
//! Recipients are processed sequentially in list order so generative
//! providers see one request at a time.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use super::blueprint::BlueprintBuilder;
use super::model::{BlueprintFailure, CampaignSet, PromptSet, Recipient, SenderCredentials, TopicCatalog};
use crate::scheduler::ShutdownSignal;

pub struct CampaignAssembler {
    builder: Arc<BlueprintBuilder>,
}

impl CampaignAssembler {
    pub fn new(builder: Arc<BlueprintBuilder>) -> Self {
        Self { builder }
    }

    /// Build one blueprint per recipient.
    ///
    /// Failed recipients are recorded in [`CampaignSet::failures`]; later
    /// duplicates of an email already in the set are skipped.
    pub async fn assemble(
        &self,
        recipients: &[Recipient],
        topics: &TopicCatalog,
        prompts: &PromptSet,
        credentials: &SenderCredentials,
    ) -> CampaignSet {
        self.assemble_until(recipients, topics, prompts, credentials, None)
            .await
    }

    /// Like [`assemble`](Self::assemble), but stops before the next recipient
    /// once `shutdown` is triggered.
    pub async fn assemble_until(
        &self,
        recipients: &[Recipient],
        topics: &TopicCatalog,
        prompts: &PromptSet,
        credentials: &SenderCredentials,
        shutdown: Option<&ShutdownSignal>,
    ) -> CampaignSet {
        let mut set = CampaignSet::default();
        let mut seen: HashSet<String> = HashSet::with_capacity(recipients.len());

        for (index, recipient) in recipients.iter().enumerate() {
            if shutdown.is_some_and(ShutdownSignal::is_triggered) {
                info!(
                    remaining = recipients.len() - index,
                    "Stop requested, ending assembly early"
                );
                break;
            }

            let key = recipient.email_key();
            if !seen.insert(key) {
                warn!(
                    recipient_id = recipient.id,
                    email = %recipient.email,
                    "Duplicate recipient email, skipping"
                );
                continue;
            }

            match self
                .builder
                .build(recipient, topics, prompts, credentials)
                .await
            {
                Ok(blueprint) => set.blueprints.push(blueprint),
                Err(e) => {
                    warn!(
                        recipient_id = recipient.id,
                        email = %recipient.email,
                        error = %e,
                        "Blueprint aborted"
                    );
                    set.failures.push(BlueprintFailure {
                        recipient_id: recipient.id,
                        email: recipient.email.clone(),
                        error: e,
                    });
                }
            }
        }

        info!(
            recipients = recipients.len(),
            built = set.blueprints.len(),
            failed = set.failures.len(),
            "Campaign set assembled"
        );
        set
    }
}
