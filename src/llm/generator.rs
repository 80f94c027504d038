//! Content generation adapter: email bodies and landing pages.
//!
//! Picks a provider per call through the injected [`Selector`], renders the
//! prompt templates, and returns structured content. Failures are logged and
//! propagated; the adapter never substitutes empty content.

use std::sync::Arc;

use tracing::{debug, warn};

use super::ContentProvider;
use super::prompts;
use crate::campaign::model::{GeneratedContent, PromptSet, Topic};
use crate::error::GenerationError;
use crate::select::{self, RandomSelector, Selector};

pub struct ContentGenerator {
    providers: Vec<Arc<dyn ContentProvider>>,
    selector: Arc<dyn Selector>,
}

impl ContentGenerator {
    pub fn new(providers: Vec<Arc<dyn ContentProvider>>, selector: Arc<dyn Selector>) -> Self {
        Self {
            providers,
            selector,
        }
    }

    /// Uniform random provider choice.
    pub fn with_random_selection(providers: Vec<Arc<dyn ContentProvider>>) -> Self {
        Self::new(providers, Arc::new(RandomSelector))
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    fn select_provider(&self) -> Result<&Arc<dyn ContentProvider>, GenerationError> {
        select::choose(self.selector.as_ref(), &self.providers).ok_or(GenerationError::NoProviders)
    }

    /// Generate a lure email for `department` around `topic`.
    ///
    /// Subject and sender identity come from the topic, not the generated text.
    pub async fn generate_email(
        &self,
        department: &str,
        topic: &Topic,
        prompts: &PromptSet,
    ) -> Result<GeneratedContent, GenerationError> {
        let provider = self.select_provider()?;
        let system = prompts::email_system_instruction(prompts);
        let user = prompts::email_user_prompt(prompts, department, topic);

        debug!(provider = provider.name(), department, subject = %topic.subject_line, "Generating email");
        let mail_body = run(provider.as_ref(), &system, &user, "email").await?;

        Ok(GeneratedContent {
            mail_body,
            sender_email: topic.sender_email.clone(),
            subject: topic.subject_line.clone(),
            sender_name: topic.sender_display_name.clone(),
        })
    }

    /// Generate landing-page HTML that matches `email_body`.
    pub async fn generate_landing_page(
        &self,
        email_body: &str,
        prompts: &PromptSet,
    ) -> Result<String, GenerationError> {
        let provider = self.select_provider()?;
        let system = prompts::landing_system_instruction(prompts);
        let user = prompts::landing_user_prompt(prompts, email_body);

        debug!(provider = provider.name(), "Generating landing page");
        run(provider.as_ref(), &system, &user, "landing_page").await
    }
}

async fn run(
    provider: &dyn ContentProvider,
    system: &str,
    user: &str,
    kind: &str,
) -> Result<String, GenerationError> {
    let raw = provider.complete(system, user).await.map_err(|e| {
        warn!(provider = provider.name(), kind, error = %e, "Content generation failed");
        e
    })?;

    let content = prompts::strip_code_fence(&raw);
    if content.is_empty() {
        warn!(provider = provider.name(), kind, "Provider returned empty content");
        return Err(GenerationError::EmptyContent {
            provider: provider.name().to_string(),
        });
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::FixedSelector;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Canned {
        name: &'static str,
        reply: Result<String, ()>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl Canned {
        fn ok(name: &'static str, reply: &str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Err(()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ContentProvider for Canned {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            self.reply.clone().map_err(|_| GenerationError::RateLimited {
                provider: self.name.to_string(),
                retry_after: None,
            })
        }
    }

    fn dyn_provider(p: &Arc<Canned>) -> Arc<dyn ContentProvider> {
        p.clone()
    }

    fn prompts() -> PromptSet {
        PromptSet {
            developer_message: "dev {tracker}".into(),
            user_prompt: "for {department} from {sender}: {subject}".into(),
            developer_message_landing_page: "page dev".into(),
            user_prompt_landing_page: "page for {email_body}".into(),
        }
    }

    fn topic() -> Topic {
        Topic {
            subject_line: "T".into(),
            sender_display_name: "S".into(),
            sender_email: "s@x.com".into(),
        }
    }

    #[tokio::test]
    async fn email_identity_comes_from_topic() {
        let provider = Canned::ok("a", "Subject: ignored\n<p>body</p>");
        let generator = ContentGenerator::new(vec![dyn_provider(&provider)], Arc::new(FixedSelector(0)));

        let content = generator.generate_email("HR", &topic(), &prompts()).await.unwrap();
        assert_eq!(content.subject, "T");
        assert_eq!(content.sender_name, "S");
        assert_eq!(content.sender_email, "s@x.com");
        assert!(content.mail_body.contains("<p>body</p>"));

        let seen = provider.seen.lock().unwrap();
        assert!(seen[0].0.contains(prompts::TRACKER_MARKUP));
        assert_eq!(seen[0].1, "for HR from S: T");
    }

    #[tokio::test]
    async fn selector_chooses_provider() {
        let first = Canned::ok("first", "one");
        let second = Canned::ok("second", "two");
        let generator = ContentGenerator::new(
            vec![dyn_provider(&first), dyn_provider(&second)],
            Arc::new(FixedSelector(1)),
        );

        let html = generator.generate_landing_page("<p>x</p>", &prompts()).await.unwrap();
        assert_eq!(html, "two");
        assert!(first.seen.lock().unwrap().is_empty());
        assert_eq!(second.seen.lock().unwrap()[0].1, "page for <p>x</p>");
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let generator = ContentGenerator::new(
            vec![dyn_provider(&Canned::failing("down"))],
            Arc::new(FixedSelector(0)),
        );
        let err = generator.generate_email("HR", &topic(), &prompts()).await.unwrap_err();
        assert!(matches!(err, GenerationError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn empty_content_is_an_error() {
        let generator =
            ContentGenerator::new(vec![dyn_provider(&Canned::ok("blank", "  \n"))], Arc::new(FixedSelector(0)));
        let err = generator.generate_landing_page("x", &prompts()).await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyContent { .. }));
    }

    #[tokio::test]
    async fn no_providers() {
        let generator = ContentGenerator::with_random_selection(Vec::new());
        assert_eq!(generator.provider_count(), 0);
        let err = generator.generate_landing_page("x", &prompts()).await.unwrap_err();
        assert!(matches!(err, GenerationError::NoProviders));
    }
}
