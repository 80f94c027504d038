use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use phishsim::backend::{GophishClient, PhishingBackend, SubmissionCoordinator};
use phishsim::campaign::{
    BlueprintBuilder, CampaignAssembler, PromptSet, TopicCatalog,
};
use phishsim::clock::SystemClock;
use phishsim::config::AppConfig;
use phishsim::directory::{HttpRecipientDirectory, RecipientDirectory};
use phishsim::feedback::{FeedbackProcessor, SmtpNoticeMailer};
use phishsim::llm::{ContentGenerator, ContentProvider, create_provider};
use phishsim::scheduler::{CampaignInputs, CampaignScheduler, ShutdownSignal};
use phishsim::select::RandomSelector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    // A missing .env is fine; the shell environment may carry everything.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let topics = TopicCatalog::load(&config.topics_path)?;
    let prompts = PromptSet::load(&config.prompts_path)?;
    info!(
        departments = topics.len(),
        topics = %config.topics_path.display(),
        prompts = %config.prompts_path.display(),
        "Campaign inputs loaded"
    );

    // ── Content generation ──────────────────────────────────────────────
    let providers = config
        .providers
        .iter()
        .map(create_provider)
        .collect::<Result<Vec<Arc<dyn ContentProvider>>, _>>()?;
    let provider_names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
    info!(providers = ?provider_names, "Content providers ready");

    let generator = Arc::new(ContentGenerator::with_random_selection(providers));
    let builder = Arc::new(BlueprintBuilder::new(
        generator,
        Arc::new(RandomSelector),
        Arc::new(SystemClock),
        config.blueprint.clone(),
    ));
    let assembler = Arc::new(CampaignAssembler::new(builder));

    // ── Backend and directory ───────────────────────────────────────────
    let backend: Arc<dyn PhishingBackend> = Arc::new(GophishClient::new(&config.backend)?);
    let coordinator = Arc::new(SubmissionCoordinator::new(Arc::clone(&backend)));
    let directory: Arc<dyn RecipientDirectory> = Arc::new(HttpRecipientDirectory::new(
        config.directory.base_url.clone(),
        config.directory.timeout,
    )?);

    let shutdown = ShutdownSignal::new();

    // ── Campaign scheduler ──────────────────────────────────────────────
    let scheduler = Arc::new(
        CampaignScheduler::new(
            directory,
            assembler,
            coordinator,
            CampaignInputs {
                topics,
                prompts,
                credentials: config.sender.clone(),
            },
            shutdown.clone(),
        )
        .with_clear_directory_after_launch(config.scheduler.clear_directory_after_launch)
        .context("PHISHSIM_CLEAR_DIRECTORY_AFTER_LAUNCH is set but the recipient service has no clear endpoint")?,
    );
    let campaign_handle = scheduler.spawn(config.scheduler.campaign_interval);

    // ── Feedback processor ──────────────────────────────────────────────
    let mailer = Arc::new(SmtpNoticeMailer::new(config.mail.clone()));
    let feedback = Arc::new(FeedbackProcessor::new(backend, mailer, shutdown.clone()));
    let feedback_handle = feedback.spawn(config.scheduler.feedback_interval);

    info!(
        campaign_every_secs = config.scheduler.campaign_interval.as_secs(),
        feedback_every_secs = config.scheduler.feedback_interval.as_secs(),
        backend = %config.backend.base_url,
        "Phishsim running, Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown requested, waiting for in-flight work");
    shutdown.trigger();

    let (campaign, feedback) = tokio::join!(campaign_handle, feedback_handle);
    campaign.context("campaign scheduler task panicked")?;
    feedback.context("feedback processor task panicked")?;

    info!("Stopped");
    Ok(())
}
