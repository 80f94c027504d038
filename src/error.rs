//! Error types for the campaign orchestration engine.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Blueprint error: {0}")]
    Blueprint(#[from] BlueprintError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Generative-content provider errors ("GenerationFailed").
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Provider {provider} could not be reached: {reason}")]
    Connection { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Provider {provider} returned status {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} returned empty content")]
    EmptyContent { provider: String },

    #[error("No content providers configured")]
    NoProviders,
}

/// Failures that abort a single recipient's blueprint.
#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    #[error("No topics configured for department '{department}'")]
    UnknownDepartment { department: String },

    #[error("Content generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Phishing-simulation backend API errors.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend request to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("Backend returned status {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode backend response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

/// A single artifact submission that the backend rejected.
#[derive(Debug, thiserror::Error)]
#[error("Submitting {artifact} for recipient {recipient_id} failed: {source}")]
pub struct SubmissionError {
    pub recipient_id: usize,
    pub artifact: ArtifactKind,
    #[source]
    pub source: BackendError,
}

/// The five backend resource types, in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    SenderProfile,
    LandingPage,
    EmailTemplate,
    TargetGroup,
    Campaign,
}

impl ArtifactKind {
    /// Dependency order required by the backend's object model.
    pub const SUBMISSION_ORDER: [ArtifactKind; 5] = [
        ArtifactKind::SenderProfile,
        ArtifactKind::LandingPage,
        ArtifactKind::EmailTemplate,
        ArtifactKind::TargetGroup,
        ArtifactKind::Campaign,
    ];
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SenderProfile => "sender_profile",
            Self::LandingPage => "landing_page",
            Self::EmailTemplate => "email_template",
            Self::TargetGroup => "target_group",
            Self::Campaign => "campaign",
        };
        write!(f, "{s}")
    }
}

/// Recipient directory errors ("DirectoryUnavailable").
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Recipient directory unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to decode recipient directory response: {0}")]
    Decode(String),

    #[error("Recipient directory does not support {0}")]
    Unsupported(&'static str),
}

/// Outbound feedback mail errors ("MailSendFailed").
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Failed to read attachment {path}: {reason}")]
    Attachment { path: String, reason: String },

    #[error("SMTP transport failed: {0}")]
    Transport(String),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
