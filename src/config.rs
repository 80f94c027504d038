//! Configuration types, read from the environment.
//!
//! `main` loads a `.env` file first (if present), so every value below can
//! live there instead of the shell.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::campaign::{BlueprintDefaults, SenderCredentials};
use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval settings for the two background loops.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub campaign_interval: Duration,
    pub feedback_interval: Duration,
    /// Empty the recipient directory after each launch.
    pub clear_directory_after_launch: bool,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub timeout: Duration,
}

/// Phishing-simulation backend connection.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: SecretString,
    /// The backend usually runs with a self-signed certificate.
    pub accept_invalid_certs: bool,
    pub timeout: Duration,
}

/// Outbound mail for feedback notices.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Login and From address.
    pub username: String,
    pub password: SecretString,
    pub subject: String,
    pub attachment_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub topics_path: PathBuf,
    pub prompts_path: PathBuf,
    pub scheduler: SchedulerConfig,
    pub directory: DirectoryConfig,
    pub backend: BackendConfig,
    pub blueprint: BlueprintDefaults,
    pub sender: SenderCredentials,
    /// Enabled providers, at least one.
    pub providers: Vec<LlmConfig>,
    pub mail: MailConfig,
}

/// Reads keys through a lookup function so tests don't touch the process env.
struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("'{raw}': {e}"),
            }),
        }
    }

    fn secs(&self, key: &str, default: u64) -> Result<Duration, ConfigError> {
        let secs: u64 = self.parse(key, default)?;
        if secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(Duration::from_secs(secs))
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let scheduler = SchedulerConfig {
            campaign_interval: env.secs("PHISHSIM_CAMPAIGN_INTERVAL_SECS", 86_400)?,
            feedback_interval: env.secs("PHISHSIM_FEEDBACK_INTERVAL_SECS", 3_600)?,
            clear_directory_after_launch: env.parse("PHISHSIM_CLEAR_DIRECTORY_AFTER_LAUNCH", false)?,
        };

        let directory = DirectoryConfig {
            base_url: env.required("PHISHSIM_DIRECTORY_URL")?,
            timeout: HTTP_TIMEOUT,
        };

        let backend = BackendConfig {
            base_url: env.or("GOPHISH_URL", "https://127.0.0.1:3333"),
            api_key: SecretString::from(env.required("GOPHISH_API_KEY")?),
            accept_invalid_certs: env.parse("GOPHISH_ACCEPT_INVALID_CERTS", true)?,
            timeout: HTTP_TIMEOUT,
        };

        let defaults = BlueprintDefaults::default();
        let blueprint = BlueprintDefaults {
            smtp_host: env.or("PHISHSIM_SENDER_SMTP_HOST", &defaults.smtp_host),
            ignore_cert_errors: defaults.ignore_cert_errors,
            phish_url: env.or("PHISHSIM_PHISH_URL", &defaults.phish_url),
            redirect_url: env.or("PHISHSIM_REDIRECT_URL", &defaults.redirect_url),
        };

        let sender = SenderCredentials {
            username: env.required("PHISHSIM_SENDER_USERNAME")?,
            password: SecretString::from(env.required("PHISHSIM_SENDER_PASSWORD")?),
        };

        let llm_timeout = env.secs("PHISHSIM_LLM_TIMEOUT_SECS", 60)?;
        let mut providers = Vec::new();
        if let Some(key) = env.get("GOOGLE_API_KEY") {
            providers.push(LlmConfig {
                backend: LlmBackend::Gemini,
                api_key: SecretString::from(key),
                model: env.or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                base_url: None,
                timeout: llm_timeout,
                max_tokens: DEFAULT_MAX_TOKENS,
            });
        }
        if let Some(key) = env.get("OPENAI_API_KEY") {
            providers.push(LlmConfig {
                backend: LlmBackend::OpenAi,
                api_key: SecretString::from(key),
                model: env.or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
                base_url: env.get("OPENAI_BASE_URL"),
                timeout: llm_timeout,
                max_tokens: DEFAULT_MAX_TOKENS,
            });
        }
        if providers.is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "GOOGLE_API_KEY or OPENAI_API_KEY".to_string(),
                hint: "Configure at least one content provider.".to_string(),
            });
        }

        let mail = MailConfig {
            smtp_host: env.required("REPORTING_SMTP_HOST")?,
            smtp_port: env.parse("REPORTING_SMTP_PORT", 587)?,
            username: env.required("REPORTING_MAIL_USERNAME")?,
            password: SecretString::from(env.required("REPORTING_MAIL_PASSWORD")?),
            subject: env.or("REPORTING_MAIL_SUBJECT", "Phishing Simulation Campaign Results"),
            attachment_path: env.get("REPORTING_ATTACHMENT_PATH").map(PathBuf::from),
        };

        Ok(Self {
            topics_path: PathBuf::from(env.or("PHISHSIM_TOPICS_PATH", "input_data/topics.json")),
            prompts_path: PathBuf::from(env.or("PHISHSIM_PROMPTS_PATH", "input_data/prompts.json")),
            scheduler,
            directory,
            backend,
            blueprint,
            sender,
            providers,
            mail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn base() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("PHISHSIM_DIRECTORY_URL", "http://directory:8000"),
            ("GOPHISH_API_KEY", "gp-key"),
            ("PHISHSIM_SENDER_USERNAME", "campaign@example.com"),
            ("PHISHSIM_SENDER_PASSWORD", "app-password"),
            ("GOOGLE_API_KEY", "g-key"),
            ("REPORTING_SMTP_HOST", "smtp.example.com"),
            ("REPORTING_MAIL_USERNAME", "security@example.com"),
            ("REPORTING_MAIL_PASSWORD", "pw"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply() {
        let config = load(&base()).unwrap();

        assert_eq!(config.scheduler.campaign_interval, Duration::from_secs(86_400));
        assert_eq!(config.scheduler.feedback_interval, Duration::from_secs(3_600));
        assert!(!config.scheduler.clear_directory_after_launch);
        assert_eq!(config.backend.base_url, "https://127.0.0.1:3333");
        assert!(config.backend.accept_invalid_certs);
        assert_eq!(config.blueprint.smtp_host, "smtp.gmail.com:465");
        assert_eq!(config.mail.smtp_port, 587);
        assert_eq!(config.mail.subject, "Phishing Simulation Campaign Results");
        assert!(config.mail.attachment_path.is_none());
        assert_eq!(config.topics_path, PathBuf::from("input_data/topics.json"));

        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].backend, LlmBackend::Gemini);
        assert_eq!(config.providers[0].model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.sender.password.expose_secret(), "app-password");
    }

    #[test]
    fn both_providers_enabled() {
        let mut vars = base();
        vars.insert("OPENAI_API_KEY", "sk-test");
        vars.insert("OPENAI_MODEL", "gpt-4o");
        let config = load(&vars).unwrap();

        let backends: Vec<LlmBackend> = config.providers.iter().map(|p| p.backend).collect();
        assert_eq!(backends, vec![LlmBackend::Gemini, LlmBackend::OpenAi]);
        assert_eq!(config.providers[1].model, "gpt-4o");
    }

    #[test]
    fn no_provider_is_rejected() {
        let mut vars = base();
        vars.remove("GOOGLE_API_KEY");
        assert!(matches!(load(&vars), Err(ConfigError::MissingRequired { .. })));
    }

    #[test]
    fn missing_required_var() {
        let mut vars = base();
        vars.remove("GOPHISH_API_KEY");
        match load(&vars) {
            Err(ConfigError::MissingEnvVar(key)) => assert_eq!(key, "GOPHISH_API_KEY"),
            other => panic!("expected MissingEnvVar, got {other:?}"),
        }
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut vars = base();
        vars.insert("PHISHSIM_CAMPAIGN_INTERVAL_SECS", "daily");
        assert!(matches!(load(&vars), Err(ConfigError::InvalidValue { .. })));

        let mut vars = base();
        vars.insert("PHISHSIM_FEEDBACK_INTERVAL_SECS", "0");
        assert!(matches!(load(&vars), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn overrides_apply() {
        let mut vars = base();
        vars.insert("PHISHSIM_CLEAR_DIRECTORY_AFTER_LAUNCH", "true");
        vars.insert("REPORTING_SMTP_PORT", "465");
        vars.insert("REPORTING_ATTACHMENT_PATH", "input_data/training_phishing.pdf");
        vars.insert("PHISHSIM_PHISH_URL", "https://phish.example.com/");
        let config = load(&vars).unwrap();

        assert!(config.scheduler.clear_directory_after_launch);
        assert_eq!(config.mail.smtp_port, 465);
        assert_eq!(
            config.mail.attachment_path,
            Some(PathBuf::from("input_data/training_phishing.pdf"))
        );
        assert_eq!(config.blueprint.phish_url, "https://phish.example.com/");
    }
}
