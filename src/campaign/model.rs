//! Campaign data model: recipients, topics, prompts and the five backend artifacts.

use std::collections::HashMap;
use std::path::Path;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{BlueprintError, ConfigError};
use crate::select::{self, Selector};

// ── Recipients ──────────────────────────────────────────────────────

/// One row of the recipient directory, as the directory service returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
}

/// A recipient with its run-scoped identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// Position in the directory listing for this run.
    pub id: usize,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
}

impl Recipient {
    pub fn from_entry(id: usize, entry: DirectoryEntry) -> Self {
        Self {
            id,
            first_name: entry.first_name,
            last_name: entry.last_name,
            email: entry.email,
            department: entry.department,
        }
    }

    /// Assign sequential ids in directory order.
    pub fn enumerate(entries: Vec<DirectoryEntry>) -> Vec<Recipient> {
        entries
            .into_iter()
            .enumerate()
            .map(|(id, entry)| Recipient::from_entry(id, entry))
            .collect()
    }

    /// Email normalised for duplicate detection.
    pub fn email_key(&self) -> String {
        self.email.trim().to_ascii_lowercase()
    }
}

// ── Topics ──────────────────────────────────────────────────────────

/// A department-scoped lure scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(rename = "Topic")]
    pub subject_line: String,
    #[serde(rename = "Sender")]
    pub sender_display_name: String,
    #[serde(rename = "sender_mail")]
    pub sender_email: String,
}

/// Topics keyed by exact department name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicCatalog {
    departments: HashMap<String, Vec<Topic>>,
}

impl TopicCatalog {
    pub fn new(departments: HashMap<String, Vec<Topic>>) -> Self {
        Self { departments }
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_json(path.as_ref())
    }

    pub fn insert(&mut self, department: impl Into<String>, topics: Vec<Topic>) {
        self.departments.insert(department.into(), topics);
    }

    /// Topics configured for `department`. An empty list counts as unknown.
    pub fn topics_for(&self, department: &str) -> Result<&[Topic], BlueprintError> {
        match self.departments.get(department) {
            Some(topics) if !topics.is_empty() => Ok(topics),
            _ => Err(BlueprintError::UnknownDepartment {
                department: department.to_string(),
            }),
        }
    }

    /// Pick one topic for `department` using `selector`.
    pub fn pick(&self, department: &str, selector: &dyn Selector) -> Result<&Topic, BlueprintError> {
        let topics = self.topics_for(department)?;
        select::choose(selector, topics).ok_or_else(|| BlueprintError::UnknownDepartment {
            department: department.to_string(),
        })
    }

    pub fn departments(&self) -> impl Iterator<Item = &str> {
        self.departments.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.departments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty()
    }
}

// ── Prompts ─────────────────────────────────────────────────────────

/// Prompt templates for email and landing-page generation.
///
/// Templates use `{name}` placeholders; see [`crate::llm::prompts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSet {
    pub developer_message: String,
    pub user_prompt: String,
    pub developer_message_landing_page: String,
    pub user_prompt_landing_page: String,
}

impl PromptSet {
    /// Load a prompt set from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_json(path.as_ref())
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

// ── Generated content ───────────────────────────────────────────────

/// Email produced by the content generation adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    pub mail_body: String,
    pub sender_email: String,
    pub subject: String,
    pub sender_name: String,
}

// ── Artifacts ───────────────────────────────────────────────────────

/// Campaign-wide mail account every sender profile in a run authenticates with.
#[derive(Debug, Clone)]
pub struct SenderCredentials {
    pub username: String,
    pub password: SecretString,
}

/// Single-use SMTP sending profile.
#[derive(Debug, Clone)]
pub struct SenderProfile {
    pub id: usize,
    pub name: String,
    pub host: String,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
    pub ignore_cert_errors: bool,
}

/// The lure email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplate {
    pub id: usize,
    pub name: String,
    pub subject: String,
    pub html: String,
    pub envelope_sender: String,
}

impl EmailTemplate {
    /// First naming phase: the template is named after its subject.
    pub fn create(id: usize, content: &GeneratedContent) -> Self {
        Self {
            id,
            name: content.subject.clone(),
            subject: content.subject.clone(),
            html: content.mail_body.clone(),
            envelope_sender: format!("{} <{}>", content.sender_name, content.sender_email),
        }
    }

    /// Second naming phase: apply the collision-free recipient name.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

/// Credential-capturing page the lure links to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandingPage {
    pub id: usize,
    pub name: String,
    pub html: String,
    pub capture_credentials: bool,
    pub capture_passwords: bool,
    pub redirect_url: String,
}

/// Group member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub position: String,
}

/// Target group holding exactly one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroup {
    pub id: usize,
    pub name: String,
    pub targets: Vec<Target>,
}

/// Campaign definition. References the other artifacts by name, as the backend does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignDefinition {
    pub id: usize,
    pub name: String,
    pub group_name: String,
    pub template_name: String,
    pub page_name: String,
    pub sender_profile_name: String,
    pub url: String,
}

/// Every backend artifact for one recipient's exercise.
#[derive(Debug, Clone)]
pub struct CampaignBlueprint {
    pub recipient: Recipient,
    pub sender_profile: SenderProfile,
    pub template: EmailTemplate,
    pub landing_page: LandingPage,
    pub group: TargetGroup,
    pub campaign: CampaignDefinition,
}

impl CampaignBlueprint {
    /// The identity shared by all five artifacts.
    pub fn id(&self) -> usize {
        self.recipient.id
    }

    /// Artifact ids in submission order.
    pub fn artifact_ids(&self) -> [usize; 5] {
        [
            self.sender_profile.id,
            self.landing_page.id,
            self.template.id,
            self.group.id,
            self.campaign.id,
        ]
    }

    pub fn is_consistent(&self) -> bool {
        self.artifact_ids().iter().all(|id| *id == self.recipient.id)
    }
}

#[cfg(test)]
impl CampaignBlueprint {
    /// Blueprint with placeholder content, every artifact named `name`.
    pub(crate) fn sample(id: usize, name: &str, email: &str) -> Self {
        let recipient = Recipient {
            id,
            first_name: "First".into(),
            last_name: "Last".into(),
            email: email.into(),
            department: "HR".into(),
        };
        Self {
            sender_profile: SenderProfile {
                id,
                name: name.into(),
                host: "smtp.example.com:465".into(),
                username: "u".into(),
                password: SecretString::from("p"),
                from_address: "s@x.com".into(),
                ignore_cert_errors: true,
            },
            template: EmailTemplate {
                id,
                name: name.into(),
                subject: "T".into(),
                html: "<p>hi</p>".into(),
                envelope_sender: "S <s@x.com>".into(),
            },
            landing_page: LandingPage {
                id,
                name: name.into(),
                html: "<form></form>".into(),
                capture_credentials: true,
                capture_passwords: true,
                redirect_url: "https://example.com".into(),
            },
            group: TargetGroup {
                id,
                name: name.into(),
                targets: vec![Target {
                    first_name: recipient.first_name.clone(),
                    last_name: recipient.last_name.clone(),
                    email: recipient.email.clone(),
                    position: recipient.department.clone(),
                }],
            },
            campaign: CampaignDefinition {
                id,
                name: name.into(),
                group_name: name.into(),
                template_name: name.into(),
                page_name: name.into(),
                sender_profile_name: name.into(),
                url: "http://127.0.0.1/".into(),
            },
            recipient,
        }
    }
}

/// A recipient whose blueprint could not be built.
#[derive(Debug)]
pub struct BlueprintFailure {
    pub recipient_id: usize,
    pub email: String,
    pub error: BlueprintError,
}

/// Blueprints for one orchestration run, in directory order.
#[derive(Debug, Default)]
pub struct CampaignSet {
    pub blueprints: Vec<CampaignBlueprint>,
    pub failures: Vec<BlueprintFailure>,
}

impl CampaignSet {
    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }

    pub fn contains_email(&self, email_key: &str) -> bool {
        self.blueprints
            .iter()
            .any(|b| b.recipient.email_key() == email_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::FixedSelector;

    fn hr_catalog() -> TopicCatalog {
        let mut catalog = TopicCatalog::default();
        catalog.insert(
            "HR",
            vec![Topic {
                subject_line: "T".into(),
                sender_display_name: "S".into(),
                sender_email: "s@x.com".into(),
            }],
        );
        catalog
    }

    #[test]
    fn catalog_parses_source_json_shape() {
        let json = r#"{"HR": [{"Topic": "Payroll update", "Sender": "Payroll", "sender_mail": "pay@x.com"}]}"#;
        let catalog: TopicCatalog = serde_json::from_str(json).unwrap();
        let topic = catalog.pick("HR", &FixedSelector(0)).unwrap();
        assert_eq!(topic.subject_line, "Payroll update");
        assert_eq!(topic.sender_email, "pay@x.com");
    }

    #[test]
    fn unknown_department_is_strict() {
        let catalog = hr_catalog();
        let err = catalog.pick("hr", &FixedSelector(0)).unwrap_err();
        assert!(matches!(err, BlueprintError::UnknownDepartment { department } if department == "hr"));
    }

    #[test]
    fn empty_topic_list_is_unknown() {
        let mut catalog = hr_catalog();
        catalog.insert("Finance", Vec::new());
        assert!(catalog.topics_for("Finance").is_err());
    }

    #[test]
    fn template_two_phase_naming() {
        let content = GeneratedContent {
            mail_body: "<p>hi</p>".into(),
            sender_email: "s@x.com".into(),
            subject: "T".into(),
            sender_name: "S".into(),
        };
        let mut template = EmailTemplate::create(3, &content);
        assert_eq!(template.name, "T");
        assert_eq!(template.envelope_sender, "S <s@x.com>");

        template.rename("Doe_Alice_2024-01-01_00:00:00");
        assert_eq!(template.name, "Doe_Alice_2024-01-01_00:00:00");
        assert_eq!(template.subject, "T");
    }

    #[test]
    fn enumerate_assigns_directory_order() {
        let entries = vec![
            DirectoryEntry {
                first_name: "Alice".into(),
                last_name: "Doe".into(),
                email: "alice@x.com".into(),
                department: "HR".into(),
            },
            DirectoryEntry {
                first_name: "Bob".into(),
                last_name: "Roe".into(),
                email: "Bob@X.com ".into(),
                department: "IT".into(),
            },
        ];
        let recipients = Recipient::enumerate(entries);
        assert_eq!(recipients[0].id, 0);
        assert_eq!(recipients[1].id, 1);
        assert_eq!(recipients[1].email_key(), "bob@x.com");
    }

    #[test]
    fn prompt_set_load_reports_missing_file() {
        let err = PromptSet::load("/nonexistent/prompts.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn prompt_set_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        std::fs::write(
            &path,
            r#"{"developer_message": "dev {tracker}", "user_prompt": "write for {department}",
                "developer_message_landing_page": "page dev", "user_prompt_landing_page": "page {email_body}"}"#,
        )
        .unwrap();
        let prompts = PromptSet::load(&path).unwrap();
        assert_eq!(prompts.user_prompt, "write for {department}");
    }
}
