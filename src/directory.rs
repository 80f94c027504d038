//! Recipient directory: the authoritative list of people to exercise.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::campaign::model::DirectoryEntry;
use crate::error::{ConfigError, DirectoryError};

#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Current recipient list, in directory order.
    async fn fetch_all(&self) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    /// Whether `mark_processed` can actually empty the directory.
    fn supports_clear(&self) -> bool {
        false
    }

    /// Called after a launch when the directory should be cleared.
    async fn mark_processed(&self) -> Result<(), DirectoryError> {
        Err(DirectoryError::Unsupported("clearing recipients"))
    }
}

#[derive(Deserialize)]
struct RecipientsResponse {
    #[serde(default)]
    recipients: Vec<DirectoryEntry>,
}

#[derive(Serialize)]
struct UploadRequest<'a> {
    recipients: [&'a DirectoryEntry; 1],
}

/// Directory served over HTTP by the recipient-upload service.
pub struct HttpRecipientDirectory {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRecipientDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "PHISHSIM_DIRECTORY_URL".to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Upload a single recipient. The service has no endpoint for clearing.
    pub async fn append(&self, entry: &DirectoryEntry) -> Result<(), DirectoryError> {
        let url = format!("{}/recipients/upload-json/", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&UploadRequest { recipients: [entry] })
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Unavailable(format!(
                "upload returned {status}"
            )));
        }
        debug!(email = %entry.email, "Recipient uploaded");
        Ok(())
    }
}

#[async_trait]
impl RecipientDirectory for HttpRecipientDirectory {
    async fn fetch_all(&self) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let url = format!("{}/recipients/", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                info!("No recipients uploaded yet");
                Ok(Vec::new())
            }
            status if status.is_success() => {
                let body: RecipientsResponse = response
                    .json()
                    .await
                    .map_err(|e| DirectoryError::Decode(e.to_string()))?;
                Ok(body.recipients)
            }
            status => Err(DirectoryError::Unavailable(format!(
                "{url} returned {status}"
            ))),
        }
    }
}

/// Process-local directory.
#[derive(Default)]
pub struct InMemoryDirectory {
    entries: Mutex<Vec<DirectoryEntry>>,
}

impl InMemoryDirectory {
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn replace_all(&self, entries: Vec<DirectoryEntry>) {
        *self.lock() = entries;
    }

    pub fn append(&self, entry: DirectoryEntry) {
        self.lock().push(entry);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DirectoryEntry>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl RecipientDirectory for InMemoryDirectory {
    async fn fetch_all(&self) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        Ok(self.lock().clone())
    }

    fn supports_clear(&self) -> bool {
        true
    }

    async fn mark_processed(&self) -> Result<(), DirectoryError> {
        self.lock().clear();
        Ok(())
    }
}
