use crate::errors::SyncError;
use crate::models::{HistoryEntry, MutationAck, Snapshot, TaskDraft, ToggleAck};
use crate::sync::SnapshotSource;
use chrono::NaiveDate;
use reqwest::Client;

/// Thin wrapper over the server's JSON endpoints. The server owns all
/// durable state; this client only reads summaries and issues mutations.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub async fn fetch_snapshot(&self) -> Result<Snapshot, SyncError> {
        let snapshot = self
            .http
            .get(format!("{}/api/stats", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(snapshot)
    }

    pub async fn create_task(&self, draft: &TaskDraft) -> Result<MutationAck, SyncError> {
        self.post_json(&format!("{}/api/tasks/add", self.base_url), draft)
            .await
    }

    pub async fn edit_task(&self, id: u64, draft: &TaskDraft) -> Result<MutationAck, SyncError> {
        self.post_json(&format!("{}/api/tasks/{id}/edit", self.base_url), draft)
            .await
    }

    pub async fn delete_task(&self, id: u64) -> Result<MutationAck, SyncError> {
        let ack = self
            .http
            .delete(format!("{}/api/tasks/{id}/delete", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(ack)
    }

    pub async fn toggle_task(&self, id: u64) -> Result<ToggleAck, SyncError> {
        let ack = self
            .http
            .post(format!("{}/api/tasks/{id}/toggle", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(ack)
    }

    pub async fn log_history(&self, id: u64, date: NaiveDate) -> Result<MutationAck, SyncError> {
        self.post_json(
            &format!("{}/api/tasks/{id}/history/add", self.base_url),
            &HistoryEntry { date },
        )
        .await
    }

    async fn post_json<B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<MutationAck, SyncError> {
        let ack = self
            .http
            .post(url)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(ack)
    }
}

impl SnapshotSource for ApiClient {
    async fn fetch_snapshot(&self) -> Result<Snapshot, SyncError> {
        ApiClient::fetch_snapshot(self).await
    }
}
