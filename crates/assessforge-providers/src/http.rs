//! HTTP backend for uploads and submissions.
//!
//! Endpoints, relative to the configured base URL:
//! - `POST /uploads` with [`FileMeta`] returns an [`UploadTicket`]
//! - `PUT <putTarget>` with the raw bytes
//! - `POST /assignments` with a [`Submission`]; 2xx accepts, 409/422 rejects

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use assessforge_core::reference::is_absolute;
use assessforge_core::traits::{
    FileMeta, Submission, SubmitOutcome, Submitter, UploadTicket, Uploader,
};

use crate::error::CollaboratorError;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Talks to an assessforge-compatible REST backend.
pub struct HttpBackend {
    base_url: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, api_token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.filter(|t| !t.is_empty()),
            client,
        }
    }

    fn url(&self, target: &str) -> String {
        if is_absolute(target) {
            target.to_string()
        } else {
            format!("{}/{}", self.base_url, target.trim_start_matches('/'))
        }
    }

    /// Whether `url` points at this backend rather than a foreign host.
    fn is_own(&self, url: &str) -> bool {
        url.strip_prefix(self.base_url.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
    }

    /// Send a request to the backend API with the bearer token attached.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, CollaboratorError> {
        let req = match &self.api_token {
            Some(token) => req.header("Authorization", format!("Bearer {token}")),
            None => req,
        };
        self.send_plain(req).await
    }

    /// Send a request without credentials, e.g. to a presigned storage URL.
    async fn send_plain(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, CollaboratorError> {
        req.send().await.map_err(|e| {
            if e.is_timeout() {
                CollaboratorError::Timeout(DEFAULT_TIMEOUT_SECS)
            } else {
                CollaboratorError::NetworkError(e.to_string())
            }
        })
    }
}

/// Map auth and server failures; other statuses are left to the caller.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CollaboratorError> {
    let status = response.status().as_u16();
    if status == 401 || status == 403 {
        let body = response.text().await.unwrap_or_default();
        return Err(CollaboratorError::AuthenticationFailed(body));
    }
    if status >= 400 {
        let body = response.text().await.unwrap_or_default();
        return Err(CollaboratorError::ApiError {
            status,
            message: body,
        });
    }
    Ok(response)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AcceptedBody {
    #[serde(default, alias = "id")]
    assignment_id: Option<String>,
}

#[derive(Deserialize)]
struct RejectedBody {
    #[serde(default, alias = "message", alias = "error")]
    reason: Option<String>,
}

#[async_trait]
impl Uploader for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, file), fields(file = %file.file_name, size = file.size))]
    async fn request_upload(&self, file: &FileMeta) -> anyhow::Result<UploadTicket> {
        let response = self
            .send(self.client.post(self.url("uploads")).json(file))
            .await?;
        let response = check_status(response).await?;
        let ticket: UploadTicket = response.json().await.map_err(|e| {
            CollaboratorError::InvalidResponse(format!("failed to parse upload ticket: {e}"))
        })?;
        tracing::debug!(reference = %ticket.public_reference, "upload ticket issued");
        Ok(ticket)
    }

    #[instrument(skip(self, ticket, file, bytes), fields(file = %file.file_name))]
    async fn transfer(&self, ticket: &UploadTicket, file: &FileMeta, bytes: &[u8]) -> anyhow::Result<()> {
        let target = self.url(&ticket.put_target);
        let own = self.is_own(&target);
        let req = self
            .client
            .put(&target)
            .header("content-type", file.content_type.as_str())
            .body(bytes.to_vec());
        let response = if own {
            self.send(req).await?
        } else {
            self.send_plain(req).await?
        };
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl Submitter for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, submission), fields(title = %submission.metadata.title))]
    async fn submit(&self, submission: &Submission) -> anyhow::Result<SubmitOutcome> {
        let response = self
            .send(self.client.post(self.url("assignments")).json(submission))
            .await?;

        let status = response.status().as_u16();
        if status == 409 || status == 422 {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<RejectedBody>(&body)
                .ok()
                .and_then(|b| b.reason)
                .unwrap_or(body);
            return Ok(SubmitOutcome::Rejected { reason });
        }

        let response = check_status(response).await?;
        let body = response.text().await.unwrap_or_default();
        let assignment_id = serde_json::from_str::<AcceptedBody>(&body)
            .ok()
            .and_then(|b| b.assignment_id);
        Ok(SubmitOutcome::Accepted { assignment_id })
    }
}
