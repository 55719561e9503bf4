//! Collaborator trait definitions.
//!
//! The engine reaches the outside world only through these seams: binary
//! upload, final submission, and a string key/value store for drafts. They
//! are implemented by the `assessforge-providers` crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::AssignmentSettings;
use crate::wizard::AssignmentKind;

// ---------------------------------------------------------------------------
// Upload collaborator
// ---------------------------------------------------------------------------

/// Hands out upload targets and performs the transfer.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Human-readable collaborator name (e.g. "http").
    fn name(&self) -> &str;

    /// Ask for somewhere to put a binary and the reference it will have.
    async fn request_upload(&self, file: &FileMeta) -> anyhow::Result<UploadTicket>;

    /// Send the bytes to the ticket's put target.
    async fn transfer(&self, ticket: &UploadTicket, file: &FileMeta, bytes: &[u8]) -> anyhow::Result<()>;
}

/// Description of a binary about to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
}

/// Where to send a binary and how it will be addressed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub put_target: String,
    /// Absolute URL or storage-relative path.
    pub public_reference: String,
}

// ---------------------------------------------------------------------------
// Submission collaborator
// ---------------------------------------------------------------------------

/// Accepts a finished assignment.
#[async_trait]
pub trait Submitter: Send + Sync {
    fn name(&self) -> &str;

    /// Submit a serialized document with its metadata.
    ///
    /// `Err` means the submission could not be attempted or the transport
    /// failed; a rejection by the backend is `Ok(SubmitOutcome::Rejected)`.
    async fn submit(&self, submission: &Submission) -> anyhow::Result<SubmitOutcome>;
}

/// Everything sent on final submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub metadata: AssignmentMetadata,
    /// Serialized document; absent for file-submission assignments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

/// Assignment-level fields that live outside the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentMetadata {
    pub title: String,
    #[serde(default)]
    pub instructions: String,
    pub due_at: DateTime<Utc>,
    pub skill: String,
    pub kind: AssignmentKind,
    pub total_points: u32,
    pub settings: AssignmentSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Accepted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assignment_id: Option<String>,
    },
    Rejected {
        reason: String,
    },
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted { .. })
    }
}

// ---------------------------------------------------------------------------
// Draft persistence collaborator
// ---------------------------------------------------------------------------

/// A namespaced string key/value store supplied by the host environment.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}
