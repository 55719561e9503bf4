//! In-memory collaborators for testing and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use assessforge_core::traits::{
    FileMeta, KeyValueStore, Submission, SubmitOutcome, Submitter, UploadTicket, Uploader,
};

/// Uploader that hands out `mock/<n>-<file name>` references.
///
/// References are storage-relative, so they exercise reference
/// normalization just like a real backend.
#[derive(Default)]
pub struct MockUploader {
    /// Number of tickets handed out.
    request_count: AtomicU32,
    /// Bytes received per public reference.
    transfers: Mutex<HashMap<String, Vec<u8>>>,
    /// Fail every transfer when set.
    fail_transfers: bool,
}

impl MockUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose transfers always fail.
    pub fn failing() -> Self {
        Self {
            fail_transfers: true,
            ..Self::default()
        }
    }

    pub fn request_count(&self) -> u32 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Bytes transferred for a reference, if any.
    pub fn transferred(&self, reference: &str) -> Option<Vec<u8>> {
        self.transfers.lock().unwrap().get(reference).cloned()
    }
}

#[async_trait]
impl Uploader for MockUploader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn request_upload(&self, file: &FileMeta) -> anyhow::Result<UploadTicket> {
        let n = self.request_count.fetch_add(1, Ordering::Relaxed) + 1;
        let reference = format!("mock/{n}-{}", file.file_name);
        Ok(UploadTicket {
            put_target: reference.clone(),
            public_reference: reference,
        })
    }

    async fn transfer(&self, ticket: &UploadTicket, _file: &FileMeta, bytes: &[u8]) -> anyhow::Result<()> {
        if self.fail_transfers {
            anyhow::bail!("mock transfer failure");
        }
        self.transfers
            .lock()
            .unwrap()
            .insert(ticket.public_reference.clone(), bytes.to_vec());
        Ok(())
    }
}

/// Submitter that records submissions and answers with a fixed outcome.
pub struct MockSubmitter {
    outcome: SubmitOutcome,
    submissions: Mutex<Vec<Submission>>,
}

impl MockSubmitter {
    /// Create a mock that accepts everything.
    pub fn accepting() -> Self {
        Self::with_outcome(SubmitOutcome::Accepted {
            assignment_id: Some("mock-assignment".into()),
        })
    }

    pub fn rejecting(reason: &str) -> Self {
        Self::with_outcome(SubmitOutcome::Rejected {
            reason: reason.to_string(),
        })
    }

    pub fn with_outcome(outcome: SubmitOutcome) -> Self {
        Self {
            outcome,
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn last_submission(&self) -> Option<Submission> {
        self.submissions.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Submitter for MockSubmitter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, submission: &Submission) -> anyhow::Result<SubmitOutcome> {
        self.submissions.lock().unwrap().push(submission.clone());
        tracing::debug!(title = %submission.metadata.title, "mock submission recorded");
        Ok(self.outcome.clone())
    }
}

/// Process-local key/value store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use assessforge_core::draft::DraftStore;
    use assessforge_core::model::{PendingUpload, Question, QuestionKind};
    use assessforge_core::publish::Publisher;
    use assessforge_core::reference::ReferenceNormalizer;
    use assessforge_core::wizard::{AssignmentKind, AuthoringSession};
    use chrono::{Duration, Utc};

    fn listening_session() -> AuthoringSession {
        let mut session = AuthoringSession::new(AssignmentKind::Structured);
        session.basic.title = "Dialogue".into();
        session.basic.skill = Some("listening".into());
        session.basic.due_at = Some(Utc::now() + Duration::days(1));
        for prompt in ["Who speaks first?", "Where are they?"] {
            let q = Question::new(QuestionKind::ShortAnswer, prompt);
            session.questions.add(q).pending_audio = Some(PendingUpload {
                file_name: "dialogue.mp3".into(),
                content_type: "audio/mpeg".into(),
                bytes: vec![7; 16],
            });
        }
        session
    }

    #[tokio::test]
    async fn publish_through_mocks() {
        let uploader = Arc::new(MockUploader::new());
        let submitter = Arc::new(MockSubmitter::accepting());
        let memory = Arc::new(MemoryStore::new());
        let drafts = DraftStore::new(memory.clone(), "assessforge-draft");
        let publisher = Publisher::new(
            uploader.clone(),
            submitter.clone(),
            ReferenceNormalizer::new("https://storage.test"),
        )
        .with_drafts(drafts.clone());

        let mut session = listening_session();
        drafts.save("lesson-4", &session).unwrap();
        assert_eq!(memory.len(), 1);

        let outcome = publisher
            .publish(&mut session, "lesson-4", Utc::now())
            .await
            .unwrap();

        assert!(outcome.is_accepted());
        assert_eq!(uploader.request_count(), 1);
        assert_eq!(uploader.transferred("mock/1-dialogue.mp3"), Some(vec![7; 16]));
        assert_eq!(submitter.submission_count(), 1);
        assert!(memory.is_empty());

        let sent = submitter.last_submission().unwrap();
        let doc: serde_json::Value = serde_json::from_str(&sent.document.unwrap()).unwrap();
        assert_eq!(doc["media"]["audioUrl"], "https://storage.test/mock/1-dialogue.mp3");
        assert_eq!(doc["questions"][1]["requiresManualGrading"], true);
    }

    #[tokio::test]
    async fn failing_uploader_keeps_session_retryable() {
        let publisher = Publisher::new(
            Arc::new(MockUploader::failing()),
            Arc::new(MockSubmitter::accepting()),
            ReferenceNormalizer::new("https://storage.test"),
        );
        let mut session = listening_session();

        assert!(publisher.publish(&mut session, "k", Utc::now()).await.is_err());
        assert!(session.questions.iter().all(|d| d.pending_audio.is_some()));
    }
}
