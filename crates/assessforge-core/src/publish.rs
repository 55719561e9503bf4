//! Final submission of an authoring session.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::document::{self, AssignmentSettings};
use crate::draft::DraftStore;
use crate::error::PublishError;
use crate::reference::ReferenceNormalizer;
use crate::traits::{AssignmentMetadata, Submission, SubmitOutcome, Submitter, Uploader};
use crate::upload::resolve_uploads;
use crate::wizard::{AssignmentKind, AuthoringSession};

/// Drives validation, upload resolution, document building and submission.
pub struct Publisher {
    uploader: Arc<dyn Uploader>,
    submitter: Arc<dyn Submitter>,
    normalizer: ReferenceNormalizer,
    drafts: Option<DraftStore>,
}

impl Publisher {
    pub fn new(
        uploader: Arc<dyn Uploader>,
        submitter: Arc<dyn Submitter>,
        normalizer: ReferenceNormalizer,
    ) -> Self {
        Self {
            uploader,
            submitter,
            normalizer,
            drafts: None,
        }
    }

    /// Discard the session's draft from `drafts` once a submission is accepted.
    pub fn with_drafts(mut self, drafts: DraftStore) -> Self {
        self.drafts = Some(drafts);
        self
    }

    /// Build the submission payload without sending it.
    ///
    /// Resolves pending uploads in place, so a later retry does not upload
    /// the same binaries again.
    pub async fn prepare(
        &self,
        session: &mut AuthoringSession,
        now: DateTime<Utc>,
    ) -> Result<Submission, PublishError> {
        session.validate_all(now)?;

        let document = match session.kind {
            AssignmentKind::Structured => {
                resolve_uploads(session.questions.as_mut_slice(), self.uploader.as_ref()).await?;
                let built = document::build(
                    session.questions.as_slice(),
                    &session.settings,
                    &self.normalizer,
                )?
                .ok_or(PublishError::EmptyDocument)?;
                Some(document::serialize(&built)?)
            }
            AssignmentKind::FileSubmission => None,
        };

        // validate_all guarantees both are present.
        let due_at = session.basic.due_at.unwrap_or(now);
        let skill = session.basic.skill.clone().unwrap_or_default();

        Ok(Submission {
            metadata: AssignmentMetadata {
                title: session.basic.title.trim().to_string(),
                instructions: session.basic.instructions.clone(),
                due_at,
                skill,
                kind: session.kind,
                total_points: session.total_points(),
                settings: AssignmentSettings::from(&session.settings),
            },
            document,
        })
    }

    /// Prepare and submit. On acceptance the draft under `draft_key` is
    /// discarded; a rejection leaves it in place.
    pub async fn publish(
        &self,
        session: &mut AuthoringSession,
        draft_key: &str,
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome, PublishError> {
        let submission = self.prepare(session, now).await?;

        tracing::info!(
            submitter = self.submitter.name(),
            title = %submission.metadata.title,
            kind = ?submission.metadata.kind,
            "submitting assignment"
        );
        let outcome = self
            .submitter
            .submit(&submission)
            .await
            .map_err(PublishError::Submission)?;

        match &outcome {
            SubmitOutcome::Accepted { assignment_id } => {
                tracing::info!(assignment_id = ?assignment_id, "assignment accepted");
                if let Some(drafts) = &self.drafts {
                    if let Err(err) = drafts.discard(draft_key) {
                        tracing::warn!(error = %err, "failed to discard draft after publish");
                    }
                }
            }
            SubmitOutcome::Rejected { reason } => {
                tracing::warn!(%reason, "assignment rejected");
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration;

    use crate::draft::tests::MemoryStore;
    use crate::error::{ResourceResolutionError, ValidationError};
    use crate::model::{PendingUpload, Question, QuestionBody, QuestionKind};
    use crate::traits::{FileMeta, UploadTicket};

    struct StubUploader {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Uploader for StubUploader {
        fn name(&self) -> &str {
            "stub"
        }

        async fn request_upload(&self, file: &FileMeta) -> anyhow::Result<UploadTicket> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(UploadTicket {
                put_target: "https://put.test/x".into(),
                public_reference: format!("media/{}", file.file_name),
            })
        }

        async fn transfer(&self, _: &UploadTicket, _: &FileMeta, _: &[u8]) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("storage offline");
            }
            Ok(())
        }
    }

    struct StubSubmitter {
        outcome: SubmitOutcome,
        received: Mutex<Vec<Submission>>,
    }

    #[async_trait]
    impl Submitter for StubSubmitter {
        fn name(&self) -> &str {
            "stub"
        }

        async fn submit(&self, submission: &Submission) -> anyhow::Result<SubmitOutcome> {
            self.received.lock().unwrap().push(submission.clone());
            Ok(self.outcome.clone())
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-05-10T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn ready_session(kind: AssignmentKind) -> AuthoringSession {
        let mut session = AuthoringSession::new(kind);
        session.basic.title = " Listening quiz ".into();
        session.basic.skill = Some("listening".into());
        session.basic.due_at = Some(now() + Duration::days(2));
        session.settings.show_answers_after_due_date = true;
        if kind == AssignmentKind::Structured {
            let mut q = Question::new(QuestionKind::TrueFalse, "The speaker is late");
            q.body = QuestionBody::TrueFalse { correct_answer: true };
            q.points = 2;
            session.questions.add(q).pending_audio = Some(PendingUpload {
                file_name: "clip.mp3".into(),
                content_type: "audio/mpeg".into(),
                bytes: b"ID3".to_vec(),
            });
        } else {
            session.settings.max_points = Some(15);
        }
        session
    }

    fn publisher(
        fail_upload: bool,
        outcome: SubmitOutcome,
    ) -> (Publisher, Arc<StubUploader>, Arc<StubSubmitter>, Arc<MemoryStore>) {
        let uploader = Arc::new(StubUploader {
            calls: AtomicUsize::new(0),
            fail: fail_upload,
        });
        let submitter = Arc::new(StubSubmitter {
            outcome,
            received: Mutex::new(Vec::new()),
        });
        let memory = Arc::new(MemoryStore::default());
        let publisher = Publisher::new(
            uploader.clone(),
            submitter.clone(),
            ReferenceNormalizer::new("https://cdn.test/"),
        )
        .with_drafts(DraftStore::new(memory.clone(), "drafts"));
        (publisher, uploader, submitter, memory)
    }

    fn accepted() -> SubmitOutcome {
        SubmitOutcome::Accepted {
            assignment_id: Some("asg-1".into()),
        }
    }

    #[tokio::test]
    async fn structured_publish_uploads_submits_and_discards_draft() {
        let (publisher, uploader, submitter, memory) = publisher(false, accepted());
        let mut session = ready_session(AssignmentKind::Structured);
        DraftStore::new(memory.clone(), "drafts").save("k", &session).unwrap();

        let outcome = publisher.publish(&mut session, "k", now()).await.unwrap();

        assert!(outcome.is_accepted());
        assert_eq!(uploader.calls.load(Ordering::SeqCst), 1);
        assert!(memory.entries.lock().unwrap().is_empty());

        let received = submitter.received.lock().unwrap();
        let submission = &received[0];
        assert_eq!(submission.metadata.title, "Listening quiz");
        assert_eq!(submission.metadata.total_points, 2);
        let doc: serde_json::Value =
            serde_json::from_str(submission.document.as_deref().unwrap()).unwrap();
        assert_eq!(doc["questions"][0]["audioUrl"], "https://cdn.test/media/clip.mp3");
        assert_eq!(doc["media"]["audioUrl"], "https://cdn.test/media/clip.mp3");
        assert_eq!(doc["settings"]["answerVisibility"], "after_due_date");
    }

    #[tokio::test]
    async fn rejection_keeps_draft() {
        let (publisher, _, _, memory) = publisher(
            false,
            SubmitOutcome::Rejected {
                reason: "duplicate".into(),
            },
        );
        let mut session = ready_session(AssignmentKind::Structured);
        DraftStore::new(memory.clone(), "drafts").save("k", &session).unwrap();

        let outcome = publisher.publish(&mut session, "k", now()).await.unwrap();

        assert!(!outcome.is_accepted());
        assert!(memory.entries.lock().unwrap().contains_key("drafts:k"));
    }

    #[tokio::test]
    async fn upload_failure_blocks_submission() {
        let (publisher, _, submitter, _) = publisher(true, accepted());
        let mut session = ready_session(AssignmentKind::Structured);

        let err = publisher.publish(&mut session, "k", now()).await.unwrap_err();

        assert!(matches!(
            err,
            PublishError::Resource(ResourceResolutionError::UploadFailed { .. })
        ));
        assert!(submitter.received.lock().unwrap().is_empty());
        assert!(session.questions.as_slice()[0].pending_audio.is_some());
    }

    #[tokio::test]
    async fn invalid_session_is_not_submitted() {
        let (publisher, _, submitter, _) = publisher(false, accepted());
        let mut session = ready_session(AssignmentKind::Structured);
        session.basic.due_at = Some(now() - Duration::minutes(1));

        let err = publisher.publish(&mut session, "k", now()).await.unwrap_err();

        assert!(matches!(
            err,
            PublishError::Validation(ValidationError::DueDateNotInFuture)
        ));
        assert!(submitter.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_submission_sends_metadata_only() {
        let (publisher, uploader, submitter, _) = publisher(false, accepted());
        let mut session = ready_session(AssignmentKind::FileSubmission);

        publisher.publish(&mut session, "k", now()).await.unwrap();

        let received = submitter.received.lock().unwrap();
        assert!(received[0].document.is_none());
        assert_eq!(received[0].metadata.total_points, 15);
        assert_eq!(uploader.calls.load(Ordering::SeqCst), 0);
    }
}
