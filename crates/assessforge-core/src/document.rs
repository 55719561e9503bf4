//! Assignment document building, serialization and loading.
//!
//! An [`AssignmentDocument`] is a projection built fresh from the authoring
//! question list on every call. Loading reverses it into an editable list,
//! backfilling each question's shared resource from the document-level
//! canonical fields so a load-edit-save cycle is idempotent.

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{DocumentError, ResourceResolutionError};
use crate::grouping::{canonical_reference, ResourceKind};
use crate::model::{DraftQuestion, Question, QuestionList};
use crate::reference::{is_absolute, ReferenceNormalizer};

/// Format tag written into every document.
pub const DOCUMENT_VERSION: &str = "2.0";

/// Major versions this parser understands.
const SUPPORTED_MAJOR_VERSIONS: &[&str] = &["1", "2"];

/// Who sees correct answers, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerVisibility {
    Immediately,
    AfterDueDate,
    Never,
}

impl AnswerVisibility {
    /// Collapse the authoring checkboxes into one policy.
    ///
    /// "Immediately" takes precedence when both flags are set.
    pub fn from_flags(show_immediately: bool, show_after_due_date: bool) -> Self {
        if show_immediately {
            AnswerVisibility::Immediately
        } else if show_after_due_date {
            AnswerVisibility::AfterDueDate
        } else {
            AnswerVisibility::Never
        }
    }

    /// `(show_immediately, show_after_due_date)`
    pub fn to_flags(self) -> (bool, bool) {
        match self {
            AnswerVisibility::Immediately => (true, false),
            AnswerVisibility::AfterDueDate => (false, true),
            AnswerVisibility::Never => (false, false),
        }
    }
}

/// Settings as edited in the authoring flow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
    #[serde(default)]
    pub auto_grade: bool,
    #[serde(default)]
    pub show_answers_immediately: bool,
    #[serde(default)]
    pub show_answers_after_due_date: bool,
    /// Operator-set maximum for file-submission assignments.
    #[serde(default)]
    pub max_points: Option<u32>,
}

/// Settings as they appear in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_minutes: Option<u32>,
    #[serde(default)]
    pub auto_gradable: bool,
    pub answer_visibility: AnswerVisibility,
}

impl From<&SettingsForm> for AssignmentSettings {
    fn from(form: &SettingsForm) -> Self {
        Self {
            time_limit_minutes: form.time_limit_minutes,
            auto_gradable: form.auto_grade,
            answer_visibility: AnswerVisibility::from_flags(
                form.show_answers_immediately,
                form.show_answers_after_due_date,
            ),
        }
    }
}

impl From<&AssignmentSettings> for SettingsForm {
    fn from(settings: &AssignmentSettings) -> Self {
        let (show_answers_immediately, show_answers_after_due_date) =
            settings.answer_visibility.to_flags();
        Self {
            time_limit_minutes: settings.time_limit_minutes,
            auto_grade: settings.auto_gradable,
            show_answers_immediately,
            show_answers_after_due_date,
            max_points: None,
        }
    }
}

/// Document-level media block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub audio_url: String,
}

/// The serialized unit. Field order is the emitted key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDocument {
    pub version: String,
    #[serde(serialize_with = "serialize_questions")]
    pub questions: Vec<Question>,
    pub settings: AssignmentSettings,
    /// Canonical passage for consumers that understand only one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_passage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QuestionRecord<'a> {
    #[serde(flatten)]
    question: &'a Question,
    requires_manual_grading: bool,
}

fn serialize_questions<S: Serializer>(questions: &[Question], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(questions.iter().map(|question| QuestionRecord {
        question,
        requires_manual_grading: question.requires_manual_grading(),
    }))
}

impl AssignmentDocument {
    pub fn canonical_audio_url(&self) -> Option<&str> {
        self.media.as_ref().map(|m| m.audio_url.as_str())
    }

    pub fn total_points(&self) -> u32 {
        self.questions
            .iter()
            .fold(0u32, |total, q| total.saturating_add(q.points))
    }
}

/// Assemble a document from the authoring list.
///
/// Returns `Ok(None)` for an empty list. Fails closed if any question still
/// holds an unresolved upload.
pub fn build(
    questions: &[DraftQuestion],
    settings: &SettingsForm,
    normalizer: &ReferenceNormalizer,
) -> Result<Option<AssignmentDocument>, ResourceResolutionError> {
    if questions.is_empty() {
        return Ok(None);
    }

    if let Some(pending) = questions.iter().find(|d| d.pending_audio.is_some()) {
        let file_name = pending
            .pending_audio
            .as_ref()
            .map(|p| p.file_name.clone())
            .unwrap_or_default();
        return Err(ResourceResolutionError::PendingUpload {
            question_id: pending.question.id.clone(),
            file_name,
        });
    }

    let mut resolved: Vec<Question> = questions.iter().map(|d| d.question.clone()).collect();
    resolved.sort_by_key(|q| q.order);
    for (i, question) in resolved.iter_mut().enumerate() {
        question.order = i as u32 + 1;
        question.audio_url = normalizer.normalize(question.audio_url.as_deref());
        question.passage = question.passage.take().filter(|p| !p.trim().is_empty());
    }

    let reading_passage = canonical_reference(&resolved, ResourceKind::Passage);
    let media = canonical_reference(&resolved, ResourceKind::Audio)
        .and_then(|audio| normalizer.normalize(Some(&audio)))
        .map(|audio_url| Media { audio_url });

    tracing::debug!(
        questions = resolved.len(),
        has_passage = reading_passage.is_some(),
        has_audio = media.is_some(),
        "built assignment document"
    );

    Ok(Some(AssignmentDocument {
        version: DOCUMENT_VERSION.to_string(),
        questions: resolved,
        settings: AssignmentSettings::from(settings),
        reading_passage,
        media,
    }))
}

/// Serialize to canonical JSON text.
///
/// Refuses to emit a document holding a relative resource path.
pub fn serialize(document: &AssignmentDocument) -> Result<String, DocumentError> {
    let audio_refs = document
        .questions
        .iter()
        .filter_map(|q| q.audio_url.as_deref())
        .chain(document.canonical_audio_url());
    for reference in audio_refs {
        if !is_absolute(reference) {
            return Err(DocumentError::RelativeReference(reference.to_string()));
        }
    }
    Ok(serde_json::to_string_pretty(document)?)
}

/// An existing document reopened for editing.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub questions: QuestionList,
    pub settings: SettingsForm,
}

/// Parse a serialized document back into an editable question list.
pub fn load(serialized: &str) -> Result<LoadedDocument, DocumentError> {
    let document: AssignmentDocument = serde_json::from_str(serialized)?;

    let major = document.version.split('.').next().unwrap_or_default();
    if !SUPPORTED_MAJOR_VERSIONS.contains(&major) {
        return Err(DocumentError::UnsupportedVersion(document.version));
    }

    let canonical_audio = document.canonical_audio_url().map(str::to_string);
    let mut questions = document.questions;
    for question in &mut questions {
        if question.passage.is_none() {
            question.passage = document.reading_passage.clone();
        }
        if question.audio_url.is_none() {
            question.audio_url = canonical_audio.clone();
        }
    }

    Ok(LoadedDocument {
        questions: QuestionList::from_questions(questions),
        settings: SettingsForm::from(&document.settings),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PendingUpload, QuestionBody, QuestionKind};

    fn normalizer() -> ReferenceNormalizer {
        ReferenceNormalizer::new("https://cdn.example.com")
    }

    fn tf(id: &str, order: u32, passage: Option<&str>, audio: Option<&str>) -> DraftQuestion {
        let mut q = Question::new(QuestionKind::TrueFalse, format!("Statement {id}"));
        q.id = id.into();
        q.order = order;
        q.passage = passage.map(str::to_string);
        q.audio_url = audio.map(str::to_string);
        q.into()
    }

    #[test]
    fn empty_list_builds_nothing() {
        let doc = build(&[], &SettingsForm::default(), &normalizer()).unwrap();
        assert!(doc.is_none());
    }

    #[test]
    fn no_passage_means_no_reading_passage_field() {
        let qs = vec![tf("a", 1, None, None)];
        let doc = build(&qs, &SettingsForm::default(), &normalizer())
            .unwrap()
            .unwrap();
        assert!(doc.reading_passage.is_none());
        let json = serialize(&doc).unwrap();
        assert!(!json.contains("readingPassage"));
        assert!(!json.contains("media"));
    }

    #[test]
    fn build_sorts_normalizes_and_picks_canonical() {
        let qs = vec![
            tf("b", 2, Some("P1"), Some("clips/one.mp3")),
            tf("a", 1, Some("P1"), Some("clips/one.mp3")),
            tf("c", 3, Some("P2"), None),
        ];
        let doc = build(&qs, &SettingsForm::default(), &normalizer())
            .unwrap()
            .unwrap();

        let ids: Vec<_> = doc.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(doc.reading_passage.as_deref(), Some("P1"));
        assert_eq!(
            doc.canonical_audio_url(),
            Some("https://cdn.example.com/clips/one.mp3")
        );
        assert_eq!(
            doc.questions[0].audio_url.as_deref(),
            Some("https://cdn.example.com/clips/one.mp3")
        );
        assert_eq!(doc.questions[2].passage.as_deref(), Some("P2"));
    }

    #[test]
    fn pending_upload_fails_closed() {
        let mut q = tf("a", 1, None, None);
        q.pending_audio = Some(PendingUpload {
            file_name: "clip.mp3".into(),
            content_type: "audio/mpeg".into(),
            bytes: vec![1, 2, 3],
        });
        let err = build(&[q], &SettingsForm::default(), &normalizer()).unwrap_err();
        assert!(matches!(
            err,
            ResourceResolutionError::PendingUpload { ref file_name, .. } if file_name == "clip.mp3"
        ));
    }

    #[test]
    fn immediately_wins_when_both_visibility_flags_set() {
        let settings = SettingsForm {
            show_answers_immediately: true,
            show_answers_after_due_date: true,
            ..Default::default()
        };
        assert_eq!(
            AssignmentSettings::from(&settings).answer_visibility,
            AnswerVisibility::Immediately
        );
        assert_eq!(AnswerVisibility::from_flags(false, true), AnswerVisibility::AfterDueDate);
        assert_eq!(AnswerVisibility::from_flags(false, false), AnswerVisibility::Never);
    }

    #[test]
    fn serialized_key_order_is_stable() {
        let qs = vec![tf("a", 1, Some("P"), Some("x.mp3"))];
        let doc = build(&qs, &SettingsForm::default(), &normalizer())
            .unwrap()
            .unwrap();
        let json = serialize(&doc).unwrap();
        let positions: Vec<usize> = ["\"version\"", "\"questions\"", "\"settings\"", "\"readingPassage\"", "\"media\""]
            .iter()
            .map(|key| json.find(key).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
        assert!(json.contains("\"requiresManualGrading\": false"));
        assert_eq!(serialize(&doc).unwrap(), json);
    }

    #[test]
    fn serialize_rejects_relative_audio() {
        let qs = vec![tf("a", 1, None, Some("x.mp3"))];
        let mut doc = build(&qs, &SettingsForm::default(), &normalizer())
            .unwrap()
            .unwrap();
        doc.questions[0].audio_url = Some("raw/x.mp3".into());
        assert!(matches!(
            serialize(&doc),
            Err(DocumentError::RelativeReference(_))
        ));
    }

    #[test]
    fn round_trip_preserves_questions() {
        let mut mc = Question::new(QuestionKind::MultipleChoice, "Pick one");
        mc.id = "mc".into();
        mc.order = 2;
        let first = mc.push_option("red").unwrap();
        mc.push_option("blue");
        if let QuestionBody::MultipleChoice { correct_answer, .. } = &mut mc.body {
            *correct_answer = Some(first);
        }
        mc.passage = Some("Colours".into());
        mc.audio_url = Some("audio/colours.mp3".into());

        let mut essay = Question::new(QuestionKind::Essay, "Describe");
        essay.id = "essay".into();
        essay.order = 1;
        essay.passage = Some("Colours".into());
        essay.audio_url = Some("https://cdn.example.com/audio/colours.mp3".into());

        let settings = SettingsForm {
            time_limit_minutes: Some(30),
            auto_grade: true,
            show_answers_after_due_date: true,
            ..Default::default()
        };
        let drafts: Vec<DraftQuestion> = vec![mc.clone().into(), essay.clone().into()];
        let doc = build(&drafts, &settings, &normalizer()).unwrap().unwrap();
        let loaded = load(&serialize(&doc).unwrap()).unwrap();

        mc.audio_url = Some("https://cdn.example.com/audio/colours.mp3".into());
        let questions: Vec<Question> = loaded.questions.iter().map(|d| d.question.clone()).collect();
        assert_eq!(questions, vec![essay, mc]);
        assert_eq!(loaded.settings, settings);
    }

    #[test]
    fn round_trip_backfills_ungrouped_question_then_stays_stable() {
        let qs = vec![
            tf("a", 1, Some("P1"), Some("clips/one.mp3")),
            tf("b", 2, Some("P1"), Some("clips/one.mp3")),
            tf("c", 3, None, None),
        ];
        let settings = SettingsForm::default();
        let first = serialize(&build(&qs, &settings, &normalizer()).unwrap().unwrap()).unwrap();
        let first_doc: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert!(first_doc["questions"][2].get("passage").is_none());
        assert!(first_doc["questions"][2].get("audioUrl").is_none());

        let loaded = load(&first).unwrap();
        let c = &loaded.questions.as_slice()[2].question;
        assert_eq!(c.id, "c");
        assert_eq!(c.passage.as_deref(), Some("P1"));
        assert_eq!(
            c.audio_url.as_deref(),
            Some("https://cdn.example.com/clips/one.mp3")
        );

        let rebuild = |loaded: &LoadedDocument| {
            let doc = build(loaded.questions.as_slice(), &loaded.settings, &normalizer())
                .unwrap()
                .unwrap();
            serialize(&doc).unwrap()
        };
        let second = rebuild(&loaded);
        let third = rebuild(&load(&second).unwrap());
        assert_eq!(second, third);

        let second_doc: serde_json::Value = serde_json::from_str(&second).unwrap();
        assert_eq!(second_doc["readingPassage"], first_doc["readingPassage"]);
        assert_eq!(second_doc["media"], first_doc["media"]);
    }

    #[test]
    fn load_backfills_canonical_resources() {
        let json = r#"{
            "version": "1.0",
            "questions": [
                {"id": "q1", "order": 1, "promptText": "Is it?", "points": 2,
                 "type": "true_false", "correctAnswer": false, "requiresManualGrading": false}
            ],
            "settings": {"autoGradable": true, "answerVisibility": "never"},
            "readingPassage": "Once upon a time",
            "media": {"audioUrl": "https://cdn.example.com/story.mp3"}
        }"#;
        let loaded = load(json).unwrap();
        let q = &loaded.questions.as_slice()[0].question;
        assert_eq!(q.passage.as_deref(), Some("Once upon a time"));
        assert_eq!(q.audio_url.as_deref(), Some("https://cdn.example.com/story.mp3"));
        assert_eq!(q.points, 2);
        assert!(loaded.settings.auto_grade);
    }

    #[test]
    fn load_rejects_unknown_major_version() {
        let json = r#"{"version": "9.1", "questions": [],
            "settings": {"answerVisibility": "never"}}"#;
        assert!(matches!(load(json), Err(DocumentError::UnsupportedVersion(v)) if v == "9.1"));
        assert!(matches!(load("not json"), Err(DocumentError::Malformed(_))));
    }
}
