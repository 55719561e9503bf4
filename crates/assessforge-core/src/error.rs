//! Error taxonomy for the authoring engine.
//!
//! Every failure is value-returned. Validation and row-import errors are
//! recoverable and carry a single human-readable message; resource resolution
//! errors block a document build; persistence errors are reported but never
//! block authoring.

use thiserror::Error;

/// A step-gate or question-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title is required")]
    MissingTitle,

    #[error("due date is required")]
    MissingDueDate,

    #[error("due date must be in the future")]
    DueDateNotInFuture,

    #[error("a skill must be selected")]
    MissingSkill,

    #[error("add at least one question")]
    NoQuestions,

    #[error("question {order}: question text is required")]
    EmptyPrompt { order: u32 },

    #[error("question {order}: points must be greater than zero")]
    NonPositivePoints { order: u32 },

    #[error("question {order}: at least 2 options are required")]
    TooFewOptions { order: u32 },

    #[error("question {order}: select a correct answer")]
    MissingCorrectAnswer { order: u32 },

    #[error("question {order}: {message}")]
    InvalidAnswer { order: u32, message: String },

    #[error("total points must be greater than zero")]
    NonPositiveTotalPoints,
}

/// A spreadsheet row that could not be turned into a question.
///
/// `row` is the 1-based row number as shown by spreadsheet software, so the
/// header is row 1 and the first data row is row 2.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {row}: {message}")]
pub struct RowImportError {
    pub row: usize,
    pub message: String,
}

impl RowImportError {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            message: message.into(),
        }
    }
}

/// A resource pointer could not be resolved at build time.
#[derive(Debug, Error)]
pub enum ResourceResolutionError {
    /// A question still references an upload that never completed.
    #[error("question {question_id} references an unresolved upload: {file_name}")]
    PendingUpload {
        question_id: String,
        file_name: String,
    },

    /// The upload collaborator failed.
    #[error("upload of {file_name} failed: {source:#}")]
    UploadFailed {
        file_name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Draft save/load/discard failure. Reported, never fatal.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("draft store failed for key {key}: {source:#}")]
    Store {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("draft for key {key} is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode draft for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A serialized document could not be produced or parsed.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported document version: {0}")]
    UnsupportedVersion(String),

    #[error("refusing to emit relative resource path: {0}")]
    RelativeReference(String),
}

/// Failure of the final publish flow.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resource(#[from] ResourceResolutionError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("assignment has no questions to publish")]
    EmptyDocument,

    #[error("submission failed: {0:#}")]
    Submission(anyhow::Error),
}
