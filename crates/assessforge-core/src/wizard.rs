//! Multi-step authoring state machine.
//!
//! Steps move forward or backward one at a time. Moving forward validates the
//! step being left; a failure leaves every entered field untouched and records
//! a single current error message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::SettingsForm;
use crate::error::ValidationError;
use crate::model::QuestionList;

/// Whether students upload a file or answer structured questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentKind {
    FileSubmission,
    Structured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Basic,
    Questions,
    Settings,
    Preview,
}

const FILE_SUBMISSION_STEPS: &[Step] = &[Step::Basic, Step::Settings, Step::Preview];
const STRUCTURED_STEPS: &[Step] = &[Step::Basic, Step::Questions, Step::Settings, Step::Preview];

impl AssignmentKind {
    /// The ordered step sequence for this kind.
    pub fn steps(self) -> &'static [Step] {
        match self {
            AssignmentKind::FileSubmission => FILE_SUBMISSION_STEPS,
            AssignmentKind::Structured => STRUCTURED_STEPS,
        }
    }
}

/// Fields of the `basic` step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    /// Classification of the assignment (e.g. "reading", "listening").
    #[serde(default)]
    pub skill: Option<String>,
}

/// One in-progress authoring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthoringSession {
    pub kind: AssignmentKind,
    step: Step,
    pub basic: BasicInfo,
    #[serde(default)]
    pub questions: QuestionList,
    #[serde(default)]
    pub settings: SettingsForm,
    #[serde(skip)]
    error: Option<String>,
}

impl AuthoringSession {
    pub fn new(kind: AssignmentKind) -> Self {
        Self {
            kind,
            step: Step::Basic,
            basic: BasicInfo::default(),
            questions: QuestionList::new(),
            settings: SettingsForm::default(),
            error: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    /// The message of the last failed transition, cleared on success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.step == Step::Preview
    }

    /// Advance using the current wall clock for the due-date check.
    pub fn advance(&mut self) -> Result<Step, ValidationError> {
        self.advance_at(Utc::now())
    }

    /// Validate the current step against `now` and advance one step.
    ///
    /// `preview` is terminal: advancing from it is a no-op.
    pub fn advance_at(&mut self, now: DateTime<Utc>) -> Result<Step, ValidationError> {
        if let Err(err) = self.validate_step(self.step, now) {
            tracing::debug!(step = ?self.step, %err, "step validation failed");
            self.error = Some(err.to_string());
            return Err(err);
        }
        self.error = None;

        let steps = self.kind.steps();
        if let Some(pos) = steps.iter().position(|s| *s == self.step) {
            if let Some(next) = steps.get(pos + 1) {
                self.step = *next;
            }
        }
        Ok(self.step)
    }

    /// Go back one step without validation. Stays put on the first step.
    pub fn back(&mut self) -> Step {
        let steps = self.kind.steps();
        if let Some(pos) = steps.iter().position(|s| *s == self.step) {
            if pos > 0 {
                self.step = steps[pos - 1];
            }
        }
        self.error = None;
        self.step
    }

    /// Check one step's gate without moving.
    pub fn validate_step(&self, step: Step, now: DateTime<Utc>) -> Result<(), ValidationError> {
        match step {
            Step::Basic => validate_basic(&self.basic, now),
            Step::Questions => validate_questions(&self.questions),
            Step::Settings => self.validate_settings(),
            Step::Preview => Ok(()),
        }
    }

    /// Check every step of this kind in order, stopping at the first failure.
    pub fn validate_all(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        self.kind
            .steps()
            .iter()
            .try_for_each(|step| self.validate_step(*step, now))
    }

    /// Points the assignment is worth: the question sum for structured
    /// assignments, the operator-set maximum for file submissions.
    pub fn total_points(&self) -> u32 {
        match self.kind {
            AssignmentKind::Structured => self.questions.total_points(),
            AssignmentKind::FileSubmission => self.settings.max_points.unwrap_or(0),
        }
    }

    fn validate_settings(&self) -> Result<(), ValidationError> {
        match self.kind {
            AssignmentKind::Structured if self.total_points() == 0 => {
                Err(ValidationError::NonPositiveTotalPoints)
            }
            AssignmentKind::Structured | AssignmentKind::FileSubmission => Ok(()),
        }
    }

    /// Replace all state with a restored snapshot's, keeping the step valid
    /// for the restored kind.
    pub(crate) fn overwrite_with(&mut self, other: AuthoringSession) {
        *self = other;
        if !self.kind.steps().contains(&self.step) {
            self.step = Step::Basic;
        }
        self.error = None;
    }
}

fn validate_basic(basic: &BasicInfo, now: DateTime<Utc>) -> Result<(), ValidationError> {
    if basic.title.trim().is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    let due_at = basic.due_at.ok_or(ValidationError::MissingDueDate)?;
    if due_at <= now {
        return Err(ValidationError::DueDateNotInFuture);
    }
    if basic.skill.as_deref().map_or(true, |s| s.trim().is_empty()) {
        return Err(ValidationError::MissingSkill);
    }
    Ok(())
}

fn validate_questions(questions: &QuestionList) -> Result<(), ValidationError> {
    if questions.is_empty() {
        return Err(ValidationError::NoQuestions);
    }
    questions
        .iter()
        .try_for_each(|draft| draft.question.validate())
}
