//! Core data model types for assessforge.
//!
//! A [`Question`] is one assessment item; its type-specific answer data lives
//! in the [`QuestionBody`] sum type so every variant has to be handled wherever
//! behaviour depends on it. Authoring-only state (pending uploads) rides on the
//! [`DraftQuestion`] wrapper and never reaches a serialized document.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

/// The seven question variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    FillInBlank,
    ShortAnswer,
    Matching,
    Essay,
    Speaking,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 7] = [
        QuestionKind::MultipleChoice,
        QuestionKind::TrueFalse,
        QuestionKind::FillInBlank,
        QuestionKind::ShortAnswer,
        QuestionKind::Matching,
        QuestionKind::Essay,
        QuestionKind::Speaking,
    ];

    /// Whether a human has to grade answers to this kind of question.
    pub fn requires_manual_grading(self) -> bool {
        match self {
            QuestionKind::Essay | QuestionKind::ShortAnswer | QuestionKind::Speaking => true,
            QuestionKind::MultipleChoice
            | QuestionKind::TrueFalse
            | QuestionKind::FillInBlank
            | QuestionKind::Matching => false,
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::MultipleChoice => write!(f, "multiple_choice"),
            QuestionKind::TrueFalse => write!(f, "true_false"),
            QuestionKind::FillInBlank => write!(f, "fill_in_blank"),
            QuestionKind::ShortAnswer => write!(f, "short_answer"),
            QuestionKind::Matching => write!(f, "matching"),
            QuestionKind::Essay => write!(f, "essay"),
            QuestionKind::Speaking => write!(f, "speaking"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        match normalized.as_str() {
            "multiple_choice" | "multiplechoice" | "mcq" | "mc" | "choice" => {
                Ok(QuestionKind::MultipleChoice)
            }
            "true_false" | "true/false" | "truefalse" | "tf" | "t/f" | "boolean" => {
                Ok(QuestionKind::TrueFalse)
            }
            "fill_in_blank" | "fill_in_the_blank" | "fill_blank" | "fib" | "blank" => {
                Ok(QuestionKind::FillInBlank)
            }
            "short_answer" | "short" | "shortanswer" => Ok(QuestionKind::ShortAnswer),
            "matching" | "match" => Ok(QuestionKind::Matching),
            "essay" | "long_answer" | "open" => Ok(QuestionKind::Essay),
            "speaking" | "oral" | "recording" => Ok(QuestionKind::Speaking),
            _ => Err(format!("unknown question type: {}", s.trim())),
        }
    }
}

/// One labeled option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    /// Single letter, assigned sequentially A, B, C…
    pub label: String,
    pub text: String,
}

/// Letter label for the option at `index` (0 → "A").
pub fn option_label(index: usize) -> String {
    if index < 26 {
        char::from(b'A' + index as u8).to_string()
    } else {
        format!("{}", index + 1)
    }
}

/// Accepted answers for a fill-in-blank question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlankAnswer {
    One(String),
    Many(Vec<String>),
}

impl BlankAnswer {
    /// Parse editor input: comma-separated values become several accepted
    /// answers, anything else stays a single literal.
    pub fn from_input(input: &str) -> Self {
        let parts: Vec<String> = input
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() > 1 {
            BlankAnswer::Many(parts)
        } else {
            BlankAnswer::One(input.trim().to_string())
        }
    }

    pub fn accepted(&self) -> Vec<&str> {
        match self {
            BlankAnswer::One(s) => vec![s.as_str()],
            BlankAnswer::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accepted().iter().all(|s| s.trim().is_empty())
    }
}

/// A correct left→right pairing of a matching question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub left: String,
    pub right: String,
}

/// Variant-specific answer data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum QuestionBody {
    MultipleChoice {
        #[serde(default)]
        options: Vec<ChoiceOption>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correct_answer: Option<String>,
    },
    TrueFalse {
        correct_answer: bool,
    },
    FillInBlank {
        correct_answer: BlankAnswer,
    },
    ShortAnswer {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        keywords: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<u32>,
    },
    Matching {
        #[serde(default)]
        left_items: Vec<String>,
        #[serde(default)]
        right_items: Vec<String>,
        #[serde(default)]
        pairs: Vec<MatchPair>,
    },
    Essay {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        keywords: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<u32>,
    },
    Speaking {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_duration_secs: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        instructions: Option<String>,
    },
}

impl QuestionBody {
    /// A blank body for a freshly added question of `kind`.
    pub fn empty(kind: QuestionKind) -> Self {
        match kind {
            QuestionKind::MultipleChoice => QuestionBody::MultipleChoice {
                options: Vec::new(),
                correct_answer: None,
            },
            QuestionKind::TrueFalse => QuestionBody::TrueFalse {
                correct_answer: true,
            },
            QuestionKind::FillInBlank => QuestionBody::FillInBlank {
                correct_answer: BlankAnswer::One(String::new()),
            },
            QuestionKind::ShortAnswer => QuestionBody::ShortAnswer {
                keywords: Vec::new(),
                max_length: None,
            },
            QuestionKind::Matching => QuestionBody::Matching {
                left_items: Vec::new(),
                right_items: Vec::new(),
                pairs: Vec::new(),
            },
            QuestionKind::Essay => QuestionBody::Essay {
                keywords: Vec::new(),
                max_length: None,
            },
            QuestionKind::Speaking => QuestionBody::Speaking {
                max_duration_secs: None,
                instructions: None,
            },
        }
    }

    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionBody::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            QuestionBody::TrueFalse { .. } => QuestionKind::TrueFalse,
            QuestionBody::FillInBlank { .. } => QuestionKind::FillInBlank,
            QuestionBody::ShortAnswer { .. } => QuestionKind::ShortAnswer,
            QuestionBody::Matching { .. } => QuestionKind::Matching,
            QuestionBody::Essay { .. } => QuestionKind::Essay,
            QuestionBody::Speaking { .. } => QuestionKind::Speaking,
        }
    }

    fn validate(&self, order: u32) -> Result<(), ValidationError> {
        let invalid = |message: &str| ValidationError::InvalidAnswer {
            order,
            message: message.to_string(),
        };

        match self {
            QuestionBody::MultipleChoice {
                options,
                correct_answer,
            } => {
                if options.len() < 2 {
                    return Err(ValidationError::TooFewOptions { order });
                }
                let matches = correct_answer
                    .as_deref()
                    .is_some_and(|id| options.iter().any(|o| o.id == id));
                if !matches {
                    return Err(ValidationError::MissingCorrectAnswer { order });
                }
                Ok(())
            }
            QuestionBody::TrueFalse { .. } => Ok(()),
            QuestionBody::FillInBlank { correct_answer } => {
                if correct_answer.is_empty() {
                    return Err(invalid("an accepted answer is required"));
                }
                Ok(())
            }
            QuestionBody::Matching {
                left_items,
                right_items,
                pairs,
            } => {
                if left_items.is_empty() || right_items.is_empty() || pairs.is_empty() {
                    return Err(invalid("matching needs items on both sides and at least one pair"));
                }
                let dangling = pairs
                    .iter()
                    .any(|p| !left_items.contains(&p.left) || !right_items.contains(&p.right));
                if dangling {
                    return Err(invalid("a pair references an unknown item"));
                }
                Ok(())
            }
            QuestionBody::ShortAnswer { max_length, .. } | QuestionBody::Essay { max_length, .. } => {
                if *max_length == Some(0) {
                    return Err(invalid("maximum length must be greater than zero"));
                }
                Ok(())
            }
            QuestionBody::Speaking {
                max_duration_secs, ..
            } => {
                if *max_duration_secs == Some(0) {
                    return Err(invalid("maximum duration must be greater than zero"));
                }
                Ok(())
            }
        }
    }
}

/// A single assessment item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Stable identifier, unique within a document.
    pub id: String,
    /// 1-based position, dense within a document.
    pub order: u32,
    pub prompt_text: String,
    pub points: u32,
    #[serde(flatten)]
    pub body: QuestionBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Exact text of the reading passage this question is grouped under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    /// Reference to the audio clip this question is grouped under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl Question {
    /// A new question with a random id, one point and an empty body.
    pub fn new(kind: QuestionKind, prompt_text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            order: 0,
            prompt_text: prompt_text.into(),
            points: 1,
            body: QuestionBody::empty(kind),
            explanation: None,
            passage: None,
            audio_url: None,
        }
    }

    pub fn kind(&self) -> QuestionKind {
        self.body.kind()
    }

    /// Derived from the variant; never stored independently.
    pub fn requires_manual_grading(&self) -> bool {
        self.kind().requires_manual_grading()
    }

    /// Check the question is complete enough to appear in a document.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prompt_text.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt { order: self.order });
        }
        if self.points == 0 {
            return Err(ValidationError::NonPositivePoints { order: self.order });
        }
        self.body.validate(self.order)
    }

    /// Append a multiple-choice option with the next letter label.
    ///
    /// Returns the new option id, or `None` if this is not a multiple-choice
    /// question.
    pub fn push_option(&mut self, text: impl Into<String>) -> Option<String> {
        let QuestionBody::MultipleChoice { options, .. } = &mut self.body else {
            return None;
        };
        let id = format!("opt-{}", Uuid::new_v4().simple());
        options.push(ChoiceOption {
            id: id.clone(),
            label: option_label(options.len()),
            text: text.into(),
        });
        Some(id)
    }

    /// Remove a multiple-choice option and relabel the rest.
    ///
    /// Clears the correct answer if it pointed at the removed option.
    pub fn remove_option(&mut self, option_id: &str) -> bool {
        let QuestionBody::MultipleChoice {
            options,
            correct_answer,
        } = &mut self.body
        else {
            return false;
        };
        let before = options.len();
        options.retain(|o| o.id != option_id);
        if options.len() == before {
            return false;
        }
        for (i, option) in options.iter_mut().enumerate() {
            option.label = option_label(i);
        }
        if correct_answer.as_deref() == Some(option_id) {
            *correct_answer = None;
        }
        true
    }
}

/// A binary picked for upload but not yet transferred.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A question as held during authoring.
///
/// The pending upload is resolved into `question.audio_url` before a
/// document can be built and is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftQuestion {
    #[serde(flatten)]
    pub question: Question,
    #[serde(skip)]
    pub pending_audio: Option<PendingUpload>,
}

impl From<Question> for DraftQuestion {
    fn from(question: Question) -> Self {
        Self {
            question,
            pending_audio: None,
        }
    }
}

/// The ordered, editable list of questions of one authoring session.
///
/// Storage order always equals `order`, and `order` is re-issued as `1..=N`
/// after every add, remove or reorder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionList {
    items: Vec<DraftQuestion>,
}

impl QuestionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from questions, keeping their relative `order`.
    pub fn from_questions(mut questions: Vec<Question>) -> Self {
        questions.sort_by_key(|q| q.order);
        let mut list = Self {
            items: questions.into_iter().map(DraftQuestion::from).collect(),
        };
        list.renumber();
        list
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DraftQuestion> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[DraftQuestion] {
        &self.items
    }

    pub fn as_mut_slice(&mut self) -> &mut [DraftQuestion] {
        &mut self.items
    }

    pub fn get(&self, id: &str) -> Option<&DraftQuestion> {
        self.items.iter().find(|d| d.question.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut DraftQuestion> {
        self.items.iter_mut().find(|d| d.question.id == id)
    }

    /// Append a question at the end.
    pub fn add(&mut self, question: impl Into<DraftQuestion>) -> &mut DraftQuestion {
        self.items.push(question.into());
        self.renumber();
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    pub fn remove(&mut self, id: &str) -> Option<DraftQuestion> {
        let index = self.items.iter().position(|d| d.question.id == id)?;
        let removed = self.items.remove(index);
        self.renumber();
        Some(removed)
    }

    /// Move a question to the 1-based `position`, clamped to the list bounds.
    pub fn move_to(&mut self, id: &str, position: usize) -> bool {
        let Some(index) = self.items.iter().position(|d| d.question.id == id) else {
            return false;
        };
        let item = self.items.remove(index);
        let target = position.saturating_sub(1).min(self.items.len());
        self.items.insert(target, item);
        self.renumber();
        true
    }

    /// Reorder to match `ids` exactly. Fails without change unless `ids` is a
    /// permutation of the current ids.
    pub fn reorder(&mut self, ids: &[&str]) -> bool {
        if ids.len() != self.items.len() {
            return false;
        }
        let mut reordered = Vec::with_capacity(ids.len());
        let mut remaining = self.items.clone();
        for id in ids {
            let Some(pos) = remaining.iter().position(|d| d.question.id == *id) else {
                return false;
            };
            reordered.push(remaining.swap_remove(pos));
        }
        self.items = reordered;
        self.renumber();
        true
    }

    /// Sum of all points, saturating at `u32::MAX`.
    pub fn total_points(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |total, d| total.saturating_add(d.question.points))
    }

    pub fn into_inner(self) -> Vec<DraftQuestion> {
        self.items
    }

    fn renumber(&mut self) {
        for (i, draft) in self.items.iter_mut().enumerate() {
            draft.question.order = i as u32 + 1;
        }
    }
}
