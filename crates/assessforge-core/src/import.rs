//! Spreadsheet question import.
//!
//! Turns header-plus-rows tabular data into questions. Column detection is
//! tolerant (case-insensitive synonyms matched at the start of header words), shared passage/audio
//! cells carry forward to following rows until replaced, and bad rows are
//! collected as errors without aborting the import.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};

use crate::error::RowImportError;
use crate::model::{
    option_label, BlankAnswer, ChoiceOption, MatchPair, Question, QuestionBody, QuestionKind,
    QuestionList,
};

/// Lettered option columns read for multiple-choice rows.
pub const MAX_OPTIONS: usize = 6;

/// Upper bound for a single question's points.
pub const MAX_POINTS: u32 = 10_000;

/// A logical column the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Type,
    Question,
    /// Option column `A` + index.
    Option(usize),
    Answer,
    Points,
    Explanation,
    Keywords,
    Passage,
    Audio,
}

/// Resolution order. More specific fields claim headers first so that
/// "Question Type" lands on `Type` and "Answer Explanation" on `Explanation`.
fn resolution_order() -> Vec<Field> {
    let mut fields = vec![Field::Type];
    fields.extend((0..MAX_OPTIONS).map(Field::Option));
    fields.extend([
        Field::Explanation,
        Field::Keywords,
        Field::Answer,
        Field::Points,
        Field::Passage,
        Field::Audio,
        Field::Question,
    ]);
    fields
}

fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn header_matches(field: Field, header: &str) -> bool {
    // "Points" and "QuestionText" match, "Remarks" and "Bookmark" do not.
    let words: Vec<&str> = header
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let contains_any = |needles: &[&str]| {
        needles
            .iter()
            .any(|n| words.iter().any(|w| w.starts_with(n)))
    };
    let equals_any = |names: &[&str]| names.iter().any(|n| header == *n);

    match field {
        Field::Type => contains_any(&["type", "kind"]) || equals_any(&["variant"]),
        Field::Question => contains_any(&["question", "prompt", "stem"]) || equals_any(&["q"]),
        Field::Option(index) => {
            let letter = option_label(index).to_lowercase();
            let compact: String = header.split_whitespace().collect();
            compact == letter
                || ["option", "choice", "opt"]
                    .iter()
                    .any(|prefix| compact == format!("{prefix}{letter}"))
        }
        Field::Answer => contains_any(&["answer", "correct"]) || equals_any(&["key", "ans"]),
        Field::Points => contains_any(&["point", "score", "mark"]) || equals_any(&["pts"]),
        Field::Explanation => {
            contains_any(&["explanation", "rationale"]) || equals_any(&["feedback"])
        }
        Field::Keywords => contains_any(&["keyword"]),
        Field::Passage => contains_any(&["passage", "reading"]),
        Field::Audio => contains_any(&["audio", "listening", "sound"]) || equals_any(&["mp3"]),
    }
}

/// Which column each logical field was found in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: HashMap<Field, usize>,
}

impl ColumnMap {
    /// Detect columns from a header row. Each header is claimed by at most one
    /// field; within a field the leftmost matching header wins.
    pub fn detect<S: AsRef<str>>(header: &[S]) -> Self {
        let normalized: Vec<String> = header.iter().map(|h| normalize_header(h.as_ref())).collect();
        let mut claimed = vec![false; normalized.len()];
        let mut columns = HashMap::new();

        for field in resolution_order() {
            let found = normalized
                .iter()
                .enumerate()
                .find(|(i, h)| !claimed[*i] && !h.is_empty() && header_matches(field, h));
            if let Some((i, _)) = found {
                claimed[i] = true;
                columns.insert(field, i);
            }
        }

        tracing::debug!(detected = columns.len(), "detected import columns");
        Self { columns }
    }

    pub fn column(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// Trimmed cell value, `None` if the column is absent or the cell blank.
    pub fn cell<'r, S: AsRef<str>>(&self, row: &'r [S], field: Field) -> Option<&'r str> {
        let index = self.column(field)?;
        row.get(index)
            .map(|c| c.as_ref().trim())
            .filter(|c| !c.is_empty())
    }
}

/// Sticky passage/audio state threaded through the rows.
///
/// A non-empty cell becomes the current value; an empty cell reuses whatever
/// was seen last, or nothing if no value has been seen yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarryForward {
    passage: Option<String>,
    audio: Option<String>,
}

impl CarryForward {
    /// Returns the `(passage, audio)` pair that applies to this row.
    pub fn apply(
        &mut self,
        passage_cell: Option<&str>,
        audio_cell: Option<&str>,
    ) -> (Option<String>, Option<String>) {
        if let Some(passage) = passage_cell {
            self.passage = Some(passage.to_string());
        }
        if let Some(audio) = audio_cell {
            self.audio = Some(audio.to_string());
        }
        (self.passage.clone(), self.audio.clone())
    }
}

/// Result of an import: the preview plus per-row errors.
///
/// Nothing reaches an assignment until the caller confirms with
/// [`ImportOutcome::into_question_list`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub questions: Vec<Question>,
    pub errors: Vec<RowImportError>,
}

impl ImportOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_question_list(self) -> QuestionList {
        QuestionList::from_questions(self.questions)
    }
}

/// Import questions from rows whose first entry is the header.
pub fn import_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();
    let Some((header, data)) = rows.split_first() else {
        outcome
            .errors
            .push(RowImportError::new(1, "a header row is required"));
        return outcome;
    };

    let columns = ColumnMap::detect(header);
    let mut carry = CarryForward::default();

    for (i, row) in data.iter().enumerate() {
        let row_number = i + 2;
        let row = row.as_slice();

        if row.iter().all(|c| c.as_ref().trim().is_empty()) {
            continue;
        }

        let Some(prompt) = columns.cell(row, Field::Question) else {
            let err = RowImportError::new(row_number, "question text is required");
            tracing::warn!("skipping {err}");
            outcome.errors.push(err);
            continue;
        };

        let (passage, audio) = carry.apply(
            columns.cell(row, Field::Passage),
            columns.cell(row, Field::Audio),
        );

        let order = outcome.questions.len() as u32 + 1;
        match parse_row(&columns, row, row_number, prompt) {
            Ok(mut question) => {
                question.order = order;
                question.passage = passage;
                question.audio_url = audio;
                outcome.questions.push(question);
            }
            Err(err) => {
                tracing::warn!("skipping {err}");
                outcome.errors.push(err);
            }
        }
    }

    tracing::info!(
        imported = outcome.questions.len(),
        errors = outcome.errors.len(),
        "spreadsheet import finished"
    );
    outcome
}

fn parse_row<S: AsRef<str>>(
    columns: &ColumnMap,
    row: &[S],
    row_number: usize,
    prompt: &str,
) -> Result<Question, RowImportError> {
    let fail = |message: String| RowImportError::new(row_number, message);

    let kind = match columns.cell(row, Field::Type) {
        Some(raw) => raw.parse::<QuestionKind>().map_err(fail)?,
        None => QuestionKind::MultipleChoice,
    };

    let points = match columns.cell(row, Field::Points) {
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|p| (1..=MAX_POINTS).contains(p))
            .ok_or_else(|| {
                fail(format!(
                    "points must be a whole number from 1 to {MAX_POINTS}, got \"{raw}\""
                ))
            })?,
        None => 1,
    };

    let id = format!("row-{row_number}");
    let answer = columns.cell(row, Field::Answer);

    let body = match kind {
        QuestionKind::MultipleChoice => parse_multiple_choice(columns, row, &id, answer).map_err(fail)?,
        QuestionKind::TrueFalse => QuestionBody::TrueFalse {
            correct_answer: parse_true_false(answer).map_err(fail)?,
        },
        QuestionKind::FillInBlank => QuestionBody::FillInBlank {
            correct_answer: BlankAnswer::One(
                answer
                    .ok_or_else(|| fail("fill in the blank needs an answer".to_string()))?
                    .to_string(),
            ),
        },
        QuestionKind::ShortAnswer => QuestionBody::ShortAnswer {
            keywords: parse_keywords(columns.cell(row, Field::Keywords)),
            max_length: None,
        },
        QuestionKind::Essay => QuestionBody::Essay {
            keywords: parse_keywords(columns.cell(row, Field::Keywords)),
            max_length: None,
        },
        QuestionKind::Matching => parse_matching(answer).map_err(fail)?,
        QuestionKind::Speaking => QuestionBody::Speaking {
            max_duration_secs: None,
            instructions: None,
        },
    };

    Ok(Question {
        id,
        order: 0,
        prompt_text: prompt.to_string(),
        points,
        body,
        explanation: columns.cell(row, Field::Explanation).map(str::to_string),
        passage: None,
        audio_url: None,
    })
}

fn parse_multiple_choice<S: AsRef<str>>(
    columns: &ColumnMap,
    row: &[S],
    question_id: &str,
    answer: Option<&str>,
) -> Result<QuestionBody, String> {
    // (column letter, option)
    let mut populated: Vec<(String, ChoiceOption)> = Vec::new();
    for index in 0..MAX_OPTIONS {
        if let Some(text) = columns.cell(row, Field::Option(index)) {
            let column_letter = option_label(index);
            populated.push((
                column_letter.clone(),
                ChoiceOption {
                    id: format!("{question_id}-{}", column_letter.to_lowercase()),
                    label: option_label(populated.len()),
                    text: text.to_string(),
                },
            ));
        }
    }

    if populated.len() < 2 {
        return Err(format!(
            "multiple choice needs at least 2 options, found {}",
            populated.len()
        ));
    }

    let answer = answer.ok_or_else(|| "multiple choice needs an answer".to_string())?;
    let by_letter = populated
        .iter()
        .find(|(letter, _)| letter.eq_ignore_ascii_case(answer));
    let by_text = || {
        populated
            .iter()
            .find(|(_, option)| option.text.to_lowercase() == answer.to_lowercase())
    };
    let (_, correct) = by_letter
        .or_else(by_text)
        .ok_or_else(|| format!("answer \"{answer}\" does not match any option"))?;
    let correct_answer = Some(correct.id.clone());

    Ok(QuestionBody::MultipleChoice {
        options: populated.into_iter().map(|(_, option)| option).collect(),
        correct_answer,
    })
}

fn parse_true_false(answer: Option<&str>) -> Result<bool, String> {
    let token = answer.unwrap_or_default();
    match token.to_uppercase().as_str() {
        "TRUE" | "T" | "1" => Ok(true),
        "FALSE" | "F" | "0" => Ok(false),
        _ => Err(format!(
            "true/false answer must be TRUE/T/1 or FALSE/F/0, got \"{token}\""
        )),
    }
}

fn parse_keywords(cell: Option<&str>) -> Vec<String> {
    cell.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// `left=right; left=right`
fn parse_matching(answer: Option<&str>) -> Result<QuestionBody, String> {
    let mut left_items: Vec<String> = Vec::new();
    let mut right_items: Vec<String> = Vec::new();
    let mut pairs = Vec::new();

    for entry in answer.unwrap_or_default().split(';') {
        let Some((left, right)) = entry.split_once('=') else {
            if entry.trim().is_empty() {
                continue;
            }
            return Err(format!("matching pair \"{}\" must look like left=right", entry.trim()));
        };
        let (left, right) = (left.trim().to_string(), right.trim().to_string());
        if left.is_empty() || right.is_empty() {
            return Err("matching pairs need text on both sides".to_string());
        }
        if !left_items.contains(&left) {
            left_items.push(left.clone());
        }
        if !right_items.contains(&right) {
            right_items.push(right.clone());
        }
        pairs.push(MatchPair { left, right });
    }

    if pairs.is_empty() {
        return Err("matching needs at least one left=right pair".to_string());
    }

    Ok(QuestionBody::Matching {
        left_items,
        right_items,
        pairs,
    })
}

/// Read every record of a CSV source as raw string rows, header included.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Vec<String>>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    csv_reader
        .records()
        .map(|record| -> Result<Vec<String>> {
            let record = record.context("failed to read CSV record")?;
            Ok(record.iter().map(str::to_string).collect())
        })
        .collect()
}

/// Spreadsheet file formats the importer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    /// Excel or OpenDocument workbook; only the first sheet is read.
    Workbook,
}

impl SheetFormat {
    /// Pick a format by file extension. Unknown extensions are read as CSV.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => SheetFormat::Workbook,
            _ => SheetFormat::Csv,
        }
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // Numeric cells come back as floats; "3" not "3.0" for whole numbers.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
        other => other.to_string(),
    }
}

/// Read the rows of a workbook's first sheet as text cells.
pub fn read_workbook(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook: {}", path.display()))?;
    let sheets = workbook.sheet_names();
    let range = workbook
        .worksheet_range_at(0)
        .with_context(|| format!("workbook has no sheets: {}", path.display()))?
        .with_context(|| format!("failed to read first sheet: {}", path.display()))?;

    if sheets.len() > 1 {
        tracing::debug!(
            sheet = %sheets[0],
            ignored = sheets.len() - 1,
            "reading first sheet only"
        );
    }

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// Read and import a CSV file or workbook in one step.
pub fn import_file(path: &Path) -> Result<ImportOutcome> {
    let rows = match SheetFormat::from_path(path) {
        SheetFormat::Csv => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("failed to open spreadsheet: {}", path.display()))?;
            read_csv(file).with_context(|| format!("failed to parse CSV: {}", path.display()))?
        }
        SheetFormat::Workbook => read_workbook(path)?,
    };
    Ok(import_rows(&rows))
}
