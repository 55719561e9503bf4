//! The `assessforge import` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use assessforge_core::document::{self, SettingsForm};
use assessforge_core::import::import_file;
use assessforge_core::model::Question;
use assessforge_providers::config::load_config_from;

use super::truncate;

pub fn execute(
    sheet: PathBuf,
    output: Option<PathBuf>,
    settings: SettingsForm,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let outcome = import_file(&sheet)?;

    if !outcome.questions.is_empty() {
        print_preview(&outcome.questions);
    }
    for err in &outcome.errors {
        eprintln!("  {err}");
    }
    println!(
        "{} question(s) imported, {} row error(s).",
        outcome.questions.len(),
        outcome.errors.len()
    );

    let Some(output) = output else {
        return Ok(());
    };

    let questions = outcome.into_question_list();
    let built = document::build(questions.as_slice(), &settings, &config.normalizer())?
        .context("no questions were imported, nothing to write")?;
    let text = document::serialize(&built)?;
    std::fs::write(&output, text)
        .with_context(|| format!("failed to write document: {}", output.display()))?;
    println!(
        "Wrote {} ({} points)",
        output.display(),
        built.total_points()
    );

    Ok(())
}

fn print_preview(questions: &[Question]) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Type", "Question", "Points", "Passage", "Audio"]);

    for q in questions {
        table.add_row(vec![
            Cell::new(q.order),
            Cell::new(q.kind()),
            Cell::new(truncate(&q.prompt_text, 48)),
            Cell::new(q.points),
            Cell::new(q.passage.as_deref().map(|p| truncate(p, 24)).unwrap_or_default()),
            Cell::new(q.audio_url.as_deref().unwrap_or_default()),
        ]);
    }

    println!("{table}");
}
