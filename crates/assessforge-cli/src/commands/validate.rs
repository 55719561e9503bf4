//! The `assessforge validate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use assessforge_core::document;

pub fn execute(document_path: PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(&document_path)
        .with_context(|| format!("failed to read document: {}", document_path.display()))?;
    let loaded = document::load(&text)
        .with_context(|| format!("failed to load document: {}", document_path.display()))?;

    println!(
        "Document: {} question(s), {} point(s)",
        loaded.questions.len(),
        loaded.questions.total_points()
    );

    let mut invalid = 0;
    for draft in loaded.questions.iter() {
        if let Err(err) = draft.question.validate() {
            println!("  [{}] INVALID: {err}", draft.question.id);
            invalid += 1;
        }
    }

    if loaded.questions.is_empty() {
        anyhow::bail!("document has no questions");
    }
    if invalid > 0 {
        anyhow::bail!("{invalid} invalid question(s) found");
    }
    println!("All questions valid.");

    Ok(())
}
