//! The `assessforge groups` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use assessforge_core::document;
use assessforge_core::grouping::{canonical_group, group_by_resource, ResourceKind};
use assessforge_core::model::Question;

use super::truncate;

pub fn execute(document_path: PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(&document_path)
        .with_context(|| format!("failed to read document: {}", document_path.display()))?;
    let loaded = document::load(&text)?;
    let questions: Vec<&Question> = loaded.questions.iter().map(|d| &d.question).collect();

    let mut table = Table::new();
    table.set_header(vec!["Kind", "Reference", "Questions", "Canonical"]);
    let mut rows = 0;

    for kind in [ResourceKind::Passage, ResourceKind::Audio] {
        let groups = group_by_resource(questions.iter().copied(), kind);
        let canonical = canonical_group(&groups).map(|g| g.reference.as_str());
        for group in &groups {
            let orders: Vec<String> = group
                .question_ids
                .iter()
                .filter_map(|id| loaded.questions.get(id))
                .map(|d| d.question.order.to_string())
                .collect();
            table.add_row(vec![
                Cell::new(format!("{kind:?}").to_lowercase()),
                Cell::new(truncate(&group.reference, 40)),
                Cell::new(orders.join(", ")),
                Cell::new(if canonical == Some(group.reference.as_str()) {
                    "yes"
                } else {
                    ""
                }),
            ]);
            rows += 1;
        }
    }

    if rows == 0 {
        println!("No shared passages or audio.");
    } else {
        println!("{table}");
    }

    Ok(())
}
