//! The `assessforge draft` commands.

use std::path::PathBuf;

use anyhow::Result;

use assessforge_providers::config::load_config_from;

pub fn show(key: String, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let drafts = config.draft_store();

    let Some(snapshot) = drafts.load(&key)? else {
        println!("No draft saved for key {key}.");
        return Ok(());
    };

    let session = &snapshot.session;
    println!("Draft {key} (saved {})", snapshot.saved_at.to_rfc3339());
    println!("  Kind:      {:?}", session.kind);
    println!("  Step:      {:?}", session.step());
    println!(
        "  Title:     {}",
        if session.basic.title.is_empty() {
            "(none)"
        } else {
            session.basic.title.as_str()
        }
    );
    if let Some(due_at) = session.basic.due_at {
        println!("  Due:       {}", due_at.to_rfc3339());
    }
    println!("  Questions: {}", session.questions.len());
    println!("  Points:    {}", session.total_points());

    Ok(())
}

pub fn discard(key: String, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    config.draft_store().discard(&key)?;
    println!("Discarded draft {key}.");
    Ok(())
}
