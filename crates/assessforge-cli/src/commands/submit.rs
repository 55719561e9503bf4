//! The `assessforge submit` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use assessforge_core::document;
use assessforge_core::publish::Publisher;
use assessforge_core::traits::SubmitOutcome;
use assessforge_core::wizard::{AssignmentKind, AuthoringSession};
use assessforge_providers::config::{create_submitter, create_uploader, load_config_from};

pub struct SubmitArgs {
    pub document: PathBuf,
    pub title: String,
    pub due: String,
    pub skill: String,
    pub instructions: String,
    pub draft_key: String,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: SubmitArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;
    tracing::debug!(backend = ?config.backend, "loaded backend config");

    let due_at = DateTime::parse_from_rfc3339(&args.due)
        .with_context(|| format!("invalid due date (expected RFC 3339): {}", args.due))?
        .with_timezone(&Utc);

    let text = std::fs::read_to_string(&args.document)
        .with_context(|| format!("failed to read document: {}", args.document.display()))?;
    let loaded = document::load(&text)
        .with_context(|| format!("failed to load document: {}", args.document.display()))?;

    let mut session = AuthoringSession::new(AssignmentKind::Structured);
    session.basic.title = args.title;
    session.basic.instructions = args.instructions;
    session.basic.due_at = Some(due_at);
    session.basic.skill = Some(args.skill);
    session.questions = loaded.questions;
    session.settings = loaded.settings;

    let drafts = config.draft_store();
    let publisher = Publisher::new(
        create_uploader(&config.backend),
        create_submitter(&config.backend),
        config.normalizer(),
    )
    .with_drafts(drafts.clone());

    let outcome = match publisher.publish(&mut session, &args.draft_key, Utc::now()).await {
        Ok(outcome) => outcome,
        Err(err) => {
            if drafts.autosave(&args.draft_key, &session) {
                eprintln!("Saved draft {} for a later retry.", args.draft_key);
            }
            return Err(err.into());
        }
    };

    match outcome {
        SubmitOutcome::Accepted { assignment_id } => {
            match assignment_id {
                Some(id) => println!("Submitted assignment {id}."),
                None => println!("Submitted assignment."),
            }
            Ok(())
        }
        SubmitOutcome::Rejected { reason } => {
            drafts.autosave(&args.draft_key, &session);
            anyhow::bail!("submission rejected: {reason}")
        }
    }
}
