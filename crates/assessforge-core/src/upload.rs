//! Resolution of pending audio uploads into public references.

use std::collections::HashMap;

use crate::error::ResourceResolutionError;
use crate::model::{DraftQuestion, PendingUpload};
use crate::traits::{FileMeta, Uploader};

/// Upload every pending audio binary and point its question at the result.
///
/// Identical binaries (same name and bytes) are uploaded once and share the
/// returned reference. On failure the failing question keeps its pending
/// handle so the caller can retry; questions resolved earlier stay resolved.
/// Returns the number of distinct uploads performed.
pub async fn resolve_uploads(
    questions: &mut [DraftQuestion],
    uploader: &dyn Uploader,
) -> Result<usize, ResourceResolutionError> {
    let mut resolved: HashMap<PendingUpload, String> = HashMap::new();

    for draft in questions.iter_mut() {
        let Some(pending) = draft.pending_audio.as_ref() else {
            continue;
        };

        let reference = match resolved.get(pending) {
            Some(reference) => reference.clone(),
            None => {
                let reference = upload_one(uploader, pending).await?;
                resolved.insert(pending.clone(), reference.clone());
                reference
            }
        };

        tracing::debug!(
            question = %draft.question.id,
            reference = %reference,
            "resolved pending audio"
        );
        draft.question.audio_url = Some(reference);
        draft.pending_audio = None;
    }

    if !resolved.is_empty() {
        tracing::info!(uploads = resolved.len(), uploader = uploader.name(), "uploads resolved");
    }
    Ok(resolved.len())
}

async fn upload_one(
    uploader: &dyn Uploader,
    pending: &PendingUpload,
) -> Result<String, ResourceResolutionError> {
    let meta = FileMeta {
        file_name: pending.file_name.clone(),
        content_type: pending.content_type.clone(),
        size: pending.bytes.len() as u64,
    };
    let failed = |source| ResourceResolutionError::UploadFailed {
        file_name: pending.file_name.clone(),
        source,
    };

    let ticket = uploader.request_upload(&meta).await.map_err(failed)?;
    uploader
        .transfer(&ticket, &meta, &pending.bytes)
        .await
        .map_err(failed)?;
    Ok(ticket.public_reference)
}
