use std::sync::Arc;

use bytes::Bytes;

use crate::document::assembler::Assembler;
use crate::document::asset::{decode_data_url, AssetFault, AssetSlot};
use crate::document::render::render;
use crate::email::AttachmentSet;
use crate::error::AppError;
use crate::state::SharedState;

use super::record::SubmissionRecord;
use super::reference::ReferenceId;

pub struct PipelineResult {
    pub reference: ReferenceId,
    pub mailed: bool,
}

/// Assemble, persist and (optionally) email one submission.
///
/// Asset faults are absorbed along the way. Only a failed write of the main
/// document, a render failure, or a failed send on a configured transport
/// fail the request. A failed send does not remove the persisted files.
pub async fn run(state: &SharedState, record: SubmissionRecord) -> Result<PipelineResult, AppError> {
    let reference = ReferenceId::generate();
    let record = Arc::new(record);

    let pdf = {
        let faults = state.faults.clone();
        let reference = reference.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || {
            let artifact = Assembler::new(reference.as_str(), faults.as_ref()).assemble(&record);
            render(&artifact)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Document task failed: {e}")))?
        .map_err(|e| AppError::Render(e.to_string()))?
    };
    let pdf = Bytes::from(pdf);

    let document_path = state.store.persist(&reference, &pdf).await?;
    tracing::info!(
        reference = %reference,
        path = %document_path.display(),
        bytes = pdf.len(),
        "Sign-off document written"
    );

    let mut attachments = AttachmentSet::new();
    attachments.push(reference.document_filename(), pdf);

    if let Some(data_url) = &record.bol_pdf_data_url {
        match decode_data_url(data_url) {
            Ok(bytes) => match state.store.persist_companion(&reference, &bytes).await {
                Ok(path) => {
                    tracing::info!(reference = %reference, path = %path.display(), "Companion PDF written");
                    attachments.push(reference.companion_attachment_name(), bytes);
                }
                Err(e) => {
                    tracing::warn!(reference = %reference, "Failed to save companion PDF: {e}");
                }
            },
            Err(e) => {
                state
                    .faults
                    .report(reference.as_str(), &AssetFault::new(AssetSlot::CompanionPdf, e));
            }
        }
    }

    let mailed = match &state.notifier {
        Some(notifier) => {
            notifier
                .notify(&reference, &record, attachments)
                .await
                .map_err(|e| {
                    tracing::error!(
                        reference = %reference,
                        path = %document_path.display(),
                        "Document persisted but email failed"
                    );
                    AppError::Delivery(e)
                })?;
            true
        }
        None => {
            tracing::debug!(reference = %reference, "No mail transport configured, skipping email");
            false
        }
    };

    Ok(PipelineResult { reference, mailed })
}
