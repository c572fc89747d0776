//! Bulk derivative generation over existing files.

use anyhow::{Context, Result};
use archive_core::models::DerivativeKind;
use archive_processing::{DerivativeOrchestrator, PassOutcome};
use serde::Serialize;

#[derive(Debug, Default, Serialize)]
pub struct GenerateSummary {
    pub kind: Option<DerivativeKind>,
    pub considered: usize,
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Files whose pass hit a retryable error (source missing, storage down).
    pub errors: usize,
    /// Keys written by this run.
    pub written: Vec<String>,
}

/// Run one pass over the files missing `kind`, or over every file with `regen`.
///
/// Files are processed one at a time; a failing file is counted and the run
/// continues.
#[tracing::instrument(skip(orchestrator))]
pub async fn generate_derivatives(
    orchestrator: &DerivativeOrchestrator,
    kind: DerivativeKind,
    regen: bool,
) -> Result<GenerateSummary> {
    let store = orchestrator.store();
    let files = if regen {
        store.list_all().await
    } else {
        store.list_missing(kind).await
    }
    .context("Failed to list record files")?;

    let mut summary = GenerateSummary {
        kind: Some(kind),
        considered: files.len(),
        ..GenerateSummary::default()
    };

    for mut file in files {
        match orchestrator.run_passes(&mut file, &[kind]).await {
            Ok(report) => match report.outcome(kind) {
                generated @ PassOutcome::Generated(_) => {
                    summary.generated += 1;
                    summary.written.extend(generated.path().map(str::to_string));
                }
                PassOutcome::Skipped { .. } => summary.skipped += 1,
                PassOutcome::Failed { .. } => summary.failed += 1,
            },
            Err(e) => {
                tracing::warn!(file_id = %file.id, error = %e, "Derivative generation error");
                summary.errors += 1;
            }
        }
    }

    tracing::info!(
        kind = %kind,
        considered = summary.considered,
        generated = summary.generated,
        skipped = summary.skipped,
        failed = summary.failed,
        errors = summary.errors,
        "Bulk generation finished"
    );

    Ok(summary)
}
