//! Cursor-driven scan over the catalog.
//!
//! Each call handles one window of at most `batch_size` assets and returns the
//! cursor for the next call. Nothing is kept between calls; the caller drives
//! the run by feeding `next_offset` and `run` back in until `has_more` is
//! false. Calls for the same run must be issued sequentially. No lock is
//! taken, so two overlapping runs may both visit an asset; the alt text
//! re-check makes the second visit a no-op.

use crate::apply::{AltWriter, AssetOutcome};
use crate::audit::AuditLog;
use crate::catalog::{Catalog, CatalogError, ScanWindow};
use crate::models::{BatchCursor, BatchResult, ContextTag, RunId};
use chrono::Utc;
use crate::settings::Settings;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct BatchProcessor {
    catalog: Arc<dyn Catalog>,
    audit: Arc<AuditLog>,
    site_name: String,
}

impl BatchProcessor {
    pub fn new(catalog: Arc<dyn Catalog>, audit: Arc<AuditLog>, site_name: impl Into<String>) -> Self {
        Self {
            catalog,
            audit,
            site_name: site_name.into(),
        }
    }

    /// Processes the window starting at `cursor`. Only a failing catalog query
    /// fails the call; per-asset problems are counted as skipped.
    pub async fn run_batch(
        &self,
        cursor: BatchCursor,
        settings: &Settings,
    ) -> Result<BatchResult, CatalogError> {
        let batch_size = settings.effective_batch_size() as u64;
        let run = cursor.run.unwrap_or_else(new_run_id);
        let window = ScanWindow {
            mimes: settings.allowed_mimes.clone(),
            offset: cursor.offset,
            limit: batch_size,
            run: Some(run),
        };
        let assets = self.catalog.scan_window(&window).await?;
        debug!(offset = cursor.offset, run, fetched = assets.len(), "fetched scan window");

        let writer = AltWriter::new(self.catalog.as_ref(), &self.audit, settings, &self.site_name)
            .with_run(run);
        let mut result = BatchResult {
            fetched: assets.len(),
            offset: cursor.offset,
            next_offset: cursor.offset + batch_size,
            has_more: assets.len() as u64 == batch_size,
            run,
            ..Default::default()
        };
        for asset in &assets {
            match writer.apply(asset, ContextTag::Scan).await {
                AssetOutcome::Written(_) => result.processed += 1,
                AssetOutcome::Skipped(_) => result.skipped += 1,
            }
        }

        info!(
            offset = result.offset,
            processed = result.processed,
            skipped = result.skipped,
            more = result.has_more,
            "batch complete"
        );
        Ok(result)
    }
}

fn new_run_id() -> RunId {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros())
}
