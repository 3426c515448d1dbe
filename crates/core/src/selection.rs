use crate::apply::{AltWriter, AssetOutcome, SkipReason};
use crate::audit::AuditLog;
use crate::catalog::Catalog;
use crate::models::{AssetId, ContextTag, SelectionResult};
use crate::settings::Settings;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs the per-asset rule over an explicit list of ids. Always completes
/// within the call; existing alt text is never overwritten.
#[derive(Clone)]
pub struct SelectionProcessor {
    catalog: Arc<dyn Catalog>,
    audit: Arc<AuditLog>,
    site_name: String,
}

impl SelectionProcessor {
    pub fn new(catalog: Arc<dyn Catalog>, audit: Arc<AuditLog>, site_name: impl Into<String>) -> Self {
        Self {
            catalog,
            audit,
            site_name: site_name.into(),
        }
    }

    pub async fn run_selection(&self, ids: &[AssetId], settings: &Settings) -> SelectionResult {
        let writer = AltWriter::new(self.catalog.as_ref(), &self.audit, settings, &self.site_name);
        let mut result = SelectionResult::default();
        for &id in ids {
            let outcome = match self.catalog.get(id).await {
                Ok(Some(asset)) if !settings.allows_mime(&asset.mime) => {
                    AssetOutcome::Skipped(SkipReason::MimeNotAllowed)
                }
                Ok(Some(asset)) => writer.apply(&asset, ContextTag::Bulk).await,
                Ok(None) => AssetOutcome::Skipped(SkipReason::NotFound),
                Err(e) => {
                    warn!(asset_id = id, error = %e, "failed to load selected asset");
                    AssetOutcome::Skipped(SkipReason::ReadFailed(e.to_string()))
                }
            };
            if outcome.is_written() {
                result.processed += 1;
            } else {
                result.skipped += 1;
            }
        }
        info!(
            selected = ids.len(),
            processed = result.processed,
            skipped = result.skipped,
            "selection complete"
        );
        result
    }
}
