use crate::apply::{AltWriter, AssetOutcome, SkipReason};
use crate::audit::AuditLog;
use crate::catalog::Catalog;
use crate::models::{AssetId, ContextTag};
use crate::settings::Settings;
use std::sync::Arc;
use tracing::warn;

/// Generates alt text for a newly added asset when `auto_generate_on_upload`
/// is on.
#[derive(Clone)]
pub struct UploadHook {
    catalog: Arc<dyn Catalog>,
    audit: Arc<AuditLog>,
    site_name: String,
}

impl UploadHook {
    pub fn new(catalog: Arc<dyn Catalog>, audit: Arc<AuditLog>, site_name: impl Into<String>) -> Self {
        Self {
            catalog,
            audit,
            site_name: site_name.into(),
        }
    }

    /// `None` when auto-generation is switched off.
    pub async fn on_asset_added(&self, id: AssetId, settings: &Settings) -> Option<AssetOutcome> {
        if !settings.auto_generate_on_upload {
            return None;
        }
        let asset = match self.catalog.get(id).await {
            Ok(Some(asset)) => asset,
            Ok(None) => return Some(AssetOutcome::Skipped(SkipReason::NotFound)),
            Err(e) => {
                warn!(asset_id = id, error = %e, "failed to load uploaded asset");
                return Some(AssetOutcome::Skipped(SkipReason::ReadFailed(e.to_string())));
            }
        };
        if !settings.allows_mime(&asset.mime) {
            return Some(AssetOutcome::Skipped(SkipReason::MimeNotAllowed));
        }
        let writer = AltWriter::new(self.catalog.as_ref(), &self.audit, settings, &self.site_name);
        Some(writer.apply(&asset, ContextTag::Single).await)
    }
}
