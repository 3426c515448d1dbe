//! The per-asset rule shared by the scan, selection and upload entry points:
//! re-check, generate, write, record.

use crate::audit::{AuditLog, LogEntry};
use crate::catalog::Catalog;
use crate::generator::TextGenerator;
use crate::models::{alt_is_present, AltSource, ContextTag, MediaAsset, RunId};
use crate::settings::Settings;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AltPresent,
    NoUsableText,
    MimeNotAllowed,
    NotFound,
    ReadFailed(String),
    WriteFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
    Written(String),
    Skipped(SkipReason),
}

impl AssetOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, AssetOutcome::Written(_))
    }
}

/// Applies generated alt text to single assets. Errors for one asset are
/// turned into [`SkipReason`]s and never propagate.
pub struct AltWriter<'a> {
    catalog: &'a dyn Catalog,
    audit: &'a AuditLog,
    generator: TextGenerator,
    enable_logging: bool,
    run: Option<RunId>,
}

impl<'a> AltWriter<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        audit: &'a AuditLog,
        settings: &Settings,
        site_name: &str,
    ) -> Self {
        Self {
            catalog,
            audit,
            generator: TextGenerator::new(settings.mode, site_name),
            enable_logging: settings.enable_logging,
            run: None,
        }
    }

    /// Tags every write with the batch run it belongs to.
    pub fn with_run(mut self, run: RunId) -> Self {
        self.run = Some(run);
        self
    }

    pub async fn apply(&self, asset: &MediaAsset, context: ContextTag) -> AssetOutcome {
        // Another writer may have filled the field since the asset was fetched.
        match self.catalog.alt_text(asset.id).await {
            Ok(current) if alt_is_present(current.as_deref()) => {
                return AssetOutcome::Skipped(SkipReason::AltPresent);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(asset_id = asset.id, error = %e, "alt text re-check failed, skipping asset");
                return AssetOutcome::Skipped(SkipReason::ReadFailed(e.to_string()));
            }
        }

        let Some(alt) = self.generator.generate_for(asset) else {
            debug!(asset_id = asset.id, filename = %asset.filename, "no usable alt text");
            return AssetOutcome::Skipped(SkipReason::NoUsableText);
        };

        if let Err(e) = self
            .catalog
            .set_alt_text(asset.id, &alt, AltSource::Generated, self.run)
            .await
        {
            warn!(asset_id = asset.id, error = %e, "failed to persist alt text, skipping asset");
            return AssetOutcome::Skipped(SkipReason::WriteFailed(e.to_string()));
        }

        self.audit
            .append(&LogEntry::now(asset.id, alt.clone(), context), self.enable_logging)
            .await;
        debug!(asset_id = asset.id, %context, alt = %alt, "alt text written");
        AssetOutcome::Written(alt)
    }
}
