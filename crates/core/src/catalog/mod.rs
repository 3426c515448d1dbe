//! The media catalog as seen by the engine: windowed query, field read and
//! field write. Storage is swappable behind [`Catalog`].

use crate::models::{AltSource, AssetId, MediaAsset, RunId};
use thiserror::Error;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCatalog;
pub use sqlite::SqliteCatalog;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog query failed: {0}")]
    Query(String),
    #[error("failed to read asset {id}: {reason}")]
    Read { id: AssetId, reason: String },
    #[error("failed to write alt text for asset {id}: {reason}")]
    Write { id: AssetId, reason: String },
}

/// One page of the scan over the allowed MIME types.
///
/// The window covers assets whose alt text is missing, plus assets written
/// during `run` itself. Keeping the current run's own writes in the window
/// means the run does not shift its later pages by the assets it just
/// handled. Writes from earlier runs, other entry points or people are
/// outside the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWindow {
    pub mimes: Vec<String>,
    pub offset: u64,
    pub limit: u64,
    pub run: Option<RunId>,
}

#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    /// Assets in the window, ascending by id.
    async fn scan_window(&self, window: &ScanWindow) -> Result<Vec<MediaAsset>, CatalogError>;

    async fn get(&self, id: AssetId) -> Result<Option<MediaAsset>, CatalogError>;

    /// Current alt text read straight from the catalog.
    async fn alt_text(&self, id: AssetId) -> Result<Option<String>, CatalogError>;

    /// Stores `alt`. `run` tags writes made by a batch run.
    async fn set_alt_text(
        &self,
        id: AssetId,
        alt: &str,
        source: AltSource,
        run: Option<RunId>,
    ) -> Result<(), CatalogError>;
}

/// Aggregate alt coverage, used for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct AltCounts {
    pub total: u64,
    pub present: u64,
    pub missing: u64,
}
