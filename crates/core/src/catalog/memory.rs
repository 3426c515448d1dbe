use super::{Catalog, CatalogError, ScanWindow};
use crate::models::{AltSource, AssetId, MediaAsset, NewAsset, RunId};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Stored {
    asset: MediaAsset,
    run: Option<RunId>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: AssetId,
    assets: BTreeMap<AssetId, Stored>,
}

/// Catalog held in memory. Same window semantics as [`super::SqliteCatalog`].
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    inner: RwLock<Inner>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, asset: NewAsset) -> AssetId {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.assets.insert(
            id,
            Stored {
                asset: MediaAsset {
                    id,
                    title: asset.title,
                    filename: asset.filename,
                    mime: asset.mime,
                    alt_text: None,
                },
                run: None,
            },
        );
        id
    }

    /// Convenience for building fixtures.
    pub async fn add(&self, title: &str, filename: &str, mime: &str) -> AssetId {
        self.insert(NewAsset {
            filename: filename.to_string(),
            title: title.to_string(),
            mime: mime.to_string(),
            ..Default::default()
        })
        .await
    }

    pub async fn snapshot(&self) -> Vec<MediaAsset> {
        let inner = self.inner.read().await;
        inner.assets.values().map(|s| s.asset.clone()).collect()
    }
}

#[async_trait::async_trait]
impl Catalog for MemoryCatalog {
    async fn scan_window(&self, window: &ScanWindow) -> Result<Vec<MediaAsset>, CatalogError> {
        let inner = self.inner.read().await;
        Ok(inner
            .assets
            .values()
            .filter(|s| window.mimes.iter().any(|m| *m == s.asset.mime))
            .filter(|s| !s.asset.has_alt() || (window.run.is_some() && s.run == window.run))
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .map(|s| s.asset.clone())
            .collect())
    }

    async fn get(&self, id: AssetId) -> Result<Option<MediaAsset>, CatalogError> {
        let inner = self.inner.read().await;
        Ok(inner.assets.get(&id).map(|s| s.asset.clone()))
    }

    async fn alt_text(&self, id: AssetId) -> Result<Option<String>, CatalogError> {
        let inner = self.inner.read().await;
        Ok(inner.assets.get(&id).and_then(|s| s.asset.alt_text.clone()))
    }

    async fn set_alt_text(
        &self,
        id: AssetId,
        alt: &str,
        _source: AltSource,
        run: Option<RunId>,
    ) -> Result<(), CatalogError> {
        let mut inner = self.inner.write().await;
        let stored = inner.assets.get_mut(&id).ok_or_else(|| CatalogError::Write {
            id,
            reason: "no such asset".to_string(),
        })?;
        stored.asset.alt_text = Some(alt.to_string());
        stored.run = run;
        Ok(())
    }
}
