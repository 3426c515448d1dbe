use alttext_core::catalog::AltCounts;
use alttext_core::models::AltStatus;
use alttext_core::pipeline::Engine;
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AssetView {
    pub id: i64,
    pub filename: String,
    pub mime: String,
    pub status: AltStatus,
    pub alt: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub counts: AltCounts,
    pub assets: Vec<AssetView>,
}

pub async fn status(engine: &Engine, missing_only: bool, limit: Option<u64>) -> Result<StatusReport> {
    let counts = engine.catalog.counts().await?;
    let assets = engine
        .catalog
        .list(missing_only, limit)
        .await?
        .into_iter()
        .map(|row| AssetView {
            status: AltStatus::from_alt(row.alt_text.as_deref()),
            id: row.id,
            filename: row.filename,
            mime: row.mime,
            alt: row.alt_text,
            source: row.alt_source,
        })
        .collect();
    Ok(StatusReport { counts, assets })
}

#[derive(Debug, Serialize)]
pub struct LogLine {
    pub timestamp: String,
    pub context: String,
    pub asset_id: i64,
    pub alt: String,
}

pub fn log_tail(engine: &Engine, n: usize) -> Result<Vec<LogLine>> {
    Ok(engine
        .audit
        .tail(n)?
        .into_iter()
        .map(|e| LogLine {
            timestamp: e.timestamp.to_rfc3339(),
            context: e.context.to_string(),
            asset_id: e.asset_id,
            alt: e.alt_text,
        })
        .collect())
}
