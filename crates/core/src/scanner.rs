//! Walks image directories and imports what it finds into the catalog.
//! Newly imported assets go through the upload hook.

use crate::catalog::SqliteCatalog;
use crate::models::NewAsset;
use crate::settings::Settings;
use crate::upload::UploadHook;
use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ScannedImage {
    pub path: PathBuf,
    pub mime: String,
    pub size: i64,
    pub mtime: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub discovered: usize,
    pub imported: usize,
    pub refreshed: usize,
    pub generated: usize,
}

pub async fn scan(
    roots: &[PathBuf],
    excludes: &[String],
    catalog: &SqliteCatalog,
    hook: &UploadHook,
    settings: &Settings,
) -> anyhow::Result<ScanSummary> {
    let (tx, mut rx) = mpsc::channel(100);
    let exclude_set = build_globset(excludes)?;
    let roots = roots.to_vec();

    // Walker task
    let walker_handle = task::spawn_blocking(move || {
        for root in roots {
            for entry in WalkDir::new(root)
                .follow_links(true)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || should_descend(e.path(), &exclude_set))
            {
                let entry = match entry {
                    Ok(e) => e,
                    Err(_) => continue,
                };

                let path = entry.path();
                if path.is_dir() {
                    continue;
                }
                let Some(mime) = detect_mime(path) else {
                    continue;
                };

                let meta = match fs::metadata(path) {
                    Ok(m) => m,
                    Err(_) => continue,
                };
                let mtime = meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or_default();

                let item = ScannedImage {
                    path: path.to_path_buf(),
                    mime,
                    size: meta.len() as i64,
                    mtime,
                };

                if tx.blocking_send(item).is_err() {
                    // Receiver dropped, stop walking.
                    break;
                }
            }
        }
    });

    let mut summary = ScanSummary::default();
    while let Some(item) = rx.recv().await {
        summary.discovered += 1;
        let filename = item
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (id, created) = catalog
            .upsert(&NewAsset {
                path: Some(item.path.to_string_lossy().into_owned()),
                filename,
                title: String::new(),
                mime: item.mime.clone(),
                size: item.size,
                mtime: item.mtime,
            })
            .await
            .with_context(|| format!("Failed to upsert asset in catalog: {:?}", item.path))?;

        if !created {
            summary.refreshed += 1;
            continue;
        }
        summary.imported += 1;
        debug!(asset_id = id, path = ?item.path, mime = %item.mime, "imported asset");
        if let Some(outcome) = hook.on_asset_added(id, settings).await {
            if outcome.is_written() {
                summary.generated += 1;
            }
        }
    }

    walker_handle.await?;
    info!(
        discovered = summary.discovered,
        imported = summary.imported,
        generated = summary.generated,
        "scan complete"
    );
    Ok(summary)
}

/// Image MIME type from content, falling back to the extension. `None` for
/// anything that is not an image.
pub fn detect_mime(path: &Path) -> Option<String> {
    if let Ok(Some(kind)) = infer::get_from_path(path) {
        if kind.matcher_type() == infer::MatcherType::Image {
            return Some(kind.mime_type().to_string());
        }
    }
    let ext = path.extension()?.to_str()?.to_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(mime.to_string())
}

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

fn should_descend(path: &Path, excludes: &GlobSet) -> bool {
    !excludes.is_match(path) && !is_hidden(path)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.starts_with('.') && s.len() > 1 && s != "..")
        .unwrap_or(false)
}
