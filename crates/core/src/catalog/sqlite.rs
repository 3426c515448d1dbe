use super::{AltCounts, Catalog, CatalogError, ScanWindow};
use crate::models::{AltSource, AssetId, MediaAsset, NewAsset, RunId};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use storage::models::AssetRow;

const ASSET_COLUMNS: &str = "id, path, filename, title, mime, alt_text, alt_source, size, mtime";

/// Catalog backed by the `assets` table.
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inserts or refreshes an asset keyed by path. Returns the id and whether
    /// the row is new. Title and alt text of existing rows are left untouched.
    pub async fn upsert(&self, asset: &NewAsset) -> anyhow::Result<(AssetId, bool)> {
        if let Some(path) = &asset.path {
            let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM assets WHERE path = ?1")
                .bind(path)
                .fetch_optional(&self.pool)
                .await?;
            if let Some(id) = existing {
                sqlx::query(
                    r#"
                    UPDATE assets
                    SET filename = ?2, mime = ?3, size = ?4, mtime = ?5, updated_at = strftime('%s','now')
                    WHERE id = ?1
                    "#,
                )
                .bind(id)
                .bind(&asset.filename)
                .bind(&asset.mime)
                .bind(asset.size)
                .bind(asset.mtime)
                .execute(&self.pool)
                .await?;
                return Ok((id, false));
            }
        }
        let res = sqlx::query(
            r#"
            INSERT INTO assets (path, filename, title, mime, size, mtime)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&asset.path)
        .bind(&asset.filename)
        .bind(&asset.title)
        .bind(&asset.mime)
        .bind(asset.size)
        .bind(asset.mtime)
        .execute(&self.pool)
        .await?;
        Ok((res.last_insert_rowid(), true))
    }

    /// Assets ascending by id, optionally only those missing alt text.
    pub async fn list(&self, missing_only: bool, limit: Option<u64>) -> anyhow::Result<Vec<AssetRow>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ASSET_COLUMNS} FROM assets"));
        if missing_only {
            qb.push(" WHERE alt_text IS NULL OR TRIM(alt_text) = ''");
        }
        qb.push(" ORDER BY id ASC");
        if let Some(limit) = limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }
        let rows = qb.build_query_as::<AssetRow>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn counts(&self) -> anyhow::Result<AltCounts> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COALESCE(SUM(CASE WHEN alt_text IS NULL OR TRIM(alt_text) = '' THEN 1 ELSE 0 END), 0) AS missing
            FROM assets
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        let total: i64 = row.try_get("total")?;
        let missing: i64 = row.try_get("missing")?;
        Ok(AltCounts {
            total: total as u64,
            present: (total - missing) as u64,
            missing: missing as u64,
        })
    }
}

fn to_asset(row: AssetRow) -> MediaAsset {
    MediaAsset {
        id: row.id,
        title: row.title,
        filename: row.filename,
        mime: row.mime,
        alt_text: row.alt_text,
    }
}

#[async_trait::async_trait]
impl Catalog for SqliteCatalog {
    async fn scan_window(&self, window: &ScanWindow) -> Result<Vec<MediaAsset>, CatalogError> {
        if window.mimes.is_empty() || window.limit == 0 {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ASSET_COLUMNS} FROM assets WHERE mime IN ("));
        let mut separated = qb.separated(", ");
        for mime in &window.mimes {
            separated.push_bind(mime);
        }
        separated.push_unseparated(")");
        qb.push(" AND (alt_text IS NULL OR TRIM(alt_text) = ''");
        if let Some(run) = window.run {
            qb.push(" OR alt_run = ").push_bind(run);
        }
        qb.push(")");
        qb.push(" ORDER BY id ASC LIMIT ")
            .push_bind(window.limit as i64)
            .push(" OFFSET ")
            .push_bind(window.offset as i64);

        let rows = qb
            .build_query_as::<AssetRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CatalogError::Query(e.to_string()))?;
        Ok(rows.into_iter().map(to_asset).collect())
    }

    async fn get(&self, id: AssetId) -> Result<Option<MediaAsset>, CatalogError> {
        let row = sqlx::query_as::<_, AssetRow>(&format!(
            "SELECT {ASSET_COLUMNS} FROM assets WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CatalogError::Read {
            id,
            reason: e.to_string(),
        })?;
        Ok(row.map(to_asset))
    }

    async fn alt_text(&self, id: AssetId) -> Result<Option<String>, CatalogError> {
        let alt: Option<Option<String>> =
            sqlx::query_scalar("SELECT alt_text FROM assets WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| CatalogError::Read {
                    id,
                    reason: e.to_string(),
                })?;
        Ok(alt.flatten())
    }

    async fn set_alt_text(
        &self,
        id: AssetId,
        alt: &str,
        source: AltSource,
        run: Option<RunId>,
    ) -> Result<(), CatalogError> {
        let res = sqlx::query(
            r#"
            UPDATE assets
            SET alt_text = ?2, alt_source = ?3, alt_run = ?4, updated_at = strftime('%s','now')
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(alt)
        .bind(source.as_str())
        .bind(run)
        .execute(&self.pool)
        .await
        .map_err(|e| CatalogError::Write {
            id,
            reason: e.to_string(),
        })?;
        if res.rows_affected() == 0 {
            return Err(CatalogError::Write {
                id,
                reason: "no such asset".to_string(),
            });
        }
        Ok(())
    }
}
