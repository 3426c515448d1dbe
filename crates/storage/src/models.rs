use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the `assets` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AssetRow {
    pub id: i64,
    pub path: Option<String>,
    pub filename: String,
    pub title: String,
    pub mime: String,
    pub alt_text: Option<String>,
    pub alt_source: Option<String>,
    pub size: i64,
    pub mtime: i64,
}

/// One row of the `options` table. `value` holds a JSON document.
#[derive(Debug, Clone, FromRow)]
pub struct OptionRow {
    pub name: String,
    pub value: String,
}
