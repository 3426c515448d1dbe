//! Engine settings: defaults, sanitization and persistence.
//!
//! Settings live as one JSON record under [`SETTINGS_KEY`]. Whatever is read
//! back goes through [`sanitize`] again, so callers only ever see values that
//! satisfy the bounds below.

use crate::generator::GenerationMode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const SETTINGS_KEY: &str = "alttext_settings";

pub const MIN_BATCH_SIZE: u32 = 5;
pub const MAX_BATCH_SIZE: u32 = 200;
pub const DEFAULT_BATCH_SIZE: u32 = 50;

/// Every MIME type the engine knows how to handle.
pub const SUPPORTED_MIMES: [&str; 6] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/avif",
    "image/svg+xml",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub auto_generate_on_upload: bool,
    pub mode: GenerationMode,
    pub allowed_mimes: Vec<String>,
    pub enable_logging: bool,
    pub batch_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_generate_on_upload: true,
            mode: GenerationMode::TitleOnly,
            allowed_mimes: SUPPORTED_MIMES.iter().map(|m| m.to_string()).collect(),
            enable_logging: true,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Settings {
    pub fn allows_mime(&self, mime: &str) -> bool {
        self.allowed_mimes.iter().any(|m| m == mime)
    }

    /// Batch size clamped into bounds, whatever the struct was built with.
    pub fn effective_batch_size(&self) -> u32 {
        self.batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Turns loosely typed input (form posts, CLI flags, stored JSON) into valid
/// settings. Missing or unusable fields take their defaults.
pub fn sanitize(raw: &Value) -> Settings {
    let defaults = Settings::default();
    let Some(obj) = raw.as_object() else {
        return defaults;
    };

    let auto_generate_on_upload = obj
        .get("auto_generate_on_upload")
        .map(coerce_bool)
        .unwrap_or(defaults.auto_generate_on_upload);
    let enable_logging = obj
        .get("enable_logging")
        .map(coerce_bool)
        .unwrap_or(defaults.enable_logging);
    let mode = obj
        .get("mode")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<GenerationMode>().ok())
        .unwrap_or(defaults.mode);
    let batch_size = obj
        .get("batch_size")
        .and_then(coerce_int)
        .map(|n| n.clamp(MIN_BATCH_SIZE as i64, MAX_BATCH_SIZE as i64) as u32)
        .unwrap_or(defaults.batch_size);
    let allowed_mimes = obj
        .get("allowed_mimes")
        .map(filter_mimes)
        .filter(|mimes| !mimes.is_empty())
        .unwrap_or(defaults.allowed_mimes);

    Settings {
        auto_generate_on_upload,
        mode,
        allowed_mimes,
        enable_logging,
        batch_size,
    }
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "" | "0" | "false" | "no" | "off"
        ),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Null => false,
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Keeps supported types only, in universe order, without duplicates.
/// Accepts an array or a comma-separated string.
fn filter_mimes(value: &Value) -> Vec<String> {
    let requested: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_lowercase())
            .collect(),
        Value::String(s) => s.split(',').map(|p| p.trim().to_lowercase()).collect(),
        _ => Vec::new(),
    };
    SUPPORTED_MIMES
        .iter()
        .filter(|m| requested.iter().any(|r| r == *m))
        .map(|m| m.to_string())
        .collect()
}

/// Key/value persistence for structured option records.
#[async_trait::async_trait]
pub trait OptionStore: Send + Sync {
    async fn read(&self, name: &str) -> anyhow::Result<Option<Value>>;
    async fn write(&self, name: &str, value: &Value) -> anyhow::Result<()>;
}

/// Options stored in the catalog database's `options` table.
pub struct SqliteOptions {
    pool: SqlitePool,
}

impl SqliteOptions {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OptionStore for SqliteOptions {
    async fn read(&self, name: &str) -> anyhow::Result<Option<Value>> {
        let row = sqlx::query_as::<_, storage::models::OptionRow>(
            "SELECT name, value FROM options WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(serde_json::from_str(&row.value)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, name: &str, value: &Value) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO options (name, value, updated_at)
            VALUES (?1, ?2, strftime('%s','now'))
            ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(value.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryOptions {
    values: RwLock<HashMap<String, Value>>,
}

#[async_trait::async_trait]
impl OptionStore for MemoryOptions {
    async fn read(&self, name: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.values.read().await.get(name).cloned())
    }

    async fn write(&self, name: &str, value: &Value) -> anyhow::Result<()> {
        self.values
            .write()
            .await
            .insert(name.to_string(), value.clone());
        Ok(())
    }
}

/// Supplies validated settings to the processors. Holds no business logic.
#[derive(Clone)]
pub struct ConfigStore {
    backend: Arc<dyn OptionStore>,
}

impl ConfigStore {
    pub fn new(backend: Arc<dyn OptionStore>) -> Self {
        Self { backend }
    }

    pub fn sqlite(pool: SqlitePool) -> Self {
        Self::new(Arc::new(SqliteOptions::new(pool)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryOptions::default()))
    }

    /// Writes the defaults once if nothing is stored yet.
    pub async fn initialize(&self) -> anyhow::Result<Settings> {
        if let Some(existing) = self.backend.read(SETTINGS_KEY).await? {
            return Ok(sanitize(&existing));
        }
        let defaults = Settings::default();
        self.backend
            .write(SETTINGS_KEY, &defaults.to_value())
            .await?;
        info!("initialized default settings");
        Ok(defaults)
    }

    pub async fn settings(&self) -> anyhow::Result<Settings> {
        Ok(match self.backend.read(SETTINGS_KEY).await? {
            Some(raw) => sanitize(&raw),
            None => Settings::default(),
        })
    }

    /// Single field of the current settings, `None` for unknown keys.
    pub async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let settings = self.settings().await?;
        Ok(settings.to_value().get(key).cloned())
    }

    /// Overlays `patch` on the current settings, sanitizes and persists.
    pub async fn update(&self, patch: &Value) -> anyhow::Result<Settings> {
        let mut merged: Map<String, Value> = match self.settings().await?.to_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Value::Object(fields) = patch {
            for (k, v) in fields {
                merged.insert(k.clone(), v.clone());
            }
        }
        let settings = sanitize(&Value::Object(merged));
        self.backend
            .write(SETTINGS_KEY, &settings.to_value())
            .await?;
        debug!(?settings, "settings updated");
        Ok(settings)
    }
}
