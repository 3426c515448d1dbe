use alttext_core::api::ApiError;
use alttext_core::pipeline::Engine;
use alttext_core::settings::Settings;
use serde_json::{json, Map, Value};

/// Flags given to `settings set`; unset flags leave the stored value alone.
#[derive(Debug, Default, Clone)]
pub struct SettingsPatch {
    pub mode: Option<String>,
    pub batch_size: Option<i64>,
    pub allowed_mimes: Option<Vec<String>>,
    pub enable_logging: Option<bool>,
    pub auto_generate_on_upload: Option<bool>,
}

impl SettingsPatch {
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(mode) = &self.mode {
            map.insert("mode".into(), json!(mode));
        }
        if let Some(size) = self.batch_size {
            map.insert("batch_size".into(), json!(size));
        }
        if let Some(mimes) = &self.allowed_mimes {
            map.insert("allowed_mimes".into(), json!(mimes));
        }
        if let Some(flag) = self.enable_logging {
            map.insert("enable_logging".into(), json!(flag));
        }
        if let Some(flag) = self.auto_generate_on_upload {
            map.insert("auto_generate_on_upload".into(), json!(flag));
        }
        Value::Object(map)
    }

    pub fn is_empty(&self) -> bool {
        self.to_value().as_object().map(Map::is_empty).unwrap_or(true)
    }
}

pub async fn show(engine: &Engine) -> Result<Settings, ApiError> {
    engine.api.settings().await
}

pub async fn get(engine: &Engine, key: &str) -> anyhow::Result<Option<Value>> {
    engine.store.get(key).await
}

pub async fn set(engine: &Engine, token: &str, patch: &SettingsPatch) -> Result<Settings, ApiError> {
    engine.api.update_settings(token, &patch.to_value()).await
}
