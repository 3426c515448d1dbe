use crate::auth::TokenGrant;
use serde::{Deserialize, Serialize};

/// Deployment config: where things live. Engine behaviour is in
/// [`crate::settings::Settings`], stored in the catalog database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub site: SiteConfig,
    pub audit: AuditConfig,
    pub scan: ScanPaths,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/alttext.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub path: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: "logs/alttext.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanPaths {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: Vec<TokenGrant>,
}

/// Loads `path` (or `config/default.toml` when present), then applies
/// environment overrides such as `ALTTEXT_DATABASE__PATH`.
pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("ALTTEXT")
            .prefix_separator("_")
            .separator("__"),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("alttext.toml");
        std::fs::write(
            &file,
            r#"
            [database]
            path = "catalog.db"

            [site]
            name = "PhotoBlog"

            [[auth.tokens]]
            token = "secret"
            capabilities = ["manage_options", "upload_files"]
            "#,
        )
        .unwrap();
        let cfg = load(Some(file.to_str().unwrap())).unwrap();
        assert_eq!(cfg.database.path, "catalog.db");
        assert_eq!(cfg.site.name, "PhotoBlog");
        assert_eq!(cfg.audit.path, "logs/alttext.log");
        assert_eq!(cfg.auth.tokens.len(), 1);
        assert_eq!(cfg.auth.tokens[0].capabilities.len(), 2);
    }
}
