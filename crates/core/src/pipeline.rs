use crate::api::AltTextApi;
use crate::audit::AuditLog;
use crate::auth::{Authorizer, LocalOperator, TokenAuthorizer};
use crate::catalog::{Catalog, SqliteCatalog};
use crate::config::AppConfig;
use crate::scanner::{self, ScanSummary};
use crate::settings::ConfigStore;
use crate::upload::UploadHook;
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use storage::{connect, migrate};
use tracing::{info, warn};

/// Everything a command needs, built from [`AppConfig`].
pub struct Engine {
    pub catalog: Arc<SqliteCatalog>,
    pub store: ConfigStore,
    pub audit: Arc<AuditLog>,
    pub api: AltTextApi,
    pub upload: UploadHook,
    config: AppConfig,
}

impl Engine {
    pub async fn open(config: AppConfig) -> anyhow::Result<Self> {
        let pool = connect(&config.database.path).await.context("db connect")?;
        migrate(&pool).await.context("db migrate")?;

        let store = ConfigStore::sqlite(pool.clone());
        store.initialize().await.context("settings init")?;

        let catalog = Arc::new(SqliteCatalog::new(pool));
        let dyn_catalog: Arc<dyn Catalog> = catalog.clone();
        let audit = Arc::new(AuditLog::new(&config.audit.path));
        let authorizer = build_authorizer(&config);

        let api = AltTextApi::new(
            dyn_catalog.clone(),
            store.clone(),
            audit.clone(),
            authorizer,
            &config.site.name,
        );
        let upload = UploadHook::new(dyn_catalog, audit.clone(), config.site.name.clone());
        info!(database = %config.database.path, "engine ready");

        Ok(Self {
            catalog,
            store,
            audit,
            api,
            upload,
            config,
        })
    }

    /// Imports images below `paths`, or the configured scan roots when empty.
    pub async fn import(&self, paths: &[String]) -> anyhow::Result<ScanSummary> {
        let roots: Vec<PathBuf> = if paths.is_empty() {
            self.config.scan.include.iter().map(PathBuf::from).collect()
        } else {
            paths.iter().map(PathBuf::from).collect()
        };
        if roots.is_empty() {
            warn!("no scan roots configured, nothing to import");
            return Ok(ScanSummary::default());
        }
        let settings = self.store.settings().await?;
        scanner::scan(
            &roots,
            &self.config.scan.exclude,
            &self.catalog,
            &self.upload,
            &settings,
        )
        .await
    }
}

/// Token table from config; with no tokens configured the local operator is
/// trusted.
pub fn build_authorizer(config: &AppConfig) -> Arc<dyn Authorizer> {
    let tokens = TokenAuthorizer::from_grants(&config.auth.tokens);
    if tokens.is_empty() {
        Arc::new(LocalOperator)
    } else {
        Arc::new(tokens)
    }
}
