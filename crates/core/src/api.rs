//! Transport-agnostic endpoints: authorize, validate, then hand off to the
//! processors. Request and response shapes serialize to the wire format the
//! admin UI polls with.

use crate::audit::AuditLog;
use crate::auth::{AuthError, Authorizer, Capability};
use crate::batch::BatchProcessor;
use crate::catalog::{Catalog, CatalogError};
use crate::models::{AssetId, BatchCursor, BatchResult, RunId, SelectionResult};
use crate::selection::SelectionProcessor;
use crate::settings::{ConfigStore, Settings};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRequest {
    pub offset: i64,
    /// Run id from the previous response; absent on the first call.
    #[serde(default)]
    pub run: Option<RunId>,
    #[serde(default)]
    pub auth_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub processed: usize,
    pub skipped: usize,
    pub count: usize,
    pub offset: u64,
    pub next_offset: u64,
    pub more: bool,
    pub run: RunId,
}

impl From<BatchResult> for BatchResponse {
    fn from(r: BatchResult) -> Self {
        Self {
            processed: r.processed,
            skipped: r.skipped,
            count: r.fetched,
            offset: r.offset,
            next_offset: r.next_offset,
            more: r.has_more,
            run: r.run,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub asset_ids: Vec<AssetId>,
    #[serde(default)]
    pub auth_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResponse {
    pub processed: usize,
    pub skipped: usize,
}

impl From<SelectionResult> for SelectionResponse {
    fn from(r: SelectionResult) -> Self {
        Self {
            processed: r.processed,
            skipped: r.skipped,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("settings unavailable: {0}")]
    Settings(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    /// Stable machine-readable code for the batch endpoint.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Auth(AuthError::Permission) => "permission",
            ApiError::Auth(AuthError::InvalidToken) => "invalid_token",
            ApiError::Validation(_) => "invalid_request",
            ApiError::Catalog(_) => "catalog_unavailable",
            ApiError::Settings(_) => "settings_unavailable",
        }
    }

    /// The selection endpoint reports any authorization failure as `perm`.
    pub fn selection_code(&self) -> &'static str {
        match self {
            ApiError::Auth(_) => "perm",
            other => other.code(),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            ApiError::Auth(AuthError::Permission) => 403,
            ApiError::Auth(AuthError::InvalidToken) => 401,
            ApiError::Validation(_) => 400,
            ApiError::Catalog(_) | ApiError::Settings(_) => 500,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.code().to_string(),
        }
    }
}

pub struct AltTextApi {
    store: ConfigStore,
    batch: BatchProcessor,
    selection: SelectionProcessor,
    authorizer: Arc<dyn Authorizer>,
}

impl AltTextApi {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        store: ConfigStore,
        audit: Arc<AuditLog>,
        authorizer: Arc<dyn Authorizer>,
        site_name: &str,
    ) -> Self {
        Self {
            store,
            batch: BatchProcessor::new(catalog.clone(), audit.clone(), site_name),
            selection: SelectionProcessor::new(catalog, audit, site_name),
            authorizer,
        }
    }

    pub async fn bulk_run(&self, req: BatchRequest) -> Result<BatchResponse, ApiError> {
        self.authorizer
            .authorize(&req.auth_token, Capability::ManageOptions)?;
        let offset = u64::try_from(req.offset)
            .map_err(|_| ApiError::Validation(format!("offset must be non-negative, got {}", req.offset)))?;
        let settings = self.settings().await?;
        let result = self
            .batch
            .run_batch(BatchCursor { offset, run: req.run }, &settings)
            .await
            .map_err(|e| {
                warn!(offset, error = %e, "batch aborted");
                ApiError::from(e)
            })?;
        Ok(result.into())
    }

    pub async fn bulk_select(&self, req: SelectionRequest) -> Result<SelectionResponse, ApiError> {
        self.authorizer
            .authorize(&req.auth_token, Capability::UploadFiles)?;
        if let Some(bad) = req.asset_ids.iter().find(|id| **id <= 0) {
            return Err(ApiError::Validation(format!("invalid asset id {bad}")));
        }
        let settings = self.settings().await?;
        Ok(self
            .selection
            .run_selection(&req.asset_ids, &settings)
            .await
            .into())
    }

    pub async fn settings(&self) -> Result<Settings, ApiError> {
        self.store
            .settings()
            .await
            .map_err(|e| ApiError::Settings(e.to_string()))
    }

    pub async fn update_settings(
        &self,
        auth_token: &str,
        patch: &serde_json::Value,
    ) -> Result<Settings, ApiError> {
        self.authorizer
            .authorize(auth_token, Capability::ManageOptions)?;
        if !patch.is_object() {
            return Err(ApiError::Validation("settings patch must be an object".into()));
        }
        self.store
            .update(patch)
            .await
            .map_err(|e| ApiError::Settings(e.to_string()))
    }

    /// The polling loop the admin UI runs: re-issue the batch call with
    /// `next_offset` and `run` until `more` is false. `on_batch` sees every
    /// response.
    pub async fn run_to_completion<F>(
        &self,
        auth_token: &str,
        start: BatchCursor,
        mut on_batch: F,
    ) -> Result<RunSummary, ApiError>
    where
        F: FnMut(&BatchResponse),
    {
        let mut summary = RunSummary::default();
        let mut cursor = start;
        loop {
            let resp = self
                .bulk_run(BatchRequest {
                    offset: i64::try_from(cursor.offset)
                        .map_err(|_| ApiError::Validation("offset overflow".into()))?,
                    run: cursor.run,
                    auth_token: auth_token.to_string(),
                })
                .await?;
            on_batch(&resp);
            summary.calls += 1;
            summary.processed += resp.processed;
            summary.skipped += resp.skipped;
            summary.fetched += resp.count;
            summary.run = resp.run;
            if !resp.more {
                break;
            }
            cursor = BatchCursor::resume(resp.next_offset, resp.run);
        }
        Ok(summary)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub calls: usize,
    pub processed: usize,
    pub skipped: usize,
    pub fetched: usize,
    pub run: RunId,
}
