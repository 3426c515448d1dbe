use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Full-catalog runs and settings changes.
    ManageOptions,
    /// Acting on an explicit selection of assets.
    UploadFiles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("permission denied")]
    Permission,
    #[error("invalid token")]
    InvalidToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub token: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

/// Checked once per request, before any catalog access.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, token: &str, capability: Capability) -> Result<(), AuthError>;
}

/// Static token table loaded from config.
#[derive(Debug, Clone, Default)]
pub struct TokenAuthorizer {
    grants: HashMap<String, HashSet<Capability>>,
}

impl TokenAuthorizer {
    pub fn from_grants(grants: &[TokenGrant]) -> Self {
        let mut table: HashMap<String, HashSet<Capability>> = HashMap::new();
        for grant in grants {
            table
                .entry(grant.token.clone())
                .or_default()
                .extend(grant.capabilities.iter().copied());
        }
        Self { grants: table }
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl Authorizer for TokenAuthorizer {
    fn authorize(&self, token: &str, capability: Capability) -> Result<(), AuthError> {
        let caps = self.grants.get(token).ok_or(AuthError::InvalidToken)?;
        if caps.contains(&capability) {
            Ok(())
        } else {
            Err(AuthError::Permission)
        }
    }
}

/// Grants everything. Used when no tokens are configured and the caller is the
/// local operator running the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOperator;

impl Authorizer for LocalOperator {
    fn authorize(&self, _token: &str, _capability: Capability) -> Result<(), AuthError> {
        Ok(())
    }
}
