use serde::Deserialize;
use thiserror::Error;

/// Cache lifetimes for the two engine caches.
pub mod ttl {
    /// Workspace directory cache lifetime (30 minutes).
    pub const WORKSPACE_DIRECTORY_SECS: u64 = 1800;

    /// VM routing cache lifetime (5 minutes).
    pub const VM_ROUTING_SECS: u64 = 300;
}

/// Remote call timeouts, tiered by how heavy the upstream call is.
pub mod timeouts {
    /// Token exchange with the identity service.
    pub const TOKEN_SECS: u64 = 10;

    /// Single-resource queries (detail documents, interfaces, volumes).
    pub const RESOURCE_SECS: u64 = 120;

    /// Full per-workspace VM listings.
    pub const LISTING_SECS: u64 = 240;
}

/// Partial settings as read from one configuration source.
///
/// The environment and the optional YAML file each produce one overlay;
/// [`ClientSettings::resolve`] merges them environment-first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsOverlay {
    pub api_key: Option<String>,
    pub account_id: Option<String>,
    pub base_url: Option<String>,
    pub crn: Option<String>,
}

/// Validated settings for talking to the compute platform.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// API key exchanged for bearer tokens.
    pub api_key: String,
    /// Account owning the workspaces.
    pub account_id: String,
    /// Regional API endpoint; also the default workspace endpoint.
    pub base_url: String,
    /// Workspace CRN pinning all calls to a single workspace, if set.
    pub crn: Option<String>,
}

/// Configuration failures surfaced at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("api_key is not configured")]
    MissingApiKey,
    #[error("account_id is not configured")]
    MissingAccountId,
    #[error("base_url is not configured")]
    MissingBaseUrl,
    #[error("crn does not name a workspace")]
    InvalidCrn,
}

impl ClientSettings {
    /// Merge two overlays, primary source first, and validate.
    ///
    /// Empty strings count as absent, so a blank environment variable
    /// neither satisfies a required field nor shadows the fallback with
    /// a broken value. An empty CRN means account-wide scope.
    pub fn resolve(
        primary: SettingsOverlay,
        fallback: SettingsOverlay,
    ) -> Result<Self, SettingsError> {
        let api_key = merge(primary.api_key, fallback.api_key).ok_or(SettingsError::MissingApiKey)?;
        let account_id =
            merge(primary.account_id, fallback.account_id).ok_or(SettingsError::MissingAccountId)?;
        let base_url =
            merge(primary.base_url, fallback.base_url).ok_or(SettingsError::MissingBaseUrl)?;
        let crn = merge(primary.crn, fallback.crn);

        Ok(Self {
            api_key,
            account_id,
            base_url,
            crn,
        })
    }
}

fn merge(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .filter(|value| !value.is_empty())
        .or(fallback)
        .filter(|value| !value.is_empty())
}
