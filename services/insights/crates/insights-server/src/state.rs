//! Shared engine state: resolved scope and the two TTL caches.
//!
//! One `AppState` is built at startup and shared across MCP sessions
//! behind an `Arc`. It owns the workspace directory cache (slow-moving,
//! 30 min TTL) and the VM routing cache (fast, 5 min TTL); every public
//! operation in `inventory`, `health`, and `resources` hangs off it.

use std::collections::HashMap;
use std::time::Duration;

use tracing::warn;

use powervs_common::config::ttl;
use powervs_common::{cloud_instance_id, workspace_crn, ClientSettings, SettingsError, Workspace};

use crate::api::{PowerCloud, WorkspaceResource, WorkspaceTarget};
use crate::cache::TtlCell;
use crate::error::FetchError;

/// Credential scope the client operates in, fixed at construction.
#[derive(Debug, Clone)]
pub enum Scope {
    /// Account-wide credentials; workspaces are discovered.
    Account,
    /// A single workspace pinned by a configured CRN.
    Workspace(WorkspaceTarget),
}

/// Where a VM lives, as recorded by the last fan-out.
///
/// The CRN is not stored; [`AppState::resolve`] recomputes it from the
/// region and identifiers on every lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmRoute {
    pub workspace_id: String,
    pub region: String,
    pub endpoint_url: String,
}

/// Map rebuilt wholesale by each account-wide fan-out.
pub type RoutingTable = HashMap<String, VmRoute>;

/// Outcome of resolving a VM to its owning workspace.
#[derive(Debug, Clone)]
pub enum RouteLookup {
    /// The routing table knows this VM.
    Cached(WorkspaceTarget),
    /// Not in the table, but a static single-workspace scope covers it.
    StaticScope(WorkspaceTarget),
    /// No routing entry and no static scope.
    NotFound,
}

impl RouteLookup {
    /// The target to query, or the not-found error for single-VM
    /// operations.
    pub fn into_target(self) -> Result<WorkspaceTarget, FetchError> {
        match self {
            Self::Cached(target) | Self::StaticScope(target) => Ok(target),
            Self::NotFound => Err(FetchError::VmNotFound),
        }
    }
}

/// Engine state shared across sessions.
#[derive(Debug)]
pub struct AppState<A> {
    pub(crate) api: A,
    pub(crate) settings: ClientSettings,
    pub(crate) scope: Scope,
    pub(crate) workspaces: TtlCell<Vec<Workspace>>,
    pub(crate) routing: TtlCell<RoutingTable>,
}

impl<A: PowerCloud> AppState<A> {
    /// Resolve the scope from the settings and start with empty caches.
    pub fn new(api: A, settings: ClientSettings) -> Result<Self, SettingsError> {
        let scope = match &settings.crn {
            Some(crn) => {
                let workspace_id = cloud_instance_id(crn).ok_or(SettingsError::InvalidCrn)?;
                Scope::Workspace(WorkspaceTarget {
                    workspace_id: workspace_id.to_string(),
                    crn: crn.clone(),
                    endpoint_url: settings.base_url.clone(),
                })
            }
            None => Scope::Account,
        };

        Ok(Self {
            api,
            settings,
            scope,
            workspaces: TtlCell::new(Duration::from_secs(ttl::WORKSPACE_DIRECTORY_SECS)),
            routing: TtlCell::new(Duration::from_secs(ttl::VM_ROUTING_SECS)),
        })
    }

    /// Normalize a directory entry, fixing the endpoint default here so
    /// no call site has to fall back on its own.
    pub(crate) fn workspace_from(&self, resource: WorkspaceResource) -> Workspace {
        Workspace {
            id: resource.id,
            name: resource.name,
            region: resource.location.region,
            endpoint_url: resource
                .location
                .url
                .unwrap_or_else(|| self.settings.base_url.clone()),
        }
    }

    /// Addressing triple for one workspace out of the directory.
    pub(crate) fn workspace_target(&self, workspace: &Workspace) -> WorkspaceTarget {
        WorkspaceTarget {
            workspace_id: workspace.id.clone(),
            crn: workspace_crn(
                &workspace.region,
                &self.settings.account_id,
                &workspace.id,
            ),
            endpoint_url: workspace.endpoint_url.clone(),
        }
    }

    /// The account's workspace directory, cached for 30 minutes.
    ///
    /// A valid snapshot is returned without a remote call. An expired
    /// snapshot triggers a refresh and is served as-is if the refresh
    /// fails. With no prior snapshot a failed fetch yields an empty
    /// list; an empty result here means "no data", not "no workspaces".
    pub(crate) async fn get_workspaces(&self, token: &str) -> Vec<Workspace> {
        if let Some(snapshot) = self.workspaces.fresh().await {
            return (*snapshot).clone();
        }

        let _gate = self.workspaces.begin_refresh().await;
        // Another task may have refreshed while we waited on the gate.
        if let Some(snapshot) = self.workspaces.fresh().await {
            return (*snapshot).clone();
        }

        match self.api.list_workspaces(token).await {
            Ok(resources) => {
                let directory: Vec<Workspace> = resources
                    .into_iter()
                    .map(|resource| self.workspace_from(resource))
                    .collect();
                self.workspaces.store(directory.clone()).await;
                directory
            }
            Err(e) => match self.workspaces.any().await {
                Some(stale) => {
                    warn!(error = %e, "workspace refresh failed; serving stale directory");
                    (*stale).clone()
                }
                None => {
                    warn!(error = %e, "workspace fetch failed with no cached directory");
                    Vec::new()
                }
            },
        }
    }

    /// Directory listing as a public operation: acquires its own token.
    ///
    /// Token exchange failing is the one hard error here; after that
    /// the cache's serve-stale policy applies and the result is data.
    pub async fn workspace_directory(&self) -> Result<Vec<Workspace>, FetchError> {
        let token = self.api.exchange_token().await?;
        Ok(self.get_workspaces(&token).await)
    }

    /// Resolve which workspace owns `vm_id` through the routing cache.
    ///
    /// In account-wide mode a stale or never-populated routing table is
    /// refreshed by one full fan-out before the lookup; a failed
    /// refresh falls back to whatever entries are still cached. A miss
    /// with a static scope configured resolves to that scope.
    pub(crate) async fn resolve(&self, token: &str, vm_id: &str) -> RouteLookup {
        if matches!(self.scope, Scope::Account) && self.routing.fresh().await.is_none() {
            let _gate = self.routing.begin_refresh().await;
            if self.routing.fresh().await.is_none() {
                if let Err(e) = self.sweep(token).await {
                    warn!(error = %e, "routing refresh failed; consulting stale entries");
                }
            }
        }

        if let Some(table) = self.routing.any().await {
            if let Some(route) = table.get(vm_id) {
                let crn = workspace_crn(
                    &route.region,
                    &self.settings.account_id,
                    &route.workspace_id,
                );
                return RouteLookup::Cached(WorkspaceTarget {
                    workspace_id: route.workspace_id.clone(),
                    crn,
                    endpoint_url: route.endpoint_url.clone(),
                });
            }
        }

        match &self.scope {
            Scope::Workspace(target) => RouteLookup::StaticScope(target.clone()),
            Scope::Account => RouteLookup::NotFound,
        }
    }
}
