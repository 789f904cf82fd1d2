//! MCP tool implementations for the PowerVS insights server.
//!
//! Exposes 11 read-only tools via the `rmcp` `#[tool]` macro. Every
//! tool serializes either the engine's payload or an
//! `{"error": "..."}` object — engine failures never surface through
//! the MCP error channel, only serializer failures do.

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::ServerInfo,
    tool, tool_handler, tool_router, ServerHandler,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use powervs_common::Workspace;

use crate::api::PowerCloudHttp;
use crate::error::FetchError;
use crate::state::AppState;

// ===================================================================
// Input structs
// ===================================================================

/// Input for tools addressing a single VM.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct VmIdInput {
    /// ID of the VM instance (`pvmInstanceID`).
    pub vm_id: String,
}

/// Input for `get_vms_by_health_status`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct HealthStatusInput {
    /// Health status to filter by, e.g. `OK` or `CRITICAL`.
    /// Matching is case-insensitive.
    pub status: String,
}

/// Input for `get_image_details`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ImageIdInput {
    /// ID of the boot image.
    pub image_id: String,
}

// ===================================================================
// Output structs
// ===================================================================

/// Output of the `list_workspaces` tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceListing {
    pub total_workspaces: usize,
    pub workspaces: Vec<Workspace>,
}

/// Error payload every tool degrades to on engine failure.
#[derive(Debug, Clone, Serialize)]
struct ErrorPayload {
    error: String,
}

/// Serialize the engine result, folding errors into the payload.
fn render<T: Serialize>(result: Result<T, FetchError>) -> Result<String, String> {
    match result {
        Ok(payload) => {
            serde_json::to_string(&payload).map_err(|e| format!("Serialization error: {e}"))
        }
        Err(e) => serde_json::to_string(&ErrorPayload {
            error: e.to_string(),
        })
        .map_err(|e| format!("Serialization error: {e}")),
    }
}

// ===================================================================
// InsightsTools — the MCP server handler
// ===================================================================

/// MCP server handler exposing the aggregation engine as tools.
///
/// Holds a shared reference to [`AppState`]; every session created by
/// the transport shares the same caches.
#[derive(Clone)]
pub struct InsightsTools {
    state: Arc<AppState<PowerCloudHttp>>,
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for InsightsTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightsTools")
            .field("state", &"<AppState>")
            .finish()
    }
}

impl InsightsTools {
    pub fn new(state: Arc<AppState<PowerCloudHttp>>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }
}

// -------------------------------------------------------------------
// Tool implementations
// -------------------------------------------------------------------

#[tool_router]
impl InsightsTools {
    /// Full VM inventory for the configured scope.
    #[tool(description = "List all VM instances. Account-wide scope returns \
        totals and health/status summaries; single-workspace scope returns \
        a flat listing.")]
    async fn list_vms(&self) -> Result<String, String> {
        render(self.state.list_all_vms().await)
    }

    /// Inventory filtered to one health status.
    #[tool(description = "List VM instances whose health status matches the \
        given value (case-insensitive, e.g. OK, WARNING, CRITICAL).")]
    async fn get_vms_by_health_status(
        &self,
        params: Parameters<HealthStatusInput>,
    ) -> Result<String, String> {
        render(self.state.vms_by_health(&params.0.status).await)
    }

    /// Shortcut for the CRITICAL filter.
    #[tool(description = "List VM instances whose health status is CRITICAL.")]
    async fn get_critical_vms(&self) -> Result<String, String> {
        render(self.state.critical_vms().await)
    }

    /// Workspaces visible to the account.
    #[tool(description = "List the workspaces visible to the account, with \
        their regions and endpoints.")]
    async fn list_workspaces(&self) -> Result<String, String> {
        render(self.state.workspace_directory().await.map(|workspaces| {
            WorkspaceListing {
                total_workspaces: workspaces.len(),
                workspaces,
            }
        }))
    }

    /// Network sub-assessment for one VM.
    #[tool(description = "Check the network health of one VM: reports \
        interfaces that are not ACTIVE.")]
    async fn get_vm_network_health(
        &self,
        params: Parameters<VmIdInput>,
    ) -> Result<String, String> {
        render(self.state.network_health(&params.0.vm_id).await)
    }

    /// Storage sub-assessment for one VM.
    #[tool(description = "Check the storage health of one VM: reports \
        volumes in an abnormal state.")]
    async fn get_vm_storage_health(
        &self,
        params: Parameters<VmIdInput>,
    ) -> Result<String, String> {
        render(self.state.storage_health(&params.0.vm_id).await)
    }

    /// Combined worst-wins health verdict for one VM.
    #[tool(description = "Get the overall health of one VM, combining \
        network and storage checks (worst verdict wins).")]
    async fn get_vm_health(&self, params: Parameters<VmIdInput>) -> Result<String, String> {
        render(self.state.vm_health(&params.0.vm_id).await)
    }

    /// Boot images of the configured workspace.
    #[tool(description = "List the boot images of the configured workspace. \
        Requires a workspace CRN to be configured.")]
    async fn list_images(&self) -> Result<String, String> {
        render(self.state.images().await)
    }

    /// Full detail document for one boot image.
    #[tool(description = "Get the full details of one boot image by its ID. \
        Requires a workspace CRN to be configured.")]
    async fn get_image_details(&self, params: Parameters<ImageIdInput>) -> Result<String, String> {
        render(self.state.image_details(&params.0.image_id).await)
    }

    /// Subnets of the configured workspace.
    #[tool(description = "List the networks of the configured workspace with \
        address-usage metrics. Requires a workspace CRN to be configured.")]
    async fn list_networks(&self) -> Result<String, String> {
        render(self.state.networks().await)
    }

    /// Snapshots of one VM.
    #[tool(description = "List the snapshots of one VM instance.")]
    async fn get_vm_snapshots(&self, params: Parameters<VmIdInput>) -> Result<String, String> {
        render(self.state.vm_snapshots(&params.0.vm_id).await)
    }
}

// -------------------------------------------------------------------
// ServerHandler implementation (via tool_handler macro)
// -------------------------------------------------------------------

#[tool_handler]
impl ServerHandler for InsightsTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "PowerVS Insights — read-only VM health and inventory tools. \
                 Use list_vms for the aggregated inventory, get_vm_health for \
                 a single VM's combined verdict, and get_critical_vms to find \
                 VMs needing attention."
                    .into(),
            ),
            ..Default::default()
        }
    }
}
