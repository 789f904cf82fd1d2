//! Inventory aggregation: the per-workspace fan-out and its merge.
//!
//! Account-wide listings sweep every workspace in the directory with
//! bounded parallelism, then merge the per-workspace results
//! sequentially — VM records, summary counters, and a rebuilt routing
//! table all come out of that one merge. A workspace that fails is
//! skipped with a warning; the sweep only fails outright when there is
//! nothing to aggregate at all.

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use powervs_common::{
    FilteredVms, HealthSummary, Inventory, InventoryReport, StatusSummary, VmRecord, Workspace,
};

use crate::api::{InstanceResource, PowerCloud};
use crate::error::FetchError;
use crate::state::{AppState, RoutingTable, Scope, VmRoute};

/// Upper bound on concurrent per-workspace listing calls.
const FAN_OUT_WORKERS: usize = 4;

/// Health value recorded when the listing carries none.
const UNKNOWN_HEALTH: &str = "UNKNOWN";

/// Normalize one raw instance into the public record shape.
///
/// The workspace is attached only on account-wide sweeps; a missing
/// health field becomes `UNKNOWN` on the record but stays out of the
/// summary counters.
fn vm_record(instance: InstanceResource, workspace: Option<&Workspace>) -> VmRecord {
    let health_status = instance
        .health
        .and_then(|health| health.status)
        .unwrap_or_else(|| UNKNOWN_HEALTH.to_string());

    VmRecord {
        vm_id: instance.id,
        name: instance.server_name,
        os_type: instance.os_type,
        system_type: instance.sys_type,
        status: instance.status,
        health_status,
        crn: instance.crn,
        workspace_name: workspace.map(|ws| ws.name.clone()),
        workspace_region: workspace.map(|ws| ws.region.clone()),
    }
}

impl<A: PowerCloud> AppState<A> {
    /// Full inventory for the configured scope.
    ///
    /// Single-workspace mode issues one live query and returns a flat
    /// listing; account-wide mode runs a fan-out sweep and returns the
    /// summarized report. Never served from cache — the routing table
    /// is the only by-product that persists.
    pub async fn list_all_vms(&self) -> Result<Inventory, FetchError> {
        let token = self.api.exchange_token().await?;

        match &self.scope {
            Scope::Workspace(target) => {
                let instances = self
                    .api
                    .list_instances(&token, target)
                    .await?
                    .ok_or_else(|| {
                        FetchError::Malformed("instance listing carried no payload".to_string())
                    })?;
                let vms = instances
                    .into_iter()
                    .map(|instance| vm_record(instance, None))
                    .collect();
                Ok(Inventory::Workspace(vms))
            }
            Scope::Account => {
                // One sweep at a time; a concurrent routing refresh and
                // a listing request must not fan out twice.
                let _gate = self.routing.begin_refresh().await;
                Ok(Inventory::Account(self.sweep(&token).await?))
            }
        }
    }

    /// Inventory filtered to one health status, case-insensitively.
    pub async fn vms_by_health(&self, status: &str) -> Result<FilteredVms, FetchError> {
        let vms = match self.list_all_vms().await? {
            Inventory::Account(report) => report.vms,
            Inventory::Workspace(vms) => vms,
        };
        let vms: Vec<VmRecord> = vms
            .into_iter()
            .filter(|vm| vm.health_status.eq_ignore_ascii_case(status))
            .collect();
        Ok(FilteredVms {
            total_vms: vms.len(),
            vms,
        })
    }

    /// VMs whose health status is `CRITICAL`.
    pub async fn critical_vms(&self) -> Result<FilteredVms, FetchError> {
        self.vms_by_health("CRITICAL").await
    }

    /// Fan out across the workspace directory and merge.
    ///
    /// Callers must hold the routing refresh gate. The sweep is the
    /// sole writer of the routing table and its timestamp; a workspace
    /// that errors contributes neither records nor routing entries.
    pub(crate) async fn sweep(&self, token: &str) -> Result<InventoryReport, FetchError> {
        let directory = self.get_workspaces(token).await;
        if directory.is_empty() {
            return Err(FetchError::NoWorkspaces);
        }

        let results: Vec<(Workspace, Result<Option<Vec<InstanceResource>>, FetchError>)> =
            stream::iter(directory.clone())
                .map(|workspace| async move {
                    let target = self.workspace_target(&workspace);
                    let listing = self.api.list_instances(token, &target).await;
                    (workspace, listing)
                })
                .buffer_unordered(FAN_OUT_WORKERS)
                .collect()
                .await;

        let mut vms = Vec::new();
        let mut routing = RoutingTable::new();
        let mut health_summary = HealthSummary::default();
        let mut status_summary = StatusSummary::default();

        for (workspace, outcome) in results {
            let instances = match outcome {
                Ok(Some(instances)) => instances,
                Ok(None) => {
                    warn!(workspace = %workspace.id, "instance listing carried no payload; skipping workspace");
                    continue;
                }
                Err(e) => {
                    warn!(workspace = %workspace.id, error = %e, "instance listing failed; skipping workspace");
                    continue;
                }
            };

            for instance in instances {
                let record = vm_record(instance, Some(&workspace));
                routing.insert(
                    record.vm_id.clone(),
                    VmRoute {
                        workspace_id: workspace.id.clone(),
                        region: workspace.region.clone(),
                        endpoint_url: workspace.endpoint_url.clone(),
                    },
                );
                health_summary.record(&record.health_status);
                status_summary.record(&record.status);
                vms.push(record);
            }
        }

        info!(
            total_vms = vms.len(),
            total_workspaces = directory.len(),
            "inventory sweep complete"
        );
        self.routing.store(routing).await;

        Ok(InventoryReport {
            total_vms: vms.len(),
            total_workspaces: directory.len(),
            health_summary,
            status_summary,
            vms,
        })
    }
}
