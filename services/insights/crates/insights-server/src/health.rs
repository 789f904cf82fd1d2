//! Per-VM health composition.
//!
//! Network health comes from the VM's interface statuses, storage
//! health from its volume states; the overall verdict is worst-wins
//! over the two. Any remote failure along the way fails the whole
//! operation — there is no partial health report.

use powervs_common::{HealthReport, HealthVerdict, NetworkHealthReport, StorageHealthReport, VolumeIssue};

use crate::api::{InstanceNetwork, PowerCloud, WorkspaceTarget};
use crate::error::FetchError;
use crate::state::AppState;

/// Interface status that counts as healthy; anything else is down.
const INTERFACE_UP: &str = "ACTIVE";

/// Volume states that are part of normal operation. A state outside
/// this list marks the volume unhealthy.
const HEALTHY_VOLUME_STATES: [&str; 5] =
    ["in-use", "available", "creating", "attaching", "detaching"];

impl<A: PowerCloud> AppState<A> {
    /// Combined health verdict for one VM.
    pub async fn vm_health(&self, vm_id: &str) -> Result<HealthReport, FetchError> {
        let token = self.api.exchange_token().await?;
        let target = self.resolve(&token, vm_id).await.into_target()?;

        let detail = self.api.instance_detail(&token, &target, vm_id).await?;
        let network_issues = self
            .down_interfaces(&token, &target.crn, vm_id, &detail.networks)
            .await?;
        let storage_issues = self.unhealthy_volumes(&token, &target, vm_id).await?;

        let network_health = HealthVerdict::from_issue_count(network_issues.len());
        let storage_health = HealthVerdict::from_issue_count(storage_issues.len());

        Ok(HealthReport {
            vm_name: detail.server_name,
            vm_id: vm_id.to_string(),
            overall_health: network_health.combine(storage_health),
            vm_status: detail.status,
            network_health,
            storage_health,
            network_issues,
            storage_issues,
        })
    }

    /// Network sub-assessment on its own.
    pub async fn network_health(&self, vm_id: &str) -> Result<NetworkHealthReport, FetchError> {
        let token = self.api.exchange_token().await?;
        let target = self.resolve(&token, vm_id).await.into_target()?;

        let detail = self.api.instance_detail(&token, &target, vm_id).await?;
        let interfaces_down = self
            .down_interfaces(&token, &target.crn, vm_id, &detail.networks)
            .await?;

        Ok(NetworkHealthReport {
            network_health: HealthVerdict::from_issue_count(interfaces_down.len()),
            interfaces_down,
        })
    }

    /// Storage sub-assessment on its own.
    pub async fn storage_health(&self, vm_id: &str) -> Result<StorageHealthReport, FetchError> {
        let token = self.api.exchange_token().await?;
        let target = self.resolve(&token, vm_id).await.into_target()?;

        let unhealthy_volumes = self.unhealthy_volumes(&token, &target, vm_id).await?;

        Ok(StorageHealthReport {
            storage_health: HealthVerdict::from_issue_count(unhealthy_volumes.len()),
            unhealthy_volumes,
        })
    }

    /// IP addresses of this VM's interfaces that are not `ACTIVE`.
    ///
    /// Walks every network attached to the VM; interfaces attached to
    /// other VMs on the same network are ignored.
    async fn down_interfaces(
        &self,
        token: &str,
        crn: &str,
        vm_id: &str,
        networks: &[InstanceNetwork],
    ) -> Result<Vec<String>, FetchError> {
        let mut down = Vec::new();
        for network in networks {
            let interfaces = self
                .api
                .network_interfaces(token, crn, &network.network_id)
                .await?;
            for interface in interfaces {
                let attached_here = interface
                    .pvm_instance
                    .as_ref()
                    .is_some_and(|instance| instance.pvm_instance_id == vm_id);
                if attached_here && interface.status != INTERFACE_UP {
                    down.push(interface.ip_address);
                }
            }
        }
        Ok(down)
    }

    /// Volumes of this VM whose state falls outside the allow-list.
    async fn unhealthy_volumes(
        &self,
        token: &str,
        target: &WorkspaceTarget,
        vm_id: &str,
    ) -> Result<Vec<VolumeIssue>, FetchError> {
        let volumes = self.api.instance_volumes(token, target, vm_id).await?;
        Ok(volumes
            .into_iter()
            .filter(|volume| !HEALTHY_VOLUME_STATES.contains(&volume.state.as_str()))
            .map(|volume| VolumeIssue {
                name: volume.name,
                state: volume.state,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::stub::{instance_resource, StubCloud};
    use crate::api::{InstanceResource, InterfaceInstance, InterfaceResource, VolumeResource};
    use crate::state::test_support::workspace_state;

    fn interface(ip: &str, status: &str, vm_id: Option<&str>) -> InterfaceResource {
        InterfaceResource {
            ip_address: ip.to_string(),
            status: status.to_string(),
            pvm_instance: vm_id.map(|id| InterfaceInstance {
                pvm_instance_id: id.to_string(),
            }),
        }
    }

    fn volume(name: &str, state: &str) -> VolumeResource {
        VolumeResource {
            name: name.to_string(),
            state: state.to_string(),
        }
    }

    fn detail_with_networks(vm_id: &str, networks: &[&str]) -> InstanceResource {
        let mut detail = instance_resource(vm_id, "ACTIVE", Some("OK"));
        detail.networks = networks
            .iter()
            .map(|id| InstanceNetwork {
                network_id: (*id).to_string(),
            })
            .collect();
        detail
    }

    /// Static-scope state with one VM wired up: one network, one volume.
    fn stub_vm(
        interfaces: Vec<InterfaceResource>,
        volumes: Vec<VolumeResource>,
    ) -> crate::state::AppState<StubCloud> {
        let api = StubCloud::default();
        api.details
            .lock()
            .unwrap()
            .insert("vm-1".to_string(), detail_with_networks("vm-1", &["net-1"]));
        api.interfaces.lock().unwrap().insert("net-1".to_string(), interfaces);
        api.volumes.lock().unwrap().insert("vm-1".to_string(), volumes);
        workspace_state(api)
    }

    // --- Worst-wins composition ---

    #[tokio::test]
    async fn both_subsystems_healthy_is_overall_ok() {
        let state = stub_vm(
            vec![interface("10.0.0.5", "ACTIVE", Some("vm-1"))],
            vec![volume("data", "in-use")],
        );
        let report = state.vm_health("vm-1").await.unwrap();

        assert_eq!(report.overall_health, HealthVerdict::Ok);
        assert_eq!(report.network_health, HealthVerdict::Ok);
        assert_eq!(report.storage_health, HealthVerdict::Ok);
        assert!(report.network_issues.is_empty());
        assert!(report.storage_issues.is_empty());
    }

    #[tokio::test]
    async fn down_interface_makes_overall_critical() {
        let state = stub_vm(
            vec![interface("10.0.0.5", "BUILD", Some("vm-1"))],
            vec![volume("data", "in-use")],
        );
        let report = state.vm_health("vm-1").await.unwrap();

        assert_eq!(report.network_health, HealthVerdict::Critical);
        assert_eq!(report.storage_health, HealthVerdict::Ok);
        assert_eq!(report.overall_health, HealthVerdict::Critical);
        assert_eq!(report.network_issues, vec!["10.0.0.5".to_string()]);
    }

    #[tokio::test]
    async fn errored_volume_makes_overall_critical() {
        let state = stub_vm(
            vec![interface("10.0.0.5", "ACTIVE", Some("vm-1"))],
            vec![volume("data", "error")],
        );
        let report = state.vm_health("vm-1").await.unwrap();

        assert_eq!(report.network_health, HealthVerdict::Ok);
        assert_eq!(report.storage_health, HealthVerdict::Critical);
        assert_eq!(report.overall_health, HealthVerdict::Critical);
        assert_eq!(report.storage_issues[0].name, "data");
        assert_eq!(report.storage_issues[0].state, "error");
    }

    #[tokio::test]
    async fn report_carries_name_and_status_from_the_detail() {
        let state = stub_vm(Vec::new(), Vec::new());
        let report = state.vm_health("vm-1").await.unwrap();
        assert_eq!(report.vm_name, "vm-vm-1");
        assert_eq!(report.vm_status, "ACTIVE");
    }

    // --- Interface attribution ---

    #[tokio::test]
    async fn other_vms_interfaces_are_ignored() {
        let state = stub_vm(
            vec![
                interface("10.0.0.5", "DOWN", Some("vm-9")),
                interface("10.0.0.6", "DOWN", None),
                interface("10.0.0.7", "ACTIVE", Some("vm-1")),
            ],
            vec![],
        );
        let report = state.network_health("vm-1").await.unwrap();
        assert_eq!(report.network_health, HealthVerdict::Ok);
        assert!(report.interfaces_down.is_empty());
    }

    // --- Volume allow-list ---

    #[tokio::test]
    async fn transitional_volume_states_are_healthy() {
        let state = stub_vm(
            vec![],
            vec![
                volume("a", "available"),
                volume("b", "creating"),
                volume("c", "attaching"),
                volume("d", "detaching"),
            ],
        );
        let report = state.storage_health("vm-1").await.unwrap();
        assert_eq!(report.storage_health, HealthVerdict::Ok);
    }

    #[tokio::test]
    async fn unlisted_volume_state_is_unhealthy() {
        let state = stub_vm(vec![], vec![volume("a", "broken"), volume("b", "")]);
        let report = state.storage_health("vm-1").await.unwrap();
        assert_eq!(report.storage_health, HealthVerdict::Critical);
        assert_eq!(report.unhealthy_volumes.len(), 2);
    }

    // --- Failure propagation ---

    #[tokio::test]
    async fn unknown_vm_is_a_not_found_error() {
        let api = StubCloud::default();
        api.push_workspaces(Ok(Vec::new()));
        let state = crate::state::test_support::account_state(api);

        let err = state.vm_health("vm-missing").await.unwrap_err();
        assert_eq!(err.to_string(), "VM not found.");
    }

    #[tokio::test]
    async fn interface_fetch_failure_fails_the_whole_operation() {
        // Detail references net-1 but no interfaces are canned for it.
        let api = StubCloud::default();
        api.details
            .lock()
            .unwrap()
            .insert("vm-1".to_string(), detail_with_networks("vm-1", &["net-1"]));
        api.volumes.lock().unwrap().insert("vm-1".to_string(), vec![]);
        let state = workspace_state(api);

        let err = state.vm_health("vm-1").await.unwrap_err();
        assert!(matches!(err, FetchError::Remote(_)));
    }

    #[tokio::test]
    async fn auth_failure_stops_before_any_fetch() {
        let api = StubCloud {
            fail_token: true,
            ..StubCloud::default()
        };
        let state = workspace_state(api);

        let err = state.vm_health("vm-1").await.unwrap_err();
        assert!(matches!(err, FetchError::Auth(_)));
    }
}
