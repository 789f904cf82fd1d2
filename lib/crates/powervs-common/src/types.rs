use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Composite health verdict produced by worst-wins composition.
///
/// Sub-assessments and the overall result only ever take these two
/// values; raw per-VM health strings stay free-form (see [`VmRecord`]).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HealthVerdict {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "CRITICAL")]
    Critical,
}

impl HealthVerdict {
    /// `Ok` when the issue list is empty, `Critical` otherwise.
    #[must_use]
    pub fn from_issue_count(issues: usize) -> Self {
        if issues == 0 { Self::Ok } else { Self::Critical }
    }

    /// Worst-wins: any critical input makes the composite critical.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        if self == Self::Critical || other == Self::Critical {
            Self::Critical
        } else {
            Self::Ok
        }
    }
}

/// Per-VM health counters over the fixed key set the report exposes.
///
/// Counting normalizes case; values outside the four recognized labels
/// are not counted here but stay visible on the individual records.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthSummary {
    #[serde(rename = "OK")]
    pub ok: usize,
    #[serde(rename = "CRITICAL")]
    pub critical: usize,
    #[serde(rename = "WARNING")]
    pub warning: usize,
    #[serde(rename = "ATTENTION")]
    pub attention: usize,
}

impl HealthSummary {
    pub fn record(&mut self, health_status: &str) {
        match health_status.to_ascii_uppercase().as_str() {
            "OK" => self.ok += 1,
            "CRITICAL" => self.critical += 1,
            "WARNING" => self.warning += 1,
            "ATTENTION" => self.attention += 1,
            _ => {}
        }
    }

    /// Sum of all counted buckets; at most the number of recorded VMs.
    #[must_use]
    pub fn total(&self) -> usize {
        self.ok + self.critical + self.warning + self.attention
    }
}

/// Per-VM status counters over the fixed key set the report exposes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusSummary {
    #[serde(rename = "ACTIVE")]
    pub active: usize,
    #[serde(rename = "ERROR")]
    pub error: usize,
    #[serde(rename = "SHUTOFF")]
    pub shutoff: usize,
}

impl StatusSummary {
    pub fn record(&mut self, status: &str) {
        match status.to_ascii_uppercase().as_str() {
            "ACTIVE" => self.active += 1,
            "ERROR" => self.error += 1,
            "SHUTOFF" => self.shutoff += 1,
            _ => {}
        }
    }
}

/// One VM instance, normalized from the upstream listing.
///
/// `health_status` keeps the raw upstream value; a listing entry without
/// health data gets `"UNKNOWN"`. The workspace fields are only present
/// on records produced by an account-wide fan-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VmRecord {
    pub vm_id: String,
    pub name: String,
    pub os_type: String,
    pub system_type: String,
    pub status: String,
    pub health_status: String,
    pub crn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_region: Option<String>,
}

/// One workspace visible to the account.
///
/// `endpoint_url` is fixed at construction: the workspace's own endpoint
/// when the directory listing carries one, the regional base endpoint
/// otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub region: String,
    pub endpoint_url: String,
}

/// Account-wide aggregation report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryReport {
    pub total_vms: usize,
    pub total_workspaces: usize,
    pub health_summary: HealthSummary,
    pub status_summary: StatusSummary,
    pub vms: Vec<VmRecord>,
}

/// Inventory result; the JSON shape follows the configured scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Inventory {
    /// Account-wide fan-out report with summaries.
    Account(InventoryReport),
    /// Flat listing for a single statically-scoped workspace.
    Workspace(Vec<VmRecord>),
}

/// Health-filtered slice of the inventory.
///
/// `total_vms` counts the filtered set, not the whole inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilteredVms {
    pub total_vms: usize,
    pub vms: Vec<VmRecord>,
}

/// An attached volume in an unhealthy state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeIssue {
    pub name: String,
    pub state: String,
}

/// Network sub-assessment for one VM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkHealthReport {
    pub network_health: HealthVerdict,
    /// IP addresses of this VM's interfaces that are not `ACTIVE`.
    pub interfaces_down: Vec<String>,
}

/// Storage sub-assessment for one VM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageHealthReport {
    pub storage_health: HealthVerdict,
    pub unhealthy_volumes: Vec<VolumeIssue>,
}

/// Combined health report for one VM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthReport {
    pub vm_name: String,
    pub vm_id: String,
    pub overall_health: HealthVerdict,
    pub vm_status: String,
    pub network_health: HealthVerdict,
    pub storage_health: HealthVerdict,
    pub network_issues: Vec<String>,
    pub storage_issues: Vec<VolumeIssue>,
}

/// One boot image, as listed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageSummary {
    pub image_id: String,
    pub name: String,
    pub operating_system: Option<String>,
    pub state: String,
}

/// Image listing for the configured workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageInventory {
    pub total_images: usize,
    pub images: Vec<ImageSummary>,
}

/// Full detail document for one boot image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageDetails {
    pub image_id: String,
    pub name: String,
    pub description: Option<String>,
    pub state: String,
    pub size: Option<f64>,
    pub storage_type: Option<String>,
    pub storage_pool: Option<String>,
    pub operating_system: Option<String>,
    pub architecture: Option<String>,
    pub image_type: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub last_update_date: Option<DateTime<Utc>>,
    pub servers: Vec<String>,
    pub volumes: Vec<serde_json::Value>,
}

/// Address usage counters for one network.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct IpAddressMetrics {
    pub total: f64,
    pub available: f64,
    pub used: f64,
    pub utilization: f64,
}

/// One subnet in the configured workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSummary {
    pub network_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub net_type: String,
    pub cidr: Option<String>,
    pub gateway: Option<String>,
    pub dns_servers: Vec<String>,
    pub vlan_id: Option<i64>,
    pub ip_address_metrics: IpAddressMetrics,
}

/// Network listing for the configured workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkInventory {
    pub total_networks: usize,
    pub networks: Vec<NetworkSummary>,
}

/// One snapshot of a VM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotInfo {
    pub snapshot_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub creation_date: Option<DateTime<Utc>>,
    pub last_update_date: Option<DateTime<Utc>>,
    pub pvm_instance_id: String,
    /// Volume-to-snapshot mapping, passed through as the upstream sends it.
    pub volume_snapshots: serde_json::Value,
}

/// Snapshot listing for one VM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotInventory {
    pub vm_id: String,
    pub total_snapshots: usize,
    pub snapshots: Vec<SnapshotInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(vm_id: &str, health_status: &str) -> VmRecord {
        VmRecord {
            vm_id: vm_id.to_string(),
            name: format!("vm-{vm_id}"),
            os_type: "aix".to_string(),
            system_type: "s922".to_string(),
            status: "ACTIVE".to_string(),
            health_status: health_status.to_string(),
            crn: String::new(),
            workspace_name: None,
            workspace_region: None,
        }
    }

    // --- HealthVerdict ---

    #[test]
    fn health_verdict_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&HealthVerdict::Ok).unwrap(), "\"OK\"");
        assert_eq!(
            serde_json::to_string(&HealthVerdict::Critical).unwrap(),
            "\"CRITICAL\""
        );
    }

    #[test]
    fn combine_is_worst_wins() {
        use HealthVerdict::{Critical, Ok};
        assert_eq!(Ok.combine(Ok), Ok);
        assert_eq!(Ok.combine(Critical), Critical);
        assert_eq!(Critical.combine(Ok), Critical);
        assert_eq!(Critical.combine(Critical), Critical);
    }

    #[test]
    fn from_issue_count_boundary() {
        assert_eq!(HealthVerdict::from_issue_count(0), HealthVerdict::Ok);
        assert_eq!(HealthVerdict::from_issue_count(1), HealthVerdict::Critical);
    }

    // --- Summary counters ---

    #[test]
    fn health_summary_counts_recognized_labels() {
        let mut summary = HealthSummary::default();
        for label in ["OK", "OK", "CRITICAL", "WARNING", "ATTENTION"] {
            summary.record(label);
        }
        assert_eq!(summary.ok, 2);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.warning, 1);
        assert_eq!(summary.attention, 1);
        assert_eq!(summary.total(), 5);
    }

    #[test]
    fn health_summary_normalizes_case() {
        let mut summary = HealthSummary::default();
        summary.record("ok");
        summary.record("Critical");
        assert_eq!(summary.ok, 1);
        assert_eq!(summary.critical, 1);
    }

    #[test]
    fn health_summary_drops_unrecognized_labels() {
        let mut summary = HealthSummary::default();
        summary.record("DEGRADED");
        summary.record("UNKNOWN");
        summary.record("");
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn health_summary_serializes_with_fixed_uppercase_keys() {
        let json = serde_json::to_string(&HealthSummary::default()).unwrap();
        assert_eq!(json, r#"{"OK":0,"CRITICAL":0,"WARNING":0,"ATTENTION":0}"#);
    }

    #[test]
    fn status_summary_counts_and_drops() {
        let mut summary = StatusSummary::default();
        for status in ["ACTIVE", "active", "ERROR", "SHUTOFF", "BUILD"] {
            summary.record(status);
        }
        assert_eq!(summary.active, 2);
        assert_eq!(summary.error, 1);
        assert_eq!(summary.shutoff, 1);
    }

    #[test]
    fn status_summary_serializes_with_fixed_uppercase_keys() {
        let json = serde_json::to_string(&StatusSummary::default()).unwrap();
        assert_eq!(json, r#"{"ACTIVE":0,"ERROR":0,"SHUTOFF":0}"#);
    }

    // --- VmRecord workspace fields ---

    #[test]
    fn vm_record_omits_absent_workspace_fields() {
        let json = serde_json::to_string(&record("vm-1", "OK")).unwrap();
        assert!(!json.contains("workspace_name"));
        assert!(!json.contains("workspace_region"));
    }

    #[test]
    fn vm_record_includes_present_workspace_fields() {
        let mut vm = record("vm-1", "OK");
        vm.workspace_name = Some("dal10-ws".to_string());
        vm.workspace_region = Some("dal10".to_string());
        let json = serde_json::to_string(&vm).unwrap();
        assert!(json.contains(r#""workspace_name":"dal10-ws""#));
        assert!(json.contains(r#""workspace_region":"dal10""#));
    }

    // --- Inventory shape per scope ---

    #[test]
    fn account_inventory_serializes_as_report_object() {
        let inventory = Inventory::Account(InventoryReport {
            total_vms: 1,
            total_workspaces: 2,
            health_summary: HealthSummary::default(),
            status_summary: StatusSummary::default(),
            vms: vec![record("vm-1", "OK")],
        });
        let value = serde_json::to_value(&inventory).unwrap();
        assert_eq!(value["total_vms"], 1);
        assert_eq!(value["total_workspaces"], 2);
        assert!(value["vms"].is_array());
    }

    #[test]
    fn workspace_inventory_serializes_as_bare_array() {
        let inventory = Inventory::Workspace(vec![record("vm-1", "OK")]);
        let value = serde_json::to_value(&inventory).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["vm_id"], "vm-1");
    }

    // --- Health report shape ---

    #[test]
    fn health_report_serde_round_trip() {
        let report = HealthReport {
            vm_name: "db-1".to_string(),
            vm_id: "vm-1".to_string(),
            overall_health: HealthVerdict::Critical,
            vm_status: "ACTIVE".to_string(),
            network_health: HealthVerdict::Ok,
            storage_health: HealthVerdict::Critical,
            network_issues: vec![],
            storage_issues: vec![VolumeIssue {
                name: "data-vol".to_string(),
                state: "error".to_string(),
            }],
        };
        let json = serde_json::to_string(&report).unwrap();
        let deserialized: HealthReport = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, report);
    }

    #[test]
    fn network_summary_renames_type_field() {
        let network = NetworkSummary {
            network_id: "net-1".to_string(),
            name: "private".to_string(),
            net_type: "vlan".to_string(),
            cidr: Some("192.168.0.0/24".to_string()),
            gateway: Some("192.168.0.1".to_string()),
            dns_servers: vec!["9.9.9.9".to_string()],
            vlan_id: Some(300),
            ip_address_metrics: IpAddressMetrics::default(),
        };
        let value = serde_json::to_value(&network).unwrap();
        assert_eq!(value["type"], "vlan");
        assert!(value.get("net_type").is_none());
    }
}
