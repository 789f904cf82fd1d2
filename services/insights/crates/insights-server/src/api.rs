//! Upstream compute platform client.
//!
//! [`PowerCloud`] is the seam between the aggregation engine and the
//! platform: the engine only sees typed resource documents, never HTTP.
//! [`PowerCloudHttp`] is the production implementation over `reqwest`,
//! with per-request timeouts tiered by call weight and explicit status
//! checks. Tests substitute a canned stub.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use powervs_common::config::timeouts;

use crate::error::FetchError;

/// Token-exchange endpoint of the identity service.
const TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";

/// Grant type the identity service expects for API-key exchange.
const GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Addressing triple for workspace-scoped upstream calls.
///
/// Scoped calls go to the workspace's own endpoint and carry the
/// workspace CRN as a header; the workspace ID appears in the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceTarget {
    pub workspace_id: String,
    pub crn: String,
    pub endpoint_url: String,
}

// ===================================================================
// Wire shapes
// ===================================================================

#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspacesEnvelope {
    #[serde(default)]
    pub workspaces: Vec<WorkspaceResource>,
}

/// One workspace as the directory endpoint lists it.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceResource {
    pub id: String,
    pub name: String,
    pub location: WorkspaceLocation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceLocation {
    pub region: String,
    /// Workspace-specific endpoint; absent when the regional base
    /// endpoint applies.
    pub url: Option<String>,
}

/// Listing envelope for VM instances.
///
/// `pvm_instances` stays an `Option` on purpose: a payload without the
/// key is distinguishable from an empty listing, and the fan-out skips
/// such workspaces with a warning.
#[derive(Debug, Clone, Deserialize)]
pub struct InstancesEnvelope {
    #[serde(rename = "pvmInstances")]
    pub pvm_instances: Option<Vec<InstanceResource>>,
}

/// One VM instance document, from either the listing or the detail
/// endpoint. Only the detail endpoint carries `networks`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceResource {
    #[serde(rename = "pvmInstanceID")]
    pub id: String,
    #[serde(rename = "serverName", default)]
    pub server_name: String,
    #[serde(rename = "osType", default)]
    pub os_type: String,
    #[serde(rename = "sysType", default)]
    pub sys_type: String,
    #[serde(default)]
    pub status: String,
    pub health: Option<InstanceHealth>,
    #[serde(default)]
    pub crn: String,
    #[serde(default)]
    pub networks: Vec<InstanceNetwork>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceHealth {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceNetwork {
    #[serde(rename = "networkID")]
    pub network_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterfacesEnvelope {
    #[serde(rename = "networkInterfaces", default)]
    pub network_interfaces: Vec<InterfaceResource>,
}

/// One port on a network, possibly attached to a VM.
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceResource {
    #[serde(rename = "ipAddress", default)]
    pub ip_address: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "pvmInstance")]
    pub pvm_instance: Option<InterfaceInstance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceInstance {
    #[serde(rename = "pvmInstanceID")]
    pub pvm_instance_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumesEnvelope {
    #[serde(default)]
    pub volumes: Vec<VolumeResource>,
}

/// One volume attached to a VM. A missing state counts as unhealthy.
#[derive(Debug, Clone, Deserialize)]
pub struct VolumeResource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagesEnvelope {
    #[serde(default)]
    pub images: Vec<ImageResource>,
}

/// One boot image document, from either the listing or the detail
/// endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageResource {
    #[serde(rename = "imageID")]
    pub image_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(rename = "storageType", default)]
    pub storage_type: Option<String>,
    #[serde(rename = "storagePool", default)]
    pub storage_pool: Option<String>,
    #[serde(rename = "creationDate", default)]
    pub creation_date: Option<DateTime<Utc>>,
    #[serde(rename = "lastUpdateDate", default)]
    pub last_update_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub specifications: ImageSpecifications,
    #[serde(default)]
    pub servers: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageSpecifications {
    #[serde(rename = "operatingSystem", default)]
    pub operating_system: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(rename = "imageType", default)]
    pub image_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworksEnvelope {
    #[serde(default)]
    pub networks: Vec<NetworkResource>,
}

/// One subnet document.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkResource {
    #[serde(rename = "networkID")]
    pub network_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub net_type: String,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(rename = "dnsServers", default)]
    pub dns_servers: Vec<String>,
    #[serde(rename = "vlanID", default)]
    pub vlan_id: Option<i64>,
    #[serde(rename = "ipAddressMetrics", default)]
    pub ip_address_metrics: IpMetricsResource,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct IpMetricsResource {
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub available: f64,
    #[serde(default)]
    pub used: f64,
    #[serde(default)]
    pub utilization: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotsEnvelope {
    #[serde(default)]
    pub snapshots: Vec<SnapshotResource>,
}

/// One snapshot of a VM.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotResource {
    #[serde(rename = "snapshotID")]
    pub snapshot_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "creationDate", default)]
    pub creation_date: Option<DateTime<Utc>>,
    #[serde(rename = "lastUpdateDate", default)]
    pub last_update_date: Option<DateTime<Utc>>,
    #[serde(rename = "pvmInstanceID", default)]
    pub pvm_instance_id: String,
    #[serde(rename = "volumeSnapshots", default)]
    pub volume_snapshots: serde_json::Value,
}

// ===================================================================
// PowerCloud trait
// ===================================================================

/// Read-only surface of the compute platform the engine consumes.
///
/// One method per upstream endpoint; every call takes the bearer token
/// acquired for the current operation.
#[allow(async_fn_in_trait)]
pub trait PowerCloud {
    /// Exchange the configured API key for a bearer token.
    async fn exchange_token(&self) -> Result<String, FetchError>;

    /// List every workspace visible to the account.
    async fn list_workspaces(&self, token: &str) -> Result<Vec<WorkspaceResource>, FetchError>;

    /// List the VM instances of one workspace. `Ok(None)` means the
    /// response carried no instance payload.
    async fn list_instances(
        &self,
        token: &str,
        target: &WorkspaceTarget,
    ) -> Result<Option<Vec<InstanceResource>>, FetchError>;

    /// Fetch the detail document for one VM.
    async fn instance_detail(
        &self,
        token: &str,
        target: &WorkspaceTarget,
        vm_id: &str,
    ) -> Result<InstanceResource, FetchError>;

    /// List the interfaces of one network. Addressed against the
    /// regional base endpoint; the CRN header scopes the call.
    async fn network_interfaces(
        &self,
        token: &str,
        crn: &str,
        network_id: &str,
    ) -> Result<Vec<InterfaceResource>, FetchError>;

    /// List the volumes attached to one VM.
    async fn instance_volumes(
        &self,
        token: &str,
        target: &WorkspaceTarget,
        vm_id: &str,
    ) -> Result<Vec<VolumeResource>, FetchError>;

    /// List the boot images of one workspace.
    async fn list_images(
        &self,
        token: &str,
        target: &WorkspaceTarget,
    ) -> Result<Vec<ImageResource>, FetchError>;

    /// Fetch the detail document for one boot image.
    async fn image_detail(
        &self,
        token: &str,
        target: &WorkspaceTarget,
        image_id: &str,
    ) -> Result<ImageResource, FetchError>;

    /// List the subnets of one workspace.
    async fn list_networks(
        &self,
        token: &str,
        target: &WorkspaceTarget,
    ) -> Result<Vec<NetworkResource>, FetchError>;

    /// List the snapshots of one VM.
    async fn instance_snapshots(
        &self,
        token: &str,
        target: &WorkspaceTarget,
        vm_id: &str,
    ) -> Result<Vec<SnapshotResource>, FetchError>;
}

// ===================================================================
// Production implementation
// ===================================================================

/// HTTP client for the compute platform.
#[derive(Debug, Clone)]
pub struct PowerCloudHttp {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PowerCloudHttp {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Issue a GET, check the status explicitly, and decode the body.
    /// `what` names the call in error messages and skip logs.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        crn: Option<&str>,
        timeout_secs: u64,
        what: &str,
    ) -> Result<T, FetchError> {
        let mut request = self
            .http
            .get(url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .timeout(Duration::from_secs(timeout_secs));
        if let Some(crn) = crn {
            request = request.header("CRN", crn);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Remote(format!("{what}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Remote(format!("{what}: HTTP {status}")));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Remote(format!("{what}: {e}")))?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Malformed(format!("{what}: {e}")))
    }

    fn instance_url(&self, target: &WorkspaceTarget, suffix: &str) -> String {
        format!(
            "{}/pcloud/v1/cloud-instances/{}{suffix}",
            target.endpoint_url, target.workspace_id
        )
    }
}

impl PowerCloud for PowerCloudHttp {
    async fn exchange_token(&self) -> Result<String, FetchError> {
        let form = [("grant_type", GRANT_TYPE), ("apikey", self.api_key.as_str())];
        let response = self
            .http
            .post(TOKEN_URL)
            .header(header::ACCEPT, "application/json")
            .form(&form)
            .timeout(Duration::from_secs(timeouts::TOKEN_SECS))
            .send()
            .await
            .map_err(|e| FetchError::Auth(format!("token exchange: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Auth(format!("token exchange: HTTP {status}")));
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Auth(format!("token exchange: {e}")))?;
        Ok(body.access_token)
    }

    async fn list_workspaces(&self, token: &str) -> Result<Vec<WorkspaceResource>, FetchError> {
        let url = format!("{}/v1/workspaces", self.base_url);
        let envelope: WorkspacesEnvelope = self
            .get_json(
                &url,
                token,
                None,
                timeouts::RESOURCE_SECS,
                "workspace listing",
            )
            .await?;
        Ok(envelope.workspaces)
    }

    async fn list_instances(
        &self,
        token: &str,
        target: &WorkspaceTarget,
    ) -> Result<Option<Vec<InstanceResource>>, FetchError> {
        let url = self.instance_url(target, "/pvm-instances");
        let envelope: InstancesEnvelope = self
            .get_json(
                &url,
                token,
                Some(&target.crn),
                timeouts::LISTING_SECS,
                "instance listing",
            )
            .await?;
        Ok(envelope.pvm_instances)
    }

    async fn instance_detail(
        &self,
        token: &str,
        target: &WorkspaceTarget,
        vm_id: &str,
    ) -> Result<InstanceResource, FetchError> {
        let url = self.instance_url(target, &format!("/pvm-instances/{vm_id}"));
        self.get_json(
            &url,
            token,
            Some(&target.crn),
            timeouts::RESOURCE_SECS,
            "instance detail",
        )
        .await
    }

    async fn network_interfaces(
        &self,
        token: &str,
        crn: &str,
        network_id: &str,
    ) -> Result<Vec<InterfaceResource>, FetchError> {
        let url = format!(
            "{}/v1/networks/{network_id}/network-interfaces",
            self.base_url
        );
        let envelope: InterfacesEnvelope = self
            .get_json(
                &url,
                token,
                Some(crn),
                timeouts::RESOURCE_SECS,
                "interface listing",
            )
            .await?;
        Ok(envelope.network_interfaces)
    }

    async fn instance_volumes(
        &self,
        token: &str,
        target: &WorkspaceTarget,
        vm_id: &str,
    ) -> Result<Vec<VolumeResource>, FetchError> {
        let url = self.instance_url(target, &format!("/pvm-instances/{vm_id}/volumes"));
        let envelope: VolumesEnvelope = self
            .get_json(
                &url,
                token,
                Some(&target.crn),
                timeouts::RESOURCE_SECS,
                "volume listing",
            )
            .await?;
        Ok(envelope.volumes)
    }

    async fn list_images(
        &self,
        token: &str,
        target: &WorkspaceTarget,
    ) -> Result<Vec<ImageResource>, FetchError> {
        let url = self.instance_url(target, "/images");
        let envelope: ImagesEnvelope = self
            .get_json(
                &url,
                token,
                Some(&target.crn),
                timeouts::RESOURCE_SECS,
                "image listing",
            )
            .await?;
        Ok(envelope.images)
    }

    async fn image_detail(
        &self,
        token: &str,
        target: &WorkspaceTarget,
        image_id: &str,
    ) -> Result<ImageResource, FetchError> {
        let url = self.instance_url(target, &format!("/images/{image_id}"));
        self.get_json(
            &url,
            token,
            Some(&target.crn),
            timeouts::RESOURCE_SECS,
            "image detail",
        )
        .await
    }

    async fn list_networks(
        &self,
        token: &str,
        target: &WorkspaceTarget,
    ) -> Result<Vec<NetworkResource>, FetchError> {
        let url = self.instance_url(target, "/networks");
        let envelope: NetworksEnvelope = self
            .get_json(
                &url,
                token,
                Some(&target.crn),
                timeouts::RESOURCE_SECS,
                "network listing",
            )
            .await?;
        Ok(envelope.networks)
    }

    async fn instance_snapshots(
        &self,
        token: &str,
        target: &WorkspaceTarget,
        vm_id: &str,
    ) -> Result<Vec<SnapshotResource>, FetchError> {
        let url = self.instance_url(target, &format!("/pvm-instances/{vm_id}/snapshots"));
        let envelope: SnapshotsEnvelope = self
            .get_json(
                &url,
                token,
                Some(&target.crn),
                timeouts::RESOURCE_SECS,
                "snapshot listing",
            )
            .await?;
        Ok(envelope.snapshots)
    }
}


// ===================================================================
// Canned upstream for engine tests
// ===================================================================
