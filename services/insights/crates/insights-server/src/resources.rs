//! Workspace-scoped resource reads: boot images, subnets, snapshots.
//!
//! Image and network listings only make sense against one workspace, so
//! they require a configured CRN and error with a configuration hint
//! otherwise. Snapshot listings resolve the VM through the routing
//! cache and therefore work account-wide too.

use powervs_common::{
    ImageDetails, ImageInventory, ImageSummary, IpAddressMetrics, NetworkInventory, NetworkSummary,
    SnapshotInfo, SnapshotInventory,
};

use crate::api::{ImageResource, NetworkResource, PowerCloud, SnapshotResource, WorkspaceTarget};
use crate::error::FetchError;
use crate::state::{AppState, Scope};

fn image_summary(image: ImageResource) -> ImageSummary {
    ImageSummary {
        image_id: image.image_id,
        name: image.name,
        operating_system: image.specifications.operating_system,
        state: image.state,
    }
}

fn image_details(image: ImageResource) -> ImageDetails {
    ImageDetails {
        image_id: image.image_id,
        name: image.name,
        description: image.description,
        state: image.state,
        size: image.size,
        storage_type: image.storage_type,
        storage_pool: image.storage_pool,
        operating_system: image.specifications.operating_system,
        architecture: image.specifications.architecture,
        image_type: image.specifications.image_type,
        creation_date: image.creation_date,
        last_update_date: image.last_update_date,
        servers: image.servers,
        volumes: image.volumes,
    }
}

fn network_summary(network: NetworkResource) -> NetworkSummary {
    NetworkSummary {
        network_id: network.network_id,
        name: network.name,
        net_type: network.net_type,
        cidr: network.cidr,
        gateway: network.gateway,
        dns_servers: network.dns_servers,
        vlan_id: network.vlan_id,
        ip_address_metrics: IpAddressMetrics {
            total: network.ip_address_metrics.total,
            available: network.ip_address_metrics.available,
            used: network.ip_address_metrics.used,
            utilization: network.ip_address_metrics.utilization,
        },
    }
}

fn snapshot_info(snapshot: SnapshotResource) -> SnapshotInfo {
    SnapshotInfo {
        snapshot_id: snapshot.snapshot_id,
        name: snapshot.name,
        description: snapshot.description,
        status: snapshot.status,
        creation_date: snapshot.creation_date,
        last_update_date: snapshot.last_update_date,
        pvm_instance_id: snapshot.pvm_instance_id,
        volume_snapshots: snapshot.volume_snapshots,
    }
}

impl<A: PowerCloud> AppState<A> {
    /// The statically configured workspace, or the hint that one must
    /// be configured for this operation.
    fn static_target(&self, action: &str) -> Result<&WorkspaceTarget, FetchError> {
        match &self.scope {
            Scope::Workspace(target) => Ok(target),
            Scope::Account => Err(FetchError::NotConfigured(action.to_string())),
        }
    }

    /// Boot images of the configured workspace.
    pub async fn images(&self) -> Result<ImageInventory, FetchError> {
        let target = self.static_target("list images in a specific workspace")?;
        let token = self.api.exchange_token().await?;

        let images: Vec<ImageSummary> = self
            .api
            .list_images(&token, target)
            .await?
            .into_iter()
            .map(image_summary)
            .collect();
        Ok(ImageInventory {
            total_images: images.len(),
            images,
        })
    }

    /// Full detail document for one boot image.
    pub async fn image_details(&self, image_id: &str) -> Result<ImageDetails, FetchError> {
        let target = self.static_target("inspect images in a specific workspace")?;
        let token = self.api.exchange_token().await?;

        let image = self.api.image_detail(&token, target, image_id).await?;
        Ok(image_details(image))
    }

    /// Subnets of the configured workspace.
    pub async fn networks(&self) -> Result<NetworkInventory, FetchError> {
        let target = self.static_target("list networks in a specific workspace")?;
        let token = self.api.exchange_token().await?;

        let networks: Vec<NetworkSummary> = self
            .api
            .list_networks(&token, target)
            .await?
            .into_iter()
            .map(network_summary)
            .collect();
        Ok(NetworkInventory {
            total_networks: networks.len(),
            networks,
        })
    }

    /// Snapshots of one VM, resolved through the routing cache.
    pub async fn vm_snapshots(&self, vm_id: &str) -> Result<SnapshotInventory, FetchError> {
        let token = self.api.exchange_token().await?;
        let target = self.resolve(&token, vm_id).await.into_target()?;

        let snapshots: Vec<SnapshotInfo> = self
            .api
            .instance_snapshots(&token, &target, vm_id)
            .await?
            .into_iter()
            .map(snapshot_info)
            .collect();
        Ok(SnapshotInventory {
            vm_id: vm_id.to_string(),
            total_snapshots: snapshots.len(),
            snapshots,
        })
    }
}
