use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{ConfigError, InstanceConfig, ResourcesSpec, placeholder};

pub const IPV4: &str = "IPV4";

/// Body of the create-instance call, in the wire format of the compute API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    pub folder_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    pub zone_id: String,
    pub platform_id: String,
    pub resources_spec: ResourcesSpec,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Option<String>>,
    pub boot_disk_spec: AttachedDiskSpec,
    pub network_interface_specs: Vec<NetworkInterfaceSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDiskSpec {
    pub auto_delete: bool,
    pub disk_spec: DiskSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpec {
    pub type_id: String,
    pub size: i64,
    pub image_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceSpec {
    pub subnet_id: String,
    pub primary_v4_address_spec: PrimaryAddressSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryAddressSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_to_one_nat_spec: Option<OneToOneNatSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneToOneNatSpec {
    pub ip_version: String,
}

impl NetworkInterfaceSpec {
    /// Interface on `subnet_id` with an automatically assigned public IPv4
    /// address.
    pub fn public_ipv4(subnet_id: impl Into<String>) -> Self {
        NetworkInterfaceSpec {
            subnet_id: subnet_id.into(),
            primary_v4_address_spec: PrimaryAddressSpec {
                one_to_one_nat_spec: Some(OneToOneNatSpec {
                    ip_version: IPV4.to_string(),
                }),
            },
        }
    }
}

impl CreateInstanceRequest {
    pub fn builder() -> CreateInstanceRequestBuilder {
        CreateInstanceRequestBuilder::default()
    }

    /// Maps the declarative configuration onto a request for the resolved
    /// image, substituting the metadata placeholders.
    pub fn from_config(
        config: &InstanceConfig,
        image_id: &str,
        ssh_public_key: &str,
    ) -> Result<Self, ConfigError> {
        let resources = &config.resources;
        let disk = &resources.boot_disk_spec;

        let metadata =
            placeholder::substitute_metadata(&config.metadata, &config.username, ssh_public_key);

        Self::builder()
            .folder_id(&config.folder_id)
            .name(&resources.name)
            .zone_id(&resources.zone_id)
            .platform_id(&resources.platform_id)
            .resources(resources.resources_spec)
            .boot_disk(disk.auto_delete, &disk.disk_spec.type_id, disk.disk_spec.size)
            .image_id(image_id)
            .network_interface(NetworkInterfaceSpec::public_ipv4(&resources.subnet_id))
            .metadata(metadata)
            .labels(config.labels.clone())
            .build()
    }
}

#[derive(Default)]
pub struct CreateInstanceRequestBuilder {
    folder_id: Option<String>,
    name: Option<String>,
    zone_id: Option<String>,
    platform_id: Option<String>,
    resources: Option<ResourcesSpec>,
    boot_disk: Option<(bool, String, i64)>,
    image_id: Option<String>,
    network_interfaces: Vec<NetworkInterfaceSpec>,
    metadata: HashMap<String, Option<String>>,
    labels: HashMap<String, String>,
}

impl CreateInstanceRequestBuilder {
    pub fn folder_id<S: Into<String>>(mut self, folder_id: S) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn zone_id<S: Into<String>>(mut self, zone_id: S) -> Self {
        self.zone_id = Some(zone_id.into());
        self
    }

    pub fn platform_id<S: Into<String>>(mut self, platform_id: S) -> Self {
        self.platform_id = Some(platform_id.into());
        self
    }

    pub fn resources(mut self, resources: ResourcesSpec) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn boot_disk<S: Into<String>>(mut self, auto_delete: bool, type_id: S, size: i64) -> Self {
        self.boot_disk = Some((auto_delete, type_id.into(), size));
        self
    }

    pub fn image_id<S: Into<String>>(mut self, image_id: S) -> Self {
        self.image_id = Some(image_id.into());
        self
    }

    pub fn network_interface(mut self, spec: NetworkInterfaceSpec) -> Self {
        self.network_interfaces.push(spec);
        self
    }

    pub fn metadata<I, K>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        self.metadata
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    pub fn label<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.labels
            .extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn build(self) -> Result<CreateInstanceRequest, ConfigError> {
        let (auto_delete, type_id, size) = self.boot_disk.ok_or_else(|| missing("boot_disk_spec"))?;

        if self.network_interfaces.is_empty() {
            return Err(missing("network_interface_specs"));
        }

        Ok(CreateInstanceRequest {
            folder_id: self.folder_id.ok_or_else(|| missing("folder_id"))?,
            name: self.name.ok_or_else(|| missing("name"))?,
            labels: self.labels,
            zone_id: self.zone_id.ok_or_else(|| missing("zone_id"))?,
            platform_id: self.platform_id.ok_or_else(|| missing("platform_id"))?,
            resources_spec: self.resources.ok_or_else(|| missing("resources_spec"))?,
            metadata: self.metadata,
            boot_disk_spec: AttachedDiskSpec {
                auto_delete,
                disk_spec: DiskSpec {
                    type_id,
                    size,
                    image_id: self.image_id.ok_or_else(|| missing("image_id"))?,
                },
            },
            network_interface_specs: self.network_interfaces,
        })
    }
}

fn missing(field: &'static str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: "not set".to_string(),
    }
}
