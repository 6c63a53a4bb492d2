use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, path::Path};

mod error;
pub mod placeholder;
mod request;

pub use error::ConfigError;
pub use request::{
    AttachedDiskSpec, CreateInstanceRequest, CreateInstanceRequestBuilder, DiskSpec,
    NetworkInterfaceSpec, OneToOneNatSpec, PrimaryAddressSpec,
};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

// Objects whose keys are user data rather than field names.
const USER_MAPS: [&str; 2] = ["metadata", "labels"];

/// Declarative description of the single virtual machine to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub folder_id: String,
    pub username: String,
    pub resources: Resources,
    pub metadata: HashMap<String, Option<String>>,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub image: ImageRef,
    pub name: String,
    pub resources_spec: ResourcesSpec,
    pub boot_disk_spec: BootDisk,
    pub zone_id: String,
    pub platform_id: String,
    pub subnet_id: String,
}

/// Image lineage the boot disk is created from. The newest image of
/// `family` inside `folder_family_id` is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub family: String,
    pub folder_family_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesSpec {
    pub cores: i64,
    // bytes
    pub memory: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootDisk {
    pub auto_delete: bool,
    pub disk_spec: Disk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disk {
    pub type_id: String,
    // bytes
    pub size: i64,
}

impl InstanceConfig {
    /// Reads and decodes the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "reading instance configuration");

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Decodes a configuration document. Field names are matched ignoring
    /// ASCII case, the keys of `metadata` and `labels` are kept verbatim.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(contents)?;
        if value.is_null() {
            return Err(ConfigError::Null);
        }

        let config: InstanceConfig = serde_json::from_value(normalize_keys(value))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let resources = &self.resources;

        non_empty("folder_id", &self.folder_id)?;
        non_empty("username", &self.username)?;
        non_empty("resources.name", &resources.name)?;
        non_empty("resources.zone_id", &resources.zone_id)?;
        non_empty("resources.platform_id", &resources.platform_id)?;
        non_empty("resources.subnet_id", &resources.subnet_id)?;
        non_empty("resources.image.family", &resources.image.family)?;
        non_empty(
            "resources.image.folder_family_id",
            &resources.image.folder_family_id,
        )?;
        non_empty(
            "resources.boot_disk_spec.disk_spec.type_id",
            &resources.boot_disk_spec.disk_spec.type_id,
        )?;

        positive("resources.resources_spec.cores", resources.resources_spec.cores)?;
        positive(
            "resources.resources_spec.memory",
            resources.resources_spec.memory,
        )?;
        positive(
            "resources.boot_disk_spec.disk_spec.size",
            resources.boot_disk_spec.disk_spec.size,
        )?;

        Ok(())
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn positive(field: &'static str, value: i64) -> Result<(), ConfigError> {
    if value <= 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("must be greater than zero, got {}", value),
        });
    }
    Ok(())
}

fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let key = key.to_ascii_lowercase();
                    if USER_MAPS.contains(&key.as_str()) {
                        (key, value)
                    } else {
                        (key, normalize_keys(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}
