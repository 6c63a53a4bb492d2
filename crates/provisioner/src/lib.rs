//! Creates a single virtual machine from a declarative description:
//! service-account credentials are minted, the boot image is resolved by
//! family and one create-instance call is submitted.

use compute_trait::{Compute, Operation};
use credentials::{CredentialProvider, KeyContainer, SigningAlgorithm};
use spec::{ConfigError, CreateInstanceRequest, ImageRef, InstanceConfig};
use std::{path::PathBuf, time::Duration};
use url::Url;

mod error;

pub use error::ProvisionError;

pub const AUTH_KEY_ENV: &str = "AUTH_KEY";
pub const SSH_PUBLIC_KEY_PATH_ENV: &str = "SSH_PUBLIC_KEY_PATH";

pub struct Settings {
    /// Key container JSON, usually taken from `AUTH_KEY`.
    pub auth_key: Option<String>,
    /// Usually taken from `SSH_PUBLIC_KEY_PATH`.
    pub ssh_public_key_path: Option<PathBuf>,
    pub config_path: PathBuf,
    pub token_endpoint: Url,
    pub algorithm: SigningAlgorithm,
    pub mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Submit,
    /// Build the request but do not submit it.
    DryRun,
    /// Submit and poll the operation until it is done.
    Wait { poll_interval: Duration },
}

#[derive(Debug)]
pub enum Outcome {
    /// The configuration document was `null`; nothing was attempted.
    NullConfig,
    DryRun(CreateInstanceRequest),
    Submitted(Operation),
    Completed(Operation),
}

pub fn mint_credentials(settings: &Settings) -> Result<CredentialProvider, ProvisionError> {
    let auth_key = settings
        .auth_key
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ProvisionError::MissingEnv(AUTH_KEY_ENV))?;

    let key = KeyContainer::from_json(auth_key)?;
    let provider = CredentialProvider::new(&key, settings.algorithm, settings.token_endpoint.clone())?;

    tracing::info!(service_account_id = %key.service_account_id, "minted service account credentials");
    Ok(provider)
}

/// Reads the public key file. Trailing whitespace is dropped so the key can
/// be substituted in the middle of a metadata value.
pub fn read_ssh_public_key(settings: &Settings) -> Result<String, ProvisionError> {
    let path = settings
        .ssh_public_key_path
        .as_ref()
        .ok_or(ProvisionError::MissingEnv(SSH_PUBLIC_KEY_PATH_ENV))?;

    let key = std::fs::read_to_string(path).map_err(|source| ProvisionError::SshKey {
        path: path.clone(),
        source,
    })?;
    Ok(key.trim_end().to_string())
}

/// Runs the whole sequence. `connect` turns the minted credentials into a
/// compute client and is only invoked once every local input has been read.
pub async fn run<C, F>(settings: &Settings, connect: F) -> Result<Outcome, ProvisionError>
where
    C: Compute,
    F: FnOnce(CredentialProvider) -> C,
{
    let credentials = mint_credentials(settings)?;
    let ssh_public_key = read_ssh_public_key(settings)?;

    let config = match InstanceConfig::load(&settings.config_path) {
        Ok(config) => config,
        Err(ConfigError::Null) => {
            tracing::info!(path = %settings.config_path.display(), "configuration is null");
            return Ok(Outcome::NullConfig);
        }
        Err(err) => return Err(err.into()),
    };
    tracing::info!(name = %config.resources.name, "loaded instance configuration");

    let provisioner = Provisioner::new(connect(credentials));
    provisioner
        .provision(&config, &ssh_public_key, settings.mode)
        .await
}

pub struct Provisioner<C> {
    compute: C,
}

impl<C: Compute> Provisioner<C> {
    pub fn new(compute: C) -> Self {
        Self { compute }
    }

    pub async fn resolve_image_id(&self, image: &ImageRef) -> Result<String, ProvisionError> {
        let found = self
            .compute
            .latest_image_by_family(&image.folder_family_id, &image.family)
            .await?;

        match found.and_then(|image| image.id).filter(|id| !id.is_empty()) {
            Some(id) => {
                tracing::info!(family = %image.family, image_id = %id, "resolved image");
                Ok(id)
            }
            None => Err(ProvisionError::ImageNotFound {
                folder_id: image.folder_family_id.clone(),
                family: image.family.clone(),
            }),
        }
    }

    pub async fn provision(
        &self,
        config: &InstanceConfig,
        ssh_public_key: &str,
        mode: Mode,
    ) -> Result<Outcome, ProvisionError> {
        let image_id = self.resolve_image_id(&config.resources.image).await?;
        let request = CreateInstanceRequest::from_config(config, &image_id, ssh_public_key)?;

        if mode == Mode::DryRun {
            return Ok(Outcome::DryRun(request));
        }

        let operation = self.compute.create_instance(&request).await?;
        tracing::info!(operation_id = %operation.id, "create instance submitted");

        match mode {
            Mode::Wait { poll_interval } => {
                let operation = self.wait(operation, poll_interval).await?;
                Ok(Outcome::Completed(operation))
            }
            _ => Ok(Outcome::Submitted(operation)),
        }
    }

    /// Polls `operation` until the service reports it done.
    pub async fn wait(
        &self,
        mut operation: Operation,
        poll_interval: Duration,
    ) -> Result<Operation, ProvisionError> {
        while !operation.done {
            tokio::time::sleep(poll_interval).await;
            operation = self.compute.get_operation(&operation.id).await?;
            tracing::debug!(operation_id = %operation.id, done = operation.done, "polled operation");
        }

        if let Some(status) = &operation.error {
            tracing::warn!(operation_id = %operation.id, code = status.code, "operation failed");
            return Err(ProvisionError::OperationFailed {
                id: operation.id.clone(),
                code: status.code,
                message: status.message.clone(),
            });
        }

        Ok(operation)
    }
}
