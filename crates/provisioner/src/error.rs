use compute_trait::ComputeError;
use credentials::CredentialError;
use spec::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("failed to read ssh public key {path}: {source}")]
    SshKey {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("no image found in family {family} of folder {folder_id}")]
    ImageNotFound { folder_id: String, family: String },

    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error("operation {id} failed with code {code}: {message}")]
    OperationFailed {
        id: String,
        code: i32,
        message: String,
    },
}

impl ProvisionError {
    /// True for problems with the local environment or input files, as
    /// opposed to credential or remote failures.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ProvisionError::MissingEnv(_) | ProvisionError::SshKey { .. } | ProvisionError::Config(_)
        )
    }
}
