use serde::Deserialize;
use std::fmt;

use crate::CredentialError;

/// Authorized key of a service account, as issued by the IAM service.
#[derive(Clone)]
pub struct KeyContainer {
    pub id: String,
    pub service_account_id: String,
    pub created_at: Option<String>,
    pub key_algorithm: Option<String>,
    pub public_key: Option<String>,
    pub private_key: String,
}

#[derive(Deserialize)]
struct RawKeyContainer {
    id: Option<String>,
    service_account_id: Option<String>,
    created_at: Option<String>,
    key_algorithm: Option<String>,
    public_key: Option<String>,
    private_key: Option<String>,
}

impl KeyContainer {
    pub fn from_json(contents: &str) -> Result<Self, CredentialError> {
        let raw: RawKeyContainer =
            serde_json::from_str(contents).map_err(CredentialError::MalformedKeyContainer)?;

        Ok(KeyContainer {
            id: required("id", raw.id)?,
            service_account_id: required("service_account_id", raw.service_account_id)?,
            created_at: raw.created_at,
            key_algorithm: raw.key_algorithm,
            public_key: raw.public_key,
            private_key: required("private_key", raw.private_key)?,
        })
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, CredentialError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CredentialError::MissingField(field)),
    }
}

// Keeps the private key out of logs and error reports.
impl fmt::Debug for KeyContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyContainer")
            .field("id", &self.id)
            .field("service_account_id", &self.service_account_id)
            .field("created_at", &self.created_at)
            .field("key_algorithm", &self.key_algorithm)
            .field("private_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}
