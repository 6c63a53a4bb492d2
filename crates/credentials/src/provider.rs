use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};
use url::Url;

use crate::{CredentialError, KeyContainer};

pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://iam.api.cloud.yandex.net/iam/v1/tokens";

// Upper bound accepted by the IAM service for an assertion's lifetime.
const ASSERTION_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SigningAlgorithm {
    #[default]
    Rs256,
    Ps256,
}

impl SigningAlgorithm {
    fn jwt(self) -> Algorithm {
        match self {
            SigningAlgorithm::Rs256 => Algorithm::RS256,
            SigningAlgorithm::Ps256 => Algorithm::PS256,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rs256" => Ok(SigningAlgorithm::Rs256),
            "ps256" => Ok(SigningAlgorithm::Ps256),
            _ => Err(CredentialError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    aud: String,
    iat: u64,
    exp: u64,
}

/// Short-lived bearer token returned by the IAM service.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamToken {
    pub iam_token: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

impl fmt::Debug for IamToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamToken")
            .field("iam_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Mints JWT assertions signed with a service account's private key and
/// trades them for IAM tokens.
#[derive(Clone)]
pub struct CredentialProvider {
    key_id: String,
    service_account_id: String,
    algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    token_endpoint: Url,
}

impl CredentialProvider {
    pub fn new(
        key: &KeyContainer,
        algorithm: SigningAlgorithm,
        token_endpoint: Url,
    ) -> Result<Self, CredentialError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(CredentialError::InvalidPrivateKey)?;

        tracing::debug!(
            key_id = %key.id,
            service_account_id = %key.service_account_id,
            ?algorithm,
            "loaded service account key"
        );

        Ok(Self {
            key_id: key.id.clone(),
            service_account_id: key.service_account_id.clone(),
            algorithm,
            encoding_key,
            token_endpoint,
        })
    }

    /// Parses a key container and binds it to the default token endpoint
    /// with RS256 signing.
    pub fn from_json(contents: &str) -> Result<Self, CredentialError> {
        let key = KeyContainer::from_json(contents)?;
        let endpoint = Url::parse(DEFAULT_TOKEN_ENDPOINT)?;
        Self::new(&key, SigningAlgorithm::default(), endpoint)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn service_account_id(&self) -> &str {
        &self.service_account_id
    }

    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }

    pub fn mint_jwt(&self) -> Result<String, CredentialError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.mint_jwt_at(now)
    }

    pub fn mint_jwt_at(&self, issued_at: u64) -> Result<String, CredentialError> {
        let claims = Claims {
            iss: self.service_account_id.clone(),
            aud: self.token_endpoint.to_string(),
            iat: issued_at,
            exp: issued_at + ASSERTION_TTL_SECS,
        };

        let mut header = Header::new(self.algorithm.jwt());
        header.kid = Some(self.key_id.clone());

        encode(&header, &claims, &self.encoding_key).map_err(CredentialError::Signing)
    }

    /// Exchanges a freshly minted assertion for an IAM token.
    pub async fn iam_token(&self, client: &reqwest::Client) -> Result<IamToken, CredentialError> {
        let jwt = self.mint_jwt()?;

        tracing::debug!(endpoint = %self.token_endpoint, "exchanging assertion for iam token");

        let response = client
            .post(self.token_endpoint.clone())
            .json(&serde_json::json!({ "jwt": jwt }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

impl fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("key_id", &self.key_id)
            .field("service_account_id", &self.service_account_id)
            .field("algorithm", &self.algorithm)
            .field("token_endpoint", &self.token_endpoint.as_str())
            .finish_non_exhaustive()
    }
}
