//! Service-account credentials: the authorized key container, signed JWT
//! assertions minted from it, and their exchange for short-lived IAM tokens.

use thiserror::Error;

mod key;
mod provider;

pub use key::KeyContainer;
pub use provider::{CredentialProvider, DEFAULT_TOKEN_ENDPOINT, IamToken, SigningAlgorithm};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("malformed key container: {0}")]
    MalformedKeyContainer(#[source] serde_json::Error),

    #[error("key container is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(#[source] jsonwebtoken::errors::Error),

    #[error("unsupported signing algorithm `{0}`, expected rs256 or ps256")]
    UnsupportedAlgorithm(String),

    #[error("invalid token endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("failed to sign assertion: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("token exchange failed with status {status}: {body}")]
    TokenExchange { status: u16, body: String },

    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
