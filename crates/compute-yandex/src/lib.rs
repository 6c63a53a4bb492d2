use compute_trait::{Compute, ComputeError, Image, Operation, Status};
use credentials::CredentialProvider;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use spec::CreateInstanceRequest;
use url::Url;

pub const DEFAULT_COMPUTE_ENDPOINT: &str = "https://compute.api.cloud.yandex.net/compute/v1/";
pub const DEFAULT_OPERATION_ENDPOINT: &str = "https://operation.api.cloud.yandex.net/operations/";

/// Base urls of the compute and operation services.
#[derive(Debug, Clone)]
pub struct Endpoints {
    compute: Url,
    operation: Url,
}

impl Endpoints {
    pub fn new(compute: Url, operation: Url) -> Self {
        Self {
            compute: with_trailing_slash(compute),
            operation: with_trailing_slash(operation),
        }
    }

    pub fn compute(&self) -> &Url {
        &self.compute
    }

    pub fn operation(&self) -> &Url {
        &self.operation
    }
}

// `Url::join` replaces the last segment unless the base ends with a slash.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// REST client for the compute API. Every call is authorized with a freshly
/// exchanged IAM token.
pub struct YandexCompute {
    client: reqwest::Client,
    credentials: CredentialProvider,
    endpoints: Endpoints,
}

impl YandexCompute {
    pub fn new(credentials: CredentialProvider, endpoints: Endpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            endpoints,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ComputeError> {
        let token = self
            .credentials
            .iam_token(&self.client)
            .await
            .map_err(|e| ComputeError::Auth(Box::new(e)))?;

        request
            .bearer_auth(token.iam_token)
            .send()
            .await
            .map_err(transport)
    }
}

fn join(base: &Url, path: &str) -> Result<Url, ComputeError> {
    // The leading "./" keeps segments such as "images:latestByFamily" from
    // being read as a scheme.
    base.join(&format!("./{}", path))
        .map_err(|e| ComputeError::Transport(Box::new(e)))
}

fn transport(err: reqwest::Error) -> ComputeError {
    ComputeError::Transport(Box::new(err))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ComputeError> {
    let status = response.status();
    let body = response.text().await.map_err(transport)?;

    if !status.is_success() {
        let message = serde_json::from_str::<Status>(&body)
            .ok()
            .map(|s| s.message)
            .filter(|m| !m.is_empty())
            .unwrap_or(body);
        return Err(ComputeError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

#[async_trait::async_trait]
impl Compute for YandexCompute {
    async fn latest_image_by_family(
        &self,
        folder_id: &str,
        family: &str,
    ) -> Result<Option<Image>, ComputeError> {
        let mut url = join(&self.endpoints.compute, "images:latestByFamily")?;
        url.query_pairs_mut()
            .append_pair("folderId", folder_id)
            .append_pair("family", family);

        tracing::debug!(%url, "looking up latest image");

        let response = self.send(self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Ok(Some(decode(response).await?))
    }

    async fn create_instance(
        &self,
        request: &CreateInstanceRequest,
    ) -> Result<Operation, ComputeError> {
        let url = join(&self.endpoints.compute, "instances")?;

        tracing::debug!(%url, name = %request.name, "submitting create instance request");

        let response = self.send(self.client.post(url).json(request)).await?;
        decode(response).await
    }

    async fn get_operation(&self, operation_id: &str) -> Result<Operation, ComputeError> {
        let url = join(&self.endpoints.operation, operation_id)?;

        let response = self.send(self.client.get(url)).await?;
        decode(response).await
    }
}
