use serde::{Deserialize, Serialize};
use serde_json::Value;
use spec::CreateInstanceRequest;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[async_trait::async_trait]
pub trait Compute: Send + Sync {
    /// Newest image of `family` in `folder_id`, or `None` when the family
    /// has no images.
    async fn latest_image_by_family(
        &self,
        folder_id: &str,
        family: &str,
    ) -> Result<Option<Image>, ComputeError>;

    async fn create_instance(
        &self,
        request: &CreateInstanceRequest,
    ) -> Result<Operation, ComputeError>;

    async fn get_operation(&self, operation_id: &str) -> Result<Operation, ComputeError>;
}

#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("api returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Auth(#[source] BoxError),

    #[error("request failed: {0}")]
    Transport(#[source] BoxError),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Long-running operation handle returned by mutating calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub error: Option<Status>,
    #[serde(default)]
    pub response: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl Operation {
    /// Id of the resource the operation acts on, taken from the finished
    /// response or, before that, from the operation metadata.
    pub fn resource_id(&self) -> Option<&str> {
        self.response
            .as_ref()
            .and_then(|r| r.get("id"))
            .or_else(|| self.metadata.as_ref().and_then(|m| m.get("instanceId")))
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_pending_operation() {
        let op: Operation = serde_json::from_value(json!({
            "id": "fhmop",
            "description": "Create instance",
            "createdAt": "2024-03-01T10:00:00Z",
            "metadata": {
                "@type": "type.googleapis.com/yandex.cloud.compute.v1.CreateInstanceMetadata",
                "instanceId": "fhminstance"
            }
        }))
        .unwrap();

        assert!(!op.done);
        assert!(op.error.is_none());
        assert_eq!(op.resource_id(), Some("fhminstance"));
    }

    #[test]
    fn test_decode_failed_operation() {
        let op: Operation = serde_json::from_value(json!({
            "id": "fhmop",
            "done": true,
            "error": { "code": 8, "message": "quota exceeded", "details": [] }
        }))
        .unwrap();

        assert!(op.done);
        assert_eq!(op.error.unwrap().message, "quota exceeded");
    }

    #[test]
    fn test_response_id_takes_precedence() {
        let op = Operation {
            id: "op".to_string(),
            done: true,
            metadata: Some(json!({ "instanceId": "from-metadata" })),
            response: Some(json!({ "id": "from-response" })),
            ..Default::default()
        };

        assert_eq!(op.resource_id(), Some("from-response"));
    }

    #[test]
    fn test_image_without_id() {
        let image: Image = serde_json::from_value(json!({ "family": "ubuntu" })).unwrap();
        assert!(image.id.is_none());
    }
}
