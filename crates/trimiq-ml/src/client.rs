//! HTTP client for the CLIP embedding service.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MlError, MlResult};

/// Default request timeout for embedding calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for an OpenCLIP-serving embedding endpoint.
///
/// Expected API surface:
/// - `POST {base}/embed/text` with `{"text": ...}` returning
///   `{"embedding": [f32, ...]}`
/// - `POST {base}/embed/image` with a multipart `file` field returning
///   `{"embedding": [f32, ...]}`
#[derive(Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    /// Create a client for the given service base URL.
    pub fn new(base_url: impl Into<String>) -> MlResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Embed a text prompt or transcript.
    pub async fn embed_text(&self, text: &str) -> MlResult<Vec<f32>> {
        let url = format!("{}/embed/text", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&TextRequest { text })
            .send()
            .await?;
        let embedding = parse_embedding(response).await?;
        debug!(dims = embedding.len(), "Embedded text");
        Ok(embedding)
    }

    /// Embed a clip keyframe image.
    pub async fn embed_image(&self, image_path: impl AsRef<Path>) -> MlResult<Vec<f32>> {
        let image_path = image_path.as_ref();
        let bytes = tokio::fs::read(image_path).await?;
        let file_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "keyframe.jpg".to_string());

        let form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(bytes)
                .file_name(file_name)
                .mime_str("image/jpeg")?,
        );

        let url = format!("{}/embed/image", self.base_url);
        let response = self.http.post(&url).multipart(form).send().await?;
        let embedding = parse_embedding(response).await?;
        debug!(image = %image_path.display(), dims = embedding.len(), "Embedded keyframe");
        Ok(embedding)
    }

    /// Embed a batch of keyframes, one per clip, preserving order.
    pub async fn embed_images(&self, image_paths: &[impl AsRef<Path>]) -> MlResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(image_paths.len());
        for path in image_paths {
            embeddings.push(self.embed_image(path).await?);
        }
        Ok(embeddings)
    }
}

async fn parse_embedding(response: reqwest::Response) -> MlResult<Vec<f32>> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(MlError::Service {
            status: status.as_u16(),
            message,
        });
    }

    let parsed: EmbeddingResponse = response
        .json()
        .await
        .map_err(|e| MlError::BadResponse(e.to_string()))?;

    if parsed.embedding.is_empty() {
        return Err(MlError::BadResponse("empty embedding vector".to_string()));
    }
    Ok(parsed.embedding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_embed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed/text"))
            .and(body_json(serde_json::json!({"text": "a dog running"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [0.1, 0.2, 0.3]
            })))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(server.uri()).unwrap();
        let embedding = client.embed_text("a dog running").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_embed_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed/image"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [1.0, 0.0]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("keyframe.jpg");
        std::fs::write(&image, b"not-a-real-jpeg").unwrap();

        let client = EmbeddingClient::new(server.uri()).unwrap();
        let embedding = client.embed_image(&image).await.unwrap();
        assert_eq!(embedding, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_service_error_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed/text"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(server.uri()).unwrap();
        let err = client.embed_text("anything").await.unwrap_err();
        match err {
            MlError::Service { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "model loading");
            }
            other => panic!("expected Service error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_embedding_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed/text"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": []
            })))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(server.uri()).unwrap();
        let err = client.embed_text("anything").await.unwrap_err();
        assert!(matches!(err, MlError::BadResponse(_)));
    }
}
