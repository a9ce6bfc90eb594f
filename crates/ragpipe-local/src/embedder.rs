use ragpipe_core::{Embedder, Error, Result};
use serde::{Deserialize, Serialize};

use crate::{env_nonempty, env_or};

/// Largest input batch sent per request; longer inputs are split and the
/// responses concatenated in input order.
const MAX_BATCH: usize = 64;

fn embed_base_url_from_env() -> String {
    env_nonempty("RAGPIPE_EMBED_BASE_URL").unwrap_or_else(|| "https://api.mistral.ai".to_string())
}

fn embed_api_key_from_env() -> Option<String> {
    env_or("RAGPIPE_EMBED_API_KEY", "MISTRAL_API_KEY")
}

fn embed_model_from_env() -> String {
    env_nonempty("RAGPIPE_EMBED_MODEL").unwrap_or_else(|| "mistral-embed".to_string())
}

/// OpenAI-compatible `/v1/embeddings` client (Mistral by default).
#[derive(Debug, Clone)]
pub struct TextEmbeddingsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl TextEmbeddingsClient {
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = embed_api_key_from_env().ok_or_else(|| {
            Error::NotConfigured("missing RAGPIPE_EMBED_API_KEY (or MISTRAL_API_KEY)".to_string())
        })?;
        Ok(Self {
            client,
            base_url: embed_base_url_from_env(),
            api_key,
            model: embed_model_from_env(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_embeddings(&self) -> String {
        format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let req = EmbeddingsRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let resp = self
            .client
            .post(self.endpoint_embeddings())
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Embedding(format!("embeddings HTTP {status}")));
        }

        let parsed: EmbeddingsResponse =
            resp.json().await.map_err(|e| Error::Embedding(e.to_string()))?;
        if parsed.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        // Providers are allowed to reorder; `index` is authoritative.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait::async_trait]
impl Embedder for TextEmbeddingsClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            out.extend(self.embed_batch(batch).await?);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_env::EnvGuard;
    use axum::{routing::post, Json, Router};
    use std::net::SocketAddr;

    #[test]
    fn empty_api_key_is_treated_as_missing() {
        let _g1 = EnvGuard::set("RAGPIPE_EMBED_API_KEY", "  ");
        let _g2 = EnvGuard::unset("MISTRAL_API_KEY");
        assert!(embed_api_key_from_env().is_none());
    }

    #[test]
    fn parses_minimal_embeddings_shape() {
        let js = r#"
        {
          "data": [
            {"index": 0, "embedding": [0.1, 0.2]},
            {"index": 1, "embedding": [0.3, 0.4]}
          ],
          "model": "mistral-embed",
          "usage": {"prompt_tokens": 4, "total_tokens": 4}
        }
        "#;
        let parsed: EmbeddingsResponse = serde_json::from_str(js).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[1].embedding, vec![0.3, 0.4]);
    }

    #[tokio::test]
    async fn embed_reorders_by_index_and_concatenates_batches() {
        // Fixture returns rows in reverse order; the client must restore
        // input order via `index`.
        let app = Router::new().route(
            "/v1/embeddings",
            post(|Json(body): Json<serde_json::Value>| async move {
                let inputs = body["input"].as_array().cloned().unwrap_or_default();
                let mut data: Vec<serde_json::Value> = inputs
                    .iter()
                    .enumerate()
                    .map(|(i, text)| {
                        let len = text.as_str().unwrap_or("").len() as f32;
                        serde_json::json!({"index": i, "embedding": [len, 1.0]})
                    })
                    .collect();
                data.reverse();
                Json(serde_json::json!({"data": data, "model": "mistral-embed"}))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = TextEmbeddingsClient {
            client: reqwest::Client::new(),
            base_url: format!("http://{addr}"),
            api_key: "test".to_string(),
            model: "mistral-embed".to_string(),
        };

        let texts: Vec<String> = vec!["a".into(), "bb".into(), "ccc".into()];
        let vectors = client.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0][0], 1.0);
        assert_eq!(vectors[1][0], 2.0);
        assert_eq!(vectors[2][0], 3.0);
    }

    #[tokio::test]
    async fn http_errors_surface_as_embedding_failures() {
        let app = Router::new().route(
            "/v1/embeddings",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = TextEmbeddingsClient {
            client: reqwest::Client::new(),
            base_url: format!("http://{addr}"),
            api_key: "test".to_string(),
            model: "mistral-embed".to_string(),
        };

        let err = client.embed(&["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }
}
