//! HTTP client for the discourse engine.
//!
//! The engine is an opaque JSON service: it embeds text, decomposes
//! content into argument graphs, and runs asynchronous batch jobs. The
//! client is deliberately thin -- it shapes requests, enforces per-call
//! timeouts, and surfaces non-2xx bodies for diagnostics. A missing
//! analysis comes back as empty arrays, never as an error.

use std::time::Duration;

use uuid::Uuid;

use agora_types::{
    AnalysisGraph, AnalyzeRequest, BatchPollResponse, BatchSubmitRequest, BatchSubmitResponse,
    EmbedRequest, EmbedResponse, TargetKind,
};

use crate::error::DiscourseError;

/// Timeout for embedding calls.
const EMBED_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for batch polls.
const POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for synchronous analyze calls.
const ANALYZE_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for health checks and batch submissions.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the discourse engine HTTP API.
#[derive(Clone)]
pub struct DiscourseClient {
    client: reqwest::Client,
    base_url: String,
}

impl DiscourseClient {
    /// Create a client for the engine at `base_url` (no trailing slash).
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// `GET /health`: whether the engine reports itself healthy.
    ///
    /// # Errors
    ///
    /// Returns [`DiscourseError`] if the engine is unreachable or answers
    /// with a non-success status.
    pub async fn health(&self) -> Result<bool, DiscourseError> {
        let url = format!("{}/health", self.base_url);
        let json = self.get_json(&url, DEFAULT_TIMEOUT).await?;
        Ok(json.get("status").and_then(serde_json::Value::as_str) == Some("ok"))
    }

    /// `POST /embed`: embed a batch of texts into 1536-dimension vectors.
    ///
    /// The result preserves input order.
    ///
    /// # Errors
    ///
    /// Returns [`DiscourseError::EmbeddingMismatch`] if the engine returns
    /// a different number of vectors than texts submitted.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DiscourseError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/embed", self.base_url);
        let body = EmbedRequest {
            texts: texts.to_vec(),
        };
        let json = self.post_json(&url, &body, EMBED_TIMEOUT).await?;
        let response: EmbedResponse = serde_json::from_value(json)
            .map_err(|e| DiscourseError::Malformed(format!("embed response: {e}")))?;

        if response.embeddings_1536.len() != texts.len() {
            return Err(DiscourseError::EmbeddingMismatch {
                sent: texts.len(),
                received: response.embeddings_1536.len(),
            });
        }
        Ok(response.embeddings_1536)
    }

    /// `POST /embed` for a single text, for the search path.
    ///
    /// # Errors
    ///
    /// Returns [`DiscourseError`] as [`DiscourseClient::embed`] does.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, DiscourseError> {
        let mut embeddings = self.embed(&[text.to_owned()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| DiscourseError::Malformed("empty embedding batch".to_owned()))
    }

    /// `POST /analyze`: decompose one piece of content into its argument
    /// graph. An empty graph means the engine found no analysis.
    ///
    /// # Errors
    ///
    /// Returns [`DiscourseError`] on transport or parse failures.
    pub async fn analyze(
        &self,
        text: &str,
        source_type: TargetKind,
        source_id: Uuid,
    ) -> Result<AnalysisGraph, DiscourseError> {
        let url = format!("{}/analyze", self.base_url);
        let body = AnalyzeRequest {
            text: text.to_owned(),
            source_type,
            source_id,
        };
        let json = self.post_json(&url, &body, ANALYZE_TIMEOUT).await?;
        serde_json::from_value(json)
            .map_err(|e| DiscourseError::Malformed(format!("analysis payload: {e}")))
    }

    /// `POST /batch/submit`: submit one stage's batch of requests.
    /// Returns the opaque external job name to persist.
    ///
    /// # Errors
    ///
    /// Returns [`DiscourseError`] on transport or parse failures.
    pub async fn batch_submit(
        &self,
        stage: &str,
        requests: Vec<serde_json::Value>,
    ) -> Result<String, DiscourseError> {
        let url = format!("{}/batch/submit", self.base_url);
        let body = BatchSubmitRequest {
            stage: stage.to_owned(),
            requests,
        };
        let json = self.post_json(&url, &body, DEFAULT_TIMEOUT).await?;
        let response: BatchSubmitResponse = serde_json::from_value(json)
            .map_err(|e| DiscourseError::Malformed(format!("submit response: {e}")))?;
        tracing::debug!(stage, job = %response.job, "Submitted batch stage");
        Ok(response.job)
    }

    /// `GET /batch/poll?job=...`: poll an external job once.
    ///
    /// # Errors
    ///
    /// Returns [`DiscourseError`] on transport or parse failures.
    pub async fn batch_poll(&self, job: &str) -> Result<BatchPollResponse, DiscourseError> {
        let url = format!("{}/batch/poll", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("job", job)])
            .timeout(POLL_TIMEOUT)
            .send()
            .await
            .map_err(|e| DiscourseError::Transport(format!("poll failed: {e}")))?;
        let json = Self::read_json(response).await?;
        serde_json::from_value(json)
            .map_err(|e| DiscourseError::Malformed(format!("poll response: {e}")))
    }

    async fn get_json(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, DiscourseError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| DiscourseError::Transport(format!("request failed: {e}")))?;
        Self::read_json(response).await
    }

    async fn post_json<B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<serde_json::Value, DiscourseError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| DiscourseError::Transport(format!("request failed: {e}")))?;
        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, DiscourseError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(DiscourseError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| DiscourseError::Malformed(format!("response parse failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let client = DiscourseClient::new("http://engine:9000/");
        assert_eq!(client.base_url, "http://engine:9000");
    }

    #[tokio::test]
    async fn embed_empty_batch_is_local_noop() {
        // No server behind this URL; an empty batch must not touch it.
        let client = DiscourseClient::new("http://127.0.0.1:1");
        let embeddings = client.embed(&[]).await.unwrap_or_default();
        assert!(embeddings.is_empty());
    }

    #[test]
    fn analysis_graph_parses_from_engine_shape() {
        let json = serde_json::json!({
            "inodes": [],
            "schemes": [],
            "edges": []
        });
        let graph: Result<AnalysisGraph, _> = serde_json::from_value(json);
        assert!(graph.is_ok());
    }
}
