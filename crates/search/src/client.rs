//! Pooled HTTP client for the OpenSearch REST API.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use vigil_core::config::OpenSearchConfig;

use crate::error::SearchError;

/// Shared OpenSearch client.
///
/// Cheap to clone (wraps a pooled `reqwest::Client`); one instance is
/// shared across the query executor, state manager, and history recorder.
#[derive(Debug, Clone)]
pub struct SearchClient {
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    client: reqwest::Client,
}

impl SearchClient {
    /// Build a client from OpenSearch connection settings.
    ///
    /// The per-request timeout comes from `timeout_secs`. When
    /// `verify_certs` is false, TLS certificate validation is disabled
    /// (self-signed cluster certs in lab deployments).
    pub fn new(config: &OpenSearchConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_certs)
            .build()?;

        Ok(Self {
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
            client,
        })
    }

    /// Build a client against an explicit base URL (tests, ad-hoc tools).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            username: None,
            password: None,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, url);
        if let Some(user) = &self.username {
            builder = builder.basic_auth(user, self.password.as_deref());
        }
        builder
    }

    /// Execute a `_search` against one index expression (may be a
    /// comma-joined multi-index pattern).
    pub async fn search(&self, index: &str, body: &Value) -> Result<Value, SearchError> {
        debug!(index, "executing search");
        let response = self
            .request(reqwest::Method::POST, &format!("/{index}/_search"))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Index a document. With `id` set the write is an upsert keyed by
    /// that id; `refresh` passes through to the `?refresh=` parameter
    /// (`wait_for` gives read-your-writes).
    pub async fn index_doc(
        &self,
        index: &str,
        id: Option<&str>,
        body: &Value,
        refresh: Option<&str>,
    ) -> Result<Value, SearchError> {
        let (method, mut path) = match id {
            Some(id) => (reqwest::Method::PUT, format!("/{index}/_doc/{id}")),
            None => (reqwest::Method::POST, format!("/{index}/_doc")),
        };
        if let Some(refresh) = refresh {
            path.push_str(&format!("?refresh={refresh}"));
        }
        let response = self.request(method, &path).json(body).send().await?;
        Self::decode(response).await
    }

    /// Check whether an index exists (HEAD request).
    pub async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        let response = self
            .request(reqwest::Method::HEAD, &format!("/{index}"))
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SearchError::Status { status, body })
            }
        }
    }

    /// Create an index with the given settings/mappings body.
    pub async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/{index}"))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await?;
        Ok(())
    }

    /// Cluster health summary (used by readiness probes).
    pub async fn cluster_health(&self) -> Result<Value, SearchError> {
        let response = self
            .request(reqwest::Method::GET, "/_cluster/health")
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Root endpoint info (cluster name, version). Used as the startup
    /// connectivity probe.
    pub async fn info(&self) -> Result<Value, SearchError> {
        let response = self.request(reqwest::Method::GET, "/").send().await?;
        Self::decode(response).await
    }

    async fn decode(response: reqwest::Response) -> Result<Value, SearchError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status { status, body });
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_posts_body_and_decodes_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logs-app/_search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"took": 3, "hits": {"total": {"value": 42}}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = SearchClient::with_base_url(server.uri()).unwrap();
        let response = client
            .search("logs-app", &json!({"query": {"match_all": {}}}))
            .await
            .unwrap();
        assert_eq!(response["hits"]["total"]["value"], 42);
    }

    #[tokio::test]
    async fn search_error_status_surfaces_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logs-app/_search"))
            .respond_with(ResponseTemplate::new(500).set_body_string("shard failure"))
            .mount(&server)
            .await;

        let client = SearchClient::with_base_url(server.uri()).unwrap();
        let err = client
            .search("logs-app", &json!({}))
            .await
            .unwrap_err();
        match err {
            SearchError::Status { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "shard failure");
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn index_doc_with_id_uses_put_and_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/.alerts-state/_doc/my-rule"))
            .and(query_param("refresh", "wait_for"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "updated"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = SearchClient::with_base_url(server.uri()).unwrap();
        client
            .index_doc(
                ".alerts-state",
                Some("my-rule"),
                &json!({"state": "ok"}),
                Some("wait_for"),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn index_doc_without_id_posts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/.alerts-history/_doc"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"result": "created"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = SearchClient::with_base_url(server.uri()).unwrap();
        client
            .index_doc(".alerts-history", None, &json!({"event_type": "fired"}), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn index_exists_maps_404_to_false() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/.alerts-state"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = SearchClient::with_base_url(server.uri()).unwrap();
        assert!(!client.index_exists(".alerts-state").await.unwrap());
    }

    #[tokio::test]
    async fn basic_auth_header_attached_when_configured() {
        let server = MockServer::start().await;
        // "admin:secret" base64
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = SearchClient::with_base_url(server.uri()).unwrap();
        client.username = Some("admin".to_string());
        client.password = Some("secret".to_string());
        client.info().await.unwrap();
    }
}
