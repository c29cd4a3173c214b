//! REST client for the ingestion API
//!
//! - `POST {base}/api/jobs/ingest` with `{adapter, run_id, jobs}`
//! - `GET {base}/api/jobs/schedule` returning `{schedules: [...]}`

use crate::{map_reqwest_error, user_agent};
use async_trait::async_trait;
use jobharvest_core::domain::{NormalizedJob, ScrapeScheduleEntry};
use jobharvest_core::error::{AppError, Result};
use jobharvest_core::port::IngestionClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const INGEST_PATH: &str = "/api/jobs/ingest";
const SCHEDULE_PATH: &str = "/api/jobs/schedule";

#[derive(Debug, Clone)]
pub struct IngestionClientConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct IngestRequest<'a> {
    adapter: &'a str,
    run_id: &'a str,
    jobs: &'a [NormalizedJob],
}

#[derive(Deserialize)]
struct ScheduleResponse {
    #[serde(default)]
    schedules: Vec<ScrapeScheduleEntry>,
}

pub struct HttpIngestionClient {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpIngestionClient {
    pub fn new(config: IngestionClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(user_agent())
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.filter(|t| !t.is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl IngestionClient for HttpIngestionClient {
    async fn submit(
        &self,
        adapter: &str,
        run_id: &str,
        jobs: &[NormalizedJob],
    ) -> Result<serde_json::Value> {
        let body = IngestRequest {
            adapter,
            run_id,
            jobs,
        };

        let response = self
            .authorize(self.client.post(self.url(INGEST_PATH)))
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| map_reqwest_error("ingest", e))?;

        let text = response
            .text()
            .await
            .map_err(|e| map_reqwest_error("ingest", e))?;

        debug!(adapter = %adapter, run_id = %run_id, jobs = jobs.len(), "Batch ingested");

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| AppError::Transport(format!("ingest: malformed response body: {e}")))
    }

    async fn fetch_cadence(&self) -> Result<Vec<ScrapeScheduleEntry>> {
        let response = self
            .authorize(self.client.get(self.url(SCHEDULE_PATH)))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| map_reqwest_error("schedule", e))?;

        let payload: ScheduleResponse = response
            .json()
            .await
            .map_err(|e| map_reqwest_error("schedule", e))?;

        for entry in &payload.schedules {
            entry
                .validate()
                .map_err(|e| AppError::Validation(e.to_string()))?;
        }

        Ok(payload.schedules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, token: Option<&str>) -> HttpIngestionClient {
        HttpIngestionClient::new(IngestionClientConfig {
            base_url: format!("{}/", server.uri()),
            api_token: token.map(str::to_string),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn job(id: &str) -> NormalizedJob {
        NormalizedJob::new(id, "Engineer", "Example Corp", "desc", "https://jobs.example/1")
    }

    #[tokio::test]
    async fn test_submit_posts_batch_with_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/jobs/ingest"))
            .and(header("authorization", "Bearer secret"))
            .and(header("user-agent", user_agent().as_str()))
            .and(body_partial_json(json!({"adapter": "demo-board", "run_id": "run-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"created": 2})))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server, Some("secret"))
            .submit("demo-board", "run-1", &[job("a"), job("b")])
            .await
            .unwrap();

        assert_eq!(response, json!({"created": 2}));
    }

    #[tokio::test]
    async fn test_submit_non_2xx_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .submit("demo-board", "run-1", &[job("a")])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Transport(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_submit_empty_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let response = client(&server, None)
            .submit("demo-board", "run-1", &[job("a")])
            .await
            .unwrap();

        assert!(response.is_null());
    }

    #[tokio::test]
    async fn test_fetch_cadence_parses_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jobs/schedule"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "schedules": [
                    {"adapter": "demo-board", "interval_minutes": 30},
                    {"adapter": "other-board", "interval_minutes": 120, "enabled": false,
                     "last_run_at": "2024-05-01T10:00:00Z"}
                ]
            })))
            .mount(&server)
            .await;

        let schedules = client(&server, None).fetch_cadence().await.unwrap();

        assert_eq!(schedules.len(), 2);
        assert!(schedules[0].enabled);
        assert_eq!(schedules[0].interval_minutes, 30);
        assert!(!schedules[1].enabled);
        assert!(schedules[1].last_run_at.is_some());
    }

    #[tokio::test]
    async fn test_fetch_cadence_missing_list_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        assert!(client(&server, None).fetch_cadence().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_cadence_rejects_zero_interval() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "schedules": [{"adapter": "demo-board", "interval_minutes": 0}]
            })))
            .mount(&server)
            .await;

        let err = client(&server, None).fetch_cadence().await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
