//! API client for the monitoring agent's HTTP API

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for a single agent
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a POST request without a body
    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn report(&self) -> Result<ReportResponse> {
        self.get("api/v1/report").await
    }

    pub async fn recent_metrics(&self, limit: usize) -> Result<Vec<MetricSample>> {
        self.get(&format!("api/v1/metrics/recent?limit={}", limit))
            .await
    }

    pub async fn incidents(&self, status: Option<&str>, limit: usize) -> Result<Vec<Incident>> {
        let mut path = format!("api/v1/incidents?limit={}", limit);
        if let Some(status) = status {
            path.push_str(&format!("&status={}", status));
        }
        self.get(&path).await
    }

    pub async fn resolve_incident(&self, id: u64) -> Result<ResolveResponse> {
        self.post(&format!("api/v1/incidents/{}/resolve", id)).await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: String,
    pub node_id: String,
    pub service_id: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub response_time_ms: f64,
    pub error_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detection {
    Warmup {
        risk: f64,
        progress: f64,
    },
    Healthy {
        risk: f64,
        future_cpu: Option<f64>,
    },
    Anomaly {
        severity: String,
        risk: f64,
        eta_minutes: Option<u32>,
        incident_id: u64,
        root_cause: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationIntent {
    pub action: String,
    pub service_id: String,
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub timestamp: String,
    pub health: HostHealth,
    pub sample: Option<MetricSample>,
    pub detection: Option<Detection>,
    pub remediation: Option<RemediationIntent>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelStats {
    pub anomaly_trainings: u64,
    pub anomaly_failures: u64,
    pub forecast_trainings: u64,
    pub forecast_failures: u64,
    pub anomaly_trained_at: Option<String>,
    pub forecast_trained_at: Option<String>,
    pub forecast_age_secs: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub health: HostHealth,
    pub report: Option<TickReport>,
    #[serde(default)]
    pub models: ModelStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: u64,
    pub service_id: String,
    pub node_id: String,
    pub severity: String,
    pub root_cause: String,
    pub status: String,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub outcome: String,
    pub resolved_at: Option<String>,
    pub incident: Option<Incident>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const INCIDENT: &str = r#"{
        "id": 3,
        "service_id": "checkout",
        "node_id": "node-1",
        "severity": "HIGH",
        "root_cause": "Failure risk 74.1%",
        "status": "OPEN",
        "created_at": "2026-03-01T10:00:00Z",
        "resolved_at": null
    }"#;

    #[tokio::test]
    async fn test_report_parses_anomaly_tick() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/report")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "health": {"status": "DEGRADED", "health_score": 45.0},
                    "report": {
                        "tick": 12,
                        "timestamp": "2026-03-01T10:00:00Z",
                        "health": {"status": "DEGRADED", "health_score": 45.0},
                        "sample": null,
                        "detection": {
                            "kind": "anomaly",
                            "severity": "HIGH",
                            "risk": 74.1,
                            "eta_minutes": 10,
                            "incident_id": 3,
                            "root_cause": "Failure risk 74.1%"
                        },
                        "remediation": {
                            "action": "RESTART",
                            "service_id": "checkout",
                            "node_id": "node-1",
                            "status": "success",
                            "timestamp": "2026-03-01T10:00:00Z"
                        },
                        "error": null
                    },
                    "models": {
                        "anomaly_trainings": 4,
                        "anomaly_failures": 0,
                        "forecast_trainings": 1,
                        "forecast_failures": 0
                    }
                }"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let report = client.report().await.unwrap();

        mock.assert_async().await;
        assert_eq!(report.health.status, "DEGRADED");
        let tick = report.report.unwrap();
        assert_eq!(tick.tick, 12);
        assert!(matches!(
            tick.detection,
            Some(Detection::Anomaly { eta_minutes: Some(10), incident_id: 3, .. })
        ));
        assert_eq!(tick.remediation.unwrap().action, "RESTART");
        assert_eq!(report.models.anomaly_trainings, 4);
    }

    #[tokio::test]
    async fn test_incidents_sends_filters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/incidents")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("status".into(), "open".into()),
                Matcher::UrlEncoded("limit".into(), "5".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!("[{}]", INCIDENT))
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let incidents = client.incidents(Some("open"), 5).await.unwrap();

        mock.assert_async().await;
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].id, 3);
        assert_eq!(incidents[0].severity, "HIGH");
    }

    #[tokio::test]
    async fn test_resolve_reports_outcome() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            r#"{{"outcome": "already_resolved", "resolved_at": "2026-03-01T10:05:00Z", "incident": {}}}"#,
            INCIDENT
        );
        let mock = server
            .mock("POST", "/api/v1/incidents/3/resolve")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let resolved = client.resolve_incident(3).await.unwrap();

        mock.assert_async().await;
        assert_eq!(resolved.outcome, "already_resolved");
        assert_eq!(resolved.resolved_at.as_deref(), Some("2026-03-01T10:05:00Z"));
    }

    #[tokio::test]
    async fn test_api_error_message_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/incidents/9/resolve")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "incident 9 not found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.resolve_incident(9).await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("404"));
        assert!(message.contains("incident 9 not found"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
