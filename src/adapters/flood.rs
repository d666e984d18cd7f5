//! Flood-zone domain adapter.
//!
//! Queries a flood hazard layer (FEMA NFHL style) for the zone containing
//! the request point. The upstream service is prone to transient outages,
//! so this adapter retries with exponential backoff before giving up.

use crate::adapters::{
    http_client, num_field, point_query, save_raw_capture, str_field, DomainAdapter,
};
use crate::error::AdapterResult;
use crate::models::{AnalysisRequest, Domain, DomainFindings, DomainPayload, FloodData};
use crate::workspace::Workspace;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 250;

pub struct FloodAdapter {
    endpoint: String,
    client: reqwest::Client,
}

impl FloodAdapter {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            endpoint,
            client: http_client(timeout),
        }
    }
}

#[async_trait]
impl DomainAdapter for FloodAdapter {
    fn key(&self) -> Domain {
        Domain::Flood
    }

    async fn analyze(
        &self,
        request: &AnalysisRequest,
        workspace: &Workspace,
    ) -> AdapterResult<DomainFindings> {
        let mut attempt = 0;
        let features = loop {
            match point_query(&self.client, &self.endpoint, request, None).await {
                Ok(features) => break features,
                Err(e) if e.is_transient() && attempt + 1 < MAX_ATTEMPTS => {
                    attempt += 1;
                    let backoff = Duration::from_millis(BACKOFF_BASE_MS * 2u64.pow(attempt));
                    warn!(
                        "Flood service attempt {} failed ({}), retrying in {:?}",
                        attempt, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        };

        debug!("Flood query returned {} features", features.len());

        let mut artifacts = Vec::new();
        if request.detailed {
            artifacts.extend(save_raw_capture(workspace, Domain::Flood, &features));
        }

        Ok(DomainFindings::with_artifacts(
            DomainPayload::Flood(map_attributes(&features)),
            artifacts,
        ))
    }
}

/// True for special flood hazard area designations (A and V series zones).
fn is_hazard_zone(zone: &str) -> bool {
    zone.starts_with('A') || zone.starts_with('V')
}

fn map_attributes(features: &[Value]) -> FloodData {
    // Prefer the first hazard-zone feature; unshaded X/C polygons can
    // overlap the same point in merged panels.
    let best = features
        .iter()
        .find(|f| {
            str_field(f, &["FLD_ZONE", "ZONE"])
                .map(|z| is_hazard_zone(&z))
                .unwrap_or(false)
        })
        .or_else(|| features.first());

    let Some(attrs) = best else {
        return FloodData::default();
    };

    let zone = str_field(attrs, &["FLD_ZONE", "ZONE"]);
    // Services publish -9999 where no elevation is determined.
    let bfe = num_field(attrs, &["STATIC_BFE", "BFE"]).filter(|v| *v > -999.0);

    FloodData {
        in_flood_zone: zone.as_deref().map(is_hazard_zone).unwrap_or(false),
        zone,
        base_flood_elevation_ft: bfe,
        panel_id: str_field(attrs, &["FIRM_PAN", "PANEL"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn make_request() -> AnalysisRequest {
        AnalysisRequest {
            longitude: -66.7135,
            latitude: 18.4058,
            project_name: "test".to_string(),
            cadastral_id: None,
            buffer_miles: 1.0,
            include_maps: false,
            detailed: false,
        }
    }

    #[test]
    fn test_map_hazard_zone() {
        let features = vec![
            json!({"FLD_ZONE": "X"}),
            json!({"FLD_ZONE": "AE", "STATIC_BFE": 12.0, "FIRM_PAN": "72000C0300J"}),
        ];
        let data = map_attributes(&features);
        assert!(data.in_flood_zone);
        assert_eq!(data.zone.as_deref(), Some("AE"));
        assert_eq!(data.base_flood_elevation_ft, Some(12.0));
        assert_eq!(data.panel_id.as_deref(), Some("72000C0300J"));
    }

    #[test]
    fn test_map_outside_hazard_area() {
        let features = vec![json!({"FLD_ZONE": "X", "STATIC_BFE": -9999.0})];
        let data = map_attributes(&features);
        assert!(!data.in_flood_zone);
        assert_eq!(data.zone.as_deref(), Some("X"));
        assert_eq!(data.base_flood_elevation_ft, None);
    }

    #[test]
    fn test_map_no_features_is_negative_finding() {
        let data = map_attributes(&[]);
        assert!(!data.in_flood_zone);
        assert!(data.zone.is_none());
    }

    #[tokio::test]
    async fn test_retries_transient_upstream_failures() {
        let server = httpmock::MockServer::start();
        let fail = server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/query");
            then.status(503).body("unavailable");
        });

        let ws_dir = TempDir::new().unwrap();
        let workspace =
            Workspace::create("test", ws_dir.path(), None).unwrap();
        let adapter = FloodAdapter::new(server.url("/query"), Duration::from_secs(5));

        let err = adapter.analyze(&make_request(), &workspace).await.unwrap_err();
        assert_eq!(err.kind(), "transient_upstream");
        // All three attempts hit the service before giving up.
        fail.assert_hits(3);
    }

    #[tokio::test]
    async fn test_no_retry_on_invalid_response() {
        let server = httpmock::MockServer::start();
        let bad = server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/query");
            then.status(200).json_body(json!({"features": "oops"}));
        });

        let ws_dir = TempDir::new().unwrap();
        let workspace = Workspace::create("test", ws_dir.path(), None).unwrap();
        let adapter = FloodAdapter::new(server.url("/query"), Duration::from_secs(5));

        let err = adapter.analyze(&make_request(), &workspace).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_response");
        bad.assert_hits(1);
    }

    #[tokio::test]
    async fn test_successful_query_with_detailed_capture() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/query");
            then.status(200).json_body(json!({
                "features": [{"attributes": {"FLD_ZONE": "VE", "STATIC_BFE": 9.0}}]
            }));
        });

        let ws_dir = TempDir::new().unwrap();
        let workspace = Workspace::create("test", ws_dir.path(), None).unwrap();
        let adapter = FloodAdapter::new(server.url("/query"), Duration::from_secs(5));

        let mut request = make_request();
        request.detailed = true;

        let findings = adapter.analyze(&request, &workspace).await.unwrap();
        match &findings.payload {
            DomainPayload::Flood(data) => {
                assert!(data.in_flood_zone);
                assert_eq!(data.zone.as_deref(), Some("VE"));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
        assert_eq!(findings.artifacts.len(), 1);
        assert!(findings.artifacts[0].exists());
    }
}
