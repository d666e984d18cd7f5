//! Air-quality nonattainment domain adapter.
//!
//! Queries a nonattainment-area layer for designations covering the
//! request point.

use crate::adapters::{http_client, point_query, save_raw_capture, str_field, DomainAdapter};
use crate::error::AdapterResult;
use crate::models::{AirQualityData, AnalysisRequest, Domain, DomainFindings, DomainPayload};
use crate::workspace::Workspace;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub struct AirQualityAdapter {
    endpoint: String,
    client: reqwest::Client,
}

impl AirQualityAdapter {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            endpoint,
            client: http_client(timeout),
        }
    }
}

#[async_trait]
impl DomainAdapter for AirQualityAdapter {
    fn key(&self) -> Domain {
        Domain::AirQuality
    }

    async fn analyze(
        &self,
        request: &AnalysisRequest,
        workspace: &Workspace,
    ) -> AdapterResult<DomainFindings> {
        let features = point_query(&self.client, &self.endpoint, request, None).await?;

        debug!("Air-quality query returned {} designations", features.len());

        let mut artifacts = Vec::new();
        if request.detailed {
            artifacts.extend(save_raw_capture(workspace, Domain::AirQuality, &features));
        }

        Ok(DomainFindings::with_artifacts(
            DomainPayload::AirQuality(map_attributes(&features)),
            artifacts,
        ))
    }
}

fn map_attributes(features: &[Value]) -> AirQualityData {
    let mut pollutants: Vec<String> = features
        .iter()
        .filter_map(|attrs| str_field(attrs, &["pollutant", "POLLUTANT_NAME", "pllnt_nm"]))
        .collect();
    pollutants.sort();
    pollutants.dedup();

    AirQualityData {
        nonattainment: !features.is_empty(),
        pollutants,
        area_name: features
            .first()
            .and_then(|attrs| str_field(attrs, &["area_name", "AREA_NAME"])),
    }
}
