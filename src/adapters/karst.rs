//! Karst geology domain adapter.
//!
//! Queries a karst-region layer for formations intersecting the request
//! point.

use crate::adapters::{
    http_client, num_field, point_query, save_raw_capture, str_field, DomainAdapter,
};
use crate::error::AdapterResult;
use crate::models::{AnalysisRequest, Domain, DomainFindings, DomainPayload, KarstData};
use crate::workspace::Workspace;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub struct KarstAdapter {
    endpoint: String,
    client: reqwest::Client,
}

impl KarstAdapter {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            endpoint,
            client: http_client(timeout),
        }
    }
}

#[async_trait]
impl DomainAdapter for KarstAdapter {
    fn key(&self) -> Domain {
        Domain::Karst
    }

    async fn analyze(
        &self,
        request: &AnalysisRequest,
        workspace: &Workspace,
    ) -> AdapterResult<DomainFindings> {
        let features = point_query(&self.client, &self.endpoint, request, None).await?;

        debug!("Karst query returned {} features", features.len());

        let mut artifacts = Vec::new();
        if request.detailed {
            artifacts.extend(save_raw_capture(workspace, Domain::Karst, &features));
        }

        Ok(DomainFindings::with_artifacts(
            DomainPayload::Karst(map_attributes(&features)),
            artifacts,
        ))
    }
}

fn map_attributes(features: &[Value]) -> KarstData {
    let Some(attrs) = features.first() else {
        return KarstData::default();
    };

    KarstData {
        in_karst: true,
        formation: str_field(attrs, &["FORMATION", "UNIT_NAME", "GEO_UNIT"]),
        distance_miles: num_field(attrs, &["DISTANCE_MILES", "DIST_MI"]).or(Some(0.0)),
    }
}
