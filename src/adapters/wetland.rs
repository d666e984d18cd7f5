//! Wetland inventory domain adapter.
//!
//! Queries a national wetlands inventory layer for mapped wetlands within
//! the request's buffer distance.

use crate::adapters::{
    buffer_meters, http_client, num_field, point_query, save_raw_capture, str_field,
    DomainAdapter,
};
use crate::error::AdapterResult;
use crate::models::{
    AnalysisRequest, Domain, DomainFindings, DomainPayload, WetlandData, WetlandFeature,
};
use crate::workspace::Workspace;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub struct WetlandAdapter {
    endpoint: String,
    client: reqwest::Client,
}

impl WetlandAdapter {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            endpoint,
            client: http_client(timeout),
        }
    }
}

#[async_trait]
impl DomainAdapter for WetlandAdapter {
    fn key(&self) -> Domain {
        Domain::Wetland
    }

    async fn analyze(
        &self,
        request: &AnalysisRequest,
        workspace: &Workspace,
    ) -> AdapterResult<DomainFindings> {
        let features = point_query(
            &self.client,
            &self.endpoint,
            request,
            Some(buffer_meters(request)),
        )
        .await?;

        debug!("Wetland query returned {} features", features.len());

        let mut artifacts = Vec::new();
        if request.detailed {
            artifacts.extend(save_raw_capture(workspace, Domain::Wetland, &features));
        }

        Ok(DomainFindings::with_artifacts(
            DomainPayload::Wetland(map_attributes(&features)),
            artifacts,
        ))
    }
}

fn map_attributes(features: &[Value]) -> WetlandData {
    let wetlands: Vec<WetlandFeature> = features
        .iter()
        .map(|attrs| WetlandFeature {
            classification: str_field(attrs, &["ATTRIBUTE", "CLASS_CODE"])
                .unwrap_or_else(|| "unknown".to_string()),
            wetland_type: str_field(attrs, &["WETLAND_TYPE", "WETLAND_TY"])
                .unwrap_or_else(|| "unknown".to_string()),
            acres: num_field(attrs, &["ACRES", "GIS_ACRES"]),
        })
        .collect();

    let nearest_distance_miles = features
        .iter()
        .filter_map(|attrs| num_field(attrs, &["DISTANCE_MILES", "DIST_MI"]))
        .fold(None::<f64>, |acc, d| match acc {
            Some(best) if best <= d => Some(best),
            _ => Some(d),
        });

    WetlandData {
        wetlands,
        nearest_distance_miles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_wetland_features() {
        let features = vec![
            json!({"ATTRIBUTE": "PFO1A", "WETLAND_TYPE": "Freshwater Forested/Shrub Wetland", "ACRES": 4.2, "DIST_MI": 0.8}),
            json!({"ATTRIBUTE": "E2EM1P", "WETLAND_TYPE": "Estuarine and Marine Wetland", "DIST_MI": 0.3}),
        ];
        let data = map_attributes(&features);
        assert_eq!(data.wetlands.len(), 2);
        assert_eq!(data.wetlands[0].classification, "PFO1A");
        assert_eq!(data.wetlands[0].acres, Some(4.2));
        assert_eq!(data.wetlands[1].acres, None);
        assert_eq!(data.nearest_distance_miles, Some(0.3));
    }

    #[test]
    fn test_map_missing_fields_default() {
        let features = vec![json!({"OBJECTID": 7})];
        let data = map_attributes(&features);
        assert_eq!(data.wetlands[0].classification, "unknown");
        assert_eq!(data.wetlands[0].wetland_type, "unknown");
        assert!(data.nearest_distance_miles.is_none());
    }

    #[test]
    fn test_empty_result_is_negative_finding() {
        let data = map_attributes(&[]);
        assert!(data.wetlands.is_empty());
        assert!(DomainPayload::Wetland(data).is_empty_finding());
    }
}
