//! Protected-species critical-habitat domain adapter.
//!
//! Queries a critical-habitat designation layer for units within the
//! request's buffer distance.

use crate::adapters::{
    buffer_meters, http_client, num_field, point_query, save_raw_capture, str_field,
    DomainAdapter,
};
use crate::error::AdapterResult;
use crate::models::{
    AnalysisRequest, Domain, DomainFindings, DomainPayload, HabitatData, HabitatFeature,
};
use crate::workspace::Workspace;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub struct HabitatAdapter {
    endpoint: String,
    client: reqwest::Client,
}

impl HabitatAdapter {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            endpoint,
            client: http_client(timeout),
        }
    }
}

#[async_trait]
impl DomainAdapter for HabitatAdapter {
    fn key(&self) -> Domain {
        Domain::Habitat
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

        debug!("Habitat query returned {} designations", features.len());

        let mut artifacts = Vec::new();
        if request.detailed {
            artifacts.extend(save_raw_capture(workspace, Domain::Habitat, &features));
        }

        Ok(DomainFindings::with_artifacts(
            DomainPayload::Habitat(map_attributes(&features)),
            artifacts,
        ))
    }
}

fn map_attributes(features: &[Value]) -> HabitatData {
    let designations: Vec<HabitatFeature> = features
        .iter()
        .map(|attrs| HabitatFeature {
            species: str_field(attrs, &["comname", "COMNAME", "sciname", "SCINAME"])
                .unwrap_or_else(|| "unknown".to_string()),
            unit_name: str_field(attrs, &["unitname", "UNIT_NAME"]),
            status: str_field(attrs, &["listing_status", "STATUS"]),
        })
        .collect();

    let nearest_distance_miles = features
        .iter()
        .filter_map(|attrs| num_field(attrs, &["DISTANCE_MILES", "DIST_MI"]))
        .fold(None::<f64>, |acc, d| match acc {
            Some(best) if best <= d => Some(best),
            _ => Some(d),
        });

    HabitatData {
        designations,
        nearest_distance_miles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_designations() {
        let features = vec![
            json!({"comname": "Puerto Rican Boa", "unitname": "Unit PR-1", "listing_status": "Endangered", "DIST_MI": 1.4}),
            json!({"sciname": "Eleutherodactylus cooki", "DIST_MI": 0.6}),
        ];
        let data = map_attributes(&features);
        assert_eq!(data.designations.len(), 2);
        assert_eq!(data.designations[0].species, "Puerto Rican Boa");
        assert_eq!(data.designations[0].status.as_deref(), Some("Endangered"));
        assert_eq!(data.designations[1].species, "Eleutherodactylus cooki");
        assert!(data.designations[1].unit_name.is_none());
        assert_eq!(data.nearest_distance_miles, Some(0.6));
    }

    #[test]
    fn test_empty_result_is_negative_finding() {
        let data = map_attributes(&[]);
        assert!(data.designations.is_empty());
        assert!(DomainPayload::Habitat(data).is_empty_finding());
    }
}
