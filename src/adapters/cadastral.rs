//! Cadastral/parcel domain adapter.
//!
//! Looks up the parcel containing the request point. When the request
//! carries a cadastral id, the matching parcel is preferred over other
//! polygons returned for the same point.

use crate::adapters::{
    http_client, num_field, point_query, save_raw_capture, str_field, DomainAdapter,
};
use crate::error::AdapterResult;
use crate::models::{AnalysisRequest, CadastralData, Domain, DomainFindings, DomainPayload};
use crate::workspace::Workspace;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub struct CadastralAdapter {
    endpoint: String,
    client: reqwest::Client,
}

impl CadastralAdapter {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            endpoint,
            client: http_client(timeout),
        }
    }
}

#[async_trait]
impl DomainAdapter for CadastralAdapter {
    fn key(&self) -> Domain {
        Domain::Cadastral
    }

    async fn analyze(
        &self,
        request: &AnalysisRequest,
        workspace: &Workspace,
    ) -> AdapterResult<DomainFindings> {
        let features = point_query(&self.client, &self.endpoint, request, None).await?;

        debug!("Cadastral query returned {} parcels", features.len());

        let mut artifacts = Vec::new();
        if request.detailed {
            artifacts.extend(save_raw_capture(workspace, Domain::Cadastral, &features));
        }

        Ok(DomainFindings::with_artifacts(
            DomainPayload::Cadastral(map_attributes(&features, request.cadastral_id.as_deref())),
            artifacts,
        ))
    }
}

fn parcel_id(attrs: &Value) -> Option<String> {
    str_field(attrs, &["PARCELID", "CATASTRO", "PIN"])
}

fn map_attributes(features: &[Value], requested_id: Option<&str>) -> CadastralData {
    let best = requested_id
        .and_then(|id| {
            features
                .iter()
                .find(|attrs| parcel_id(attrs).as_deref() == Some(id))
        })
        .or_else(|| features.first());

    let Some(attrs) = best else {
        return CadastralData::default();
    };

    CadastralData {
        parcel_id: parcel_id(attrs),
        municipality: str_field(attrs, &["MUNICIPIO", "MUNICIPALITY"]),
        land_use: str_field(attrs, &["LAND_USE", "CALIFICACION", "USE_CLASS"]),
        area_acres: num_field(attrs, &["ACRES", "AREA_ACRES"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_point_parcel() {
        let features = vec![json!({
            "PARCELID": "086-054-432-09",
            "MUNICIPIO": "Arecibo",
            "LAND_USE": "Agricultural",
            "ACRES": 12.7
        })];
        let data = map_attributes(&features, None);
        assert_eq!(data.parcel_id.as_deref(), Some("086-054-432-09"));
        assert_eq!(data.municipality.as_deref(), Some("Arecibo"));
        assert_eq!(data.area_acres, Some(12.7));
    }

    #[test]
    fn test_requested_id_preferred_over_first_polygon() {
        let features = vec![
            json!({"PARCELID": "086-054-432-08"}),
            json!({"PARCELID": "086-054-432-09", "MUNICIPIO": "Arecibo"}),
        ];
        let data = map_attributes(&features, Some("086-054-432-09"));
        assert_eq!(data.parcel_id.as_deref(), Some("086-054-432-09"));
        assert_eq!(data.municipality.as_deref(), Some("Arecibo"));
    }

    #[test]
    fn test_unmatched_id_falls_back_to_point_parcel() {
        let features = vec![json!({"PARCELID": "086-054-432-08"})];
        let data = map_attributes(&features, Some("000-000-000-00"));
        assert_eq!(data.parcel_id.as_deref(), Some("086-054-432-08"));
    }

    #[test]
    fn test_no_parcel_is_negative_finding() {
        let data = map_attributes(&[], None);
        assert!(data.parcel_id.is_none());
        assert!(DomainPayload::Cadastral(data).is_empty_finding());
    }
}
