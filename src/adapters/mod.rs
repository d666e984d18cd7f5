//! Domain adapter interface and the built-in adapters.
//!
//! Each adapter is a stateless unit of work that queries one regulatory
//! data domain and maps the response into its typed payload. The set of
//! registered adapters is fixed at process start; the orchestrator fans
//! out across the registry for every request.

pub mod air_quality;
pub mod cadastral;
pub mod flood;
pub mod habitat;
pub mod karst;
pub mod wetland;

pub use air_quality::AirQualityAdapter;
pub use cadastral::CadastralAdapter;
pub use flood::FloodAdapter;
pub use habitat::HabitatAdapter;
pub use karst::KarstAdapter;
pub use wetland::WetlandAdapter;

use crate::config::Config;
use crate::error::{AdapterError, AdapterResult};
use crate::models::{AnalysisRequest, Domain, DomainFindings};
use crate::workspace::Workspace;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const METERS_PER_MILE: f64 = 1609.344;

/// Contract implemented by every domain analysis.
///
/// Implementations must be safe to run concurrently with any other
/// adapter: no shared mutable state, and no file writes outside the
/// adapter's own domain-keyed filenames under the workspace.
#[async_trait]
pub trait DomainAdapter: Send + Sync {
    /// The domain this adapter serves. Doubles as its registry identity.
    fn key(&self) -> Domain;

    /// Run the analysis for one request.
    ///
    /// A negative finding ("no flood zone here") is a successful result
    /// with an empty payload, never an error. Errors are returned as
    /// values; implementations never panic across this boundary.
    async fn analyze(
        &self,
        request: &AnalysisRequest,
        workspace: &Workspace,
    ) -> AdapterResult<DomainFindings>;
}

/// Immutable, ordered collection of the adapters registered at startup.
///
/// Iteration order is registration order; the aggregated report's section
/// order is defined by it.
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn DomainAdapter>>,
}

impl AdapterRegistry {
    /// Assemble the registry from configuration. Disabled domains are
    /// skipped; the canonical order is flood, wetland, habitat,
    /// air_quality, karst, cadastral.
    pub fn from_config(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.orchestrator.http_timeout_seconds);
        let mut adapters: Vec<Arc<dyn DomainAdapter>> = Vec::new();

        if config.domains.flood.enabled {
            adapters.push(Arc::new(FloodAdapter::new(
                config.domains.flood.endpoint.clone(),
                timeout,
            )));
        }
        if config.domains.wetland.enabled {
            adapters.push(Arc::new(WetlandAdapter::new(
                config.domains.wetland.endpoint.clone(),
                timeout,
            )));
        }
        if config.domains.habitat.enabled {
            adapters.push(Arc::new(HabitatAdapter::new(
                config.domains.habitat.endpoint.clone(),
                timeout,
            )));
        }
        if config.domains.air_quality.enabled {
            adapters.push(Arc::new(AirQualityAdapter::new(
                config.domains.air_quality.endpoint.clone(),
                timeout,
            )));
        }
        if config.domains.karst.enabled {
            adapters.push(Arc::new(KarstAdapter::new(
                config.domains.karst.endpoint.clone(),
                timeout,
            )));
        }
        if config.domains.cadastral.enabled {
            adapters.push(Arc::new(CadastralAdapter::new(
                config.domains.cadastral.endpoint.clone(),
                timeout,
            )));
        }

        Self { adapters }
    }

    /// Build a registry from explicit adapters. Used by tests and by
    /// callers embedding their own adapter set.
    #[allow(dead_code)] // Constructor for custom adapter sets
    pub fn from_adapters(adapters: Vec<Arc<dyn DomainAdapter>>) -> Self {
        Self { adapters }
    }

    /// Registered adapters in registration order.
    pub fn adapters(&self) -> &[Arc<dyn DomainAdapter>] {
        &self.adapters
    }

    /// Registered domain keys in registration order (the capability list).
    pub fn domains(&self) -> Vec<Domain> {
        self.adapters.iter().map(|a| a.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Build the HTTP client shared shape for all built-in adapters.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client")
}

/// Convert the request's buffer distance to meters for service queries.
pub(crate) fn buffer_meters(request: &AnalysisRequest) -> f64 {
    request.buffer_miles * METERS_PER_MILE
}

/// Run a point-in-polygon or buffered point query against an ArcGIS-style
/// feature service and return the feature attribute objects.
pub(crate) async fn point_query(
    client: &reqwest::Client,
    endpoint: &str,
    request: &AnalysisRequest,
    distance_m: Option<f64>,
) -> AdapterResult<Vec<Value>> {
    let geometry = format!("{},{}", request.longitude, request.latitude);
    let mut params: Vec<(&str, String)> = vec![
        ("geometry", geometry),
        ("geometryType", "esriGeometryPoint".to_string()),
        ("inSR", "4326".to_string()),
        ("spatialRel", "esriSpatialRelIntersects".to_string()),
        ("outFields", "*".to_string()),
        ("returnGeometry", "false".to_string()),
        ("f", "json".to_string()),
    ];
    if let Some(distance) = distance_m {
        params.push(("distance", format!("{:.0}", distance)));
        params.push(("units", "esriSRUnit_Meter".to_string()));
    }

    let response = client.get(endpoint).query(&params).send().await?;

    let status = response.status();
    if !status.is_success() {
        let reason = response.text().await.unwrap_or_default();
        return Err(AdapterError::Upstream {
            status: status.as_u16(),
            reason,
        });
    }

    let body: Value = response.json().await?;

    // ArcGIS services report errors in-band with HTTP 200.
    if let Some(err) = body.get("error") {
        return Err(AdapterError::Upstream {
            status: err.get("code").and_then(Value::as_u64).unwrap_or(500) as u16,
            reason: err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("service error")
                .to_string(),
        });
    }

    let features = match body.get("features") {
        Some(Value::Array(features)) => features
            .iter()
            .filter_map(|f| f.get("attributes").cloned())
            .collect(),
        Some(_) => {
            return Err(AdapterError::InvalidResponse {
                reason: "features is not an array".to_string(),
            })
        }
        // An absent features key is an empty result set, not an error.
        None => Vec::new(),
    };

    Ok(features)
}

/// Persist the raw upstream attributes for a domain when the request asks
/// for a detailed run. Artifact failures are logged and skipped; raw
/// captures never fail the domain.
pub(crate) fn save_raw_capture(
    workspace: &Workspace,
    domain: Domain,
    attributes: &[Value],
) -> Option<PathBuf> {
    let path = workspace.data_dir().join(format!("{}_source.json", domain));
    match serde_json::to_string_pretty(attributes)
        .map_err(std::io::Error::other)
        .and_then(|json| std::fs::write(&path, json))
    {
        Ok(()) => Some(path),
        Err(e) => {
            warn!("Failed to save raw capture for {}: {}", domain, e);
            None
        }
    }
}

/// Read a string attribute, trying several candidate field names.
pub(crate) fn str_field(attributes: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|n| attributes.get(n).and_then(Value::as_str))
        .map(str::to_string)
}

/// Read a numeric attribute, trying several candidate field names.
pub(crate) fn num_field(attributes: &Value, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|n| attributes.get(n).and_then(Value::as_f64))
}
