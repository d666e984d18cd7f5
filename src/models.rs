//! Data models for the screening engine.
//!
//! This module contains all the core data structures used throughout
//! the application for representing requests, per-domain results, and
//! the aggregated report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Risk tier attached per domain and to the overall classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    /// Low risk - no flagged constraint for the domain
    Low,
    /// Moderate risk - constraint present, standard review expected
    Moderate,
    /// High risk - constraint likely to require permits or redesign
    High,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::Low => write!(f, "LOW"),
            RiskTier::Moderate => write!(f, "MODERATE"),
            RiskTier::High => write!(f, "HIGH"),
        }
    }
}

impl RiskTier {
    /// Ordinal encoding used by the overall classifier.
    pub fn encode(&self) -> u8 {
        match self {
            RiskTier::Low => 1,
            RiskTier::Moderate => 2,
            RiskTier::High => 3,
        }
    }

    /// CSS-style class label for downstream report renderers.
    pub fn class_label(&self) -> &'static str {
        match self {
            RiskTier::Low => "risk-low",
            RiskTier::Moderate => "risk-moderate",
            RiskTier::High => "risk-high",
        }
    }
}

/// Compliance status for a checklist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComplianceStatus {
    /// No action required beyond documentation
    Compliant,
    /// Flagged for agency review or further study
    Review,
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplianceStatus::Compliant => write!(f, "COMPLIANT"),
            ComplianceStatus::Review => write!(f, "REVIEW"),
        }
    }
}

/// One independent analysis category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Flood,
    Wetland,
    Habitat,
    AirQuality,
    Karst,
    Cadastral,
}

impl Domain {
    /// Stable key used for filenames, config sections, and JSON tags.
    pub fn key(&self) -> &'static str {
        match self {
            Domain::Flood => "flood",
            Domain::Wetland => "wetland",
            Domain::Habitat => "habitat",
            Domain::AirQuality => "air_quality",
            Domain::Karst => "karst",
            Domain::Cadastral => "cadastral",
        }
    }

    /// Parse a domain from its stable key.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "flood" => Some(Domain::Flood),
            "wetland" => Some(Domain::Wetland),
            "habitat" => Some(Domain::Habitat),
            "air_quality" => Some(Domain::AirQuality),
            "karst" => Some(Domain::Karst),
            "cadastral" => Some(Domain::Cadastral),
            _ => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A single screening request. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Longitude in WGS84 degrees.
    pub longitude: f64,
    /// Latitude in WGS84 degrees.
    pub latitude: f64,
    /// Free-text project name, used to derive the workspace directory.
    pub project_name: String,
    /// Cadastral parcel identifier, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadastral_id: Option<String>,
    /// Search buffer around the point, in miles. Must be positive.
    pub buffer_miles: f64,
    /// Whether adapters should produce map artifacts.
    pub include_maps: bool,
    /// Whether adapters should include extended attribute sets.
    pub detailed: bool,
}

impl AnalysisRequest {
    /// Validate coordinate ranges and the buffer distance.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!("Longitude out of range: {}", self.longitude));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!("Latitude out of range: {}", self.latitude));
        }
        if self.buffer_miles <= 0.0 {
            return Err("Buffer distance must be greater than zero".to_string());
        }
        if self.project_name.trim().is_empty() {
            return Err("Project name must not be empty".to_string());
        }
        Ok(())
    }
}

/// Flood-zone findings for the point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FloodData {
    /// Whether the point falls inside a special flood hazard area.
    pub in_flood_zone: bool,
    /// FEMA zone designation (e.g. "AE", "X", "VE").
    #[serde(default)]
    pub zone: Option<String>,
    /// Base flood elevation in feet, where published.
    #[serde(default)]
    pub base_flood_elevation_ft: Option<f64>,
    /// FIRM panel identifier.
    #[serde(default)]
    pub panel_id: Option<String>,
}

/// One wetland feature within the search buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WetlandFeature {
    /// Cowardin classification code.
    pub classification: String,
    /// Human-readable wetland type.
    pub wetland_type: String,
    /// Mapped acreage, where published.
    #[serde(default)]
    pub acres: Option<f64>,
}

/// Wetland findings within the buffer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WetlandData {
    #[serde(default)]
    pub wetlands: Vec<WetlandFeature>,
    /// Distance to the nearest mapped wetland, in miles.
    #[serde(default)]
    pub nearest_distance_miles: Option<f64>,
}

/// One critical-habitat designation near the point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitatFeature {
    /// Common or scientific species name.
    pub species: String,
    /// Designation unit name, where published.
    #[serde(default)]
    pub unit_name: Option<String>,
    /// Listing status (e.g. "Endangered", "Threatened").
    #[serde(default)]
    pub status: Option<String>,
}

/// Protected-species habitat findings near the point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HabitatData {
    #[serde(default)]
    pub designations: Vec<HabitatFeature>,
    /// Distance to the nearest designation, in miles.
    #[serde(default)]
    pub nearest_distance_miles: Option<f64>,
}

/// Air-quality attainment findings for the surrounding area.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AirQualityData {
    /// Whether the point lies in a designated nonattainment area.
    pub nonattainment: bool,
    /// Pollutants for which the area is designated.
    #[serde(default)]
    pub pollutants: Vec<String>,
    /// Designated area name.
    #[serde(default)]
    pub area_name: Option<String>,
}

/// Karst geology findings for the point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KarstData {
    /// Whether the point intersects a mapped karst region.
    pub in_karst: bool,
    /// Geologic formation name, where published.
    #[serde(default)]
    pub formation: Option<String>,
    /// Distance to the nearest karst boundary, in miles.
    #[serde(default)]
    pub distance_miles: Option<f64>,
}

/// Cadastral/parcel findings for the point or supplied parcel id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CadastralData {
    #[serde(default)]
    pub parcel_id: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    /// Land-use classification of the parcel.
    #[serde(default)]
    pub land_use: Option<String>,
    #[serde(default)]
    pub area_acres: Option<f64>,
}

/// Typed per-domain payload, tagged by domain key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum DomainPayload {
    Flood(FloodData),
    Wetland(WetlandData),
    Habitat(HabitatData),
    AirQuality(AirQualityData),
    Karst(KarstData),
    Cadastral(CadastralData),
}

impl DomainPayload {
    /// The domain this payload belongs to.
    #[allow(dead_code)] // Utility accessor
    pub fn domain(&self) -> Domain {
        match self {
            DomainPayload::Flood(_) => Domain::Flood,
            DomainPayload::Wetland(_) => Domain::Wetland,
            DomainPayload::Habitat(_) => Domain::Habitat,
            DomainPayload::AirQuality(_) => Domain::AirQuality,
            DomainPayload::Karst(_) => Domain::Karst,
            DomainPayload::Cadastral(_) => Domain::Cadastral,
        }
    }

    /// Whether the payload carries no finding at all (a valid negative result).
    #[allow(dead_code)] // Utility for payload consumers
    pub fn is_empty_finding(&self) -> bool {
        match self {
            DomainPayload::Flood(d) => !d.in_flood_zone,
            DomainPayload::Wetland(d) => d.wetlands.is_empty(),
            DomainPayload::Habitat(d) => d.designations.is_empty(),
            DomainPayload::AirQuality(d) => !d.nonattainment,
            DomainPayload::Karst(d) => !d.in_karst,
            DomainPayload::Cadastral(d) => d.parcel_id.is_none(),
        }
    }
}

/// Successful adapter output: the typed payload plus any artifact files the
/// adapter wrote under its workspace slice.
#[derive(Debug, Clone)]
pub struct DomainFindings {
    pub payload: DomainPayload,
    pub artifacts: Vec<PathBuf>,
}

impl DomainFindings {
    #[allow(dead_code)] // Constructor for adapters without artifacts
    pub fn new(payload: DomainPayload) -> Self {
        Self {
            payload,
            artifacts: Vec::new(),
        }
    }

    pub fn with_artifacts(payload: DomainPayload, artifacts: Vec<PathBuf>) -> Self {
        Self { payload, artifacts }
    }
}

/// Structured error recorded on a failed domain result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainError {
    /// Machine-readable kind (e.g. "timeout", "transient_upstream").
    pub kind: String,
    pub message: String,
}

/// Outcome of one adapter invocation. Created exactly once per adapter per
/// request and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainResult {
    pub domain: Domain,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<DomainPayload>,
    #[serde(default)]
    pub artifacts: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DomainError>,
    pub completed_at: DateTime<Utc>,
}

impl DomainResult {
    /// Build a successful result from adapter findings.
    pub fn success(domain: Domain, findings: DomainFindings) -> Self {
        Self {
            domain,
            success: true,
            payload: Some(findings.payload),
            artifacts: findings.artifacts,
            error: None,
            completed_at: Utc::now(),
        }
    }

    /// Build a failed result with a machine-readable error kind.
    pub fn failure(domain: Domain, kind: &str, message: impl Into<String>) -> Self {
        Self {
            domain,
            success: false,
            payload: None,
            artifacts: Vec::new(),
            error: Some(DomainError {
                kind: kind.to_string(),
                message: message.into(),
            }),
            completed_at: Utc::now(),
        }
    }
}

/// Project metadata carried at the top of the aggregated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadastral_id: Option<String>,
    pub buffer_miles: f64,
    pub generated_at: DateTime<Utc>,
}

/// One named domain section of the aggregated report. Present for every
/// registered domain whether or not its analysis succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainSection {
    pub domain: Domain,
    /// False when the domain failed and the section is a placeholder.
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DomainPayload>,
    #[serde(default)]
    pub artifacts: Vec<PathBuf>,
}

/// Rule-derived executive summary block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub highlights: Vec<String>,
    pub constraints: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Per-domain compliance checklist entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistEntry {
    pub domain: Domain,
    pub status: ComplianceStatus,
    pub risk: RiskTier,
    pub action: String,
}

/// The single normalized document combining all domain sections plus
/// derived risk and compliance data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedReport {
    pub project: ProjectInfo,
    pub sections: Vec<DomainSection>,
    pub executive_summary: ExecutiveSummary,
    pub checklist: Vec<ChecklistEntry>,
    pub overall_risk: RiskTier,
    pub risk_class: String,
}

impl AggregatedReport {
    /// Look up a section by domain.
    #[allow(dead_code)] // Utility for report consumers
    pub fn section(&self, domain: Domain) -> Option<&DomainSection> {
        self.sections.iter().find(|s| s.domain == domain)
    }
}

/// One failed domain recorded in the run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainFailure {
    pub domain: Domain,
    pub error: String,
}

/// Readiness policy for the run summary's `ready` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyPolicy {
    /// Ready when at least one domain succeeded.
    Any,
    /// Ready only when the named domain succeeded.
    Require(Domain),
}

impl ReadyPolicy {
    /// Parse a policy string: "any" or "require:<domain>".
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        if s == "any" {
            return Ok(ReadyPolicy::Any);
        }
        if let Some(key) = s.strip_prefix("require:") {
            return Domain::from_key(key)
                .map(ReadyPolicy::Require)
                .ok_or_else(|| format!("Unknown domain in ready policy: {}", key));
        }
        Err(format!("Invalid ready policy: {}", s))
    }
}

/// Derived run statistics. Never hand-edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub failures: Vec<DomainFailure>,
    /// Whether the run is ready for downstream report generation.
    pub ready: bool,
}

impl RunSummary {
    /// Derive the summary from the collected domain results.
    pub fn from_results(results: &[DomainResult], policy: &ReadyPolicy) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        let failures: Vec<DomainFailure> = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| DomainFailure {
                domain: r.domain,
                error: r
                    .error
                    .as_ref()
                    .map(|e| format!("{}: {}", e.kind, e.message))
                    .unwrap_or_else(|| "unknown".to_string()),
            })
            .collect();

        let ready = match policy {
            ReadyPolicy::Any => successful > 0,
            ReadyPolicy::Require(domain) => {
                results.iter().any(|r| r.domain == *domain && r.success)
            }
        };

        Self {
            total: results.len(),
            successful,
            failed: failures.len(),
            failures,
            ready,
        }
    }
}
