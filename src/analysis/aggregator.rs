//! Result aggregation and schema mapping.
//!
//! Maps the orchestrator's raw `DomainResult` set into the single
//! normalized `AggregatedReport`. Every registered domain gets a section
//! in registration order; failed domains get an explicit unavailable
//! marker. The executive summary and compliance checklist are derived
//! from a small per-domain rule table, never free-form.

use crate::analysis::risk;
use crate::models::{
    AggregatedReport, AnalysisRequest, ChecklistEntry, ComplianceStatus, DomainPayload,
    DomainResult, DomainSection, ExecutiveSummary, ProjectInfo, RiskTier,
};
use chrono::Utc;
use tracing::warn;

/// Habitat designations closer than this require agency consultation.
const CONSULTATION_RADIUS_MILES: f64 = 2.0;
/// Wetlands closer than this push the domain from moderate to high risk.
const WETLAND_PROXIMITY_MILES: f64 = 0.25;

/// One rule-triggered sentence, routed to its summary block.
enum Sentence {
    Highlight(String),
    Constraint(String),
    Recommendation(String),
}

/// Outcome of assessing one domain section against its rule table.
struct Assessment {
    sentences: Vec<Sentence>,
    status: ComplianceStatus,
    risk: RiskTier,
    action: String,
}

impl Assessment {
    fn compliant(highlight: String, action: &str) -> Self {
        Self {
            sentences: vec![Sentence::Highlight(highlight)],
            status: ComplianceStatus::Compliant,
            risk: RiskTier::Low,
            action: action.to_string(),
        }
    }
}

/// Build the aggregated report from the ordered domain results.
///
/// `results` must already be in registration order; the section order of
/// the report mirrors it exactly.
pub fn aggregate(request: &AnalysisRequest, results: &[DomainResult]) -> AggregatedReport {
    let sections: Vec<DomainSection> = results.iter().map(section_from_result).collect();

    let mut summary = ExecutiveSummary::default();
    let mut checklist = Vec::with_capacity(sections.len());

    for section in &sections {
        let assessment = assess_section(section);
        for sentence in assessment.sentences {
            match sentence {
                Sentence::Highlight(s) => summary.highlights.push(s),
                Sentence::Constraint(s) => summary.constraints.push(s),
                Sentence::Recommendation(s) => summary.recommendations.push(s),
            }
        }
        checklist.push(ChecklistEntry {
            domain: section.domain,
            status: assessment.status,
            risk: assessment.risk,
            action: assessment.action,
        });
    }

    let (overall_risk, risk_class) = risk::classify(&checklist);

    AggregatedReport {
        project: ProjectInfo {
            name: request.project_name.clone(),
            longitude: request.longitude,
            latitude: request.latitude,
            cadastral_id: request.cadastral_id.clone(),
            buffer_miles: request.buffer_miles,
            generated_at: Utc::now(),
        },
        sections,
        executive_summary: summary,
        checklist,
        overall_risk,
        risk_class,
    }
}

fn section_from_result(result: &DomainResult) -> DomainSection {
    if result.success {
        if result.payload.is_none() {
            // A successful result should always carry a payload; map the
            // hole to an empty section rather than failing the run.
            warn!(
                "Domain {} succeeded without a payload, marking unavailable",
                result.domain
            );
        }
        DomainSection {
            domain: result.domain,
            available: result.payload.is_some(),
            error_kind: None,
            data: result.payload.clone(),
            artifacts: result.artifacts.clone(),
        }
    } else {
        DomainSection {
            domain: result.domain,
            available: false,
            error_kind: result
                .error
                .as_ref()
                .map(|e| e.kind.clone())
                .or_else(|| Some("unknown".to_string())),
            data: None,
            artifacts: Vec::new(),
        }
    }
}

fn assess_section(section: &DomainSection) -> Assessment {
    let Some(data) = &section.data else {
        // Unavailable data adds no risk, but the gap itself needs review.
        return Assessment {
            sentences: vec![Sentence::Recommendation(format!(
                "Re-run the {} analysis; its data source was unavailable.",
                section.domain
            ))],
            status: ComplianceStatus::Review,
            risk: RiskTier::Low,
            action: format!("Re-run the {} analysis", section.domain),
        };
    };

    match data {
        DomainPayload::Flood(d) => {
            if !d.in_flood_zone {
                let zone = d.zone.as_deref().unwrap_or("unmapped");
                return Assessment::compliant(
                    format!("Site is outside the special flood hazard area (zone {}).", zone),
                    "No floodplain development permit expected",
                );
            }
            let zone = d.zone.as_deref().unwrap_or("unknown");
            let mut sentences = vec![Sentence::Constraint(format!(
                "Site lies in flood zone {}.",
                zone
            ))];
            if let Some(bfe) = d.base_flood_elevation_ft {
                sentences.push(Sentence::Constraint(format!(
                    "Base flood elevation is {:.1} ft.",
                    bfe
                )));
            }
            sentences.push(Sentence::Recommendation(
                "Obtain an elevation certificate and floodplain development permit.".to_string(),
            ));
            Assessment {
                sentences,
                status: ComplianceStatus::Review,
                // Coastal V zones carry wave action on top of inundation.
                risk: if zone.starts_with('V') {
                    RiskTier::High
                } else {
                    RiskTier::Moderate
                },
                action: "Floodplain permit and elevation review required".to_string(),
            }
        }
        DomainPayload::Wetland(d) => {
            if d.wetlands.is_empty() {
                return Assessment::compliant(
                    "No mapped wetlands within the search buffer.".to_string(),
                    "No wetland permitting expected",
                );
            }
            let near = d
                .nearest_distance_miles
                .map(|m| m < WETLAND_PROXIMITY_MILES)
                .unwrap_or(false);
            Assessment {
                sentences: vec![
                    Sentence::Constraint(format!(
                        "{} mapped wetland(s) within the search buffer.",
                        d.wetlands.len()
                    )),
                    Sentence::Recommendation(
                        "Commission a wetland delineation survey before earthwork.".to_string(),
                    ),
                ],
                status: ComplianceStatus::Review,
                risk: if near { RiskTier::High } else { RiskTier::Moderate },
                action: "Wetland delineation and Section 404 screening".to_string(),
            }
        }
        DomainPayload::Habitat(d) => {
            if d.designations.is_empty() {
                return Assessment::compliant(
                    "No critical habitat designations near the site.".to_string(),
                    "No species consultation expected",
                );
            }
            let species: Vec<&str> =
                d.designations.iter().map(|h| h.species.as_str()).collect();
            let within_consultation = d
                .nearest_distance_miles
                .map(|m| m < CONSULTATION_RADIUS_MILES)
                .unwrap_or(true);
            Assessment {
                sentences: vec![
                    Sentence::Constraint(format!(
                        "Critical habitat designated nearby for: {}.",
                        species.join(", ")
                    )),
                    Sentence::Recommendation(
                        "Initiate informal consultation with the wildlife agency.".to_string(),
                    ),
                ],
                status: ComplianceStatus::Review,
                risk: if within_consultation {
                    RiskTier::High
                } else {
                    RiskTier::Moderate
                },
                action: "Species consultation required".to_string(),
            }
        }
        DomainPayload::AirQuality(d) => {
            if !d.nonattainment {
                return Assessment::compliant(
                    "Site is in an attainment area for all criteria pollutants.".to_string(),
                    "No air-quality conformity review expected",
                );
            }
            Assessment {
                sentences: vec![Sentence::Constraint(format!(
                    "Site is in a nonattainment area for: {}.",
                    d.pollutants.join(", ")
                ))],
                status: ComplianceStatus::Review,
                risk: RiskTier::Moderate,
                action: "General conformity applicability review".to_string(),
            }
        }
        DomainPayload::Karst(d) => {
            if !d.in_karst {
                return Assessment::compliant(
                    "Site does not intersect mapped karst geology.".to_string(),
                    "No geotechnical karst study expected",
                );
            }
            let formation = d.formation.as_deref().unwrap_or("unnamed formation");
            Assessment {
                sentences: vec![
                    Sentence::Constraint(format!(
                        "Site intersects mapped karst ({}).",
                        formation
                    )),
                    Sentence::Recommendation(
                        "Commission a geotechnical study for sinkhole risk.".to_string(),
                    ),
                ],
                status: ComplianceStatus::Review,
                risk: RiskTier::Moderate,
                action: "Geotechnical karst evaluation".to_string(),
            }
        }
        DomainPayload::Cadastral(d) => match &d.parcel_id {
            Some(id) => {
                let muni = d.municipality.as_deref().unwrap_or("unknown municipality");
                Assessment::compliant(
                    format!("Parcel {} identified in {}.", id, muni),
                    "Confirm ownership and zoning with the property registry",
                )
            }
            None => Assessment::compliant(
                "No parcel record found for the site coordinates.".to_string(),
                "Provide a cadastral id to enable parcel verification",
            ),
        },
    }
}
