//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.envscreen.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Orchestrator settings.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Per-domain data source settings.
    #[serde(default)]
    pub domains: DomainsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory under which fresh workspaces are allocated.
    #[serde(default = "default_workspace_base")]
    pub workspace_base: String,

    /// Existing workspace directory to reuse verbatim. Overrides
    /// fresh-workspace allocation for every run.
    #[serde(default)]
    pub workspace: Option<String>,

    /// Readiness policy: "any" or "require:<domain>".
    #[serde(default = "default_ready_policy")]
    pub ready_policy: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            workspace_base: default_workspace_base(),
            workspace: None,
            ready_policy: default_ready_policy(),
            verbose: false,
        }
    }
}

fn default_workspace_base() -> String {
    "./screenings".to_string()
}

fn default_ready_policy() -> String {
    "any".to_string()
}

/// Orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Independent deadline for each domain analysis, in seconds.
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_seconds: u64,

    /// HTTP client timeout inside each adapter, in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_seconds: default_adapter_timeout(),
            http_timeout_seconds: default_http_timeout(),
        }
    }
}

fn default_adapter_timeout() -> u64 {
    60
}

fn default_http_timeout() -> u64 {
    30
}

/// One domain's data source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Feature service query endpoint.
    pub endpoint: String,

    /// Whether the domain is registered at startup.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl DomainConfig {
    fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// The fixed capability list of domain data sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainsConfig {
    #[serde(default = "default_flood")]
    pub flood: DomainConfig,
    #[serde(default = "default_wetland")]
    pub wetland: DomainConfig,
    #[serde(default = "default_habitat")]
    pub habitat: DomainConfig,
    #[serde(default = "default_air_quality")]
    pub air_quality: DomainConfig,
    #[serde(default = "default_karst")]
    pub karst: DomainConfig,
    #[serde(default = "default_cadastral")]
    pub cadastral: DomainConfig,
}

impl Default for DomainsConfig {
    fn default() -> Self {
        Self {
            flood: default_flood(),
            wetland: default_wetland(),
            habitat: default_habitat(),
            air_quality: default_air_quality(),
            karst: default_karst(),
            cadastral: default_cadastral(),
        }
    }
}

fn default_flood() -> DomainConfig {
    DomainConfig::new(
        "https://hazards.fema.gov/arcgis/rest/services/public/NFHL/MapServer/28/query",
    )
}

fn default_wetland() -> DomainConfig {
    DomainConfig::new(
        "https://fwsprimary.wim.usgs.gov/server/rest/services/Wetlands/MapServer/0/query",
    )
}

fn default_habitat() -> DomainConfig {
    DomainConfig::new(
        "https://services.arcgis.com/QVENGdaPbd4LUkLV/arcgis/rest/services/USFWS_Critical_Habitat/FeatureServer/0/query",
    )
}

fn default_air_quality() -> DomainConfig {
    DomainConfig::new(
        "https://geodata.epa.gov/arcgis/rest/services/OAR_OAQPS/NonattainmentAreas/MapServer/0/query",
    )
}

fn default_karst() -> DomainConfig {
    DomainConfig::new(
        "https://gis.pr.gov/arcgis/rest/services/Geology/Karst/MapServer/0/query",
    )
}

fn default_cadastral() -> DomainConfig {
    DomainConfig::new(
        "https://gis.jp.pr.gov/arcgis/rest/services/Catastro/Parcels/MapServer/0/query",
    )
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".envscreen.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref workspace) = args.workspace {
            self.general.workspace = Some(workspace.display().to_string());
        }
        if let Some(ref base) = args.workspace_base {
            self.general.workspace_base = base.display().to_string();
        }
        if let Some(timeout) = args.timeout {
            self.orchestrator.adapter_timeout_seconds = timeout;
        }
        if let Some(ref policy) = args.ready_policy {
            self.general.ready_policy = policy.clone();
        }

        // Domains named in --disable drop out of the capability list.
        if let Some(ref disabled) = args.disable {
            for key in disabled {
                match key.as_str() {
                    "flood" => self.domains.flood.enabled = false,
                    "wetland" => self.domains.wetland.enabled = false,
                    "habitat" => self.domains.habitat.enabled = false,
                    "air_quality" => self.domains.air_quality.enabled = false,
                    "karst" => self.domains.karst.enabled = false,
                    "cadastral" => self.domains.cadastral.enabled = false,
                    other => tracing::warn!("Ignoring unknown domain in --disable: {}", other),
                }
            }
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Enabled (domain key, endpoint) pairs in registration order.
    pub fn enabled_domains(&self) -> Vec<(&'static str, &str)> {
        let all: [(&'static str, &DomainConfig); 6] = [
            ("flood", &self.domains.flood),
            ("wetland", &self.domains.wetland),
            ("habitat", &self.domains.habitat),
            ("air_quality", &self.domains.air_quality),
            ("karst", &self.domains.karst),
            ("cadastral", &self.domains.cadastral),
        ];
        all.into_iter()
            .filter(|(_, c)| c.enabled)
            .map(|(key, c)| (key, c.endpoint.as_str()))
            .collect()
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.ready_policy, "any");
        assert_eq!(config.orchestrator.adapter_timeout_seconds, 60);
        assert!(config.domains.flood.enabled);
        assert!(config.domains.flood.endpoint.contains("NFHL"));
        assert_eq!(config.enabled_domains().len(), 6);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
workspace_base = "/srv/screenings"
ready_policy = "require:cadastral"

[orchestrator]
adapter_timeout_seconds = 120

[domains.karst]
endpoint = "http://localhost:8080/karst/query"
enabled = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.workspace_base, "/srv/screenings");
        assert_eq!(config.general.ready_policy, "require:cadastral");
        assert_eq!(config.orchestrator.adapter_timeout_seconds, 120);
        assert!(!config.domains.karst.enabled);
        // Untouched sections keep their defaults.
        assert_eq!(config.orchestrator.http_timeout_seconds, 30);
        assert!(config.domains.flood.enabled);
        assert_eq!(config.enabled_domains().len(), 5);
    }

    #[test]
    fn test_enabled_domains_order() {
        let mut config = Config::default();
        config.domains.wetland.enabled = false;

        let keys: Vec<&str> = config.enabled_domains().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec!["flood", "habitat", "air_quality", "karst", "cadastral"]
        );
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[orchestrator]"));
        assert!(toml_str.contains("[domains.flood]"));
    }
}
