//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{AnalysisRequest, ReadyPolicy, RiskTier};
use clap::Parser;
use std::path::PathBuf;

/// EnvScreen - environmental site screening for a geographic point
///
/// Screens a WGS84 coordinate against flood, wetland, protected-species
/// habitat, air-quality, karst, and cadastral data domains concurrently,
/// and writes one aggregated, risk-annotated report into a per-run
/// workspace.
///
/// Examples:
///   envscreen --lon -66.7135 --lat 18.4058 --project "Solar Farm"
///   envscreen --lon -66.7135 --lat 18.4058 --project "Solar Farm" --buffer 2.5 --detailed
///   envscreen --lon -66.7135 --lat 18.4058 --project "Solar Farm" --workspace ./screenings/solar_farm
///   envscreen --dry-run
///   envscreen --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Site longitude in WGS84 degrees
    #[arg(
        long,
        value_name = "DEGREES",
        allow_hyphen_values = true,
        required_unless_present_any = ["init_config", "dry_run"]
    )]
    pub lon: Option<f64>,

    /// Site latitude in WGS84 degrees
    #[arg(
        long,
        value_name = "DEGREES",
        allow_hyphen_values = true,
        required_unless_present_any = ["init_config", "dry_run"]
    )]
    pub lat: Option<f64>,

    /// Project name used to derive the workspace directory
    #[arg(
        short,
        long,
        value_name = "NAME",
        required_unless_present_any = ["init_config", "dry_run"]
    )]
    pub project: Option<String>,

    /// Cadastral parcel identifier, if known
    #[arg(long, value_name = "ID")]
    pub cadastral_id: Option<String>,

    /// Search buffer around the point, in miles
    #[arg(short, long, default_value = "1.0", value_name = "MILES")]
    pub buffer: f64,

    /// Ask adapters to produce map artifacts
    #[arg(long)]
    pub maps: bool,

    /// Include extended attribute sets and raw upstream captures
    #[arg(long)]
    pub detailed: bool,

    /// Existing workspace directory to reuse instead of allocating one
    ///
    /// Multiple runs against the same directory converge on one tree.
    #[arg(short, long, value_name = "DIR", env = "ENVSCREEN_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Directory under which fresh workspaces are allocated
    #[arg(long, value_name = "DIR")]
    pub workspace_base: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .envscreen.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Per-domain analysis timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Readiness policy: "any" or "require:<domain>"
    #[arg(long, value_name = "POLICY")]
    pub ready_policy: Option<String>,

    /// Domains to leave out of this run (comma-separated)
    ///
    /// Example: --disable karst,cadastral
    #[arg(long, value_name = "DOMAINS", value_delimiter = ',')]
    pub disable: Option<Vec<String>>,

    /// Output format for the final report (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Fail when the overall risk reaches this tier
    ///
    /// Useful for CI pipelines. Exit code 2 when the threshold is reached.
    /// Values: moderate, high
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnRisk>,

    /// List the registered domains and resolved endpoints, then exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .envscreen.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary (default)
    #[default]
    Text,
    /// Aggregated report as JSON on stdout
    Json,
}

/// Risk tier threshold for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FailOnRisk {
    Moderate,
    High,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Build the analysis request, when coordinates are present.
    pub fn request(&self) -> Option<AnalysisRequest> {
        Some(AnalysisRequest {
            longitude: self.lon?,
            latitude: self.lat?,
            project_name: self.project.clone()?,
            cadastral_id: self.cadastral_id.clone(),
            buffer_miles: self.buffer,
            include_maps: self.maps,
            detailed: self.detailed,
        })
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        // Validate the readiness policy if provided
        if let Some(ref policy) = self.ready_policy {
            ReadyPolicy::parse(policy)?;
        }

        if self.buffer <= 0.0 {
            return Err("Buffer distance must be greater than zero".to_string());
        }

        // Dry runs need no coordinates
        if self.dry_run {
            return Ok(());
        }

        let request = self
            .request()
            .ok_or_else(|| "Coordinates and a project name are required".to_string())?;
        request.validate()
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Returns the risk tier threshold for --fail-on, if set.
    pub fn fail_threshold(&self) -> Option<RiskTier> {
        self.fail_on.map(|level| match level {
            FailOnRisk::Moderate => RiskTier::Moderate,
            FailOnRisk::High => RiskTier::High,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            lon: Some(-66.7135),
            lat: Some(18.4058),
            project: Some("Test Site".to_string()),
            cadastral_id: None,
            buffer: 1.0,
            maps: false,
            detailed: false,
            workspace: None,
            workspace_base: None,
            config: None,
            timeout: None,
            ready_policy: None,
            disable: None,
            format: OutputFormat::Text,
            fail_on: None,
            dry_run: false,
            init_config: false,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_valid_args() {
        let args = make_args();
        assert!(args.validate().is_ok());

        let request = args.request().unwrap();
        assert_eq!(request.longitude, -66.7135);
        assert_eq!(request.latitude, 18.4058);
        assert_eq!(request.project_name, "Test Site");
    }

    #[test]
    fn test_validation_out_of_range_coordinates() {
        let mut args = make_args();
        args.lat = Some(95.0);
        assert!(args.validate().is_err());

        args.lat = Some(18.4058);
        args.lon = Some(-200.0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_bad_ready_policy() {
        let mut args = make_args();
        args.ready_policy = Some("require:geology".to_string());
        assert!(args.validate().is_err());

        args.ready_policy = Some("require:cadastral".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_dry_run_needs_no_coordinates() {
        let mut args = make_args();
        args.lon = None;
        args.lat = None;
        args.project = None;
        assert!(args.validate().is_err());

        args.dry_run = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_fail_threshold_mapping() {
        let mut args = make_args();
        assert_eq!(args.fail_threshold(), None);

        args.fail_on = Some(FailOnRisk::Moderate);
        assert_eq!(args.fail_threshold(), Some(RiskTier::Moderate));

        args.fail_on = Some(FailOnRisk::High);
        assert_eq!(args.fail_threshold(), Some(RiskTier::High));
    }
}
