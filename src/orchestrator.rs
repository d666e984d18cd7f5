//! Concurrent fan-out across the registered domain adapters.
//!
//! One unit of work is spawned per registered adapter, each bound to an
//! independent timeout, and all units are joined at a single barrier
//! before aggregation. A slow or failing adapter never blocks or cancels
//! a sibling; its domain is recorded as failed and the run continues.

use crate::adapters::AdapterRegistry;
use crate::analysis::aggregate;
use crate::error::{Result, ScreeningError};
use crate::models::{
    AggregatedReport, AnalysisRequest, Domain, DomainResult, ReadyPolicy, RunSummary,
};
use crate::report::{write_artifacts, PersistOutcome};
use crate::workspace::Workspace;
use futures::future::join_all;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything a completed screening run hands back to the caller.
#[derive(Debug)]
pub struct ScreeningOutcome {
    pub workspace: Workspace,
    /// Raw per-domain results, alongside the aggregated view.
    #[allow(dead_code)]
    pub results: Vec<DomainResult>,
    pub summary: RunSummary,
    pub report: AggregatedReport,
    pub artifacts: PersistOutcome,
}

/// Runs all registered domain analyses for one request.
pub struct Orchestrator {
    registry: AdapterRegistry,
    adapter_timeout: Duration,
    ready_policy: ReadyPolicy,
    workspace_base: PathBuf,
    workspace_override: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self {
            registry,
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
            ready_policy: ReadyPolicy::Any,
            workspace_base: PathBuf::from("."),
            workspace_override: None,
        }
    }

    /// Independent deadline applied to each adapter's unit of work.
    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    pub fn with_ready_policy(mut self, policy: ReadyPolicy) -> Self {
        self.ready_policy = policy;
        self
    }

    /// Directory under which fresh workspaces are allocated.
    pub fn with_workspace_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.workspace_base = base.into();
        self
    }

    /// Existing directory to reuse verbatim instead of allocating.
    pub fn with_workspace_override(mut self, dir: Option<PathBuf>) -> Self {
        self.workspace_override = dir;
        self
    }

    /// The registered domain keys, in registration order.
    pub fn domains(&self) -> Vec<Domain> {
        self.registry.domains()
    }

    /// Execute the full screening: workspace, fan-out, aggregation,
    /// persistence.
    ///
    /// Per-domain failures are isolated and reported in the summary; the
    /// request as a whole fails only on workspace I/O errors or when no
    /// domain succeeds.
    pub async fn run(&self, request: &AnalysisRequest) -> Result<ScreeningOutcome> {
        if self.registry.is_empty() {
            return Err(ScreeningError::Config(
                "no domain adapters are enabled".to_string(),
            ));
        }

        let workspace = Workspace::create(
            &request.project_name,
            &self.workspace_base,
            self.workspace_override.as_deref(),
        )?;

        let results = self.execute_domains(request, &workspace).await;
        let summary = RunSummary::from_results(&results, &self.ready_policy);

        info!(
            "Screening complete: {}/{} domains succeeded",
            summary.successful, summary.total
        );

        if summary.successful == 0 {
            return Err(ScreeningError::NoDomainsSucceeded {
                failed: summary.failed,
            });
        }

        let report = aggregate(request, &results);
        let artifacts = write_artifacts(&workspace, &results, &report, &summary);

        Ok(ScreeningOutcome {
            workspace,
            results,
            summary,
            report,
            artifacts,
        })
    }

    /// Fan out one task per adapter and join them all. The returned set is
    /// always in registration order, regardless of completion order.
    async fn execute_domains(
        &self,
        request: &AnalysisRequest,
        workspace: &Workspace,
    ) -> Vec<DomainResult> {
        info!("Dispatching {} domain analyses", self.registry.len());

        let tasks = self.registry.adapters().iter().map(|adapter| {
            let adapter = Arc::clone(adapter);
            let request = request.clone();
            let workspace = workspace.clone();
            let deadline = self.adapter_timeout;

            tokio::spawn(async move {
                let domain = adapter.key();
                debug!("Starting {} analysis", domain);

                match timeout(deadline, adapter.analyze(&request, &workspace)).await {
                    Ok(Ok(findings)) => DomainResult::success(domain, findings),
                    Ok(Err(e)) => {
                        warn!("{} analysis failed: {}", domain, e);
                        DomainResult::failure(domain, e.kind(), e.to_string())
                    }
                    Err(_) => {
                        warn!("{} analysis timed out after {:?}", domain, deadline);
                        DomainResult::failure(
                            domain,
                            "timeout",
                            format!("no result within {}s", deadline.as_secs()),
                        )
                    }
                }
            })
        });

        let joined = join_all(tasks).await;

        // Each adapter owns exactly one key, so collecting by domain is
        // race-free and the registry order can be re-imposed afterwards.
        let mut by_domain: HashMap<Domain, DomainResult> = HashMap::new();
        for (task, adapter) in joined.into_iter().zip(self.registry.adapters()) {
            let domain = adapter.key();
            let result = task.unwrap_or_else(|e| {
                warn!("{} analysis task aborted: {}", domain, e);
                DomainResult::failure(domain, "internal", format!("analysis task aborted: {}", e))
            });
            by_domain.insert(result.domain, result);
        }

        self.registry
            .domains()
            .into_iter()
            .map(|domain| {
                by_domain.remove(&domain).unwrap_or_else(|| {
                    DomainResult::failure(domain, "internal", "no result produced")
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::DomainAdapter;
    use crate::error::{AdapterError, AdapterResult};
    use crate::models::{
        AirQualityData, CadastralData, DomainFindings, DomainPayload, FloodData, HabitatData,
        KarstData, WetlandData,
    };
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct MockAdapter {
        domain: Domain,
        delay: Duration,
        fail: bool,
    }

    impl MockAdapter {
        fn ok(domain: Domain) -> Self {
            Self {
                domain,
                delay: Duration::ZERO,
                fail: false,
            }
        }

        fn slow(domain: Domain, delay: Duration) -> Self {
            Self {
                domain,
                delay,
                fail: false,
            }
        }

        fn failing(domain: Domain) -> Self {
            Self {
                domain,
                delay: Duration::ZERO,
                fail: true,
            }
        }

        /// Sleeps far past any test timeout, simulating a stuck upstream.
        fn hanging(domain: Domain) -> Self {
            Self::slow(domain, Duration::from_secs(600))
        }

        fn empty_payload(domain: Domain) -> DomainPayload {
            match domain {
                Domain::Flood => DomainPayload::Flood(FloodData::default()),
                Domain::Wetland => DomainPayload::Wetland(WetlandData::default()),
                Domain::Habitat => DomainPayload::Habitat(HabitatData::default()),
                Domain::AirQuality => DomainPayload::AirQuality(AirQualityData::default()),
                Domain::Karst => DomainPayload::Karst(KarstData::default()),
                Domain::Cadastral => DomainPayload::Cadastral(CadastralData::default()),
            }
        }
    }

    #[async_trait]
    impl DomainAdapter for MockAdapter {
        fn key(&self) -> Domain {
            self.domain
        }

        async fn analyze(
            &self,
            _request: &AnalysisRequest,
            _workspace: &Workspace,
        ) -> AdapterResult<DomainFindings> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(AdapterError::InvalidResponse {
                    reason: "simulated failure".to_string(),
                });
            }
            Ok(DomainFindings::new(Self::empty_payload(self.domain)))
        }
    }

    fn make_request() -> AnalysisRequest {
        AnalysisRequest {
            longitude: -66.7135,
            latitude: 18.4058,
            project_name: "Orchestrator Test".to_string(),
            cadastral_id: None,
            buffer_miles: 1.0,
            include_maps: false,
            detailed: false,
        }
    }

    fn registry(adapters: Vec<MockAdapter>) -> AdapterRegistry {
        AdapterRegistry::from_adapters(
            adapters
                .into_iter()
                .map(|a| Arc::new(a) as Arc<dyn DomainAdapter>)
                .collect(),
        )
    }

    const ALL_DOMAINS: [Domain; 6] = [
        Domain::Flood,
        Domain::Wetland,
        Domain::Habitat,
        Domain::AirQuality,
        Domain::Karst,
        Domain::Cadastral,
    ];

    #[tokio::test]
    async fn test_six_domains_two_timeouts() {
        let base = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(registry(vec![
            MockAdapter::ok(Domain::Flood),
            MockAdapter::ok(Domain::Wetland),
            MockAdapter::hanging(Domain::Habitat),
            MockAdapter::ok(Domain::AirQuality),
            MockAdapter::hanging(Domain::Karst),
            MockAdapter::ok(Domain::Cadastral),
        ]))
        .with_adapter_timeout(Duration::from_millis(200))
        .with_workspace_base(base.path());

        let outcome = orchestrator.run(&make_request()).await.unwrap();

        assert_eq!(outcome.summary.total, 6);
        assert_eq!(outcome.summary.successful, 4);
        assert_eq!(outcome.summary.failed, 2);
        assert!(outcome.summary.ready);

        assert_eq!(outcome.report.sections.len(), 6);
        let unavailable: Vec<Domain> = outcome
            .report
            .sections
            .iter()
            .filter(|s| !s.available)
            .map(|s| s.domain)
            .collect();
        assert_eq!(unavailable, vec![Domain::Habitat, Domain::Karst]);

        for domain in [Domain::Habitat, Domain::Karst] {
            let section = outcome.report.section(domain).unwrap();
            assert_eq!(section.error_kind.as_deref(), Some("timeout"));
        }
    }

    #[tokio::test]
    async fn test_results_follow_registration_order_not_completion_order() {
        let base = TempDir::new().unwrap();
        // Earlier registrations finish later; all stay within the timeout.
        let orchestrator = Orchestrator::new(registry(vec![
            MockAdapter::slow(Domain::Flood, Duration::from_millis(150)),
            MockAdapter::slow(Domain::Wetland, Duration::from_millis(100)),
            MockAdapter::slow(Domain::Habitat, Duration::from_millis(50)),
            MockAdapter::ok(Domain::AirQuality),
            MockAdapter::ok(Domain::Karst),
            MockAdapter::ok(Domain::Cadastral),
        ]))
        .with_adapter_timeout(Duration::from_secs(5))
        .with_workspace_base(base.path());

        let outcome = orchestrator.run(&make_request()).await.unwrap();

        let order: Vec<Domain> = outcome.results.iter().map(|r| r.domain).collect();
        assert_eq!(order, ALL_DOMAINS.to_vec());
        let section_order: Vec<Domain> =
            outcome.report.sections.iter().map(|s| s.domain).collect();
        assert_eq!(section_order, ALL_DOMAINS.to_vec());
    }

    #[tokio::test]
    async fn test_partial_failure_invariant() {
        let base = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(registry(vec![
            MockAdapter::ok(Domain::Flood),
            MockAdapter::failing(Domain::Wetland),
            MockAdapter::failing(Domain::Habitat),
            MockAdapter::ok(Domain::Cadastral),
        ]))
        .with_workspace_base(base.path());

        let outcome = orchestrator.run(&make_request()).await.unwrap();

        assert_eq!(
            outcome.summary.successful + outcome.summary.failed,
            outcome.summary.total
        );
        assert_eq!(outcome.summary.failed, 2);
        let failed: Vec<Domain> = outcome
            .summary
            .failures
            .iter()
            .map(|f| f.domain)
            .collect();
        assert_eq!(failed, vec![Domain::Wetland, Domain::Habitat]);
    }

    #[tokio::test]
    async fn test_failing_sibling_does_not_block_others() {
        let base = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(registry(vec![
            MockAdapter::hanging(Domain::Flood),
            MockAdapter::ok(Domain::Wetland),
        ]))
        .with_adapter_timeout(Duration::from_millis(200))
        .with_workspace_base(base.path());

        let start = std::time::Instant::now();
        let outcome = orchestrator.run(&make_request()).await.unwrap();

        // The hanging adapter is abandoned at its own deadline; the run
        // never waits for it to finish sleeping.
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(outcome.results[1].success);
        assert!(!outcome.results[0].success);
    }

    #[tokio::test]
    async fn test_zero_successes_fails_the_request() {
        let base = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(registry(vec![
            MockAdapter::failing(Domain::Flood),
            MockAdapter::failing(Domain::Wetland),
        ]))
        .with_workspace_base(base.path());

        let err = orchestrator.run(&make_request()).await.unwrap_err();
        match err {
            ScreeningError::NoDomainsSucceeded { failed } => assert_eq!(failed, 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_registry_is_a_config_error() {
        let orchestrator = Orchestrator::new(registry(vec![]));
        let err = orchestrator.run(&make_request()).await.unwrap_err();
        assert!(matches!(err, ScreeningError::Config(_)));
    }

    #[tokio::test]
    async fn test_ready_policy_requires_named_domain() {
        let base = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(registry(vec![
            MockAdapter::ok(Domain::Flood),
            MockAdapter::failing(Domain::Cadastral),
        ]))
        .with_ready_policy(ReadyPolicy::Require(Domain::Cadastral))
        .with_workspace_base(base.path());

        let outcome = orchestrator.run(&make_request()).await.unwrap();
        assert!(!outcome.summary.ready);
        assert_eq!(outcome.summary.successful, 1);
    }

    #[tokio::test]
    async fn test_workspace_override_converges_runs_on_one_tree() {
        let base = TempDir::new().unwrap();
        let shared = base.path().join("shared_site");
        std::fs::create_dir_all(&shared).unwrap();

        for _ in 0..2 {
            let orchestrator = Orchestrator::new(registry(vec![
                MockAdapter::ok(Domain::Flood),
                MockAdapter::ok(Domain::Wetland),
            ]))
            .with_workspace_base(base.path())
            .with_workspace_override(Some(shared.clone()));

            let outcome = orchestrator.run(&make_request()).await.unwrap();
            assert_eq!(outcome.workspace.root(), shared.as_path());
        }

        // No sibling tree was allocated by either run.
        let entries: Vec<_> = std::fs::read_dir(base.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(entries.len(), 1);

        let log = std::fs::read_to_string(shared.join("logs/run.log")).unwrap();
        assert_eq!(log.lines().filter(|l| l.contains("domains=")).count(), 2);
    }

    #[tokio::test]
    async fn test_artifacts_written_for_successful_domains() {
        let base = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(registry(vec![
            MockAdapter::ok(Domain::Flood),
            MockAdapter::failing(Domain::Wetland),
        ]))
        .with_workspace_base(base.path());

        let outcome = orchestrator.run(&make_request()).await.unwrap();

        let data = outcome.workspace.data_dir();
        assert!(data.join("flood_analysis.json").exists());
        assert!(!data.join("wetland_analysis.json").exists());
        assert!(data.join("template_data_structure.json").exists());
        assert!(data.join("query_summary.json").exists());
        assert!(outcome.artifacts.failed.is_empty());
    }
}
