use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressDrawTarget};
use tracing::{debug, info, warn};

use crate::aggregate;
use crate::checks::{
    ConstructorCall, DependencyResolver, DependencySpec, FunctionalProbe, IntegrationCall,
    IntegrationProbe, LaunchEntry, LaunchSurfaceChecker, ModuleImportTester, ModuleSpec,
    RequiredPath, StructuralChecker,
};
use crate::core::{Category, CheckReport, TargetInfo, ValidationOutcome};
use crate::probe::ProbeArgs;
use crate::resolve::{ModuleRegistry, ModuleResolver};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub probe_budget: Duration,
    pub integration_timeout: Option<Duration>,
    pub show_progress: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            probe_budget: Duration::from_secs(10),
            integration_timeout: None,
            show_progress: false,
        }
    }
}

/// Everything one run checks, in stage order.
pub struct ValidationPlan {
    pub name: String,
    pub root: PathBuf,
    /// Package whose version metadata labels the report.
    pub package: Option<String>,
    pub resolver: Arc<dyn ModuleResolver>,
    /// Resolver for external libraries; falls back to `resolver`.
    pub dependency_resolver: Option<Arc<dyn ModuleResolver>>,
    pub structure: Vec<RequiredPath>,
    pub dependencies: Vec<DependencySpec>,
    pub modules: Vec<ModuleSpec>,
    pub functional: Vec<ConstructorCall>,
    pub integration: Vec<IntegrationCall>,
    pub launch: Vec<LaunchEntry>,
    pub probe_args: ProbeArgs,
}

impl ValidationPlan {
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        resolver: Arc<dyn ModuleResolver>,
    ) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            package: None,
            resolver,
            dependency_resolver: None,
            structure: Vec::new(),
            dependencies: Vec::new(),
            modules: Vec::new(),
            functional: Vec::new(),
            integration: Vec::new(),
            launch: Vec::new(),
            probe_args: ProbeArgs::default(),
        }
    }

    /// Report names of every check, in execution order.
    pub fn check_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        names.extend(
            self.structure
                .iter()
                .map(|r| format!("structure: {}", r.path.display())),
        );
        names.extend(
            self.dependencies
                .iter()
                .map(|d| format!("dependency: {}", d.name)),
        );
        names.extend(
            self.modules
                .iter()
                .map(|m| format!("import: {}", m.qualified())),
        );
        names.extend(self.functional.iter().map(|c| c.name.clone()));
        names.extend(self.integration.iter().map(|c| c.name.clone()));
        names.extend(self.launch.iter().map(|e| format!("launch: {}", e.name)));
        names
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for name in self.check_names() {
            if name.trim().is_empty() {
                bail!("check names must not be empty");
            }
            if !seen.insert(name.clone()) {
                bail!("duplicate check name: {name}");
            }
        }
        Ok(())
    }
}

/// Runs the six stages against one report and aggregates the verdict.
pub struct ValidationOrchestrator {
    opts: EngineOptions,
    target: TargetInfo,
    package: Option<String>,
    resolver: Arc<dyn ModuleResolver>,
    probe_args: ProbeArgs,
    structure: StructuralChecker,
    dependencies: DependencyResolver,
    imports: ModuleImportTester,
    functional: FunctionalProbe,
    integration: IntegrationProbe,
    launch: LaunchSurfaceChecker,
}

impl ValidationOrchestrator {
    pub fn new(plan: ValidationPlan, opts: EngineOptions) -> Result<Self> {
        plan.validate()?;
        let ValidationPlan {
            name,
            root,
            package,
            resolver,
            dependency_resolver,
            structure,
            dependencies,
            modules,
            functional,
            integration,
            launch,
            probe_args,
        } = plan;

        let dependency_resolver = dependency_resolver.unwrap_or_else(|| resolver.clone());
        Ok(Self {
            target: TargetInfo {
                name,
                root: root.display().to_string(),
                version: None,
            },
            package,
            probe_args,
            structure: StructuralChecker::new(&root, structure),
            dependencies: DependencyResolver::new(dependency_resolver, dependencies),
            imports: ModuleImportTester::new(resolver.clone(), modules),
            functional: FunctionalProbe::new(resolver.clone(), functional, opts.probe_budget),
            integration: IntegrationProbe::new(resolver.clone(), integration)
                .with_timeout(opts.integration_timeout),
            launch: LaunchSurfaceChecker::new(&root, resolver.clone(), launch),
            resolver,
            opts,
        })
    }

    pub fn check_count(&self) -> usize {
        self.structure.len()
            + self.dependencies.len()
            + self.imports.len()
            + self.functional.len()
            + self.integration.len()
            + self.launch.len()
    }

    /// Only failures of the orchestrator itself are returned as `Err`; every
    /// check failure lands in the report.
    pub fn run(&self) -> Result<ValidationOutcome> {
        let started = Instant::now();
        let mut report = CheckReport::new(self.target.clone());
        let mut registry = ModuleRegistry::new();
        let progress = StageProgress::start(self.opts.show_progress);
        info!(target_name = %self.target.name, checks = self.check_count(), "validation started");

        progress.stage(Category::Structural);
        self.structure.run(&mut report);

        progress.stage(Category::Dependency);
        self.dependencies.run(&mut report);

        progress.stage(Category::Import);
        self.imports.run(&mut report, &mut registry);
        report.target.version = self.package_version(&registry);

        progress.stage(Category::Functional);
        self.functional.run(&mut report, &registry, &self.probe_args);

        progress.stage(Category::Integration);
        if !self.integration.is_empty() {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to start the integration runtime")?;
            runtime.block_on(
                self.integration
                    .run(&mut report, &registry, &self.probe_args),
            );
        }

        progress.stage(Category::LaunchSurface);
        self.launch.run(&mut report, &registry);

        progress.finish();
        report.finish(started.elapsed());
        let verdict = aggregate::assess(&report);
        info!(
            total = report.total(),
            passed = report.passed(),
            tier = verdict.tier.as_str(),
            "validation finished"
        );
        Ok(ValidationOutcome { report, verdict })
    }

    fn package_version(&self, registry: &ModuleRegistry) -> Option<String> {
        let package = self.package.as_deref()?;
        if let Some(handle) = registry.get(package) {
            return handle.version().map(str::to_string);
        }
        let resolved = panic::catch_unwind(AssertUnwindSafe(|| self.resolver.resolve(package)));
        match resolved {
            Ok(Ok(handle)) => handle.version().map(str::to_string),
            Ok(Err(err)) => {
                debug!(package, error = %err, "package metadata unavailable");
                None
            }
            Err(_) => {
                warn!(package, "resolver panicked while reading package metadata");
                None
            }
        }
    }
}

struct StageProgress {
    bar: Option<ProgressBar>,
}

impl StageProgress {
    fn start(enabled: bool) -> Self {
        if !enabled || !std::io::stderr().is_terminal() {
            return Self { bar: None };
        }
        let bar = ProgressBar::new_spinner();
        bar.set_draw_target(ProgressDrawTarget::stderr());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar: Some(bar) }
    }

    fn stage(&self, category: Category) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("Checking {}...", category.title().to_lowercase()));
        }
    }

    fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CheckOutcome, FailureKind, Tier};
    use crate::probe::{AsyncFnProbe, FnProbe, Probe};
    use crate::resolve::{LoadError, ModuleHandle, StaticResolver};
    use anyhow::anyhow;
    use std::path::Path;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn make_temp_root() -> PathBuf {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "readycheck-engine-test-{}-{seq}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("create dir");
        dir
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdirs");
        }
        std::fs::write(path, b"").expect("write");
    }

    fn resolver() -> Arc<StaticResolver> {
        Arc::new(
            StaticResolver::new()
                .with_module(ModuleHandle::new("pkg").with_metadata("version", "2.0.0"))
                .with_module(ModuleHandle::new("pkg.core").with_exports(["Engine"]))
                .with_module(ModuleHandle::new("pkg.config").with_exports(["ScanConfiguration"]))
                .with_module(ModuleHandle::new("pkg.__main__").with_exports(["main"]))
                .with_module(ModuleHandle::new("aiohttp"))
                .with_module(ModuleHandle::new("requests")),
        )
    }

    fn ok() -> Box<dyn Probe> {
        Box::new(FnProbe(|_: &ModuleHandle, _: &ProbeArgs| -> anyhow::Result<()> { Ok(()) }))
    }

    /// Ten checks, nine passing: one missing file.
    fn plan(root: &Path) -> ValidationPlan {
        touch(&root.join("pkg/__init__.py"));
        touch(&root.join("pkg/core.py"));
        touch(&root.join("run.sh"));

        let mut plan = ValidationPlan::new("pkg", root, resolver());
        plan.package = Some("pkg".to_string());
        plan.structure = vec![
            RequiredPath::file("pkg/__init__.py"),
            RequiredPath::file("pkg/core.py"),
            RequiredPath::file("setup.py"),
        ];
        plan.dependencies = vec![DependencySpec::new("aiohttp"), DependencySpec::new("requests")];
        plan.modules = vec![ModuleSpec::new("pkg", "core"), ModuleSpec::new("pkg", "config")];
        plan.functional = vec![ConstructorCall::new(
            "config",
            "pkg.config",
            "ScanConfiguration",
            ok(),
        )];
        plan.integration = vec![IntegrationCall::new(
            "engine",
            "pkg.core",
            "Engine",
            Box::new(AsyncFnProbe(|_: ModuleHandle, _: ProbeArgs| async {
                anyhow::Ok(())
            })),
        )];
        plan.launch = vec![LaunchEntry::script("script", "run.sh")];
        plan
    }

    #[test]
    fn nine_of_ten_is_excellent_with_one_remediation() {
        let root = make_temp_root();
        let engine = ValidationOrchestrator::new(plan(&root), EngineOptions::default())
            .expect("engine");
        let outcome = engine.run().expect("run");

        assert_eq!(outcome.report.total(), 10);
        assert_eq!(outcome.report.passed(), 9);
        assert_eq!(outcome.report.results().len(), outcome.report.total());
        assert!((outcome.verdict.success_rate - 0.9).abs() < f64::EPSILON);
        assert_eq!(outcome.verdict.tier, Tier::Excellent);
        assert!(outcome.is_ready());
        assert_eq!(outcome.verdict.remediations.len(), 1);
        assert_eq!(outcome.verdict.remediations[0].category, Category::Structural);
        assert_eq!(outcome.report.target.version.as_deref(), Some("2.0.0"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn results_follow_stage_order_and_repeat_deterministically() {
        let root = make_temp_root();
        let engine = ValidationOrchestrator::new(plan(&root), EngineOptions::default())
            .expect("engine");
        let first = engine.run().expect("run");
        let second = engine.run().expect("run");

        let categories: Vec<Category> = first.report.results().iter().map(|r| r.category).collect();
        let mut sorted = categories.clone();
        sorted.sort();
        assert_eq!(categories, sorted);

        let shape = |o: &ValidationOutcome| -> Vec<(String, CheckOutcome)> {
            o.report
                .results()
                .iter()
                .map(|r| (r.name.clone(), r.outcome))
                .collect()
        };
        assert_eq!(shape(&first), shape(&second));
        assert_eq!(engine.check_count(), first.report.total());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_imports_skip_dependent_calls_but_not_integration_wiring() {
        let root = make_temp_root();
        let mut plan = plan(&root);
        plan.modules.push(ModuleSpec::new("pkg", "detectors"));
        plan.functional.push(ConstructorCall::new(
            "detector",
            "pkg.detectors",
            "Detector",
            ok(),
        ));
        plan.integration = vec![
            IntegrationCall::new(
                "engine",
                "pkg.core",
                "Engine",
                Box::new(AsyncFnProbe(|_: ModuleHandle, _: ProbeArgs| async {
                    Err::<(), _>(anyhow!("no detectors registered"))
                })),
            )
            .depends_on(["pkg.detectors"]),
        ];
        let engine = ValidationOrchestrator::new(plan, EngineOptions::default()).expect("engine");
        let outcome = engine.run().expect("run");
        let report = &outcome.report;

        let detector = report
            .results()
            .iter()
            .find(|r| r.name == "detector")
            .expect("detector result");
        assert_eq!(detector.outcome, CheckOutcome::Skipped);

        let wiring = report
            .results()
            .iter()
            .find(|r| r.name == "engine")
            .expect("engine result");
        assert_eq!(wiring.outcome, CheckOutcome::Failed);
        assert_eq!(wiring.kind, Some(FailureKind::ConstructionFailure));

        let remediation: Vec<Category> = outcome
            .verdict
            .remediations
            .iter()
            .map(|r| r.category)
            .collect();
        assert_eq!(
            remediation,
            [Category::Structural, Category::Import, Category::Integration]
        );
        assert_eq!(report.errors().len(), report.total() - report.passed());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn empty_plan_is_critical() {
        let root = make_temp_root();
        let plan = ValidationPlan::new("empty", &root, Arc::new(StaticResolver::new()));
        let engine = ValidationOrchestrator::new(plan, EngineOptions::default()).expect("engine");
        let outcome = engine.run().expect("run");
        assert_eq!(outcome.report.total(), 0);
        assert_eq!(outcome.verdict.success_rate, 0.0);
        assert_eq!(outcome.verdict.tier, Tier::Critical);
        assert!(!outcome.is_ready());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn duplicate_check_names_are_rejected() {
        let root = make_temp_root();
        let mut plan = plan(&root);
        plan.dependencies.push(DependencySpec::new("aiohttp"));
        let err = ValidationOrchestrator::new(plan, EngineOptions::default())
            .err()
            .expect("duplicate rejected");
        assert!(err.to_string().contains("dependency: aiohttp"), "err={err}");

        let _ = std::fs::remove_dir_all(&root);
    }

    /// Loads modules normally but panics on symbol lookups and on the
    /// package itself.
    struct BrittleResolver(Arc<StaticResolver>);

    impl ModuleResolver for BrittleResolver {
        fn resolve(&self, name: &str) -> Result<ModuleHandle, LoadError> {
            if name == "pkg" {
                panic!("metadata table corrupted");
            }
            self.0.resolve(name)
        }

        fn resolve_symbol(&self, _: &ModuleHandle, symbol: &str) -> Result<(), LoadError> {
            panic!("no symbol table for {symbol}");
        }
    }

    #[test]
    fn resolver_panics_never_abort_the_run() {
        let root = make_temp_root();
        let mut plan = plan(&root);
        plan.resolver = Arc::new(BrittleResolver(resolver()));
        plan.dependency_resolver = Some(resolver() as Arc<dyn ModuleResolver>);
        let engine = ValidationOrchestrator::new(plan, EngineOptions::default()).expect("engine");
        let outcome = engine.run().expect("run completes");
        let report = &outcome.report;

        assert_eq!(report.total(), 10);
        assert_eq!(report.passed(), 7);
        assert_eq!(report.target.version, None);
        for name in ["config", "engine"] {
            let result = report
                .results()
                .iter()
                .find(|r| r.name == name)
                .expect("result");
            assert_eq!(result.outcome, CheckOutcome::Failed, "{name}");
            assert!(
                result
                    .detail
                    .as_deref()
                    .is_some_and(|d| d.starts_with("panicked: no symbol table for")),
                "{name}: {:?}",
                result.detail
            );
        }

        let _ = std::fs::remove_dir_all(&root);
    }
}
