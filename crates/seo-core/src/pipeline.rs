//! Report → extract → validate → execute → publish.
//!
//! [`Pipeline::process_report`] never returns an error: every failure is
//! recorded in the [`PipelineReport`] it returns. Per-action failures never
//! abort the batch and per-product publish failures never affect other
//! products. Only a report with no extractable or no safe actions ends the
//! run early.

use crate::action::Action;
use crate::backup::BackupManager;
use crate::config::{
    Config, GitConfig, GitHubConfig, ProductConfig, PublishMode, ValidatorConfig,
};
use crate::error::{Result, SeoError};
use crate::executor::{ExecContext, Executors, ProductRoots};
use crate::extract::{ActionExtractor, CompletionService, UnrecognizedItem};
use crate::forge::Forge;
use crate::publish::{group_by_product, DispatchPublisher, PublishOutcome, PullRequestPublisher};
use crate::result::ExecutionResult;
use crate::validate::ActionValidator;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Everything the pipeline needs, resolved once by the caller.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub dry_run: bool,
    pub mode: PublishMode,
    pub roots: ProductRoots,
    pub backups_dir: PathBuf,
    /// Backups older than this are pruned after a run.
    pub backup_retention: Option<Duration>,
    pub github: GitHubConfig,
    pub git: GitConfig,
    pub validator: ValidatorConfig,
    pub products: Vec<ProductConfig>,
}

impl PipelineConfig {
    pub fn from_config(config: &Config, root: &Path) -> Self {
        let retention = match config.backup.retention_days {
            0 => None,
            days => Some(Duration::from_secs(u64::from(days) * 24 * 60 * 60)),
        };
        Self {
            dry_run: config.dry_run,
            mode: config.publish,
            roots: ProductRoots::from_config(config, root),
            backups_dir: config.backup.resolve_dir(root),
            backup_retention: retention,
            github: config.github.clone(),
            git: config.git.clone(),
            validator: config.validator.clone(),
            products: config.products.clone(),
        }
    }

    /// Platform repository name for a product.
    pub fn repository_for<'a>(&'a self, product_id: &'a str) -> &'a str {
        self.products
            .iter()
            .find(|p| p.id == product_id)
            .and_then(|p| p.repository.as_deref())
            .unwrap_or(product_id)
    }
}

// ---------------------------------------------------------------------------
// PipelineReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub action_id: String,
    pub reason: String,
}

/// Publish result for one product.
#[derive(Debug, Clone, Serialize)]
pub struct Publication {
    pub product: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<PublishOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl Publication {
    fn from_result(product: &str, result: Result<PublishOutcome>) -> Self {
        match result {
            Ok(outcome) => {
                tracing::info!(product, result = %outcome.summary(), "published");
                Self {
                    product: product.to_string(),
                    outcome: Some(outcome),
                    error: None,
                    error_kind: None,
                }
            }
            Err(e) => {
                tracing::error!(product, error = %e, "publish failed");
                Self {
                    product: product.to_string(),
                    outcome: None,
                    error: Some(e.to_string()),
                    error_kind: Some(e.kind().to_string()),
                }
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub report: PathBuf,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub mode: PublishMode,
    pub dry_run: bool,
    pub used_fallback: bool,
    pub actions_extracted: usize,
    pub actions_safe: usize,
    pub rejected: Vec<Rejection>,
    pub unrecognized: Vec<UnrecognizedItem>,
    pub actions_succeeded: usize,
    pub execution_results: Vec<ExecutionResult>,
    pub publications: Vec<Publication>,
}

impl PipelineReport {
    fn new(report: &Path, config: &PipelineConfig) -> Self {
        Self {
            report: report.to_path_buf(),
            success: false,
            error: None,
            mode: config.mode,
            dry_run: config.dry_run,
            used_fallback: false,
            actions_extracted: 0,
            actions_safe: 0,
            rejected: Vec::new(),
            unrecognized: Vec::new(),
            actions_succeeded: 0,
            execution_results: Vec::new(),
            publications: Vec::new(),
        }
    }

    fn stop(mut self, error: impl Into<String>) -> Self {
        let error = error.into();
        tracing::warn!(report = %self.report.display(), reason = %error, "pipeline stopped");
        self.error = Some(error);
        self
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    config: PipelineConfig,
    extractor: ActionExtractor,
    validator: ActionValidator,
    forge: Option<Box<dyn Forge>>,
}

impl Pipeline {
    /// Fails only when a safe-file pattern does not compile.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let validator = ActionValidator::new(&config.validator)?;
        let extractor = ActionExtractor::new(&config.products);
        Ok(Self {
            config,
            extractor,
            validator,
            forge: None,
        })
    }

    pub fn with_forge(mut self, forge: Box<dyn Forge>) -> Self {
        self.forge = Some(forge);
        self
    }

    pub fn with_fallback(mut self, service: Box<dyn CompletionService>) -> Self {
        self.extractor = self.extractor.with_fallback(service);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one report through every stage.
    pub fn process_report(&self, path: &Path) -> PipelineReport {
        let mut report = PipelineReport::new(path, &self.config);
        tracing::info!(
            report = %path.display(),
            mode = ?self.config.mode,
            dry_run = self.config.dry_run,
            "processing report"
        );

        let extraction = match self.extractor.extract_file(path) {
            Ok(extraction) => extraction,
            Err(e) => return report.stop(e.to_string()),
        };
        report.actions_extracted = extraction.actions.len();
        report.used_fallback = extraction.used_fallback;
        report.unrecognized = extraction.unrecognized;
        if extraction.actions.is_empty() {
            return report.stop("no actions extracted from report");
        }

        let mut actions = extraction.actions;
        let safe = self.validator.filter_safe(&mut actions);
        report.rejected = actions
            .iter()
            .filter(|a| !a.is_automatable)
            .map(|a| Rejection {
                action_id: a.id.clone(),
                reason: a.automation_reason.clone().unwrap_or_default(),
            })
            .collect();
        report.actions_safe = safe.len();
        if safe.is_empty() {
            return report.stop("no safe actions");
        }

        match self.config.mode {
            PublishMode::Direct => self.execute_and_open(&safe, &mut report),
            PublishMode::Dispatch => self.dispatch(&safe, &mut report),
        }
        report.success = true;
        report
    }

    /// Run reports one after another.
    pub fn process_reports(&self, paths: &[PathBuf]) -> Vec<PipelineReport> {
        let reports: Vec<_> = paths.iter().map(|p| self.process_report(p)).collect();
        let succeeded = reports.iter().filter(|r| r.success).count();
        let applied: usize = reports.iter().map(|r| r.actions_succeeded).sum();
        tracing::info!(
            reports = reports.len(),
            succeeded,
            actions_succeeded = applied,
            "all reports processed"
        );
        reports
    }

    fn execute_and_open(&self, safe: &[Action], report: &mut PipelineReport) {
        let ctx = ExecContext::new(
            self.config.roots.clone(),
            BackupManager::new(&self.config.backups_dir),
            self.config.dry_run,
        );
        let results = Executors::new(&ctx).execute_all(safe);
        report.actions_succeeded = results.iter().filter(|r| r.success).count();

        let publisher = PullRequestPublisher::new(
            self.forge.as_deref(),
            &self.config.github,
            &self.config.git,
            self.config.dry_run,
        );
        for (product, group) in group_by_product(safe, |a| &a.product_id) {
            let product_results: Vec<&ExecutionResult> = results
                .iter()
                .filter(|r| group.iter().any(|a| a.id == r.action_id))
                .collect();
            let root = self.config.roots.root_for(&product);
            let outcome = publisher.publish(&product, &root, &product_results);
            report.publications.push(Publication::from_result(&product, outcome));
        }
        report.execution_results = results;

        if let (false, Some(max_age)) = (self.config.dry_run, self.config.backup_retention) {
            if let Err(e) = ctx.backups.prune(max_age) {
                tracing::warn!(error = %e, "backup pruning failed");
            }
        }
    }

    fn dispatch(&self, safe: &[Action], report: &mut PipelineReport) {
        let publisher =
            DispatchPublisher::new(self.forge.as_deref(), &self.config.github, self.config.dry_run);
        for (product, group) in group_by_product(safe, |a| &a.product_id) {
            let repository = self.config.repository_for(&product);
            let outcome = publisher.dispatch(&product, repository, &group);
            if let Ok(PublishOutcome::Dispatched { actions, .. }) = &outcome {
                report.actions_succeeded += actions;
            }
            report.publications.push(Publication::from_result(&product, outcome));
        }
    }
}

/// Reject a dispatch configuration that cannot address any repository.
pub fn check_dispatch(config: &PipelineConfig) -> Result<()> {
    if config.mode == PublishMode::Dispatch && !config.dry_run && config.github.owner.is_none() {
        return Err(SeoError::MissingOwner);
    }
    Ok(())
}
