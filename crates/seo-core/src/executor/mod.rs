//! Per-action file mutators.
//!
//! Every executor follows the same protocol, implemented once in
//! [`ExecContext::transact`]: resolve the target inside the product
//! checkout, back it up, compute the new content from the current bytes on
//! disk, and write it in one atomic replace only when something changed.
//! A failure after the backup was taken restores the original bytes.

pub mod link;
pub mod meta;
pub mod resolve;

use crate::action::Action;
use crate::backup::BackupManager;
use crate::error::{Result, SeoError};
use crate::io;
use crate::result::{ExecutionResult, ExecutionState};
use crate::types::ActionType;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub use link::LinkExecutor;
pub use meta::MetaExecutor;
pub use resolve::{FileKind, ProductRoots};

pub trait Executor {
    fn execute(&self, action: &Action) -> ExecutionResult;
}

// ---------------------------------------------------------------------------
// ExecContext
// ---------------------------------------------------------------------------

/// Shared state for all executors in one run.
#[derive(Debug)]
pub struct ExecContext {
    pub roots: ProductRoots,
    pub backups: BackupManager,
    pub dry_run: bool,
}

/// A mutation that declines to edit: the target has no matching site or is
/// already up to date. Nothing is written and nothing needs restoring.
fn is_decline(err: &SeoError) -> bool {
    matches!(
        err,
        SeoError::MutationSiteNotFound { .. } | SeoError::NoChange(_)
    )
}

/// Outcome of the work done inside the backup scope.
enum Applied {
    Written(String),
    Declined(SeoError),
}

impl ExecContext {
    pub fn new(roots: ProductRoots, backups: BackupManager, dry_run: bool) -> Self {
        Self {
            roots,
            backups,
            dry_run,
        }
    }

    /// Resolve the action's target file.
    pub fn target_path(&self, action: &Action) -> Result<PathBuf> {
        let target = action
            .target_file
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(SeoError::MissingTargetFile)?;
        self.roots.resolve(&action.product_id, target)
    }

    /// Run the read-modify-write protocol for one action.
    ///
    /// `mutate` receives the current file content and returns the new
    /// content plus a short summary of what changed. Returning
    /// `MutationSiteNotFound` or `NoChange`, or returning identical content,
    /// ends the action without a write.
    pub fn transact<F>(&self, action: &Action, path: &Path, mutate: F) -> ExecutionResult
    where
        F: FnOnce(&str) -> Result<(String, String)>,
    {
        let started = Instant::now();

        if self.dry_run {
            tracing::info!(action = %action.id, file = %path.display(), "dry run: write skipped");
            return ExecutionResult::simulated(
                &action.id,
                format!("dry run: would update {}", path.display()),
                path.to_path_buf(),
            )
            .with_elapsed(started.elapsed());
        }

        let scoped = self.backups.with_backup(path, |_backup| {
            let current = std::fs::read_to_string(path)?;
            let (updated, summary) = match mutate(&current) {
                Ok(done) => done,
                Err(e) if is_decline(&e) => return Ok(Applied::Declined(e)),
                Err(e) => return Err(e),
            };
            if updated == current {
                return Ok(Applied::Declined(SeoError::NoChange(path.to_path_buf())));
            }
            io::atomic_write(path, updated.as_bytes())?;
            Ok(Applied::Written(summary))
        });

        let result = match scoped {
            Err(e) => ExecutionResult::failed(&action.id, &e, ExecutionState::Skipped),
            Ok(scoped) => match scoped.outcome {
                Ok(Applied::Written(summary)) => {
                    tracing::info!(
                        action = %action.id,
                        file = %path.display(),
                        summary = %summary,
                        "file updated"
                    );
                    ExecutionResult::written(&action.id, summary, path.to_path_buf(), scoped.backup)
                }
                Ok(Applied::Declined(e)) => {
                    tracing::warn!(action = %action.id, reason = %e, "no edit applied");
                    ExecutionResult::failed(&action.id, &e, ExecutionState::NoSiteFound)
                        .with_backup(Some(scoped.backup))
                }
                Err(e) => {
                    let state = if scoped.rolled_back {
                        ExecutionState::RolledBack
                    } else {
                        ExecutionState::Mutated
                    };
                    ExecutionResult::failed(&action.id, &e, state).with_backup(Some(scoped.backup))
                }
            },
        };
        result.with_elapsed(started.elapsed())
    }
}

/// Failure before any backup was taken.
pub(crate) fn skipped(action: &Action, err: &SeoError, started: Instant) -> ExecutionResult {
    tracing::warn!(action = %action.id, error = %err, "action skipped");
    ExecutionResult::failed(&action.id, err, ExecutionState::Skipped).with_elapsed(started.elapsed())
}

// ---------------------------------------------------------------------------
// Executors
// ---------------------------------------------------------------------------

/// Dispatch table from action type to executor.
pub struct Executors<'a> {
    meta: MetaExecutor<'a>,
    link: LinkExecutor<'a>,
}

impl<'a> Executors<'a> {
    pub fn new(ctx: &'a ExecContext) -> Self {
        Self {
            meta: MetaExecutor::new(ctx),
            link: LinkExecutor::new(ctx),
        }
    }

    pub fn for_type(&self, action_type: ActionType) -> &dyn Executor {
        match action_type {
            ActionType::UpdateMetaTitle
            | ActionType::UpdateMetaDescription
            | ActionType::UpdateCanonicalUrl
            | ActionType::UpdateOgTags => &self.meta,
            ActionType::AddInternalLink => &self.link,
        }
    }

    /// Run actions strictly in order; each one sees the file content left by
    /// the previous one.
    pub fn execute_all(&self, actions: &[Action]) -> Vec<ExecutionResult> {
        actions
            .iter()
            .map(|action| {
                tracing::info!(
                    action = %action.id,
                    action_type = %action.action_type,
                    product = %action.product_id,
                    "executing"
                );
                self.for_type(action.action_type).execute(action)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;
    use tempfile::TempDir;

    fn context(dir: &TempDir, dry_run: bool) -> ExecContext {
        ExecContext::new(
            ProductRoots::new(dir.path().join("products")),
            BackupManager::new(dir.path().join("backups")),
            dry_run,
        )
    }

    fn write_product_file(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
        let path = dir.path().join("products/qr-generator").join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn title_action(file: &str) -> Action {
        Action::new(
            "action-1",
            Priority::High,
            "Update meta title",
            "qr-generator",
            ActionType::UpdateMetaTitle,
        )
        .with_target_file(Some(file.to_string()))
        .with_parameter("new_title", "New Title")
    }

    #[test]
    fn dispatch_table_is_exhaustive() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, false);
        let executors = Executors::new(&ctx);
        for t in ActionType::all() {
            // Every type maps to an executor that fails cleanly on a missing target.
            let action = Action::new("a", Priority::High, "d", "qr-generator", *t);
            let result = executors.for_type(*t).execute(&action);
            assert!(!result.success);
            assert_eq!(result.state, ExecutionState::Skipped);
        }
    }

    #[test]
    fn sequential_actions_on_same_file_both_apply() {
        let dir = TempDir::new().unwrap();
        let path = write_product_file(
            &dir,
            "src/app/layout.tsx",
            "export const metadata = {\n  title: \"Old Title\",\n  description: \"Old description\",\n};\n",
        );
        let ctx = context(&dir, false);
        let executors = Executors::new(&ctx);

        let desc = Action::new(
            "action-2",
            Priority::High,
            "Update meta description",
            "qr-generator",
            ActionType::UpdateMetaDescription,
        )
        .with_target_file(Some("src/app/layout.tsx".into()))
        .with_parameter("new_description", "New description");

        let results = executors.execute_all(&[title_action("src/app/layout.tsx"), desc]);
        assert!(results.iter().all(|r| r.success));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("title: \"New Title\""));
        assert!(content.contains("description: \"New description\""));
    }

    #[test]
    fn dry_run_has_no_side_effects() {
        let dir = TempDir::new().unwrap();
        let path = write_product_file(&dir, "src/app/layout.tsx", "title: \"Old Title\"\n");
        let ctx = context(&dir, true);

        let result = Executors::new(&ctx)
            .for_type(ActionType::UpdateMetaTitle)
            .execute(&title_action("src/app/layout.tsx"));

        assert!(result.success);
        assert_eq!(result.state, ExecutionState::Simulated);
        assert_eq!(result.changed_files, vec![path.clone()]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "title: \"Old Title\"\n");
        assert!(!dir.path().join("backups").exists());
    }

    #[test]
    fn failing_mutation_rolls_back() {
        let dir = TempDir::new().unwrap();
        let path = write_product_file(&dir, "index.html", "<title>x</title>");
        let ctx = context(&dir, false);
        let action = title_action("index.html");

        let result = ctx.transact(&action, &path, |_| {
            std::fs::write(&path, "clobbered")?;
            Err(SeoError::Io(std::io::Error::other("disk full")))
        });

        assert!(!result.success);
        assert_eq!(result.state, ExecutionState::RolledBack);
        assert_eq!(result.error.as_deref(), Some("Io"));
        assert!(result.backup_path.is_some());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<title>x</title>");
    }

    #[test]
    fn identical_output_is_no_change() {
        let dir = TempDir::new().unwrap();
        let path = write_product_file(&dir, "index.html", "<title>x</title>");
        let ctx = context(&dir, false);

        let result = ctx.transact(&title_action("index.html"), &path, |current| {
            Ok((current.to_string(), "nothing".to_string()))
        });

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("NoChange"));
        assert_eq!(result.state, ExecutionState::NoSiteFound);
    }
}
