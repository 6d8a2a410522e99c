use super::PublishOutcome;
use crate::config::{GitConfig, GitHubConfig};
use crate::error::{Result, SeoError};
use crate::forge::{parse_remote, Forge, NewPullRequest, RepoRef};
use crate::git::Git;
use crate::result::ExecutionResult;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Commits applied edits on a new branch and opens a pull request.
///
/// Everything from branch creation to the pull request is one transaction:
/// on any failure the checkout returns to the branch it started on and the
/// created branch is deleted locally (and remotely once pushed) before the
/// error is returned.
pub struct PullRequestPublisher<'a> {
    forge: Option<&'a dyn Forge>,
    github: &'a GitHubConfig,
    author: &'a GitConfig,
    dry_run: bool,
}

/// How far the transaction got, for unwinding.
#[derive(Debug, Default)]
struct Progress {
    branch_created: bool,
    pushed: bool,
}

impl<'a> PullRequestPublisher<'a> {
    pub fn new(
        forge: Option<&'a dyn Forge>,
        github: &'a GitHubConfig,
        author: &'a GitConfig,
        dry_run: bool,
    ) -> Self {
        Self {
            forge,
            github,
            author,
            dry_run,
        }
    }

    /// Publish the successful results for one product checked out at
    /// `repo_root`.
    pub fn publish(
        &self,
        product: &str,
        repo_root: &Path,
        results: &[&ExecutionResult],
    ) -> Result<PublishOutcome> {
        let applied: Vec<&ExecutionResult> = results.iter().copied().filter(|r| r.success).collect();
        if applied.is_empty() {
            return Ok(PublishOutcome::nothing(format!(
                "no successful actions for {product}"
            )));
        }
        let files = changed_files(&applied);
        if files.is_empty() {
            return Ok(PublishOutcome::nothing(format!("no changed files for {product}")));
        }

        let now = Local::now();
        let title = pr_title(product, applied.len(), now);
        if self.dry_run {
            return Ok(PublishOutcome::Simulated {
                product: product.to_string(),
                description: format!("would open '{title}' with {} file(s)", files.len()),
            });
        }

        let forge = self
            .forge
            .ok_or_else(|| SeoError::MissingToken(self.github.token_env.clone()))?;
        let git = Git::open(repo_root)?.with_author(
            self.author.author_name.as_deref(),
            self.author.author_email.as_deref(),
        );
        let toplevel = std::fs::canonicalize(git.toplevel()?)?;
        let files = inside_repo(&toplevel, files);
        if files.is_empty() {
            return Ok(PublishOutcome::nothing(format!(
                "changed files for {product} are outside {}",
                toplevel.display()
            )));
        }
        let repo = parse_remote(&git.remote_url(&self.github.remote)?)?;
        let original = git.current_branch()?;
        let branch = unique_branch(&git, &branch_name(&self.github.branch_prefix, product, now));
        let body = pr_body(product, &applied, &toplevel, now);

        let mut progress = Progress::default();
        let opened = self.open(
            forge,
            &git,
            &repo,
            &branch,
            &NewPullRequest {
                title: &title,
                body: &body,
                head: &branch,
                base: &self.github.base_branch,
            },
            &files,
            &mut progress,
        );

        match opened {
            Ok(pr) => {
                if let Err(e) = git.checkout(&original) {
                    tracing::warn!(branch = %original, error = %e, "could not return to original branch");
                }
                Ok(PublishOutcome::PullRequest {
                    product: product.to_string(),
                    branch,
                    number: pr.number,
                    url: pr.html_url,
                    files: files
                        .iter()
                        .map(|f| f.strip_prefix(&toplevel).unwrap_or(f).to_path_buf())
                        .collect(),
                })
            }
            Err(e) => {
                tracing::error!(product, branch = %branch, error = %e, "publish failed, unwinding");
                self.unwind(&git, &original, &branch, &progress);
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn open(
        &self,
        forge: &dyn Forge,
        git: &Git,
        repo: &RepoRef,
        branch: &str,
        pr: &NewPullRequest<'_>,
        files: &[PathBuf],
        progress: &mut Progress,
    ) -> Result<crate::forge::PullRequest> {
        if self.github.fast_forward_base {
            git.checkout(&self.github.base_branch)?;
            git.pull_ff(&self.github.remote, &self.github.base_branch)?;
        }
        git.create_branch(branch)?;
        progress.branch_created = true;
        tracing::info!(branch, files = files.len(), "branch created");

        git.add(files)?;
        let sha = git.commit(pr.title, files)?;
        tracing::info!(branch, commit = %sha, "changes committed");

        git.push(&self.github.remote, branch)?;
        progress.pushed = true;

        let created = forge.create_pull_request(repo, pr)?;
        if !self.github.labels.is_empty() {
            if let Err(e) = forge.add_labels(repo, created.number, &self.github.labels) {
                tracing::warn!(number = created.number, error = %e, "labels not added");
            }
        }
        Ok(created)
    }

    fn unwind(&self, git: &Git, original: &str, branch: &str, progress: &Progress) {
        if let Err(e) = git.checkout(original) {
            tracing::warn!(branch = %original, error = %e, "could not return to original branch");
        }
        if progress.branch_created {
            if let Err(e) = git.delete_branch(branch) {
                tracing::warn!(branch, error = %e, "could not delete local branch");
            }
        }
        if progress.pushed {
            if let Err(e) = git.delete_remote_branch(&self.github.remote, branch) {
                tracing::warn!(branch, error = %e, "could not delete remote branch");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Naming and rendering
// ---------------------------------------------------------------------------

pub fn branch_name(prefix: &str, product: &str, now: DateTime<Local>) -> String {
    format!("{prefix}/seo-{product}-{}", now.format("%Y%m%d-%H%M%S"))
}

fn unique_branch(git: &Git, base: &str) -> String {
    let mut name = base.to_string();
    let mut n = 2;
    while git.branch_exists(&name) {
        name = format!("{base}-{n}");
        n += 1;
    }
    name
}

pub fn pr_title(product: &str, count: usize, now: DateTime<Local>) -> String {
    let noun = if count == 1 { "Improvement" } else { "Improvements" };
    format!(
        "[SEO Agent] {product}: {count} {noun} - {}",
        now.format("%Y-%m-%d")
    )
}

pub fn pr_body(
    product: &str,
    results: &[&ExecutionResult],
    toplevel: &Path,
    now: DateTime<Local>,
) -> String {
    let mut out = String::new();
    out.push_str("## SEO Agent - Automated Improvements\n\n");
    out.push_str(&format!("**Product**: `{product}`\n"));
    out.push_str(&format!("**Date**: {}\n\n", now.format("%Y-%m-%d %H:%M:%S")));

    out.push_str("## Applied Actions\n\n");
    for (i, result) in results.iter().enumerate() {
        out.push_str(&format!("### {}. {}: {}\n\n", i + 1, result.action_id, result.message));
        if !result.changed_files.is_empty() {
            out.push_str("**Changed Files:**\n");
            for file in &result.changed_files {
                out.push_str(&format!("- `{}`\n", relative(toplevel, file).display()));
            }
            out.push('\n');
        }
    }

    out.push_str("## Test Checklist\n\n");
    out.push_str("- [ ] Meta tags show the new values in the page source\n");
    out.push_str("- [ ] Pages render without errors\n");
    out.push_str("- [ ] The build passes\n");
    out.push_str("- [ ] Added links resolve\n");
    out.push_str("- [ ] SEO score is unchanged or better\n");
    out
}

fn relative(toplevel: &Path, file: &Path) -> PathBuf {
    let file = std::fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
    file.strip_prefix(toplevel)
        .map(Path::to_path_buf)
        .unwrap_or(file)
}

/// Files listed across results, first occurrence order, no duplicates.
fn changed_files(results: &[&ExecutionResult]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    for file in results.iter().flat_map(|r| &r.changed_files) {
        if !files.contains(file) {
            files.push(file.clone());
        }
    }
    files
}

/// Keep files under `toplevel` as canonical paths; warn about the rest.
fn inside_repo(toplevel: &Path, files: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut kept = Vec::new();
    for file in files {
        match std::fs::canonicalize(&file) {
            Ok(abs) if abs.starts_with(toplevel) => {
                if !kept.contains(&abs) {
                    kept.push(abs);
                }
            }
            _ => tracing::warn!(
                file = %file.display(),
                repo = %toplevel.display(),
                "file outside repository excluded from commit"
            ),
        }
    }
    kept
}
