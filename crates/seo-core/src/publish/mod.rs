//! Terminal stage: hand the applied edits to the product repositories.
//!
//! [`PullRequestPublisher`] commits the locally edited files on a fresh
//! branch and opens a pull request. [`DispatchPublisher`] sends the safe
//! actions to the product repository as a repository-dispatch event and
//! lets that repository's workflow apply them.

pub mod dispatch;
pub mod pull_request;

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use dispatch::DispatchPublisher;
pub use pull_request::PullRequestPublisher;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PublishOutcome {
    /// Recoverable: there was nothing to commit or send.
    NothingToPublish { reason: String },
    PullRequest {
        product: String,
        branch: String,
        number: u64,
        url: String,
        files: Vec<PathBuf>,
    },
    Dispatched {
        product: String,
        repository: String,
        actions: usize,
    },
    Simulated { product: String, description: String },
}

impl PublishOutcome {
    pub(crate) fn nothing(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(reason = %reason, "nothing to publish");
        PublishOutcome::NothingToPublish { reason }
    }

    /// PR URL or dispatch target, for one-line summaries.
    pub fn summary(&self) -> String {
        match self {
            PublishOutcome::NothingToPublish { reason } => format!("nothing to publish ({reason})"),
            PublishOutcome::PullRequest { url, .. } => url.clone(),
            PublishOutcome::Dispatched {
                repository,
                actions,
                ..
            } => format!("dispatched {actions} action(s) to {repository}"),
            PublishOutcome::Simulated { description, .. } => format!("dry run: {description}"),
        }
    }
}

/// Group items by product id, keeping their relative order.
pub fn group_by_product<'a, T, F>(items: &'a [T], product_of: F) -> BTreeMap<String, Vec<&'a T>>
where
    F: Fn(&T) -> &str,
{
    let mut groups: BTreeMap<String, Vec<&'a T>> = BTreeMap::new();
    for item in items {
        groups
            .entry(product_of(item).to_string())
            .or_default()
            .push(item);
    }
    groups
}
