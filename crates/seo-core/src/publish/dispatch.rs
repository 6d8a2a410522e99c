use super::PublishOutcome;
use crate::action::Action;
use crate::config::GitHubConfig;
use crate::error::{Result, SeoError};
use crate::forge::{Forge, RepoRef};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

pub const PAYLOAD_SOURCE: &str = "seo-agent";

/// Sends one repository-dispatch event per product.
pub struct DispatchPublisher<'a> {
    forge: Option<&'a dyn Forge>,
    github: &'a GitHubConfig,
    dry_run: bool,
}

impl<'a> DispatchPublisher<'a> {
    pub fn new(forge: Option<&'a dyn Forge>, github: &'a GitHubConfig, dry_run: bool) -> Self {
        Self {
            forge,
            github,
            dry_run,
        }
    }

    /// Send `actions` to `<owner>/<repository>`. An empty list is a no-op.
    pub fn dispatch(
        &self,
        product: &str,
        repository: &str,
        actions: &[&Action],
    ) -> Result<PublishOutcome> {
        if actions.is_empty() {
            return Ok(PublishOutcome::nothing(format!("no actions for {product}")));
        }
        if self.dry_run {
            return Ok(PublishOutcome::Simulated {
                product: product.to_string(),
                description: format!(
                    "would send '{}' with {} action(s) to {repository}",
                    self.github.event_type,
                    actions.len()
                ),
            });
        }

        let owner = self.github.owner.as_deref().ok_or(SeoError::MissingOwner)?;
        let forge = self
            .forge
            .ok_or_else(|| SeoError::MissingToken(self.github.token_env.clone()))?;
        let repo = RepoRef::new(owner, repository);

        forge.get_repository(&repo)?;
        forge.send_dispatch(&repo, &self.github.event_type, &payload(actions, Utc::now()))?;
        Ok(PublishOutcome::Dispatched {
            product: product.to_string(),
            repository: repo.to_string(),
            actions: actions.len(),
        })
    }
}

/// `client_payload` for the event.
pub fn payload(actions: &[&Action], now: DateTime<Utc>) -> Value {
    json!({
        "actions": actions,
        "source": PAYLOAD_SOURCE,
        "timestamp": now.to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}
