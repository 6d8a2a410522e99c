pub mod backups;
pub mod config;
pub mod extract;
pub mod run;
pub mod validate;

use anyhow::Context;
use seo_core::config::Config;
use seo_core::extract::ActionExtractor;
use std::path::Path;

/// The workspace config, or defaults when `config init` has not been run.
pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load_or_default(root).context("failed to load config")
}

pub fn extractor(config: &Config) -> ActionExtractor {
    let extractor = ActionExtractor::new(&config.products);
    match crate::fallback::service(&config.fallback) {
        Some(service) => extractor.with_fallback(service),
        None => extractor,
    }
}
