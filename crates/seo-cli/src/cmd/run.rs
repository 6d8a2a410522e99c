use crate::output::print_json;
use anyhow::Context;
use seo_core::config::PublishMode;
use seo_core::forge::GitHubClient;
use seo_core::pipeline::{check_dispatch, Pipeline, PipelineConfig, PipelineReport};
use std::path::{Path, PathBuf};

pub fn run(
    root: &Path,
    reports: &[PathBuf],
    dry_run: bool,
    mode: Option<PublishMode>,
    json: bool,
) -> anyhow::Result<()> {
    let config = super::load_config(root)?;

    let mut settings = PipelineConfig::from_config(&config, root);
    settings.dry_run |= dry_run;
    if let Some(mode) = mode {
        settings.mode = mode;
    }
    check_dispatch(&settings)?;

    let mut pipeline = Pipeline::new(settings).context("invalid validator config")?;
    match std::env::var(&config.github.token_env)
        .ok()
        .filter(|t| !t.trim().is_empty())
    {
        Some(token) => {
            pipeline = pipeline.with_forge(Box::new(GitHubClient::new(
                config.github.api_base_url.clone(),
                token,
            )));
        }
        None => tracing::debug!(env = %config.github.token_env, "no platform token"),
    }
    if let Some(service) = crate::fallback::service(&config.fallback) {
        pipeline = pipeline.with_fallback(service);
    }

    let results = pipeline.process_reports(reports);

    if json {
        print_json(&results)?;
    } else {
        for report in &results {
            print_report(report);
        }
    }

    let failed_reports = results.iter().filter(|r| !r.success).count();
    let failed_publications = results
        .iter()
        .flat_map(|r| &r.publications)
        .filter(|p| !p.is_ok())
        .count();
    if failed_reports > 0 {
        anyhow::bail!("{failed_reports} of {} report(s) failed", results.len());
    }
    if failed_publications > 0 {
        anyhow::bail!("publishing failed for {failed_publications} product(s)");
    }
    Ok(())
}

fn print_report(report: &PipelineReport) {
    let mode = match report.mode {
        PublishMode::Direct => "direct",
        PublishMode::Dispatch => "dispatch",
    };
    let dry = if report.dry_run { ", dry run" } else { "" };
    println!("{} ({mode}{dry})", report.report.display());
    println!(
        "  extracted {}, safe {}, succeeded {}{}",
        report.actions_extracted,
        report.actions_safe,
        report.actions_succeeded,
        if report.used_fallback { " (fallback parser)" } else { "" }
    );
    if let Some(error) = &report.error {
        println!("  stopped: {error}");
    }
    for item in &report.unrecognized {
        println!("  unrecognized item {}: {}", item.ordinal, first_line(&item.text));
    }
    for rejection in &report.rejected {
        println!("  rejected {}: {}", rejection.action_id, rejection.reason);
    }
    for result in &report.execution_results {
        println!("  {result}");
    }
    for publication in &report.publications {
        match (&publication.outcome, &publication.error) {
            (Some(outcome), _) => println!("  {}: {}", publication.product, outcome.summary()),
            (None, Some(error)) => println!("  {}: error: {error}", publication.product),
            (None, None) => {}
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}
