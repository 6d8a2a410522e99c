use crate::output::{print_json, print_table};
use anyhow::Context;
use seo_core::validate::ActionValidator;
use std::path::Path;

pub fn run(root: &Path, report: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let validator = ActionValidator::new(&config.validator).context("invalid validator config")?;
    let extraction = super::extractor(&config)
        .extract_file(report)
        .with_context(|| format!("failed to extract {}", report.display()))?;

    let verdicts: Vec<_> = extraction
        .actions
        .iter()
        .map(|a| (a, validator.validate(a)))
        .collect();

    if json {
        let value: Vec<_> = verdicts
            .iter()
            .map(|(a, v)| {
                serde_json::json!({
                    "action_id": a.id,
                    "action_type": a.action_type,
                    "target_file": a.target_file,
                    "safe": v.is_safe(),
                    "reason": v.reason(),
                })
            })
            .collect();
        return print_json(&value);
    }

    if verdicts.is_empty() {
        println!("No actions to validate.");
        return Ok(());
    }
    let rows = verdicts
        .iter()
        .map(|(a, v)| {
            vec![
                a.id.clone(),
                a.action_type.to_string(),
                if v.is_safe() { "safe" } else { "unsafe" }.to_string(),
                v.reason().to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "TYPE", "VERDICT", "REASON"], rows);
    Ok(())
}
