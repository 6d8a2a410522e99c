use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, report: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let extraction = super::extractor(&config)
        .extract_file(report)
        .with_context(|| format!("failed to extract {}", report.display()))?;

    if json {
        return print_json(&extraction);
    }

    if extraction.actions.is_empty() {
        if extraction.section_found {
            println!("No actions found in the high priority section.");
        } else {
            println!("No high priority section found.");
        }
    } else {
        let rows = extraction
            .actions
            .iter()
            .map(|a| {
                let params = a
                    .parameters
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                vec![
                    a.id.clone(),
                    a.action_type.to_string(),
                    a.product_id.clone(),
                    a.target_file.clone().unwrap_or_else(|| "-".into()),
                    truncate(&params, 60),
                ]
            })
            .collect();
        print_table(&["ID", "TYPE", "PRODUCT", "TARGET", "PARAMETERS"], rows);
    }

    for item in &extraction.unrecognized {
        println!(
            "unrecognized item {} ({}): {}",
            item.ordinal,
            item.product_id,
            truncate(item.text.lines().next().unwrap_or_default().trim(), 80)
        );
    }
    if extraction.used_fallback {
        println!("(actions produced by the fallback parser)");
    }
    Ok(())
}
