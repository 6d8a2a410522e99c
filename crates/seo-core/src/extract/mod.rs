//! Report text → ordered list of [`Action`]s.

pub mod fallback;
pub mod grammar;

use crate::action::Action;
use crate::config::ProductConfig;
use crate::error::{Result, SeoError};
use crate::paths;
use crate::types::{ActionType, Priority};
use serde::Serialize;
use std::path::Path;

pub use fallback::CompletionService;

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// An item of the high-priority section that no keyword class recognized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnrecognizedItem {
    pub ordinal: usize,
    pub product_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    pub actions: Vec<Action>,
    pub unrecognized: Vec<UnrecognizedItem>,
    pub section_found: bool,
    pub used_fallback: bool,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ActionExtractor
// ---------------------------------------------------------------------------

pub struct ActionExtractor {
    /// `(lower-cased alias, product id)`, checked in order.
    aliases: Vec<(String, String)>,
    fallback: Option<Box<dyn CompletionService>>,
}

impl ActionExtractor {
    pub fn new(products: &[ProductConfig]) -> Self {
        let aliases = products
            .iter()
            .flat_map(|p| {
                p.aliases
                    .iter()
                    .chain(std::iter::once(&p.id))
                    .map(move |alias| (alias.to_lowercase(), p.id.clone()))
            })
            .filter(|(alias, _)| !alias.is_empty())
            .collect();
        Self {
            aliases,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, service: Box<dyn CompletionService>) -> Self {
        self.fallback = Some(service);
        self
    }

    /// Read a report file and extract its actions.
    pub fn extract_file(&self, path: &Path) -> Result<Extraction> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SeoError::ReportNotFound(path.to_path_buf()),
            _ => SeoError::Io(e),
        })?;
        Ok(self.extract(&text))
    }

    /// Deterministic parse, then the fallback parser if nothing was found.
    pub fn extract(&self, report: &str) -> Extraction {
        let mut extraction = self.parse(report);
        if extraction.actions.is_empty() {
            if let Some(service) = &self.fallback {
                tracing::info!("no actions parsed, trying fallback parser");
                extraction.actions = fallback::extract_with(service.as_ref(), report);
                extraction.used_fallback = true;
            }
        }
        if extraction.actions.is_empty() {
            tracing::warn!(
                section_found = extraction.section_found,
                unrecognized = extraction.unrecognized.len(),
                "no actions extracted"
            );
        } else {
            tracing::info!(count = extraction.actions.len(), "actions extracted");
        }
        extraction
    }

    /// Deterministic grammar only.
    pub fn parse(&self, report: &str) -> Extraction {
        let Some(section) = grammar::high_priority_section(report) else {
            tracing::warn!("no high priority section in report");
            return Extraction::default();
        };

        let mut extraction = Extraction {
            section_found: true,
            ..Extraction::default()
        };
        for (index, item) in grammar::split_items(section).into_iter().enumerate() {
            let ordinal = index + 1;
            match self.parse_item(ordinal, item) {
                Ok(action) => extraction.actions.push(action),
                Err(unrecognized) => {
                    tracing::warn!(
                        item = ordinal,
                        text = %unrecognized.text,
                        "item has no recognizable action type, skipped"
                    );
                    extraction.unrecognized.push(unrecognized);
                }
            }
        }
        extraction
    }

    fn parse_item(&self, ordinal: usize, item: &str) -> std::result::Result<Action, UnrecognizedItem> {
        let leading = grammar::leading_bracket(item);
        let product_name = grammar::responsible(item).or(leading.map(|(name, _)| name));

        let first_line = item.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
        let description = match leading {
            // Strip the leading bracket only when the product name came from it.
            Some((name, len)) if Some(name) == product_name => item[len..]
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or(first_line),
            _ => first_line,
        };

        let product_id = self.resolve_product(product_name, first_line);

        let Some(action_type) = grammar::infer_action_type(description) else {
            return Err(UnrecognizedItem {
                ordinal,
                product_id,
                text: description.to_string(),
            });
        };

        let mut action = Action::new(
            format!("action-{ordinal}"),
            Priority::High,
            description,
            product_id,
            action_type,
        )
        .with_target_file(grammar::target_file(item).map(str::to_string))
        .with_expected_impact(grammar::expected_impact(item).map(str::to_string));
        for (key, value) in parameters(action_type, description) {
            action = action.with_parameter(key, value);
        }
        Ok(action)
    }

    /// A bracket name resolves through the alias table or else to its own
    /// slug. Only an item with no bracket name falls back to an alias found
    /// in its first line, then `"unknown"`.
    fn resolve_product(&self, name: Option<&str>, first_line: &str) -> String {
        let lookup = |text: &str| {
            let text = text.to_lowercase();
            self.aliases
                .iter()
                .find(|(alias, _)| text.contains(alias.as_str()))
                .map(|(_, id)| id.clone())
        };

        match name {
            Some(name) => lookup(name)
                .or_else(|| Some(paths::slugify(name)).filter(|slug| !slug.is_empty()))
                .unwrap_or_else(|| "unknown".to_string()),
            None => lookup(first_line).unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// Map the captured value(s) of a description to the parameter keys the
/// action type expects.
fn parameters(action_type: ActionType, description: &str) -> Vec<(&'static str, String)> {
    let mut values = grammar::quoted_values(description);
    if values.is_empty() {
        values.extend(grammar::korean_value(description));
    }
    let Some(first) = values.first().copied() else {
        return Vec::new();
    };

    match action_type {
        ActionType::AddInternalLink => {
            let url = values.iter().copied().find(|v| grammar::looks_like_url(v));
            let text = values.iter().copied().find(|v| !grammar::looks_like_url(v));
            let url = url.or(text).unwrap_or(first);
            let text = text.unwrap_or(url);
            vec![("link_url", url.to_string()), ("link_text", text.to_string())]
        }
        other => vec![(other.primary_parameter(), first.to_string())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn extractor() -> ActionExtractor {
        ActionExtractor::new(&Config::default().products)
    }

    const REPORT: &str = r#"# Weekly SEO Analysis

## Overview
Traffic is up 12.5% week over week.

### 🔴 High Priority (this week)

1. **[QR Studio]** Update meta title to "Fast Free QR Codes" - File: `src/app/layout.tsx`
   - Expected effect: CTR +15%
2. Add internal link - 담당: [ConvertKits], link '/png-to-webp' as 'PNG to WebP' in `public/index.html`
3. **[Timer App]** Improve meta description to "Free online timer" in `src/app/layout.tsx`
4. **[QR Studio]** Rewrite the landing copy
5. [Blog] 타이틀을 Free QR Generator로 변경 `src/app/page.tsx`

### 🟡 Medium Priority
1. **[QR Studio]** Update canonical URL
"#;

    #[test]
    fn scenario_title_action() {
        let report = "## High Priority\n1. **[QR Studio]** Update meta title to \"Fast Free QR Codes\" - File: `src/app/layout.tsx`\n";
        let extraction = extractor().extract(report);
        assert_eq!(extraction.actions.len(), 1);
        let a = &extraction.actions[0];
        assert_eq!(a.action_type, ActionType::UpdateMetaTitle);
        assert_eq!(a.product_id, "qr-generator");
        assert_eq!(a.target_file.as_deref(), Some("src/app/layout.tsx"));
        assert_eq!(a.parameters.len(), 1);
        assert_eq!(a.parameter("new_title"), Some("Fast Free QR Codes"));
        assert_eq!(a.priority, Priority::High);
        assert!(a.description.starts_with("Update meta title"));
    }

    #[test]
    fn full_report() {
        let extraction = extractor().extract(REPORT);
        assert!(extraction.section_found);
        assert!(!extraction.used_fallback);

        let ids: Vec<_> = extraction.actions.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["action-1", "action-2", "action-3", "action-5"]);

        let first = &extraction.actions[0];
        assert_eq!(first.expected_impact.as_deref(), Some("CTR +15%"));

        let link = &extraction.actions[1];
        assert_eq!(link.action_type, ActionType::AddInternalLink);
        assert_eq!(link.product_id, "convert-image");
        assert_eq!(link.target_file.as_deref(), Some("public/index.html"));
        assert_eq!(link.parameter("link_url"), Some("/png-to-webp"));
        assert_eq!(link.parameter("link_text"), Some("PNG to WebP"));

        let timer = &extraction.actions[2];
        assert_eq!(timer.product_id, "timer-app");
        assert_eq!(timer.action_type, ActionType::UpdateMetaDescription);
        assert_eq!(timer.parameter("new_description"), Some("Free online timer"));

        let korean = &extraction.actions[3];
        assert_eq!(korean.product_id, "blog");
        assert_eq!(korean.action_type, ActionType::UpdateMetaTitle);
        assert_eq!(korean.parameter("new_title"), Some("Free QR Generator"));

        assert_eq!(extraction.unrecognized.len(), 1);
        assert_eq!(extraction.unrecognized[0].ordinal, 4);
        assert_eq!(extraction.unrecognized[0].product_id, "qr-generator");
    }

    #[test]
    fn extraction_is_deterministic() {
        let a = extractor().extract(REPORT);
        let b = extractor().extract(REPORT);
        let key = |e: &Extraction| {
            e.actions
                .iter()
                .map(|a| (a.action_type, a.product_id.clone(), a.target_file.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(key(&a), key(&b));
    }

    #[test]
    fn no_section_is_empty_not_error() {
        let extraction = extractor().extract("# Report\n\nAll good.\n");
        assert!(extraction.is_empty());
        assert!(!extraction.section_found);
    }

    #[test]
    fn unknown_product_without_bracket() {
        let extraction = extractor().extract("## High Priority\n1. Update meta title to \"X\"\n");
        assert_eq!(extraction.actions[0].product_id, "unknown");
    }

    #[test]
    fn alias_in_first_line_without_bracket() {
        let extraction =
            extractor().extract("## High Priority\n1. Update ConvertKits meta description to \"Y\"\n");
        assert_eq!(extraction.actions[0].product_id, "convert-image");
    }

    #[test]
    fn bracket_name_wins_over_alias_mentioned_in_text() {
        let extraction = extractor().extract(
            "## High Priority\n1. **[Timer]** Add internal link to QR Studio \"/qr\" - File: `src/app/layout.tsx`\n",
        );
        let a = &extraction.actions[0];
        assert_eq!(a.product_id, "timer");
        assert_eq!(a.action_type, ActionType::AddInternalLink);
    }

    #[test]
    fn configured_alias_resolves() {
        let mut products = Config::default().products;
        products.push(ProductConfig::new("pomodoro-timer", &["timer app"]));
        let extraction = ActionExtractor::new(&products).extract(REPORT);
        assert_eq!(extraction.actions[2].product_id, "pomodoro-timer");
    }

    #[test]
    fn missing_report_file() {
        let err = extractor()
            .extract_file(Path::new("/definitely/not/here.md"))
            .unwrap_err();
        assert!(matches!(err, SeoError::ReportNotFound(_)));
    }

    struct Fixed(&'static str);

    impl CompletionService for Fixed {
        fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn fallback_runs_only_when_grammar_finds_nothing() {
        let answer = r#"[{"product_id":"qr-generator","description":"Update og image","action_type":"update_og_tags","parameters":{"og_image":"/og.png"}}]"#;

        let ex = extractor().with_fallback(Box::new(Fixed(answer)));
        let extraction = ex.extract("no structure at all");
        assert!(extraction.used_fallback);
        assert_eq!(extraction.actions.len(), 1);
        assert_eq!(extraction.actions[0].action_type, ActionType::UpdateOgTags);

        let extraction = ex.extract(REPORT);
        assert!(!extraction.used_fallback);
        assert_eq!(extraction.actions.len(), 4);
    }

    #[test]
    fn link_parameters_single_value_fills_both() {
        let params = parameters(ActionType::AddInternalLink, "Add link to \"/pricing\"");
        assert_eq!(
            params,
            vec![("link_url", "/pricing".to_string()), ("link_text", "/pricing".to_string())]
        );
    }
}
