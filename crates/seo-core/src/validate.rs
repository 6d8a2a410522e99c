//! Safety gate between extraction and execution.
//!
//! Gates run in order and the first failure wins:
//! 1. the action type is on the whitelist,
//! 2. the product id is a slug naming one checkout below the products root,
//! 3. the target file is a relative path inside the product and matches a
//!    safe-file pattern,
//! 4. no parameter value and not the description contains dangerous content.

use crate::action::Action;
use crate::config::ValidatorConfig;
use crate::error::{Result, SeoError};
use crate::paths;
use crate::types::ActionType;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Safe,
    Unsafe(String),
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe)
    }

    pub fn reason(&self) -> &str {
        match self {
            Verdict::Safe => "passed all safety checks",
            Verdict::Unsafe(reason) => reason,
        }
    }
}

// ---------------------------------------------------------------------------
// Dangerous patterns
// ---------------------------------------------------------------------------

const DANGEROUS: &[(&str, &str)] = &[
    ("script tag", r"<script[^>]*>"),
    ("javascript URI", r"javascript:"),
    ("eval call", r"\beval\s*\("),
    ("innerHTML sink", r"innerHTML"),
    ("outerHTML sink", r"outerHTML"),
    ("document.write", r"document\.write"),
    ("inline event handler", r"\bon[a-z]+\s*="),
    ("__proto__ key", r"__proto__"),
    ("constructor indexing", r"constructor\s*\["),
];

fn dangerous_patterns() -> &'static [(&'static str, Regex)] {
    static RE: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    RE.get_or_init(|| {
        DANGEROUS
            .iter()
            .map(|(name, pattern)| {
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .unwrap();
                (*name, re)
            })
            .collect()
    })
}

/// Name of the first dangerous pattern found in `text`.
pub fn find_dangerous(text: &str) -> Option<&'static str> {
    dangerous_patterns()
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(name, _)| *name)
}

/// True for paths that escape the product root: any `..`, or a path rooted
/// at `/`, `\` or a drive letter.
pub fn is_traversal(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.contains("..")
        || path.starts_with('/')
        || path.starts_with('\\')
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

// ---------------------------------------------------------------------------
// ActionValidator
// ---------------------------------------------------------------------------

pub struct ActionValidator {
    allowed: Vec<ActionType>,
    safe_files: Vec<Regex>,
}

impl ActionValidator {
    pub fn new(config: &ValidatorConfig) -> Result<Self> {
        let safe_files = config
            .safe_file_patterns
            .iter()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| SeoError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            allowed: config.allowed_action_types.clone(),
            safe_files,
        })
    }

    pub fn is_safe_file(&self, path: &str) -> bool {
        if is_traversal(path) {
            return false;
        }
        self.safe_files.iter().any(|re| re.is_match(path))
    }

    pub fn validate(&self, action: &Action) -> Verdict {
        if !self.allowed.contains(&action.action_type) {
            return Verdict::Unsafe(format!(
                "action type '{}' is not allowed",
                action.action_type
            ));
        }

        if !paths::is_slug(&action.product_id) {
            return Verdict::Unsafe(format!(
                "product id '{}' is not a plain identifier",
                action.product_id
            ));
        }

        if let Some(target) = action.target_file.as_deref() {
            if is_traversal(target) {
                return Verdict::Unsafe(format!("path traversal in target file '{target}'"));
            }
            if !self.is_safe_file(target) {
                return Verdict::Unsafe(format!("target file '{target}' is not on the safe list"));
            }
        }

        for (key, value) in &action.parameters {
            if let Some(name) = find_dangerous(value) {
                return Verdict::Unsafe(format!("dangerous pattern ({name}) in parameter '{key}'"));
            }
        }
        if let Some(name) = find_dangerous(&action.description) {
            return Verdict::Unsafe(format!("dangerous pattern ({name}) in description"));
        }

        Verdict::Safe
    }

    /// Mark every action with its verdict and return the safe ones.
    pub fn filter_safe(&self, actions: &mut [Action]) -> Vec<Action> {
        let mut safe = Vec::new();
        for action in actions.iter_mut() {
            let verdict = self.validate(action);
            action.mark(verdict.is_safe(), verdict.reason());
            if verdict.is_safe() {
                tracing::debug!(action = %action.id, "action passed validation");
                safe.push(action.clone());
            } else {
                tracing::warn!(
                    action = %action.id,
                    reason = %verdict.reason(),
                    "action rejected"
                );
            }
        }
        tracing::info!(total = actions.len(), safe = safe.len(), "validation complete");
        safe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;

    fn validator() -> ActionValidator {
        ActionValidator::new(&ValidatorConfig::default()).unwrap()
    }

    fn title(file: Option<&str>, value: &str) -> Action {
        Action::new(
            "action-1",
            Priority::High,
            "Update meta title",
            "qr-generator",
            ActionType::UpdateMetaTitle,
        )
        .with_target_file(file.map(str::to_string))
        .with_parameter("new_title", value)
    }

    #[test]
    fn plain_title_is_safe() {
        let v = validator().validate(&title(Some("src/app/layout.tsx"), "Fast Free QR Codes"));
        assert_eq!(v, Verdict::Safe);
    }

    #[test]
    fn type_outside_whitelist_rejected() {
        let config = ValidatorConfig {
            allowed_action_types: vec![ActionType::UpdateMetaDescription],
            ..ValidatorConfig::default()
        };
        let v = ActionValidator::new(&config)
            .unwrap()
            .validate(&title(Some("src/app/layout.tsx"), "x"));
        assert!(!v.is_safe());
        assert!(v.reason().contains("update_meta_title"));
    }

    #[test]
    fn traversal_rejected_regardless_of_extension() {
        let v = validator();
        for path in [
            "../layout.tsx",
            "src/../../etc/layout.tsx",
            "/etc/layout.tsx",
            "\\server\\layout.tsx",
            "C:/app/layout.tsx",
        ] {
            assert!(!v.is_safe_file(path), "{path}");
            let verdict = v.validate(&title(Some(path), "x"));
            assert!(verdict.reason().contains("path traversal"), "{path}");
        }
    }

    #[test]
    fn product_id_outside_products_root_rejected() {
        let v = validator();
        for id in ["../outside", "/tmp/x", "a/b", "..", "C:\\x"] {
            let mut action = title(Some("src/app/layout.tsx"), "x");
            action.product_id = id.to_string();
            let verdict = v.validate(&action);
            assert!(verdict.reason().contains("not a plain identifier"), "{id}");
        }
    }

    #[test]
    fn unlisted_file_rejected() {
        let v = validator().validate(&title(Some("src/lib/db.ts"), "x"));
        assert!(v.reason().contains("not on the safe list"));
        assert!(validator().is_safe_file("public/INDEX.HTML"));
    }

    #[test]
    fn script_in_parameter_rejected() {
        let v = validator().validate(&title(
            Some("src/app/layout.tsx"),
            "<script>alert(1)</script>",
        ));
        assert!(!v.is_safe());
        assert!(v.reason().contains("script tag"));
        assert!(v.reason().contains("new_title"));
    }

    #[test]
    fn dangerous_description_rejected() {
        let mut action = title(None, "ok");
        action.description = "set onclick = steal()".to_string();
        let v = validator().validate(&action);
        assert!(v.reason().contains("(inline event handler) in description"));
    }

    #[test]
    fn dangerous_table() {
        assert_eq!(find_dangerous("javascript:alert(1)"), Some("javascript URI"));
        assert_eq!(find_dangerous("EVAL (x)"), Some("eval call"));
        assert_eq!(find_dangerous("el.innerHTML = x"), Some("innerHTML sink"));
        assert_eq!(find_dangerous("document.write(1)"), Some("document.write"));
        assert_eq!(find_dangerous("{\"__proto__\": 1}"), Some("__proto__ key"));
        assert_eq!(find_dangerous("a.constructor['x']"), Some("constructor indexing"));
        assert_eq!(find_dangerous("Online converter = fast"), None);
        assert_eq!(find_dangerous("Fast Free QR Codes"), None);
    }

    #[test]
    fn filter_safe_marks_every_action() {
        let mut actions = vec![
            title(Some("src/app/layout.tsx"), "Good"),
            title(Some("src/app/layout.tsx"), "<script>x</script>"),
        ];
        actions[1].id = "action-2".into();

        let safe = validator().filter_safe(&mut actions);
        assert_eq!(safe.len(), 1);
        assert_eq!(safe[0].id, "action-1");
        assert!(actions[0].is_automatable);
        assert!(!actions[1].is_automatable);
        assert!(actions[1]
            .automation_reason
            .as_deref()
            .unwrap()
            .contains("script tag"));
    }
}
