//! Language-model parser used when the deterministic grammar yields nothing.
//!
//! The service sees the raw report plus a literal JSON schema and must answer
//! with a JSON array. Every failure (transport, malformed JSON, an entry
//! that violates the model invariants) degrades to fewer actions, never to
//! an error.

use crate::action::Action;
use crate::paths;
use crate::types::Priority;
use serde_json::Value;
use std::collections::BTreeMap;

/// A text completion backend.
pub trait CompletionService {
    fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

const SCHEMA: &str = r#"[
  {
    "product_id": "qr-generator",
    "description": "Update meta title to 'Free QR Code Generator'",
    "action_type": "update_meta_title",
    "target_file": "src/app/layout.tsx",
    "parameters": {"new_title": "Free QR Code Generator"},
    "expected_impact": "Improve CTR"
  }
]"#;

pub fn build_prompt(report: &str) -> String {
    format!(
        "The following is a product analysis report. Extract the actions in its \
High Priority section as a JSON array.\n\n\
Report:\n```\n{report}\n```\n\n\
Output format (JSON):\n{SCHEMA}\n\n\
action_type must be one of: update_meta_title, update_meta_description, \
add_internal_link, update_canonical_url, update_og_tags.\n\
Output only the JSON array."
    )
}

/// Ask the service and parse its answer. Never fails.
pub fn extract_with(service: &dyn CompletionService, report: &str) -> Vec<Action> {
    match service.complete(&build_prompt(report)) {
        Ok(text) => parse_response(&text),
        Err(e) => {
            tracing::warn!(error = %e, "fallback parser unavailable");
            Vec::new()
        }
    }
}

/// Strip code fences and any prose around the outermost JSON array.
fn json_body(text: &str) -> &str {
    let text = text.trim();
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn string_field<'v>(entry: &'v Value, key: &str) -> Option<&'v str> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parameters(entry: &Value) -> BTreeMap<String, String> {
    entry
        .get("parameters")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| {
                    let value = match v {
                        Value::String(s) => s.clone(),
                        Value::Null => return None,
                        other => other.to_string(),
                    };
                    Some((k.clone(), value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse a service answer into actions numbered `action-1..`.
pub fn parse_response(text: &str) -> Vec<Action> {
    let entries: Vec<Value> = match serde_json::from_str(json_body(text)) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            tracing::warn!("fallback response is not a JSON array");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(error = %e, "fallback response is not valid JSON");
            return Vec::new();
        }
    };

    let mut actions = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let id = format!("action-{}", index + 1);
        let action_type = string_field(entry, "action_type").unwrap_or_default();
        let priority = string_field(entry, "priority").unwrap_or(Priority::High.as_str());
        let description = string_field(entry, "description").unwrap_or_default();
        let product_id = string_field(entry, "product_id").unwrap_or("unknown");
        if !paths::is_slug(product_id) {
            tracing::warn!(entry = %id, product_id, "fallback entry dropped: bad product id");
            continue;
        }

        match Action::parse(&id, priority, description, product_id, action_type) {
            Ok(action) => actions.push(
                action
                    .with_target_file(string_field(entry, "target_file").map(str::to_string))
                    .with_parameters(parameters(entry))
                    .with_expected_impact(
                        string_field(entry, "expected_impact").map(str::to_string),
                    ),
            ),
            Err(e) => tracing::warn!(entry = %id, error = %e, "fallback entry dropped"),
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionType;

    struct Canned(anyhow::Result<String>);

    impl CompletionService for Canned {
        fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            assert!(prompt.contains("\"action_type\": \"update_meta_title\""));
            match &self.0 {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    #[test]
    fn prompt_embeds_report_and_schema() {
        let prompt = build_prompt("## High Priority\n1. x");
        assert!(prompt.contains("## High Priority\n1. x"));
        assert!(prompt.contains("\"expected_impact\""));
    }

    #[test]
    fn parses_fenced_array() {
        let text = "```json\n[{\"product_id\":\"qr-generator\",\"description\":\"Update title\",\"action_type\":\"update_meta_title\",\"target_file\":\"src/app/layout.tsx\",\"parameters\":{\"new_title\":\"Free QR\"},\"expected_impact\":\"CTR\"}]\n```";
        let actions = parse_response(text);
        assert_eq!(actions.len(), 1);
        let a = &actions[0];
        assert_eq!(a.id, "action-1");
        assert_eq!(a.action_type, ActionType::UpdateMetaTitle);
        assert_eq!(a.priority, Priority::High);
        assert_eq!(a.target_file.as_deref(), Some("src/app/layout.tsx"));
        assert_eq!(a.parameter("new_title"), Some("Free QR"));
        assert_eq!(a.expected_impact.as_deref(), Some("CTR"));
    }

    #[test]
    fn invalid_entries_are_dropped_individually() {
        let text = r#"[
            {"product_id":"a","description":"d","action_type":"delete_repo"},
            {"product_id":"b","description":"d","action_type":"update_og_tags","parameters":{"og_image":"/og.png","width":1200}}
        ]"#;
        let actions = parse_response(text);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].id, "action-2");
        assert_eq!(actions[0].parameter("width"), Some("1200"));
    }

    #[test]
    fn product_ids_that_leave_the_products_root_are_dropped() {
        let text = r#"[
            {"product_id":"../outside","description":"Update title","action_type":"update_meta_title","target_file":"layout.tsx","parameters":{"new_title":"Pwned"}},
            {"product_id":"/abs","description":"Update title","action_type":"update_meta_title","target_file":"layout.tsx","parameters":{"new_title":"Pwned"}},
            {"product_id":"qr-generator","description":"Update title","action_type":"update_meta_title","target_file":"layout.tsx","parameters":{"new_title":"Ok"}}
        ]"#;
        let actions = parse_response(text);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].id, "action-3");
        assert_eq!(actions[0].product_id, "qr-generator");
    }

    #[test]
    fn malformed_answers_yield_nothing() {
        assert!(parse_response("Sorry, I can't help with that.").is_empty());
        assert!(parse_response("{\"actions\": []}").is_empty());
        assert!(parse_response("[{\"broken\": ").is_empty());
    }

    #[test]
    fn service_error_yields_nothing() {
        let svc = Canned(Err(anyhow::anyhow!("quota exceeded")));
        assert!(extract_with(&svc, "report").is_empty());

        let svc = Canned(Ok("[]".into()));
        assert!(extract_with(&svc, "report").is_empty());
    }
}
