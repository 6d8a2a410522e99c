//! The canonical edit intent extracted from a report.
//!
//! An [`Action`] is created once by the extractor and is immutable from then
//! on except for `is_automatable` / `automation_reason`, which belong to the
//! validator. Type and priority are closed enums, so an `Action` value always
//! satisfies the model invariants; [`Action::parse`] is the checked entry
//! point for untyped input (fallback parser, dispatch payloads).

use crate::error::Result;
use crate::types::{ActionType, Priority};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub priority: Priority,
    pub description: String,
    pub product_id: String,
    pub action_type: ActionType,
    #[serde(default)]
    pub target_file: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub expected_impact: Option<String>,
    /// Assumed safe until the validator has looked at it.
    #[serde(default = "default_automatable")]
    pub is_automatable: bool,
    #[serde(default)]
    pub automation_reason: Option<String>,
}

fn default_automatable() -> bool {
    true
}

impl Action {
    pub fn new(
        id: impl Into<String>,
        priority: Priority,
        description: impl Into<String>,
        product_id: impl Into<String>,
        action_type: ActionType,
    ) -> Self {
        Self {
            id: id.into(),
            priority,
            description: description.into(),
            product_id: product_id.into(),
            action_type,
            target_file: None,
            parameters: BTreeMap::new(),
            expected_impact: None,
            is_automatable: true,
            automation_reason: None,
        }
    }

    /// Build an action from untyped strings.
    ///
    /// Fails with `InvalidPriority` or `InvalidActionType` when either value
    /// is outside its closed set.
    pub fn parse(
        id: impl Into<String>,
        priority: &str,
        description: impl Into<String>,
        product_id: impl Into<String>,
        action_type: &str,
    ) -> Result<Self> {
        let priority: Priority = priority.parse()?;
        let action_type: ActionType = action_type.parse()?;
        Ok(Self::new(id, priority, description, product_id, action_type))
    }

    pub fn with_target_file(mut self, target_file: Option<String>) -> Self {
        self.target_file = target_file;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_parameters(mut self, parameters: BTreeMap<String, String>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn with_expected_impact(mut self, expected_impact: Option<String>) -> Self {
        self.expected_impact = expected_impact;
        self
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Record the validator's verdict on this action.
    pub fn mark(&mut self, automatable: bool, reason: impl Into<String>) {
        self.is_automatable = automatable;
        self.automation_reason = Some(reason.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SeoError;

    #[test]
    fn parse_accepts_known_values() {
        let action = Action::parse(
            "action-1",
            "High",
            "Update meta title",
            "qr-generator",
            "update_meta_title",
        )
        .unwrap();
        assert_eq!(action.priority, Priority::High);
        assert_eq!(action.action_type, ActionType::UpdateMetaTitle);
        assert!(action.is_automatable);
        assert!(action.automation_reason.is_none());
    }

    #[test]
    fn parse_rejects_unknown_action_type() {
        let err = Action::parse("a", "high", "d", "p", "drop_table").unwrap_err();
        assert!(matches!(err, SeoError::InvalidActionType(_)));
    }

    #[test]
    fn parse_rejects_unknown_priority() {
        let err = Action::parse("a", "critical", "d", "p", "update_og_tags").unwrap_err();
        assert!(matches!(err, SeoError::InvalidPriority(_)));
    }

    #[test]
    fn blank_parameters_read_as_missing() {
        let action = Action::new("a", Priority::High, "d", "p", ActionType::UpdateMetaTitle)
            .with_parameter("new_title", "  ");
        assert!(action.parameter("new_title").is_none());
    }

    #[test]
    fn deserialize_rejects_invalid_type_and_defaults_flags() {
        let json = r#"{"id":"a","priority":"high","description":"d","product_id":"p","action_type":"update_meta_title"}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert!(action.is_automatable);
        assert!(action.parameters.is_empty());

        let bad = json.replace("update_meta_title", "exec_shell");
        assert!(serde_json::from_str::<Action>(&bad).is_err());
    }
}
