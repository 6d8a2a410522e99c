use crate::error::SeoError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

/// The closed set of edits the pipeline knows how to perform.
///
/// Adding a variant forces a matching arm in the executor dispatch table
/// (`Executors::for_type`), in `as_str`, and in `FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    UpdateMetaTitle,
    UpdateMetaDescription,
    AddInternalLink,
    UpdateCanonicalUrl,
    UpdateOgTags,
}

impl ActionType {
    pub fn all() -> &'static [ActionType] {
        &[
            ActionType::UpdateMetaTitle,
            ActionType::UpdateMetaDescription,
            ActionType::AddInternalLink,
            ActionType::UpdateCanonicalUrl,
            ActionType::UpdateOgTags,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::UpdateMetaTitle => "update_meta_title",
            ActionType::UpdateMetaDescription => "update_meta_description",
            ActionType::AddInternalLink => "add_internal_link",
            ActionType::UpdateCanonicalUrl => "update_canonical_url",
            ActionType::UpdateOgTags => "update_og_tags",
        }
    }

    /// Parameter key the extractor fills with the captured value.
    pub fn primary_parameter(self) -> &'static str {
        match self {
            ActionType::UpdateMetaTitle => "new_title",
            ActionType::UpdateMetaDescription => "new_description",
            ActionType::AddInternalLink => "link_url",
            ActionType::UpdateCanonicalUrl => "canonical_url",
            ActionType::UpdateOgTags => "og_image",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionType {
    type Err = SeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "update_meta_title" => Ok(ActionType::UpdateMetaTitle),
            "update_meta_description" => Ok(ActionType::UpdateMetaDescription),
            "add_internal_link" => Ok(ActionType::AddInternalLink),
            "update_canonical_url" => Ok(ActionType::UpdateCanonicalUrl),
            "update_og_tags" => Ok(ActionType::UpdateOgTags),
            _ => Err(SeoError::InvalidActionType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = SeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(SeoError::InvalidPriority(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_type_str_roundtrip() {
        for t in ActionType::all() {
            let parsed: ActionType = t.as_str().parse().unwrap();
            assert_eq!(parsed, *t);
        }
    }

    #[test]
    fn unknown_action_type_rejected() {
        let err = "delete_file".parse::<ActionType>().unwrap_err();
        assert!(matches!(err, SeoError::InvalidActionType(ref s) if s == "delete_file"));
    }

    #[test]
    fn action_type_serde_snake_case() {
        let json = serde_json::to_string(&ActionType::UpdateOgTags).unwrap();
        assert_eq!(json, "\"update_og_tags\"");
        assert!(serde_json::from_str::<ActionType>("\"rm_rf\"").is_err());
    }

    #[test]
    fn priority_parse_is_case_insensitive() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
        assert!(matches!(
            "urgent".parse::<Priority>(),
            Err(SeoError::InvalidPriority(_))
        ));
    }
}
