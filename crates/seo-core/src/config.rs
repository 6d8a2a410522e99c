use crate::error::{Result, SeoError};
use crate::paths;
use crate::types::ActionType;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ProductConfig
// ---------------------------------------------------------------------------

/// A target codebase the pipeline may edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    pub id: String,
    /// Names that resolve to this product when they appear in a report
    /// (matched case-insensitively as substrings).
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Checkout location; defaults to `<products_root>/<id>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Repository name on the platform; defaults to `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

impl ProductConfig {
    pub fn new(id: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            id: id.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            path: None,
            repository: None,
        }
    }
}

fn default_products() -> Vec<ProductConfig> {
    vec![
        ProductConfig::new("qr-generator", &["qr studio", "qr-studio"]),
        ProductConfig::new("convert-image", &["convertkits"]),
    ]
}

fn default_products_root() -> PathBuf {
    PathBuf::from("..")
}

// ---------------------------------------------------------------------------
// GitHubConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Account owning the product repositories (dispatch mode).
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    #[serde(default = "default_remote")]
    pub remote: String,
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    /// Fast-forward the base branch from the remote before branching.
    #[serde(default = "default_true")]
    pub fast_forward_base: bool,
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_base_branch() -> String {
    "main".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch_prefix() -> String {
    "agent".to_string()
}

fn default_labels() -> Vec<String> {
    vec!["seo".to_string(), "automated".to_string()]
}

fn default_event_type() -> String {
    "seo-improvements".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            owner: None,
            api_base_url: default_api_base_url(),
            token_env: default_token_env(),
            base_branch: default_base_branch(),
            remote: default_remote(),
            branch_prefix: default_branch_prefix(),
            labels: default_labels(),
            event_type: default_event_type(),
            fast_forward_base: true,
        }
    }
}

// ---------------------------------------------------------------------------
// PublishMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Edit local checkouts and open one pull request per product.
    #[default]
    Direct,
    /// Send a repository-dispatch event per product; the product repository
    /// applies the edits in its own workflow.
    Dispatch,
}

impl std::str::FromStr for PublishMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "direct" => Ok(PublishMode::Direct),
            "dispatch" => Ok(PublishMode::Dispatch),
            other => Err(format!("unknown publish mode '{other}' (direct|dispatch)")),
        }
    }
}

// ---------------------------------------------------------------------------
// BackupConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Relative paths resolve against the workspace root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    7
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: None,
            retention_days: default_retention_days(),
        }
    }
}

impl BackupConfig {
    pub fn resolve_dir(&self, root: &Path) -> PathBuf {
        match &self.dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => paths::default_backups_dir(root),
        }
    }
}

// ---------------------------------------------------------------------------
// ValidatorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default = "default_allowed_action_types")]
    pub allowed_action_types: Vec<ActionType>,
    /// Case-insensitive regexes; a target file must match at least one.
    #[serde(default = "default_safe_file_patterns")]
    pub safe_file_patterns: Vec<String>,
}

fn default_allowed_action_types() -> Vec<ActionType> {
    ActionType::all().to_vec()
}

pub fn default_safe_file_patterns() -> Vec<String> {
    [
        r".*layout\.tsx$",
        r".*index\.html$",
        r".*Header\.tsx$",
        r".*Footer\.tsx$",
        r".*Layout\.tsx$",
        r".*metadata\.ts$",
        r".*head\.tsx$",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            allowed_action_types: default_allowed_action_types(),
            safe_file_patterns: default_safe_file_patterns(),
        }
    }
}

// ---------------------------------------------------------------------------
// FallbackConfig
// ---------------------------------------------------------------------------

/// Language-model parser used when the deterministic grammar finds nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_lm_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_lm_model")]
    pub model: String,
    #[serde(default = "default_lm_key_env")]
    pub api_key_env: String,
}

fn default_lm_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_lm_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_lm_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base_url: default_lm_base_url(),
            model: default_lm_model(),
            api_key_env: default_lm_key_env(),
        }
    }
}

// ---------------------------------------------------------------------------
// GitConfig
// ---------------------------------------------------------------------------

/// Commit identity override; unset fields fall back to git's own config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Directory holding one checkout per product. Relative paths resolve
    /// against the workspace root.
    #[serde(default = "default_products_root")]
    pub products_root: PathBuf,
    #[serde(default = "default_products")]
    pub products: Vec<ProductConfig>,
    #[serde(default)]
    pub publish: PublishMode,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub git: GitConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            products_root: default_products_root(),
            products: default_products(),
            publish: PublishMode::Direct,
            dry_run: false,
            github: GitHubConfig::default(),
            backup: BackupConfig::default(),
            validator: ValidatorConfig::default(),
            fallback: FallbackConfig::default(),
            git: GitConfig::default(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(SeoError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load the config if present, otherwise fall back to defaults.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(SeoError::NotInitialized) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn product(&self, id: &str) -> Option<&ProductConfig> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Directory holding the product checkouts.
    pub fn products_base(&self, root: &Path) -> PathBuf {
        if self.products_root.is_absolute() {
            self.products_root.clone()
        } else {
            root.join(&self.products_root)
        }
    }

    /// Checkout directory for a product.
    pub fn product_root(&self, root: &Path, product_id: &str) -> PathBuf {
        match self.product(product_id).and_then(|p| p.path.as_ref()) {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => root.join(p),
            None => self.products_base(root).join(product_id),
        }
    }

    /// Platform repository name for a product.
    pub fn repository_for<'a>(&'a self, product_id: &'a str) -> &'a str {
        self.product(product_id)
            .and_then(|p| p.repository.as_deref())
            .unwrap_or(product_id)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Product ids must be unique slugs
        let mut seen = std::collections::HashSet::new();
        for product in &self.products {
            if product.id.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: "product with empty id".to_string(),
                });
            } else if !paths::is_slug(&product.id) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "product id '{}' must be a lowercase slug such as '{}'",
                        product.id,
                        paths::slugify(&product.id)
                    ),
                });
            } else if !seen.insert(product.id.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("duplicate product id '{}'", product.id),
                });
            }
        }

        // 2. Safe-file patterns must compile
        for pattern in &self.validator.safe_file_patterns {
            if let Err(e) = RegexBuilder::new(pattern).case_insensitive(true).build() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("invalid safe_file_pattern '{pattern}': {e}"),
                });
            }
        }

        // 3. An empty whitelist rejects everything
        if self.validator.allowed_action_types.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "validator.allowed_action_types is empty; every action will be rejected"
                    .to_string(),
            });
        }

        // 4. Dispatch needs an owner
        if self.publish == PublishMode::Dispatch && self.github.owner.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "publish mode 'dispatch' requires github.owner".to_string(),
            });
        }

        if self.github.base_branch.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "github.base_branch is empty".to_string(),
            });
        }

        if self.backup.retention_days == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "backup.retention_days is 0; backups are never pruned after a run".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
