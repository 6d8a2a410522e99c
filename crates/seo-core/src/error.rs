use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeoError {
    #[error("not initialized: run 'seo-agent config init'")]
    NotInitialized,

    #[error("report not found: {}", .0.display())]
    ReportNotFound(PathBuf),

    #[error("invalid action_type '{0}': must be one of update_meta_title, update_meta_description, add_internal_link, update_canonical_url, update_og_tags")]
    InvalidActionType(String),

    #[error("invalid priority '{0}': must be one of high, medium, low")]
    InvalidPriority(String),

    #[error("backup source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("backup not found: {}", .0.display())]
    BackupNotFound(PathBuf),

    #[error("no target path given and no .meta sidecar for backup {}", .0.display())]
    BackupMetaMissing(PathBuf),

    #[error("action has no target_file")]
    MissingTargetFile,

    #[error("invalid safe-file pattern: {0}")]
    InvalidPattern(String),

    #[error("missing parameters: {0}")]
    MissingParameters(String),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("no mutation site for {fields} in {}", .path.display())]
    MutationSiteNotFound { path: PathBuf, fields: String },

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("already up to date: {}", .0.display())]
    NoChange(PathBuf),

    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("git executable not found on PATH")]
    GitNotFound,

    #[error("unsupported remote url '{0}': expected a github.com remote")]
    UnsupportedRemote(String),

    #[error("platform API returned {status}: {body}")]
    Platform { status: u16, body: String },

    #[error("platform request failed: {0}")]
    PlatformRequest(String),

    #[error("token not set: export {0}")]
    MissingToken(String),

    #[error("github.owner is not set in config")]
    MissingOwner,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SeoError {
    /// Stable tag recorded as `ExecutionResult.error`.
    pub fn kind(&self) -> &'static str {
        match self {
            SeoError::NotInitialized => "NotInitialized",
            SeoError::ReportNotFound(_) => "ReportNotFound",
            SeoError::InvalidActionType(_) => "InvalidActionType",
            SeoError::InvalidPriority(_) => "InvalidPriority",
            SeoError::SourceNotFound(_) => "SourceNotFound",
            SeoError::BackupNotFound(_) => "BackupNotFound",
            SeoError::BackupMetaMissing(_) => "BackupMetaMissing",
            SeoError::MissingTargetFile => "MissingTargetFile",
            SeoError::InvalidPattern(_) => "InvalidPattern",
            SeoError::MissingParameters(_) => "MissingParameters",
            SeoError::FileNotFound(_) => "FileNotFound",
            SeoError::MutationSiteNotFound { .. } => "MutationSiteNotFound",
            SeoError::UnsupportedFileType(_) => "UnsupportedFileType",
            SeoError::NoChange(_) => "NoChange",
            SeoError::Git { .. } | SeoError::GitNotFound => "GitTransactionFailure",
            SeoError::UnsupportedRemote(_)
            | SeoError::Platform { .. }
            | SeoError::PlatformRequest(_)
            | SeoError::MissingToken(_)
            | SeoError::MissingOwner => "PlatformAPIFailure",
            SeoError::Io(_) => "Io",
            SeoError::Yaml(_) => "Yaml",
            SeoError::Json(_) => "Json",
        }
    }
}

pub type Result<T> = std::result::Result<T, SeoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_match_taxonomy() {
        let err = SeoError::MutationSiteNotFound {
            path: PathBuf::from("layout.tsx"),
            fields: "title".into(),
        };
        assert_eq!(err.kind(), "MutationSiteNotFound");
        assert!(err.to_string().contains("layout.tsx"));

        let err = SeoError::Git {
            command: "push".into(),
            stderr: "rejected".into(),
        };
        assert_eq!(err.kind(), "GitTransactionFailure");

        let err = SeoError::Platform {
            status: 422,
            body: "Validation Failed".into(),
        };
        assert_eq!(err.kind(), "PlatformAPIFailure");
    }
}
