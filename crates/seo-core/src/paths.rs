use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const AGENT_DIR: &str = ".seo-agent";
pub const CONFIG_FILE: &str = ".seo-agent/config.yaml";
pub const BACKUPS_DIR: &str = ".seo-agent/backups";

/// Suffix of the sidecar recording a backup's original absolute path.
pub const BACKUP_META_SUFFIX: &str = ".meta";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn agent_dir(root: &Path) -> PathBuf {
    root.join(AGENT_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn default_backups_dir(root: &Path) -> PathBuf {
    root.join(BACKUPS_DIR)
}

/// `<backup>.meta` next to a backup file.
pub fn backup_meta_path(backup: &Path) -> PathBuf {
    let mut name = backup.as_os_str().to_os_string();
    name.push(BACKUP_META_SUFFIX);
    PathBuf::from(name)
}

/// Lower-case, hyphenated identifier derived from a display name.
///
/// `"Convert Image"` → `"convert-image"`. Runs of non-alphanumeric characters
/// collapse into one hyphen; leading and trailing hyphens are trimmed.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// True when `id` is already a slug, so it names one directory directly
/// below the products root.
pub fn is_slug(id: &str) -> bool {
    !id.is_empty() && slugify(id) == id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.seo-agent/config.yaml")
        );
        assert_eq!(
            default_backups_dir(root),
            PathBuf::from("/tmp/proj/.seo-agent/backups")
        );
        assert_eq!(
            backup_meta_path(Path::new("/b/20240101_layout.tsx")),
            PathBuf::from("/b/20240101_layout.tsx.meta")
        );
    }

    #[test]
    fn slugify_names() {
        assert_eq!(slugify("Convert Image"), "convert-image");
        assert_eq!(slugify("  QR   Studio "), "qr-studio");
        assert_eq!(slugify("Foo/Bar_baz"), "foo-bar-baz");
        assert_eq!(slugify("타이머 앱"), "타이머-앱");
        assert_eq!(slugify("--"), "");
    }

    #[test]
    fn slug_check() {
        assert!(is_slug("qr-generator"));
        assert!(is_slug("unknown"));
        assert!(!is_slug("../outside"));
        assert!(!is_slug("/etc"));
        assert!(!is_slug("a/b"));
        assert!(!is_slug("QR Studio"));
        assert!(!is_slug(""));
    }
}
