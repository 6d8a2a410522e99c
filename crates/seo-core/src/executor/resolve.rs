use crate::config::Config;
use crate::error::{Result, SeoError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ProductRoots
// ---------------------------------------------------------------------------

/// Maps a product id to the checkout its target files live in.
#[derive(Debug, Clone, Default)]
pub struct ProductRoots {
    default_root: PathBuf,
    overrides: BTreeMap<String, PathBuf>,
}

impl ProductRoots {
    /// Every product lives at `<default_root>/<product_id>`.
    pub fn new(default_root: impl Into<PathBuf>) -> Self {
        Self {
            default_root: default_root.into(),
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_product(mut self, id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.overrides.insert(id.into(), root.into());
        self
    }

    pub fn from_config(config: &Config, root: &Path) -> Self {
        let mut roots = Self::new(config.products_base(root));
        for product in &config.products {
            roots
                .overrides
                .insert(product.id.clone(), config.product_root(root, &product.id));
        }
        roots
    }

    pub fn root_for(&self, product_id: &str) -> PathBuf {
        self.overrides
            .get(product_id)
            .cloned()
            .unwrap_or_else(|| self.default_root.join(product_id))
    }

    /// Resolve `target` inside the product checkout, trying the known naming
    /// variants when the literal path is absent.
    pub fn resolve(&self, product_id: &str, target: &str) -> Result<PathBuf> {
        let root = self.root_for(product_id);
        let primary = root.join(target);
        if primary.is_file() {
            return Ok(primary);
        }
        for variant in path_variants(target) {
            let candidate = root.join(&variant);
            if candidate.is_file() {
                tracing::info!(
                    requested = target,
                    resolved = %variant,
                    product = product_id,
                    "target resolved through path variant"
                );
                return Ok(candidate);
            }
        }
        Err(SeoError::FileNotFound(primary))
    }
}

/// Alternative spellings of a report-supplied path, in the order tried.
pub fn path_variants(target: &str) -> Vec<String> {
    let target = target.trim_start_matches("./");
    let mut variants = Vec::new();

    match target.strip_prefix("public/") {
        Some(rest) => variants.push(rest.to_string()),
        None => variants.push(format!("public/{target}")),
    }

    let swapped = if let Some(dir) = target.strip_suffix("page.tsx") {
        Some(format!("{dir}layout.tsx"))
    } else {
        target
            .strip_suffix("layout.tsx")
            .map(|dir| format!("{dir}page.tsx"))
    };
    if let Some(swapped) = swapped {
        if swapped.ends_with("/page.tsx")
            || swapped.ends_with("/layout.tsx")
            || swapped == "page.tsx"
            || swapped == "layout.tsx"
        {
            variants.push(swapped);
        }
    }

    variants.retain(|v| v != target);
    variants
}

// ---------------------------------------------------------------------------
// FileKind
// ---------------------------------------------------------------------------

/// How an executor treats a target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// TypeScript/JavaScript sources edited through key/attribute patterns.
    Script,
    /// HTML documents edited through the tag scanner.
    Markup,
}

impl FileKind {
    pub fn of(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "tsx" | "ts" | "jsx" | "js" | "mjs" => Ok(FileKind::Script),
            "html" | "htm" => Ok(FileKind::Markup),
            _ => Err(SeoError::UnsupportedFileType(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )),
        }
    }
}
