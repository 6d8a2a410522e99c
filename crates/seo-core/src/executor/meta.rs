//! Title, description, canonical and og:image updates.
//!
//! Script sources (Next.js `metadata` objects, React props) are edited with
//! two patterns per field, tried in order: the object-literal key form
//! (`title: "..."`) and the attribute form (`title="..."`). Only one site is
//! replaced: the first match inside the `metadata` object when the file
//! declares one, otherwise the first match in the file. HTML documents go
//! through the [`markup`](crate::markup) scanner, which only replaces
//! existing elements.

use super::{skipped, ExecContext, Executor, FileKind};
use crate::action::Action;
use crate::error::{Result, SeoError};
use crate::markup::{self, Selector};
use crate::result::ExecutionResult;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;

// ---------------------------------------------------------------------------
// Field table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum MarkupSite {
    Title,
    Attribute(Selector<'static>),
}

#[derive(Debug)]
struct MetaField {
    param: &'static str,
    label: &'static str,
    script_keys: &'static [&'static str],
    markup: MarkupSite,
}

const FIELDS: &[MetaField] = &[
    MetaField {
        param: "new_title",
        label: "title",
        script_keys: &["title"],
        markup: MarkupSite::Title,
    },
    MetaField {
        param: "new_description",
        label: "description",
        script_keys: &["description"],
        markup: MarkupSite::Attribute(markup::META_DESCRIPTION),
    },
    MetaField {
        param: "canonical_url",
        label: "canonical",
        script_keys: &["canonical"],
        markup: MarkupSite::Attribute(markup::CANONICAL),
    },
    MetaField {
        param: "og_image",
        label: "og:image",
        script_keys: &["ogImage", "images", "image"],
        markup: MarkupSite::Attribute(markup::OG_IMAGE),
    },
];

struct ScriptPatterns {
    object: Regex,
    attribute: Regex,
}

const STRING_LITERAL: &str = r#""(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'|`(?:[^`\\]|\\.)*`"#;
const ATTR_LITERAL: &str = r#""[^"\n]*"|'[^'\n]*'"#;

fn script_patterns() -> &'static [ScriptPatterns] {
    static RE: OnceLock<Vec<ScriptPatterns>> = OnceLock::new();
    RE.get_or_init(|| {
        FIELDS
            .iter()
            .map(|field| {
                let keys = field
                    .script_keys
                    .iter()
                    .map(|k| regex::escape(k))
                    .collect::<Vec<_>>()
                    .join("|");
                // `images: ["..."]` is the usual og:image shape.
                let object = format!(r#"(?i)(["']?\b(?:{keys})["']?\s*:\s*\[?\s*)({STRING_LITERAL})"#);
                let attribute = format!(r#"(?i)(\b(?:{keys})\s*=\s*\{{?\s*)({ATTR_LITERAL})"#);
                ScriptPatterns {
                    object: Regex::new(&object).expect("valid regex"),
                    attribute: Regex::new(&attribute).expect("valid regex"),
                }
            })
            .collect()
    })
}

// ---------------------------------------------------------------------------
// Literal rewriting
// ---------------------------------------------------------------------------

/// Re-quote `value` with the quote character the source literal used.
fn js_literal(original: &str, value: &str) -> String {
    let quote = original.chars().next().unwrap_or('"');
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '$' if quote == '`' => out.push_str("\\$"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// JSX attribute strings have no backslash escapes; use entities instead.
fn jsx_attr_literal(original: &str, value: &str) -> String {
    let quote = original.chars().next().unwrap_or('"');
    let escaped = match quote {
        '\'' => value.replace('\'', "&#39;"),
        _ => value.replace('"', "&quot;"),
    };
    format!("{quote}{escaped}{quote}")
}

/// Start of the `metadata` object, when the file declares one.
fn metadata_start(src: &str) -> usize {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bmetadata\b\s*(?::[^=\n]*)?=\s*\{").unwrap())
        .find(src)
        .map_or(0, |m| m.start())
}

/// Replace the literal (group 2) of the first match at or after `from`,
/// else of the first match anywhere.
fn replace_first<F>(re: &Regex, src: &str, from: usize, render: F) -> Option<String>
where
    F: Fn(&str) -> String,
{
    let caps = re.captures_at(src, from).or_else(|| re.captures(src))?;
    let literal = caps.get(2)?;
    let mut out = String::with_capacity(src.len());
    out.push_str(&src[..literal.start()]);
    out.push_str(&render(literal.as_str()));
    out.push_str(&src[literal.end()..]);
    Some(out)
}

fn replace_script_field(src: &str, patterns: &ScriptPatterns, value: &str) -> Option<String> {
    let from = metadata_start(src);
    replace_first(&patterns.object, src, from, |lit| js_literal(lit, value))
        .or_else(|| replace_first(&patterns.attribute, src, from, |lit| jsx_attr_literal(lit, value)))
}

fn replace_markup_field(src: &str, site: MarkupSite, value: &str) -> Option<String> {
    match site {
        MarkupSite::Title => markup::set_title(src, value),
        MarkupSite::Attribute(selector) => markup::set_attribute(src, selector, value),
    }
}

// ---------------------------------------------------------------------------
// Mutation
// ---------------------------------------------------------------------------

/// A requested field and the value to write.
type Edit<'a> = (usize, &'a str);

/// Fields the action asks for: the type's primary parameter (required) plus
/// any other meta parameter the action carries.
fn requested_edits(action: &Action) -> Result<Vec<Edit<'_>>> {
    let primary = action.action_type.primary_parameter();
    if action.parameter(primary).is_none() {
        return Err(SeoError::MissingParameters(primary.to_string()));
    }
    Ok(FIELDS
        .iter()
        .enumerate()
        .filter_map(|(i, field)| action.parameter(field.param).map(|v| (i, v)))
        .collect())
}

/// Apply every edit to `content`. Fails with `MutationSiteNotFound` when not
/// a single requested field has a site in the file.
fn apply(kind: FileKind, path: &Path, content: &str, edits: &[Edit<'_>]) -> Result<(String, String)> {
    let mut current = content.to_string();
    let mut updated = Vec::new();
    let mut missing = Vec::new();

    for &(index, value) in edits {
        let field = &FIELDS[index];
        let next = match kind {
            FileKind::Script => replace_script_field(&current, &script_patterns()[index], value),
            FileKind::Markup => replace_markup_field(&current, field.markup, value),
        };
        match next {
            Some(next) => {
                current = next;
                updated.push(field.label);
            }
            None => missing.push(field.label),
        }
    }

    if updated.is_empty() {
        return Err(SeoError::MutationSiteNotFound {
            path: path.to_path_buf(),
            fields: missing.join(", "),
        });
    }
    if !missing.is_empty() {
        tracing::warn!(
            file = %path.display(),
            missing = %missing.join(", "),
            "some requested fields have no site"
        );
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut summary = format!("updated {} in {name}", updated.join(", "));
    if !missing.is_empty() {
        summary.push_str(&format!(" (not found: {})", missing.join(", ")));
    }
    Ok((current, summary))
}

// ---------------------------------------------------------------------------
// MetaExecutor
// ---------------------------------------------------------------------------

pub struct MetaExecutor<'a> {
    ctx: &'a ExecContext,
}

impl<'a> MetaExecutor<'a> {
    pub fn new(ctx: &'a ExecContext) -> Self {
        Self { ctx }
    }
}

impl Executor for MetaExecutor<'_> {
    fn execute(&self, action: &Action) -> ExecutionResult {
        let started = Instant::now();
        let prepared = self.ctx.target_path(action).and_then(|path| {
            let kind = FileKind::of(&path)?;
            let edits = requested_edits(action)?;
            Ok((path, kind, edits))
        });
        let (path, kind, edits) = match prepared {
            Ok(p) => p,
            Err(e) => return skipped(action, &e, started),
        };

        self.ctx
            .transact(action, &path, |content| apply(kind, &path, content, &edits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupManager;
    use crate::executor::ProductRoots;
    use crate::result::ExecutionState;
    use crate::types::{ActionType, Priority};
    use std::path::PathBuf;
    use tempfile::TempDir;

    const LAYOUT: &str = r#"import type { Metadata } from "next";

export const metadata: Metadata = {
  title: "Old Title",
  description: "Old description",
  alternates: { canonical: "https://qr.example.com/" },
  openGraph: {
    images: ["/og-old.png"],
  },
};
"#;

    struct Fixture {
        dir: TempDir,
        ctx: ExecContext,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let ctx = ExecContext::new(
                ProductRoots::new(dir.path().join("products")),
                BackupManager::new(dir.path().join("backups")),
                false,
            );
            Self { dir, ctx }
        }

        fn file(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join("products/qr-generator").join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, content).unwrap();
            path
        }

        fn run(&self, action: &Action) -> ExecutionResult {
            MetaExecutor::new(&self.ctx).execute(action)
        }
    }

    fn action(action_type: ActionType, file: &str, key: &str, value: &str) -> Action {
        Action::new("action-1", Priority::High, "update", "qr-generator", action_type)
            .with_target_file(Some(file.to_string()))
            .with_parameter(key, value)
    }

    #[test]
    fn title_update_changes_only_title() {
        let fx = Fixture::new();
        let path = fx.file("src/app/layout.tsx", LAYOUT);

        let result = fx.run(&action(
            ActionType::UpdateMetaTitle,
            "src/app/layout.tsx",
            "new_title",
            "New Title",
        ));

        assert!(result.success, "{result}");
        assert_eq!(result.changed_files, vec![path.clone()]);
        assert_eq!(result.state, ExecutionState::Written);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, LAYOUT.replace("\"Old Title\"", "\"New Title\""));
    }

    #[test]
    fn missing_title_key_is_no_site_and_file_untouched() {
        let fx = Fixture::new();
        let original = "export const metadata = {\n  description: \"Only a description\",\n};\n";
        let path = fx.file("src/app/layout.tsx", original);

        let result = fx.run(&action(
            ActionType::UpdateMetaTitle,
            "src/app/layout.tsx",
            "new_title",
            "New Title",
        ));

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("MutationSiteNotFound"));
        assert_eq!(result.state, ExecutionState::NoSiteFound);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
        let backup = result.backup_path.expect("backup kept");
        assert!(backup.exists());
    }

    #[test]
    fn description_canonical_and_og_image() {
        let fx = Fixture::new();
        let path = fx.file("src/app/layout.tsx", LAYOUT);

        let desc = action(
            ActionType::UpdateMetaDescription,
            "src/app/layout.tsx",
            "new_description",
            "Make QR codes in seconds",
        );
        assert!(fx.run(&desc).success);

        let canonical = action(
            ActionType::UpdateCanonicalUrl,
            "src/app/layout.tsx",
            "canonical_url",
            "https://qr.example.com/en",
        );
        assert!(fx.run(&canonical).success);

        let og = action(
            ActionType::UpdateOgTags,
            "src/app/layout.tsx",
            "og_image",
            "/og-new.png",
        );
        assert!(fx.run(&og).success);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("description: \"Make QR codes in seconds\""));
        assert!(content.contains("canonical: \"https://qr.example.com/en\""));
        assert!(content.contains("images: [\"/og-new.png\"]"));
    }

    #[test]
    fn attribute_form_is_second_choice() {
        let fx = Fixture::new();
        let path = fx.file(
            "src/components/Header.tsx",
            "export const Head = () => <Seo title=\"Old\" />;\n",
        );

        let result = fx.run(&action(
            ActionType::UpdateMetaTitle,
            "src/components/Header.tsx",
            "new_title",
            "Say \"hi\"",
        ));

        assert!(result.success);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "export const Head = () => <Seo title=\"Say &quot;hi&quot;\" />;\n"
        );
    }

    #[test]
    fn object_literal_escapes_quotes() {
        let out = replace_script_field(
            "title: 'Old'",
            &script_patterns()[0],
            "It's fast",
        )
        .unwrap();
        assert_eq!(out, r"title: 'It\'s fast'");
    }

    #[test]
    fn only_the_metadata_title_changes() {
        let fx = Fixture::new();
        let original = r#"const features = [{ title: "Fast" }, { title: "Free" }];

export const metadata = { title: "Old Title" };

const cards = [{ title: "Simple" }];
"#;
        let path = fx.file("src/app/layout.tsx", original);

        let result = fx.run(&action(
            ActionType::UpdateMetaTitle,
            "src/app/layout.tsx",
            "new_title",
            "New Title",
        ));

        assert!(result.success, "{result}");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            original.replace("\"Old Title\"", "\"New Title\"")
        );
    }

    #[test]
    fn without_metadata_only_the_first_site_changes() {
        let out = replace_script_field(
            r#"<Seo title="A" /><Card title="B" />"#,
            &script_patterns()[0],
            "C",
        )
        .unwrap();
        assert_eq!(out, r#"<Seo title="C" /><Card title="B" />"#);
    }

    #[test]
    fn subtitle_key_is_not_a_title_site() {
        assert!(replace_script_field("subtitle: \"x\"", &script_patterns()[0], "y").is_none());
    }

    #[test]
    fn html_title_and_description() {
        let fx = Fixture::new();
        let html = "<html><head>\n<title>Old</title>\n<meta name=\"description\" content=\"Old\">\n</head><body></body></html>\n";
        let path = fx.file("index.html", html);

        let act = action(ActionType::UpdateMetaTitle, "index.html", "new_title", "Fast & Free")
            .with_parameter("new_description", "Convert images");
        let result = fx.run(&act);

        assert!(result.success);
        assert_eq!(result.message, "updated title, description in index.html");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<title>Fast &amp; Free</title>"));
        assert!(content.contains("content=\"Convert images\""));
    }

    #[test]
    fn html_without_description_never_invents_one() {
        let fx = Fixture::new();
        let html = "<html><head><title>Old</title></head></html>";
        let path = fx.file("index.html", html);

        let result = fx.run(&action(
            ActionType::UpdateMetaDescription,
            "index.html",
            "new_description",
            "New",
        ));

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("MutationSiteNotFound"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), html);
    }

    #[test]
    fn same_value_is_no_change() {
        let fx = Fixture::new();
        fx.file("src/app/layout.tsx", LAYOUT);
        let result = fx.run(&action(
            ActionType::UpdateMetaTitle,
            "src/app/layout.tsx",
            "new_title",
            "Old Title",
        ));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("NoChange"));
    }

    #[test]
    fn missing_parameter_and_unsupported_type_skip() {
        let fx = Fixture::new();
        fx.file("src/app/layout.tsx", LAYOUT);
        fx.file("main.py", "TITLE = 'x'\n");

        let no_param = Action::new("a", Priority::High, "d", "qr-generator", ActionType::UpdateMetaTitle)
            .with_target_file(Some("src/app/layout.tsx".into()));
        let result = fx.run(&no_param);
        assert_eq!(result.error.as_deref(), Some("MissingParameters"));
        assert_eq!(result.state, ExecutionState::Skipped);

        let py = action(ActionType::UpdateMetaTitle, "main.py", "new_title", "x");
        let result = fx.run(&py);
        assert_eq!(result.error.as_deref(), Some("UnsupportedFileType"));
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let fx = Fixture::new();
        let result = fx.run(&action(
            ActionType::UpdateMetaTitle,
            "src/app/layout.tsx",
            "new_title",
            "x",
        ));
        assert_eq!(result.error.as_deref(), Some("FileNotFound"));
        assert!(result.backup_path.is_none());
    }
}
