//! Internal-link insertion.
//!
//! The link is placed just before the last closing landmark of the file:
//! `</main>`, then `</footer>`, then `</body>` for HTML, then the last
//! `</div>`. A file with none of these is declined. A file that already links
//! to the URL is left alone.

use super::{skipped, ExecContext, Executor, FileKind};
use crate::action::Action;
use crate::error::{Result, SeoError};
use crate::markup;
use crate::result::ExecutionResult;
use std::path::Path;
use std::time::Instant;

const SCRIPT_ANCHORS: &[&str] = &["main", "footer", "div"];
const MARKUP_ANCHORS: &[&str] = &["main", "footer", "body", "div"];

// ---------------------------------------------------------------------------
// Snippets
// ---------------------------------------------------------------------------

fn jsx_text(s: &str) -> String {
    markup::escape_text(s)
        .replace('{', "&#123;")
        .replace('}', "&#125;")
}

fn snippet(kind: FileKind, url: &str, text: &str) -> (String, String, String) {
    let href = markup::escape_attr(url);
    match kind {
        FileKind::Script => (
            r#"<div className="mt-4 text-sm text-gray-500">"#.to_string(),
            format!(r#"<a href="{href}" className="hover:underline text-blue-600">{}</a>"#, jsx_text(text)),
            "</div>".to_string(),
        ),
        FileKind::Markup => (
            r#"<div style="margin-top: 20px; font-size: 0.9em;">"#.to_string(),
            format!(r#"<a href="{href}">{}</a>"#, markup::escape_text(text)),
            "</div>".to_string(),
        ),
    }
}

/// Insert the snippet before `anchor`, matching the anchor line's indentation
/// when the closing tag starts its own line.
fn insert_at(src: &str, anchor: usize, kind: FileKind, url: &str, text: &str) -> String {
    let (open, link, close) = snippet(kind, url, text);
    let line_start = src[..anchor].rfind('\n').map_or(0, |i| i + 1);
    let lead = &src[line_start..anchor];

    let mut out = String::with_capacity(src.len() + open.len() + link.len() + 64);
    if lead.chars().all(char::is_whitespace) {
        out.push_str(&src[..line_start]);
        out.push_str(&format!("{lead}  {open}\n{lead}    {link}\n{lead}  {close}\n"));
        out.push_str(&src[line_start..]);
    } else {
        out.push_str(&src[..anchor]);
        out.push_str(&format!("{open}{link}{close}"));
        out.push_str(&src[anchor..]);
    }
    out
}

fn find_anchor(kind: FileKind, src: &str) -> Option<usize> {
    match kind {
        FileKind::Script => SCRIPT_ANCHORS
            .iter()
            .find_map(|name| src.rfind(&format!("</{name}>"))),
        FileKind::Markup => MARKUP_ANCHORS
            .iter()
            .find_map(|name| markup::last_close_tag(src, name)),
    }
}

fn already_linked(kind: FileKind, src: &str, url: &str) -> bool {
    match kind {
        FileKind::Script => {
            src.contains(&format!("href=\"{url}\""))
                || src.contains(&format!("href='{url}'"))
                || src.contains(&format!("href={{\"{url}\"}}"))
        }
        FileKind::Markup => markup::has_link_to(src, url),
    }
}

fn apply(kind: FileKind, path: &Path, src: &str, url: &str, text: &str) -> Result<(String, String)> {
    if already_linked(kind, src, url) {
        return Err(SeoError::NoChange(path.to_path_buf()));
    }
    let anchor = find_anchor(kind, src).ok_or_else(|| SeoError::MutationSiteNotFound {
        path: path.to_path_buf(),
        fields: "link anchor".to_string(),
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok((
        insert_at(src, anchor, kind, url, text),
        format!("inserted link to {url} in {name}"),
    ))
}

// ---------------------------------------------------------------------------
// LinkExecutor
// ---------------------------------------------------------------------------

pub struct LinkExecutor<'a> {
    ctx: &'a ExecContext,
}

impl<'a> LinkExecutor<'a> {
    pub fn new(ctx: &'a ExecContext) -> Self {
        Self { ctx }
    }
}

impl Executor for LinkExecutor<'_> {
    fn execute(&self, action: &Action) -> ExecutionResult {
        let started = Instant::now();
        let prepared = self.ctx.target_path(action).and_then(|path| {
            let kind = FileKind::of(&path)?;
            let url = action
                .parameter("link_url")
                .ok_or_else(|| SeoError::MissingParameters("link_url".to_string()))?;
            Ok((path, kind, url))
        });
        let (path, kind, url) = match prepared {
            Ok(p) => p,
            Err(e) => return skipped(action, &e, started),
        };
        let text = action.parameter("link_text").unwrap_or(url);

        self.ctx
            .transact(action, &path, |src| apply(kind, &path, src, url, text))
    }
}
