//! The report micro-grammar.
//!
//! ```text
//! report   := ... heading(high priority) section ...
//! section  := item*                 (until the next heading)
//! item     := LINE_START N "." text (until the next item marker)
//! text     := [product] first-line fields*
//! ```
//!
//! Every field is read with an ordered pattern table; the first pattern that
//! matches wins. Each function here is pure so the grammar can be tested
//! without the extraction glue.

use crate::types::ActionType;
use regex::Regex;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Section and items
// ---------------------------------------------------------------------------

static HEADING_RE: OnceLock<Regex> = OnceLock::new();
static HIGH_PRIORITY_RE: OnceLock<Regex> = OnceLock::new();
static ITEM_RE: OnceLock<Regex> = OnceLock::new();

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]").unwrap())
}

fn high_priority_re() -> &'static Regex {
    HIGH_PRIORITY_RE.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*#{2,6}[ \t].*(?:high[ \t]+priority|top[ \t]+priority|최우선[ \t]*과제).*$")
            .unwrap()
    })
}

fn item_re() -> &'static Regex {
    // Whitespace after the dot keeps "1.5x faster" from opening an item.
    ITEM_RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*\d+\.(?:[ \t]+|$)").unwrap())
}

/// Body of the high-priority section, up to the next heading or the end.
pub fn high_priority_section(report: &str) -> Option<&str> {
    let heading = high_priority_re().find(report)?;
    let body = &report[heading.end()..];
    let end = heading_re().find(body).map_or(body.len(), |m| m.start());
    Some(&body[..end])
}

/// Numbered items of a section, in source order, trimmed. Empty items are
/// dropped.
pub fn split_items(section: &str) -> Vec<&str> {
    let markers: Vec<_> = item_re().find_iter(section).collect();
    markers
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let end = markers.get(i + 1).map_or(section.len(), |next| next.start());
            section[m.end()..end].trim()
        })
        .filter(|item| !item.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Product tokens
// ---------------------------------------------------------------------------

static LEADING_BRACKET_RE: OnceLock<Regex> = OnceLock::new();
static RESPONSIBLE_RE: OnceLock<Regex> = OnceLock::new();

fn leading_bracket_re() -> &'static Regex {
    LEADING_BRACKET_RE.get_or_init(|| Regex::new(r"^\*{0,2}\[([^\]\n]+)\]\*{0,2}[ \t]*").unwrap())
}

fn responsible_re() -> &'static Regex {
    RESPONSIBLE_RE.get_or_init(|| {
        Regex::new(r"(?i)(?:담당|responsible|owner)\*{0,2}\s*:\s*\*{0,2}\[([^\]\n]+)\]").unwrap()
    })
}

/// Bracketed name at the start of an item: `[Name]` or `**[Name]**`.
/// Returns the name and the byte length of the whole token.
pub fn leading_bracket(item: &str) -> Option<(&str, usize)> {
    let caps = leading_bracket_re().captures(item)?;
    let whole = caps.get(0)?;
    Some((caps.get(1)?.as_str().trim(), whole.end()))
}

/// Bracketed name after a responsible label (`담당:`, `responsible:`, `owner:`).
pub fn responsible(item: &str) -> Option<&str> {
    responsible_re()
        .captures(item)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

static TARGET_FILE_RE: OnceLock<Regex> = OnceLock::new();
static IMPACT_RE: OnceLock<Regex> = OnceLock::new();

fn target_file_re() -> &'static Regex {
    TARGET_FILE_RE.get_or_init(|| {
        Regex::new(r"`([^`\s]+\.(?:tsx|ts|jsx|js|mjs|html|htm|py))`").unwrap()
    })
}

fn impact_re() -> &'static Regex {
    IMPACT_RE.get_or_init(|| {
        Regex::new(
            r"(?im)(?:expected[ \t]+impact|expected[ \t]+effect|예상[ \t]*효과)\*{0,2}[ \t]*:[ \t]*\*{0,2}[ \t]*(.+)$",
        )
        .unwrap()
    })
}

/// First code span naming a file with a recognized source extension.
pub fn target_file(item: &str) -> Option<&str> {
    target_file_re()
        .captures(item)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub fn expected_impact(item: &str) -> Option<&str> {
    impact_re()
        .captures(item)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Quoted values
// ---------------------------------------------------------------------------

static QUOTE_RES: OnceLock<Vec<Regex>> = OnceLock::new();
static KOREAN_VALUE_RE: OnceLock<Regex> = OnceLock::new();
static CODE_SPAN_RE: OnceLock<Regex> = OnceLock::new();

fn quote_res() -> &'static [Regex] {
    QUOTE_RES.get_or_init(|| {
        [
            r#""([^"\n]+)""#,
            r"“([^”\n]+)”",
            // An apostrophe inside a word does not open a quote.
            r"(?:^|[^\w])'([^'\n]+)'",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn korean_value_re() -> &'static Regex {
    KOREAN_VALUE_RE.get_or_init(|| {
        Regex::new(r"([A-Za-z0-9가-힣][A-Za-z0-9가-힣 \t/:.\-]*?)[ \t]*(?:으로|로)[ \t]+(?:변경|업데이트|추가|교체)")
            .unwrap()
    })
}

fn code_span_re() -> &'static Regex {
    CODE_SPAN_RE.get_or_init(|| Regex::new(r"`[^`]*`").unwrap())
}

/// Quoted values in `text`, using the first quote style that matches at all.
pub fn quoted_values(text: &str) -> Vec<&str> {
    for re in quote_res() {
        let values: Vec<&str> = re
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .filter(|v| !v.is_empty())
            .collect();
        if !values.is_empty() {
            return values;
        }
    }
    Vec::new()
}

/// Value placed directly before a Korean change verb:
/// `타이틀을 Free QR Generator로 변경` → `Free QR Generator`.
/// A leading object phrase (`...을 `/`...를 `) is dropped.
pub fn korean_value(text: &str) -> Option<&str> {
    korean_value_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| {
            let v = m.as_str();
            v.rsplit_once("을 ")
                .or_else(|| v.rsplit_once("를 "))
                .map_or(v, |(_, rest)| rest)
                .trim()
        })
        .filter(|v| !v.is_empty())
}

/// `text` with quoted values and code spans blanked out.
pub fn strip_quoted(text: &str) -> String {
    let mut out = code_span_re().replace_all(text, " ").into_owned();
    for re in quote_res() {
        out = re.replace_all(&out, " ").into_owned();
    }
    out
}

// ---------------------------------------------------------------------------
// Action type inference
// ---------------------------------------------------------------------------

/// Keyword classes, in both report languages. When several classes match,
/// the one whose keyword appears earliest in the text wins.
const KEYWORDS: &[(ActionType, &[&str])] = &[
    (
        ActionType::UpdateCanonicalUrl,
        &["canonical", "캐노니컬", "표준 url"],
    ),
    (
        ActionType::UpdateOgTags,
        &["og tag", "og:", "og image", "open graph", "opengraph", "오픈그래프"],
    ),
    (
        ActionType::AddInternalLink,
        &["internal link", "link", "링크"],
    ),
    (
        ActionType::UpdateMetaDescription,
        &["meta description", "description", "설명"],
    ),
    (
        ActionType::UpdateMetaTitle,
        &["meta title", "title", "타이틀", "제목"],
    ),
];

/// Infer the action type from a description. Quoted values and code spans
/// are ignored so a new title containing "link" stays a title edit.
/// `None` when no keyword class matches.
pub fn infer_action_type(description: &str) -> Option<ActionType> {
    let text = strip_quoted(description).to_lowercase();
    KEYWORDS
        .iter()
        .filter_map(|(action_type, words)| {
            words
                .iter()
                .filter_map(|w| text.find(w))
                .min()
                .map(|pos| (pos, *action_type))
        })
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, action_type)| action_type)
}

/// True for values that look like a link target rather than link text.
pub fn looks_like_url(value: &str) -> bool {
    value.starts_with('/') || value.starts_with("http://") || value.starts_with("https://")
}
