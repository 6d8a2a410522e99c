//! Minimal HTML tag scanner for in-place edits.
//!
//! The scanner records the byte span of every tag and attribute value so an
//! edit can replace exactly one span and leave every other byte of the
//! document untouched. Comments, doctype/processing instructions and the
//! bodies of raw-text elements (`script`, `style`, `title`, `textarea`) are
//! skipped so markup-looking text inside them is never treated as a tag.

use std::ops::Range;

const RAW_TEXT: &[&str] = &["script", "style", "title", "textarea"];

// ---------------------------------------------------------------------------
// Tag / Attr
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    /// Lower-cased attribute name.
    pub name: String,
    /// Span of the value without surrounding quotes; `None` for bare
    /// attributes such as `async`.
    pub value: Option<Range<usize>>,
    pub quoted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// Lower-cased element name.
    pub name: String,
    /// Span from `<` through `>`.
    pub span: Range<usize>,
    pub closing: bool,
    pub attrs: Vec<Attr>,
}

impl Tag {
    pub fn attr(&self, name: &str) -> Option<&Attr> {
        self.attrs.iter().find(|a| a.name == name)
    }

    /// Attribute value as written in the source.
    pub fn attr_value<'s>(&self, src: &'s str, name: &str) -> Option<&'s str> {
        self.attr(name)
            .and_then(|a| a.value.clone())
            .map(|r| &src[r])
    }

    fn attr_eq(&self, src: &str, name: &str, expected: &str) -> bool {
        self.attr_value(src, name)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case(expected))
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// All tags in document order.
pub fn scan(src: &str) -> Vec<Tag> {
    let bytes = src.as_bytes();
    let mut tags = Vec::new();
    let mut i = 0;

    while let Some(offset) = src[i..].find('<') {
        let start = i + offset;
        let rest = &src[start..];

        if rest.starts_with("<!--") {
            i = match rest.find("-->") {
                Some(end) => start + end + 3,
                None => src.len(),
            };
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            i = match rest.find('>') {
                Some(end) => start + end + 1,
                None => src.len(),
            };
            continue;
        }

        let closing = bytes.get(start + 1) == Some(&b'/');
        let name_start = start + if closing { 2 } else { 1 };
        if !bytes.get(name_start).is_some_and(u8::is_ascii_alphabetic) {
            i = start + 1;
            continue;
        }

        let (tag, end) = parse_tag(src, start, name_start, closing);
        i = end;

        if !tag.closing && RAW_TEXT.contains(&tag.name.as_str()) {
            // Jump to the matching close tag; it is scanned on the next pass.
            let needle = format!("</{}", tag.name);
            i = find_ascii_ci(src, i, &needle).unwrap_or(src.len());
        }
        tags.push(tag);
    }

    tags
}

fn parse_tag(src: &str, start: usize, name_start: usize, closing: bool) -> (Tag, usize) {
    let bytes = src.as_bytes();
    let mut i = name_start;
    while i < bytes.len() && !is_name_end(bytes[i]) {
        i += 1;
    }
    let name = src[name_start..i].to_ascii_lowercase();

    let mut attrs = Vec::new();
    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        if bytes[i] == b'>' {
            i += 1;
            break;
        }

        let attr_start = i;
        while i < bytes.len() && !is_name_end(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }
        let attr_name = src[attr_start..i].to_ascii_lowercase();

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j < bytes.len() && bytes[j] == b'=' {
            j += 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            match bytes.get(j) {
                Some(&q) if q == b'"' || q == b'\'' => {
                    let value_start = j + 1;
                    let value_end = src[value_start..]
                        .find(q as char)
                        .map_or(src.len(), |e| value_start + e);
                    attrs.push(Attr {
                        name: attr_name,
                        value: Some(value_start..value_end),
                        quoted: true,
                    });
                    i = (value_end + 1).min(src.len());
                }
                _ => {
                    let value_start = j;
                    while j < bytes.len() && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>' {
                        j += 1;
                    }
                    attrs.push(Attr {
                        name: attr_name,
                        value: Some(value_start..j),
                        quoted: false,
                    });
                    i = j;
                }
            }
        } else {
            if !attr_name.is_empty() {
                attrs.push(Attr {
                    name: attr_name,
                    value: None,
                    quoted: false,
                });
            }
            if i == attr_start {
                // Stray character; step over it.
                i += 1;
            }
        }
    }

    let tag = Tag {
        name,
        span: start..i,
        closing,
        attrs,
    };
    (tag, i)
}

fn is_name_end(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'>' || b == b'/'
}

fn find_ascii_ci(haystack: &str, from: usize, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    (from..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// Element an attribute edit targets, identified by a selector attribute.
#[derive(Debug, Clone, Copy)]
pub struct Selector<'a> {
    pub element: &'a str,
    pub key: &'a str,
    pub key_value: &'a str,
    /// Attribute whose value is replaced.
    pub target: &'a str,
}

pub const META_DESCRIPTION: Selector<'static> = Selector {
    element: "meta",
    key: "name",
    key_value: "description",
    target: "content",
};

pub const OG_IMAGE: Selector<'static> = Selector {
    element: "meta",
    key: "property",
    key_value: "og:image",
    target: "content",
};

pub const CANONICAL: Selector<'static> = Selector {
    element: "link",
    key: "rel",
    key_value: "canonical",
    target: "href",
};

/// Replace the text of the document `<title>`. Returns `None` when the
/// document has no title element.
pub fn set_title(src: &str, text: &str) -> Option<String> {
    let tags = scan(src);
    let head_end = tags
        .iter()
        .find(|t| t.closing && t.name == "head")
        .map_or(src.len(), |t| t.span.start);

    let open = tags
        .iter()
        .position(|t| !t.closing && t.name == "title" && t.span.start < head_end)?;
    let close = tags[open + 1..]
        .iter()
        .find(|t| t.closing && t.name == "title")?;

    Some(splice(
        src,
        tags[open].span.end..close.span.start,
        &escape_text(text),
    ))
}

/// Replace the `target` attribute of the first element matching `selector`.
/// Returns `None` when no such element (or attribute) exists.
pub fn set_attribute(src: &str, selector: Selector<'_>, value: &str) -> Option<String> {
    let tags = scan(src);
    let tag = tags.iter().find(|t| {
        !t.closing && t.name == selector.element && t.attr_eq(src, selector.key, selector.key_value)
    })?;
    let attr = tag.attr(selector.target)?;
    let span = attr.value.clone()?;

    let escaped = escape_attr(value);
    let replacement = if attr.quoted {
        escaped
    } else {
        format!("\"{escaped}\"")
    };
    Some(splice(src, span, &replacement))
}

/// Byte offset of the last `</name>` tag.
pub fn last_close_tag(src: &str, name: &str) -> Option<usize> {
    scan(src)
        .iter()
        .rev()
        .find(|t| t.closing && t.name == name)
        .map(|t| t.span.start)
}

/// True when any `<a>` or `<link>` element points at `href`.
pub fn has_link_to(src: &str, href: &str) -> bool {
    scan(src).iter().any(|t| {
        !t.closing && (t.name == "a" || t.name == "link") && t.attr_value(src, "href") == Some(href)
    })
}

fn splice(src: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(src.len() + replacement.len());
    out.push_str(&src[..range.start]);
    out.push_str(replacement);
    out.push_str(&src[range.end..]);
    out
}

pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <!-- <title>commented out</title> -->
  <title>Old Title</title>
  <meta name="description" content="Old description">
  <meta property='og:image' content='/og-old.png' />
  <link rel="canonical" href="https://example.com/old">
  <script>if (a < b) { document.title = "<title>x</title>"; }</script>
</head>
<body>
  <main><p>Hello</p></main>
  <footer><a href="/about">About</a></footer>
</body>
</html>
"#;

    #[test]
    fn scan_skips_comments_and_raw_text() {
        let tags = scan(PAGE);
        let titles: Vec<_> = tags.iter().filter(|t| t.name == "title").collect();
        assert_eq!(titles.len(), 2, "one open, one close");
        assert!(!tags.iter().any(|t| t.name == "b"));
    }

    #[test]
    fn set_title_replaces_only_inner_text() {
        let out = set_title(PAGE, "Fast & Free").unwrap();
        assert!(out.contains("<title>Fast &amp; Free</title>"));
        assert!(out.contains("<!-- <title>commented out</title> -->"));
        assert_eq!(out.replace("Fast &amp; Free", "Old Title"), PAGE);
    }

    #[test]
    fn set_title_absent() {
        assert!(set_title("<html><head></head></html>", "x").is_none());
    }

    #[test]
    fn title_inside_body_svg_is_ignored() {
        let src = "<html><head></head><body><svg><title>icon</title></svg></body></html>";
        assert!(set_title(src, "x").is_none());
    }

    #[test]
    fn set_meta_description() {
        let out = set_attribute(PAGE, META_DESCRIPTION, "Say \"hi\"").unwrap();
        assert!(out.contains(r#"<meta name="description" content="Say &quot;hi&quot;">"#));
    }

    #[test]
    fn set_og_image_single_quotes() {
        let out = set_attribute(PAGE, OG_IMAGE, "/og-new.png").unwrap();
        assert!(out.contains("<meta property='og:image' content='/og-new.png' />"));
    }

    #[test]
    fn set_canonical_href() {
        let out = set_attribute(PAGE, CANONICAL, "https://example.com/new").unwrap();
        assert!(out.contains(r#"<link rel="canonical" href="https://example.com/new">"#));
    }

    #[test]
    fn unquoted_attribute_gets_quotes() {
        let src = "<meta name=description content=old>";
        let out = set_attribute(src, META_DESCRIPTION, "new value").unwrap();
        assert_eq!(out, r#"<meta name=description content="new value">"#);
    }

    #[test]
    fn missing_element_is_none() {
        assert!(set_attribute("<head><title>x</title></head>", META_DESCRIPTION, "d").is_none());
    }

    #[test]
    fn last_close_tag_and_links() {
        let main = last_close_tag(PAGE, "main").unwrap();
        assert!(PAGE[main..].starts_with("</main>"));
        assert!(last_close_tag(PAGE, "article").is_none());
        assert!(has_link_to(PAGE, "/about"));
        assert!(!has_link_to(PAGE, "/pricing"));
    }

    #[test]
    fn non_ascii_text_is_preserved() {
        let src = "<head><title>무료 QR 코드</title></head><p>한국어 본문</p>";
        let out = set_title(src, "새 제목").unwrap();
        assert_eq!(out, "<head><title>새 제목</title></head><p>한국어 본문</p>");
    }
}
