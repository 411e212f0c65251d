//! Position-based locators over raw WordprocessingML text.
//!
//! Nothing here builds a tree: elements are found by tag name and matched to
//! their closing tag by depth counting, so nested paragraphs (text boxes inside
//! drawings) stay inside their outer paragraph's span.

use once_cell::sync::Lazy;
use regex::Regex;

pub const PARAGRAPH: &str = "w:p";
pub const RUN: &str = "w:r";

static TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("text regex"));

static RUN_PROPS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^<w:r(?:\s[^>]*)?>\s*(<w:rPr>.*?</w:rPr>|<w:rPr/>)").expect("rpr regex"));

/// Byte offsets of one element inside a document text.
///
/// For a self-closing element `open_end == close_start == end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementSpan {
    pub start: usize,
    pub open_end: usize,
    pub close_start: usize,
    pub end: usize,
}

impl ElementSpan {
    pub fn is_self_closing(&self) -> bool {
        self.open_end == self.end
    }

    /// True when `[from, to)` lies strictly inside this element's markup.
    pub fn encloses(&self, from: usize, to: usize) -> bool {
        self.start < from && to <= self.end
    }

    pub fn slice<'a>(&self, xml: &'a str) -> &'a str {
        &xml[self.start..self.end]
    }
}

/// Finds the next opening (or self-closing) tag named exactly `name` at or after `from`.
/// `<w:pPr>` never matches a search for `w:p`.
pub fn find_open_tag(xml: &str, from: usize, name: &str) -> Option<usize> {
    let needle = format!("<{name}");
    let mut pos = from;
    while let Some(rel) = xml.get(pos..)?.find(&needle) {
        let at = pos + rel;
        let after = at + needle.len();
        match xml.as_bytes().get(after) {
            Some(b' ' | b'\t' | b'\r' | b'\n' | b'/' | b'>') => return Some(at),
            _ => pos = after,
        }
    }
    None
}

fn tag_end(xml: &str, start: usize) -> Option<usize> {
    xml.get(start..)?.find('>').map(|i| start + i + 1)
}

fn ends_self_closing(xml: &str, tag_end: usize) -> bool {
    tag_end >= 2 && xml.as_bytes()[tag_end - 2] == b'/'
}

/// Resolves the element whose opening tag starts at `start`.
pub fn element_at(xml: &str, start: usize, name: &str) -> Option<ElementSpan> {
    let open_end = tag_end(xml, start)?;
    if ends_self_closing(xml, open_end) {
        return Some(ElementSpan {
            start,
            open_end,
            close_start: open_end,
            end: open_end,
        });
    }

    let close_needle = format!("</{name}>");
    let mut depth = 1usize;
    let mut pos = open_end;
    loop {
        let next_close = xml.get(pos..)?.find(&close_needle).map(|i| pos + i)?;
        match find_open_tag(xml, pos, name).filter(|&o| o < next_close) {
            Some(open) => {
                let inner_end = tag_end(xml, open)?;
                if !ends_self_closing(xml, inner_end) {
                    depth += 1;
                }
                pos = inner_end;
            }
            None => {
                depth -= 1;
                let end = next_close + close_needle.len();
                if depth == 0 {
                    return Some(ElementSpan {
                        start,
                        open_end,
                        close_start: next_close,
                        end,
                    });
                }
                pos = end;
            }
        }
    }
}

/// All outermost `name` elements in document order. Elements nested inside an
/// earlier match are not reported separately; unclosed tags are skipped.
pub fn element_spans(xml: &str, name: &str) -> Vec<ElementSpan> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    while let Some(start) = find_open_tag(xml, pos, name) {
        match element_at(xml, start, name) {
            Some(span) => {
                pos = span.end;
                out.push(span);
            }
            None => pos = start + name.len() + 1,
        }
    }
    out
}

/// Texts of every `<w:t>` element in the fragment, entity references resolved.
pub fn text_runs(fragment: &str) -> Vec<String> {
    TEXT_RE
        .captures_iter(fragment)
        .map(|caps| {
            let raw = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            quick_xml::escape::unescape(raw)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
        .collect()
}

pub fn text_content(fragment: &str) -> String {
    text_runs(fragment).concat()
}

/// The `<w:rPr>` block at the head of a run fragment, if any.
pub fn run_properties(run: &str) -> Option<&str> {
    RUN_PROPS_RE
        .captures(run)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Locates `<w:bookmarkEnd w:id="id"/>` at or after `from`; returns its byte range.
pub fn find_bookmark_end(xml: &str, from: usize, bookmark_id: u32) -> Option<(usize, usize)> {
    let pat = format!(r#"<w:bookmarkEnd\s[^>]*?\bw:id="{bookmark_id}"[^>]*/>"#);
    let re = Regex::new(&pat).ok()?;
    re.find_at(xml, from).map(|m| (m.start(), m.end()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn open_tag_search_skips_paragraph_properties() {
        let xml = "<w:pPr/><w:p>x</w:p>";
        assert_eq!(find_open_tag(xml, 0, PARAGRAPH), Some(8));
    }

    #[test]
    fn nested_paragraphs_stay_inside_outer_span() {
        let xml = concat!(
            "<w:p><w:r><w:drawing><w:txbxContent><w:p><w:r><w:t>inner</w:t></w:r></w:p>",
            "</w:txbxContent></w:drawing></w:r></w:p><w:p/>"
        );
        let spans = element_spans(xml, PARAGRAPH);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].start, 0);
        assert!(spans[0].slice(xml).ends_with("</w:drawing></w:r></w:p>"));
        assert!(spans[1].is_self_closing());
        assert_eq!(spans[1].slice(xml), "<w:p/>");
    }

    #[test]
    fn text_content_resolves_entities() {
        let run = r#"<w:r><w:t xml:space="preserve">A &amp; </w:t><w:tab/><w:t>B</w:t></w:r>"#;
        assert_eq!(text_content(run), "A & B");
        assert_eq!(text_runs(run).len(), 2);
    }

    #[test]
    fn run_properties_are_taken_from_run_head() {
        let run = "<w:r><w:rPr><w:b/><w:sz w:val=\"24\"/></w:rPr><w:t>Date: </w:t></w:r>";
        assert_eq!(run_properties(run), Some("<w:rPr><w:b/><w:sz w:val=\"24\"/></w:rPr>"));
        assert_eq!(run_properties("<w:r><w:t>x</w:t></w:r>"), None);
    }

    #[test]
    fn bookmark_end_matches_exact_id() {
        let xml = r#"<w:bookmarkEnd w:id="10"/><w:bookmarkEnd w:id="0"/>"#;
        let (start, end) = find_bookmark_end(xml, 0, 0).expect("bookmark 0");
        assert_eq!(&xml[start..end], r#"<w:bookmarkEnd w:id="0"/>"#);
        assert!(find_bookmark_end(xml, 0, 1).is_none());
    }
}
