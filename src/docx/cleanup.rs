//! Blank paragraph removal around the two places where leftover empty
//! paragraphs push content onto an extra page: right after the dynamic
//! region's bookmark end, and right before the final section properties.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::docx::scan::{element_spans, find_bookmark_end, text_runs, ElementSpan, PARAGRAPH};
use crate::textutil::is_blank_text;

pub const DEFAULT_MAX_BLANK_SCAN: usize = 500;

const SECTION_PROPERTIES: &str = "w:sectPr";

// Images, pictures, tables, embedded objects and field codes.
const MEANINGFUL_MARKERS: [&str; 8] = [
    "<w:drawing",
    "<w:pict",
    "<v:imagedata",
    "<w:tbl",
    "<w:object",
    "<w:fldChar",
    "<w:fldSimple",
    "<w:instrText",
];

/// A paragraph may go only if it carries no section properties, no meaningful
/// marker, and every text run is blank once whitespace and invisible
/// characters are dropped.
pub fn is_removable_paragraph(fragment: &str) -> bool {
    if fragment.contains("<w:sectPr") {
        return false;
    }
    if MEANINGFUL_MARKERS.iter().any(|m| fragment.contains(m)) {
        return false;
    }
    text_runs(fragment).iter().all(|t| is_blank_text(t))
}

// Self-closing range markers that carry no content of their own. Word closes
// nested bookmarks back to back, so these may sit between blank paragraphs.
static INERT_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<w:(?:bookmarkStart|bookmarkEnd|proofErr|permStart|permEnd)\b[^>]*/>")
        .expect("inert marker")
});

/// True when the markup between two paragraphs is only whitespace and inert
/// range markers. Any other markup, such as a table, ends a walk.
fn is_passable_gap(gap: &str) -> bool {
    INERT_MARKER_RE.replace_all(gap, "").trim().is_empty()
}

fn remove_spans(xml: &str, spans: &[ElementSpan]) -> String {
    if spans.is_empty() {
        return xml.to_string();
    }
    let mut out = String::with_capacity(xml.len());
    let mut pos = 0usize;
    for span in spans {
        out.push_str(&xml[pos..span.start]);
        pos = span.end;
    }
    out.push_str(&xml[pos..]);
    out
}

/// Drops consecutive removable paragraphs following the end marker of
/// `bookmark_id`. Bookmark and proofing markers in between are stepped over
/// and kept. Stops at the first paragraph that must stay, at any other
/// non-paragraph markup, or after `max_scan` paragraphs.
pub fn remove_blank_after_bookmark(xml: &str, bookmark_id: u32, max_scan: usize) -> String {
    let Some((mark_start, mark_end)) = find_bookmark_end(xml, 0, bookmark_id) else {
        debug!(bookmark_id, "bookmark end not present; nothing to clean");
        return xml.to_string();
    };
    let paragraphs = element_spans(xml, PARAGRAPH);
    // The marker may sit inside a paragraph; scanning starts after that paragraph.
    let first = paragraphs
        .iter()
        .find(|p| p.encloses(mark_start, mark_end))
        .map(|p| p.end)
        .unwrap_or(mark_end);

    let mut boundary = first;
    let mut doomed: Vec<ElementSpan> = Vec::new();
    for span in paragraphs.iter().filter(|p| p.start >= first).take(max_scan) {
        if !is_passable_gap(&xml[boundary..span.start]) || !is_removable_paragraph(span.slice(xml)) {
            break;
        }
        doomed.push(*span);
        boundary = span.end;
    }
    debug!(bookmark_id, removed = doomed.len(), "blank paragraphs after bookmark");
    remove_spans(xml, &doomed)
}

/// Walks backwards from the paragraph holding the last section properties
/// (or from the body-level `<w:sectPr>`) and drops the removable paragraphs
/// directly before it. That paragraph and everything after it is untouched.
pub fn remove_blank_before_section_end(xml: &str, max_scan: usize) -> String {
    let Some(sect) = element_spans(xml, SECTION_PROPERTIES).last().copied() else {
        debug!("no section properties; nothing to clean");
        return xml.to_string();
    };
    let paragraphs = element_spans(xml, PARAGRAPH);
    let first = paragraphs
        .iter()
        .find(|p| p.encloses(sect.start, sect.end))
        .map(|p| p.start)
        .unwrap_or(sect.start);

    let mut boundary = first;
    let mut doomed: Vec<ElementSpan> = Vec::new();
    for span in paragraphs.iter().rev().filter(|p| p.end <= first).take(max_scan) {
        if !is_passable_gap(&xml[span.end..boundary]) || !is_removable_paragraph(span.slice(xml)) {
            break;
        }
        doomed.push(*span);
        boundary = span.start;
    }
    doomed.reverse();
    debug!(removed = doomed.len(), "blank paragraphs before section end");
    remove_spans(xml, &doomed)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const SECT: &str = r#"<w:p><w:pPr><w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:pPr></w:p>"#;
    const KEEP: &str = "<w:p><w:r><w:t>keep</w:t></w:r></w:p>";
    const MARK: &str = r#"<w:bookmarkEnd w:id="0"/>"#;

    #[rstest]
    #[case("<w:p/>", true)]
    #[case("<w:p></w:p>", true)]
    #[case(r#"<w:p><w:pPr><w:spacing w:after="0"/></w:pPr><w:r><w:t xml:space="preserve">  </w:t></w:r></w:p>"#, true)]
    #[case("<w:p><w:r><w:t>\u{200B}\u{FEFF}</w:t></w:r></w:p>", true)]
    #[case("<w:p><w:r><w:t>x</w:t></w:r></w:p>", false)]
    #[case("<w:p><w:r><w:drawing><wp:inline/></w:drawing></w:r></w:p>", false)]
    #[case("<w:p><w:r><w:pict><v:shape/></w:pict><w:t></w:t></w:r></w:p>", false)]
    #[case(r#"<w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:t> </w:t></w:r></w:p>"#, false)]
    #[case(r#"<w:p><w:fldSimple w:instr="PAGE"/></w:p>"#, false)]
    #[case("<w:p><w:r><w:object/></w:r></w:p>", false)]
    #[case(SECT, false)]
    fn removability(#[case] fragment: &str, #[case] removable: bool) {
        assert_eq!(is_removable_paragraph(fragment), removable);
    }

    #[test]
    fn after_bookmark_removes_run_of_blanks_and_is_idempotent() {
        let blanks = "<w:p/>".repeat(40);
        let doc = format!("{KEEP}{MARK}{blanks}<w:p><w:r><w:t> </w:t></w:r></w:p>{KEEP}{SECT}");
        let once = remove_blank_after_bookmark(&doc, 0, DEFAULT_MAX_BLANK_SCAN);
        assert_eq!(once, format!("{KEEP}{MARK}{KEEP}{SECT}"));
        let twice = remove_blank_after_bookmark(&once, 0, DEFAULT_MAX_BLANK_SCAN);
        assert_eq!(twice, once);
    }

    #[test]
    fn after_bookmark_respects_scan_bound() {
        let doc = format!("{MARK}{}{SECT}", "<w:p/>".repeat(10));
        let out = remove_blank_after_bookmark(&doc, 0, 4);
        assert_eq!(out, format!("{MARK}{}{SECT}", "<w:p/>".repeat(6)));
    }

    #[test]
    fn after_bookmark_keeps_images_and_tables() {
        let image = "<w:p><w:r><w:drawing/></w:r><w:r><w:t></w:t></w:r></w:p>";
        let doc = format!("{MARK}<w:p/>{image}<w:p/>{SECT}");
        let out = remove_blank_after_bookmark(&doc, 0, DEFAULT_MAX_BLANK_SCAN);
        assert_eq!(out, format!("{MARK}{image}<w:p/>{SECT}"));

        let table = "<w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>";
        let doc = format!("{MARK}{table}<w:p/>");
        assert_eq!(remove_blank_after_bookmark(&doc, 0, DEFAULT_MAX_BLANK_SCAN), doc);
    }

    #[test]
    fn after_bookmark_handles_marker_inside_paragraph() {
        let holder = format!("<w:p><w:r><w:t>end</w:t></w:r>{MARK}</w:p>");
        let doc = format!("{holder}\n<w:p/>\n<w:p/>\n{SECT}");
        let out = remove_blank_after_bookmark(&doc, 0, DEFAULT_MAX_BLANK_SCAN);
        assert_eq!(out, format!("{holder}\n\n\n{SECT}"));
    }

    #[test]
    fn missing_bookmark_leaves_text_unchanged() {
        let doc = format!("<w:p/>{SECT}");
        assert_eq!(remove_blank_after_bookmark(&doc, 3, DEFAULT_MAX_BLANK_SCAN), doc);
    }

    #[test]
    fn before_section_end_walks_back_to_content() {
        let doc = format!("{KEEP}<w:p/><w:p><w:r><w:t>\u{200B}</w:t></w:r></w:p><w:p/>{SECT}");
        let once = remove_blank_before_section_end(&doc, DEFAULT_MAX_BLANK_SCAN);
        assert_eq!(once, format!("{KEEP}{SECT}"));
        assert_eq!(remove_blank_before_section_end(&once, DEFAULT_MAX_BLANK_SCAN), once);
    }

    #[test]
    fn before_section_end_supports_body_level_section_properties() {
        let doc = r#"<w:body><w:p><w:r><w:t>x</w:t></w:r></w:p><w:p/><w:p/><w:sectPr><w:pgSz/></w:sectPr></w:body>"#;
        let out = remove_blank_before_section_end(doc, DEFAULT_MAX_BLANK_SCAN);
        assert_eq!(
            out,
            r#"<w:body><w:p><w:r><w:t>x</w:t></w:r></w:p><w:sectPr><w:pgSz/></w:sectPr></w:body>"#
        );
    }

    #[test]
    fn after_bookmark_steps_over_nested_bookmark_ends() {
        let inner = r#"<w:bookmarkEnd w:id="1"/>"#;
        let x = "<w:p><w:r><w:t>x</w:t></w:r></w:p>";
        let doc = format!("{MARK}{inner}<w:p/><w:p/>{x}{SECT}");
        let out = remove_blank_after_bookmark(&doc, 0, DEFAULT_MAX_BLANK_SCAN);
        assert_eq!(out, format!("{MARK}{inner}{x}{SECT}"));

        let proofing = r#"<w:proofErr w:type="spellStart"/>"#;
        let doc = format!("{MARK}<w:p/>\n{proofing}\n<w:p/>{x}");
        let out = remove_blank_after_bookmark(&doc, 0, DEFAULT_MAX_BLANK_SCAN);
        assert_eq!(out, format!("{MARK}\n{proofing}\n{x}"));
    }

    #[test]
    fn before_section_end_steps_over_bookmark_markers() {
        let start = r#"<w:bookmarkStart w:id="5" w:name="_GoBack"/>"#;
        let end = r#"<w:bookmarkEnd w:id="5"/>"#;
        let doc = format!("{KEEP}<w:p/>{start}{end}<w:p/>{SECT}");
        let out = remove_blank_before_section_end(&doc, DEFAULT_MAX_BLANK_SCAN);
        assert_eq!(out, format!("{KEEP}{start}{end}{SECT}"));
    }

    #[test]
    fn before_section_end_keeps_images() {
        let image = "<w:p><w:r><w:drawing><wp:inline/></w:drawing></w:r></w:p>";
        let doc = format!("{KEEP}<w:p/>{image}<w:p/><w:p/>{SECT}");
        let out = remove_blank_before_section_end(&doc, DEFAULT_MAX_BLANK_SCAN);
        assert_eq!(out, format!("{KEEP}<w:p/>{image}{SECT}"));
    }

    #[test]
    fn before_section_end_stops_at_table() {
        let table = "<w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>";
        let doc = format!("{KEEP}<w:p/>{table}<w:p/>{SECT}");
        let out = remove_blank_before_section_end(&doc, DEFAULT_MAX_BLANK_SCAN);
        assert_eq!(out, format!("{KEEP}<w:p/>{table}{SECT}"));
    }

    #[test]
    fn before_section_end_stops_at_field_code() {
        let field = r#"<w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r></w:p>"#;
        let doc = format!("{field}<w:p/>{SECT}");
        let out = remove_blank_before_section_end(&doc, DEFAULT_MAX_BLANK_SCAN);
        assert_eq!(out, format!("{field}{SECT}"));
    }
}
