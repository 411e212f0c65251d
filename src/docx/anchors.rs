//! Anchor lookup and splicing. Every function takes the document text by
//! reference and returns a new text; nothing is edited in place.
//!
//! Anchors come in three kinds: a paragraph id attribute (`w14:paraId`), a
//! bookmark end marker, and a literal text marker inside runs.

use regex::Regex;

use crate::docx::builders::{multiline_runs, render_blocks, text_run_with_props, ContentBlock};
use crate::docx::scan::{
    element_at, element_spans, find_bookmark_end, run_properties, text_content, ElementSpan,
    PARAGRAPH, RUN,
};
use crate::error::{FillError, Result};

/// Byte range strictly between the start paragraph and the end marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

fn anchor_not_found(anchor_id: &str) -> FillError {
    FillError::AnchorNotFound {
        anchor: anchor_id.to_string(),
    }
}

/// The single paragraph whose opening tag carries `paraId="anchor_id"`.
/// Zero or several matches are both reported as `AnchorNotFound`.
pub fn locate_anchor_paragraph(xml: &str, anchor_id: &str) -> Result<ElementSpan> {
    let pat = format!(
        r#"<w:p\s[^>]*?\b(?:w14:)?paraId="{}"[^>]*>"#,
        regex::escape(anchor_id)
    );
    let re = Regex::new(&pat).map_err(|_| anchor_not_found(anchor_id))?;
    let mut hits = re.find_iter(xml);
    let first = hits.next().ok_or_else(|| anchor_not_found(anchor_id))?;
    if hits.next().is_some() {
        return Err(anchor_not_found(anchor_id));
    }
    element_at(xml, first.start(), PARAGRAPH).ok_or_else(|| anchor_not_found(anchor_id))
}

/// Appends `fragment` (one or more runs) to the anchor paragraph, right before
/// its closing tag. Anchor paragraphs are empty by template convention; runs
/// already present are kept and the fragment lands after them.
pub fn insert_into_paragraph(xml: &str, anchor_id: &str, fragment: &str) -> Result<String> {
    let span = locate_anchor_paragraph(xml, anchor_id)?;
    let mut out = String::with_capacity(xml.len() + fragment.len() + 8);
    if span.is_self_closing() {
        let open = xml[span.start..span.end - 2].trim_end();
        out.push_str(&xml[..span.start]);
        out.push_str(open);
        out.push('>');
        out.push_str(fragment);
        out.push_str("</w:p>");
        out.push_str(&xml[span.end..]);
    } else {
        out.push_str(&xml[..span.close_start]);
        out.push_str(fragment);
        out.push_str(&xml[span.close_start..]);
    }
    Ok(out)
}

pub fn insert_multiline_into_paragraph(xml: &str, anchor_id: &str, text: &str) -> Result<String> {
    insert_into_paragraph(xml, anchor_id, &multiline_runs(text))
}

/// Places a complete paragraph fragment immediately before the anchor paragraph.
pub fn insert_paragraph_before(xml: &str, anchor_id: &str, paragraph: &str) -> Result<String> {
    let span = locate_anchor_paragraph(xml, anchor_id)?;
    let mut out = String::with_capacity(xml.len() + paragraph.len());
    out.push_str(&xml[..span.start]);
    out.push_str(paragraph);
    out.push_str(&xml[span.start..]);
    Ok(out)
}

/// Finds the first paragraph whose text equals `start_marker` and the end
/// marker of `bookmark_id` after it. When the end marker sits inside a later
/// paragraph, the region stops before that paragraph so both stay whole.
pub fn locate_region(xml: &str, start_marker: &str, bookmark_id: u32) -> Result<Region> {
    let not_found = || FillError::RegionNotFound {
        start_marker: start_marker.to_string(),
        bookmark_id,
    };
    let paragraphs = element_spans(xml, PARAGRAPH);
    let marker = start_marker.trim();
    let start_para = paragraphs
        .iter()
        .find(|p| text_content(p.slice(xml)).trim() == marker)
        .ok_or_else(not_found)?;
    let (mark_start, mark_end) =
        find_bookmark_end(xml, start_para.end, bookmark_id).ok_or_else(not_found)?;
    let end = paragraphs
        .iter()
        .find(|p| p.start >= start_para.end && p.encloses(mark_start, mark_end))
        .map(|p| p.start)
        .unwrap_or(mark_start);
    Ok(Region {
        start: start_para.end,
        end,
    })
}

/// Swaps everything between the start paragraph and the end marker for `blocks`.
pub fn replace_region(
    xml: &str,
    start_marker: &str,
    bookmark_id: u32,
    blocks: &[ContentBlock],
) -> Result<String> {
    let region = locate_region(xml, start_marker, bookmark_id)?;
    Ok(splice_region(xml, region, &render_blocks(blocks)))
}

/// Puts `content` in place of a located region, leaving both anchors intact.
pub fn splice_region(xml: &str, region: Region, content: &str) -> String {
    let mut out = String::with_capacity(xml.len() + content.len());
    out.push_str(&xml[..region.start]);
    out.push_str(content);
    out.push_str(&xml[region.end..]);
    out
}

/// Appends a run holding `value` right after the first run whose text contains
/// `label`. The new run reuses the label's run properties.
pub fn insert_after_label(xml: &str, label: &str, value: &str) -> Result<String> {
    let not_found = || FillError::DateLabelNotFound {
        label: label.to_string(),
    };
    let needle = label.trim();
    if needle.is_empty() {
        return Err(not_found());
    }
    let (run, run_text) = element_spans(xml, RUN)
        .into_iter()
        .map(|r| (r, text_content(r.slice(xml))))
        .find(|(_, text)| text.contains(needle))
        .ok_or_else(not_found)?;

    let rpr = run_properties(run.slice(xml)).unwrap_or("");
    let text = if run_text.ends_with(char::is_whitespace) {
        value.to_string()
    } else {
        format!(" {value}")
    };
    let new_run = text_run_with_props(&text, rpr);

    let mut out = String::with_capacity(xml.len() + new_run.len());
    out.push_str(&xml[..run.end]);
    out.push_str(&new_run);
    out.push_str(&xml[run.end..]);
    Ok(out)
}
