use crate::docx::escape::escape_xml_text;
use crate::textutil::split_lines;

pub const EMPTY_PARAGRAPH: &str = "<w:p/>";
pub const BREAK_RUN: &str = "<w:r><w:br/></w:r>";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    /// Hex RGB without `#`, e.g. `2E74B5`.
    pub color: Option<String>,
}

impl RunStyle {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    pub fn colored(color: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            ..Self::default()
        }
    }

    fn properties_xml(&self) -> String {
        let mut props = String::new();
        if self.bold {
            props.push_str("<w:b/><w:bCs/>");
        }
        if self.italic {
            props.push_str("<w:i/><w:iCs/>");
        }
        if let Some(color) = self.color.as_deref().filter(|c| !c.is_empty()) {
            props.push_str(&format!("<w:color w:val=\"{}\"/>", escape_xml_text(color)));
        }
        if props.is_empty() {
            props
        } else {
            format!("<w:rPr>{props}</w:rPr>")
        }
    }
}

/// Something the letter wants placed in the document. Built and consumed within one fill.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentBlock {
    Heading(String),
    Line { text: String, style: RunStyle },
    Multiline(String),
    Empty,
    Separator { color: String, width: usize },
}

impl ContentBlock {
    pub fn line(text: impl Into<String>) -> Self {
        Self::Line {
            text: text.into(),
            style: RunStyle::plain(),
        }
    }

    pub fn bold_line(text: impl Into<String>) -> Self {
        Self::Line {
            text: text.into(),
            style: RunStyle::bold(),
        }
    }
}

/// One run; `text` is raw and gets escaped here. `rpr` is an already-built `<w:rPr>` block.
pub fn text_run_with_props(text: &str, rpr: &str) -> String {
    format!(
        "<w:r>{rpr}<w:t xml:space=\"preserve\">{}</w:t></w:r>",
        escape_xml_text(text)
    )
}

pub fn styled_run(text: &str, style: &RunStyle) -> String {
    text_run_with_props(text, &style.properties_xml())
}

pub fn styled_paragraph(text: &str, style: &RunStyle) -> String {
    format!("<w:p>{}</w:p>", styled_run(text, style))
}

pub fn empty_paragraph() -> String {
    EMPTY_PARAGRAPH.to_string()
}

/// Runs for free text: one text run per non-empty line, one break run between
/// consecutive lines, none trailing.
pub fn multiline_runs(text: &str) -> String {
    let mut out = String::new();
    for (i, line) in split_lines(text).iter().enumerate() {
        if i > 0 {
            out.push_str(BREAK_RUN);
        }
        if !line.is_empty() {
            out.push_str(&styled_run(line, &RunStyle::plain()));
        }
    }
    out
}

pub fn multiline_paragraph(text: &str) -> String {
    format!("<w:p>{}</w:p>", multiline_runs(text))
}

pub fn separator_paragraph(color: &str, width: usize) -> String {
    styled_paragraph(&"_".repeat(width.max(1)), &RunStyle::colored(color))
}

pub fn render_block(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Heading(text) => styled_paragraph(text, &RunStyle::bold()),
        ContentBlock::Line { text, style } => styled_paragraph(text, style),
        ContentBlock::Multiline(text) => multiline_paragraph(text),
        ContentBlock::Empty => empty_paragraph(),
        ContentBlock::Separator { color, width } => separator_paragraph(color, *width),
    }
}

pub fn render_blocks(blocks: &[ContentBlock]) -> String {
    blocks.iter().map(render_block).collect()
}
