//! Filling the medical letter template.
//!
//! `fill` runs five stages in order and stops at the first failure, so a
//! caller either gets a completely filled document part or an error naming
//! the missing anchor:
//!
//! 1. append the formatted date after the date label run
//! 2. build the letter's content blocks
//! 3. replace the region after the section title, unless it already holds a
//!    filled letter
//! 4. strip blank paragraphs after the region's bookmark end
//! 5. strip blank paragraphs before the final section properties

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::config::TemplateContract;
use crate::docx::anchors::{insert_after_label, locate_region, splice_region};
use crate::docx::builders::{render_blocks, ContentBlock};
use crate::docx::cleanup::{remove_blank_after_bookmark, remove_blank_before_section_end};
use crate::docx::package::DocxPackage;
use crate::docx::xml::verify_well_formed;
use crate::error::{FillError, Result};

pub const DETAILS_HEADING: &str = "Details";
pub const CLOSING_LINES: [&str; 2] = ["Kindly do the needful.", "Thank you."];

/// Values collected for one letter. Accepts snake_case or the camelCase keys
/// a web form would post.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FieldValues {
    #[serde(alias = "formattedDate")]
    pub formatted_date: String,
    #[serde(alias = "patientName")]
    pub patient_name: String,
    #[serde(alias = "patientId")]
    pub patient_id: String,
    #[serde(alias = "patientAgeSex")]
    pub patient_age_sex: String,
    #[serde(alias = "patientAddress")]
    pub patient_address: String,
    #[serde(alias = "letterBody")]
    pub letter_body: String,
    #[serde(alias = "doctorName")]
    pub doctor_name: String,
    #[serde(alias = "doctorCode")]
    pub doctor_code: Option<String>,
    #[serde(alias = "doctorSpecialty")]
    pub doctor_specialty: Option<String>,
    #[serde(alias = "hospitalName")]
    pub hospital_name: Option<String>,
}

impl FieldValues {
    /// Reads a `.json` file as JSON and anything else as TOML.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read fields: {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&text).with_context(|| format!("parse fields json: {}", path.display()))
        } else {
            toml::from_str(&text).with_context(|| format!("parse fields toml: {}", path.display()))
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// The letter body in reading order. Optional doctor fields that are absent
/// contribute no line at all.
pub fn letter_blocks(fields: &FieldValues, contract: &TemplateContract) -> Vec<ContentBlock> {
    let separator = || ContentBlock::Separator {
        color: contract.separator_color.clone(),
        width: contract.separator_width,
    };

    let mut blocks = vec![
        ContentBlock::line(format!("Name: {}", fields.patient_name)),
        ContentBlock::line(format!("ID Number: {}", fields.patient_id)),
        ContentBlock::line(format!("Age / Sex: {}", fields.patient_age_sex)),
        ContentBlock::line(format!("Address: {}", fields.patient_address)),
        ContentBlock::Empty,
        separator(),
        ContentBlock::Heading(DETAILS_HEADING.to_string()),
        ContentBlock::Empty,
        ContentBlock::Multiline(fields.letter_body.clone()),
        ContentBlock::Empty,
    ];
    blocks.extend(CLOSING_LINES.iter().map(|l| ContentBlock::line(*l)));
    blocks.push(ContentBlock::Empty);
    blocks.push(separator());
    blocks.push(ContentBlock::bold_line(format!("Dr. {}", fields.doctor_name)));
    if let Some(code) = present(&fields.doctor_code) {
        blocks.push(ContentBlock::line(format!("Registration No: {code}")));
    }
    if let Some(specialty) = present(&fields.doctor_specialty) {
        blocks.push(ContentBlock::line(format!("Consultant in {specialty}")));
    }
    if let Some(hospital) = present(&fields.hospital_name) {
        blocks.push(ContentBlock::line(hospital));
    }
    blocks
}

/// Markup only a fill writes: the first separator rule directly followed by
/// the details heading. Placeholder text, images or tables a template keeps
/// in the region never look like this.
fn filled_signature(contract: &TemplateContract) -> String {
    render_blocks(&[
        ContentBlock::Separator {
            color: contract.separator_color.clone(),
            width: contract.separator_width,
        },
        ContentBlock::Heading(DETAILS_HEADING.to_string()),
    ])
}

/// Fills a document part with the built-in template contract.
pub fn fill(document: &str, fields: &FieldValues) -> Result<String> {
    fill_with(document, fields, &TemplateContract::default())
}

pub fn fill_with(document: &str, fields: &FieldValues, contract: &TemplateContract) -> Result<String> {
    let doc = insert_after_label(document, &contract.date_label, &fields.formatted_date)?;
    debug!(label = %contract.date_label, "date injected");

    let blocks = letter_blocks(fields, contract);
    debug!(blocks = blocks.len(), "content blocks built");

    let region = locate_region(&doc, &contract.section_title, contract.region_bookmark_id)?;
    if doc[region.start..region.end].contains(&filled_signature(contract)) {
        debug!(bookmark_id = contract.region_bookmark_id, "region already holds a letter");
        return Err(FillError::RegionNotFound {
            start_marker: contract.section_title.clone(),
            bookmark_id: contract.region_bookmark_id,
        });
    }
    let doc = splice_region(&doc, region, &render_blocks(&blocks));
    debug!(bookmark_id = contract.region_bookmark_id, "region replaced");

    let doc = remove_blank_after_bookmark(&doc, contract.region_bookmark_id, contract.max_blank_scan);
    let doc = remove_blank_before_section_end(&doc, contract.max_blank_scan);
    Ok(doc)
}

/// Opens `template`, fills its document part, checks the result is still
/// well-formed, and writes the whole archive to `output`.
pub fn fill_docx_file(
    template: &Path,
    output: &Path,
    fields: &FieldValues,
    contract: &TemplateContract,
) -> anyhow::Result<()> {
    let pkg = DocxPackage::read(template)?;
    let part = &contract.document_part;
    let text = pkg.part_text(part)?;
    let filled = fill_with(&text, fields, contract)
        .with_context(|| format!("fill template: {}", template.display()))?;
    verify_well_formed(part, filled.as_bytes()).context("filled document part")?;

    let mut replacements: HashMap<String, Vec<u8>> = HashMap::new();
    replacements.insert(part.clone(), filled.into_bytes());
    pkg.write_with_replacements(output, &replacements)
}
