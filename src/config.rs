use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::docx::cleanup::DEFAULT_MAX_BLANK_SCAN;
use crate::docx::package::DOCUMENT_PART;

pub const CONFIG_FILENAME: &str = "letterfill.toml";
pub const CONFIG_ENV: &str = "LETTERFILL_CONFIG";

pub const DEFAULT_SECTION_TITLE: &str = "TO WHOM IT MAY CONCERN";
pub const DEFAULT_DATE_LABEL: &str = "Date:";
pub const DEFAULT_REGION_BOOKMARK_ID: u32 = 0;
pub const DEFAULT_SEPARATOR_COLOR: &str = "2E74B5";
pub const DEFAULT_SEPARATOR_WIDTH: usize = 60;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub template: TemplateSection,
    #[serde(default)]
    pub style: StyleSection,
    #[serde(default)]
    pub cleanup: CleanupSection,
}

/// Anchor contract overrides. Templates that follow the stock letter layout need none.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct TemplateSection {
    #[serde(default)]
    pub section_title: Option<String>,
    #[serde(default)]
    pub date_label: Option<String>,
    #[serde(default)]
    pub region_bookmark_id: Option<u32>,
    /// Archive member holding the letter body.
    #[serde(default)]
    pub document_part: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct StyleSection {
    #[serde(default)]
    pub separator_color: Option<String>,
    #[serde(default)]
    pub separator_width: Option<usize>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CleanupSection {
    #[serde(default)]
    pub max_blank_scan: Option<usize>,
}

/// Everything a fill needs to know about the template it is working on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateContract {
    pub section_title: String,
    pub date_label: String,
    pub region_bookmark_id: u32,
    pub document_part: String,
    pub separator_color: String,
    pub separator_width: usize,
    pub max_blank_scan: usize,
}

impl Default for TemplateContract {
    fn default() -> Self {
        Self {
            section_title: DEFAULT_SECTION_TITLE.to_string(),
            date_label: DEFAULT_DATE_LABEL.to_string(),
            region_bookmark_id: DEFAULT_REGION_BOOKMARK_ID,
            document_part: DOCUMENT_PART.to_string(),
            separator_color: DEFAULT_SEPARATOR_COLOR.to_string(),
            separator_width: DEFAULT_SEPARATOR_WIDTH,
            max_blank_scan: DEFAULT_MAX_BLANK_SCAN,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl TemplateContract {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let d = Self::default();
        Self {
            section_title: non_empty(&cfg.template.section_title).unwrap_or(d.section_title),
            date_label: non_empty(&cfg.template.date_label).unwrap_or(d.date_label),
            region_bookmark_id: cfg.template.region_bookmark_id.unwrap_or(d.region_bookmark_id),
            document_part: non_empty(&cfg.template.document_part).unwrap_or(d.document_part),
            separator_color: non_empty(&cfg.style.separator_color)
                .map(|c| c.trim_start_matches('#').to_ascii_uppercase())
                .unwrap_or(d.separator_color),
            separator_width: cfg
                .style
                .separator_width
                .filter(|w| *w > 0)
                .unwrap_or(d.separator_width),
            max_blank_scan: cfg
                .cleanup
                .max_blank_scan
                .filter(|n| *n > 0)
                .unwrap_or(d.max_blank_scan),
        }
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

/// `--config`, then `$LETTERFILL_CONFIG`, then `letterfill.toml` upwards from
/// the working directory and from the template's directory.
pub fn find_config_path(explicit: Option<PathBuf>, template_dir: &Path) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    if let Some(p) = std::env::var(CONFIG_ENV).ok().filter(|s| !s.trim().is_empty()) {
        return Some(PathBuf::from(p));
    }
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, CONFIG_FILENAME, 8) {
            return Some(p);
        }
    }
    find_file_upwards(template_dir, CONFIG_FILENAME, 8)
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    parse_config(&text).with_context(|| format!("parse config: {}", path.display()))
}

pub fn parse_config(text: &str) -> anyhow::Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(text).context("parse config toml")?;
    Ok(cfg)
}

pub const DEFAULT_CONFIG_TOML: &str = r#"# letterfill configuration. Every key is optional.

[template]
# Paragraph text that opens the letter body region.
# section_title = "TO WHOM IT MAY CONCERN"
# Run text the formatted date is appended after.
# date_label = "Date:"
# Bookmark whose end marker closes the letter body region.
# region_bookmark_id = 0
# document_part = "word/document.xml"

[style]
# separator_color = "2E74B5"
# separator_width = 60

[cleanup]
# Upper bound on blank paragraphs inspected after the region bookmark.
# max_blank_scan = 500
"#;

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILENAME);
    if cfg_path.exists() && !force {
        return Err(anyhow::anyhow!(
            "config already exists (use --force to overwrite): {}",
            cfg_path.display()
        ));
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}
