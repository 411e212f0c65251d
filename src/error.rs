use thiserror::Error;

/// Template-integrity failures. Each one means the document part does not
/// honour the anchor contract; none of them is recoverable inside a fill.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FillError {
    #[error("anchor paragraph not found or not unique: {anchor}")]
    AnchorNotFound { anchor: String },

    #[error("dynamic region not found or already filled: start paragraph {start_marker:?} through bookmark end id={bookmark_id}")]
    RegionNotFound { start_marker: String, bookmark_id: u32 },

    #[error("date label run not found: {label:?}")]
    DateLabelNotFound { label: String },
}

pub type Result<T> = std::result::Result<T, FillError>;
