pub mod config;
pub mod docx;
pub mod error;
pub mod letter;
pub mod textutil;

pub use config::TemplateContract;
pub use error::FillError;
pub use letter::{fill, fill_with, FieldValues};
