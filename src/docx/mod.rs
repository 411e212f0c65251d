pub mod anchors;
pub mod builders;
pub mod cleanup;
pub mod escape;
pub mod package;
pub mod scan;
pub mod xml;
