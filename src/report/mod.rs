//! Report persistence and viewing.

pub mod artifacts;
pub mod opener;

pub use artifacts::{url_dir, write_summary};
pub use opener::open_reports;
