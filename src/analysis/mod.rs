//! Analysis modules.
//!
//! Turning raw Lighthouse results into metric records and averaging them.

pub mod aggregator;
pub mod extractor;

pub use aggregator::average_metrics;
pub use extractor::extract_metrics;
