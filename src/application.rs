//! Application layer: the acquisition use case
//!
//! Coordinates the page source, parsers, image cache and dataset writer to
//! turn one set reference into a dataset file and a run report.

pub mod diagnostics;
pub mod numbering_resolver;
pub mod pipeline;
pub mod set_resolver;

#[cfg(test)]
pub(crate) mod test_support;

pub use diagnostics::{Diagnostic, FetchStrategy, PipelineError, PipelineReport, Stage};
pub use numbering_resolver::{CollectedCards, NumberingResolver};
pub use pipeline::{CardPipeline, PipelineSettings};
pub use set_resolver::{ResolvedSet, SetResolver};
