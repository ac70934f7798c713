//! pmx-report
//!
//! Delivers a run summary to the external aggregation service.
//!
//! - Reporting is opt-in: a disabled config, an empty host or the host
//!   `none` short-circuits to `ReportOutcome::Skipped` with no network I/O.
//! - The payload is the XML-like span of the summary file, from the first
//!   `<` to the last `>`.
//! - Every failure is a `ReportingError` value; nothing here panics or
//!   aborts the caller's run.

mod aggregator;
mod error;
mod http;

pub use aggregator::*;
pub use error::*;
pub use http::*;
