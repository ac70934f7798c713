//! pmx-artifacts
//!
//! Everything a run leaves on disk:
//! - the `TAG=VALUE` summary file (one line per visible output, declaration order)
//! - explicitly routed outputs (absolute paths only) or the fallback resource dump
//! - `manifest.json` describing the run

mod manifest;
mod routing;
mod summary;

pub use manifest::*;
pub use routing::*;
pub use summary::*;
