use pmx_config::ReportingConfig;
use pmx_params::ParamCollection;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::ReportingError;

/// Remote aggregation service.
///
/// One call per successful run: `aggregator(identity, payload) -> bool`.
pub trait Aggregator: Send + Sync {
    fn aggregate(&self, identity: &str, payload: &str) -> Result<bool, ReportingError>;
}

impl<T: Aggregator + ?Sized> Aggregator for Arc<T> {
    fn aggregate(&self, identity: &str, payload: &str) -> Result<bool, ReportingError> {
        (**self).aggregate(identity, payload)
    }
}

impl<T: Aggregator + ?Sized> Aggregator for Box<T> {
    fn aggregate(&self, identity: &str, payload: &str) -> Result<bool, ReportingError> {
        (**self).aggregate(identity, payload)
    }
}

#[derive(Debug)]
pub enum ReportOutcome {
    /// Reporting disabled; no call was attempted.
    Skipped,
    /// The service answered; `accepted` is its boolean reply.
    Delivered { accepted: bool },
    Failed(ReportingError),
}

impl ReportOutcome {
    pub fn was_attempted(&self) -> bool {
        !matches!(self, ReportOutcome::Skipped)
    }
}

/// Join the summary lines (without newlines) and keep the span from the
/// first `<` to the last `>`, inclusive.
pub fn extract_payload(summary_text: &str) -> Result<String, ReportingError> {
    let joined: String = summary_text.lines().collect();
    let start = joined.find('<').ok_or(ReportingError::NoPayload)?;
    let end = joined.rfind('>').ok_or(ReportingError::NoPayload)?;
    if end < start {
        return Err(ReportingError::NoPayload);
    }
    Ok(joined[start..=end].to_string())
}

/// Send the summary at `summary_file` to the aggregator, if reporting is
/// active. Errors are logged and returned inside the outcome.
pub fn report_to_aggregator(
    outputs: &ParamCollection,
    summary_file: &Path,
    cfg: &ReportingConfig,
    aggregator: &dyn Aggregator,
) -> ReportOutcome {
    if !cfg.is_active() {
        info!(host = %cfg.host, "aggregator reporting skipped");
        return ReportOutcome::Skipped;
    }

    match deliver(outputs, summary_file, aggregator) {
        Ok(accepted) => {
            info!(host = %cfg.host, accepted, "aggregator report delivered");
            ReportOutcome::Delivered { accepted }
        }
        Err(e) => {
            warn!(host = %cfg.host, error = %e, "aggregator report failed");
            ReportOutcome::Failed(e)
        }
    }
}

fn deliver(
    outputs: &ParamCollection,
    summary_file: &Path,
    aggregator: &dyn Aggregator,
) -> Result<bool, ReportingError> {
    let identity = outputs
        .children()
        .first()
        .map(|n| n.identity_string())
        .ok_or(ReportingError::NoIdentity)?;

    let text = fs::read_to_string(summary_file).map_err(|source| ReportingError::SummaryUnreadable {
        path: summary_file.to_path_buf(),
        source,
    })?;
    let payload = extract_payload(&text)?;

    aggregator.aggregate(&identity, &payload)
}
