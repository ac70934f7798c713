use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ReportingError {
    /// The summary file could not be read back.
    SummaryUnreadable { path: PathBuf, source: std::io::Error },
    /// The summary file could not be produced, so there is nothing to send.
    SummaryNotWritten(String),
    /// The summary holds no `<...>` span to send.
    NoPayload,
    /// The output tree has no first child to identify the run by.
    NoIdentity,
    Transport(String),
    /// Non-success HTTP status from the service.
    Status { code: u16, body: String },
    /// The response did not carry a `<return>true|false</return>` element.
    MalformedResponse(String),
}

impl fmt::Display for ReportingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SummaryUnreadable { path, source } => {
                write!(f, "summary unreadable: {}: {source}", path.display())
            }
            Self::SummaryNotWritten(msg) => write!(f, "summary not written: {msg}"),
            Self::NoPayload => f.write_str("summary contains no aggregator payload"),
            Self::NoIdentity => f.write_str("output tree has no primary output"),
            Self::Transport(msg) => write!(f, "aggregator transport error: {msg}"),
            Self::Status { code, body } => write!(f, "aggregator http status={code} body={body}"),
            Self::MalformedResponse(body) => write!(f, "aggregator response malformed: {body}"),
        }
    }
}

impl std::error::Error for ReportingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SummaryUnreadable { source, .. } => Some(source),
            _ => None,
        }
    }
}
