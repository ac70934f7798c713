use pmx_config::ReportingConfig;
use pmx_params::xml_escape;
use std::time::Duration;
use tracing::debug;

use crate::{Aggregator, ReportingError};

pub const AGGREGATOR_OPERATION: &str = "aggregator";
const AXIS2_NAMESPACE: &str = "http://ws.apache.org/axis2";

/// SOAP 1.1 binding of the aggregator service over a blocking HTTP client.
/// Response bodies are echoed in errors truncated.
#[derive(Debug, Clone)]
pub struct HttpAggregator {
    http: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpAggregator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ReportingError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportingError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(cfg: &ReportingConfig) -> Result<Self, ReportingError> {
        Self::new(cfg.endpoint_url(), Duration::from_millis(cfg.timeout_ms))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Aggregator for HttpAggregator {
    fn aggregate(&self, identity: &str, payload: &str) -> Result<bool, ReportingError> {
        let body = soap_envelope(identity, payload);
        debug!(endpoint = %self.endpoint, bytes = body.len(), "aggregator request");

        let resp = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "text/xml; charset=UTF-8")
            .header("SOAPAction", format!("urn:{AGGREGATOR_OPERATION}"))
            .body(body)
            .send()
            .map_err(|e| ReportingError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| ReportingError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ReportingError::Status {
                code: status.as_u16(),
                body: truncate(&text),
            });
        }

        parse_return(&text).ok_or_else(|| ReportingError::MalformedResponse(truncate(&text)))
    }
}

/// Request envelope for `aggregator(arg0, arg1)`.
pub fn soap_envelope(identity: &str, payload: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">"#,
            "<soapenv:Body>",
            r#"<ns:{op} xmlns:ns="{ns}"><arg0>{a0}</arg0><arg1>{a1}</arg1></ns:{op}>"#,
            "</soapenv:Body>",
            "</soapenv:Envelope>"
        ),
        op = AGGREGATOR_OPERATION,
        ns = AXIS2_NAMESPACE,
        a0 = xml_escape(identity),
        a1 = xml_escape(payload),
    )
}

/// Boolean text of the first `return` element, with or without a namespace prefix.
fn parse_return(body: &str) -> Option<bool> {
    let mut rest = body;
    while let Some(i) = rest.find("return>") {
        let before = rest[..i].chars().last();
        let after = &rest[i + "return>".len()..];
        // Opening tags only: "<return>" or "<ns:return>".
        let is_open = match before {
            Some('<') => true,
            Some(':') => rest[..i]
                .rfind('<')
                .map(|lt| !rest[lt..i].starts_with("</"))
                .unwrap_or(false),
            _ => false,
        };
        if is_open {
            let end = after.find('<').unwrap_or(after.len());
            return match after[..end].trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            };
        }
        rest = after;
    }
    None
}

fn truncate(s: &str) -> String {
    const MAX: usize = 256;
    if s.len() <= MAX {
        return s.to_string();
    }
    let mut end = MAX;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
