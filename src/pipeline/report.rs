use super::response::Response;
use crate::config::ValidationConfig;
use crate::error::{ErrorRecord, ParamSource, ValidationError};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Per-source validation errors of one request.
///
/// A source appears only once it produced at least one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    entries: BTreeMap<ParamSource, Vec<ErrorRecord>>,
}

impl ValidationReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records for `source`; an empty list leaves the report unchanged.
    pub fn record(&mut self, source: ParamSource, errors: Vec<ErrorRecord>) {
        if errors.is_empty() {
            return;
        }
        self.entries.entry(source).or_default().extend(errors);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, source: ParamSource) -> Option<&[ErrorRecord]> {
        self.entries.get(&source).map(Vec::as_slice)
    }

    /// Sources that failed, in resolution order.
    pub fn sources(&self) -> impl Iterator<Item = ParamSource> + '_ {
        self.entries.keys().copied()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }

    /// Raised form carrying all four optional buckets.
    #[must_use]
    pub fn into_error(self) -> ValidationError {
        let mut err = ValidationError::default();
        for (source, errors) in self.entries {
            err.set(source, errors);
        }
        err
    }
}

impl Serialize for ValidationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (source, errors) in &self.entries {
            map.serialize_entry(source.report_key(), errors)?;
        }
        map.end()
    }
}

/// What to do once every source has been resolved.
#[derive(Debug)]
pub enum Decision {
    /// No errors: invoke the handler.
    Proceed,
    /// Answer with `{"validation_error": report}` without invoking the handler.
    Respond(Response),
    /// Propagate the report to the caller's error handling.
    Raise(ValidationError),
}

/// Gate handler invocation on the aggregated report.
#[must_use]
pub fn decide(report: ValidationReport, config: &ValidationConfig) -> Decision {
    if report.is_empty() {
        Decision::Proceed
    } else if config.raise_on_error {
        Decision::Raise(report.into_error())
    } else {
        Decision::Respond(Response::json(
            config.error_status_code,
            json!({ "validation_error": report.to_json() }),
        ))
    }
}
