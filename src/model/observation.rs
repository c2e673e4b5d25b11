//! The decoded observation — input to ingestion, produced by protocol
//! decoding upstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ParameterHolder, Value};

/// A time span. Instants are spans with `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSpan {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_instant(&self) -> bool {
        self.start == self.end
    }
}

/// A name or identifier qualified by an optional codespace (naming
/// authority).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodedName {
    pub value: String,
    pub codespace: Option<String>,
}

impl CodedName {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into(), codespace: None }
    }

    pub fn with_codespace(mut self, codespace: impl Into<String>) -> Self {
        self.codespace = Some(codespace.into());
        self
    }
}

/// One decoded observation: a typed value tree plus its metadata and
/// parameter bag. Wire-format validation has already happened upstream;
/// ingestion treats this as trusted structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub identifier: Option<CodedName>,
    pub name: Option<CodedName>,
    pub description: Option<String>,
    pub phenomenon_time: TimeSpan,
    pub result_time: Option<DateTime<Utc>>,
    pub value: Value,
    pub parameters: ParameterHolder,
}

impl Observation {
    pub fn new(phenomenon_time: TimeSpan, value: impl Into<Value>) -> Self {
        Self {
            identifier: None,
            name: None,
            description: None,
            phenomenon_time,
            result_time: None,
            value: value.into(),
            parameters: ParameterHolder::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: CodedName) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub fn with_name(mut self, name: CodedName) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_result_time(mut self, at: DateTime<Utc>) -> Self {
        self.result_time = Some(at);
        self
    }

    pub fn with_parameter(mut self, parameter: super::NamedParameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}
