//! URL templating, query flattening and response decoding
//!
//! Path templates accept three placeholder styles per segment:
//! `:name`, `$name<pattern>` and `{name}`. Values are inserted verbatim.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use std::fmt;

/// A path or query parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),
}

impl Param {
    pub fn is_null(&self) -> bool {
        matches!(self, Param::Null)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Null => Ok(()),
            Param::String(s) => f.write_str(s),
            Param::Integer(i) => write!(f, "{i}"),
            Param::Float(x) => write!(f, "{x}"),
            Param::Bool(b) => f.write_str(if *b { "1" } else { "0" }),
            Param::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Param::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Param::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::String(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::String(value)
    }
}

impl From<i32> for Param {
    fn from(value: i32) -> Self {
        Param::Integer(value.into())
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Integer(value)
    }
}

impl From<u32> for Param {
    fn from(value: u32) -> Self {
        Param::Integer(value.into())
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Float(value)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Bool(value)
    }
}

impl From<NaiveDate> for Param {
    fn from(value: NaiveDate) -> Self {
        Param::Date(value)
    }
}

impl From<NaiveTime> for Param {
    fn from(value: NaiveTime) -> Self {
        Param::Time(value)
    }
}

impl From<DateTime<Utc>> for Param {
    fn from(value: DateTime<Utc>) -> Self {
        Param::DateTime(value)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(value: Option<T>) -> Self {
        value.map_or(Param::Null, Into::into)
    }
}

/// Builds endpoint URLs and decodes responses for generated clients
#[derive(Debug, Clone)]
pub struct Parser {
    base_url: String,
}

impl Parser {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join `path` onto the base URL, substituting placeholders found in `parameters`
    pub fn url(&self, path: &str, parameters: &[(&str, Param)]) -> String {
        let segments: Vec<String> = path
            .split('/')
            .filter(|part| !part.is_empty())
            .map(|part| {
                placeholder_name(part)
                    .and_then(|name| lookup(parameters, name))
                    .map_or_else(|| part.to_string(), ToString::to_string)
            })
            .collect();

        format!("{}/{}", self.base_url, segments.join("/"))
    }

    /// Flatten query parameters, dropping null values
    pub fn query(&self, parameters: &[(&str, Param)]) -> Vec<(String, String)> {
        parameters
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, value)| ((*name).to_string(), value.to_string()))
            .collect()
    }

    /// Decode a JSON response body into `T`
    pub fn parse<T: DeserializeOwned>(&self, data: &str) -> Result<T> {
        serde_json::from_str(data).map_err(|e| match e.classify() {
            Category::Data => Error::parse(format!(
                "The provided JSON data does not match the schema: {e}"
            )),
            _ => Error::parse(format!("The server returned an invalid JSON format: {e}")),
        })
    }
}

fn placeholder_name(part: &str) -> Option<&str> {
    if let Some(name) = part.strip_prefix(':') {
        Some(name)
    } else if let Some(rest) = part.strip_prefix('$') {
        Some(rest.split_once('<').map_or(rest, |(name, _)| name))
    } else {
        part.strip_prefix('{').and_then(|p| p.strip_suffix('}'))
    }
}

fn lookup<'a>(parameters: &'a [(&str, Param)], name: &str) -> Option<&'a Param> {
    parameters
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
