use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{OleanderError, OleanderResult};

/// An inclusive selection window over a scalar candidate attribute.
///
/// Membership is `min <= x <= max`; the ordering of the bounds is the caller's
/// responsibility and is not validated here.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// One parsed entry of the selector mini-grammar, `"<Attribute> <min>:<max>"`.
///
/// The attribute is kept as the raw configured name; resolution against the
/// known selector set happens in the refinement engine so that unrecognized
/// names can be ignored rather than rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectorSpec {
    pub attribute: String,
    pub range: Range,
}

impl FromStr for SelectorSpec {
    type Err = OleanderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_error = || OleanderError::ParseError {
            name: s.to_string(),
            object: "SelectorSpec".to_string(),
        };
        let (attribute, bounds) = s.trim().rsplit_once(' ').ok_or_else(parse_error)?;
        let (min, max) = bounds.split_once(':').ok_or_else(parse_error)?;
        let min: f64 = min.parse().map_err(|_| parse_error())?;
        let max: f64 = max.parse().map_err(|_| parse_error())?;
        if attribute.is_empty() {
            return Err(parse_error());
        }
        Ok(SelectorSpec {
            attribute: attribute.to_string(),
            range: Range::new(min, max),
        })
    }
}

/// A read-only view of the pipeline configuration: string parameters keyed as
/// `"<module name>::<parameter>"`, each holding one or more values.
///
/// The configuration-file reader is an external collaborator; this type only
/// provides the lookup surface modules consume during initialization.
#[derive(Clone, Debug, Default)]
pub struct Config {
    values: IndexMap<String, Vec<String>>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under a fully qualified parameter key.
    pub fn push<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// All values configured for a module parameter, or an empty slice.
    pub fn many(&self, module: &str, name: &str) -> &[String] {
        self.values
            .get(&format!("{module}::{name}"))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The first value configured for a module parameter, if any.
    pub fn optional(&self, module: &str, name: &str) -> Option<&str> {
        self.many(module, name).first().map(String::as_str)
    }

    /// The first value configured for a required module parameter.
    pub fn require(&self, module: &str, name: &str) -> OleanderResult<&str> {
        self.optional(module, name)
            .ok_or_else(|| OleanderError::MissingParameter {
                module: module.to_string(),
                name: name.to_string(),
            })
    }

    /// A required parameter parsed as `f64`.
    pub fn require_f64(&self, module: &str, name: &str) -> OleanderResult<f64> {
        let raw = self.require(module, name)?;
        raw.parse().map_err(|_| OleanderError::ParseError {
            name: raw.to_string(),
            object: "f64".to_string(),
        })
    }

    /// An optional parameter parsed as `f64`, falling back to `default`.
    pub fn f64_or(&self, module: &str, name: &str, default: f64) -> OleanderResult<f64> {
        match self.optional(module, name) {
            Some(raw) => raw.parse().map_err(|_| OleanderError::ParseError {
                name: raw.to_string(),
                object: "f64".to_string(),
            }),
            None => Ok(default),
        }
    }
}
