//! Coercion of raw request parameters into a [`SynthesisRequest`].
//!
//! Every incoming value is tried as a number first. Values that do not parse
//! are kept as text, so a bad `f1` only fails later, when the grid is built.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Error, Result};

pub const DEFAULT_LABEL: &str = "V";

/// Fields understood by [`SynthesisRequest::from_params`]. Anything else is ignored.
pub const KNOWN_FIELDS: [&str; 13] = [
    "label",
    "vowel_name",
    "duration",
    "pitch",
    "f1",
    "b1",
    "f2",
    "b2",
    "f3",
    "b3",
    "f4",
    "bandwidth_fraction",
    "formant_frequency_interval",
];

/// Result of coercing one raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

/// Parses `raw` as a float, ignoring surrounding whitespace, or keeps it verbatim.
pub fn coerce(raw: &str) -> ParamValue {
    match raw.trim().parse::<f64>() {
        Ok(n) => ParamValue::Number(n),
        Err(_) => ParamValue::Text(raw.to_owned()),
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Param {
    /// the value as the client wrote it
    raw: String,
    value: ParamValue,
}

/// Explicit name to value mapping for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap {
    params: BTreeMap<String, Param>,
}

impl ParamMap {
    /// Builds the map from query string pairs. The first occurrence of a key wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut params = BTreeMap::new();
        for (key, raw) in pairs {
            let raw = raw.as_ref();
            params.entry(key.into()).or_insert_with(|| Param {
                raw: raw.to_owned(),
                value: coerce(raw),
            });
        }
        ParamMap { params }
    }

    /// Builds the map from a JSON object body. An empty body means "all defaults".
    ///
    /// A key repeated inside the object keeps its last value, unlike
    /// [`ParamMap::from_pairs`] where the first one wins.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when the body is not a JSON object or a value is
    /// neither a number, a string nor `null`.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(ParamMap::default());
        }
        let value: Value = serde_json::from_slice(body)
            .map_err(|err| Error::validation("body", format!("malformed JSON: {err}")))?;
        let Value::Object(object) = value else {
            return Err(Error::validation("body", "expected a JSON object"));
        };

        let mut params = BTreeMap::new();
        for (key, value) in object {
            let param = match value {
                Value::Null => continue,
                Value::Number(number) => {
                    let n = number.as_f64().ok_or_else(|| {
                        Error::validation(key.as_str(), "number out of range")
                    })?;
                    Param {
                        raw: number.to_string(),
                        value: ParamValue::Number(n),
                    }
                }
                Value::String(raw) => Param {
                    value: coerce(&raw),
                    raw,
                },
                Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
                    return Err(Error::validation(
                        key.as_str(),
                        "expected a number or a string",
                    ));
                }
            };
            params.insert(key, param);
        }
        Ok(ParamMap { params })
    }

    /// Typed lookup; unknown keys are simply absent.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key).map(|param| &param.value)
    }

    /// The value exactly as it was sent.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(|param| param.raw.as_str())
    }

    /// The label the client sent, if any.
    pub fn label(&self) -> Option<&str> {
        self.raw("label").or_else(|| self.raw("vowel_name"))
    }

    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.params
            .keys()
            .map(String::as_str)
            .filter(|key| !KNOWN_FIELDS.contains(key))
    }
}

/// Vowel parameters with defaults applied.
///
/// Numeric fields keep their coerced [`ParamValue`]; text in a numeric field
/// is rejected by [`VowelGrid::from_request`](crate::grid::VowelGrid::from_request).
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub label: String,
    /// seconds
    pub duration: ParamValue,
    /// Hz
    pub pitch: ParamValue,
    pub f1: ParamValue,
    pub b1: ParamValue,
    pub f2: ParamValue,
    pub b2: ParamValue,
    pub f3: ParamValue,
    pub b3: ParamValue,
    pub f4: ParamValue,
    pub bandwidth_fraction: ParamValue,
    pub formant_frequency_interval: ParamValue,
}

impl Default for SynthesisRequest {
    fn default() -> Self {
        use ParamValue::Number;
        SynthesisRequest {
            label: DEFAULT_LABEL.to_owned(),
            duration: Number(0.5),
            pitch: Number(120.0),
            f1: Number(800.0),
            b1: Number(50.0),
            f2: Number(1200.0),
            b2: Number(50.0),
            f3: Number(2300.0),
            b3: Number(100.0),
            f4: Number(3000.0),
            bandwidth_fraction: Number(0.05),
            formant_frequency_interval: Number(1000.0),
        }
    }
}

impl SynthesisRequest {
    pub fn from_params(params: &ParamMap) -> Self {
        let defaults = SynthesisRequest::default();
        let field = |name: &str, default: ParamValue| params.get(name).cloned().unwrap_or(default);

        SynthesisRequest {
            label: params.label().map_or(defaults.label, str::to_owned),
            duration: field("duration", defaults.duration),
            pitch: field("pitch", defaults.pitch),
            f1: field("f1", defaults.f1),
            b1: field("b1", defaults.b1),
            f2: field("f2", defaults.f2),
            b2: field("b2", defaults.b2),
            f3: field("f3", defaults.f3),
            b3: field("b3", defaults.b3),
            f4: field("f4", defaults.f4),
            bandwidth_fraction: field("bandwidth_fraction", defaults.bandwidth_fraction),
            formant_frequency_interval: field(
                "formant_frequency_interval",
                defaults.formant_frequency_interval,
            ),
        }
    }
}
