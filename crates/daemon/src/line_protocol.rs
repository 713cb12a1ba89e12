//! InfluxDB line protocol encoding.
//!
//! A point renders as
//! `measurement,tag=value field=1,other="text" <unix seconds>`.

use std::fmt;
use time::OffsetDateTime;

use crate::ParsedObservation;

pub const MEASUREMENT: &str = "metar";
pub const AIRPORT_TAG: &str = "airport";

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Text(String),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // f64's Display is the shortest round-trip form and never uses
            // an exponent, both of which line protocol accepts.
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(s) => write!(f, "\"{}\"", escape(s, &['"', '\\'])),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: Vec<(String, String)>,
    fields: Vec<(String, FieldValue)>,
    timestamp: i64,
}

impl Point {
    pub fn new(measurement: impl Into<String>, timestamp: i64) -> Self {
        Point {
            measurement: measurement.into(),
            tags: vec![],
            fields: vec![],
            timestamp,
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    /// Adds a field. Non-finite floats have no line protocol form and are
    /// left out.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        if let FieldValue::Float(v) = value {
            if !v.is_finite() {
                return self;
            }
        }
        self.fields.push((key.into(), value));
        self
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Point {
    /// A point without fields renders with the field section left out;
    /// InfluxDB will reject such a line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", escape(&self.measurement, &[',', ' ']))?;
        for (key, value) in &self.tags {
            write!(
                f,
                ",{}={}",
                escape(key, &[',', '=', ' ']),
                escape(value, &[',', '=', ' '])
            )?;
        }
        for (i, (key, value)) in self.fields.iter().enumerate() {
            let separator = if i == 0 { ' ' } else { ',' };
            write!(f, "{}{}={}", separator, escape(key, &[',', '=', ' ']), value)?;
        }
        write!(f, " {}", self.timestamp)
    }
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Encode an observation as a `metar` point stamped with `now`, not with
/// the observation's own report time.
pub fn encode(observation: &ParsedObservation, now: OffsetDateTime) -> Point {
    observation.fields().into_iter().fold(
        Point::new(MEASUREMENT, now.unix_timestamp()).tag(AIRPORT_TAG, observation.airport.as_str()),
        |point, (key, value)| point.field(key, value),
    )
}
