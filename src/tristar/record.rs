use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
}

impl FieldValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Float(v) => v,
            Self::Integer(v) => v as f64,
        }
    }
}

/// Decoded values keyed by field name, one entry per field in the schema.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MeasurementRecord {
    values: BTreeMap<&'static str, FieldValue>,
}

impl MeasurementRecord {
    pub(crate) fn from_values(values: BTreeMap<&'static str, FieldValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, FieldValue)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

/// A successful poll: the raw block, what it decoded to, and when it was read.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub time: DateTime<Utc>,
    pub unit_id: u8,
    pub raw: Vec<u16>,
    pub record: MeasurementRecord,
}
