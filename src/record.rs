use crate::error::{AggregationError, Result};
use fxhash::FxHashMap;
use std::fmt;

/// A single field value carried by a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Flag(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(v) => write!(f, "number({})", v),
            FieldValue::Flag(b) => write!(f, "flag({})", b),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Number(v as f64)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Number(v as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Flag(v)
    }
}

/// What the aggregator reads from one ingested record.
///
/// Slots are positions in the [`Schema`] the aggregator was configured with.
/// `None` means the field is absent, which is not the same as zero or false.
pub trait Observation {
    fn timestamp(&self) -> i64;
    fn value(&self, slot: usize) -> Option<FieldValue>;
}

impl<T: Observation + ?Sized> Observation for &T {
    #[inline(always)]
    fn timestamp(&self) -> i64 {
        (**self).timestamp()
    }

    #[inline(always)]
    fn value(&self, slot: usize) -> Option<FieldValue> {
        (**self).value(slot)
    }
}

/// Ordered, unique field names of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    names: Vec<String>,
    slots: FxHashMap<String, usize>,
}

impl Schema {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Self {
            names: Vec::new(),
            slots: FxHashMap::default(),
        };
        for name in names {
            let name = name.into();
            if name.is_empty() {
                return Err(AggregationError::config("schema field names must not be empty"));
            }
            if schema.slots.contains_key(&name) {
                return Err(AggregationError::config(format!(
                    "duplicate schema field '{}'",
                    name
                )));
            }
            schema.slots.insert(name.clone(), schema.names.len());
            schema.names.push(name);
        }
        Ok(schema)
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    pub fn name(&self, slot: usize) -> Option<&str> {
        self.names.get(slot).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// A general-purpose record with one optional value per schema slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub timestamp: i64,
    pub values: Vec<Option<FieldValue>>,
}

impl Record {
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            values: Vec::new(),
        }
    }

    pub fn with(mut self, slot: usize, value: impl Into<FieldValue>) -> Self {
        self.set(slot, Some(value.into()));
        self
    }

    pub fn set(&mut self, slot: usize, value: Option<FieldValue>) {
        if self.values.len() <= slot {
            self.values.resize(slot + 1, None);
        }
        self.values[slot] = value;
    }

    /// Marks every slot absent, keeping the allocation for reuse.
    pub fn clear(&mut self, timestamp: i64) {
        self.timestamp = timestamp;
        self.values.iter_mut().for_each(|v| *v = None);
    }
}

impl Observation for Record {
    #[inline(always)]
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    #[inline(always)]
    fn value(&self, slot: usize) -> Option<FieldValue> {
        self.values.get(slot).copied().flatten()
    }
}
