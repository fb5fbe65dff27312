use crate::error::{AggregationError, Result};
use crate::record::{FieldValue, Observation, Schema};
use fxhash::FxHashSet;

/// Predicate a conditional field must satisfy to count as a match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    GreaterThan(f64),
    AtLeast(f64),
    NotEqual(f64),
    IsTrue,
}

impl Default for Condition {
    /// Alarm-style indicator: any positive value.
    fn default() -> Self {
        Condition::GreaterThan(0.0)
    }
}

impl Condition {
    /// `Err` carries the reason when the value kind does not fit the predicate.
    #[inline(always)]
    fn test(&self, value: FieldValue) -> std::result::Result<bool, String> {
        match (self, value) {
            (Condition::IsTrue, FieldValue::Flag(b)) => Ok(b),
            (Condition::IsTrue, other) => Err(format!("expected a flag, got {}", other)),
            (_, FieldValue::Flag(b)) => Err(format!("expected a number, got flag({})", b)),
            (_, FieldValue::Number(v)) if v.is_nan() => Err("value is NaN".into()),
            (Condition::GreaterThan(t), FieldValue::Number(v)) => Ok(v > *t),
            (Condition::AtLeast(t), FieldValue::Number(v)) => Ok(v >= *t),
            (Condition::NotEqual(t), FieldValue::Number(v)) => Ok(v != *t),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericField {
    pub name: String,
    pub(crate) slot: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalField {
    pub name: String,
    pub condition: Condition,
    pub(crate) slot: usize,
}

/// One tracked value of a record, already type-checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Sample {
    Absent,
    Number(f64),
    Checked(bool),
}

/// The tracked field set, resolved to schema slots once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedFields {
    numeric: Vec<NumericField>,
    conditional: Vec<ConditionalField>,
}

impl TrackedFields {
    pub fn resolve<N, C, S>(schema: &Schema, numeric: N, conditional: C) -> Result<Self>
    where
        N: IntoIterator<Item = S>,
        C: IntoIterator<Item = (S, Condition)>,
        S: AsRef<str>,
    {
        let mut seen = FxHashSet::default();
        let mut lookup = |name: &str| -> Result<usize> {
            if !seen.insert(name.to_string()) {
                return Err(AggregationError::config(format!(
                    "field '{}' is tracked more than once",
                    name
                )));
            }
            schema.slot(name).ok_or_else(|| {
                AggregationError::config(format!("field '{}' is not in the record schema", name))
            })
        };

        let mut fields = Self {
            numeric: Vec::new(),
            conditional: Vec::new(),
        };
        for name in numeric {
            let name = name.as_ref();
            let slot = lookup(name)?;
            fields.numeric.push(NumericField {
                name: name.to_string(),
                slot,
            });
        }
        for (name, condition) in conditional {
            let name = name.as_ref();
            if let Condition::GreaterThan(t) | Condition::AtLeast(t) | Condition::NotEqual(t) =
                condition
                && t.is_nan()
            {
                return Err(AggregationError::config(format!(
                    "condition threshold for '{}' is NaN",
                    name
                )));
            }
            let slot = lookup(name)?;
            fields.conditional.push(ConditionalField {
                name: name.to_string(),
                condition,
                slot,
            });
        }

        if fields.numeric.is_empty() && fields.conditional.is_empty() {
            return Err(AggregationError::config("no tracked fields configured"));
        }
        Ok(fields)
    }

    pub fn numeric(&self) -> &[NumericField] {
        &self.numeric
    }

    pub fn conditional(&self) -> &[ConditionalField] {
        &self.conditional
    }

    pub fn len(&self) -> usize {
        self.numeric.len() + self.conditional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads and type-checks every tracked value of `record`.
    ///
    /// The whole record is checked before anything is returned, so a rejected
    /// record never leaves a half-applied update behind.
    #[inline(always)]
    pub(crate) fn check<R: Observation + ?Sized>(&self, record: &R) -> Result<()> {
        for f in &self.numeric {
            self.numeric_sample(f, record)?;
        }
        for f in &self.conditional {
            self.conditional_sample(f, record)?;
        }
        Ok(())
    }

    #[inline(always)]
    pub(crate) fn numeric_sample<R: Observation + ?Sized>(
        &self,
        field: &NumericField,
        record: &R,
    ) -> Result<Sample> {
        match record.value(field.slot) {
            None => Ok(Sample::Absent),
            Some(FieldValue::Number(v)) if v.is_finite() => Ok(Sample::Number(v)),
            Some(FieldValue::Number(v)) => Err(integrity(
                &field.name,
                record,
                format!("non-finite number {}", v),
            )),
            Some(other) => Err(integrity(
                &field.name,
                record,
                format!("expected a number, got {}", other),
            )),
        }
    }

    #[inline(always)]
    pub(crate) fn conditional_sample<R: Observation + ?Sized>(
        &self,
        field: &ConditionalField,
        record: &R,
    ) -> Result<Sample> {
        match record.value(field.slot) {
            None => Ok(Sample::Absent),
            Some(value) => field
                .condition
                .test(value)
                .map(Sample::Checked)
                .map_err(|reason| integrity(&field.name, record, reason)),
        }
    }
}

fn integrity<R: Observation + ?Sized>(field: &str, record: &R, reason: String) -> AggregationError {
    AggregationError::DataIntegrity {
        field: field.to_string(),
        timestamp: record.timestamp(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn schema() -> Schema {
        Schema::new(["temperature", "active_power", "alarm_active", "power_on"]).unwrap()
    }

    #[test]
    fn test_resolve_maps_names_to_slots() {
        let fields = TrackedFields::resolve(
            &schema(),
            ["temperature", "active_power"],
            [("alarm_active", Condition::default())],
        )
        .unwrap();
        assert_eq!(fields.numeric()[1].slot, 1);
        assert_eq!(fields.conditional()[0].slot, 2);
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_resolve_rejects_bad_sets() {
        let none: [(&str, Condition); 0] = [];
        assert!(TrackedFields::resolve(&schema(), ["humidity"], none).is_err());
        assert!(TrackedFields::resolve(&schema(), ["temperature", "temperature"], none).is_err());
        assert!(
            TrackedFields::resolve(
                &schema(),
                ["alarm_active"],
                [("alarm_active", Condition::default())]
            )
            .is_err()
        );
        assert!(TrackedFields::resolve(&schema(), Vec::<&str>::new(), none).is_err());
        assert!(
            TrackedFields::resolve(
                &schema(),
                Vec::<&str>::new(),
                [("alarm_active", Condition::GreaterThan(f64::NAN))]
            )
            .is_err()
        );
    }

    #[test]
    fn test_condition_kinds() {
        assert_eq!(Condition::default().test(FieldValue::Number(0.0)), Ok(false));
        assert_eq!(Condition::default().test(FieldValue::Number(3.0)), Ok(true));
        assert_eq!(Condition::AtLeast(1.0).test(FieldValue::Number(1.0)), Ok(true));
        assert_eq!(Condition::NotEqual(0.0).test(FieldValue::Number(-2.0)), Ok(true));
        assert_eq!(Condition::IsTrue.test(FieldValue::Flag(false)), Ok(false));
        assert!(Condition::IsTrue.test(FieldValue::Number(1.0)).is_err());
        assert!(Condition::default().test(FieldValue::Flag(true)).is_err());
    }

    #[test]
    fn test_check_rejects_wrong_kind_in_numeric_slot() {
        let fields =
            TrackedFields::resolve(&schema(), ["temperature"], [("power_on", Condition::IsTrue)])
                .unwrap();
        let ok = Record::new(0).with(0, 21.5).with(3, true);
        assert!(fields.check(&ok).is_ok());

        let bad = Record::new(42).with(0, true);
        match fields.check(&bad) {
            Err(AggregationError::DataIntegrity {
                field, timestamp, ..
            }) => {
                assert_eq!(field, "temperature");
                assert_eq!(timestamp, 42);
            }
            other => panic!("unexpected {:?}", other),
        }

        let nan = Record::new(1).with(0, f64::NAN);
        assert!(fields.check(&nan).is_err());
    }
}
