use crate::fields::{Sample, TrackedFields};
use crate::record::Observation;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumericAccumulator {
    pub sum: f64,
    pub present_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionalAccumulator {
    pub present_count: u64,
    pub match_count: u64,
}

/// Running statistics for one bucket.
///
/// Accumulators are laid out in the order of the [`TrackedFields`] the
/// owning store was created for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningAggregate {
    pub total_count: u64,
    pub numeric: Vec<NumericAccumulator>,
    pub conditional: Vec<ConditionalAccumulator>,
}

impl RunningAggregate {
    pub fn new(fields: &TrackedFields) -> Self {
        Self {
            total_count: 0,
            numeric: vec![NumericAccumulator::default(); fields.numeric().len()],
            conditional: vec![ConditionalAccumulator::default(); fields.conditional().len()],
        }
    }

    /// Folds one record into the aggregate.
    ///
    /// The record must already have passed [`TrackedFields::check`]; values
    /// that would fail it are skipped here rather than reported twice.
    #[inline(always)]
    pub(crate) fn apply<R: Observation + ?Sized>(&mut self, fields: &TrackedFields, record: &R) {
        self.total_count += 1;

        for (field, acc) in fields.numeric().iter().zip(self.numeric.iter_mut()) {
            if let Ok(Sample::Number(v)) = fields.numeric_sample(field, record) {
                acc.sum += v;
                acc.present_count += 1;
            }
        }

        for (field, acc) in fields.conditional().iter().zip(self.conditional.iter_mut()) {
            if let Ok(Sample::Checked(matched)) = fields.conditional_sample(field, record) {
                acc.present_count += 1;
                if matched {
                    acc.match_count += 1;
                }
            }
        }
    }

    /// Adds another partial aggregate of the same bucket into this one.
    pub fn merge(&mut self, other: &RunningAggregate) {
        self.total_count += other.total_count;
        for (acc, o) in self.numeric.iter_mut().zip(&other.numeric) {
            acc.sum += o.sum;
            acc.present_count += o.present_count;
        }
        for (acc, o) in self.conditional.iter_mut().zip(&other.conditional) {
            acc.present_count += o.present_count;
            acc.match_count += o.match_count;
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.numeric
            .iter()
            .all(|n| n.present_count <= self.total_count)
            && self.conditional.iter().all(|c| {
                c.present_count <= self.total_count && c.match_count <= c.present_count
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Condition;
    use crate::record::{Record, Schema};

    fn fields() -> TrackedFields {
        let schema = Schema::new(["temperature", "alarm_active"]).unwrap();
        TrackedFields::resolve(&schema, ["temperature"], [("alarm_active", Condition::default())])
            .unwrap()
    }

    #[test]
    fn test_apply_skips_absent_fields() {
        let fields = fields();
        let mut agg = RunningAggregate::new(&fields);

        agg.apply(&fields, &Record::new(0).with(0, 10.0));
        agg.apply(&fields, &Record::new(1));
        agg.apply(&fields, &Record::new(2).with(0, 20.0).with(1, 0.0));
        agg.apply(&fields, &Record::new(3).with(1, 4.0));

        assert_eq!(agg.total_count, 4);
        assert_eq!(agg.numeric[0].sum, 30.0);
        assert_eq!(agg.numeric[0].present_count, 2);
        assert_eq!(agg.conditional[0].present_count, 2);
        assert_eq!(agg.conditional[0].match_count, 1);
        assert!(agg.is_consistent());
    }

    #[test]
    fn test_merge_adds_counters() {
        let fields = fields();
        let mut a = RunningAggregate::new(&fields);
        let mut b = RunningAggregate::new(&fields);
        a.apply(&fields, &Record::new(0).with(0, 1.0).with(1, 1.0));
        b.apply(&fields, &Record::new(1).with(0, 2.0));
        b.apply(&fields, &Record::new(2));

        a.merge(&b);
        assert_eq!(a.total_count, 3);
        assert_eq!(a.numeric[0].sum, 3.0);
        assert_eq!(a.numeric[0].present_count, 2);
        assert_eq!(a.conditional[0].match_count, 1);
        assert!(a.is_consistent());
    }
}
