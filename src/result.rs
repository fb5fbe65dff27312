use crate::aggregate::RunningAggregate;
use crate::fields::TrackedFields;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldAverage {
    pub name: String,
    pub average: f64,
    pub sum: f64,
    pub present_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRatio {
    pub name: String,
    pub ratio: f64,
    pub match_count: u64,
    pub present_count: u64,
}

/// Read-only projection of one bucket at the end of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketResult {
    pub bucket_key: i64,
    pub total_count: u64,
    pub averages: Vec<FieldAverage>,
    pub ratios: Vec<FieldRatio>,
}

impl BucketResult {
    pub fn project(bucket_key: i64, aggregate: &RunningAggregate, fields: &TrackedFields) -> Self {
        let averages = fields
            .numeric()
            .iter()
            .zip(&aggregate.numeric)
            .map(|(f, acc)| FieldAverage {
                name: f.name.clone(),
                average: ratio_or_zero(acc.sum, acc.present_count),
                sum: acc.sum,
                present_count: acc.present_count,
            })
            .collect();

        // Ratios are over every record in the bucket, not only those carrying the field.
        let ratios = fields
            .conditional()
            .iter()
            .zip(&aggregate.conditional)
            .map(|(f, acc)| FieldRatio {
                name: f.name.clone(),
                ratio: ratio_or_zero(acc.match_count as f64, aggregate.total_count),
                match_count: acc.match_count,
                present_count: acc.present_count,
            })
            .collect();

        Self {
            bucket_key,
            total_count: aggregate.total_count,
            averages,
            ratios,
        }
    }

    pub fn average(&self, name: &str) -> Option<f64> {
        self.averages
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.average)
    }

    pub fn ratio(&self, name: &str) -> Option<f64> {
        self.ratios.iter().find(|r| r.name == name).map(|r| r.ratio)
    }
}

#[inline(always)]
fn ratio_or_zero(numerator: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        numerator / count as f64
    }
}
