//! Aggregate function state
//!
//! Each [`AggFunction`] maps to an [`Accumulator`] that folds the values of
//! one group. NULL inputs are skipped, as in SQL.

use super::ast::AggFunction;
use super::types::Value;

/// Running state of one aggregate over one group
pub trait Accumulator: Send {
    /// Fold a value into the aggregate
    fn update(&mut self, value: &Value);

    /// Final result for the group
    fn finalize(&self) -> Value;
}

/// Create a fresh accumulator for `function`
pub fn accumulator(function: AggFunction) -> Box<dyn Accumulator> {
    match function {
        AggFunction::Count => Box::new(CountAccumulator::default()),
        AggFunction::Sum => Box::new(SumAccumulator::default()),
        AggFunction::Avg => Box::new(AvgAccumulator::default()),
        AggFunction::Max => Box::new(MaxAccumulator::default()),
        AggFunction::PercentileCont(fraction) => Box::new(PercentileContAccumulator::new(fraction)),
    }
}

/// COUNT aggregate
#[derive(Debug, Default)]
pub struct CountAccumulator {
    count: i64,
}

impl Accumulator for CountAccumulator {
    fn update(&mut self, value: &Value) {
        if !value.is_null() {
            self.count += 1;
        }
    }

    fn finalize(&self) -> Value {
        Value::Int(self.count)
    }
}

/// SUM aggregate. Stays integral while every input is an integer.
#[derive(Debug, Default)]
pub struct SumAccumulator {
    int_sum: i64,
    float_sum: f64,
    seen: bool,
    fractional: bool,
}

impl Accumulator for SumAccumulator {
    fn update(&mut self, value: &Value) {
        match value {
            Value::Int(n) => {
                self.int_sum = self.int_sum.saturating_add(*n);
                self.float_sum += *n as f64;
                self.seen = true;
            }
            Value::Float(n) => {
                self.float_sum += n;
                self.seen = true;
                self.fractional = true;
            }
            _ => {}
        }
    }

    fn finalize(&self) -> Value {
        match (self.seen, self.fractional) {
            (false, _) => Value::Null,
            (true, false) => Value::Int(self.int_sum),
            (true, true) => Value::Float(self.float_sum),
        }
    }
}

/// AVG aggregate
#[derive(Debug, Default)]
pub struct AvgAccumulator {
    sum: f64,
    count: i64,
}

impl Accumulator for AvgAccumulator {
    fn update(&mut self, value: &Value) {
        if let Some(n) = value.as_float() {
            self.sum += n;
            self.count += 1;
        }
    }

    fn finalize(&self) -> Value {
        if self.count > 0 {
            Value::Float(self.sum / self.count as f64)
        } else {
            Value::Null
        }
    }
}

/// MAX aggregate
#[derive(Debug, Default)]
pub struct MaxAccumulator {
    max: Option<Value>,
}

impl Accumulator for MaxAccumulator {
    fn update(&mut self, value: &Value) {
        if value.is_null() {
            return;
        }
        let replace = match &self.max {
            None => true,
            Some(current) => value.compare(current).is_gt(),
        };
        if replace {
            self.max = Some(value.clone());
        }
    }

    fn finalize(&self) -> Value {
        self.max.clone().unwrap_or(Value::Null)
    }
}

/// PERCENTILE_CONT aggregate (linear interpolation between order statistics)
#[derive(Debug)]
pub struct PercentileContAccumulator {
    fraction: f64,
    values: Vec<f64>,
}

impl PercentileContAccumulator {
    /// Creates an accumulator for the given fraction in `0.0..=1.0`.
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction,
            values: Vec::new(),
        }
    }
}

impl Accumulator for PercentileContAccumulator {
    fn update(&mut self, value: &Value) {
        if let Some(n) = value.as_float() {
            self.values.push(n);
        }
    }

    fn finalize(&self) -> Value {
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        percentile_cont(&sorted, self.fraction)
            .map(Value::Float)
            .unwrap_or(Value::Null)
    }
}

/// Continuous percentile of an ascending slice: position `p * (n - 1)`,
/// interpolated between its two neighbours.
pub fn percentile_cont(sorted: &[f64], fraction: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let position = fraction.clamp(0.0, 1.0) * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(function: AggFunction, values: &[Value]) -> Value {
        let mut acc = accumulator(function);
        for value in values {
            acc.update(value);
        }
        acc.finalize()
    }

    #[test]
    fn test_count_skips_null() {
        let values = [Value::Int(1), Value::Null, Value::Int(3)];
        assert_eq!(run(AggFunction::Count, &values), Value::Int(2));
    }

    #[test]
    fn test_sum_empty_is_null() {
        assert_eq!(run(AggFunction::Sum, &[]), Value::Null);
        assert_eq!(run(AggFunction::Avg, &[Value::Null]), Value::Null);
    }

    #[test]
    fn test_sum_keeps_integers() {
        let ints = [Value::Int(2), Value::Int(5)];
        assert_eq!(run(AggFunction::Sum, &ints), Value::Int(7));

        let mixed = [Value::Int(2), Value::Float(0.5)];
        assert_eq!(run(AggFunction::Sum, &mixed), Value::Float(2.5));
    }

    #[test]
    fn test_max_dates() {
        let d = |day| Value::Date(chrono::NaiveDate::from_ymd_opt(2024, 1, day).unwrap());
        assert_eq!(run(AggFunction::Max, &[d(3), d(20), d(7)]), d(20));
    }

    #[test]
    fn test_percentile_cont_interpolates() {
        // Ten observations 1..=10: position 0.9 * 9 = 8.1 -> 9 + 0.1 * (10 - 9)
        let values: Vec<Value> = (1..=10).map(|n| Value::Float(n as f64)).collect();
        match run(AggFunction::PercentileCont(0.9), &values) {
            Value::Float(p) => assert!((p - 9.1).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_percentile_edges() {
        assert_eq!(percentile_cont(&[], 0.9), None);
        assert_eq!(percentile_cont(&[42.0], 0.9), Some(42.0));
        assert_eq!(percentile_cont(&[1.0, 2.0, 3.0], 0.0), Some(1.0));
        assert_eq!(percentile_cont(&[1.0, 2.0, 3.0], 1.0), Some(3.0));
    }
}
