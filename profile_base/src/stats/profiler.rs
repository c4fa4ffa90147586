use std::collections::BTreeMap;

use log::debug;
use serde_json::Value;

use crate::calc_hash;
use crate::codec::UnknownFields;
use crate::config::ProfileConfig;
use crate::custom_error::CustomResult;
use crate::stats::cardinality::HyperLogLog;
use crate::stats::column::{ColumnMessage, Counters, InferredType, SchemaMessage};
use crate::stats::frequent::FrequentItemsTracker;
use crate::stats::number::NumberTracker;

/// 推断类型至少要占非空值的比例
const TYPE_RATIO_THRESHOLD: f64 = 0.7;

/// 单个字段的统计，逐个值累积，finish 时生成 ColumnMessage
#[derive(Debug)]
pub struct ColumnProfiler {
    name: String,
    config: ProfileConfig,
    count: u64,
    null_count: u64,
    type_counts: BTreeMap<InferredType, u64>,
    numbers: NumberTracker,
    string_lengths: NumberTracker,
    frequent_items: FrequentItemsTracker,
    hll: HyperLogLog,
}

impl ColumnProfiler {
    pub fn new(name: &str, config: &ProfileConfig) -> CustomResult<ColumnProfiler> {
        Ok(ColumnProfiler {
            name: name.to_string(),
            config: config.clone(),
            count: 0,
            null_count: 0,
            type_counts: BTreeMap::new(),
            numbers: NumberTracker::new(),
            string_lengths: NumberTracker::new(),
            frequent_items: FrequentItemsTracker::new(),
            hll: HyperLogLog::new(config.hll_precision)?,
        })
    }

    /// None 表示这一行没有这个字段，按 null 计
    pub fn track(&mut self, value: Option<&Value>) {
        self.count += 1;
        let value = match value {
            None | Some(Value::Null) => {
                self.null_count += 1;
                return;
            }
            Some(v) => v,
        };

        let inferred = InferredType::of_value(value);
        *self.type_counts.entry(inferred).or_insert(0) += 1;

        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match inferred {
            InferredType::Integral | InferredType::Fractional => {
                if let Some(v) = as_f64(value) {
                    self.numbers.track(v);
                }
            }
            InferredType::String => {
                self.string_lengths.track(text.chars().count() as f64);
            }
            _ => {}
        }
        self.hll.add_hash(calc_hash(&text));
        self.frequent_items.track(&text);
    }

    pub fn finish(self) -> ColumnMessage {
        let schema = self.infer_schema();
        debug!("column:{} count:{} null:{} inferred:{:?}",
            self.name, self.count, self.null_count, schema.inferred_type);

        let bins = self.config.histogram_bins;
        let quantiles = &self.config.quantiles;
        ColumnMessage {
            name: self.name,
            counters: Counters {
                count: self.count,
                null_count: self.null_count,
                unknown_fields: UnknownFields::new(),
            },
            schema,
            number_summary: self.numbers.finish(bins, quantiles),
            string_length_summary: self.string_lengths.finish(bins, quantiles),
            frequent_items: self.frequent_items.finish(self.config.frequent_items_k),
            cardinality: self.hll.finish(),
            unknown_fields: UnknownFields::new(),
        }
    }

    fn infer_schema(&self) -> SchemaMessage {
        let mut type_counts: BTreeMap<i32, u64> = self.type_counts.iter()
            .map(|(t, c)| (t.code(), *c))
            .collect();
        if self.null_count > 0 {
            type_counts.insert(InferredType::Null.code(), self.null_count);
        }

        let non_null = self.count - self.null_count;
        let (inferred_type, ratio) = if self.count == 0 {
            (InferredType::Unknown, 0.0)
        } else if non_null == 0 {
            (InferredType::Null, 1.0)
        } else {
            self.infer_type(non_null)
        };

        SchemaMessage {
            inferred_type,
            ratio,
            type_counts,
            unknown_fields: UnknownFields::new(),
        }
    }

    fn infer_type(&self, non_null: u64) -> (InferredType, f64) {
        let get = |t: InferredType| self.type_counts.get(&t).copied().unwrap_or(0);
        let total = non_null as f64;

        let mut winner = InferredType::Unknown;
        let mut winner_count = 0;
        for t in [InferredType::Fractional, InferredType::Integral, InferredType::Boolean, InferredType::String] {
            let c = get(t);
            if c > winner_count {
                winner = t;
                winner_count = c;
            }
        }
        if winner_count as f64 / total > TYPE_RATIO_THRESHOLD {
            return (winner, winner_count as f64 / total);
        }

        // 整数和小数混在一起时算小数
        let numbers = get(InferredType::Integral) + get(InferredType::Fractional);
        if numbers as f64 / total > TYPE_RATIO_THRESHOLD && get(InferredType::Fractional) > 0 {
            return (InferredType::Fractional, numbers as f64 / total);
        }

        let strings = get(InferredType::String);
        if strings > 0 {
            return (InferredType::String, strings as f64 / total);
        }
        (InferredType::Unknown, winner_count as f64 / total)
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use crate::config::ProfileConfig;
    use crate::init_log;
    use crate::stats::column::InferredType;
    use crate::stats::profiler::ColumnProfiler;

    fn profile(values: &[Value]) -> crate::stats::column::ColumnMessage {
        let mut profiler = ColumnProfiler::new("c", &ProfileConfig::default()).unwrap();
        for v in values {
            profiler.track(Some(v));
        }
        profiler.finish()
    }

    #[test]
    pub fn test_integral_column() {
        init_log();
        let column = profile(&[json!(1), json!(2), json!(3), json!(null), json!("4")]);
        assert_eq!(column.name, "c");
        assert_eq!(column.counters.count, 5);
        assert_eq!(column.counters.null_count, 1);
        assert_eq!(column.schema.inferred_type, InferredType::Integral);
        assert_eq!(column.schema.ratio, 1.0);
        assert_eq!(column.schema.type_count(InferredType::Null), 1);
        assert_eq!(column.number_summary.count, 4);
        assert_eq!(column.number_summary.max, 4.0);
        assert_eq!(column.string_length_summary.count, 0);
        assert!((column.cardinality.estimate - 4.0).abs() < 0.5);
    }

    #[test]
    pub fn test_mixed_numbers_are_fractional() {
        let column = profile(&[json!(1), json!(2), json!(2.5), json!(3.5), json!("x")]);
        // 整数2个 小数2个，单独都不超过70%
        assert_eq!(column.schema.inferred_type, InferredType::Fractional);
        assert!((column.schema.ratio - 0.8).abs() < 1e-9);
    }

    #[test]
    pub fn test_string_column() {
        let column = profile(&[json!("ab"), json!("ab"), json!("xyz"), json!(true), json!(1)]);
        assert_eq!(column.schema.inferred_type, InferredType::String);
        assert!((column.schema.ratio - 0.6).abs() < 1e-9);
        assert_eq!(column.string_length_summary.count, 3);
        assert_eq!(column.string_length_summary.min, 2.0);
        assert_eq!(column.string_length_summary.max, 3.0);
        assert_eq!(column.frequent_items.items[0].value, "ab");
        assert_eq!(column.frequent_items.items[0].estimate, 2);
    }

    #[test]
    pub fn test_null_and_empty_column() {
        let mut profiler = ColumnProfiler::new("c", &ProfileConfig::default()).unwrap();
        profiler.track(None);
        profiler.track(Some(&json!(null)));
        let column = profiler.finish();
        assert_eq!(column.schema.inferred_type, InferredType::Null);
        assert_eq!(column.counters.null_count, 2);

        let column = profile(&[]);
        assert_eq!(column.schema.inferred_type, InferredType::Unknown);
        assert_eq!(column.counters.count, 0);
    }

    #[test]
    pub fn test_bad_precision() {
        let config = ProfileConfig { hll_precision: 2, ..Default::default() };
        assert!(ColumnProfiler::new("c", &config).unwrap_err().is_invalid_argument());
    }
}
