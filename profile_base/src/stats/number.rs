use std::io::Cursor;

use bytes::{Buf, BytesMut};

use crate::codec::wire::*;
use crate::codec::{Storable, UnknownFields};
use crate::custom_error::CustomResult;

/// 等宽直方图，区间为 [start, end]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Histogram {
    pub start: f64,
    pub end: f64,
    pub counts: Vec<u64>,
    pub unknown_fields: UnknownFields,
}

impl Storable for Histogram {
    fn encode(&self, buf: &mut BytesMut) {
        put_double_field(buf, 1, self.start);
        put_double_field(buf, 2, self.end);
        put_packed_uint64(buf, 3, &self.counts);
        self.unknown_fields.encode(buf);
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> CustomResult<Self> where Self: Sized {
        let mut histogram = Histogram::default();
        while buf.has_remaining() {
            let start = buf.position() as usize;
            let (field, wire_type) = get_key(buf)?;
            match field {
                1 => {
                    expect_wire_type(field, wire_type, WireType::Fixed64)?;
                    histogram.start = get_double(buf)?;
                }
                2 => {
                    expect_wire_type(field, wire_type, WireType::Fixed64)?;
                    histogram.end = get_double(buf)?;
                }
                3 => get_repeated_uint64(buf, field, wire_type, &mut histogram.counts)?,
                _ => skip_unknown(buf, start, wire_type, &mut histogram.unknown_fields)?,
            }
        }
        Ok(histogram)
    }

    fn need_space(&self) -> usize {
        double_field_len(1, self.start)
            + double_field_len(2, self.end)
            + packed_uint64_len(3, &self.counts)
            + self.unknown_fields.need_space()
    }
}

/// 分位点，quantiles[i] 对应 values[i]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Quantiles {
    pub quantiles: Vec<f64>,
    pub values: Vec<f64>,
    pub unknown_fields: UnknownFields,
}

impl Quantiles {
    pub fn get(&self, q: f64) -> Option<f64> {
        self.quantiles.iter()
            .position(|v| *v == q)
            .and_then(|i| self.values.get(i).copied())
    }
}

impl Storable for Quantiles {
    fn encode(&self, buf: &mut BytesMut) {
        put_packed_double(buf, 1, &self.quantiles);
        put_packed_double(buf, 2, &self.values);
        self.unknown_fields.encode(buf);
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> CustomResult<Self> where Self: Sized {
        let mut quantiles = Quantiles::default();
        while buf.has_remaining() {
            let start = buf.position() as usize;
            let (field, wire_type) = get_key(buf)?;
            match field {
                1 => get_repeated_double(buf, field, wire_type, &mut quantiles.quantiles)?,
                2 => get_repeated_double(buf, field, wire_type, &mut quantiles.values)?,
                _ => skip_unknown(buf, start, wire_type, &mut quantiles.unknown_fields)?,
            }
        }
        Ok(quantiles)
    }

    fn need_space(&self) -> usize {
        packed_double_len(1, &self.quantiles)
            + packed_double_len(2, &self.values)
            + self.unknown_fields.need_space()
    }
}

/// 数值分布的汇总，字符串长度分布也用它
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    pub histogram: Histogram,
    pub quantiles: Quantiles,
    pub unknown_fields: UnknownFields,
}

impl Storable for NumberSummary {
    fn encode(&self, buf: &mut BytesMut) {
        put_uint64_field(buf, 1, self.count);
        put_double_field(buf, 2, self.min);
        put_double_field(buf, 3, self.max);
        put_double_field(buf, 4, self.mean);
        put_double_field(buf, 5, self.stddev);
        put_message_field(buf, 6, &self.histogram);
        put_message_field(buf, 7, &self.quantiles);
        self.unknown_fields.encode(buf);
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> CustomResult<Self> where Self: Sized {
        let mut summary = NumberSummary::default();
        while buf.has_remaining() {
            let start = buf.position() as usize;
            let (field, wire_type) = get_key(buf)?;
            match field {
                1 => {
                    expect_wire_type(field, wire_type, WireType::Varint)?;
                    summary.count = get_varint(buf)?;
                }
                2..=5 => {
                    expect_wire_type(field, wire_type, WireType::Fixed64)?;
                    let v = get_double(buf)?;
                    match field {
                        2 => summary.min = v,
                        3 => summary.max = v,
                        4 => summary.mean = v,
                        _ => summary.stddev = v,
                    }
                }
                6 => {
                    expect_wire_type(field, wire_type, WireType::LengthDelimited)?;
                    summary.histogram = get_message(buf)?;
                }
                7 => {
                    expect_wire_type(field, wire_type, WireType::LengthDelimited)?;
                    summary.quantiles = get_message(buf)?;
                }
                _ => skip_unknown(buf, start, wire_type, &mut summary.unknown_fields)?,
            }
        }
        Ok(summary)
    }

    fn need_space(&self) -> usize {
        uint64_field_len(1, self.count)
            + double_field_len(2, self.min)
            + double_field_len(3, self.max)
            + double_field_len(4, self.mean)
            + double_field_len(5, self.stddev)
            + message_field_len(6, &self.histogram)
            + message_field_len(7, &self.quantiles)
            + self.unknown_fields.need_space()
    }
}

/// 累积数值，结束时生成 NumberSummary
/// 分位点需要保留全部值，均值和方差在 finish 时用 Welford 算法计算
#[derive(Debug, Default)]
pub struct NumberTracker {
    values: Vec<f64>,
}

impl NumberTracker {
    pub fn new() -> NumberTracker {
        NumberTracker::default()
    }

    pub fn track(&mut self, v: f64) {
        self.values.push(v);
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn finish(mut self, bins: usize, quantiles: &[f64]) -> NumberSummary {
        if self.values.is_empty() {
            return NumberSummary::default();
        }
        self.values.sort_by(|a, b| a.total_cmp(b));
        let n = self.values.len();
        let min = self.values[0];
        let max = self.values[n - 1];
        let (mean, stddev) = mean_and_stddev(&self.values, min.abs().max(max.abs()));

        NumberSummary {
            count: n as u64,
            min,
            max,
            mean,
            stddev,
            histogram: histogram(&self.values, min, max, bins),
            quantiles: Quantiles {
                quantiles: quantiles.to_vec(),
                values: quantiles.iter().map(|q| quantile(&self.values, *q)).collect(),
                unknown_fields: UnknownFields::new(),
            },
            unknown_fields: UnknownFields::new(),
        }
    }
}

fn histogram(values: &[f64], min: f64, max: f64, bins: usize) -> Histogram {
    // 所有值相同，只有一个桶
    if max <= min || bins <= 1 {
        return Histogram {
            start: min,
            end: max,
            counts: vec![values.len() as u64],
            unknown_fields: UnknownFields::new(),
        };
    }
    // 先减半再相减，接近 f64::MAX 的值相减不会溢出
    let range = max / 2.0 - min / 2.0;
    let mut counts = vec![0u64; bins];
    for v in values {
        let i = ((v / 2.0 - min / 2.0) / range * bins as f64) as usize;
        counts[i.min(bins - 1)] += 1;
    }
    Histogram {
        start: min,
        end: max,
        counts,
        unknown_fields: UnknownFields::new(),
    }
}

/// 已排序的值上做线性插值
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let t = pos - lo as f64;
    sorted[lo] * (1.0 - t) + sorted[hi] * t
}

/// 样本均值和标准差，先按最大绝对值缩放到 [-1, 1] 再做 Welford 更新，避免中间结果溢出
fn mean_and_stddev(values: &[f64], scale: f64) -> (f64, f64) {
    if scale == 0.0 {
        return (0.0, 0.0);
    }
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (i, v) in values.iter().enumerate() {
        let x = v / scale;
        let delta = x - mean;
        mean += delta / (i + 1) as f64;
        m2 += delta * (x - mean);
    }
    let n = values.len();
    let stddev = if n > 1 { (m2 / (n - 1) as f64).sqrt() } else { 0.0 };
    (mean * scale, stddev * scale)
}
