use std::collections::BTreeMap;
use std::io::Cursor;

use bytes::{Buf, BufMut, BytesMut};

use crate::codec::wire::*;
use crate::codec::{Storable, UnknownFields};
use crate::custom_error::CustomResult;
use crate::stats::ColumnMessage;

const FIELD_WHYLOGS_METRICS: u32 = 1;
const FIELD_CUSTOM_METRICS: u32 = 2;

/// 单个特征的 profile
/// whylogs_metrics 总是存在，线上缺失时为默认值，表示没有计算统计信息
/// custom_metrics 存放统计 schema 之外的自定义指标
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureProfile {
    whylogs_metrics: ColumnMessage,
    custom_metrics: BTreeMap<String, f64>,
    unknown_fields: UnknownFields,
}

impl FeatureProfile {
    pub fn new(whylogs_metrics: ColumnMessage) -> FeatureProfile {
        FeatureProfile {
            whylogs_metrics,
            custom_metrics: BTreeMap::new(),
            unknown_fields: UnknownFields::new(),
        }
    }

    /// 加入 DatasetProfile 之前追加自定义指标，同名覆盖
    pub fn with_custom_metric(mut self, name: &str, value: f64) -> FeatureProfile {
        self.custom_metrics.insert(name.to_string(), value);
        self
    }

    pub fn whylogs_metrics(&self) -> &ColumnMessage {
        &self.whylogs_metrics
    }

    pub fn has_statistics(&self) -> bool {
        !self.whylogs_metrics.is_empty()
    }

    pub fn custom_metrics(&self) -> &BTreeMap<String, f64> {
        &self.custom_metrics
    }

    pub fn custom_metric(&self, name: &str) -> Option<f64> {
        self.custom_metrics.get(name).copied()
    }

    pub fn unknown_fields(&self) -> &UnknownFields {
        &self.unknown_fields
    }
}

/// map<string, double> 的 entry，key 和 value 总是写出
fn custom_metric_entry_len(name: &str) -> usize {
    len_delimited_len(1, name.len()) + key_len(2) + 8
}

fn put_custom_metric_entry(buf: &mut BytesMut, name: &str, value: f64) {
    put_key(buf, FIELD_CUSTOM_METRICS, WireType::LengthDelimited);
    put_varint(buf, custom_metric_entry_len(name) as u64);
    put_key(buf, 1, WireType::LengthDelimited);
    put_varint(buf, name.len() as u64);
    buf.put_slice(name.as_bytes());
    put_key(buf, 2, WireType::Fixed64);
    buf.put_f64_le(value);
}

fn get_custom_metric_entry(buf: &mut Cursor<&[u8]>) -> CustomResult<(String, f64)> {
    let mut entry = Cursor::new(get_len_delimited(buf)?);
    let mut name = String::new();
    let mut value = 0.0;
    while entry.has_remaining() {
        let (field, wire_type) = get_key(&mut entry)?;
        match field {
            1 => {
                expect_wire_type(field, wire_type, WireType::LengthDelimited)?;
                name = get_string(&mut entry)?;
            }
            2 => {
                expect_wire_type(field, wire_type, WireType::Fixed64)?;
                value = get_double(&mut entry)?;
            }
            _ => skip_field(&mut entry, wire_type)?,
        }
    }
    Ok((name, value))
}

impl Storable for FeatureProfile {
    fn encode(&self, buf: &mut BytesMut) {
        put_message_field(buf, FIELD_WHYLOGS_METRICS, &self.whylogs_metrics);
        for (name, value) in &self.custom_metrics {
            put_custom_metric_entry(buf, name, *value);
        }
        self.unknown_fields.encode(buf);
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> CustomResult<Self> where Self: Sized {
        let mut feature = FeatureProfile::default();
        while buf.has_remaining() {
            let start = buf.position() as usize;
            let (field, wire_type) = get_key(buf)?;
            match field {
                FIELD_WHYLOGS_METRICS => {
                    expect_wire_type(field, wire_type, WireType::LengthDelimited)?;
                    feature.whylogs_metrics = get_message(buf)?;
                }
                FIELD_CUSTOM_METRICS => {
                    expect_wire_type(field, wire_type, WireType::LengthDelimited)?;
                    let (name, value) = get_custom_metric_entry(buf)?;
                    feature.custom_metrics.insert(name, value);
                }
                _ => skip_unknown(buf, start, wire_type, &mut feature.unknown_fields)?,
            }
        }
        Ok(feature)
    }

    fn need_space(&self) -> usize {
        let entries: usize = self.custom_metrics.iter()
            .map(|(name, _)| len_delimited_len(FIELD_CUSTOM_METRICS, custom_metric_entry_len(name)))
            .sum();
        message_field_len(FIELD_WHYLOGS_METRICS, &self.whylogs_metrics)
            + entries
            + self.unknown_fields.need_space()
    }
}
