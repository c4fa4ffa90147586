use std::collections::BTreeMap;
use std::io::Cursor;

use bytes::{Buf, BytesMut};
use num_enum::FromPrimitive;
use serde_json::Value;

use crate::codec::wire::*;
use crate::codec::{Storable, UnknownFields};
use crate::custom_error::CustomResult;
use crate::stats::cardinality::Cardinality;
use crate::stats::frequent::FrequentItems;
use crate::stats::number::NumberSummary;

/// 推断出的字段类型，线上编码为 int32
/// 新版本可能引入新的取值，不认识的值原样保存在 Other 中
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive)]
#[repr(i32)]
pub enum InferredType {
    Unknown = 0,
    Null = 1,
    Fractional = 2,
    Integral = 3,
    Boolean = 4,
    String = 5,
    /// 只存放 0..=5 以外的取值，构造时用 `InferredType::from_code`
    #[num_enum(catch_all)]
    Other(i32),
}

impl Default for InferredType {
    fn default() -> Self {
        InferredType::Unknown
    }
}

impl InferredType {
    /// 已知取值总是映射到具名的变体，`from_code(3)` 是 Integral 而不是 Other(3)
    pub fn from_code(code: i32) -> InferredType {
        InferredType::from_primitive(code)
    }

    pub fn code(&self) -> i32 {
        match self {
            InferredType::Unknown => 0,
            InferredType::Null => 1,
            InferredType::Fractional => 2,
            InferredType::Integral => 3,
            InferredType::Boolean => 4,
            InferredType::String => 5,
            InferredType::Other(v) => *v,
        }
    }

    /// 判断单个值的类型，null 返回 Null
    /// 字符串如果能解析为数字或布尔值，按解析后的类型算（兼容csv来源的数据）
    pub fn of_value(value: &Value) -> InferredType {
        match value {
            Value::Null => InferredType::Null,
            Value::Bool(_) => InferredType::Boolean,
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    InferredType::Integral
                } else {
                    InferredType::Fractional
                }
            }
            Value::String(s) => InferredType::of_str(s),
            Value::Array(_) | Value::Object(_) => InferredType::String,
        }
    }

    fn of_str(s: &str) -> InferredType {
        let s = s.trim();
        if s.parse::<i64>().is_ok() {
            return InferredType::Integral;
        }
        if let Ok(v) = s.parse::<f64>() {
            // "nan" "inf" 也能解析，但不算数字
            if v.is_finite() {
                return InferredType::Fractional;
            }
        }
        if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
            return InferredType::Boolean;
        }
        InferredType::String
    }
}

/// 计数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Counters {
    pub count: u64,
    pub null_count: u64,
    pub unknown_fields: UnknownFields,
}

impl Storable for Counters {
    fn encode(&self, buf: &mut BytesMut) {
        put_uint64_field(buf, 1, self.count);
        put_uint64_field(buf, 2, self.null_count);
        self.unknown_fields.encode(buf);
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> CustomResult<Self> where Self: Sized {
        let mut counters = Counters::default();
        while buf.has_remaining() {
            let start = buf.position() as usize;
            let (field, wire_type) = get_key(buf)?;
            match field {
                1 => {
                    expect_wire_type(field, wire_type, WireType::Varint)?;
                    counters.count = get_varint(buf)?;
                }
                2 => {
                    expect_wire_type(field, wire_type, WireType::Varint)?;
                    counters.null_count = get_varint(buf)?;
                }
                _ => skip_unknown(buf, start, wire_type, &mut counters.unknown_fields)?,
            }
        }
        Ok(counters)
    }

    fn need_space(&self) -> usize {
        uint64_field_len(1, self.count)
            + uint64_field_len(2, self.null_count)
            + self.unknown_fields.need_space()
    }
}

/// 类型推断的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMessage {
    pub inferred_type: InferredType,
    /// 推断类型占非空值的比例
    pub ratio: f64,
    /// 类型编码 -> 出现次数
    pub type_counts: BTreeMap<i32, u64>,
    pub unknown_fields: UnknownFields,
}

impl SchemaMessage {
    pub fn type_count(&self, t: InferredType) -> u64 {
        self.type_counts.get(&t.code()).copied().unwrap_or(0)
    }
}

/// map<int32, uint64> 的entry
#[derive(Debug, Default)]
struct TypeCountEntry {
    key: i32,
    value: u64,
}

impl Storable for TypeCountEntry {
    fn encode(&self, buf: &mut BytesMut) {
        put_int64_field(buf, 1, self.key as i64);
        put_uint64_field(buf, 2, self.value);
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> CustomResult<Self> where Self: Sized {
        let mut entry = TypeCountEntry::default();
        while buf.has_remaining() {
            let (field, wire_type) = get_key(buf)?;
            match field {
                1 => {
                    expect_wire_type(field, wire_type, WireType::Varint)?;
                    entry.key = get_varint(buf)? as i32;
                }
                2 => {
                    expect_wire_type(field, wire_type, WireType::Varint)?;
                    entry.value = get_varint(buf)?;
                }
                _ => skip_field(buf, wire_type)?,
            }
        }
        Ok(entry)
    }

    fn need_space(&self) -> usize {
        int64_field_len(1, self.key as i64) + uint64_field_len(2, self.value)
    }
}

impl Storable for SchemaMessage {
    fn encode(&self, buf: &mut BytesMut) {
        put_int64_field(buf, 1, self.inferred_type.code() as i64);
        put_double_field(buf, 2, self.ratio);
        for (k, v) in &self.type_counts {
            put_entry_field(buf, 3, &TypeCountEntry { key: *k, value: *v });
        }
        self.unknown_fields.encode(buf);
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> CustomResult<Self> where Self: Sized {
        let mut schema = SchemaMessage::default();
        while buf.has_remaining() {
            let start = buf.position() as usize;
            let (field, wire_type) = get_key(buf)?;
            match field {
                1 => {
                    expect_wire_type(field, wire_type, WireType::Varint)?;
                    schema.inferred_type = InferredType::from_code(get_varint(buf)? as i32);
                }
                2 => {
                    expect_wire_type(field, wire_type, WireType::Fixed64)?;
                    schema.ratio = get_double(buf)?;
                }
                3 => {
                    expect_wire_type(field, wire_type, WireType::LengthDelimited)?;
                    let entry: TypeCountEntry = get_message(buf)?;
                    schema.type_counts.insert(entry.key, entry.value);
                }
                _ => skip_unknown(buf, start, wire_type, &mut schema.unknown_fields)?,
            }
        }
        Ok(schema)
    }

    fn need_space(&self) -> usize {
        let entries: usize = self.type_counts.iter()
            .map(|(k, v)| entry_field_len(3, &TypeCountEntry { key: *k, value: *v }))
            .sum();
        int64_field_len(1, self.inferred_type.code() as i64)
            + double_field_len(2, self.ratio)
            + entries
            + self.unknown_fields.need_space()
    }
}

/// 单个字段的统计信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMessage {
    pub name: String,
    pub counters: Counters,
    pub schema: SchemaMessage,
    pub number_summary: NumberSummary,
    pub string_length_summary: NumberSummary,
    pub frequent_items: FrequentItems,
    pub cardinality: Cardinality,
    pub unknown_fields: UnknownFields,
}

impl ColumnMessage {
    /// 没有任何统计信息，等价于线上缺失该字段
    pub fn is_empty(&self) -> bool {
        self.need_space() == 0
    }
}

impl Storable for ColumnMessage {
    fn encode(&self, buf: &mut BytesMut) {
        put_string_field(buf, 1, &self.name);
        put_message_field(buf, 2, &self.counters);
        put_message_field(buf, 3, &self.schema);
        put_message_field(buf, 4, &self.number_summary);
        put_message_field(buf, 5, &self.string_length_summary);
        put_message_field(buf, 6, &self.frequent_items);
        put_message_field(buf, 7, &self.cardinality);
        self.unknown_fields.encode(buf);
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> CustomResult<Self> where Self: Sized {
        let mut column = ColumnMessage::default();
        while buf.has_remaining() {
            let start = buf.position() as usize;
            let (field, wire_type) = get_key(buf)?;
            if (1..=7).contains(&field) {
                expect_wire_type(field, wire_type, WireType::LengthDelimited)?;
            }
            match field {
                1 => column.name = get_string(buf)?,
                2 => column.counters = get_message(buf)?,
                3 => column.schema = get_message(buf)?,
                4 => column.number_summary = get_message(buf)?,
                5 => column.string_length_summary = get_message(buf)?,
                6 => column.frequent_items = get_message(buf)?,
                7 => column.cardinality = get_message(buf)?,
                _ => skip_unknown(buf, start, wire_type, &mut column.unknown_fields)?,
            }
        }
        Ok(column)
    }

    fn need_space(&self) -> usize {
        string_field_len(1, &self.name)
            + message_field_len(2, &self.counters)
            + message_field_len(3, &self.schema)
            + message_field_len(4, &self.number_summary)
            + message_field_len(5, &self.string_length_summary)
            + message_field_len(6, &self.frequent_items)
            + message_field_len(7, &self.cardinality)
            + self.unknown_fields.need_space()
    }
}
