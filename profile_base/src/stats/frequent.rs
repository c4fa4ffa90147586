use std::collections::HashMap;
use std::io::Cursor;

use bytes::{Buf, BytesMut};

use crate::codec::wire::*;
use crate::codec::{Storable, UnknownFields};
use crate::custom_error::CustomResult;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequentItem {
    pub value: String,
    pub estimate: u64,
    pub unknown_fields: UnknownFields,
}

impl Storable for FrequentItem {
    fn encode(&self, buf: &mut BytesMut) {
        put_string_field(buf, 1, &self.value);
        put_uint64_field(buf, 2, self.estimate);
        self.unknown_fields.encode(buf);
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> CustomResult<Self> where Self: Sized {
        let mut item = FrequentItem::default();
        while buf.has_remaining() {
            let start = buf.position() as usize;
            let (field, wire_type) = get_key(buf)?;
            match field {
                1 => {
                    expect_wire_type(field, wire_type, WireType::LengthDelimited)?;
                    item.value = get_string(buf)?;
                }
                2 => {
                    expect_wire_type(field, wire_type, WireType::Varint)?;
                    item.estimate = get_varint(buf)?;
                }
                _ => skip_unknown(buf, start, wire_type, &mut item.unknown_fields)?,
            }
        }
        Ok(item)
    }

    fn need_space(&self) -> usize {
        string_field_len(1, &self.value)
            + uint64_field_len(2, self.estimate)
            + self.unknown_fields.need_space()
    }
}

/// 出现次数最多的值，按次数降序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequentItems {
    pub items: Vec<FrequentItem>,
    pub unknown_fields: UnknownFields,
}

impl Storable for FrequentItems {
    fn encode(&self, buf: &mut BytesMut) {
        for item in &self.items {
            put_entry_field(buf, 1, item);
        }
        self.unknown_fields.encode(buf);
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> CustomResult<Self> where Self: Sized {
        let mut frequent = FrequentItems::default();
        while buf.has_remaining() {
            let start = buf.position() as usize;
            let (field, wire_type) = get_key(buf)?;
            match field {
                1 => {
                    expect_wire_type(field, wire_type, WireType::LengthDelimited)?;
                    frequent.items.push(get_message(buf)?);
                }
                _ => skip_unknown(buf, start, wire_type, &mut frequent.unknown_fields)?,
            }
        }
        Ok(frequent)
    }

    fn need_space(&self) -> usize {
        self.items.iter().map(|item| entry_field_len(1, item)).sum::<usize>()
            + self.unknown_fields.need_space()
    }
}

#[derive(Debug, Default)]
pub struct FrequentItemsTracker {
    counts: HashMap<String, u64>,
}

impl FrequentItemsTracker {
    pub fn new() -> FrequentItemsTracker {
        FrequentItemsTracker::default()
    }

    pub fn track(&mut self, value: &str) {
        *self.counts.entry(value.to_string()).or_insert(0) += 1;
    }

    /// 取前k个，次数相同的按值排序
    pub fn finish(self, k: usize) -> FrequentItems {
        let mut counts: Vec<(String, u64)> = self.counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts.truncate(k);
        FrequentItems {
            items: counts.into_iter()
                .map(|(value, estimate)| FrequentItem { value, estimate, unknown_fields: UnknownFields::new() })
                .collect(),
            unknown_fields: UnknownFields::new(),
        }
    }
}
