use std::io::Cursor;

use bytes::{Buf, BytesMut};

use crate::codec::wire::*;
use crate::codec::{Storable, UnknownFields};
use crate::custom_error::{invalid_argument_err, CustomResult};

pub const MIN_PRECISION: u32 = 4;
pub const MAX_PRECISION: u32 = 16;

/// 基数估计的结果，registers 是 HyperLogLog 的寄存器
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cardinality {
    pub estimate: f64,
    pub precision: u32,
    pub registers: Vec<u8>,
    pub unknown_fields: UnknownFields,
}

impl Storable for Cardinality {
    fn encode(&self, buf: &mut BytesMut) {
        put_double_field(buf, 1, self.estimate);
        put_uint64_field(buf, 2, self.precision as u64);
        put_bytes_field(buf, 3, &self.registers);
        self.unknown_fields.encode(buf);
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> CustomResult<Self> where Self: Sized {
        let mut cardinality = Cardinality::default();
        while buf.has_remaining() {
            let start = buf.position() as usize;
            let (field, wire_type) = get_key(buf)?;
            match field {
                1 => {
                    expect_wire_type(field, wire_type, WireType::Fixed64)?;
                    cardinality.estimate = get_double(buf)?;
                }
                2 => {
                    expect_wire_type(field, wire_type, WireType::Varint)?;
                    cardinality.precision = get_varint(buf)? as u32;
                }
                3 => {
                    expect_wire_type(field, wire_type, WireType::LengthDelimited)?;
                    cardinality.registers = get_len_delimited(buf)?.to_vec();
                }
                _ => skip_unknown(buf, start, wire_type, &mut cardinality.unknown_fields)?,
            }
        }
        Ok(cardinality)
    }

    fn need_space(&self) -> usize {
        double_field_len(1, self.estimate)
            + uint64_field_len(2, self.precision as u64)
            + bytes_field_len(3, &self.registers)
            + self.unknown_fields.need_space()
    }
}

/// HyperLogLog 基数估计，寄存器个数为 2^precision
#[derive(Debug, Clone)]
pub struct HyperLogLog {
    precision: u32,
    registers: Vec<u8>,
}

impl HyperLogLog {
    pub fn new(precision: u32) -> CustomResult<HyperLogLog> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(invalid_argument_err(format!(
                "hll precision 必须在{}到{}之间:{}", MIN_PRECISION, MAX_PRECISION, precision)));
        }
        Ok(HyperLogLog {
            precision,
            registers: vec![0; 1 << precision],
        })
    }

    pub fn add_hash(&mut self, hash: u64) {
        let index = (hash >> (64 - self.precision)) as usize;
        let rest = hash << self.precision;
        // rest 全为0时 leading_zeros 是64，截断到最大可能的秩
        let rank = (rest.leading_zeros() + 1).min(64 - self.precision + 1) as u8;
        if rank > self.registers[index] {
            self.registers[index] = rank;
        }
    }

    pub fn estimate(&self) -> f64 {
        let m = self.registers.len() as f64;
        let alpha = match self.registers.len() {
            16 => 0.673,
            32 => 0.697,
            64 => 0.709,
            _ => 0.7213 / (1.0 + 1.079 / m),
        };
        let sum: f64 = self.registers.iter().map(|r| 2f64.powi(-(*r as i32))).sum();
        let raw = alpha * m * m / sum;

        let zeros = self.registers.iter().filter(|r| **r == 0).count();
        // 小基数时用 linear counting 修正
        if raw <= 2.5 * m && zeros > 0 {
            m * (m / zeros as f64).ln()
        } else {
            raw
        }
    }

    pub fn finish(self) -> Cardinality {
        Cardinality {
            estimate: self.estimate(),
            precision: self.precision,
            registers: self.registers,
            unknown_fields: UnknownFields::new(),
        }
    }
}
