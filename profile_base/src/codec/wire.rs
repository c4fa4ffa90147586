use std::io::Cursor;

use bytes::{Buf, BufMut, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::codec::{Storable, UnknownFields};
use crate::custom_error::{decode_failed_by_insufficient_data_err, malformed_input_err, CustomResult};

/// 字段号上限，2^29 - 1
pub const MAX_FIELD_NUMBER: u64 = (1 << 29) - 1;

/// varint最多10个字节
const MAX_VARINT_LEN: usize = 10;

/// protobuf 线上类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

pub fn put_varint(buf: &mut BytesMut, mut v: u64) {
    while v >= 0x80 {
        buf.put_u8((v as u8) | 0x80);
        v >>= 7;
    }
    buf.put_u8(v as u8);
}

pub fn varint_len(v: u64) -> usize {
    // 每7位一个字节，0也要占一个字节
    let bits = 64 - (v | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

pub fn get_varint(buf: &mut Cursor<&[u8]>) -> CustomResult<u64> {
    let mut value: u64 = 0;
    for i in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Err(decode_failed_by_insufficient_data_err());
        }
        let b = buf.get_u8();
        if i == MAX_VARINT_LEN - 1 && b > 1 {
            return Err(malformed_input_err(format!("varint超过64位")));
        }
        value |= ((b & 0x7f) as u64) << (7 * i);
        if b < 0x80 {
            return Ok(value);
        }
    }
    Err(malformed_input_err(format!("varint超过{}个字节", MAX_VARINT_LEN)))
}

pub fn put_key(buf: &mut BytesMut, field: u32, wire_type: WireType) {
    let wire: u8 = wire_type.into();
    put_varint(buf, ((field as u64) << 3) | wire as u64);
}

pub fn key_len(field: u32) -> usize {
    varint_len((field as u64) << 3)
}

pub fn get_key(buf: &mut Cursor<&[u8]>) -> CustomResult<(u32, WireType)> {
    let key = get_varint(buf)?;
    let field = key >> 3;
    if field == 0 || field > MAX_FIELD_NUMBER {
        return Err(malformed_input_err(format!("非法的字段号:{}", field)));
    }
    let wire_type = WireType::try_from((key & 0x7) as u8)?;
    Ok((field as u32, wire_type))
}

/// 读取一段长度前缀的数据，返回的切片借用自原始字节
pub fn get_len_delimited<'a>(buf: &mut Cursor<&'a [u8]>) -> CustomResult<&'a [u8]> {
    let len = get_varint(buf)?;
    if len > buf.remaining() as u64 {
        return Err(decode_failed_by_insufficient_data_err());
    }
    let data: &'a [u8] = *buf.get_ref();
    let start = buf.position() as usize;
    let end = start + len as usize;
    buf.advance(len as usize);
    Ok(&data[start..end])
}

pub fn get_double(buf: &mut Cursor<&[u8]>) -> CustomResult<f64> {
    if buf.remaining() < 8 {
        return Err(decode_failed_by_insufficient_data_err());
    }
    Ok(buf.get_f64_le())
}

pub fn get_string(buf: &mut Cursor<&[u8]>) -> CustomResult<String> {
    let data = get_len_delimited(buf)?;
    Ok(String::from_utf8(data.to_vec())?)
}

pub fn get_message<M: Storable>(buf: &mut Cursor<&[u8]>) -> CustomResult<M> {
    let data = get_len_delimited(buf)?;
    M::decode(&mut Cursor::new(data))
}

pub fn expect_wire_type(field: u32, actual: WireType, expected: WireType) -> CustomResult<()> {
    if actual != expected {
        return Err(malformed_input_err(format!(
            "字段{}的线上类型不匹配，期望{:?}，实际{:?}", field, expected, actual)));
    }
    Ok(())
}

pub fn skip_field(buf: &mut Cursor<&[u8]>, wire_type: WireType) -> CustomResult<()> {
    match wire_type {
        WireType::Varint => {
            get_varint(buf)?;
        }
        WireType::Fixed64 => skip_bytes(buf, 8)?,
        WireType::LengthDelimited => {
            get_len_delimited(buf)?;
        }
        WireType::Fixed32 => skip_bytes(buf, 4)?,
        WireType::StartGroup | WireType::EndGroup => {
            return Err(malformed_input_err(format!("不支持group类型的字段")));
        }
    }
    Ok(())
}

fn skip_bytes(buf: &mut Cursor<&[u8]>, n: usize) -> CustomResult<()> {
    if buf.remaining() < n {
        return Err(decode_failed_by_insufficient_data_err());
    }
    buf.advance(n);
    Ok(())
}

/// 跳过不认识的字段，并把原始字节（含key）原样保存下来
pub fn skip_unknown(buf: &mut Cursor<&[u8]>, start: usize, wire_type: WireType,
                    unknown: &mut UnknownFields) -> CustomResult<()> {
    skip_field(buf, wire_type)?;
    let data: &[u8] = *buf.get_ref();
    unknown.push_raw(&data[start..buf.position() as usize]);
    Ok(())
}

// ---------------- 编码，proto3 默认值不写出 ----------------

pub fn put_uint64_field(buf: &mut BytesMut, field: u32, v: u64) {
    if v != 0 {
        put_key(buf, field, WireType::Varint);
        put_varint(buf, v);
    }
}

pub fn uint64_field_len(field: u32, v: u64) -> usize {
    if v != 0 { key_len(field) + varint_len(v) } else { 0 }
}

pub fn put_int64_field(buf: &mut BytesMut, field: u32, v: i64) {
    put_uint64_field(buf, field, v as u64)
}

pub fn int64_field_len(field: u32, v: i64) -> usize {
    uint64_field_len(field, v as u64)
}

pub fn put_double_field(buf: &mut BytesMut, field: u32, v: f64) {
    // -0.0 的位模式不是0，需要写出
    if v.to_bits() != 0 {
        put_key(buf, field, WireType::Fixed64);
        buf.put_f64_le(v);
    }
}

pub fn double_field_len(field: u32, v: f64) -> usize {
    if v.to_bits() != 0 { key_len(field) + 8 } else { 0 }
}

pub fn put_bytes_field(buf: &mut BytesMut, field: u32, v: &[u8]) {
    if !v.is_empty() {
        put_key(buf, field, WireType::LengthDelimited);
        put_varint(buf, v.len() as u64);
        buf.put_slice(v);
    }
}

pub fn bytes_field_len(field: u32, v: &[u8]) -> usize {
    if !v.is_empty() { len_delimited_len(field, v.len()) } else { 0 }
}

pub fn put_string_field(buf: &mut BytesMut, field: u32, v: &str) {
    put_bytes_field(buf, field, v.as_bytes())
}

pub fn string_field_len(field: u32, v: &str) -> usize {
    bytes_field_len(field, v.as_bytes())
}

/// 子消息，为空时不写出
pub fn put_message_field<M: Storable>(buf: &mut BytesMut, field: u32, m: &M) {
    let len = m.need_space();
    if len > 0 {
        put_key(buf, field, WireType::LengthDelimited);
        put_varint(buf, len as u64);
        m.encode(buf);
    }
}

pub fn message_field_len<M: Storable>(field: u32, m: &M) -> usize {
    let len = m.need_space();
    if len > 0 { len_delimited_len(field, len) } else { 0 }
}

/// map的entry总是写出，即使内容为空
pub fn put_entry_field<M: Storable>(buf: &mut BytesMut, field: u32, entry: &M) {
    let len = entry.need_space();
    put_key(buf, field, WireType::LengthDelimited);
    put_varint(buf, len as u64);
    entry.encode(buf);
}

pub fn entry_field_len<M: Storable>(field: u32, entry: &M) -> usize {
    len_delimited_len(field, entry.need_space())
}

pub fn len_delimited_len(field: u32, len: usize) -> usize {
    key_len(field) + varint_len(len as u64) + len
}

pub fn put_packed_uint64(buf: &mut BytesMut, field: u32, values: &[u64]) {
    if values.is_empty() {
        return;
    }
    let len: usize = values.iter().map(|v| varint_len(*v)).sum();
    put_key(buf, field, WireType::LengthDelimited);
    put_varint(buf, len as u64);
    for v in values {
        put_varint(buf, *v);
    }
}

pub fn packed_uint64_len(field: u32, values: &[u64]) -> usize {
    if values.is_empty() {
        return 0;
    }
    len_delimited_len(field, values.iter().map(|v| varint_len(*v)).sum())
}

pub fn put_packed_double(buf: &mut BytesMut, field: u32, values: &[f64]) {
    if values.is_empty() {
        return;
    }
    put_key(buf, field, WireType::LengthDelimited);
    put_varint(buf, (values.len() * 8) as u64);
    for v in values {
        buf.put_f64_le(*v);
    }
}

pub fn packed_double_len(field: u32, values: &[f64]) -> usize {
    if values.is_empty() { 0 } else { len_delimited_len(field, values.len() * 8) }
}

/// 读取repeated uint64，同时兼容packed和非packed两种写法
pub fn get_repeated_uint64(buf: &mut Cursor<&[u8]>, field: u32, wire_type: WireType,
                           out: &mut Vec<u64>) -> CustomResult<()> {
    match wire_type {
        WireType::Varint => out.push(get_varint(buf)?),
        WireType::LengthDelimited => {
            let mut packed = Cursor::new(get_len_delimited(buf)?);
            while packed.has_remaining() {
                out.push(get_varint(&mut packed)?);
            }
        }
        _ => expect_wire_type(field, wire_type, WireType::LengthDelimited)?,
    }
    Ok(())
}

pub fn get_repeated_double(buf: &mut Cursor<&[u8]>, field: u32, wire_type: WireType,
                           out: &mut Vec<f64>) -> CustomResult<()> {
    match wire_type {
        WireType::Fixed64 => out.push(get_double(buf)?),
        WireType::LengthDelimited => {
            let data = get_len_delimited(buf)?;
            if data.len() % 8 != 0 {
                return Err(malformed_input_err(format!("字段{}的packed double长度非法:{}", field, data.len())));
            }
            let mut packed = Cursor::new(data);
            while packed.has_remaining() {
                out.push(packed.get_f64_le());
            }
        }
        _ => expect_wire_type(field, wire_type, WireType::LengthDelimited)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use crate::codec::wire::*;

    #[test]
    pub fn test_varint() {
        for v in [0u64, 1, 127, 128, 300, 16384, u32::MAX as u64, u64::MAX] {
            let mut buf = BytesMut::new();
            put_varint(&mut buf, v);
            assert_eq!(buf.len(), varint_len(v));
            let mut cursor: Cursor<&[u8]> = Cursor::new(&*buf);
            assert_eq!(get_varint(&mut cursor).unwrap(), v);
        }

        let mut buf = BytesMut::new();
        put_varint(&mut buf, 300);
        assert_eq!(&buf[..], &[0xac, 0x02]);
        // -1 作为int64写出是10个字节
        assert_eq!(varint_len(-1i64 as u64), 10);
    }

    #[test]
    pub fn test_varint_truncated_and_overlong() {
        let mut cursor: Cursor<&[u8]> = Cursor::new(&[0x80u8, 0x80][..]);
        assert!(get_varint(&mut cursor).unwrap_err().is_malformed());

        let overlong: [u8; 10] = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f];
        let mut cursor: Cursor<&[u8]> = Cursor::new(&overlong[..]);
        let e = get_varint(&mut cursor).unwrap_err();
        assert_eq!(e.code, crate::custom_error::MALFORMED_INPUT_CODE);
    }

    #[test]
    pub fn test_key() {
        let mut buf = BytesMut::new();
        put_key(&mut buf, 20, WireType::LengthDelimited);
        assert_eq!(&buf[..], &[0xa2, 0x01]);
        assert_eq!(key_len(20), 2);

        let mut cursor: Cursor<&[u8]> = Cursor::new(&*buf);
        assert_eq!(get_key(&mut cursor).unwrap(), (20, WireType::LengthDelimited));

        // 字段号0 非法
        let mut cursor: Cursor<&[u8]> = Cursor::new(&[0x02u8][..]);
        assert!(get_key(&mut cursor).unwrap_err().is_malformed());

        // 线上类型7 非法
        let mut cursor: Cursor<&[u8]> = Cursor::new(&[0x0fu8][..]);
        assert!(get_key(&mut cursor).unwrap_err().is_malformed());
    }

    #[test]
    pub fn test_len_delimited_truncated() {
        let mut cursor: Cursor<&[u8]> = Cursor::new(&[0x05u8, 1, 2][..]);
        let e = get_len_delimited(&mut cursor).unwrap_err();
        assert_eq!(e.code, crate::custom_error::DECODE_FAILED_BY_INSUFFICIENT_DATA_CODE);
    }

    #[test]
    pub fn test_packed_accepts_unpacked() {
        let mut buf = BytesMut::new();
        put_packed_uint64(&mut buf, 3, &[1, 2, 300]);
        assert_eq!(buf.len(), packed_uint64_len(3, &[1, 2, 300]));

        let mut cursor: Cursor<&[u8]> = Cursor::new(&*buf);
        let (field, wire) = get_key(&mut cursor).unwrap();
        let mut out = vec![];
        get_repeated_uint64(&mut cursor, field, wire, &mut out).unwrap();
        assert_eq!(out, vec![1, 2, 300]);

        let mut buf = BytesMut::new();
        put_key(&mut buf, 3, WireType::Varint);
        put_varint(&mut buf, 7);
        let mut cursor: Cursor<&[u8]> = Cursor::new(&*buf);
        let (field, wire) = get_key(&mut cursor).unwrap();
        get_repeated_uint64(&mut cursor, field, wire, &mut out).unwrap();
        assert_eq!(out, vec![1, 2, 300, 7]);
    }

    #[test]
    pub fn test_default_scalars_not_written() {
        let mut buf = BytesMut::new();
        put_int64_field(&mut buf, 1, 0);
        put_double_field(&mut buf, 2, 0.0);
        put_string_field(&mut buf, 3, "");
        assert!(buf.is_empty());

        put_double_field(&mut buf, 2, -0.0);
        assert_eq!(buf.len(), double_field_len(2, -0.0));
    }
}
