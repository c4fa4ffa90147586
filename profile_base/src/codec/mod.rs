use std::fmt::Debug;
use std::io::Cursor;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::debug;

use crate::custom_error::{decode_failed_by_insufficient_data_err, malformed_input_err, CustomResult};

pub mod wire;

/// 可序列化为 protobuf 线上格式的接口定义
pub trait Storable: Debug + Send + Sync {
    /// 转为字节，字段按字段号升序写出，不认识的字段原样追加在最后
    fn encode(&self, buf: &mut BytesMut);

    /// 从字节中实例化，消费 cursor 中剩余的全部数据
    fn decode(buf: &mut Cursor<&[u8]>) -> CustomResult<Self> where Self: Sized;

    /// 需要的字节大小，必须和 encode 写出的长度一致
    fn need_space(&self) -> usize;
}

/// 编码为一个完整的字节块
pub fn encode_to_bytes<M: Storable>(m: &M) -> Bytes {
    let mut buf = BytesMut::with_capacity(m.need_space());
    m.encode(&mut buf);
    debug!("encode {} bytes", buf.len());
    buf.freeze()
}

/// 解码一个完整的字节块，失败时不会返回部分结果
pub fn decode_from_slice<M: Storable>(data: &[u8]) -> CustomResult<M> {
    let mut cursor: Cursor<&[u8]> = Cursor::new(data);
    let m = M::decode(&mut cursor)?;
    debug!("decode {} bytes, remaining {}", data.len(), cursor.remaining());
    Ok(m)
}

/// 带长度前缀编码，和 protobuf 各语言实现的 writeDelimited 兼容
/// 有了长度前缀，任何截断都能被发现
pub fn encode_delimited<M: Storable>(m: &M) -> Bytes {
    let len = m.need_space();
    let mut buf = BytesMut::with_capacity(wire::varint_len(len as u64) + len);
    wire::put_varint(&mut buf, len as u64);
    m.encode(&mut buf);
    buf.freeze()
}

/// 数据必须恰好是一个带长度前缀的消息，长度不足或有多余字节都算非法
pub fn decode_delimited<M: Storable>(data: &[u8]) -> CustomResult<M> {
    let mut cursor: Cursor<&[u8]> = Cursor::new(data);
    let len = wire::get_varint(&mut cursor)?;
    let remaining = cursor.remaining() as u64;
    if remaining < len {
        return Err(decode_failed_by_insufficient_data_err());
    }
    if remaining > len {
        return Err(malformed_input_err(format!("消息后面有{}个多余字节", remaining - len)));
    }
    let start = cursor.position() as usize;
    decode_from_slice(&data[start..])
}

/// 新版本 schema 引入、本版本不认识的字段
/// 保存原始字节（含key），重新序列化时原样写回
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownFields(Vec<u8>);

impl UnknownFields {
    pub fn new() -> UnknownFields {
        UnknownFields(Vec::new())
    }

    pub fn push_raw(&mut self, raw: &[u8]) {
        self.0.extend_from_slice(raw);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.0);
    }

    pub fn need_space(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::codec::{decode_delimited, encode_delimited, encode_to_bytes};
    use crate::stats::column::Counters;

    #[test]
    pub fn test_delimited() {
        let counters = Counters { count: 3, null_count: 1, ..Default::default() };
        let bytes = encode_delimited(&counters);
        assert_eq!(&bytes[..], &[0x04, 0x08, 0x03, 0x10, 0x01]);
        assert_eq!(&bytes[1..], &encode_to_bytes(&counters)[..]);
        assert_eq!(decode_delimited::<Counters>(&bytes).unwrap(), counters);

        // 截断在字段边界上也能发现
        assert!(decode_delimited::<Counters>(&bytes[..3]).unwrap_err().is_malformed());
        assert!(decode_delimited::<Counters>(&[]).unwrap_err().is_malformed());

        let mut trailing = bytes.to_vec();
        trailing.push(0);
        assert!(decode_delimited::<Counters>(&trailing).unwrap_err().is_malformed());
    }
}
