//! 数据集 profile：数据集级别的元信息 + 特征名到 FeatureProfile 的映射
//!
//! 构造后不可变，重新计算 profile 时生成新的实例而不是修改旧的。
//! 线上格式是带长度前缀的 protobuf 消息，字段号只能追加，不能改变含义：
//!
//! ```text
//! DatasetProfile:
//!   1  int64  timestamp
//!   2  int64  num_examples
//!   3  int64  size_bytes
//!   20 map<string, FeatureProfile> feature_profiles
//! ```
use std::collections::BTreeMap;
use std::io::Cursor;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::{debug, warn};

use crate::codec::wire::*;
use crate::codec::{decode_delimited, encode_delimited, Storable, UnknownFields};
use crate::custom_error::{feature_not_found_err, invalid_argument_err, malformed_input_err, CustomResult};
use crate::ds::DatasetManifest;

mod feature;

pub use feature::FeatureProfile;

const FIELD_TIMESTAMP: u32 = 1;
const FIELD_NUM_EXAMPLES: u32 = 2;
const FIELD_SIZE_BYTES: u32 = 3;
// 3 到 20 之间留给以后数据集级别的字段
const FIELD_FEATURE_PROFILES: u32 = 20;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetProfile {
    timestamp: i64,
    num_examples: i64,
    size_bytes: i64,
    feature_profiles: BTreeMap<String, FeatureProfile>,
    unknown_fields: UnknownFields,
}

impl DatasetProfile {
    /// 构造 profile，计数为负、特征名为空或重复时返回 InvalidArgument
    pub fn build<I>(timestamp: i64, num_examples: i64, size_bytes: i64, features: I) -> CustomResult<DatasetProfile>
        where I: IntoIterator<Item=(String, FeatureProfile)> {
        if num_examples < 0 {
            return Err(invalid_argument_err(format!("num_examples 不能为负数:{}", num_examples)));
        }
        if size_bytes < 0 {
            return Err(invalid_argument_err(format!("size_bytes 不能为负数:{}", size_bytes)));
        }

        let mut feature_profiles = BTreeMap::new();
        for (name, feature) in features {
            if name.is_empty() {
                return Err(invalid_argument_err(format!("特征名不能为空")));
            }
            if feature_profiles.contains_key(&name) {
                return Err(invalid_argument_err(format!("特征名重复:{}", name)));
            }
            feature_profiles.insert(name, feature);
        }

        Ok(DatasetProfile {
            timestamp,
            num_examples,
            size_bytes,
            feature_profiles,
            unknown_fields: UnknownFields::new(),
        })
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn num_examples(&self) -> i64 {
        self.num_examples
    }

    pub fn size_bytes(&self) -> i64 {
        self.size_bytes
    }

    pub fn feature_profiles(&self) -> &BTreeMap<String, FeatureProfile> {
        &self.feature_profiles
    }

    pub fn feature_names(&self) -> impl Iterator<Item=&str> {
        self.feature_profiles.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.feature_profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_profiles.is_empty()
    }

    pub fn unknown_fields(&self) -> &UnknownFields {
        &self.unknown_fields
    }

    /// 没有该特征时返回 NotFound，由调用方决定怎么处理
    pub fn get_feature(&self, name: &str) -> CustomResult<&FeatureProfile> {
        self.feature_profiles.get(name).ok_or_else(|| feature_not_found_err(name))
    }

    /// 所有特征名都必须是数据集中的字段
    pub fn validate_against(&self, manifest: &DatasetManifest) -> CustomResult<()> {
        for name in self.feature_names() {
            if !manifest.has_column(name) {
                return Err(invalid_argument_err(format!("数据集{}中没有字段:{}", manifest.name, name)));
            }
        }
        Ok(())
    }

    /// varint 长度前缀 + 消息本身，不带前缀的编码直接用 Storable::encode
    pub fn serialize(&self) -> Bytes {
        encode_delimited(self)
    }

    /// 截断、多余字节、格式错误都返回 MalformedInput，不会返回部分结果
    pub fn deserialize(data: &[u8]) -> CustomResult<DatasetProfile> {
        decode_delimited(data).map_err(|e| {
            warn!("解析 DatasetProfile 失败, len={}, {}", data.len(), e);
            e
        })
    }
}

pub fn build<I>(timestamp: i64, num_examples: i64, size_bytes: i64, features: I) -> CustomResult<DatasetProfile>
    where I: IntoIterator<Item=(String, FeatureProfile)> {
    DatasetProfile::build(timestamp, num_examples, size_bytes, features)
}

pub fn serialize(profile: &DatasetProfile) -> Bytes {
    profile.serialize()
}

pub fn deserialize(data: &[u8]) -> CustomResult<DatasetProfile> {
    DatasetProfile::deserialize(data)
}

pub fn get_feature<'a>(profile: &'a DatasetProfile, name: &str) -> CustomResult<&'a FeatureProfile> {
    profile.get_feature(name)
}

/// map<string, FeatureProfile> 的 entry，key 和 value 总是写出
fn feature_entry_len(name: &str, feature: &FeatureProfile) -> usize {
    len_delimited_len(1, name.len()) + len_delimited_len(2, feature.need_space())
}

fn put_feature_entry(buf: &mut BytesMut, name: &str, feature: &FeatureProfile) {
    put_key(buf, FIELD_FEATURE_PROFILES, WireType::LengthDelimited);
    put_varint(buf, feature_entry_len(name, feature) as u64);
    put_key(buf, 1, WireType::LengthDelimited);
    put_varint(buf, name.len() as u64);
    buf.put_slice(name.as_bytes());
    put_key(buf, 2, WireType::LengthDelimited);
    put_varint(buf, feature.need_space() as u64);
    feature.encode(buf);
}

fn get_feature_entry(buf: &mut Cursor<&[u8]>) -> CustomResult<(String, FeatureProfile)> {
    let mut entry = Cursor::new(get_len_delimited(buf)?);
    let mut name = String::new();
    let mut feature = FeatureProfile::default();
    while entry.has_remaining() {
        let (field, wire_type) = get_key(&mut entry)?;
        match field {
            1 => {
                expect_wire_type(field, wire_type, WireType::LengthDelimited)?;
                name = get_string(&mut entry)?;
            }
            2 => {
                expect_wire_type(field, wire_type, WireType::LengthDelimited)?;
                feature = get_message(&mut entry)?;
            }
            _ => skip_field(&mut entry, wire_type)?,
        }
    }
    Ok((name, feature))
}

fn get_int64(buf: &mut Cursor<&[u8]>, field: u32, wire_type: WireType) -> CustomResult<i64> {
    expect_wire_type(field, wire_type, WireType::Varint)?;
    Ok(get_varint(buf)? as i64)
}

impl Storable for DatasetProfile {
    fn encode(&self, buf: &mut BytesMut) {
        put_int64_field(buf, FIELD_TIMESTAMP, self.timestamp);
        put_int64_field(buf, FIELD_NUM_EXAMPLES, self.num_examples);
        put_int64_field(buf, FIELD_SIZE_BYTES, self.size_bytes);
        for (name, feature) in &self.feature_profiles {
            put_feature_entry(buf, name, feature);
        }
        self.unknown_fields.encode(buf);
    }

    /// 全部解析成功才返回，解析出的数据同样要满足 build 的约束
    fn decode(buf: &mut Cursor<&[u8]>) -> CustomResult<Self> where Self: Sized {
        let mut profile = DatasetProfile::default();
        while buf.has_remaining() {
            let start = buf.position() as usize;
            let (field, wire_type) = get_key(buf)?;
            match field {
                FIELD_TIMESTAMP => profile.timestamp = get_int64(buf, field, wire_type)?,
                FIELD_NUM_EXAMPLES => profile.num_examples = get_int64(buf, field, wire_type)?,
                FIELD_SIZE_BYTES => profile.size_bytes = get_int64(buf, field, wire_type)?,
                FIELD_FEATURE_PROFILES => {
                    expect_wire_type(field, wire_type, WireType::LengthDelimited)?;
                    let (name, feature) = get_feature_entry(buf)?;
                    if name.is_empty() {
                        return Err(malformed_input_err(format!("feature_profiles 中有空的特征名")));
                    }
                    // 和 protobuf 一致，重复的 key 以最后一个为准
                    profile.feature_profiles.insert(name, feature);
                }
                _ => {
                    debug!("跳过不认识的字段:{}", field);
                    skip_unknown(buf, start, wire_type, &mut profile.unknown_fields)?
                }
            }
        }

        if profile.num_examples < 0 || profile.size_bytes < 0 {
            return Err(malformed_input_err(format!(
                "计数不能为负数, num_examples={}, size_bytes={}", profile.num_examples, profile.size_bytes)));
        }
        Ok(profile)
    }

    fn need_space(&self) -> usize {
        let entries: usize = self.feature_profiles.iter()
            .map(|(name, feature)| len_delimited_len(FIELD_FEATURE_PROFILES, feature_entry_len(name, feature)))
            .sum();
        int64_field_len(FIELD_TIMESTAMP, self.timestamp)
            + int64_field_len(FIELD_NUM_EXAMPLES, self.num_examples)
            + int64_field_len(FIELD_SIZE_BYTES, self.size_bytes)
            + entries
            + self.unknown_fields.need_space()
    }
}
