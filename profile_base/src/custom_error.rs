use std::error;
use std::fmt;
use std::string::FromUtf8Error;

use num_enum::{TryFromPrimitive, TryFromPrimitiveError};

pub type CustomResult<T> = std::result::Result<T, CustomError>;

#[derive(Debug, Clone, PartialEq)]
pub struct CustomError {
    pub code: usize,
    pub message: String,
}

impl CustomError {
    /// 构造参数非法：负数计数、空的或重复的特征名
    pub fn is_invalid_argument(&self) -> bool {
        self.code == INVALID_ARGUMENT_CODE
    }

    pub fn is_not_found(&self) -> bool {
        self.code == FEATURE_NOT_FOUND_CODE
    }

    /// 字节流损坏或被截断，两种错误码都算
    pub fn is_malformed(&self) -> bool {
        self.code == MALFORMED_INPUT_CODE || self.code == DECODE_FAILED_BY_INSUFFICIENT_DATA_CODE
    }
}

impl From<std::io::Error> for CustomError {
    fn from(e: std::io::Error) -> Self {
        common_err(e.to_string())
    }
}

impl From<FromUtf8Error> for CustomError {
    fn from(e: FromUtf8Error) -> Self {
        malformed_input_err(format!("字符串不是合法的utf8:{}", e))
    }
}

impl<T: TryFromPrimitive> From<TryFromPrimitiveError<T>> for CustomError {
    fn from(e: TryFromPrimitiveError<T>) -> Self {
        malformed_input_err(e.to_string())
    }
}

impl From<serde_json::Error> for CustomError {
    fn from(e: serde_json::Error) -> Self {
        common_err(e.to_string())
    }
}

// 根据错误码显示不同的错误信息
impl fmt::Display for CustomError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "错误码：{}，详细信息:{}", self.code, self.message)
    }
}

impl error::Error for CustomError {}

pub const COMMON_CODE: usize = 10000;
pub const INVALID_ARGUMENT_CODE: usize = 10001;
pub const FEATURE_NOT_FOUND_CODE: usize = 10002;

pub fn common_err(msg: String) -> CustomError {
    CustomError {
        code: COMMON_CODE,
        message: msg,
    }
}

pub fn invalid_argument_err(msg: String) -> CustomError {
    CustomError {
        code: INVALID_ARGUMENT_CODE,
        message: msg,
    }
}

pub fn feature_not_found_err(name: &str) -> CustomError {
    CustomError {
        code: FEATURE_NOT_FOUND_CODE,
        message: format!("profile中没有特征:{}", name),
    }
}

/// 字节流格式非法，错误码
pub const MALFORMED_INPUT_CODE: usize = 20001;
pub fn malformed_input_err(msg: String) -> CustomError {
    CustomError {
        code: MALFORMED_INPUT_CODE,
        message: msg,
    }
}

/// 因为数据不足导致的失败，错误码
pub const DECODE_FAILED_BY_INSUFFICIENT_DATA_CODE: usize = 20002;
pub fn decode_failed_by_insufficient_data_err() -> CustomError {
    CustomError {
        code: DECODE_FAILED_BY_INSUFFICIENT_DATA_CODE,
        message: format!("解析失败，数据长度不足"),
    }
}
