use serde::{Deserialize, Serialize};

use crate::stats::InferredType;

/// 字段类型
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    // 文本
    TEXT,
    // 数字-整形
    INT,
    // 数字-浮点
    FLOAT,
    // 布尔
    BOOL,
    // 时间
    DATETIME,
}

impl ColumnType {
    /// 声明的类型和推断出的类型是否一致，整数也可以是浮点列
    pub fn accepts(&self, inferred: InferredType) -> bool {
        match self {
            ColumnType::TEXT => inferred == InferredType::String,
            ColumnType::INT | ColumnType::DATETIME => inferred == InferredType::Integral,
            ColumnType::FLOAT => matches!(inferred, InferredType::Fractional | InferredType::Integral),
            ColumnType::BOOL => inferred == InferredType::Boolean,
        }
    }
}

/// 属性
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub column_type: Option<ColumnType>,
}

#[cfg(test)]
mod tests {
    use crate::ds::column::ColumnType;
    use crate::stats::InferredType;

    #[test]
    pub fn test_accepts() {
        assert!(ColumnType::FLOAT.accepts(InferredType::Integral));
        assert!(ColumnType::FLOAT.accepts(InferredType::Fractional));
        assert!(!ColumnType::INT.accepts(InferredType::Fractional));
        assert!(ColumnType::TEXT.accepts(InferredType::String));
        assert!(!ColumnType::BOOL.accepts(InferredType::Null));
    }
}
