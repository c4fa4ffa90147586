//! 单个字段的统计信息，对应 FeatureProfile 中的 whylogs_metrics
pub mod cardinality;
pub mod column;
pub mod frequent;
pub mod number;
pub mod profiler;

pub use column::{ColumnMessage, InferredType};
pub use profiler::ColumnProfiler;
