use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use column::Column;

use crate::config::ProfileConfig;
use crate::custom_error::{invalid_argument_err, CustomResult};
use crate::profile::{DatasetProfile, FeatureProfile};
use crate::stats::ColumnProfiler;

pub mod column;

/// 自定义指标：空值比例
pub const METRIC_NULL_RATIO: &str = "null_ratio";

/// 校验和
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Checksum {
    // 算法，比如 sha256
    pub algorithm: String,
    pub value: String,
}

/// 数据集描述，profile 的特征名必须是其中的字段
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatasetManifest {
    // 名称
    pub name: String,
    // 描述
    #[serde(default)]
    pub desc: String,
    // 属性
    pub columns: Vec<Column>,
    #[serde(default)]
    pub checksum: Option<Checksum>,
    // 下载地址
    #[serde(default)]
    pub download_url: Option<String>,
}

impl DatasetManifest {
    pub fn from_json(data: &str) -> CustomResult<DatasetManifest> {
        let manifest: DatasetManifest = serde_json::from_str(data)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> CustomResult<DatasetManifest> {
        let data = fs::read_to_string(path.as_ref())?;
        let manifest = DatasetManifest::from_json(&data)?;
        info!("load manifest {} from {:?}, {} columns", manifest.name, path.as_ref(), manifest.columns.len());
        Ok(manifest)
    }

    /// 字段名不能为空，不能重复
    pub fn validate(&self) -> CustomResult<()> {
        let mut names = HashSet::new();
        for column in &self.columns {
            if column.name.is_empty() {
                return Err(invalid_argument_err(format!("数据集{}中有空的字段名", self.name)));
            }
            if !names.insert(column.name.as_str()) {
                return Err(invalid_argument_err(format!("数据集{}中字段重复:{}", self.name, column.name)));
            }
        }
        Ok(())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item=&str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// 对全部行计算 profile，每个字段一个 ColumnProfiler
    /// 行必须是 json object，缺失的字段按 null 计
    pub fn profile_rows(&self, rows: &[Value], size_bytes: i64, timestamp: i64,
                        config: &ProfileConfig) -> CustomResult<DatasetProfile> {
        config.validate()?;
        let mut profilers = self.columns.iter()
            .map(|c| ColumnProfiler::new(&c.name, config))
            .collect::<CustomResult<Vec<_>>>()?;

        for (i, row) in rows.iter().enumerate() {
            let row = row.as_object()
                .ok_or_else(|| invalid_argument_err(format!("第{}行不是json object", i)))?;
            for (column, profiler) in self.columns.iter().zip(profilers.iter_mut()) {
                profiler.track(row.get(&column.name));
            }
        }

        let mut features = Vec::with_capacity(self.columns.len());
        for (column, profiler) in self.columns.iter().zip(profilers) {
            let metrics = profiler.finish();
            if let Some(declared) = column.column_type {
                let inferred = metrics.schema.inferred_type;
                if metrics.counters.count > metrics.counters.null_count && !declared.accepts(inferred) {
                    warn!("字段{}声明的类型是{:?}，推断出的类型是{:?}", column.name, declared, inferred);
                }
            }
            let null_ratio = if metrics.counters.count == 0 {
                0.0
            } else {
                metrics.counters.null_count as f64 / metrics.counters.count as f64
            };
            let feature = FeatureProfile::new(metrics).with_custom_metric(METRIC_NULL_RATIO, null_ratio);
            features.push((column.name.clone(), feature));
        }

        info!("profile dataset {}: {} rows, {} columns", self.name, rows.len(), features.len());
        DatasetProfile::build(timestamp, rows.len() as i64, size_bytes, features)
    }
}
