use std::path::Path;

use log::info;
use serde_json::{json, Value};

use profile_base::config::ProfileConfig;
use profile_base::custom_error::{invalid_argument_err, CustomResult};
use profile_base::ds::DatasetManifest;
use profile_base::stats::number::NumberSummary;
use profile_base::{deserialize, serialize, DatasetProfile, FeatureProfile};

/// 一次 profile 任务：一个数据集 + 一份配置
pub struct Node {
    pub config: ProfileConfig,
    pub manifest: DatasetManifest,
}

impl Node {
    /// 读取 json lines 格式的数据，计算 profile 并写到 out_path
    pub async fn profile_file(&self, rows_path: &Path, out_path: &Path) -> CustomResult<DatasetProfile> {
        let size_bytes = tokio::fs::metadata(rows_path).await?.len() as i64;
        let data = tokio::fs::read_to_string(rows_path).await?;
        let rows = parse_rows(&data)?;
        info!("read {} rows from {:?}", rows.len(), rows_path);

        let timestamp = chrono::Utc::now().timestamp_millis();
        let profile = self.manifest.profile_rows(&rows, size_bytes, timestamp, &self.config)?;

        let bytes = serialize(&profile);
        tokio::fs::write(out_path, &bytes).await?;
        info!("write profile to {:?}, {} bytes", out_path, bytes.len());
        Ok(profile)
    }
}

pub fn parse_rows(data: &str) -> CustomResult<Vec<Value>> {
    let mut rows = Vec::new();
    for (i, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row: Value = serde_json::from_str(line)
            .map_err(|e| invalid_argument_err(format!("第{}行不是合法的json:{}", i + 1, e)))?;
        rows.push(row);
    }
    Ok(rows)
}

pub async fn load_profile(path: &Path) -> CustomResult<DatasetProfile> {
    let data = tokio::fs::read(path).await?;
    deserialize(&data)
}

/// 给人看的摘要
pub fn summary(profile: &DatasetProfile) -> Value {
    let features: Vec<Value> = profile.feature_profiles().iter()
        .map(|(name, feature)| {
            let m = feature.whylogs_metrics();
            json!({
                "name": name,
                "count": m.counters.count,
                "null_count": m.counters.null_count,
                "inferred_type": format!("{:?}", m.schema.inferred_type),
                "cardinality": m.cardinality.estimate.round(),
                "custom_metrics": feature.custom_metrics(),
            })
        })
        .collect();
    json!({
        "timestamp": profile.timestamp(),
        "num_examples": profile.num_examples(),
        "size_bytes": profile.size_bytes(),
        "features": features,
    })
}

fn number_summary(s: &NumberSummary) -> Value {
    let quantiles: Vec<Value> = s.quantiles.quantiles.iter().zip(&s.quantiles.values)
        .map(|(q, v)| json!([q, v]))
        .collect();
    json!({
        "count": s.count,
        "min": s.min,
        "max": s.max,
        "mean": s.mean,
        "stddev": s.stddev,
        "histogram": {
            "start": s.histogram.start,
            "end": s.histogram.end,
            "counts": s.histogram.counts,
        },
        "quantiles": quantiles,
    })
}

/// 单个特征的详细统计，HLL 的寄存器不打印
pub fn feature_summary(name: &str, feature: &FeatureProfile) -> Value {
    let m = feature.whylogs_metrics();
    let frequent: Vec<Value> = m.frequent_items.items.iter()
        .map(|item| json!({"value": item.value, "estimate": item.estimate}))
        .collect();
    json!({
        "name": name,
        "has_statistics": feature.has_statistics(),
        "count": m.counters.count,
        "null_count": m.counters.null_count,
        "inferred_type": format!("{:?}", m.schema.inferred_type),
        "type_ratio": m.schema.ratio,
        "number_summary": number_summary(&m.number_summary),
        "string_length_summary": number_summary(&m.string_length_summary),
        "frequent_items": frequent,
        "cardinality": {
            "estimate": m.cardinality.estimate,
            "precision": m.cardinality.precision,
        },
        "custom_metrics": feature.custom_metrics(),
    })
}

#[cfg(test)]
mod tests {
    use profile_base::config::ProfileConfig;
    use profile_base::ds::DatasetManifest;

    use crate::node::{feature_summary, load_profile, parse_rows, summary, Node};

    #[test]
    pub fn test_parse_rows() {
        let rows = parse_rows("{\"a\":1}\n\n  {\"a\":2}\n").unwrap();
        assert_eq!(rows.len(), 2);

        let e = parse_rows("{\"a\":1}\n{oops").unwrap_err();
        assert!(e.is_invalid_argument());
    }

    #[test]
    pub fn test_profile_file() {
        let _ = env_logger::builder().is_test(true).try_init();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let dir = std::env::temp_dir().join(format!("profile_node_test_{}", std::process::id()));
            tokio::fs::create_dir_all(&dir).await.unwrap();
            let rows_path = dir.join("rows.jsonl");
            let out_path = dir.join("profile.bin");
            tokio::fs::write(&rows_path, "{\"label\":1}\n{\"label\":0}\n{\"label\":null}\n").await.unwrap();

            let node = Node {
                config: ProfileConfig::default(),
                manifest: DatasetManifest::from_json(r#"{"name":"d","columns":[{"name":"label"}]}"#).unwrap(),
            };
            let profile = node.profile_file(&rows_path, &out_path).await.unwrap();
            assert_eq!(profile.num_examples(), 3);
            assert!(profile.size_bytes() > 0);

            let loaded = load_profile(&out_path).await.unwrap();
            assert_eq!(loaded, profile);

            let s = summary(&loaded);
            assert_eq!(s["num_examples"], 3);
            assert_eq!(s["features"][0]["null_count"], 1);

            let label = loaded.get_feature("label").unwrap();
            let f = feature_summary("label", label);
            assert_eq!(f["count"], 3);
            assert_eq!(f["number_summary"]["max"], 1.0);
            assert_eq!(f["cardinality"]["precision"], 12);
            assert!(f["cardinality"].get("registers").is_none());
            assert!(!label.whylogs_metrics().cardinality.registers.is_empty());
            // 4096 个寄存器不应该出现在输出里
            assert!(f.to_string().len() < 2048);

            tokio::fs::remove_dir_all(&dir).await.unwrap();
        });
    }
}
