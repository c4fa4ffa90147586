use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::custom_error::{invalid_argument_err, CustomResult};
use crate::stats::cardinality::{MAX_PRECISION, MIN_PRECISION};

/// profile 计算的配置，配置文件是json，缺失的项用默认值
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ProfileConfig {
    // 直方图桶数
    pub histogram_bins: usize,
    // 需要计算的分位点
    pub quantiles: Vec<f64>,
    // 保留的高频值个数
    pub frequent_items_k: usize,
    // hll 精度，寄存器个数为 2^hll_precision
    pub hll_precision: u32,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        ProfileConfig {
            histogram_bins: 30,
            quantiles: vec![0.0, 0.01, 0.05, 0.25, 0.5, 0.75, 0.95, 0.99, 1.0],
            frequent_items_k: 10,
            hll_precision: 12,
        }
    }
}

impl ProfileConfig {
    pub fn from_json(data: &str) -> CustomResult<ProfileConfig> {
        let config: ProfileConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> CustomResult<ProfileConfig> {
        let data = fs::read_to_string(path.as_ref())?;
        let config = ProfileConfig::from_json(&data)?;
        info!("load profile config from {:?}: {:?}", path.as_ref(), config);
        Ok(config)
    }

    pub fn validate(&self) -> CustomResult<()> {
        if self.histogram_bins == 0 {
            return Err(invalid_argument_err(format!("histogram_bins 必须大于0")));
        }
        if let Some(q) = self.quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
            return Err(invalid_argument_err(format!("分位点必须在[0,1]之间:{}", q)));
        }
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&self.hll_precision) {
            return Err(invalid_argument_err(format!(
                "hll_precision 必须在{}到{}之间:{}", MIN_PRECISION, MAX_PRECISION, self.hll_precision)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ProfileConfig;

    #[test]
    pub fn test_partial_config() {
        let config = ProfileConfig::from_json(r#"{"histogram_bins": 10}"#).unwrap();
        assert_eq!(config.histogram_bins, 10);
        assert_eq!(config.frequent_items_k, 10);
        assert_eq!(config.hll_precision, 12);
        assert_eq!(config.quantiles.len(), 9);
    }

    #[test]
    pub fn test_invalid_config() {
        assert!(ProfileConfig::from_json(r#"{"histogram_bins": 0}"#).unwrap_err().is_invalid_argument());
        assert!(ProfileConfig::from_json(r#"{"quantiles": [0.5, 1.5]}"#).unwrap_err().is_invalid_argument());
        assert!(ProfileConfig::from_json(r#"{"hll_precision": 20}"#).unwrap_err().is_invalid_argument());
        // json 格式错误
        let e = ProfileConfig::from_json("{").unwrap_err();
        assert_eq!(e.code, crate::custom_error::COMMON_CODE);
    }

    #[test]
    pub fn test_load_missing_file() {
        assert!(ProfileConfig::load("/nonexistent/profile_config.json").is_err());
    }
}
