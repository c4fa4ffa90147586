use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Once;

pub mod codec;
pub mod config;
pub mod custom_error;
pub mod ds;
pub mod profile;
pub mod stats;

pub use profile::{deserialize, get_feature, serialize, DatasetProfile, FeatureProfile};

static INIT_LOG: Once = Once::new();

/// 用 crate 目录下的 log4rs.yaml 初始化日志，重复调用只生效一次
pub fn init_log() {
    INIT_LOG.call_once(|| {
        let mut config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        config_path.push("log4rs.yaml");
        if let Err(e) = log4rs::init_file(&config_path, Default::default()) {
            eprintln!("初始化日志失败:{:?},{}", config_path, e);
        }
    });
}

/// 计算hash
pub fn calc_hash(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use crate::calc_hash;

    #[test]
    fn test_calc_hash_stable() {
        assert_eq!(calc_hash("lepton_pT"), calc_hash(&"lepton_pT".to_string()));
        assert_ne!(calc_hash("lepton_pT"), calc_hash("label"));
    }
}
