use bytes::BytesMut;
use serde_json::{json, Value};

use profile_base::codec::wire::{put_key, put_varint, WireType};
use profile_base::codec::{encode_to_bytes, Storable};
use profile_base::config::ProfileConfig;
use profile_base::ds::DatasetManifest;
use profile_base::stats::{ColumnMessage, ColumnProfiler};
use profile_base::{deserialize, get_feature, init_log, serialize, DatasetProfile, FeatureProfile};

fn minimal_statistics(name: &str, values: &[Value]) -> ColumnMessage {
    let config = ProfileConfig { histogram_bins: 4, hll_precision: 4, ..Default::default() };
    let mut profiler = ColumnProfiler::new(name, &config).unwrap();
    for v in values {
        profiler.track(Some(v));
    }
    profiler.finish()
}

fn higgs_profile() -> DatasetProfile {
    let pt = minimal_statistics("lepton_pT", &[json!(0.91), json!(1.2)]);
    let label = minimal_statistics("label", &[json!(1), json!(0)]);
    DatasetProfile::build(1000, 500, 20000, vec![
        ("lepton_pT".to_string(), FeatureProfile::new(pt)),
        ("label".to_string(), FeatureProfile::new(label)),
    ]).unwrap()
}

#[test]
fn test_end_to_end() {
    init_log();
    let profile = higgs_profile();
    let expected_label = profile.get_feature("label").unwrap().clone();

    let bytes = serialize(&profile);
    let decoded = deserialize(&bytes).unwrap();

    assert_eq!(decoded, profile);
    assert_eq!(decoded.num_examples(), 500);
    assert_eq!(get_feature(&decoded, "label").unwrap(), &expected_label);
    assert!(get_feature(&decoded, "missing").unwrap_err().is_not_found());
}

#[test]
fn test_first_three_bytes_is_malformed() {
    let bytes = serialize(&higgs_profile());
    let e = deserialize(&bytes[..3]).unwrap_err();
    assert!(e.is_malformed());
}

#[test]
fn test_newer_schema_fields_are_kept() {
    let profile = higgs_profile();

    // 模拟新版本：FeatureProfile 多了字段 3，DatasetProfile 多了字段 4
    let mut feature = BytesMut::new();
    profile.get_feature("label").unwrap().encode(&mut feature);
    put_key(&mut feature, 3, WireType::LengthDelimited);
    put_varint(&mut feature, 2);
    feature.extend_from_slice(b"v2");

    let mut entry = BytesMut::new();
    put_key(&mut entry, 1, WireType::LengthDelimited);
    put_varint(&mut entry, 5);
    entry.extend_from_slice(b"label");
    put_key(&mut entry, 2, WireType::LengthDelimited);
    put_varint(&mut entry, feature.len() as u64);
    entry.extend_from_slice(&feature);

    let mut body = BytesMut::new();
    put_key(&mut body, 1, WireType::Varint);
    put_varint(&mut body, 1000);
    put_key(&mut body, 2, WireType::Varint);
    put_varint(&mut body, 500);
    put_key(&mut body, 4, WireType::Fixed64);
    body.extend_from_slice(&1.5f64.to_le_bytes());
    put_key(&mut body, 20, WireType::LengthDelimited);
    put_varint(&mut body, entry.len() as u64);
    body.extend_from_slice(&entry);

    let mut framed = BytesMut::new();
    put_varint(&mut framed, body.len() as u64);
    framed.extend_from_slice(&body);

    let decoded = deserialize(&framed).unwrap();
    assert_eq!(decoded.timestamp(), 1000);
    assert_eq!(decoded.num_examples(), 500);
    assert_eq!(decoded.size_bytes(), 0);

    let label = decoded.get_feature("label").unwrap();
    assert_eq!(label.whylogs_metrics(), profile.get_feature("label").unwrap().whylogs_metrics());
    assert!(!label.unknown_fields().is_empty());

    // 旧版本再写出时新字段不丢失
    let again = deserialize(&serialize(&decoded)).unwrap();
    assert_eq!(again, decoded);
    assert_eq!(encode_to_bytes(again.get_feature("label").unwrap()).len(), feature.len());
}

#[test]
fn test_profile_manifest_rows() {
    let manifest = DatasetManifest::from_json(r#"{
        "name": "titanic",
        "columns": [{"name": "Age", "column_type": "FLOAT"}, {"name": "Sex", "column_type": "TEXT"}]
    }"#).unwrap();
    let rows: Vec<Value> = (0..100)
        .map(|i| json!({"Age": i % 50, "Sex": if i % 3 == 0 { "female" } else { "male" }}))
        .collect();

    let profile = manifest.profile_rows(&rows, 4096, 1_700_000_000_000, &ProfileConfig::default()).unwrap();
    let decoded = deserialize(&serialize(&profile)).unwrap();
    assert_eq!(decoded, profile);

    let sex = decoded.get_feature("Sex").unwrap().whylogs_metrics();
    assert_eq!(sex.frequent_items.items[0].value, "male");
    assert_eq!(sex.frequent_items.items[0].estimate, 66);
    assert!((sex.cardinality.estimate - 2.0).abs() < 0.5);

    let age = decoded.get_feature("Age").unwrap().whylogs_metrics();
    assert_eq!(age.number_summary.count, 100);
    assert_eq!(age.number_summary.min, 0.0);
    assert_eq!(age.number_summary.max, 49.0);
    assert_eq!(age.number_summary.quantiles.get(0.5), Some(24.5));
}
